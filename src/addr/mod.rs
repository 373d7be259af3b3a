//! Address families and related types.
//!
//! Three socket domains are supported:
//! - `Ipv4` — Internet Protocol version 4
//! - `Ipv6` — Internet Protocol version 6
//! - `Unspec` — family chosen at runtime (accepted peers, resolved entries)
//!
//! `Ipv4Mapped` (IPv6 with mapped IPv4) only exists for resolution; it is
//! not a [`Domain`], so no endpoint can be opened with it.

mod ipv4;
mod ipv6;
mod storage;
mod unspec;

pub use self::ipv4::{Ipv4, SocketAddrV4};
pub use self::ipv6::{Ipv4Mapped, Ipv6, SocketAddrV6};
pub use self::storage::AddrStorage;
pub use self::unspec::{AnyAddr, Unspec};

use std::ffi::CString;
use std::fmt;

use serde::Serialize;

use crate::error::{Errno, Error, Result};

/// Runtime address family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
	Unspec,
	Inet,
	Inet6,
}

impl Family {
	/// Returns the libc constant for this family.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Family::Unspec => libc::AF_UNSPEC,
			Family::Inet => libc::AF_INET,
			Family::Inet6 => libc::AF_INET6,
		}
	}

	/// Maps a libc family constant; `None` for families this crate does not
	/// handle.
	pub fn from_raw(raw: libc::c_int) -> Option<Self> {
		match raw {
			libc::AF_UNSPEC => Some(Family::Unspec),
			libc::AF_INET => Some(Family::Inet),
			libc::AF_INET6 => Some(Family::Inet6),
			_ => None,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Family::Unspec => "AF_UNSPEC",
			Family::Inet => "AF_INET",
			Family::Inet6 => "AF_INET6",
		}
	}
}

impl fmt::Display for Family {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl Serialize for Family {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(self.name())
	}
}

/// Trait for address family markers.
///
/// Each type implementing this trait represents an address family
/// that can be passed to the `socket()` syscall, together with the
/// address type endpoints of that family bind and connect with.
pub trait Domain {
	type Addr: ToSockAddr
		+ FromSockAddr
		+ Copy
		+ PartialEq
		+ fmt::Debug
		+ fmt::Display
		+ Serialize;

	const FAMILY: Family;

	/// Returns the libc constant for this address family.
	#[inline]
	fn raw() -> libc::c_int {
		Self::FAMILY.raw()
	}
}

/// Address types that can be written into generic storage for syscalls.
pub trait ToSockAddr {
	fn to_storage(&self) -> AddrStorage;
}

/// Address types that can be recovered from generic storage.
pub trait FromSockAddr: Sized {
	/// Fails with `InvalidConversion` when the storage is tagged with a
	/// different family.
	fn from_storage(storage: &AddrStorage) -> Result<Self>;
}

unsafe extern "C" {
	fn inet_pton(af: libc::c_int, src: *const libc::c_char, dst: *mut libc::c_void) -> libc::c_int;
}

/// Text to binary conversion with `inet_pton(3)`.
pub(crate) fn pton(family: Family, text: &str, dst: *mut libc::c_void) -> Result<()> {
	let c_text = CString::new(text).map_err(|_| Error::InvalidAddress {
		reason: format!("{text:?} contains a NUL byte"),
	})?;
	match unsafe { inet_pton(family.raw(), c_text.as_ptr(), dst) } {
		1 => Ok(()),
		0 => Err(Error::InvalidAddress {
			reason: format!("{text:?} is not a valid {family} address"),
		}),
		_ => Err(Error::system("inet_pton", Errno::last())),
	}
}

/// Renders a serializable value as a JSON diagnostic string.
pub(crate) fn write_json<T: Serialize + ?Sized>(value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	let json = serde_json::to_string(value).map_err(|_| fmt::Error)?;
	f.write_str(&json)
}
