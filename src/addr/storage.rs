use std::fmt;
use std::mem::size_of;

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::addr::{AnyAddr, Family, FromSockAddr, SocketAddrV4, SocketAddrV6, write_json};
use crate::error::Result;

/// Family-tagged generic address storage.
///
/// Large enough for every concrete address, plus the number of bytes the
/// address actually occupies. This is what the kernel hands back from
/// `accept()`/`recvfrom()` before the family is known.
#[derive(Clone, Copy)]
pub struct AddrStorage {
	raw: libc::sockaddr_storage,
	len: libc::socklen_t,
}

impl Default for AddrStorage {
	/// An `AF_UNSPEC` storage with zeroed payload.
	fn default() -> Self {
		let mut raw: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
		raw.ss_family = libc::AF_UNSPEC as libc::sa_family_t;
		Self {
			raw,
			len: Self::CAPACITY,
		}
	}
}

impl AddrStorage {
	const CAPACITY: libc::socklen_t = size_of::<libc::sockaddr_storage>() as libc::socklen_t;

	/// Copies a raw sockaddr of `len` bytes. Bytes beyond the storage size
	/// are dropped.
	///
	/// # Safety
	/// `addr` must point to at least `len` readable bytes.
	pub unsafe fn from_raw(addr: *const libc::sockaddr, len: libc::socklen_t) -> Self {
		let mut storage = Self::default();
		let len = len.min(Self::CAPACITY);
		unsafe {
			std::ptr::copy_nonoverlapping(
				addr as *const u8,
				&mut storage.raw as *mut _ as *mut u8,
				len as usize,
			);
		}
		storage.len = len;
		storage
	}

	/// Stores a concrete `sockaddr_*` struct.
	pub(crate) fn from_struct<T: Copy>(value: &T) -> Self {
		debug_assert!(size_of::<T>() <= size_of::<libc::sockaddr_storage>());
		unsafe { Self::from_raw(value as *const T as *const libc::sockaddr, size_of::<T>() as libc::socklen_t) }
	}

	/// Reads the storage as a concrete `sockaddr_*` struct.
	///
	/// Callers check the family tag and length first.
	pub(crate) fn read_struct<T: Copy>(&self) -> T {
		debug_assert!(size_of::<T>() <= size_of::<libc::sockaddr_storage>());
		unsafe { std::ptr::read(&self.raw as *const _ as *const T) }
	}

	/// Family tag stored in the header, as the raw libc value.
	#[inline]
	pub fn raw_family(&self) -> libc::c_int {
		self.raw.ss_family as libc::c_int
	}

	/// Family tag, if it is one this crate handles.
	#[inline]
	pub fn family(&self) -> Option<Family> {
		Family::from_raw(self.raw_family())
	}

	/// Occupied length in bytes.
	#[inline]
	pub fn len(&self) -> libc::socklen_t {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Fallible downcast to an IPv4 address.
	pub fn as_inet(&self) -> Result<SocketAddrV4> {
		SocketAddrV4::from_storage(self)
	}

	/// Fallible downcast to an IPv6 address.
	pub fn as_inet6(&self) -> Result<SocketAddrV6> {
		SocketAddrV6::from_storage(self)
	}

	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	///
	/// The pointer is only valid inside the closure.
	pub(crate) fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		f(&self.raw as *const _ as *const libc::sockaddr, self.len)
	}

	/// Hands the kernel the whole storage to fill; `len` is updated in place.
	pub(crate) fn with_raw_mut<F, R>(&mut self, f: F) -> R
	where
		F: FnOnce(*mut libc::sockaddr, *mut libc::socklen_t) -> R,
	{
		self.len = Self::CAPACITY;
		let result = f(&mut self.raw as *mut _ as *mut libc::sockaddr, &mut self.len);
		self.len = self.len.min(Self::CAPACITY);
		result
	}
}

impl fmt::Debug for AddrStorage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AddrStorage")
			.field("family", &self.raw_family())
			.field("len", &self.len)
			.finish()
	}
}

impl PartialEq for AddrStorage {
	fn eq(&self, other: &Self) -> bool {
		let lhs = unsafe { std::slice::from_raw_parts(&self.raw as *const _ as *const u8, self.len as usize) };
		let rhs = unsafe { std::slice::from_raw_parts(&other.raw as *const _ as *const u8, other.len as usize) };
		lhs == rhs
	}
}

impl Eq for AddrStorage {}

impl Serialize for AddrStorage {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		match AnyAddr::from_storage(self) {
			Ok(addr) => addr.serialize(serializer),
			Err(_) => {
				let mut map = serializer.serialize_map(Some(1))?;
				map.serialize_entry("family", &self.raw_family())?;
				map.end()
			}
		}
	}
}

impl fmt::Display for AddrStorage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_json(self, f)
	}
}

impl From<SocketAddrV4> for AddrStorage {
	fn from(addr: SocketAddrV4) -> Self {
		crate::addr::ToSockAddr::to_storage(&addr)
	}
}

impl From<SocketAddrV6> for AddrStorage {
	fn from(addr: SocketAddrV6) -> Self {
		crate::addr::ToSockAddr::to_storage(&addr)
	}
}
