use std::fmt;

use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::addr::{AddrStorage, Domain, Family, FromSockAddr, SocketAddrV4, SocketAddrV6, ToSockAddr, write_json};
use crate::error::{Error, Result};

/// Runtime-family marker.
///
/// Endpoints of this domain learn their family at runtime, from the peer
/// address `accept()` reports or from a resolved entry.
pub struct Unspec;

impl Domain for Unspec {
	type Addr = AnyAddr;

	const FAMILY: Family = Family::Unspec;
}

/// Closed sum over the address families this crate handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnyAddr {
	/// `AF_UNSPEC`. Connecting to it dissolves a datagram association.
	#[default]
	Unspec,
	Inet(SocketAddrV4),
	Inet6(SocketAddrV6),
}

impl AnyAddr {
	pub fn family(&self) -> Family {
		match self {
			AnyAddr::Unspec => Family::Unspec,
			AnyAddr::Inet(_) => Family::Inet,
			AnyAddr::Inet6(_) => Family::Inet6,
		}
	}

	pub fn port(&self) -> Option<u16> {
		match self {
			AnyAddr::Unspec => None,
			AnyAddr::Inet(addr) => Some(addr.port()),
			AnyAddr::Inet6(addr) => Some(addr.port()),
		}
	}

	/// Fallible conversion to IPv4.
	pub fn as_inet(&self) -> Result<SocketAddrV4> {
		match self {
			AnyAddr::Inet(addr) => Ok(*addr),
			other => Err(Error::InvalidConversion {
				expected: Family::Inet.name(),
				found: other.family().raw(),
			}),
		}
	}

	/// Fallible conversion to IPv6.
	pub fn as_inet6(&self) -> Result<SocketAddrV6> {
		match self {
			AnyAddr::Inet6(addr) => Ok(*addr),
			other => Err(Error::InvalidConversion {
				expected: Family::Inet6.name(),
				found: other.family().raw(),
			}),
		}
	}
}

impl From<SocketAddrV4> for AnyAddr {
	fn from(addr: SocketAddrV4) -> Self {
		AnyAddr::Inet(addr)
	}
}

impl From<SocketAddrV6> for AnyAddr {
	fn from(addr: SocketAddrV6) -> Self {
		AnyAddr::Inet6(addr)
	}
}

impl ToSockAddr for AnyAddr {
	fn to_storage(&self) -> AddrStorage {
		match self {
			AnyAddr::Unspec => AddrStorage::default(),
			AnyAddr::Inet(addr) => addr.to_storage(),
			AnyAddr::Inet6(addr) => addr.to_storage(),
		}
	}
}

impl FromSockAddr for AnyAddr {
	/// Fails with `InvalidFamily` for families outside the closed set.
	fn from_storage(storage: &AddrStorage) -> Result<Self> {
		match storage.family() {
			Some(Family::Unspec) => Ok(AnyAddr::Unspec),
			Some(Family::Inet) => SocketAddrV4::from_storage(storage).map(AnyAddr::Inet),
			Some(Family::Inet6) => SocketAddrV6::from_storage(storage).map(AnyAddr::Inet6),
			None => Err(Error::InvalidFamily {
				family: storage.raw_family(),
			}),
		}
	}
}

impl Serialize for AnyAddr {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		match self {
			AnyAddr::Unspec => {
				let mut state = serializer.serialize_struct("AnyAddr", 1)?;
				state.serialize_field("family", &Family::Unspec)?;
				state.end()
			}
			AnyAddr::Inet(addr) => addr.serialize(serializer),
			AnyAddr::Inet6(addr) => addr.serialize(serializer),
		}
	}
}

impl fmt::Display for AnyAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_json(self, f)
	}
}
