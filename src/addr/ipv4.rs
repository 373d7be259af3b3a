use std::fmt;

use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::addr::{AddrStorage, Domain, Family, FromSockAddr, ToSockAddr, pton, write_json};
use crate::error::{Error, Result};

/// IPv4 address family marker.
///
/// Sockets with this domain use 32-bit addresses (e.g., 192.168.1.1).
pub struct Ipv4;

impl Domain for Ipv4 {
	type Addr = SocketAddrV4;

	const FAMILY: Family = Family::Inet;
}

/// IPv4 socket address (IP + port).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketAddrV4 {
	ip: [u8; 4],
	port: u16,
}

impl SocketAddrV4 {
	/// Creates a new IPv4 address.
	pub fn new(ip: [u8; 4], port: u16) -> Self {
		Self { ip, port }
	}

	/// Parses dotted-quad text, e.g. `SocketAddrV4::parse("192.168.1.1", 8080)`.
	pub fn parse(text: &str, port: u16) -> Result<Self> {
		let mut addr = libc::in_addr { s_addr: 0 };
		pton(Family::Inet, text, &mut addr as *mut _ as *mut libc::c_void)?;
		Ok(Self {
			ip: addr.s_addr.to_ne_bytes(),
			port,
		})
	}

	/// `0.0.0.0:port`.
	pub fn any(port: u16) -> Self {
		Self::new([0, 0, 0, 0], port)
	}

	/// `127.0.0.1:port`.
	pub fn localhost(port: u16) -> Self {
		Self::new([127, 0, 0, 1], port)
	}

	/// Returns the IP bytes.
	pub fn ip(&self) -> [u8; 4] {
		self.ip
	}

	/// Returns the port.
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Creates from raw sockaddr_in.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in) -> Self {
		Self {
			ip: raw.sin_addr.s_addr.to_ne_bytes(),
			port: u16::from_be(raw.sin_port),
		}
	}

	/// Converts to the raw sockaddr_in for syscalls.
	pub(crate) fn to_raw(&self) -> libc::sockaddr_in {
		libc::sockaddr_in {
			sin_family: libc::AF_INET as libc::sa_family_t,
			sin_port: self.port.to_be(),
			sin_addr: libc::in_addr {
				s_addr: u32::from_be_bytes(self.ip).to_be(),
			},
			sin_zero: [0; 8],
		}
	}
}

impl ToSockAddr for SocketAddrV4 {
	fn to_storage(&self) -> AddrStorage {
		AddrStorage::from_struct(&self.to_raw())
	}
}

impl FromSockAddr for SocketAddrV4 {
	fn from_storage(storage: &AddrStorage) -> Result<Self> {
		if storage.raw_family() != libc::AF_INET {
			return Err(Error::InvalidConversion {
				expected: Family::Inet.name(),
				found: storage.raw_family(),
			});
		}
		if (storage.len() as usize) < std::mem::size_of::<libc::sockaddr_in>() {
			return Err(Error::InvalidAddress {
				reason: format!("{} bytes is too short for sockaddr_in", storage.len()),
			});
		}
		Ok(Self::from_raw(&storage.read_struct::<libc::sockaddr_in>()))
	}
}

impl Serialize for SocketAddrV4 {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("SocketAddrV4", 3)?;
		state.serialize_field("family", &Family::Inet)?;
		state.serialize_field("port", &self.port)?;
		state.serialize_field("ip", &std::net::Ipv4Addr::from(self.ip).to_string())?;
		state.end()
	}
}

impl fmt::Display for SocketAddrV4 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_json(self, f)
	}
}
