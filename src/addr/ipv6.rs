use std::fmt;

use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::addr::{AddrStorage, Domain, Family, FromSockAddr, SocketAddrV4, ToSockAddr, pton, write_json};
use crate::error::{Error, Result};

/// IPv6 address family marker.
///
/// Sockets with this domain use 128-bit addresses (e.g., ::1).
pub struct Ipv6;

impl Domain for Ipv6 {
	type Addr = SocketAddrV6;

	const FAMILY: Family = Family::Inet6;
}

/// IPv6 with mapped IPv4 addresses (`::ffff:a.b.c.d`).
///
/// Resolution-only: asks the resolver for IPv6 results and to map IPv4
/// results into IPv6. Addresses come back as [`SocketAddrV6`]; endpoints are
/// opened with [`Ipv6`].
pub struct Ipv4Mapped;

/// IPv6 socket address (IP + port + flow info + scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketAddrV6 {
	ip: [u8; 16],
	port: u16,
	flowinfo: u32,
	/// Scope ID for link-local addresses (identifies network interface).
	/// Usually 0 unless using link-local addresses like fe80::.
	scope_id: u32,
}

impl SocketAddrV6 {
	/// Creates a new IPv6 address.
	pub fn new(ip: [u8; 16], port: u16) -> Self {
		Self { ip, port, flowinfo: 0, scope_id: 0 }
	}

	/// Creates with explicit scope ID.
	///
	/// Use for link-local addresses (fe80::) where you need to specify the interface.
	pub fn with_scope(ip: [u8; 16], port: u16, scope_id: u32) -> Self {
		Self { ip, port, flowinfo: 0, scope_id }
	}

	/// Parses textual IPv6, e.g. `SocketAddrV6::parse("::1", 80, 0, 0)`.
	pub fn parse(text: &str, port: u16, flowinfo: u32, scope_id: u32) -> Result<Self> {
		let mut addr = libc::in6_addr { s6_addr: [0; 16] };
		pton(Family::Inet6, text, &mut addr as *mut _ as *mut libc::c_void)?;
		Ok(Self {
			ip: addr.s6_addr,
			port,
			flowinfo,
			scope_id,
		})
	}

	/// `[::]:port`.
	pub fn any(port: u16) -> Self {
		Self::new([0; 16], port)
	}

	/// `[::1]:port`.
	pub fn localhost(port: u16) -> Self {
		let mut ip = [0; 16];
		ip[15] = 1;
		Self::new(ip, port)
	}

	/// Returns the IP bytes.
	pub fn ip(&self) -> [u8; 16] {
		self.ip
	}

	/// Returns the port.
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Returns the flow info (host byte order).
	pub fn flowinfo(&self) -> u32 {
		self.flowinfo
	}

	/// Returns the scope ID.
	pub fn scope_id(&self) -> u32 {
		self.scope_id
	}

	/// The embedded IPv4 address when this is `::ffff:a.b.c.d`.
	pub fn to_ipv4_mapped(&self) -> Option<SocketAddrV4> {
		std::net::Ipv6Addr::from(self.ip)
			.to_ipv4_mapped()
			.map(|v4| SocketAddrV4::new(v4.octets(), self.port))
	}

	/// Converts to the raw sockaddr_in6 for syscalls.
	pub(crate) fn to_raw(&self) -> libc::sockaddr_in6 {
		libc::sockaddr_in6 {
			sin6_family: libc::AF_INET6 as libc::sa_family_t,
			sin6_port: self.port.to_be(),
			sin6_flowinfo: self.flowinfo.to_be(),
			sin6_addr: libc::in6_addr {
				s6_addr: self.ip,
			},
			sin6_scope_id: self.scope_id,
		}
	}

	/// Creates from raw sockaddr_in6.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in6) -> Self {
		Self {
			ip: raw.sin6_addr.s6_addr,
			port: u16::from_be(raw.sin6_port),
			flowinfo: u32::from_be(raw.sin6_flowinfo),
			scope_id: raw.sin6_scope_id,
		}
	}
}

impl ToSockAddr for SocketAddrV6 {
	fn to_storage(&self) -> AddrStorage {
		AddrStorage::from_struct(&self.to_raw())
	}
}

impl FromSockAddr for SocketAddrV6 {
	fn from_storage(storage: &AddrStorage) -> Result<Self> {
		if storage.raw_family() != libc::AF_INET6 {
			return Err(Error::InvalidConversion {
				expected: Family::Inet6.name(),
				found: storage.raw_family(),
			});
		}
		if (storage.len() as usize) < std::mem::size_of::<libc::sockaddr_in6>() {
			return Err(Error::InvalidAddress {
				reason: format!("{} bytes is too short for sockaddr_in6", storage.len()),
			});
		}
		Ok(Self::from_raw(&storage.read_struct::<libc::sockaddr_in6>()))
	}
}

impl Serialize for SocketAddrV6 {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("SocketAddrV6", 5)?;
		state.serialize_field("family", &Family::Inet6)?;
		state.serialize_field("port", &self.port)?;
		state.serialize_field("flowinfo", &self.flowinfo)?;
		state.serialize_field("ip", &std::net::Ipv6Addr::from(self.ip).to_string())?;
		state.serialize_field("scope_id", &self.scope_id)?;
		state.end()
	}
}

impl fmt::Display for SocketAddrV6 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_json(self, f)
	}
}
