//! Name and service resolution through `getaddrinfo`.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use serde::Serialize;

use crate::addr::{
	AddrStorage, AnyAddr, FromSockAddr, Ipv4, Ipv4Mapped, Ipv6, SocketAddrV4, SocketAddrV6, Family,
	Unspec, write_json,
};
use crate::error::{Errno, Error, Result};
use crate::proto::Protocol;
use crate::socket::{Endpoint, EndpointBuilder, Kind};

/// Families a [`Resolver`] can be asked for.
///
/// Every [`Domain`](crate::Domain) is one; [`Ipv4Mapped`] is resolvable
/// without being a socket domain.
pub trait Resolvable {
	type Addr: FromSockAddr + Copy + PartialEq + fmt::Debug + fmt::Display + Serialize;

	/// `ai_family` hint.
	fn hint_family() -> libc::c_int;

	/// Extra `ai_flags` this family always sets.
	fn hint_flags() -> libc::c_int {
		0
	}
}

impl Resolvable for Ipv4 {
	type Addr = SocketAddrV4;

	fn hint_family() -> libc::c_int {
		libc::AF_INET
	}
}

impl Resolvable for Ipv6 {
	type Addr = SocketAddrV6;

	fn hint_family() -> libc::c_int {
		libc::AF_INET6
	}
}

impl Resolvable for Unspec {
	type Addr = AnyAddr;

	fn hint_family() -> libc::c_int {
		libc::AF_UNSPEC
	}
}

/// IPv6 results, with IPv4 hosts reported as `::ffff:a.b.c.d`.
impl Resolvable for Ipv4Mapped {
	type Addr = SocketAddrV6;

	fn hint_family() -> libc::c_int {
		libc::AF_INET6
	}

	fn hint_flags() -> libc::c_int {
		libc::AI_V4MAPPED | libc::AI_ALL
	}
}

/// Protocol constraint for a resolution.
#[derive(Debug, Clone)]
pub enum ProtocolHint {
	/// Looked up in the protocol database first.
	Name(String),
	Number(i32),
	Record(Protocol),
}

impl ProtocolHint {
	fn number(&self) -> Result<i32> {
		match self {
			ProtocolHint::Name(name) => Ok(Protocol::by_name(name)?.number()),
			ProtocolHint::Number(number) => Ok(*number),
			ProtocolHint::Record(record) => Ok(record.number()),
		}
	}
}

impl From<Protocol> for ProtocolHint {
	fn from(protocol: Protocol) -> Self {
		ProtocolHint::Record(protocol)
	}
}

/// What the resolved addresses will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
	/// Local addresses (`AI_PASSIVE`).
	Bind,
	/// Remote addresses; asks for the canonical name when a node is given.
	Connect,
}

/// One `addrinfo` entry, copied out of the OS list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved<A> {
	pub flags: i32,
	pub family: Family,
	pub kind: Option<Kind>,
	pub protocol: Option<Protocol>,
	pub addr: A,
	#[serde(rename = "canonname")]
	pub canonical_name: Option<String>,
}

impl<A: Serialize> fmt::Display for Resolved<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_json(self, f)
	}
}

impl Resolved<AnyAddr> {
	/// Endpoint builder preset with this entry's family, kind and protocol.
	///
	/// Entries without a socket kind get `Kind::Stream`.
	pub fn builder(&self) -> EndpointBuilder<Unspec> {
		let builder = EndpointBuilder::<Unspec>::new(self.kind.unwrap_or(Kind::Stream)).family(self.family);
		match &self.protocol {
			Some(protocol) => builder.protocol(protocol.clone()),
			None => builder,
		}
	}

	/// Opens a socket matching this entry.
	pub fn open(&self) -> Result<Endpoint<Unspec>> {
		self.builder().open()
	}
}

/// Builder over one `getaddrinfo` call.
///
/// # Example
/// ```ignore
/// use ringsock::{Ipv4, Kind, Resolver};
///
/// let entries = Resolver::<Ipv4>::new("80")
///     .node("localhost")
///     .kind(Kind::Stream)
///     .resolve()?;
/// ```
pub struct Resolver<R: Resolvable> {
	service: String,
	node: Option<String>,
	protocol: Option<ProtocolHint>,
	kind: Option<Kind>,
	purpose: Option<Purpose>,
	_marker: PhantomData<R>,
}

impl<R: Resolvable> Resolver<R> {
	/// `service` is a port number or a name from the services database.
	pub fn new(service: impl Into<String>) -> Self {
		Self {
			service: service.into(),
			node: None,
			protocol: None,
			kind: None,
			purpose: None,
			_marker: PhantomData,
		}
	}

	/// Host name or numeric address. Without it, local addresses are
	/// resolved.
	pub fn node(mut self, node: impl Into<String>) -> Self {
		self.node = Some(node.into());
		self
	}

	pub fn protocol(mut self, protocol: impl Into<ProtocolHint>) -> Self {
		self.protocol = Some(protocol.into());
		self
	}

	pub fn kind(mut self, kind: Kind) -> Self {
		self.kind = Some(kind);
		self
	}

	/// Default: `Connect` when a node is set, `Bind` otherwise.
	pub fn purpose(mut self, purpose: Purpose) -> Self {
		self.purpose = Some(purpose);
		self
	}

	fn flags(&self) -> libc::c_int {
		let purpose = self.purpose.unwrap_or(if self.node.is_some() {
			Purpose::Connect
		} else {
			Purpose::Bind
		});
		let mut flags = R::hint_flags();
		match purpose {
			Purpose::Bind => flags |= libc::AI_PASSIVE,
			Purpose::Connect if self.node.is_some() => flags |= libc::AI_CANONNAME,
			Purpose::Connect => {}
		}
		flags
	}

	/// Runs the lookup and returns the entries in OS order.
	pub fn resolve(&self) -> Result<Vec<Resolved<R::Addr>>> {
		let service = c_string(&self.service)?;
		let node = self.node.as_deref().map(c_string).transpose()?;

		let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
		hints.ai_family = R::hint_family();
		hints.ai_flags = self.flags();
		hints.ai_socktype = self.kind.map_or(0, Kind::raw);
		hints.ai_protocol = match &self.protocol {
			Some(hint) => hint.number()?,
			None => 0,
		};

		let mut list: *mut libc::addrinfo = ptr::null_mut();
		let code = unsafe {
			libc::getaddrinfo(
				node.as_ref().map_or(ptr::null(), |node| node.as_ptr()),
				service.as_ptr(),
				&hints,
				&mut list,
			)
		};
		if code != 0 {
			return Err(gai_error(code));
		}
		let list = AddrInfoList(list);

		let mut protocols: HashMap<i32, Option<Protocol>> = HashMap::new();
		let mut entries = Vec::new();
		let mut cursor = list.0 as *const libc::addrinfo;
		while !cursor.is_null() {
			let info = unsafe { &*cursor };
			cursor = info.ai_next;

			let storage = unsafe { AddrStorage::from_raw(info.ai_addr, info.ai_addrlen) };
			let family = Family::from_raw(info.ai_family).ok_or(Error::InvalidFamily { family: info.ai_family })?;
			let protocol = protocols
				.entry(info.ai_protocol)
				.or_insert_with(|| Protocol::by_number(info.ai_protocol).ok())
				.clone();
			let canonical_name = if info.ai_canonname.is_null() {
				None
			} else {
				Some(unsafe { CStr::from_ptr(info.ai_canonname) }.to_string_lossy().into_owned())
			};

			entries.push(Resolved {
				flags: info.ai_flags,
				family,
				kind: Kind::from_raw(info.ai_socktype),
				protocol,
				addr: R::Addr::from_storage(&storage)?,
				canonical_name,
			});
		}

		tracing::debug!(
			service = %self.service,
			node = ?self.node,
			count = entries.len(),
			"resolved"
		);
		Ok(entries)
	}
}

/// Frees the `getaddrinfo` list on every exit path.
struct AddrInfoList(*mut libc::addrinfo);

impl Drop for AddrInfoList {
	fn drop(&mut self) {
		if !self.0.is_null() {
			unsafe { libc::freeaddrinfo(self.0) };
		}
	}
}

fn c_string(text: &str) -> Result<CString> {
	CString::new(text).map_err(|_| Error::InvalidAddress {
		reason: format!("{text:?} contains a NUL byte"),
	})
}

fn gai_error(code: libc::c_int) -> Error {
	match code {
		libc::EAI_MEMORY => Error::OutOfMemory,
		libc::EAI_SYSTEM => Error::system("getaddrinfo", Errno::last()),
		_ => {
			let message = unsafe { CStr::from_ptr(libc::gai_strerror(code)) };
			Error::Resolution {
				message: message.to_string_lossy().into_owned(),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bind_is_passive_and_connect_asks_for_canonname() {
		assert_eq!(Resolver::<Ipv4>::new("80").flags(), libc::AI_PASSIVE);
		assert_eq!(Resolver::<Ipv4>::new("80").node("localhost").flags(), libc::AI_CANONNAME);
		assert_eq!(
			Resolver::<Ipv4>::new("80").node("localhost").purpose(Purpose::Bind).flags(),
			libc::AI_PASSIVE
		);
		assert_eq!(Resolver::<Ipv6>::new("80").purpose(Purpose::Connect).flags(), 0);
	}

	#[test]
	fn mapped_adds_v4mapped_and_all() {
		let flags = Resolver::<Ipv4Mapped>::new("80").node("localhost").flags();
		assert_eq!(flags, libc::AI_V4MAPPED | libc::AI_ALL | libc::AI_CANONNAME);
		assert_eq!(Ipv4Mapped::hint_family(), libc::AF_INET6);
	}

	#[test]
	fn unknown_service_is_resolution_failure() {
		let err = Resolver::<Ipv4>::new("no-such-service-here")
			.node("127.0.0.1")
			.resolve()
			.unwrap_err();
		assert!(matches!(err, Error::Resolution { .. }), "{err:?}");
	}

	#[test]
	fn nul_in_service_is_rejected() {
		let err = Resolver::<Unspec>::new("8\00").resolve().unwrap_err();
		assert!(matches!(err, Error::InvalidAddress { .. }));
	}

	#[test]
	fn memory_exhaustion_maps_to_out_of_memory() {
		assert!(matches!(gai_error(libc::EAI_MEMORY), Error::OutOfMemory));
	}

	#[test]
	fn system_code_maps_to_system_failure() {
		let err = gai_error(libc::EAI_SYSTEM);
		assert!(matches!(err, Error::System { op: "getaddrinfo", .. }), "{err:?}");
		assert!(err.errno().is_some());
	}

	#[test]
	fn other_codes_carry_the_gai_message() {
		match gai_error(libc::EAI_NONAME) {
			Error::Resolution { message } => assert!(!message.is_empty()),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn entry_display_renders_missing_canonname_as_null() {
		let entry = Resolved {
			flags: 0,
			family: Family::Inet,
			kind: Some(Kind::Datagram),
			protocol: None,
			addr: SocketAddrV4::new([10, 0, 0, 1], 53),
			canonical_name: None,
		};
		let json: serde_json::Value = serde_json::from_str(&entry.to_string()).unwrap();
		assert_eq!(json["canonname"], serde_json::Value::Null);
		assert_eq!(json["kind"], "DGRAM");
		assert_eq!(json["addr"]["port"], 53);
	}
}
