use std::marker::PhantomData;

use crate::addr::{Domain, Family, ToSockAddr, Unspec};
use crate::error::{Error, Result};
use crate::proto::Protocol;
use super::descriptor::Descriptor;
use super::endpoint::Endpoint;
use super::sys::{Libc, Sys};
use super::{Kind, State};

/// Builder for [`Endpoint`]s.
///
/// # Example
/// ```ignore
/// use ringsock::{EndpointBuilder, Ipv4, Kind, Protocol, SocketAddrV4};
///
/// let listener = EndpointBuilder::<Ipv4>::new(Kind::Stream)
///     .protocol(Protocol::tcp()?)
///     .listen(SocketAddrV4::localhost(8080), 128)?;
/// ```
pub struct EndpointBuilder<D: Domain, S: Sys = Libc> {
	kind: Kind,
	family: Family,
	protocol: Option<Protocol>,
	close_on_exec: bool,
	sys: S,
	_marker: PhantomData<D>,
}

impl<D: Domain> EndpointBuilder<D, Libc> {
	pub fn new(kind: Kind) -> Self {
		Self {
			kind,
			family: D::FAMILY,
			protocol: None,
			close_on_exec: true,
			sys: Libc,
			_marker: PhantomData,
		}
	}
}

impl<S: Sys> EndpointBuilder<Unspec, S> {
	/// Picks the concrete family for an `Unspec` endpoint.
	///
	/// Without it, `bind`/`connect` take the family of their address and
	/// `open` fails in `socket()`.
	pub fn family(mut self, family: Family) -> Self {
		self.family = family;
		self
	}
}

impl<D: Domain, S: Sys> EndpointBuilder<D, S> {
	/// Protocol record handed to `socket()`. Default: number 0, letting the
	/// kernel pick.
	pub fn protocol(mut self, protocol: Protocol) -> Self {
		self.protocol = Some(protocol);
		self
	}

	/// Set `SOCK_CLOEXEC` on the socket and on accepted connections.
	/// Default: true.
	pub fn close_on_exec(mut self, enable: bool) -> Self {
		self.close_on_exec = enable;
		self
	}

	/// Routes every syscall of the built endpoint through `sys`.
	pub fn sys<T: Sys>(self, sys: T) -> EndpointBuilder<D, T> {
		EndpointBuilder {
			kind: self.kind,
			family: self.family,
			protocol: self.protocol,
			close_on_exec: self.close_on_exec,
			sys,
			_marker: PhantomData,
		}
	}

	/// Creates the socket.
	pub fn open(self) -> Result<Endpoint<D, S>> {
		let protocol = self.protocol.unwrap_or_else(|| Protocol::new("ip", 0, ["IP"]));
		let mut kind = self.kind.raw();
		if self.close_on_exec {
			kind |= libc::SOCK_CLOEXEC;
		}

		let fd = self
			.sys
			.socket(self.family.raw(), kind, protocol.number())
			.map_err(|errno| Error::system("socket", errno))?;

		tracing::debug!(fd, family = %self.family, kind = %self.kind, protocol = protocol.name(), "socket opened");
		Ok(Endpoint::from_parts(
			self.sys,
			Descriptor::new(fd),
			self.family,
			self.kind,
			protocol,
			State::Created,
			self.close_on_exec,
		))
	}

	/// Creates the socket and binds it.
	pub fn bind(self, addr: D::Addr) -> Result<Endpoint<D, S>> {
		let mut endpoint = self.for_addr(&addr).open()?;
		endpoint.bind(addr)?;
		Ok(endpoint)
	}

	/// Creates the socket, binds it and starts listening.
	pub fn listen(self, addr: D::Addr, backlog: i32) -> Result<Endpoint<D, S>> {
		let mut endpoint = self.bind(addr)?;
		endpoint.listen(backlog)?;
		Ok(endpoint)
	}

	/// Creates the socket and connects it.
	pub fn connect(self, addr: D::Addr) -> Result<Endpoint<D, S>> {
		let mut endpoint = self.for_addr(&addr).open()?;
		endpoint.connect(addr)?;
		Ok(endpoint)
	}

	fn for_addr(mut self, addr: &D::Addr) -> Self {
		if self.family == Family::Unspec {
			if let Some(family) = addr.to_storage().family() {
				self.family = family;
			}
		}
		self
	}
}
