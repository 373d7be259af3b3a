use std::fmt;
use std::marker::PhantomData;
use std::os::fd::RawFd;

use serde::Serialize;

use crate::addr::{AddrStorage, Domain, Family, FromSockAddr, ToSockAddr, write_json};
use crate::error::{Error, Result};
use crate::proto::Protocol;
use super::descriptor::Descriptor;
use super::sys::{Libc, Sys};
use super::{EndpointBuilder, Kind, State};

/// A socket that exclusively owns one descriptor.
///
/// The type parameter `D` fixes the address type used for bind, connect and
/// peer reporting (`Ipv4` → `SocketAddrV4`, `Ipv6` → `SocketAddrV6`,
/// `Unspec` → `AnyAddr`). The concrete family is also kept at runtime, so an
/// `Endpoint<Unspec>` knows whether it ended up IPv4 or IPv6.
///
/// Every syscall goes through `S`. Dropping the endpoint closes the
/// descriptor if it is still owned; failures on that path are logged, never
/// raised.
pub struct Endpoint<D: Domain, S: Sys = Libc> {
	fd: Descriptor,
	family: Family,
	kind: Kind,
	protocol: Protocol,
	state: State,
	local: Option<D::Addr>,
	remote: Option<D::Addr>,
	close_on_exec: bool,
	pub(super) sys: S,
	_marker: PhantomData<D>,
}

impl<D: Domain> Endpoint<D, Libc> {
	/// Opens a new socket of `D`'s family.
	///
	/// Calls the `socket()` syscall with `SOCK_CLOEXEC`. Use
	/// [`EndpointBuilder`] to change that or to inject another [`Sys`].
	pub fn open(kind: Kind, protocol: &Protocol) -> Result<Self> {
		EndpointBuilder::<D>::new(kind).protocol(protocol.clone()).open()
	}
}

impl<D: Domain, S: Sys> Endpoint<D, S> {
	pub(super) fn from_parts(
		sys: S,
		fd: Descriptor,
		family: Family,
		kind: Kind,
		protocol: Protocol,
		state: State,
		close_on_exec: bool,
	) -> Self {
		Self {
			fd,
			family,
			kind,
			protocol,
			state,
			local: None,
			remote: None,
			close_on_exec,
			sys,
			_marker: PhantomData,
		}
	}

	#[inline]
	pub fn family(&self) -> Family {
		self.family
	}

	#[inline]
	pub fn kind(&self) -> Kind {
		self.kind
	}

	#[inline]
	pub fn protocol(&self) -> &Protocol {
		&self.protocol
	}

	#[inline]
	pub fn state(&self) -> State {
		self.state
	}

	/// Latest address passed to a successful `bind()`.
	#[inline]
	pub fn local_addr(&self) -> Option<D::Addr> {
		self.local
	}

	/// Latest peer from `connect()` or `accept()`.
	#[inline]
	pub fn peer_addr(&self) -> Option<D::Addr> {
		self.remote
	}

	#[inline]
	pub fn is_open(&self) -> bool {
		self.fd.is_open()
	}

	/// Returns the raw file descriptor while it is owned.
	///
	/// Does not transfer ownership.
	#[inline]
	pub fn raw_fd(&self) -> Option<RawFd> {
		self.fd.raw()
	}

	/// The syscall strategy this endpoint uses.
	#[inline]
	pub fn sys(&self) -> &S {
		&self.sys
	}

	/// The owned descriptor, or `InvalidState` once closed.
	pub(super) fn live_fd(&self, op: &'static str) -> Result<RawFd> {
		match self.fd.raw() {
			Some(fd) if self.state != State::Closed => Ok(fd),
			_ => Err(Error::InvalidState {
				op,
				state: State::Closed.name(),
			}),
		}
	}

	/// Binds the socket to a local address.
	pub fn bind(&mut self, addr: D::Addr) -> Result<()> {
		let fd = self.live_fd("bind")?;
		self.sys
			.bind(fd, &addr.to_storage())
			.map_err(|errno| Error::system("bind", errno))?;

		tracing::debug!(fd, %addr, "bound");
		self.local = Some(addr);
		if self.state == State::Created {
			self.state = State::Bound;
		}
		Ok(())
	}

	/// Marks the socket passive.
	///
	/// `backlog` — maximum pending connections queue size. On a socket that
	/// was never bound the kernel picks an ephemeral port; read it back with
	/// [`sock_name`](Self::sock_name).
	pub fn listen(&mut self, backlog: i32) -> Result<()> {
		let fd = self.live_fd("listen")?;
		self.sys
			.listen(fd, backlog)
			.map_err(|errno| Error::system("listen", errno))?;

		tracing::debug!(fd, backlog, autobound = self.state == State::Created, "listening");
		self.state = State::Listening;
		Ok(())
	}

	/// Connects to (stream) or associates with (datagram) a peer.
	///
	/// An `AF_UNSPEC` address dissolves the association instead, see
	/// [`disconnect`](Self::disconnect).
	pub fn connect(&mut self, addr: D::Addr) -> Result<()> {
		let storage = addr.to_storage();
		if storage.raw_family() == libc::AF_UNSPEC {
			return self.disconnect();
		}

		let fd = self.live_fd("connect")?;
		self.sys
			.connect(fd, &storage)
			.map_err(|errno| Error::system("connect", errno))?;

		tracing::debug!(fd, %addr, "connected");
		self.remote = Some(addr);
		self.state = State::Connected;
		Ok(())
	}

	/// Dissolves a datagram peer association with `connect(AF_UNSPEC)`.
	///
	/// Only connectionless kinds support this; others fail with
	/// `InvalidState`.
	pub fn disconnect(&mut self) -> Result<()> {
		let fd = self.live_fd("disconnect")?;
		if !self.kind.is_connectionless() {
			return Err(Error::InvalidState {
				op: "disconnect",
				state: self.kind.name(),
			});
		}
		self.sys
			.connect(fd, &AddrStorage::default())
			.map_err(|errno| Error::system("connect", errno))?;

		tracing::debug!(fd, "association dissolved");
		self.remote = None;
		if self.state == State::Connected {
			self.state = if self.local.is_some() { State::Bound } else { State::Created };
		}
		Ok(())
	}

	/// Accepts an incoming connection **using blocking semantics**.
	///
	/// The returned endpoint owns the new descriptor, starts `Connected` and
	/// takes its family from the peer address the kernel reports. A peer of
	/// a family this crate does not handle fails with `InvalidFamily`; the
	/// accepted descriptor is closed in that case. The listener itself is
	/// left untouched.
	pub fn accept(&self) -> Result<Self> {
		let fd = self.live_fd("accept")?;
		let flags = if self.close_on_exec { libc::SOCK_CLOEXEC } else { 0 };
		let (accepted, peer) = self
			.sys
			.accept(fd, flags)
			.map_err(|errno| Error::system("accept", errno))?;

		// dropping `child` on the error paths below closes `accepted`
		let mut child = Self::from_parts(
			self.sys.clone(),
			Descriptor::new(accepted),
			D::FAMILY,
			self.kind,
			self.protocol.clone(),
			State::Connected,
			self.close_on_exec,
		);

		let family = match peer.family() {
			Some(family) if family != Family::Unspec => family,
			_ => return Err(Error::InvalidFamily { family: peer.raw_family() }),
		};
		let remote = D::Addr::from_storage(&peer).map_err(|err| match err {
			Error::InvalidConversion { found, .. } => Error::InvalidFamily { family: found },
			other => other,
		})?;

		tracing::debug!(listener = fd, fd = accepted, peer = %remote, "accepted");
		child.family = family;
		child.local = self.local;
		child.remote = Some(remote);
		Ok(child)
	}

	/// Reads back the bound address from the kernel (`getsockname`).
	///
	/// Useful after binding port 0.
	pub fn sock_name(&self) -> Result<D::Addr> {
		let fd = self.live_fd("getsockname")?;
		let storage = self
			.sys
			.sock_name(fd)
			.map_err(|errno| Error::system("getsockname", errno))?;
		D::Addr::from_storage(&storage)
	}

	/// Releases the descriptor.
	///
	/// Idempotent: once closed (or moved out with [`take`](Self::take)) this
	/// returns `Ok(())` without a syscall. The descriptor is released even
	/// when `close()` reports a failure.
	pub fn close(&mut self) -> Result<()> {
		self.state = State::Closed;
		let Some(fd) = self.fd.release() else {
			return Ok(());
		};
		tracing::debug!(fd, "closing");
		self.sys.close(fd).map_err(|errno| Error::system("close", errno))
	}

	/// [`close`](Self::close) that never fails; errors are logged.
	pub fn close_quietly(&mut self) {
		if let Err(err) = self.close() {
			tracing::warn!(%err, "close failed, descriptor released anyway");
		}
	}

	/// Moves the descriptor, protocol and addresses into a new endpoint.
	///
	/// `self` is left empty and `Closed`; closing it afterwards issues no
	/// syscall.
	pub fn take(&mut self) -> Self {
		let moved = Self {
			fd: self.fd.take(),
			family: self.family,
			kind: self.kind,
			protocol: self.protocol.clone(),
			state: self.state,
			local: self.local.take(),
			remote: self.remote.take(),
			close_on_exec: self.close_on_exec,
			sys: self.sys.clone(),
			_marker: PhantomData,
		};
		self.state = State::Closed;
		moved
	}
}

impl<D: Domain, S: Sys> Drop for Endpoint<D, S> {
	fn drop(&mut self) {
		self.close_quietly();
	}
}

#[derive(Serialize)]
struct Snapshot<'a, A> {
	fd: Option<RawFd>,
	family: Family,
	kind: Kind,
	state: State,
	protocol: &'a Protocol,
	local: Option<&'a A>,
	remote: Option<&'a A>,
}

impl<D: Domain, S: Sys> Serialize for Endpoint<D, S> {
	fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
		Snapshot {
			fd: self.fd.raw(),
			family: self.family,
			kind: self.kind,
			state: self.state,
			protocol: &self.protocol,
			local: self.local.as_ref(),
			remote: self.remote.as_ref(),
		}
		.serialize(serializer)
	}
}

impl<D: Domain, S: Sys> fmt::Display for Endpoint<D, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_json(self, f)
	}
}

impl<D: Domain, S: Sys> fmt::Debug for Endpoint<D, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Endpoint")
			.field("fd", &self.fd.raw())
			.field("family", &self.family)
			.field("kind", &self.kind)
			.field("state", &self.state)
			.field("local", &self.local)
			.field("remote", &self.remote)
			.finish()
	}
}
