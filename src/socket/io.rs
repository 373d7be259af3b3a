//! Buffered data transfer on an [`Endpoint`].
//!
//! Every operation drives [`CircularBuffer::sync`] with a transfer function
//! wrapping one OS primitive, so partial transfers and wraparound are handled
//! by the ring and never by the caller.

use std::os::fd::RawFd;

use crate::addr::{AddrStorage, Domain, FromSockAddr, ToSockAddr};
use crate::buffer::{CircularBuffer, Direction, Synced};
use crate::error::{Error, Result};
use super::endpoint::Endpoint;
use super::sys::Sys;

/// Source address of a completed `recvfrom()`.
///
/// The bytes are already in the ring, so an address that does not fit `D`
/// is logged and dropped instead of failing the call.
fn sender<D: Domain>(fd: RawFd, storage: &AddrStorage) -> Option<D::Addr> {
	if storage.is_empty() || storage.raw_family() == libc::AF_UNSPEC {
		return None;
	}
	match D::Addr::from_storage(storage) {
		Ok(addr) => Some(addr),
		Err(err) => {
			tracing::warn!(fd, %err, "dropping unusable source address");
			None
		}
	}
}

fn expect_direction<const N: usize>(
	buf: &CircularBuffer<N>,
	op: &'static str,
	expected: Direction,
) -> Result<()> {
	if buf.direction() == expected {
		Ok(())
	} else {
		Err(Error::Direction { op, expected })
	}
}

impl<D: Domain, S: Sys> Endpoint<D, S> {
	/// Drains an output buffer into the connected peer.
	///
	/// Keeps calling `send()` until the buffer is empty or the kernel reports
	/// no progress. Returns the bytes sent by this call. On failure the
	/// buffer keeps whatever was not yet sent.
	pub fn send<const N: usize>(&self, buf: &mut CircularBuffer<N>, flags: i32) -> Result<usize> {
		expect_direction(buf, "send", Direction::Output)?;
		let fd = self.live_fd("send")?;

		let mut total = 0;
		while !buf.is_empty() {
			let synced = buf.sync(|run| {
				self.sys
					.send(fd, run, flags)
					.map_err(|errno| Error::system("send", errno))
			})?;
			match synced {
				Synced::Transferred(n) => total += n,
				Synced::Eof | Synced::Idle => break,
			}
		}
		tracing::trace!(fd, total, "sent");
		Ok(total)
	}

	/// [`send`](Self::send) with an explicit destination (`sendto()`).
	pub fn send_to<const N: usize>(
		&self,
		buf: &mut CircularBuffer<N>,
		dest: &D::Addr,
		flags: i32,
	) -> Result<usize> {
		expect_direction(buf, "sendto", Direction::Output)?;
		let fd = self.live_fd("sendto")?;
		let storage = dest.to_storage();

		let mut total = 0;
		while !buf.is_empty() {
			let synced = buf.sync(|run| {
				self.sys
					.send_to(fd, run, flags, &storage)
					.map_err(|errno| Error::system("sendto", errno))
			})?;
			match synced {
				Synced::Transferred(n) => total += n,
				Synced::Eof | Synced::Idle => break,
			}
		}
		tracing::trace!(fd, total, %dest, "sent");
		Ok(total)
	}

	/// Fills an input buffer from the peer.
	///
	/// Returns once the buffer is full or the peer shut down (check
	/// [`CircularBuffer::eof`]). Blocks while neither has happened.
	pub fn recv<const N: usize>(&self, buf: &mut CircularBuffer<N>, flags: i32) -> Result<usize> {
		expect_direction(buf, "recv", Direction::Input)?;
		let fd = self.live_fd("recv")?;

		let mut total = 0;
		while !buf.is_full() && !buf.eof() {
			match self.recv_run(fd, buf, flags)? {
				Synced::Transferred(n) => total += n,
				Synced::Eof | Synced::Idle => break,
			}
		}
		tracing::trace!(fd, total, eof = buf.eof(), "received");
		Ok(total)
	}

	/// Exactly one `recv()` into the buffer. Suited to datagrams, where a
	/// second call would wait for the next message.
	pub fn recv_once<const N: usize>(&self, buf: &mut CircularBuffer<N>, flags: i32) -> Result<usize> {
		expect_direction(buf, "recv", Direction::Input)?;
		let fd = self.live_fd("recv")?;

		match self.recv_run(fd, buf, flags)? {
			Synced::Transferred(n) => Ok(n),
			Synced::Eof | Synced::Idle => Ok(0),
		}
	}

	/// One `recvfrom()` into the buffer.
	///
	/// Returns the byte count and the sender. The sender is `None` when
	/// nothing was transferred, and on connection-mode sockets where the
	/// kernel reports no source address.
	pub fn recv_from<const N: usize>(
		&self,
		buf: &mut CircularBuffer<N>,
		flags: i32,
	) -> Result<(usize, Option<D::Addr>)> {
		expect_direction(buf, "recvfrom", Direction::Input)?;
		let fd = self.live_fd("recvfrom")?;

		let mut source = None;
		let synced = buf.sync(|run| {
			let (n, from) = self
				.sys
				.recv_from(fd, run, flags)
				.map_err(|errno| Error::system("recvfrom", errno))?;
			source = Some(from);
			Ok(n)
		})?;

		match synced {
			Synced::Transferred(n) => {
				let from = source.and_then(|storage| sender::<D>(fd, &storage));
				tracing::trace!(fd, n, "received datagram");
				Ok((n, from))
			}
			Synced::Eof | Synced::Idle => Ok((0, None)),
		}
	}

	fn recv_run<const N: usize>(
		&self,
		fd: RawFd,
		buf: &mut CircularBuffer<N>,
		flags: i32,
	) -> Result<Synced> {
		buf.sync(|run| {
			self.sys
				.recv(fd, run, flags)
				.map_err(|errno| Error::system("recv", errno))
		})
	}
}
