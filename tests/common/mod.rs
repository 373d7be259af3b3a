//! Shared test infrastructure for endpoint tests.
//!
//! [`MockSys`] stands in for the OS: it hands out fake descriptors, records
//! every call and replays scripted peers, transfer sizes and failures.
//! Clones share one state, like endpoints accepted from a listener share the
//! listener's `Sys`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::rc::Rc;

use ringsock::{AddrStorage, Errno, Sys, SysResult};

#[derive(Default)]
struct MockState {
	next_fd: RawFd,
	calls: Vec<&'static str>,
	closed: Vec<RawFd>,
	connects: Vec<AddrStorage>,
	peers: VecDeque<AddrStorage>,
	sends: VecDeque<SysResult<usize>>,
	sent: Vec<u8>,
	destinations: Vec<AddrStorage>,
	recvs: VecDeque<SysResult<Vec<u8>>>,
	source: AddrStorage,
	bound: Option<AddrStorage>,
	fail_next: Option<(&'static str, Errno)>,
}

#[derive(Clone, Default)]
pub struct MockSys {
	state: Rc<RefCell<MockState>>,
}

impl MockSys {
	pub fn new() -> Self {
		let mock = Self::default();
		mock.state.borrow_mut().next_fd = 100;
		mock
	}

	/// Every call made so far, in order.
	pub fn calls(&self) -> Vec<&'static str> {
		self.state.borrow().calls.clone()
	}

	pub fn count(&self, op: &str) -> usize {
		self.state.borrow().calls.iter().filter(|call| **call == op).count()
	}

	pub fn closed(&self) -> Vec<RawFd> {
		self.state.borrow().closed.clone()
	}

	pub fn connects(&self) -> Vec<AddrStorage> {
		self.state.borrow().connects.clone()
	}

	/// Bytes accepted by `send`/`send_to`, concatenated.
	pub fn sent(&self) -> Vec<u8> {
		self.state.borrow().sent.clone()
	}

	pub fn destinations(&self) -> Vec<AddrStorage> {
		self.state.borrow().destinations.clone()
	}

	/// Queues the peer address the next `accept` reports.
	pub fn push_peer(&self, peer: impl Into<AddrStorage>) {
		self.state.borrow_mut().peers.push_back(peer.into());
	}

	pub fn push_peer_storage(&self, peer: AddrStorage) {
		self.state.borrow_mut().peers.push_back(peer);
	}

	/// Queues the outcome of one `send`; unscripted sends take everything.
	pub fn script_send(&self, result: SysResult<usize>) {
		self.state.borrow_mut().sends.push_back(result);
	}

	/// Queues bytes for `recv`; an empty queue reads as eof.
	pub fn push_recv(&self, data: &[u8]) {
		self.state.borrow_mut().recvs.push_back(Ok(data.to_vec()));
	}

	pub fn push_recv_err(&self, errno: i32) {
		self.state.borrow_mut().recvs.push_back(Err(Errno(errno)));
	}

	/// Sender reported by `recv_from`.
	pub fn set_source(&self, source: impl Into<AddrStorage>) {
		self.state.borrow_mut().source = source.into();
	}

	/// Makes the next call to `op` fail with `errno`.
	pub fn fail_next(&self, op: &'static str, errno: i32) {
		self.state.borrow_mut().fail_next = Some((op, Errno(errno)));
	}

	fn enter(&self, op: &'static str) -> SysResult<()> {
		let mut state = self.state.borrow_mut();
		state.calls.push(op);
		match state.fail_next {
			Some((failing, errno)) if failing == op => {
				state.fail_next = None;
				Err(errno)
			}
			_ => Ok(()),
		}
	}

	fn allocate(&self) -> RawFd {
		let mut state = self.state.borrow_mut();
		let fd = state.next_fd;
		state.next_fd += 1;
		fd
	}

	fn take_send(&self, buf: &[u8]) -> SysResult<usize> {
		let mut state = self.state.borrow_mut();
		let n = match state.sends.pop_front() {
			Some(Ok(n)) => n.min(buf.len()),
			Some(Err(errno)) => return Err(errno),
			None => buf.len(),
		};
		state.sent.extend_from_slice(&buf[..n]);
		Ok(n)
	}

	fn take_recv(&self, buf: &mut [u8]) -> SysResult<usize> {
		let mut state = self.state.borrow_mut();
		match state.recvs.pop_front() {
			None => Ok(0),
			Some(Err(errno)) => Err(errno),
			Some(Ok(data)) => {
				let n = data.len().min(buf.len());
				buf[..n].copy_from_slice(&data[..n]);
				if n < data.len() {
					state.recvs.push_front(Ok(data[n..].to_vec()));
				}
				Ok(n)
			}
		}
	}
}

impl Sys for MockSys {
	fn socket(&self, _family: libc::c_int, _kind: libc::c_int, _protocol: libc::c_int) -> SysResult<RawFd> {
		self.enter("socket")?;
		Ok(self.allocate())
	}

	fn bind(&self, _fd: RawFd, addr: &AddrStorage) -> SysResult<()> {
		self.enter("bind")?;
		self.state.borrow_mut().bound = Some(*addr);
		Ok(())
	}

	fn listen(&self, _fd: RawFd, _backlog: libc::c_int) -> SysResult<()> {
		self.enter("listen")
	}

	fn connect(&self, _fd: RawFd, addr: &AddrStorage) -> SysResult<()> {
		self.enter("connect")?;
		self.state.borrow_mut().connects.push(*addr);
		Ok(())
	}

	fn accept(&self, _fd: RawFd, _flags: libc::c_int) -> SysResult<(RawFd, AddrStorage)> {
		self.enter("accept")?;
		let peer = self
			.state
			.borrow_mut()
			.peers
			.pop_front()
			.ok_or(Errno(libc::EAGAIN))?;
		Ok((self.allocate(), peer))
	}

	fn close(&self, fd: RawFd) -> SysResult<()> {
		self.state.borrow_mut().closed.push(fd);
		self.enter("close")
	}

	fn send(&self, _fd: RawFd, buf: &[u8], _flags: libc::c_int) -> SysResult<usize> {
		self.enter("send")?;
		self.take_send(buf)
	}

	fn send_to(&self, _fd: RawFd, buf: &[u8], _flags: libc::c_int, addr: &AddrStorage) -> SysResult<usize> {
		self.enter("sendto")?;
		self.state.borrow_mut().destinations.push(*addr);
		self.take_send(buf)
	}

	fn recv(&self, _fd: RawFd, buf: &mut [u8], _flags: libc::c_int) -> SysResult<usize> {
		self.enter("recv")?;
		self.take_recv(buf)
	}

	fn recv_from(&self, _fd: RawFd, buf: &mut [u8], _flags: libc::c_int) -> SysResult<(usize, AddrStorage)> {
		self.enter("recvfrom")?;
		let n = self.take_recv(buf)?;
		Ok((n, self.state.borrow().source))
	}

	fn sock_name(&self, _fd: RawFd) -> SysResult<AddrStorage> {
		self.enter("getsockname")?;
		Ok(self.state.borrow().bound.unwrap_or_default())
	}
}

/// An `AF_UNIX` address, a family endpoints do not handle.
pub fn unix_peer(path: &str) -> AddrStorage {
	let mut raw: libc::sockaddr_un = unsafe { std::mem::zeroed() };
	raw.sun_family = libc::AF_UNIX as libc::sa_family_t;
	for (dst, src) in raw.sun_path.iter_mut().zip(path.bytes()) {
		*dst = src as libc::c_char;
	}
	let len = std::mem::size_of::<libc::sa_family_t>() + path.len() + 1;
	unsafe {
		AddrStorage::from_raw(
			&raw as *const libc::sockaddr_un as *const libc::sockaddr,
			len as libc::socklen_t,
		)
	}
}
