use std::os::fd::RawFd;

use crate::addr::AddrStorage;
use crate::error::Errno;

pub type SysResult<T> = std::result::Result<T, Errno>;

/// The socket primitives an [`Endpoint`](super::Endpoint) is built on.
///
/// Each method maps 1:1 to one OS call. [`Libc`] is the real thing; tests
/// inject their own implementation to script descriptors, peers and
/// failures without touching the network.
pub trait Sys: Clone {
	fn socket(&self, family: libc::c_int, kind: libc::c_int, protocol: libc::c_int) -> SysResult<RawFd>;

	fn bind(&self, fd: RawFd, addr: &AddrStorage) -> SysResult<()>;

	fn listen(&self, fd: RawFd, backlog: libc::c_int) -> SysResult<()>;

	fn connect(&self, fd: RawFd, addr: &AddrStorage) -> SysResult<()>;

	/// Blocks until a connection is pending; returns the new descriptor and
	/// the peer address as reported by the kernel.
	fn accept(&self, fd: RawFd, flags: libc::c_int) -> SysResult<(RawFd, AddrStorage)>;

	fn close(&self, fd: RawFd) -> SysResult<()>;

	fn send(&self, fd: RawFd, buf: &[u8], flags: libc::c_int) -> SysResult<usize>;

	fn send_to(&self, fd: RawFd, buf: &[u8], flags: libc::c_int, addr: &AddrStorage) -> SysResult<usize>;

	fn recv(&self, fd: RawFd, buf: &mut [u8], flags: libc::c_int) -> SysResult<usize>;

	fn recv_from(&self, fd: RawFd, buf: &mut [u8], flags: libc::c_int) -> SysResult<(usize, AddrStorage)>;

	fn sock_name(&self, fd: RawFd) -> SysResult<AddrStorage>;
}

/// Blocking libc syscalls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Libc;

#[inline]
fn check(ret: libc::c_int) -> SysResult<()> {
	if ret == -1 { Err(Errno::last()) } else { Ok(()) }
}

#[inline]
fn check_len(ret: libc::ssize_t) -> SysResult<usize> {
	if ret < 0 { Err(Errno::last()) } else { Ok(ret as usize) }
}

impl Sys for Libc {
	fn socket(&self, family: libc::c_int, kind: libc::c_int, protocol: libc::c_int) -> SysResult<RawFd> {
		let fd = unsafe { libc::socket(family, kind, protocol) };
		if fd == -1 { Err(Errno::last()) } else { Ok(fd) }
	}

	fn bind(&self, fd: RawFd, addr: &AddrStorage) -> SysResult<()> {
		check(addr.with_raw(|ptr, len| unsafe { libc::bind(fd, ptr, len) }))
	}

	fn listen(&self, fd: RawFd, backlog: libc::c_int) -> SysResult<()> {
		check(unsafe { libc::listen(fd, backlog) })
	}

	fn connect(&self, fd: RawFd, addr: &AddrStorage) -> SysResult<()> {
		check(addr.with_raw(|ptr, len| unsafe { libc::connect(fd, ptr, len) }))
	}

	fn accept(&self, fd: RawFd, flags: libc::c_int) -> SysResult<(RawFd, AddrStorage)> {
		let mut peer = AddrStorage::default();
		let accepted = peer.with_raw_mut(|ptr, len| unsafe { libc::accept4(fd, ptr, len, flags) });
		if accepted == -1 {
			return Err(Errno::last());
		}
		Ok((accepted, peer))
	}

	fn close(&self, fd: RawFd) -> SysResult<()> {
		check(unsafe { libc::close(fd) })
	}

	fn send(&self, fd: RawFd, buf: &[u8], flags: libc::c_int) -> SysResult<usize> {
		check_len(unsafe { libc::send(fd, buf.as_ptr() as *const libc::c_void, buf.len(), flags) })
	}

	fn send_to(&self, fd: RawFd, buf: &[u8], flags: libc::c_int, addr: &AddrStorage) -> SysResult<usize> {
		check_len(addr.with_raw(|ptr, len| unsafe {
			libc::sendto(fd, buf.as_ptr() as *const libc::c_void, buf.len(), flags, ptr, len)
		}))
	}

	fn recv(&self, fd: RawFd, buf: &mut [u8], flags: libc::c_int) -> SysResult<usize> {
		check_len(unsafe { libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), flags) })
	}

	fn recv_from(&self, fd: RawFd, buf: &mut [u8], flags: libc::c_int) -> SysResult<(usize, AddrStorage)> {
		let mut source = AddrStorage::default();
		let n = source.with_raw_mut(|ptr, len| unsafe {
			libc::recvfrom(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), flags, ptr, len)
		});
		Ok((check_len(n)?, source))
	}

	fn sock_name(&self, fd: RawFd) -> SysResult<AddrStorage> {
		let mut local = AddrStorage::default();
		check(local.with_raw_mut(|ptr, len| unsafe { libc::getsockname(fd, ptr, len) }))?;
		Ok(local)
	}
}
