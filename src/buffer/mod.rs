//! Fixed-capacity byte ring that mediates all endpoint I/O.
//!
//! A [`CircularBuffer`] has a direction chosen at construction:
//! - `Input` — filled by a transfer function (`recv`), drained by the caller
//!   with [`CircularBuffer::get_n`].
//! - `Output` — filled by the caller with [`CircularBuffer::put_n`], drained
//!   by a transfer function (`send`).
//!
//! [`CircularBuffer::sync`] hands the transfer function exactly one
//! contiguous run of the ring: the free run starting at `put` for input, the
//! occupied run starting at `get` for output. A single `send`/`recv` only
//! ever touches one contiguous region, so callers loop `sync` until they are
//! satisfied or the buffer reports eof.

mod scalar;

pub use self::scalar::Scalar;

use serde::Serialize;

use crate::error::{Error, Result};

/// Which side of the ring the transfer function works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	/// Transfer fills, caller drains.
	Input,
	/// Caller fills, transfer drains.
	Output,
}

impl std::fmt::Display for Direction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Direction::Input => f.write_str("input"),
			Direction::Output => f.write_str("output"),
		}
	}
}

/// Outcome of one [`CircularBuffer::sync`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synced {
	/// The transfer moved this many bytes.
	Transferred(usize),
	/// The transfer reported end of stream. Offsets are untouched.
	Eof,
	/// Nothing to transfer: input buffer full, or output buffer empty.
	/// The transfer function was not called.
	Idle,
}

/// Fixed-capacity byte ring of `N` bytes.
///
/// Occupancy is `N` when full, otherwise `(put - get) mod N`. Whenever the
/// ring drains to empty both offsets return to 0, so an empty ring always
/// offers its whole capacity as one contiguous run.
#[derive(Debug)]
pub struct CircularBuffer<const N: usize> {
	buf: [u8; N],
	get: usize,
	put: usize,
	full: bool,
	eof: bool,
	direction: Direction,
}

impl<const N: usize> CircularBuffer<N> {
	const NON_ZERO: () = assert!(N > 0, "ring capacity must be non-zero");

	/// Creates an empty ring with the given direction.
	pub fn new(direction: Direction) -> Self {
		let () = Self::NON_ZERO;
		Self {
			buf: [0; N],
			get: 0,
			put: 0,
			full: false,
			eof: false,
			direction,
		}
	}

	/// Ring filled by `recv`.
	pub fn input() -> Self {
		Self::new(Direction::Input)
	}

	/// Ring drained by `send`.
	pub fn output() -> Self {
		Self::new(Direction::Output)
	}

	#[inline]
	pub const fn size(&self) -> usize {
		N
	}

	#[inline]
	pub fn direction(&self) -> Direction {
		self.direction
	}

	#[inline]
	pub fn is_full(&self) -> bool {
		self.full
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		!self.full && self.get == self.put
	}

	/// True once a transfer reported end of stream.
	#[inline]
	pub fn eof(&self) -> bool {
		self.eof
	}

	/// Current read offset.
	#[inline]
	pub fn get_offset(&self) -> usize {
		self.get
	}

	/// Current write offset.
	#[inline]
	pub fn put_offset(&self) -> usize {
		self.put
	}

	/// Returns the ring to its freshly constructed state, eof included.
	/// The direction is kept.
	pub fn clear(&mut self) {
		self.get = 0;
		self.put = 0;
		self.full = false;
		self.eof = false;
	}

	/// Number of occupied bytes.
	pub fn in_avail(&self) -> usize {
		if self.full {
			N
		} else if self.get <= self.put {
			self.put - self.get
		} else {
			N - self.get + self.put
		}
	}

	/// Number of free bytes.
	#[inline]
	pub fn free(&self) -> usize {
		N - self.in_avail()
	}

	/// Copies up to `dst.len()` bytes out of the ring, oldest first.
	///
	/// Returns the number of bytes copied; 0 when the ring is empty or `dst`
	/// is empty. Never blocks.
	pub fn get_n(&mut self, dst: &mut [u8]) -> usize {
		let n = self.copy_out(dst);
		if n == 0 {
			return 0;
		}
		self.get = (self.get + n) % N;
		self.full = false;
		if self.get == self.put {
			self.get = 0;
			self.put = 0;
		}
		n
	}

	/// Copies up to `dst.len()` bytes out of the ring without consuming them.
	pub fn peek_n(&self, dst: &mut [u8]) -> usize {
		self.copy_out(dst)
	}

	/// Copies up to `src.len()` bytes into the ring.
	///
	/// Returns the number of bytes copied; 0 when the ring is full or `src`
	/// is empty.
	pub fn put_n(&mut self, src: &[u8]) -> usize {
		let n = src.len().min(self.free());
		if n == 0 {
			return 0;
		}
		// tail run [put, N), then head run [0, get)
		let tail = n.min(N - self.put);
		self.buf[self.put..self.put + tail].copy_from_slice(&src[..tail]);
		let head = n - tail;
		if head > 0 {
			self.buf[..head].copy_from_slice(&src[tail..n]);
		}
		self.put = (self.put + n) % N;
		if self.put == self.get {
			self.full = true;
		}
		n
	}

	/// Runs one exchange between the ring and `transfer`.
	///
	/// `transfer` receives the single contiguous run matching the ring's
	/// direction and returns how many bytes it moved. `Ok(0)` marks eof and
	/// leaves the offsets alone; an error is returned as-is with the ring
	/// untouched. The transfer is called at most once.
	pub fn sync<F>(&mut self, transfer: F) -> Result<Synced>
	where
		F: FnOnce(&mut [u8]) -> Result<usize>,
	{
		let (start, len) = match self.direction {
			Direction::Input => (self.put, self.free_run()),
			Direction::Output => (self.get, self.occupied_run()),
		};
		if len == 0 {
			tracing::trace!(direction = %self.direction, "sync skipped, no contiguous run");
			return Ok(Synced::Idle);
		}

		let moved = transfer(&mut self.buf[start..start + len])?;
		if moved == 0 {
			tracing::trace!(direction = %self.direction, "sync reached eof");
			self.eof = true;
			return Ok(Synced::Eof);
		}
		debug_assert!(moved <= len, "transfer reported {moved} bytes for a {len} byte run");
		let moved = moved.min(len);

		match self.direction {
			Direction::Input => {
				self.put = (self.put + moved) % N;
				if self.put == self.get {
					self.full = true;
				}
			}
			Direction::Output => {
				self.get = (self.get + moved) % N;
				self.full = false;
				if self.get == self.put {
					self.get = 0;
					self.put = 0;
				}
			}
		}
		tracing::trace!(
			direction = %self.direction,
			moved,
			get = self.get,
			put = self.put,
			"sync transferred"
		);
		Ok(Synced::Transferred(moved))
	}

	/// [`sync`](Self::sync) for transfer functions following the OS
	/// convention: positive byte count, 0 for eof, negative for failure.
	pub fn sync_raw<F>(&mut self, transfer: F) -> Result<Synced>
	where
		F: FnOnce(&mut [u8]) -> isize,
	{
		self.sync(|run| match transfer(run) {
			code if code < 0 => Err(Error::Transfer { code }),
			n => Ok(n as usize),
		})
	}

	/// Appends one fixed-width value, all or nothing.
	pub fn write_value<T: Scalar>(&mut self, value: T) -> Result<()> {
		let available = self.free();
		if available < T::SIZE {
			return Err(Error::InsufficientSpace { needed: T::SIZE, available });
		}
		let mut raw = [0u8; 8];
		value.encode(&mut raw[..T::SIZE]);
		self.put_n(&raw[..T::SIZE]);
		Ok(())
	}

	/// Removes one fixed-width value, all or nothing.
	pub fn read_value<T: Scalar>(&mut self) -> Result<T> {
		let available = self.in_avail();
		if available < T::SIZE {
			return Err(Error::InsufficientData { needed: T::SIZE, available });
		}
		let mut raw = [0u8; 8];
		self.get_n(&mut raw[..T::SIZE]);
		Ok(T::decode(&raw[..T::SIZE]))
	}

	/// Reads one fixed-width value without consuming it.
	pub fn peek_value<T: Scalar>(&self) -> Result<T> {
		let available = self.in_avail();
		if available < T::SIZE {
			return Err(Error::InsufficientData { needed: T::SIZE, available });
		}
		let mut raw = [0u8; 8];
		self.copy_out(&mut raw[..T::SIZE]);
		Ok(T::decode(&raw[..T::SIZE]))
	}

	fn copy_out(&self, dst: &mut [u8]) -> usize {
		let n = dst.len().min(self.in_avail());
		if n == 0 {
			return 0;
		}
		// tail run [get, N), then head run [0, put)
		let tail = n.min(N - self.get);
		dst[..tail].copy_from_slice(&self.buf[self.get..self.get + tail]);
		let head = n - tail;
		if head > 0 {
			dst[tail..n].copy_from_slice(&self.buf[..head]);
		}
		n
	}

	fn free_run(&self) -> usize {
		if self.full {
			0
		} else if self.put < self.get {
			self.get - self.put
		} else {
			N - self.put
		}
	}

	fn occupied_run(&self) -> usize {
		if self.is_empty() {
			0
		} else if self.get < self.put {
			self.put - self.get
		} else {
			N - self.get
		}
	}
}

#[derive(Serialize)]
struct Snapshot<'a> {
	get_off: usize,
	put_off: usize,
	in_avail: usize,
	full: bool,
	eof: bool,
	direction: Direction,
	data: &'a [u8],
}

impl<const N: usize> Serialize for CircularBuffer<N> {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		Snapshot {
			get_off: self.get,
			put_off: self.put,
			in_avail: self.in_avail(),
			full: self.full,
			eof: self.eof,
			direction: self.direction,
			data: &self.buf,
		}
		.serialize(serializer)
	}
}

impl<const N: usize> std::fmt::Display for CircularBuffer<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
		f.write_str(&json)
	}
}
