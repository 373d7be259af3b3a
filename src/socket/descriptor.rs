use std::os::fd::RawFd;

/// Exclusive ownership of one OS descriptor.
///
/// Neither `Clone` nor `Copy`: a descriptor moves between owners and the
/// source is left explicitly empty, so it can never be closed twice.
/// Closing goes through the owning endpoint's [`Sys`](super::Sys).
#[derive(Debug, PartialEq, Eq)]
pub struct Descriptor {
	raw: Option<RawFd>,
}

impl Descriptor {
	pub(crate) fn new(fd: RawFd) -> Self {
		Self { raw: Some(fd) }
	}

	pub(crate) fn empty() -> Self {
		Self { raw: None }
	}

	/// The descriptor number, if still owned.
	#[inline]
	pub fn raw(&self) -> Option<RawFd> {
		self.raw
	}

	#[inline]
	pub fn is_open(&self) -> bool {
		self.raw.is_some()
	}

	/// Moves ownership out, leaving `self` empty.
	pub(crate) fn take(&mut self) -> Descriptor {
		std::mem::replace(self, Descriptor::empty())
	}

	/// Gives up ownership of the number for closing; `self` becomes empty.
	pub(crate) fn release(&mut self) -> Option<RawFd> {
		self.raw.take()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn take_leaves_source_empty() {
		let mut fd = Descriptor::new(7);
		let moved = fd.take();
		assert_eq!(moved.raw(), Some(7));
		assert!(!fd.is_open());
		assert_eq!(fd, Descriptor::empty());
	}

	#[test]
	fn release_happens_once() {
		let mut fd = Descriptor::new(3);
		assert_eq!(fd.release(), Some(3));
		assert_eq!(fd.release(), None);
	}
}
