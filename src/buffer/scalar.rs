/// Fixed-width values that can be moved through a ring buffer as one unit.
///
/// Values travel in network byte order.
pub trait Scalar: Sized + Copy + private::Sealed {
	/// Encoded width in bytes.
	const SIZE: usize;

	/// Writes the encoded value into `out`, which is exactly `SIZE` bytes.
	fn encode(self, out: &mut [u8]);

	/// Decodes a value from `bytes`, which is exactly `SIZE` bytes.
	fn decode(bytes: &[u8]) -> Self;
}

mod private {
	pub trait Sealed {}
}

macro_rules! impl_scalar {
	($($t:ty),* $(,)?) => {
		$(
			impl private::Sealed for $t {}

			impl Scalar for $t {
				const SIZE: usize = std::mem::size_of::<$t>();

				#[inline]
				fn encode(self, out: &mut [u8]) {
					out.copy_from_slice(&self.to_be_bytes());
				}

				#[inline]
				fn decode(bytes: &[u8]) -> Self {
					let mut raw = [0u8; std::mem::size_of::<$t>()];
					raw.copy_from_slice(bytes);
					<$t>::from_be_bytes(raw)
				}
			}
		)*
	};
}

impl_scalar!(u8, u16, u32, u64, i8, i16, i32, i64);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn encodes_big_endian() {
		let mut out = [0u8; 4];
		0x0102_0304u32.encode(&mut out);
		assert_eq!(out, [1, 2, 3, 4]);
		assert_eq!(u32::decode(&out), 0x0102_0304);
	}

	#[test]
	fn signed_values_keep_sign() {
		let mut out = [0u8; 2];
		(-2i16).encode(&mut out);
		assert_eq!(i16::decode(&out), -2);
	}
}
