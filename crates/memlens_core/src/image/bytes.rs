use crate::image::Endianness;
use crate::{MemlensError, Result};

/// Simple bounded cursor over an immutable byte slice.
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(MemlensError::UnexpectedEof {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	/// Read an unsigned integer of 1, 2, 4 or 8 bytes and widen to `u64`.
	pub fn read_uint(&mut self, size: usize, endianness: Endianness) -> Result<u64> {
		if !matches!(size, 1 | 2 | 4 | 8) {
			return Err(MemlensError::UnsupportedIntSize { size });
		}
		let raw = self.read_exact(size)?;
		let mut buf = [0_u8; 8];
		match endianness {
			Endianness::Little => {
				buf[..size].copy_from_slice(raw);
				Ok(u64::from_le_bytes(buf))
			}
			Endianness::Big => {
				buf[8 - size..].copy_from_slice(raw);
				Ok(u64::from_be_bytes(buf))
			}
		}
	}

	/// Read a signed integer of 1, 2, 4 or 8 bytes and sign-extend to `i64`.
	pub fn read_int(&mut self, size: usize, endianness: Endianness) -> Result<i64> {
		let raw = self.read_uint(size, endianness)?;
		Ok(sign_extend(raw, size))
	}

	/// Read a pointer-sized unsigned integer and widen to `u64`.
	pub fn read_ptr(&mut self, pointer_size: usize, endianness: Endianness) -> Result<u64> {
		match pointer_size {
			4 | 8 => self.read_uint(pointer_size, endianness),
			_ => Err(MemlensError::UnsupportedPointerSize { size: pointer_size }),
		}
	}
}

fn sign_extend(raw: u64, size: usize) -> i64 {
	match size {
		1 => (raw as u8) as i8 as i64,
		2 => (raw as u16) as i16 as i64,
		4 => (raw as u32) as i32 as i64,
		_ => raw as i64,
	}
}

#[cfg(test)]
mod tests {
	use super::Cursor;
	use crate::MemlensError;
	use crate::image::Endianness;

	#[test]
	fn reads_mixed_width_little_endian_values() {
		let bytes = [0xFF, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
		let mut cursor = Cursor::new(&bytes);
		assert_eq!(cursor.read_int(1, Endianness::Little).expect("i8"), -1);
		assert_eq!(cursor.read_uint(2, Endianness::Little).expect("u16"), 0x1234);
		assert_eq!(cursor.read_uint(4, Endianness::Little).expect("u32"), 0x1234_5678);
		assert_eq!(cursor.remaining(), 0);
	}

	#[test]
	fn reads_big_endian_values() {
		let bytes = [0x12, 0x34, 0xFF, 0xFE];
		let mut cursor = Cursor::new(&bytes);
		assert_eq!(cursor.read_uint(2, Endianness::Big).expect("u16"), 0x1234);
		assert_eq!(cursor.read_int(2, Endianness::Big).expect("i16"), -2);
	}

	#[test]
	fn short_read_reports_eof() {
		let mut cursor = Cursor::new(&[1, 2]);
		let err = cursor.read_uint(4, Endianness::Little).expect_err("too short");
		assert!(matches!(err, MemlensError::UnexpectedEof { at: 0, need: 4, rem: 2 }));
	}

	#[test]
	fn rejects_odd_pointer_size() {
		let mut cursor = Cursor::new(&[0; 8]);
		let err = cursor.read_ptr(6, Endianness::Little).expect_err("6-byte pointers are unsupported");
		assert!(matches!(err, MemlensError::UnsupportedPointerSize { size: 6 }));
	}
}
