use std::fs;
use std::path::Path;

use crate::Result;
use crate::image::compression::decode_bytes;
use crate::image::{Compression, Segment, SegmentSpace};

/// A flat memory dump mapped at a base address.
pub struct MemoryImage {
	/// Compression of the source file.
	pub compression: Compression,
	/// Address of the first dumped byte.
	pub base: u64,
	space: SegmentSpace,
}

impl MemoryImage {
	/// Load a raw or zstd-compressed dump and map it at `base`.
	pub fn open(path: impl AsRef<Path>, base: u64) -> Result<Self> {
		let raw = fs::read(path.as_ref())?;
		let image = Self::from_bytes(raw, base)?;
		log::info!(
			"mapped {} bytes ({}) at 0x{base:016x} from {}",
			image.space.mapped_len(),
			image.compression.as_str(),
			path.as_ref().display()
		);
		Ok(image)
	}

	/// Map in-memory dump bytes at `base`.
	pub fn from_bytes(raw: Vec<u8>, base: u64) -> Result<Self> {
		let (compression, bytes) = decode_bytes(raw)?;
		let space = SegmentSpace::from_segments(vec![Segment::new(base, bytes)])?;
		Ok(Self { compression, base, space })
	}

	/// Return the address space backed by the dump.
	pub fn space(&self) -> &SegmentSpace {
		&self.space
	}
}

#[cfg(test)]
mod tests {
	use super::MemoryImage;
	use crate::image::{AddressSpace, Compression};

	#[test]
	fn maps_raw_bytes_at_base() {
		let image = MemoryImage::from_bytes(vec![0xAA, 0xBB], 0xffff_8000_0000_0000).expect("image maps");
		assert_eq!(image.compression, Compression::None);
		assert_eq!(image.space().read(0xffff_8000_0000_0001, 1), Some(&[0xBB_u8][..]));
		assert!(image.space().read(0xffff_8000_0000_0002, 1).is_none());
	}

	#[test]
	fn open_reads_compressed_dump_from_disk() {
		let path = std::env::temp_dir().join(format!("memlens-image-{}.zst", std::process::id()));
		let packed = zstd::encode_all(&[1_u8, 2, 3, 4][..], 3).expect("zstd encodes");
		std::fs::write(&path, packed).expect("temp dump writes");

		let image = MemoryImage::open(&path, 0x1000).expect("image opens");
		let _ = std::fs::remove_file(&path);

		assert_eq!(image.compression, Compression::Zstd);
		assert_eq!(image.space().read(0x1000, 4), Some(&[1_u8, 2, 3, 4][..]));
	}
}
