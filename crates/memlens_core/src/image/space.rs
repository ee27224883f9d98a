use crate::{MemlensError, Result};

/// Read-only view of an address space inside a memory image.
///
/// Implementations never mutate the image; several traversals may share one.
pub trait AddressSpace {
	/// Borrow `len` bytes at `addr`, or `None` when any byte is unmapped.
	fn read(&self, addr: u64, len: usize) -> Option<&[u8]>;

	/// Return whether `len` bytes at `addr` are mapped.
	fn is_valid(&self, addr: u64, len: usize) -> bool {
		self.read(addr, len).is_some()
	}

	/// Number of contiguous mapped bytes at `addr`, capped at `max`.
	fn read_available(&self, addr: u64, max: usize) -> usize {
		let (mut lo, mut hi) = (0_usize, max);
		while lo < hi {
			let mid = lo + (hi - lo).div_ceil(2);
			if self.is_valid(addr, mid) {
				lo = mid;
			} else {
				hi = mid - 1;
			}
		}
		lo
	}
}

/// One contiguous mapped range.
#[derive(Debug, Clone)]
pub struct Segment {
	/// First mapped address.
	pub start: u64,
	/// Backing bytes.
	pub bytes: Vec<u8>,
}

impl Segment {
	/// Create a segment mapping `bytes` at `start`.
	pub fn new(start: u64, bytes: Vec<u8>) -> Self {
		Self { start, bytes }
	}

	/// Exclusive end address.
	pub fn end(&self) -> u64 {
		self.start.saturating_add(self.bytes.len() as u64)
	}
}

/// Sparse address space made of sorted, non-overlapping segments.
#[derive(Debug, Default)]
pub struct SegmentSpace {
	starts: Vec<u64>,
	segments: Vec<Segment>,
}

impl SegmentSpace {
	/// Build a space from segments in any order.
	pub fn from_segments(mut segments: Vec<Segment>) -> Result<Self> {
		segments.retain(|segment| !segment.bytes.is_empty());
		segments.sort_by_key(|segment| segment.start);

		for pair in segments.windows(2) {
			if pair[1].start < pair[0].end() {
				return Err(MemlensError::SegmentOverlap {
					start: pair[1].start,
					prev_end: pair[0].end(),
				});
			}
		}

		let starts = segments.iter().map(|segment| segment.start).collect();
		Ok(Self { starts, segments })
	}

	/// Return all segments in address order.
	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// Return the total number of mapped bytes.
	pub fn mapped_len(&self) -> u64 {
		self.segments.iter().map(|segment| segment.bytes.len() as u64).sum()
	}

	fn segment_for(&self, addr: u64) -> Option<&Segment> {
		let idx = self.starts.partition_point(|start| *start <= addr);
		if idx == 0 {
			return None;
		}

		let segment = &self.segments[idx - 1];
		if addr >= segment.end() {
			return None;
		}
		Some(segment)
	}
}

impl AddressSpace for SegmentSpace {
	fn read(&self, addr: u64, len: usize) -> Option<&[u8]> {
		let segment = self.segment_for(addr)?;
		let start = usize::try_from(addr - segment.start).ok()?;
		let end = start.checked_add(len)?;
		segment.bytes.get(start..end)
	}

	fn read_available(&self, addr: u64, max: usize) -> usize {
		match self.segment_for(addr) {
			Some(segment) => usize::try_from(segment.end() - addr).map_or(max, |left| left.min(max)),
			None => 0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{AddressSpace, Segment, SegmentSpace};
	use crate::MemlensError;

	fn space() -> SegmentSpace {
		SegmentSpace::from_segments(vec![
			Segment::new(0x3000, vec![3; 16]),
			Segment::new(0x1000, (0_u8..16).collect()),
		])
		.expect("segments are disjoint")
	}

	#[test]
	fn reads_inside_a_segment() {
		let space = space();
		assert_eq!(space.read(0x1004, 4), Some(&[4_u8, 5, 6, 7][..]));
		assert_eq!(space.read(0x3000, 1), Some(&[3_u8][..]));
	}

	#[test]
	fn unmapped_and_straddling_reads_fail() {
		let space = space();
		assert!(space.read(0x0fff, 1).is_none());
		assert!(space.read(0x100e, 4).is_none(), "read runs off the end of the segment");
		assert!(space.read(0x2000, 1).is_none());
		assert!(!space.is_valid(0x3010, 1));
	}

	#[test]
	fn overlapping_segments_are_rejected() {
		let err = SegmentSpace::from_segments(vec![Segment::new(0x1000, vec![0; 32]), Segment::new(0x1010, vec![0; 4])])
			.expect_err("overlap must fail");
		assert!(matches!(err, MemlensError::SegmentOverlap { start: 0x1010, prev_end: 0x1020 }));
	}

	#[test]
	fn available_bytes_stop_at_segment_end() {
		let space = space();
		assert_eq!(space.read_available(0x1000, 8), 8);
		assert_eq!(space.read_available(0x100c, 64), 4);
		assert_eq!(space.read_available(0x2000, 8), 0);
	}

	#[test]
	fn mapped_len_sums_segments() {
		assert_eq!(space().mapped_len(), 32);
	}
}
