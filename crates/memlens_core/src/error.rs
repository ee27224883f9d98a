use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, MemlensError>;

/// Errors produced while loading images and profiles or configuring renderers.
///
/// Rendering itself never fails: decode problems degrade to placeholders.
/// Only loading and construction-time configuration surface here.
#[derive(Debug, Error)]
pub enum MemlensError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// JSON could not be parsed or written.
	#[error("json: {0}")]
	Json(#[from] serde_json::Error),
	/// Not enough bytes remained for a requested read.
	#[error("unexpected eof at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Image file contained no bytes.
	#[error("memory image is empty")]
	EmptyImage,
	/// Two segments of an address space overlap.
	#[error("segment overlap: 0x{start:016x} starts before previous end 0x{prev_end:016x}")]
	SegmentOverlap {
		/// Start of the offending segment.
		start: u64,
		/// Exclusive end of the previous segment.
		prev_end: u64,
	},
	/// Profile pointer size is not 4 or 8.
	#[error("unsupported pointer size {size}")]
	UnsupportedPointerSize {
		/// Declared pointer size in bytes.
		size: usize,
	},
	/// Integer width is not 1, 2, 4 or 8 bytes.
	#[error("unsupported integer size {size}")]
	UnsupportedIntSize {
		/// Declared integer size in bytes.
		size: usize,
	},
	/// Requested or referenced struct is not in the profile.
	#[error("unknown struct: {name}")]
	UnknownStruct {
		/// Struct name.
		name: String,
	},
	/// Requested member is not part of a struct layout.
	#[error("unknown member {member} on {struct_name}")]
	UnknownMember {
		/// Struct name.
		struct_name: String,
		/// Missing member name.
		member: String,
	},
	/// Member layout does not fit into its struct.
	#[error("member {member} of {struct_name} ends at {end}, past struct size {size}")]
	MemberOutOfBounds {
		/// Struct name.
		struct_name: String,
		/// Member name.
		member: String,
		/// Exclusive end offset of the member.
		end: u64,
		/// Declared struct size.
		size: u64,
	},
	/// Requested constant is not in the profile.
	#[error("unknown constant: {name}")]
	UnknownConstant {
		/// Constant name.
		name: String,
	},
	/// A column specification names an accessor the struct does not have.
	#[error("column {label:?} names unknown field {field} on {struct_name}")]
	UnknownColumnField {
		/// Column display label.
		label: String,
		/// Accessor that failed to resolve.
		field: String,
		/// Struct the column table renders.
		struct_name: String,
	},
	/// A column format hint could not be parsed.
	#[error("invalid column format hint {hint:?}")]
	InvalidColumnHint {
		/// Original hint text.
		hint: String,
	},
	/// CLI address argument was invalid.
	#[error("invalid address literal: {value}")]
	InvalidAddressLiteral {
		/// User-provided literal.
		value: String,
	},
}
