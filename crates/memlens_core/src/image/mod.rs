mod bytes;
mod compression;
mod file;
mod list;
mod object;
mod profile;
mod space;

/// Image compression detection result.
pub use compression::Compression;
/// Memory dump abstraction.
pub use file::MemoryImage;
/// Linked-list walk types and entry points.
pub use list::{ListWalk, WalkOptions, WalkStop, WalkStopReason, list_of_type};
/// Typed object handles and renderable values.
pub use object::{Memory, NullObject, Object, ObjectKey, Value, bool_token, require_member};
/// Struct layouts, type descriptions and constants.
pub use profile::{Endianness, MemberLayout, Profile, StructLayout, TypeSpec, parse_address};
/// Address space abstraction and its segment-backed implementation.
pub use space::{AddressSpace, Segment, SegmentSpace};
