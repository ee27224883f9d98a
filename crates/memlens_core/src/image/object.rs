use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::image::bytes::Cursor;
use crate::image::{AddressSpace, Profile, TypeSpec};
use crate::{MemlensError, Result};

/// Profile and address space pair every object handle borrows.
#[derive(Clone, Copy)]
pub struct Memory<'a> {
	/// Struct layouts and constants.
	pub profile: &'a Profile,
	/// Backing bytes.
	pub space: &'a dyn AddressSpace,
}

impl<'a> Memory<'a> {
	/// Pair a profile with an address space.
	pub fn new(profile: &'a Profile, space: &'a dyn AddressSpace) -> Self {
		Self { profile, space }
	}

	/// View `offset` as an object of type `ty`.
	pub fn object(&self, ty: TypeSpec, offset: u64) -> Object<'a> {
		Object {
			mem: *self,
			ty: Cow::Owned(ty),
			offset,
			name: Cow::Borrowed(""),
		}
	}

	/// View `offset` as struct `name`, failing when the profile lacks it.
	pub fn struct_at(&self, name: &str, offset: u64) -> Result<Object<'a>> {
		self.profile.struct_layout(name)?;
		Ok(self.object(TypeSpec::struct_named(name), offset))
	}

	/// View the address of constant `name` as struct `ty`.
	///
	/// Returns `Ok(None)` when the profile does not carry the constant.
	pub fn constant_object(&self, name: &str, ty: &str) -> Result<Option<Object<'a>>> {
		let Some(addr) = self.profile.constant(name) else {
			return Ok(None);
		};
		let object = self.struct_at(ty, addr)?.named(name.to_owned());
		Ok(Some(object))
	}

	/// Recover the `container` struct embedding `member` at dotted `path`.
	///
	/// Works purely from offsets: the container does not need to be reachable
	/// from any list for this to succeed.
	pub fn container_of(&self, member: &Object<'_>, container: &str, path: &str) -> Result<Object<'a>> {
		let (member_offset, _) = self.profile.member_path(container, path)?;
		let offset = member.offset.wrapping_sub(member_offset);
		self.struct_at(container, offset)
	}
}

/// Typed view over bytes at a known offset.
#[derive(Clone)]
pub struct Object<'a> {
	mem: Memory<'a>,
	ty: Cow<'a, TypeSpec>,
	offset: u64,
	name: Cow<'a, str>,
}

/// Identity of an object: its address and type name.
pub type ObjectKey = (u64, String);

impl<'a> Object<'a> {
	/// Attach a display name.
	pub fn named(mut self, name: impl Into<Cow<'a, str>>) -> Self {
		self.name = name.into();
		self
	}

	/// Memory this object lives in.
	pub fn memory(&self) -> Memory<'a> {
		self.mem
	}

	/// Declared type.
	pub fn type_spec(&self) -> &TypeSpec {
		&self.ty
	}

	/// Human-readable type name.
	pub fn type_name(&self) -> Cow<'_, str> {
		self.ty.type_name()
	}

	/// Member name this object was reached through, if any.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Byte offset in the address space.
	pub fn offset(&self) -> u64 {
		self.offset
	}

	/// Address plus type name; equal keys mean the same object.
	pub fn identity(&self) -> ObjectKey {
		(self.offset, self.type_name().into_owned())
	}

	/// Renderer type identifiers, most specific first.
	pub fn type_chain(&self) -> Vec<&str> {
		match self.ty.as_ref() {
			TypeSpec::Struct { name } => vec![name.as_str(), "Struct", "BaseObject"],
			TypeSpec::Pointer { target } if matches!(**target, TypeSpec::Void) => vec!["Void", "Pointer", "NativeType", "BaseObject"],
			TypeSpec::Pointer { .. } => vec!["Pointer", "NativeType", "BaseObject"],
			TypeSpec::Bool { .. } => vec!["Bool", "NativeType", "BaseObject"],
			TypeSpec::Enumeration { .. } => vec!["Enumeration", "NativeType", "BaseObject"],
			TypeSpec::Flags { .. } => vec!["Flags", "NativeType", "BaseObject"],
			TypeSpec::UnixTimestamp { .. } => vec!["UnixTimeStamp", "NativeType", "BaseObject"],
			TypeSpec::Int { .. } => vec!["NativeType", "BaseObject"],
			TypeSpec::String { .. } => vec!["String", "BaseObject"],
			TypeSpec::Array { .. } => vec!["Array", "BaseObject"],
			TypeSpec::Void => vec!["BaseObject"],
		}
	}

	/// Byte size, when the profile knows it.
	pub fn size(&self) -> Option<u64> {
		self.ty.size(self.mem.profile)
	}

	/// Native pointer width of the profile.
	pub fn pointer_size(&self) -> usize {
		self.mem.profile.pointer_size
	}

	/// Whether every byte of this object is mapped.
	pub fn is_readable(&self) -> bool {
		match self.ty.as_ref() {
			TypeSpec::String { .. } => self.mem.space.is_valid(self.offset, 1),
			_ => match self.size().and_then(|size| usize::try_from(size).ok()) {
				Some(size) => self.mem.space.is_valid(self.offset, size.max(1)),
				None => false,
			},
		}
	}

	fn read_uint(&self, size: usize) -> Option<u64> {
		let bytes = self.mem.space.read(self.offset, size)?;
		Cursor::new(bytes).read_uint(size, self.mem.profile.endianness).ok()
	}

	fn read_int(&self, size: usize) -> Option<i64> {
		let bytes = self.mem.space.read(self.offset, size)?;
		Cursor::new(bytes).read_int(size, self.mem.profile.endianness).ok()
	}

	/// Raw integer behind native types and pointers.
	pub fn raw_uint(&self) -> Option<u64> {
		match self.ty.as_ref() {
			TypeSpec::Int { size, .. }
			| TypeSpec::Bool { size }
			| TypeSpec::Enumeration { size, .. }
			| TypeSpec::Flags { size, .. }
			| TypeSpec::UnixTimestamp { size } => self.read_uint(*size),
			TypeSpec::Pointer { .. } => {
				let bytes = self.mem.space.read(self.offset, self.pointer_size())?;
				Cursor::new(bytes).read_ptr(self.pointer_size(), self.mem.profile.endianness).ok()
			}
			_ => None,
		}
	}

	/// Bytes of a string object up to its capacity or the end of mapped memory.
	pub fn string_bytes(&self) -> Option<&'a [u8]> {
		let TypeSpec::String { length } = self.ty.as_ref() else {
			return None;
		};
		let len = self.mem.space.read_available(self.offset, *length);
		if len == 0 {
			return None;
		}
		self.mem.space.read(self.offset, len)
	}

	/// Primitive form of the object, or the null sentinel when unreadable.
	pub fn value(&self) -> Value<'a> {
		let decoded = match self.ty.as_ref() {
			TypeSpec::Int { size, signed: true } | TypeSpec::Enumeration { size, signed: true, .. } => self.read_int(*size).map(Value::Int),
			TypeSpec::Bool { size } => self.read_uint(*size).map(|raw| Value::Bool(raw != 0)),
			TypeSpec::String { .. } => self.string_bytes().map(|bytes| Value::Str(String::from_utf8_lossy(bytes).into_owned())),
			TypeSpec::Struct { .. } | TypeSpec::Void => Some(Value::UInt(self.offset)),
			TypeSpec::Array { .. } => Some(Value::List(self.elements().iter().map(Object::value).collect())),
			_ => self.raw_uint().map(Value::UInt),
		};
		decoded.unwrap_or_else(|| Value::Null(NullObject::new(format!("unreadable {} at 0x{:x}", self.type_name(), self.offset))))
	}

	fn child(&self, select: impl Fn(&TypeSpec) -> &TypeSpec) -> Cow<'a, TypeSpec> {
		match &self.ty {
			Cow::Borrowed(ty) => Cow::Borrowed(select(*ty)),
			Cow::Owned(ty) => Cow::Owned(select(ty).clone()),
		}
	}

	/// Member names of a struct, in name order.
	pub fn member_names(&self) -> Vec<&'a str> {
		let TypeSpec::Struct { name } = self.ty.as_ref() else {
			return Vec::new();
		};
		let profile: &'a Profile = self.mem.profile;
		match profile.structs.get(name.as_str()) {
			Some(layout) => layout.members.keys().map(String::as_str).collect(),
			None => Vec::new(),
		}
	}

	/// Struct members as (offset relative to the struct, name), in name order.
	pub fn members(&self) -> Vec<(u64, &'a str)> {
		let TypeSpec::Struct { name } = self.ty.as_ref() else {
			return Vec::new();
		};
		let profile: &'a Profile = self.mem.profile;
		match profile.structs.get(name.as_str()) {
			Some(layout) => layout.members.iter().map(|(member, placement)| (placement.offset, member.as_str())).collect(),
			None => Vec::new(),
		}
	}

	/// Raw member handle; the null sentinel when the member does not exist.
	pub fn m(&self, member: &str) -> Value<'a> {
		let TypeSpec::Struct { name } = self.ty.as_ref() else {
			return Value::Null(NullObject::new(format!("{} has no members", self.type_name())));
		};
		let profile: &'a Profile = self.mem.profile;
		let Some((member_name, placement)) = profile.structs.get(name.as_str()).and_then(|layout| layout.members.get_key_value(member)) else {
			return Value::Null(NullObject::new(format!("{name} has no member {member}")));
		};

		Value::Object(Object {
			mem: self.mem,
			ty: Cow::Borrowed(&placement.ty),
			offset: self.offset.wrapping_add(placement.offset),
			name: Cow::Borrowed(member_name.as_str()),
		})
	}

	/// Decoded member; the null sentinel when missing or unreadable.
	pub fn member(&self, member: &str) -> Value<'a> {
		match self.m(member) {
			Value::Object(object) if !object.is_readable() => Value::Null(NullObject::new(format!("member {member} unreadable at 0x{:x}", object.offset))),
			other => other,
		}
	}

	/// Follow a dotted path of decoded members (`kref.refcount.counter`).
	pub fn member_path(&self, path: &str) -> Value<'a> {
		let mut current = Value::Object(self.clone());
		for step in path.split('.') {
			current = match current {
				Value::Object(object) => object.member(step),
				null @ Value::Null(_) => return null,
				_ => return Value::Null(NullObject::new(format!("cannot descend into {step}"))),
			};
		}
		current
	}

	/// Dereference a pointer; the null sentinel for NULL, void, or unmapped targets.
	pub fn deref(&self) -> Value<'a> {
		let TypeSpec::Pointer { target } = self.ty.as_ref() else {
			return Value::Null(NullObject::new(format!("{} is not a pointer", self.type_name())));
		};
		if matches!(**target, TypeSpec::Void) {
			return Value::Null(NullObject::new("void pointer"));
		}
		let Some(addr) = self.raw_uint() else {
			return Value::Null(NullObject::new(format!("unreadable pointer at 0x{:x}", self.offset)));
		};
		if addr == 0 {
			return Value::Null(NullObject::new("null pointer"));
		}

		let target = Object {
			mem: self.mem,
			ty: self.child(|ty| match ty {
				TypeSpec::Pointer { target } => target.as_ref(),
				other => other,
			}),
			offset: addr,
			name: self.name.clone(),
		};
		if !target.is_readable() {
			return Value::Null(NullObject::new(format!("pointer target 0x{addr:x} unreadable")));
		}
		Value::Object(target)
	}

	/// Elements of an inline array.
	pub fn elements(&self) -> Vec<Object<'a>> {
		let TypeSpec::Array { count, target } = self.ty.as_ref() else {
			return Vec::new();
		};
		let stride = target.size(self.mem.profile).unwrap_or(0);
		(0..*count)
			.map(|idx| Object {
				mem: self.mem,
				ty: self.child(|ty| match ty {
					TypeSpec::Array { target, .. } => target.as_ref(),
					other => other,
				}),
				offset: self.offset.wrapping_add(stride.wrapping_mul(idx as u64)),
				name: self.name.clone(),
			})
			.collect()
	}

	/// Reinterpret the same offset as struct `name`.
	pub fn cast(&self, name: &str) -> Result<Object<'a>> {
		self.mem.struct_at(name, self.offset)
	}

	/// Debug-style representation used by struct listings and sets.
	pub fn repr(&self) -> String {
		let name = self.name.as_ref();
		match self.ty.as_ref() {
			TypeSpec::Struct { name: type_name } if name.is_empty() => format!("[{type_name}] @ 0x{:08X}", self.offset),
			TypeSpec::Struct { name: type_name } => format!("[{type_name} {name}] @ 0x{:08X}", self.offset),
			TypeSpec::Pointer { target } => match self.raw_uint() {
				Some(addr) => format!("<{} Pointer to [0x{addr:08X}] ({name})>", target.type_name()),
				None => format!("<{} Pointer @ 0x{:08X} ({name}): unreadable>", target.type_name(), self.offset),
			},
			TypeSpec::String { .. } => match self.value() {
				Value::Str(text) => format!("[String:{name}]: {:?}", text.split('\0').next().unwrap_or("")),
				_ => format!("[String:{name}] @ 0x{:08X}: unreadable", self.offset),
			},
			TypeSpec::Array { count, target } => format!("<Array {count} x {} @ 0x{:08X}>", target.type_name(), self.offset),
			TypeSpec::Void => format!("[void {name}] @ 0x{:08X}", self.offset),
			_ => match self.value() {
				Value::Int(value) => format!("[{}:{name}]: 0x{value:08X}", self.type_name()),
				Value::UInt(value) => format!("[{}:{name}]: 0x{value:08X}", self.type_name()),
				Value::Bool(value) => format!("[{}:{name}]: {}", self.type_name(), bool_token(value)),
				_ => format!("[{}:{name}] @ 0x{:08X}: unreadable", self.type_name(), self.offset),
			},
		}
	}
}

impl fmt::Debug for Object<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.repr())
	}
}

impl PartialEq for Object<'_> {
	fn eq(&self, other: &Self) -> bool {
		self.offset == other.offset && self.ty == other.ty
	}
}

impl fmt::Display for Object<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.ty.as_ref() {
			TypeSpec::Struct { .. } | TypeSpec::Array { .. } | TypeSpec::Void => f.write_str(&self.repr()),
			TypeSpec::Pointer { .. } => match self.raw_uint() {
				Some(addr) => write!(f, "0x{addr:x}"),
				None => f.write_str("-"),
			},
			_ => fmt::Display::fmt(&self.value(), f),
		}
	}
}

/// The "absent / could not be decoded" sentinel.
///
/// Every null compares equal to every other null, whatever its reason.
#[derive(Debug, Clone)]
pub struct NullObject {
	reason: Cow<'static, str>,
}

impl NullObject {
	/// Create a null carrying a diagnostic reason.
	pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
		Self { reason: reason.into() }
	}

	/// Why the value is absent.
	pub fn reason(&self) -> &str {
		&self.reason
	}
}

impl PartialEq for NullObject {
	fn eq(&self, _: &Self) -> bool {
		true
	}
}

/// Any datum the rendering core can format.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
	/// Absent or undecodable value.
	Null(NullObject),
	/// Plain boolean.
	Bool(bool),
	/// Signed integer.
	Int(i64),
	/// Unsigned integer.
	UInt(u64),
	/// Text; may contain embedded NUL bytes.
	Str(String),
	/// Ordered sequence.
	List(Vec<Value<'a>>),
	/// Fixed ordered sequence.
	Tuple(Vec<Value<'a>>),
	/// Unordered collection.
	Set(Vec<Value<'a>>),
	/// Calendar timestamp with a UTC offset.
	DateTime(DateTime<FixedOffset>),
	/// Typed handle into a memory image.
	Object(Object<'a>),
}

impl<'a> Value<'a> {
	/// The null constant every null sentinel compares equal to.
	pub const NULL: Value<'static> = Value::Null(NullObject { reason: Cow::Borrowed("") });

	/// Null with a reason.
	pub fn null(reason: impl Into<Cow<'static, str>>) -> Self {
		Self::Null(NullObject::new(reason))
	}

	/// Whether this is the null sentinel.
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null(_))
	}

	/// Renderer type identifiers, most specific first.
	pub fn type_chain(&self) -> Vec<&str> {
		match self {
			Self::Null(_) => vec!["NoneObject", "NoneType"],
			Self::Bool(_) => vec!["bool"],
			Self::Int(_) | Self::UInt(_) => vec!["int"],
			Self::Str(_) => vec!["str", "String"],
			Self::List(_) => vec!["list"],
			Self::Tuple(_) => vec!["tuple"],
			Self::Set(_) => vec!["set"],
			Self::DateTime(_) => vec!["datetime"],
			Self::Object(object) => object.type_chain(),
		}
	}

	/// Borrow the object handle, if any.
	pub fn as_object(&self) -> Option<&Object<'a>> {
		match self {
			Self::Object(object) => Some(object),
			_ => None,
		}
	}

	/// Integer form of plain integers, booleans and native objects.
	pub fn as_i128(&self) -> Option<i128> {
		match self {
			Self::Bool(value) => Some(i128::from(*value)),
			Self::Int(value) => Some(i128::from(*value)),
			Self::UInt(value) => Some(i128::from(*value)),
			Self::Object(object) => object.value().as_i128(),
			_ => None,
		}
	}

	/// Truthiness: non-zero numbers, non-empty text and collections, any object.
	pub fn truthy(&self) -> bool {
		match self {
			Self::Null(_) => false,
			Self::Bool(value) => *value,
			Self::Int(value) => *value != 0,
			Self::UInt(value) => *value != 0,
			Self::Str(text) => !text.is_empty(),
			Self::List(items) | Self::Tuple(items) | Self::Set(items) => !items.is_empty(),
			Self::DateTime(_) => true,
			Self::Object(object) => match object.type_spec() {
				TypeSpec::Struct { .. } | TypeSpec::Array { .. } | TypeSpec::String { .. } => object.value().truthy(),
				_ => object.raw_uint().is_some_and(|raw| raw != 0),
			},
		}
	}

	/// Debug-style representation.
	pub fn repr(&self) -> String {
		match self {
			Self::Null(_) => "None".to_owned(),
			Self::Bool(value) => bool_token(*value).to_owned(),
			Self::Int(value) => value.to_string(),
			Self::UInt(value) => value.to_string(),
			Self::Str(text) => format!("{text:?}"),
			Self::List(items) => format!("[{}]", join_reprs(items)),
			Self::Tuple(items) => format!("({})", join_reprs(items)),
			Self::Set(items) => format!("{{{}}}", join_reprs(items)),
			Self::DateTime(value) => format!("datetime({})", value.to_rfc3339()),
			Self::Object(object) => object.repr(),
		}
	}
}

impl fmt::Display for Value<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null(_) => f.write_str("-"),
			Self::Bool(value) => f.write_str(bool_token(*value)),
			Self::Int(value) => write!(f, "{value}"),
			Self::UInt(value) => write!(f, "{value}"),
			Self::Str(text) => f.write_str(text),
			Self::List(items) | Self::Tuple(items) => write!(f, "[{}]", join_display(items)),
			Self::Set(items) => write!(f, "{{{}}}", join_display(items)),
			Self::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%z")),
			Self::Object(object) => fmt::Display::fmt(object, f),
		}
	}
}

impl From<bool> for Value<'_> {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for Value<'_> {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<u64> for Value<'_> {
	fn from(value: u64) -> Self {
		Self::UInt(value)
	}
}

impl From<&str> for Value<'_> {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}

impl From<String> for Value<'_> {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

impl<'a> From<Object<'a>> for Value<'a> {
	fn from(value: Object<'a>) -> Self {
		Self::Object(value)
	}
}

/// Python-style boolean token.
pub fn bool_token(value: bool) -> &'static str {
	if value { "True" } else { "False" }
}

fn join_reprs(items: &[Value<'_>]) -> String {
	items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

fn join_display(items: &[Value<'_>]) -> String {
	items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Look up a member path on `object` and fail loudly when the profile lacks it.
///
/// Used by traversals whose correctness depends on specific members existing.
pub fn require_member<'a>(object: &Object<'a>, member: &str) -> Result<Object<'a>> {
	match object.m(member) {
		Value::Object(found) => Ok(found),
		_ => Err(MemlensError::UnknownMember {
			struct_name: object.type_name().into_owned(),
			member: member.to_owned(),
		}),
	}
}
