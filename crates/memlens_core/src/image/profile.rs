use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{MemlensError, Result};

/// Byte order of integers stored in the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
	/// Least significant byte first.
	#[default]
	Little,
	/// Most significant byte first.
	Big,
}

/// Struct layouts and constant addresses for one kernel build.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
	/// Size of a native pointer in bytes.
	#[serde(default = "default_pointer_size")]
	pub pointer_size: usize,
	/// Byte order of the image.
	#[serde(default)]
	pub endianness: Endianness,
	/// Symbol name to virtual address.
	#[serde(default, deserialize_with = "deserialize_constants")]
	pub constants: BTreeMap<String, u64>,
	/// Struct name to layout.
	#[serde(default)]
	pub structs: BTreeMap<String, StructLayout>,
}

/// Layout of one struct.
#[derive(Debug, Clone, Deserialize)]
pub struct StructLayout {
	/// Total size in bytes.
	pub size: u64,
	/// Member name to placement.
	pub members: BTreeMap<String, MemberLayout>,
}

/// Placement of one member inside its struct.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberLayout {
	/// Byte offset from the start of the struct.
	pub offset: u64,
	/// Member type.
	#[serde(rename = "type")]
	pub ty: TypeSpec,
}

/// Type of a member or of a standalone object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpec {
	/// Fixed-width integer.
	Int {
		/// Width in bytes.
		size: usize,
		/// Two's complement when set.
		#[serde(default)]
		signed: bool,
	},
	/// Integer interpreted by truthiness.
	Bool {
		/// Width in bytes.
		#[serde(default = "default_bool_size")]
		size: usize,
	},
	/// Fixed-capacity character buffer.
	String {
		/// Capacity in bytes.
		length: usize,
	},
	/// Native pointer to `target`.
	Pointer {
		/// Pointee type.
		target: Box<TypeSpec>,
	},
	/// Untyped pointee.
	Void,
	/// Named struct from the profile.
	Struct {
		/// Struct name.
		name: String,
	},
	/// Inline array.
	Array {
		/// Element count.
		count: usize,
		/// Element type.
		target: Box<TypeSpec>,
	},
	/// Integer with symbolic labels.
	Enumeration {
		/// Width in bytes.
		size: usize,
		/// Two's complement when set; choices are keyed by the signed value.
		#[serde(default)]
		signed: bool,
		/// Textual value to label.
		choices: BTreeMap<String, String>,
		/// Label used when no choice matches.
		#[serde(default)]
		default: Option<String>,
	},
	/// Integer whose bits carry named flags.
	Flags {
		/// Width in bytes.
		size: usize,
		/// Flag name to mask.
		maskmap: BTreeMap<String, u64>,
	},
	/// Seconds since the Unix epoch.
	UnixTimestamp {
		/// Width in bytes.
		#[serde(default = "default_timestamp_size")]
		size: usize,
	},
}

impl TypeSpec {
	/// Shorthand for a named struct type.
	pub fn struct_named(name: impl Into<String>) -> Self {
		Self::Struct { name: name.into() }
	}

	/// Shorthand for a pointer to `target`.
	pub fn pointer_to(target: TypeSpec) -> Self {
		Self::Pointer { target: Box::new(target) }
	}

	/// Human-readable type name used in reprs and compact pointer output.
	pub fn type_name(&self) -> Cow<'_, str> {
		match self {
			Self::Int { size, signed: true } => Cow::Owned(format!("int{}", size * 8)),
			Self::Int { size, signed: false } => Cow::Owned(format!("uint{}", size * 8)),
			Self::Bool { .. } => Cow::Borrowed("Bool"),
			Self::String { .. } => Cow::Borrowed("String"),
			Self::Pointer { .. } => Cow::Borrowed("Pointer"),
			Self::Void => Cow::Borrowed("void"),
			Self::Struct { name } => Cow::Borrowed(name.as_str()),
			Self::Array { .. } => Cow::Borrowed("Array"),
			Self::Enumeration { .. } => Cow::Borrowed("Enumeration"),
			Self::Flags { .. } => Cow::Borrowed("Flags"),
			Self::UnixTimestamp { .. } => Cow::Borrowed("UnixTimeStamp"),
		}
	}

	/// Byte size of one value of this type, when known.
	pub fn size(&self, profile: &Profile) -> Option<u64> {
		match self {
			Self::Int { size, .. }
			| Self::Bool { size }
			| Self::Enumeration { size, .. }
			| Self::Flags { size, .. }
			| Self::UnixTimestamp { size } => Some(*size as u64),
			Self::String { length } => Some(*length as u64),
			Self::Pointer { .. } => Some(profile.pointer_size as u64),
			Self::Void => Some(0),
			Self::Struct { name } => profile.structs.get(name).map(|layout| layout.size),
			Self::Array { count, target } => target.size(profile)?.checked_mul(*count as u64),
		}
	}
}

impl Profile {
	/// Create an empty profile.
	pub fn new(pointer_size: usize, endianness: Endianness) -> Self {
		Self {
			pointer_size,
			endianness,
			constants: BTreeMap::new(),
			structs: BTreeMap::new(),
		}
	}

	/// Parse and validate a JSON profile.
	pub fn from_json_str(text: &str) -> Result<Self> {
		let profile: Self = serde_json::from_str(text)?;
		profile.validate()?;
		Ok(profile)
	}

	/// Read, parse and validate a JSON profile from disk.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let text = fs::read_to_string(path.as_ref())?;
		let profile = Self::from_json_str(&text)?;
		log::info!(
			"loaded profile {} ({} structs, {} constants)",
			path.as_ref().display(),
			profile.structs.len(),
			profile.constants.len()
		);
		Ok(profile)
	}

	/// Add a struct layout, replacing any previous one with the same name.
	pub fn with_struct(mut self, name: impl Into<String>, layout: StructLayout) -> Self {
		self.structs.insert(name.into(), layout);
		self
	}

	/// Add a constant address.
	pub fn with_constant(mut self, name: impl Into<String>, addr: u64) -> Self {
		self.constants.insert(name.into(), addr);
		self
	}

	/// Check pointer size, integer widths, struct references and member bounds.
	///
	/// Pointer targets may name structs the profile does not carry; dereferencing
	/// those yields the null sentinel instead.
	pub fn validate(&self) -> Result<()> {
		if !matches!(self.pointer_size, 4 | 8) {
			return Err(MemlensError::UnsupportedPointerSize { size: self.pointer_size });
		}

		for (struct_name, layout) in &self.structs {
			for (member, placement) in &layout.members {
				self.validate_type(&placement.ty)?;
				let size = placement.ty.size(self).ok_or_else(|| MemlensError::UnknownStruct {
					name: placement.ty.type_name().into_owned(),
				})?;
				let end = placement.offset.saturating_add(size);
				if end > layout.size {
					return Err(MemlensError::MemberOutOfBounds {
						struct_name: struct_name.clone(),
						member: member.clone(),
						end,
						size: layout.size,
					});
				}
			}
		}
		Ok(())
	}

	fn validate_type(&self, ty: &TypeSpec) -> Result<()> {
		match ty {
			TypeSpec::Int { size, .. }
			| TypeSpec::Bool { size }
			| TypeSpec::Enumeration { size, .. }
			| TypeSpec::Flags { size, .. }
			| TypeSpec::UnixTimestamp { size } => {
				if matches!(size, 1 | 2 | 4 | 8) {
					Ok(())
				} else {
					Err(MemlensError::UnsupportedIntSize { size: *size })
				}
			}
			TypeSpec::Struct { name } => self.struct_layout(name).map(|_| ()),
			TypeSpec::Array { target, .. } => self.validate_type(target),
			TypeSpec::Pointer { .. } | TypeSpec::Void | TypeSpec::String { .. } => Ok(()),
		}
	}

	/// Look up a struct layout.
	pub fn struct_layout(&self, name: &str) -> Result<&StructLayout> {
		self.structs.get(name).ok_or_else(|| MemlensError::UnknownStruct { name: name.to_owned() })
	}

	/// Look up a constant address.
	pub fn constant(&self, name: &str) -> Option<u64> {
		self.constants.get(name).copied()
	}

	/// Resolve a dotted member path (`mkobj.kobj`) to its offset and type.
	pub fn member_path(&self, struct_name: &str, path: &str) -> Result<(u64, &TypeSpec)> {
		let mut layout = self.struct_layout(struct_name)?;
		let mut current_struct = struct_name;
		let mut offset = 0_u64;
		let mut ty: Option<&TypeSpec> = None;

		for step in path.split('.') {
			if let Some(TypeSpec::Struct { name }) = ty {
				layout = self.struct_layout(name)?;
				current_struct = name.as_str();
			} else if ty.is_some() {
				return Err(MemlensError::UnknownMember {
					struct_name: current_struct.to_owned(),
					member: step.to_owned(),
				});
			}

			let placement = layout.members.get(step).ok_or_else(|| MemlensError::UnknownMember {
				struct_name: current_struct.to_owned(),
				member: step.to_owned(),
			})?;
			offset = offset.saturating_add(placement.offset);
			ty = Some(&placement.ty);
		}

		ty.map(|ty| (offset, ty)).ok_or_else(|| MemlensError::UnknownMember {
			struct_name: struct_name.to_owned(),
			member: path.to_owned(),
		})
	}
}

impl StructLayout {
	/// Create a layout of `size` bytes with no members.
	pub fn new(size: u64) -> Self {
		Self {
			size,
			members: BTreeMap::new(),
		}
	}

	/// Add a member placement.
	pub fn member(mut self, name: impl Into<String>, offset: u64, ty: TypeSpec) -> Self {
		self.members.insert(name.into(), MemberLayout { offset, ty });
		self
	}
}

fn default_pointer_size() -> usize {
	8
}

fn default_bool_size() -> usize {
	1
}

fn default_timestamp_size() -> usize {
	4
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressLiteral {
	Number(u64),
	Text(String),
}

fn deserialize_constants<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, u64>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = BTreeMap::<String, AddressLiteral>::deserialize(deserializer)?;
	raw.into_iter()
		.map(|(name, literal)| match literal {
			AddressLiteral::Number(addr) => Ok((name, addr)),
			AddressLiteral::Text(text) => parse_address(&text)
				.map(|addr| (name, addr))
				.ok_or_else(|| D::Error::custom(format!("invalid address literal {text:?}"))),
		})
		.collect()
}

/// Parse decimal or `0x`-prefixed hex address literal.
pub fn parse_address(value: &str) -> Option<u64> {
	if let Some(stripped) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
		u64::from_str_radix(&stripped.replace('_', ""), 16).ok()
	} else {
		value.parse::<u64>().ok()
	}
}
