use std::borrow::Cow;

use chrono::DateTime;

use crate::image::{Profile, TypeSpec, Value, bool_token};
use crate::render::{Cell, Color, ColumnSpec, Highlight, ObjectRenderer, RenderCx, RenderOptions, RendererRegistry, Style, TextTable, Verbosity, format_address};
use crate::{MemlensError, Result};

/// Compact flag renders longer than this are elided.
pub const FLAGS_COMPACT_LIMIT: usize = 40;

/// Register every built-in renderer into `registry`.
pub(crate) fn register_builtins(registry: &mut RendererRegistry) {
	registry
		.register(DefaultObjectRenderer)
		.register(BaseObjectRenderer)
		.register(NativeRenderer)
		.register(NullRenderer)
		.register(StringRenderer)
		.register(BoolRenderer)
		.register(SetRenderer)
		.register(EnumerationRenderer)
		.register(FlagsRenderer)
		.register(PointerRenderer)
		.register(VoidRenderer::default())
		.register(ListRenderer)
		.register(StructRenderer::new())
		.register(UnixTimestampRenderer)
		.register(DatetimeRenderer);
}

/// Primitive form: the decoded value of objects, the value itself otherwise.
fn primitive<'a>(target: &Value<'a>) -> Value<'a> {
	match target {
		Value::Object(object) => object.value(),
		other => other.clone(),
	}
}

fn primitive_cell(target: &Value<'_>) -> Cell {
	Cell::new(primitive(target).to_string())
}

/// Generic fallback: the machine-readable representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObjectRenderer;

impl ObjectRenderer for DefaultObjectRenderer {
	fn claims(&self) -> Vec<&str> {
		vec![crate::render::FALLBACK_TYPE]
	}
}

/// Any object of the memory model: its primitive value.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseObjectRenderer;

impl ObjectRenderer for BaseObjectRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["BaseObject"]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		primitive_cell(target)
	}

	fn render_value(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		primitive_cell(target)
	}
}

/// Integers and other fixed-width natives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRenderer;

impl ObjectRenderer for NativeRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["NativeType"]
	}

	/// The stored value formatted as an address.
	fn render_address(&self, _cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		let raw = match target {
			Value::Object(object) => object.raw_uint(),
			other => crate::render::value_offset(other),
		};
		let cell = match raw {
			Some(raw) => Cell::new(format_address(raw, crate::render::pointer_size_of(target))),
			None => Cell::placeholder(),
		};
		cell.with_width(options.width)
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		primitive_cell(target)
	}

	fn render_value(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		primitive_cell(target)
	}
}

/// The null sentinel: `-` at every verbosity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl ObjectRenderer for NullRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["NoneObject", "NoneType"]
	}

	fn render_address(&self, _cx: &RenderCx<'_>, _target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Cell::placeholder()
	}

	fn render_full(&self, _cx: &RenderCx<'_>, _target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Cell::placeholder()
	}

	fn render_value(&self, _cx: &RenderCx<'_>, _target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Cell::placeholder()
	}

	fn render_row(&self, _cx: &RenderCx<'_>, _target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Cell::placeholder()
	}
}

/// Text up to the first NUL.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringRenderer;

impl StringRenderer {
	fn text(target: &Value<'_>) -> Cell {
		let text = match primitive(target) {
			Value::Str(text) => text,
			Value::Null(_) => String::new(),
			other => other.to_string(),
		};
		Cell::new(text.split('\0').next().unwrap_or_default())
	}
}

impl ObjectRenderer for StringRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["String", "str"]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Self::text(target)
	}

	fn render_compact(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Self::text(target)
	}

	fn render_value(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Self::text(target)
	}
}

/// `True`/`False` highlighted green/red; memory booleans by truthiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolRenderer;

impl BoolRenderer {
	fn token(target: &Value<'_>) -> Cell {
		let value = match target {
			Value::Object(object) => match object.value() {
				Value::Null(_) => return Cell::placeholder(),
				decoded => decoded.truthy(),
			},
			other => other.truthy(),
		};
		let color = if value { Color::Green } else { Color::Red };
		Cell::new(bool_token(value)).with_highlight(Highlight::whole(color))
	}
}

impl ObjectRenderer for BoolRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["bool", "Bool"]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Self::token(target)
	}

	fn render_compact(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Self::token(target)
	}

	fn render_value(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Self::token(target)
	}
}

/// `{a, b, c}` from each element's repr.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetRenderer;

impl ObjectRenderer for SetRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["set"]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		let Value::Set(items) = target else {
			return Cell::new(target.repr());
		};
		let items: Vec<String> = items.iter().map(Value::repr).collect();
		Cell::new(format!("{{{}}}", items.join(", ")))
	}
}

/// Symbolic label for an integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerationRenderer;

impl EnumerationRenderer {
	/// Choice for the value's textual form, else the default, else `UNKNOWN (<value>)`.
	///
	/// An empty label, in `choices` or as the default, counts as missing.
	fn label(target: &Value<'_>) -> Cell {
		let Some(TypeSpec::Enumeration { choices, default, .. }) = target.as_object().map(|object| object.type_spec()) else {
			return primitive_cell(target);
		};
		let key = match primitive(target) {
			Value::Null(_) => return Cell::placeholder(),
			decoded => decoded.to_string(),
		};
		let label = choices
			.get(&key)
			.filter(|label| !label.is_empty())
			.or_else(|| default.as_ref().filter(|label| !label.is_empty()))
			.cloned()
			.unwrap_or_else(|| format!("UNKNOWN ({key})"));
		Cell::new(label)
	}
}

impl ObjectRenderer for EnumerationRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["Enumeration"]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Self::label(target)
	}

	fn render_compact(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Self::label(target)
	}

	fn render_value(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		primitive_cell(target)
	}
}

/// Names of the set bits of a mask map.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagsRenderer;

impl FlagsRenderer {
	/// Set flag names sorted by name; `None` when the value is unreadable.
	pub fn names(target: &Value<'_>) -> Option<Vec<String>> {
		let object = target.as_object()?;
		let TypeSpec::Flags { maskmap, .. } = object.type_spec() else {
			return None;
		};
		let raw = object.raw_uint()?;
		Some(maskmap.iter().filter(|(_, mask)| raw & **mask != 0).map(|(name, _)| name.clone()).collect())
	}
}

impl ObjectRenderer for FlagsRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["Flags"]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		match Self::names(target) {
			Some(names) => Cell::new(names.join(", ")),
			None => Cell::placeholder(),
		}
	}

	fn render_compact(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		let full = self.render_full(cx, target, options);
		let Some(first) = full.first_line() else {
			return Cell::placeholder();
		};
		if first.chars().count() > FLAGS_COMPACT_LIMIT {
			let mut elided: String = first.chars().take(FLAGS_COMPACT_LIMIT - 1).collect();
			elided.push('…');
			return Cell::new(elided);
		}
		Cell::new(first)
	}

	fn render_value(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		primitive_cell(target)
	}
}

/// Pointers: full delegates to the target's renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerRenderer;

impl ObjectRenderer for PointerRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["Pointer"]
	}

	fn render_address(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		NativeRenderer.render_address(cx, target, options)
	}

	fn render_value(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		NativeRenderer.render_address(cx, target, options)
	}

	fn render_full(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		let Some(object) = target.as_object() else {
			return primitive_cell(target);
		};
		let pointee = object.deref();
		if pointee.is_null() {
			return Cell::placeholder();
		}
		cx.delegate(&pointee, Verbosity::Full, options)
	}

	fn render_compact(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		let target_type = match target.as_object().map(|object| object.type_spec()) {
			Some(TypeSpec::Pointer { target }) => target.type_name().into_owned(),
			_ => "void".to_owned(),
		};
		let addr = self.render_address(cx, target, &RenderOptions { width: None, ..options.clone() });
		Cell::new(format!("({target_type} *) {addr}"))
	}
}

/// Untyped pointers; address and value reuse the pointer renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidRenderer {
	pointer: PointerRenderer,
}

impl ObjectRenderer for VoidRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["Void"]
	}

	fn render_address(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		self.pointer.render_address(cx, target, options)
	}

	fn render_value(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		self.pointer.render_value(cx, target, options)
	}

	fn render_full(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		let addr = self.pointer.render_address(cx, target, &RenderOptions { width: None, ..options.clone() });
		Cell::new(format!("(void *) {addr}"))
	}

	fn render_compact(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		self.render_full(cx, target, options)
	}
}

/// Lists, tuples and inline arrays as one comma-joined line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRenderer;

impl ListRenderer {
	fn joined(cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		let items: Cow<'_, [Value<'_>]> = match target {
			Value::List(items) | Value::Tuple(items) => Cow::Borrowed(items.as_slice()),
			Value::Object(object) => Cow::Owned(object.elements().into_iter().map(Value::Object).collect()),
			other => Cow::Owned(vec![other.clone()]),
		};
		let item_options = RenderOptions { width: None, ..options.clone() };
		let parts: Vec<String> = items.iter().map(|item| cx.delegate(item, Verbosity::Row, &item_options).lines().join("\\n")).collect();
		Cell::new(parts.join(", ")).with_width(options.width)
	}
}

impl ObjectRenderer for ListRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["list", "tuple", "Array"]
	}

	fn render_full(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		Self::joined(cx, target, options)
	}

	fn render_row(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		Self::joined(cx, target, options)
	}
}

/// Structs: member listing in full, configured columns in compact.
#[derive(Debug, Clone)]
pub struct StructRenderer {
	type_id: String,
	table: Option<TextTable>,
}

impl Default for StructRenderer {
	fn default() -> Self {
		Self::new()
	}
}

impl StructRenderer {
	/// Generic renderer for every struct; compact renders the repr.
	pub fn new() -> Self {
		Self {
			type_id: "Struct".to_owned(),
			table: None,
		}
	}

	/// Renderer for struct `struct_name` whose compact form is a column row.
	///
	/// Every column's field must resolve as a member path of the struct.
	pub fn with_columns(profile: &Profile, struct_name: &str, columns: Vec<ColumnSpec>) -> Result<Self> {
		profile.struct_layout(struct_name)?;
		for column in &columns {
			profile.member_path(struct_name, &column.field).map_err(|err| match err {
				MemlensError::UnknownMember { .. } | MemlensError::UnknownStruct { .. } => MemlensError::UnknownColumnField {
					label: column.label.clone(),
					field: column.field.clone(),
					struct_name: struct_name.to_owned(),
				},
				other => other,
			})?;
		}

		Ok(Self {
			type_id: struct_name.to_owned(),
			table: Some(TextTable::new(columns).with_pointer_size(profile.pointer_size)),
		})
	}

	/// Configured column table, if any.
	pub fn table(&self) -> Option<&TextTable> {
		self.table.as_ref()
	}
}

impl ObjectRenderer for StructRenderer {
	fn claims(&self) -> Vec<&str> {
		vec![self.type_id.as_str()]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		let Some(object) = target.as_object() else {
			return Cell::new(target.repr());
		};

		let members = object.members();
		let name_width = members.iter().map(|(_, name)| name.chars().count()).max().unwrap_or(0);
		let mut fields: Vec<(u64, &str, String)> = members
			.into_iter()
			.map(|(offset, name)| {
				let decoded = object.member(name);
				let shown = if decoded.is_null() { object.m(name) } else { decoded };
				(offset, name, shown.repr())
			})
			.collect();
		fields.sort();

		let mut lines = Vec::with_capacity(fields.len() + 1);
		lines.push(object.repr());
		lines.extend(fields.iter().map(|(offset, name, repr)| format!("  0x{offset:02X} {name:<name_width$} {repr}")));
		Cell::from_lines(lines)
	}

	fn render_compact(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		let (Some(table), Some(object)) = (&self.table, target.as_object()) else {
			return Cell::new(target.repr());
		};
		let values: Vec<Value<'_>> = table.columns().iter().map(|column| object.member_path(&column.field)).collect();
		table.row(cx, &values, options)
	}

	fn render_header(&self, _cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		match (&self.table, options.style.unwrap_or_else(|| self.default_style())) {
			(Some(table), Style::Compact) => table.header(),
			_ => Cell::new(target.type_chain().first().copied().unwrap_or("Struct")),
		}
	}
}

/// Seconds since the epoch as a UTC calendar time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixTimestampRenderer;

impl UnixTimestampRenderer {
	fn stamp(target: &Value<'_>, options: &RenderOptions) -> Cell {
		if options.details {
			return Cell::new(target.repr());
		}
		let formatted = primitive(target)
			.as_i128()
			.and_then(|secs| i64::try_from(secs).ok())
			.and_then(|secs| DateTime::from_timestamp(secs, 0));
		match formatted {
			Some(stamp) => Cell::new(stamp.format("%Y-%m-%d %H:%M:%SZ").to_string()),
			None => Cell::placeholder(),
		}
	}
}

impl ObjectRenderer for UnixTimestampRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["UnixTimeStamp"]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		Self::stamp(target, options)
	}

	fn render_compact(&self, _cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		Self::stamp(target, options)
	}

	fn render_value(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		primitive_cell(target)
	}

	fn render_row(&self, _cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		Self::stamp(target, options)
	}
}

/// Calendar timestamps with their UTC offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatetimeRenderer;

impl ObjectRenderer for DatetimeRenderer {
	fn claims(&self) -> Vec<&str> {
		vec!["datetime"]
	}

	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		match target {
			Value::DateTime(stamp) => Cell::new(stamp.format("%Y-%m-%d %H:%M:%S%z").to_string()),
			other => Cell::new(other.to_string()),
		}
	}

	fn render_row(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		self.render_full(cx, target, options)
	}
}
