use std::cell::Cell as Counter;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::image::Value;
use crate::render::Cell;
use crate::render::builtin::{self, DefaultObjectRenderer};

/// Type identifier every resolution falls back to.
pub const FALLBACK_TYPE: &str = "object";

/// How much detail one render call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
	/// The value's location.
	Address,
	/// Everything the renderer knows.
	Full,
	/// One short line.
	Compact,
	/// Raw value form.
	Value,
	/// Table row form, chosen by [`RenderOptions::style`].
	Row,
}

/// Verbosity a row render resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
	/// Row renders as address.
	Address,
	/// Row renders as full.
	Full,
	/// Row renders as compact.
	Compact,
	/// Row renders as value.
	Value,
}

impl FromStr for Verbosity {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"address" => Ok(Self::Address),
			"full" => Ok(Self::Full),
			"compact" => Ok(Self::Compact),
			"value" => Ok(Self::Value),
			"row" => Ok(Self::Row),
			other => Err(format!("unknown verbosity {other:?}")),
		}
	}
}

impl fmt::Display for Verbosity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Address => "address",
			Self::Full => "full",
			Self::Compact => "compact",
			Self::Value => "value",
			Self::Row => "row",
		})
	}
}

/// Per-call render configuration threaded through every renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
	/// Verbosity used by row renders; the renderer's default when unset.
	pub style: Option<Style>,
	/// Show full detail where a renderer distinguishes it.
	pub details: bool,
	/// Output width hint.
	pub width: Option<usize>,
	/// Maximum nested delegation depth before rendering `-`.
	pub max_depth: usize,
}

impl Default for RenderOptions {
	fn default() -> Self {
		Self {
			style: None,
			details: false,
			width: None,
			max_depth: 256,
		}
	}
}

impl RenderOptions {
	/// Preset used for detailed single-object inspection.
	pub fn detailed() -> Self {
		Self {
			style: Some(Style::Full),
			details: true,
			..Self::default()
		}
	}

	/// Same options with a different row style.
	pub fn with_style(mut self, style: Style) -> Self {
		self.style = Some(style);
		self
	}
}

/// Formatting rules for one family of types.
///
/// Every verbosity has a default so a renderer only overrides what differs:
/// value and compact fall back to full, address formats the value's offset,
/// and row dispatches on the options' style.
pub trait ObjectRenderer {
	/// Type identifiers this renderer claims.
	fn claims(&self) -> Vec<&str>;

	/// Style used by row renders when the options carry none.
	fn default_style(&self) -> Style {
		Style::Compact
	}

	/// Location of the value.
	fn render_address(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		match value_offset(target) {
			Some(offset) => Cell::new(format_address(offset, pointer_size_of(target))),
			None => Cell::placeholder(),
		}
	}

	/// Everything the renderer knows.
	fn render_full(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Cell::new(target.repr())
	}

	/// One short line.
	fn render_compact(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		self.render_full(cx, target, options)
	}

	/// Raw value form.
	fn render_value(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		self.render_full(cx, target, options)
	}

	/// Table row form.
	fn render_row(&self, cx: &RenderCx<'_>, target: &Value<'_>, options: &RenderOptions) -> Cell {
		match options.style.unwrap_or_else(|| self.default_style()) {
			Style::Address => self.render_address(cx, target, options),
			Style::Full => self.render_full(cx, target, options),
			Style::Compact => self.render_compact(cx, target, options),
			Style::Value => self.render_value(cx, target, options),
		}
	}

	/// Column header for values of this kind.
	fn render_header(&self, _cx: &RenderCx<'_>, target: &Value<'_>, _options: &RenderOptions) -> Cell {
		Cell::new(target.type_chain().first().copied().unwrap_or(FALLBACK_TYPE))
	}
}

/// Type identifier to renderer map with most-specific-first resolution.
pub struct RendererRegistry {
	renderers: HashMap<String, Arc<dyn ObjectRenderer>>,
	fallback: Arc<dyn ObjectRenderer>,
}

impl Default for RendererRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

impl RendererRegistry {
	/// Create a registry holding only the generic fallback.
	pub fn new() -> Self {
		Self {
			renderers: HashMap::new(),
			fallback: Arc::new(DefaultObjectRenderer),
		}
	}

	/// Create a registry with every built-in renderer.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		builtin::register_builtins(&mut registry);
		registry
	}

	/// Claim the renderer's type identifiers; later claims win.
	pub fn register(&mut self, renderer: impl ObjectRenderer + 'static) -> &mut Self {
		let renderer: Arc<dyn ObjectRenderer> = Arc::new(renderer);
		for type_id in renderer.claims() {
			if self.renderers.insert(type_id.to_owned(), Arc::clone(&renderer)).is_some() {
				log::debug!("renderer for {type_id} overridden by later registration");
			}
		}
		self
	}

	/// Whether some renderer claims `type_id`.
	pub fn is_registered(&self, type_id: &str) -> bool {
		self.renderers.contains_key(type_id)
	}

	/// First renderer claiming an identifier of `chain`, else the fallback.
	pub fn resolve(&self, chain: &[&str]) -> &dyn ObjectRenderer {
		chain
			.iter()
			.chain(std::iter::once(&FALLBACK_TYPE))
			.find_map(|type_id| self.renderers.get(*type_id))
			.unwrap_or(&self.fallback)
			.as_ref()
	}

	/// Render `value` at `verbosity`.
	pub fn render(&self, value: &Value<'_>, verbosity: Verbosity, options: &RenderOptions) -> Cell {
		RenderCx::new(self).render(value, verbosity, options)
	}

	/// Header cell for values shaped like `value`.
	pub fn render_header(&self, value: &Value<'_>, options: &RenderOptions) -> Cell {
		let cx = RenderCx::new(self);
		self.resolve(&value.type_chain()).render_header(&cx, value, options)
	}
}

/// Per-call render state: the registry plus the delegation depth.
pub struct RenderCx<'r> {
	registry: &'r RendererRegistry,
	depth: Counter<usize>,
	overflowed: Counter<bool>,
}

impl<'r> RenderCx<'r> {
	/// Start a render call against `registry`.
	pub fn new(registry: &'r RendererRegistry) -> Self {
		Self {
			registry,
			depth: Counter::new(0),
			overflowed: Counter::new(false),
		}
	}

	/// Registry renderers resolve through.
	pub fn registry(&self) -> &'r RendererRegistry {
		self.registry
	}

	/// Current delegation depth.
	pub fn depth(&self) -> usize {
		self.depth.get()
	}

	/// Resolve and render `value` at the current depth.
	pub fn render(&self, value: &Value<'_>, verbosity: Verbosity, options: &RenderOptions) -> Cell {
		let renderer = self.registry.resolve(&value.type_chain());
		dispatch(renderer, self, value, verbosity, options)
	}

	/// Render a nested value one level deeper; `-` past `max_depth`.
	pub fn delegate(&self, value: &Value<'_>, verbosity: Verbosity, options: &RenderOptions) -> Cell {
		let depth = self.depth.get();
		if depth >= options.max_depth {
			if !self.overflowed.replace(true) {
				log::warn!("render depth limit {} reached; nested values render as '-'", options.max_depth);
			}
			return Cell::placeholder();
		}

		self.depth.set(depth + 1);
		let cell = self.render(value, verbosity, options);
		self.depth.set(depth);
		cell
	}
}

/// Invoke one verbosity of `renderer`.
pub fn dispatch(renderer: &dyn ObjectRenderer, cx: &RenderCx<'_>, value: &Value<'_>, verbosity: Verbosity, options: &RenderOptions) -> Cell {
	match verbosity {
		Verbosity::Address => renderer.render_address(cx, value, options),
		Verbosity::Full => renderer.render_full(cx, value, options),
		Verbosity::Compact => renderer.render_compact(cx, value, options),
		Verbosity::Value => renderer.render_value(cx, value, options),
		Verbosity::Row => renderer.render_row(cx, value, options),
	}
}

/// Hex address zero-padded to the pointer width (`0x` plus two digits per byte).
pub fn format_address(addr: u64, pointer_size: usize) -> String {
	let width = 2 + 2 * pointer_size;
	format!("{addr:#0width$x}")
}

/// Offset of an object, or the integer itself for plain integers.
pub fn value_offset(value: &Value<'_>) -> Option<u64> {
	match value {
		Value::Object(object) => Some(object.offset()),
		Value::UInt(value) => Some(*value),
		Value::Int(value) => u64::try_from(*value).ok(),
		_ => None,
	}
}

/// Pointer width of the profile behind `value`; 8 for plain values.
pub fn pointer_size_of(value: &Value<'_>) -> usize {
	value.as_object().map_or(8, |object| object.pointer_size())
}
