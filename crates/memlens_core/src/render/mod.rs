mod builtin;
mod cell;
mod registry;
mod sink;
mod table;

/// Built-in renderers for every core type family.
pub use builtin::{
	BaseObjectRenderer, BoolRenderer, DatetimeRenderer, DefaultObjectRenderer, EnumerationRenderer, FLAGS_COMPACT_LIMIT, FlagsRenderer, ListRenderer, NativeRenderer,
	NullRenderer, PointerRenderer, SetRenderer, StringRenderer, StructRenderer, UnixTimestampRenderer, VoidRenderer,
};
/// Presentation cell and highlight types.
pub use cell::{Cell, Color, Highlight};
/// Renderer trait, registry and per-call options.
pub use registry::{
	FALLBACK_TYPE, ObjectRenderer, RenderCx, RenderOptions, RendererRegistry, Style, Verbosity, dispatch, format_address, pointer_size_of, value_offset,
};
/// Table output protocol and its sinks.
pub use sink::{JsonSink, TableSink, TextSink, emit_table};
/// Column specifications and text table layout.
pub use table::{Align, ColumnHint, ColumnSpec, TextTable};
