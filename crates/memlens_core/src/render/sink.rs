use std::io::Write;

use serde_json::{Map, Value as Json};

use crate::Result;
use crate::image::Value;
use crate::render::{Cell, ColumnSpec, RenderCx, RenderOptions, RendererRegistry, TextTable};

/// Table protocol: declare columns once, then stream rows.
pub trait TableSink {
	/// Declare the columns of the following rows.
	fn table_header(&mut self, columns: &[ColumnSpec]) -> Result<()>;

	/// Emit one row of rendered cells, in column order.
	fn table_row(&mut self, cells: &[Cell]) -> Result<()>;

	/// Flush anything buffered.
	fn finish(&mut self) -> Result<()> {
		Ok(())
	}
}

/// Aligned plain-text table output.
pub struct TextSink<W> {
	out: W,
	table: Option<TextTable>,
	pointer_size: usize,
}

impl<W: Write> TextSink<W> {
	/// Write to `out`, assuming 8-byte pointers for `[addrpad]` columns.
	pub fn new(out: W) -> Self {
		Self {
			out,
			table: None,
			pointer_size: 8,
		}
	}

	/// Set the pointer width used by `[addrpad]` columns.
	pub fn with_pointer_size(mut self, pointer_size: usize) -> Self {
		self.pointer_size = pointer_size;
		self
	}

	/// Recover the writer.
	pub fn into_inner(self) -> W {
		self.out
	}

	fn write_cell(&mut self, cell: &Cell) -> Result<()> {
		for line in cell.lines() {
			writeln!(self.out, "{line}")?;
		}
		Ok(())
	}
}

impl<W: Write> TableSink for TextSink<W> {
	fn table_header(&mut self, columns: &[ColumnSpec]) -> Result<()> {
		let table = TextTable::new(columns.to_vec()).with_pointer_size(self.pointer_size);
		let rule: Vec<Cell> = columns
			.iter()
			.map(|column| Cell::new("-".repeat(table.column_width(column).unwrap_or(column.label.chars().count()))))
			.collect();
		let header = table.header();
		let rule = table.layout(&rule);
		self.write_cell(&header)?;
		self.write_cell(&rule)?;
		self.table = Some(table);
		Ok(())
	}

	fn table_row(&mut self, cells: &[Cell]) -> Result<()> {
		let row = match &self.table {
			Some(table) => table.layout(cells),
			None => Cell::new(cells.iter().map(Cell::text).collect::<Vec<_>>().join(" ")),
		};
		self.write_cell(&row)
	}

	fn finish(&mut self) -> Result<()> {
		self.out.flush()?;
		Ok(())
	}
}

/// JSON array of row objects keyed by column field, written on finish.
pub struct JsonSink<W> {
	out: W,
	fields: Vec<String>,
	rows: Vec<Json>,
}

impl<W: Write> JsonSink<W> {
	/// Write to `out`.
	pub fn new(out: W) -> Self {
		Self {
			out,
			fields: Vec::new(),
			rows: Vec::new(),
		}
	}

	/// Rows collected so far.
	pub fn rows(&self) -> &[Json] {
		&self.rows
	}

	/// Recover the writer.
	pub fn into_inner(self) -> W {
		self.out
	}
}

impl<W: Write> TableSink for JsonSink<W> {
	fn table_header(&mut self, columns: &[ColumnSpec]) -> Result<()> {
		self.fields = columns.iter().map(|column| column.field.clone()).collect();
		Ok(())
	}

	fn table_row(&mut self, cells: &[Cell]) -> Result<()> {
		let mut row = Map::new();
		for (idx, cell) in cells.iter().enumerate() {
			let key = self.fields.get(idx).cloned().unwrap_or_else(|| format!("col{idx}"));
			row.insert(key, Json::String(cell.text()));
		}
		self.rows.push(Json::Object(row));
		Ok(())
	}

	fn finish(&mut self) -> Result<()> {
		serde_json::to_writer_pretty(&mut self.out, &self.rows)?;
		writeln!(self.out)?;
		self.out.flush()?;
		Ok(())
	}
}

/// Render `rows` of values through `registry` and stream them into `sink`.
///
/// `pointer_size` sizes `[addrpad]` columns; the sink is finished afterwards.
pub fn emit_table(
	registry: &RendererRegistry,
	sink: &mut dyn TableSink,
	columns: &[ColumnSpec],
	rows: &[Vec<Value<'_>>],
	pointer_size: usize,
	options: &RenderOptions,
) -> Result<()> {
	let table = TextTable::new(columns.to_vec()).with_pointer_size(pointer_size);
	let cx = RenderCx::new(registry);
	sink.table_header(columns)?;
	for values in rows {
		sink.table_row(&table.row_cells(&cx, values, options))?;
	}
	sink.finish()
}
