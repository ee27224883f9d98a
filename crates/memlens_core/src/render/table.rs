use std::str::FromStr;

use serde::Serialize;

use crate::image::Value;
use crate::render::{Cell, RenderCx, RenderOptions, Verbosity};
use crate::{MemlensError, Result};

/// Horizontal alignment inside a fixed-width column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
	/// Pad on the right.
	Left,
	/// Pad on both sides.
	Center,
	/// Pad on the left.
	Right,
}

/// Parsed column format hint.
///
/// Accepted forms: `""`, `"[addrpad]"`, `"30"`, `"<30"`, `"^10"`, `">8"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnHint {
	/// Free-width column.
	Free,
	/// Address rendered and padded to the profile pointer width.
	AddrPad,
	/// Fixed width with alignment.
	Fixed {
		/// Column width in characters.
		width: usize,
		/// Alignment of shorter text.
		align: Align,
	},
}

impl FromStr for ColumnHint {
	type Err = MemlensError;

	fn from_str(hint: &str) -> Result<Self> {
		let invalid = || MemlensError::InvalidColumnHint { hint: hint.to_owned() };
		if hint.is_empty() {
			return Ok(Self::Free);
		}
		if hint == "[addrpad]" {
			return Ok(Self::AddrPad);
		}

		let (align, digits) = match hint.as_bytes()[0] {
			b'<' => (Align::Left, &hint[1..]),
			b'^' => (Align::Center, &hint[1..]),
			b'>' => (Align::Right, &hint[1..]),
			_ => (Align::Left, hint),
		};
		let width = digits.parse::<usize>().map_err(|_| invalid())?;
		Ok(Self::Fixed { width, align })
	}
}

/// One table column: display label, struct accessor and format hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
	/// Header text.
	pub label: String,
	/// Member path the column reads (`name`, `mkobj.kobj`).
	pub field: String,
	/// Layout hint.
	pub hint: ColumnHint,
}

impl ColumnSpec {
	/// Build a column, parsing its textual format hint.
	pub fn new(label: impl Into<String>, field: impl Into<String>, hint: &str) -> Result<Self> {
		Ok(Self {
			label: label.into(),
			field: field.into(),
			hint: hint.parse()?,
		})
	}
}

/// Fixed ordered column list that lays out headers and rows as text.
#[derive(Debug, Clone)]
pub struct TextTable {
	columns: Vec<ColumnSpec>,
	pointer_size: usize,
}

impl TextTable {
	/// Create a table for 8-byte pointers.
	pub fn new(columns: Vec<ColumnSpec>) -> Self {
		Self { columns, pointer_size: 8 }
	}

	/// Set the pointer width used by `[addrpad]` columns.
	pub fn with_pointer_size(mut self, pointer_size: usize) -> Self {
		self.pointer_size = pointer_size;
		self
	}

	/// Columns in display order.
	pub fn columns(&self) -> &[ColumnSpec] {
		&self.columns
	}

	/// Fixed width of `column`, if it has one.
	pub fn column_width(&self, column: &ColumnSpec) -> Option<usize> {
		match column.hint {
			ColumnHint::Free => None,
			ColumnHint::AddrPad => Some(2 + 2 * self.pointer_size),
			ColumnHint::Fixed { width, .. } => Some(width),
		}
	}

	/// Header row of column labels.
	pub fn header(&self) -> Cell {
		let labels: Vec<Cell> = self.columns.iter().map(|column| Cell::new(&column.label)).collect();
		self.layout(&labels)
	}

	/// Render one record: `values` in column order, through the registry.
	///
	/// `[addrpad]` columns use the address verbosity; all others use row.
	pub fn row_cells(&self, cx: &RenderCx<'_>, values: &[Value<'_>], options: &RenderOptions) -> Vec<Cell> {
		self.columns
			.iter()
			.zip(values)
			.map(|(column, value)| {
				let width = self.column_width(column);
				let verbosity = match column.hint {
					ColumnHint::AddrPad => Verbosity::Address,
					_ => Verbosity::Row,
				};
				let column_options = RenderOptions { width, ..options.clone() };
				cx.delegate(value, verbosity, &column_options).with_width(width)
			})
			.collect()
	}

	/// Render one record and lay it out as a single text cell.
	pub fn row(&self, cx: &RenderCx<'_>, values: &[Value<'_>], options: &RenderOptions) -> Cell {
		self.layout(&self.row_cells(cx, values, options))
	}

	/// Lay out pre-rendered cells side by side; multi-line cells add rows.
	pub fn layout(&self, cells: &[Cell]) -> Cell {
		let height = cells.iter().map(|cell| cell.lines().len()).max().unwrap_or(0).max(1);
		let lines = (0..height)
			.map(|idx| {
				let parts: Vec<String> = self
					.columns
					.iter()
					.zip(cells)
					.map(|(column, cell)| {
						let text = cell.lines().get(idx).map(String::as_str).unwrap_or("");
						self.pad(column, text)
					})
					.collect();
				parts.join(" ").trim_end().to_owned()
			})
			.collect();
		Cell::from_lines(lines)
	}

	fn pad(&self, column: &ColumnSpec, text: &str) -> String {
		let Some(width) = self.column_width(column) else {
			return text.to_owned();
		};
		match column.hint {
			ColumnHint::AddrPad | ColumnHint::Fixed { align: Align::Right, .. } => format!("{text:>width$}"),
			ColumnHint::Fixed { align: Align::Center, .. } => format!("{text:^width$}"),
			_ => format!("{text:<width$}"),
		}
	}
}

#[cfg(test)]
mod tests;
