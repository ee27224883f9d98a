use std::fmt;

use serde::Serialize;

/// Semantic colour tag carried by highlight spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
	/// Negative or failing state.
	Red,
	/// Positive or passing state.
	Green,
	/// Warning state.
	Yellow,
	/// Informational accent.
	Blue,
}

/// Coloured span inside a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
	/// First highlighted character.
	pub start: usize,
	/// One past the last highlighted character; `None` runs to the end of the line.
	pub end: Option<usize>,
	/// Foreground colour.
	pub fg: Option<Color>,
	/// Background colour.
	pub bg: Option<Color>,
}

impl Highlight {
	/// Foreground highlight covering the whole line.
	pub fn whole(fg: Color) -> Self {
		Self {
			start: 0,
			end: None,
			fg: Some(fg),
			bg: None,
		}
	}
}

/// Immutable presentation unit produced by renderers.
///
/// `width` is a hint for the output sink; the cell never pads itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cell {
	lines: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	width: Option<usize>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	highlights: Vec<Highlight>,
}

impl Cell {
	/// Split `text` into lines; empty text yields no lines.
	pub fn new(text: impl AsRef<str>) -> Self {
		Self::from_lines(text.as_ref().lines().map(str::to_owned).collect())
	}

	/// Build a cell from pre-split lines.
	pub fn from_lines(lines: Vec<String>) -> Self {
		Self {
			lines,
			width: None,
			highlights: Vec::new(),
		}
	}

	/// The `-` placeholder used for absent values.
	pub fn placeholder() -> Self {
		Self::new("-")
	}

	/// Attach a width hint.
	pub fn with_width(mut self, width: Option<usize>) -> Self {
		self.width = width;
		self
	}

	/// Append a highlight span.
	pub fn with_highlight(mut self, highlight: Highlight) -> Self {
		self.highlights.push(highlight);
		self
	}

	/// Text lines.
	pub fn lines(&self) -> &[String] {
		&self.lines
	}

	/// Width hint.
	pub fn width(&self) -> Option<usize> {
		self.width
	}

	/// Highlight spans.
	pub fn highlights(&self) -> &[Highlight] {
		&self.highlights
	}

	/// First line, if any.
	pub fn first_line(&self) -> Option<&str> {
		self.lines.first().map(String::as_str)
	}

	/// Lines joined with newlines.
	pub fn text(&self) -> String {
		self.lines.join("\n")
	}
}

impl fmt::Display for Cell {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.text())
	}
}

#[cfg(test)]
mod tests {
	use super::{Cell, Color, Highlight};

	#[test]
	fn empty_text_has_no_lines() {
		assert!(Cell::new("").lines().is_empty());
		assert_eq!(Cell::new("a\nb\n").lines(), ["a", "b"]);
	}

	#[test]
	fn serializes_without_unset_hints() {
		let plain = serde_json::to_value(Cell::new("x")).expect("cell serializes");
		assert_eq!(plain, serde_json::json!({ "lines": ["x"] }));

		let styled = serde_json::to_value(Cell::new("True").with_width(Some(6)).with_highlight(Highlight::whole(Color::Green))).expect("cell serializes");
		assert_eq!(styled["width"], 6);
		assert_eq!(styled["highlights"][0]["fg"], "green");
		assert!(styled["highlights"][0]["end"].is_null());
	}
}
