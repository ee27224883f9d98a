use crate::MemlensError;
use crate::image::Value;
use crate::render::{Align, ColumnHint, ColumnSpec, RenderCx, RenderOptions, RendererRegistry, TextTable};

#[test]
fn parses_column_hints() {
	assert_eq!("".parse::<ColumnHint>().expect("free"), ColumnHint::Free);
	assert_eq!("[addrpad]".parse::<ColumnHint>().expect("addrpad"), ColumnHint::AddrPad);
	assert_eq!("30".parse::<ColumnHint>().expect("bare width"), ColumnHint::Fixed { width: 30, align: Align::Left });
	assert_eq!("^10".parse::<ColumnHint>().expect("centered"), ColumnHint::Fixed { width: 10, align: Align::Center });
	assert_eq!(">8".parse::<ColumnHint>().expect("right"), ColumnHint::Fixed { width: 8, align: Align::Right });

	for bad in ["x10", "^", "[addr]", "<-3"] {
		let err = bad.parse::<ColumnHint>().expect_err("malformed hint");
		assert!(matches!(err, MemlensError::InvalidColumnHint { ref hint } if hint == bad), "{bad}");
	}
}

#[test]
fn header_and_row_follow_hints() {
	let table = TextTable::new(vec![
		ColumnSpec::new("Module", "module_addr", "[addrpad]").expect("hint"),
		ColumnSpec::new("Module Name", "module", "12").expect("hint"),
		ColumnSpec::new("Ref Count", "refcount", "^10").expect("hint"),
		ColumnSpec::new("Known", "known", "").expect("hint"),
	])
	.with_pointer_size(4);

	assert_eq!(table.header().text(), "    Module Module Name  Ref Count  Known");

	let registry = RendererRegistry::with_builtins();
	let cx = RenderCx::new(&registry);
	let row = table.row(&cx, &[Value::UInt(0x1000), Value::from("mod_a"), Value::Int(4), Value::Bool(true)], &RenderOptions::default());
	assert_eq!(row.text(), "0x0000000000001000 mod_a            4      True");
}

#[test]
fn row_cells_carry_column_widths() {
	let table = TextTable::new(vec![ColumnSpec::new("Name", "name", ">6").expect("hint"), ColumnSpec::new("Any", "any", "").expect("hint")]);
	let registry = RendererRegistry::with_builtins();
	let cx = RenderCx::new(&registry);
	let cells = table.row_cells(&cx, &[Value::from("ab"), Value::NULL], &RenderOptions::default());

	assert_eq!(cells[0].width(), Some(6));
	assert_eq!(cells[1].width(), None);
	assert_eq!(cells[1].text(), "-");
	assert_eq!(table.layout(&cells).text(), "    ab -");
}

#[test]
fn multi_line_cells_expand_rows() {
	let table = TextTable::new(vec![ColumnSpec::new("A", "a", "3").expect("hint"), ColumnSpec::new("B", "b", "").expect("hint")]);
	let cells = [crate::render::Cell::new("x\ny"), crate::render::Cell::new("z")];
	assert_eq!(table.layout(&cells).lines(), ["x   z", "y"]);
}
