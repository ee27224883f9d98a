use memlens_testkit::ModuleSpec;

use crate::cmd::test_support::{run_memlens_json, run_memlens_ok, write_fixture};

#[test]
fn lists_only_linked_modules() {
	let files = write_fixture("lsmod-json", &[ModuleSpec::new("ext4", 3, true), ModuleSpec::new("rootkit", 3, false)]);
	let rows = run_memlens_json(&files.args("lsmod", &["--json"]));

	let rows = rows.as_array().expect("rows array");
	assert_eq!(rows.len(), 1);
	assert_eq!(rows[0]["module"], "ext4");
	assert_eq!(rows[0]["core_size"], "16384");
	assert_eq!(rows[0]["state"], "MODULE_STATE_LIVE");
}

#[test]
fn text_table_aligns_addresses() {
	let files = write_fixture("lsmod-text", &[ModuleSpec::new("ext4", 3, true)]);
	let text = run_memlens_ok(&files.args("lsmod", &[]));

	let lines: Vec<&str> = text.lines().collect();
	assert_eq!(lines.len(), 3, "{text}");
	assert!(lines[2].starts_with(&format!("0x{:016x} ext4", files.modules[0])), "{text}");
}
