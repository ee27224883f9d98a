use memlens_testkit::ModuleSpec;

use crate::cmd::test_support::{run_memlens, run_memlens_json, run_memlens_ok, write_fixture};

fn scenario(tag: &str) -> crate::cmd::test_support::FixtureFiles {
	write_fixture(tag, &[ModuleSpec::new("", 1, false), ModuleSpec::new("mod_a", 4, true), ModuleSpec::new("mod_b", 5, false)])
}

#[test]
fn json_report_flags_hidden_module() {
	let files = scenario("check-json");
	let rows = run_memlens_json(&files.args("check-modules", &["--json"]));

	let rows = rows.as_array().expect("rows array");
	assert_eq!(rows.len(), 2);
	assert_eq!(rows[0]["module"], "mod_a");
	assert_eq!(rows[0]["known"], "True");
	assert_eq!(rows[1]["module"], "mod_b");
	assert_eq!(rows[1]["known"], "False");
	assert_eq!(rows[1]["module_addr"], format!("0x{:016x}", files.modules[2]));
}

#[test]
fn text_report_has_header_and_rows() {
	let files = scenario("check-text");
	let text = run_memlens_ok(&files.args("check-modules", &[]));

	let lines: Vec<&str> = text.lines().collect();
	assert_eq!(lines.len(), 4, "{text}");
	assert!(lines[0].contains("Module Name") && lines[0].contains("Ref Count") && lines[0].ends_with("Known"));
	assert!(lines[3].contains("mod_b") && lines[3].ends_with("False"));
}

#[test]
fn min_refcount_flag_overrides_default() {
	let files = scenario("check-refcount");
	let rows = run_memlens_json(&files.args("check-modules", &["--json", "--min-refcount", "5"]));
	let names: Vec<&str> = rows.as_array().expect("rows").iter().filter_map(|row| row["module"].as_str()).collect();
	assert_eq!(names, vec!["mod_b"]);
}

#[test]
fn missing_image_fails_with_error_prefix() {
	let output = run_memlens(&["check-modules", "--image", "/nonexistent/memlens.bin", "--profile", "/nonexistent/profile.json"]);
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: "));
}
