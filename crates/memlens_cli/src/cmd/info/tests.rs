use memlens_testkit::ModuleSpec;

use crate::cmd::test_support::{run_memlens_json, write_fixture};

#[test]
fn reports_segments_and_constants() {
	let files = write_fixture("info-json", &[ModuleSpec::new("ext4", 3, true)]);
	let payload = run_memlens_json(&files.args("info", &["--json"]));

	assert_eq!(payload["compression"], "none");
	assert_eq!(payload["pointer_size"], 8);
	assert_eq!(payload["endianness"], "little");
	assert_eq!(payload["segments"][0]["start"], format!("0x{:016x}", u64::from_str_radix(&files.base[2..], 16).expect("hex base")));
	assert!(payload["constants"].get("module_kset").is_some());
	assert!(payload["constants"].get("modules").is_some());
}
