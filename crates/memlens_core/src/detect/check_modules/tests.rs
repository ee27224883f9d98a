use memlens_testkit::{LinuxFixture, ModuleSpec, build_linux_fixture, build_linux_fixture_without_kset};

use crate::detect::{CheckModules, CheckModulesOptions, MIN_MODULE_REFCOUNT, check_modules};
use crate::image::{Memory, Profile, Segment, SegmentSpace};
use crate::render::{JsonSink, RenderOptions, RendererRegistry, TextSink, format_address};

struct Loaded {
	profile: Profile,
	space: SegmentSpace,
}

impl Loaded {
	fn new(fixture: &LinuxFixture) -> Self {
		Self {
			profile: Profile::from_json_str(&fixture.profile_json()).expect("profile parses"),
			space: SegmentSpace::from_segments(vec![Segment::new(fixture.base, fixture.bytes.clone())]).expect("maps"),
		}
	}

	fn mem(&self) -> Memory<'_> {
		Memory::new(&self.profile, &self.space)
	}
}

fn summary(loaded: &Loaded, options: CheckModulesOptions) -> Vec<(u64, String, i64, bool)> {
	CheckModules::new(loaded.mem(), options)
		.run()
		.expect("check runs")
		.expect("check is active")
		.into_iter()
		.map(|row| (row.module.offset(), row.name, row.refcount, row.known))
		.collect()
}

fn scenario() -> LinuxFixture {
	build_linux_fixture(&[ModuleSpec::new("", 1, false), ModuleSpec::new("mod_a", 4, true), ModuleSpec::new("mod_b", 5, false)])
}

#[test]
fn hidden_module_is_reported_unknown() {
	let fixture = scenario();
	let loaded = Loaded::new(&fixture);

	assert_eq!(
		summary(&loaded, CheckModulesOptions::default()),
		vec![
			(fixture.modules[1], "mod_a".to_owned(), 4, true),
			(fixture.modules[2], "mod_b".to_owned(), 5, false),
		]
	);
}

#[test]
fn low_refcount_entries_are_skipped() {
	let fixture = build_linux_fixture(&[ModuleSpec::new("busy", 3, true), ModuleSpec::new("idle", 2, true)]);
	let loaded = Loaded::new(&fixture);

	let names: Vec<String> = summary(&loaded, CheckModulesOptions::default()).into_iter().map(|row| row.1).collect();
	assert_eq!(names, vec!["busy"]);
	assert_eq!(MIN_MODULE_REFCOUNT, 3);

	let relaxed = CheckModulesOptions {
		min_refcount: 1,
		..CheckModulesOptions::default()
	};
	let names: Vec<String> = summary(&loaded, relaxed).into_iter().map(|row| row.1).collect();
	assert_eq!(names, vec!["busy", "idle"]);
}

#[test]
fn repeated_runs_agree() {
	let fixture = scenario();
	let loaded = Loaded::new(&fixture);

	let first = summary(&loaded, CheckModulesOptions::default());
	let second = summary(&loaded, CheckModulesOptions::default());
	assert_eq!(first, second);
}

#[test]
fn inactive_without_module_kset() {
	let fixture = build_linux_fixture_without_kset(&[ModuleSpec::new("mod_a", 4, true)]);
	let loaded = Loaded::new(&fixture);

	assert!(check_modules(loaded.mem()).expect("inactive is not an error").is_none());

	let registry = RendererRegistry::with_builtins();
	let mut sink = TextSink::new(Vec::new());
	let rendered = CheckModules::new(loaded.mem(), CheckModulesOptions::default())
		.render(&registry, &mut sink, &RenderOptions::default())
		.expect("render runs");
	assert!(!rendered);
	assert!(sink.into_inner().is_empty());
}

#[test]
fn shared_name_does_not_mask_hidden_module() {
	let fixture = build_linux_fixture(&[ModuleSpec::new("dup", 3, true), ModuleSpec::new("dup", 3, false)]);
	let loaded = Loaded::new(&fixture);

	let known: Vec<(u64, bool)> = summary(&loaded, CheckModulesOptions::default()).into_iter().map(|row| (row.0, row.3)).collect();
	assert_eq!(known, vec![(fixture.modules[0], true), (fixture.modules[1], false)]);
}

#[test]
fn text_report_lists_every_candidate() {
	let fixture = scenario();
	let loaded = Loaded::new(&fixture);
	let registry = RendererRegistry::with_builtins();

	let mut sink = TextSink::new(Vec::new());
	let rendered = CheckModules::new(loaded.mem(), CheckModulesOptions::default())
		.render(&registry, &mut sink, &RenderOptions::default())
		.expect("render runs");
	assert!(rendered);

	let text = String::from_utf8(sink.into_inner()).expect("utf8");
	let lines: Vec<&str> = text.lines().collect();
	assert_eq!(lines.len(), 4, "{text}");
	assert!(lines[0].trim_start().starts_with("Module Module Name"));
	assert!(lines[1].starts_with("------------------ ---"));

	let (addr_a, addr_b) = (format_address(fixture.modules[1], 8), format_address(fixture.modules[2], 8));
	let tokens: Vec<Vec<&str>> = lines[2..].iter().map(|line| line.split_whitespace().collect()).collect();
	assert_eq!(tokens[0], vec![addr_a.as_str(), "mod_a", "4", "True"]);
	assert_eq!(tokens[1], vec![addr_b.as_str(), "mod_b", "5", "False"]);
}

#[test]
fn json_report_keys_rows_by_field() {
	let fixture = scenario();
	let loaded = Loaded::new(&fixture);
	let registry = RendererRegistry::with_builtins();

	let mut sink = JsonSink::new(Vec::new());
	CheckModules::new(loaded.mem(), CheckModulesOptions::default())
		.render(&registry, &mut sink, &RenderOptions::default())
		.expect("render runs");

	let rows: serde_json::Value = serde_json::from_slice(&sink.into_inner()).expect("valid json");
	assert_eq!(rows.as_array().map(Vec::len), Some(2));
	assert_eq!(rows[1]["module_addr"], format_address(fixture.modules[2], 8));
	assert_eq!(rows[1]["module"], "mod_b");
	assert_eq!(rows[1]["refcount"], "5");
	assert_eq!(rows[1]["known"], "False");
}
