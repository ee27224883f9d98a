use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::OnceLock;

use memlens_testkit::{ModuleSpec, build_linux_fixture, scratch_dir, target_dir as workspace_target_dir};

static MEMLENS_BIN: OnceLock<PathBuf> = OnceLock::new();

/// Paths of a synthetic image written for one test.
pub(crate) struct FixtureFiles {
	pub image: String,
	pub profile: String,
	pub base: String,
	pub modules: Vec<u64>,
}

impl FixtureFiles {
	/// `--image/--base/--profile` followed by `extra`.
	pub fn args<'a>(&'a self, command: &'a str, extra: &[&'a str]) -> Vec<&'a str> {
		let mut args = vec![command, "--image", self.image.as_str(), "--base", self.base.as_str(), "--profile", self.profile.as_str()];
		args.extend_from_slice(extra);
		args
	}
}

pub(crate) fn write_fixture(tag: &str, specs: &[ModuleSpec]) -> FixtureFiles {
	let fixture = build_linux_fixture(specs);
	let dir = scratch_dir(tag);
	let (image, profile) = fixture.write_to(&dir);
	FixtureFiles {
		image: image.display().to_string(),
		profile: profile.display().to_string(),
		base: format!("0x{:x}", fixture.base),
		modules: fixture.modules,
	}
}

pub(crate) fn run_memlens(args: &[&str]) -> Output {
	Command::new(memlens_bin()).args(args).output().expect("memlens command executes")
}

pub(crate) fn run_memlens_ok(args: &[&str]) -> String {
	let output = run_memlens(args);
	assert!(
		output.status.success(),
		"memlens command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	String::from_utf8(output.stdout).expect("stdout is utf8")
}

pub(crate) fn run_memlens_json(args: &[&str]) -> serde_json::Value {
	serde_json::from_str(&run_memlens_ok(args)).expect("stdout should be valid json")
}

fn memlens_bin() -> &'static PathBuf {
	MEMLENS_BIN.get_or_init(resolve_memlens_bin)
}

fn resolve_memlens_bin() -> PathBuf {
	if let Ok(path) = std::env::var("CARGO_BIN_EXE_memlens") {
		return PathBuf::from(path);
	}

	let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
	let target_dir = workspace_target_dir();

	let mut bin = target_dir.join("debug");
	bin.push(if cfg!(windows) { "memlens.exe" } else { "memlens" });

	let status = Command::new("cargo")
		.current_dir(&manifest_dir)
		.args(["build", "--quiet", "--bin", "memlens"])
		.status()
		.expect("cargo build executes");
	assert!(status.success(), "failed to build memlens binary at {}", bin.display());

	bin
}
