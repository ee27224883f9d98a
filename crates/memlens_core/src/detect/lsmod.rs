use crate::image::{ListWalk, Memory, Object, TypeSpec, Value, WalkOptions, list_of_type};
use crate::render::ColumnSpec;
use crate::{MemlensError, Result};

/// Walk the kernel's own `modules` list, the listing `lsmod` reports.
pub fn module_list<'a>(mem: Memory<'a>, options: &WalkOptions) -> Result<ListWalk<'a>> {
	let head = mem
		.constant_object("modules", "list_head")?
		.ok_or_else(|| MemlensError::UnknownConstant { name: "modules".to_owned() })?;
	let walk = list_of_type(&head, "module", "list", options)?;
	if let Some(stop) = walk.stop {
		log::warn!("modules list ended early after {} entries: {:?}", walk.items.len(), stop.reason);
	}
	Ok(walk)
}

/// Columns of the `lsmod` table.
pub fn lsmod_columns() -> Result<Vec<ColumnSpec>> {
	Ok(vec![
		ColumnSpec::new("Module", "module_addr", "[addrpad]")?,
		ColumnSpec::new("Name", "module", "30")?,
		ColumnSpec::new("Size", "core_size", ">10")?,
		ColumnSpec::new("State", "state", "<22")?,
		ColumnSpec::new("Taints", "taints", "")?,
	])
}

/// Cell values of one `lsmod` row, in [`lsmod_columns`] order.
///
/// Members the profile lacks render as placeholders.
pub fn lsmod_row<'a>(module: &Object<'a>) -> Vec<Value<'a>> {
	vec![
		Value::Object(module.clone()),
		Value::Str(module_name(module)),
		module.member("core_size"),
		module.member("state"),
		module.member("taints"),
	]
}

/// Inline `module.name`, cut at the first NUL; empty when unreadable.
pub fn module_name(module: &Object<'_>) -> String {
	c_string(&module.member("name")).unwrap_or_default()
}

/// Text of a string object, or of the string a pointer refers to, cut at the first NUL.
pub(crate) fn c_string(value: &Value<'_>) -> Option<String> {
	match value {
		Value::Object(object) if matches!(object.type_spec(), TypeSpec::Pointer { .. }) => c_string(&object.deref()),
		Value::Object(object) => match object.value() {
			Value::Str(text) => Some(text.split('\0').next().unwrap_or_default().to_owned()),
			_ => None,
		},
		Value::Str(text) => Some(text.split('\0').next().unwrap_or_default().to_owned()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use memlens_testkit::{ModuleSpec, build_linux_fixture};

	use super::{lsmod_row, module_list, module_name};
	use crate::image::{Memory, Profile, Segment, SegmentSpace, WalkOptions};
	use crate::render::{RenderOptions, RendererRegistry, Verbosity};

	#[test]
	fn lists_only_linked_modules() {
		let fixture = build_linux_fixture(&[ModuleSpec::new("ext4", 3, true), ModuleSpec::new("rootkit", 9, false), ModuleSpec::new("xfs", 4, true)]);
		let profile = Profile::from_json_str(&fixture.profile_json()).expect("profile parses");
		let space = SegmentSpace::from_segments(vec![Segment::new(fixture.base, fixture.bytes.clone())]).expect("maps");
		let mem = Memory::new(&profile, &space);

		let walk = module_list(mem, &WalkOptions::default()).expect("walks");
		let names: Vec<String> = walk.items.iter().map(module_name).collect();
		assert_eq!(names, vec!["ext4", "xfs"]);
	}

	#[test]
	fn row_renders_profile_members() {
		let fixture = build_linux_fixture(&[ModuleSpec::new("ext4", 3, true)]);
		let profile = Profile::from_json_str(&fixture.profile_json()).expect("profile parses");
		let space = SegmentSpace::from_segments(vec![Segment::new(fixture.base, fixture.bytes.clone())]).expect("maps");
		let mem = Memory::new(&profile, &space);
		let registry = RendererRegistry::with_builtins();

		let walk = module_list(mem, &WalkOptions::default()).expect("walks");
		let row = lsmod_row(&walk.items[0]);
		let options = RenderOptions::default();
		let cells: Vec<String> = row.iter().map(|value| registry.render(value, Verbosity::Row, &options).text()).collect();
		assert_eq!(cells[1], "ext4");
		assert_eq!(cells[2], "16384");
		assert_eq!(cells[3], "MODULE_STATE_LIVE");
		assert!(cells[4].starts_with("TAINT_OOT_MODULE, TAINT_"), "{}", cells[4]);
		assert!(cells[4].ends_with('…'));
		assert_eq!(registry.render(&row[4], Verbosity::Full, &options).text(), "TAINT_OOT_MODULE, TAINT_PROPRIETARY_MODULE");
	}

	#[test]
	fn missing_modules_constant_is_an_error() {
		let profile = Profile::from_json_str(&memlens_testkit::linux_profile().to_string()).expect("profile parses");
		let space = SegmentSpace::from_segments(vec![Segment::new(0x1000, vec![0; 16])]).expect("maps");
		assert!(module_list(Memory::new(&profile, &space), &WalkOptions::default()).is_err());
	}
}
