use memlens_testkit::{ImageBuilder, KERNEL_BASE, MODULE_LIST_OFFSET, MODULE_SIZE, ModuleSpec, build_linux_fixture, linux_profile};

use crate::image::{Memory, Profile, Segment, SegmentSpace, WalkOptions, WalkStopReason, list_of_type};

fn profile() -> Profile {
	Profile::from_json_str(&linux_profile().to_string()).expect("profile parses")
}

#[test]
fn walks_listed_modules_in_order() {
	let fixture = build_linux_fixture(&[
		ModuleSpec::new("ext4", 3, true),
		ModuleSpec::new("hidden", 3, false),
		ModuleSpec::new("xfs", 3, true),
	]);
	let profile = Profile::from_json_str(&fixture.profile_json()).expect("profile parses");
	let space = SegmentSpace::from_segments(vec![Segment::new(fixture.base, fixture.bytes.clone())]).expect("maps");
	let mem = Memory::new(&profile, &space);

	let head = mem.constant_object("modules", "list_head").expect("lookup").expect("modules constant");
	let walk = list_of_type(&head, "module", "list", &WalkOptions::default()).expect("walk succeeds");

	assert!(walk.stop.is_none(), "walk returns to head: {:?}", walk.stop);
	let addrs: Vec<u64> = walk.items.iter().map(|item| item.offset()).collect();
	assert_eq!(addrs, vec![fixture.modules[0], fixture.modules[2]]);
	assert!(walk.items.iter().all(|item| item.type_name() == "module"));
}

#[test]
fn empty_list_yields_nothing() {
	let fixture = build_linux_fixture(&[ModuleSpec::new("ghost", 3, false)]);
	let profile = Profile::from_json_str(&fixture.profile_json()).expect("profile parses");
	let space = SegmentSpace::from_segments(vec![Segment::new(fixture.base, fixture.bytes.clone())]).expect("maps");
	let mem = Memory::new(&profile, &space);

	let head = mem.constant_object("modules", "list_head").expect("lookup").expect("modules constant");
	let walk = list_of_type(&head, "module", "list", &WalkOptions::default()).expect("walk succeeds");
	assert!(walk.items.is_empty());
	assert!(walk.stop.is_none());
}

#[test]
fn stops_on_cycle_that_skips_head() {
	let mut image = ImageBuilder::new(KERNEL_BASE, 0x1000);
	let head = image.alloc(16);
	let a = image.alloc(MODULE_SIZE);
	let b = image.alloc(MODULE_SIZE);
	image.write_u64(head, a + MODULE_LIST_OFFSET);
	image.write_u64(a + MODULE_LIST_OFFSET, b + MODULE_LIST_OFFSET);
	image.write_u64(b + MODULE_LIST_OFFSET, a + MODULE_LIST_OFFSET);

	let profile = profile();
	let space = SegmentSpace::from_segments(vec![Segment::new(KERNEL_BASE, image.into_bytes())]).expect("maps");
	let mem = Memory::new(&profile, &space);
	let head = mem.struct_at("list_head", head).expect("list_head exists");

	let walk = list_of_type(&head, "module", "list", &WalkOptions::default()).expect("walk succeeds");
	assert_eq!(walk.items.len(), 2);
	let stop = walk.stop.expect("cycle stops walk");
	assert_eq!(stop.reason, WalkStopReason::Cycle(a + MODULE_LIST_OFFSET));
	assert_eq!(stop.step, 2);
}

#[test]
fn stops_on_null_and_unmapped_links() {
	let mut image = ImageBuilder::new(KERNEL_BASE, 0x1000);
	let null_head = image.alloc(16);
	let wild_head = image.alloc(16);
	let a = image.alloc(MODULE_SIZE);
	image.write_u64(null_head, a + MODULE_LIST_OFFSET);
	image.write_u64(wild_head, 0x4000);

	let profile = profile();
	let space = SegmentSpace::from_segments(vec![Segment::new(KERNEL_BASE, image.into_bytes())]).expect("maps");
	let mem = Memory::new(&profile, &space);

	let head = mem.struct_at("list_head", null_head).expect("list_head exists");
	let walk = list_of_type(&head, "module", "list", &WalkOptions::default()).expect("walk succeeds");
	assert_eq!(walk.items.len(), 1);
	assert_eq!(walk.stop.map(|stop| stop.reason), Some(WalkStopReason::NullNext));

	let head = mem.struct_at("list_head", wild_head).expect("list_head exists");
	let walk = list_of_type(&head, "module", "list", &WalkOptions::default()).expect("walk succeeds");
	assert!(walk.items.is_empty(), "unmapped nodes are never yielded");
	assert_eq!(walk.stop.map(|stop| stop.reason), Some(WalkStopReason::Unreadable(0x4000)));
}

#[test]
fn honors_step_limit() {
	let specs: Vec<ModuleSpec> = (0..5).map(|idx| ModuleSpec::new(&format!("m{idx}"), 3, true)).collect();
	let fixture = build_linux_fixture(&specs);
	let profile = Profile::from_json_str(&fixture.profile_json()).expect("profile parses");
	let space = SegmentSpace::from_segments(vec![Segment::new(fixture.base, fixture.bytes.clone())]).expect("maps");
	let mem = Memory::new(&profile, &space);

	let head = mem.constant_object("modules", "list_head").expect("lookup").expect("modules constant");
	let walk = list_of_type(&head, "module", "list", &WalkOptions { max_steps: 3 }).expect("walk succeeds");
	assert_eq!(walk.items.len(), 3);
	assert_eq!(walk.stop.map(|stop| stop.reason), Some(WalkStopReason::StepLimit));
}

#[test]
fn unknown_link_member_is_an_error() {
	let profile = profile();
	let space = SegmentSpace::from_segments(vec![Segment::new(KERNEL_BASE, vec![0; 16])]).expect("maps");
	let mem = Memory::new(&profile, &space);
	let head = mem.struct_at("list_head", KERNEL_BASE).expect("list_head exists");
	assert!(list_of_type(&head, "module", "no_such_link", &WalkOptions::default()).is_err());
}
