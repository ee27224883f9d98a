//! Shared test helpers for workspace crates.
//!
//! Builds synthetic little-endian kernel images plus the matching JSON profile,
//! so tests never depend on real memory dumps.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};

/// Default base address of synthetic images.
pub const KERNEL_BASE: u64 = 0xffff_8880_0000_0000;

/// Offset of `module.list` inside `module`.
pub const MODULE_LIST_OFFSET: u64 = 8;
/// Offset of `module.name` inside `module`.
pub const MODULE_NAME_OFFSET: u64 = 24;
/// Offset of `module.mkobj.kobj` inside `module`.
pub const MODULE_KOBJ_OFFSET: u64 = 80;
/// Offset of `kobject.entry` inside `kobject`.
pub const KOBJ_ENTRY_OFFSET: u64 = 8;
/// Offset of `kobject.kref.refcount.counter` inside `kobject`.
pub const KOBJ_REFCOUNT_OFFSET: u64 = 24;
/// Size of `struct module` in the synthetic profile.
pub const MODULE_SIZE: u64 = 144;

/// Resolve the workspace root path.
pub fn workspace_root() -> PathBuf {
	let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
	manifest_dir
		.join("..")
		.join("..")
		.canonicalize()
		.unwrap_or_else(|_| manifest_dir.join("..").join(".."))
}

/// Resolve the workspace target directory.
pub fn target_dir() -> PathBuf {
	std::env::var_os("CARGO_TARGET_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|| workspace_root().join("target"))
}

/// Create a fresh scratch directory for one test.
pub fn scratch_dir(tag: &str) -> PathBuf {
	let dir = std::env::temp_dir().join(format!("memlens-{tag}-{}", std::process::id()));
	let _ = std::fs::remove_dir_all(&dir);
	std::fs::create_dir_all(&dir).expect("scratch dir is creatable");
	dir
}

/// Bump allocator over a zero-filled byte image.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
	base: u64,
	bytes: Vec<u8>,
	next: u64,
}

impl ImageBuilder {
	/// Create a zeroed image of `size` bytes mapped at `base`.
	pub fn new(base: u64, size: usize) -> Self {
		Self {
			base,
			bytes: vec![0; size],
			next: base,
		}
	}

	/// First mapped address.
	pub fn base(&self) -> u64 {
		self.base
	}

	/// Reserve `size` bytes aligned to 16 and return their address.
	pub fn alloc(&mut self, size: u64) -> u64 {
		let addr = (self.next + 15) & !15;
		self.next = addr + size;
		assert!(self.next <= self.base + self.bytes.len() as u64, "synthetic image is too small");
		addr
	}

	/// Copy raw bytes to `addr`.
	pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) {
		let start = (addr - self.base) as usize;
		self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
	}

	/// Write a little-endian `u64`.
	pub fn write_u64(&mut self, addr: u64, value: u64) {
		self.write_bytes(addr, &value.to_le_bytes());
	}

	/// Write a little-endian `u32`.
	pub fn write_u32(&mut self, addr: u64, value: u32) {
		self.write_bytes(addr, &value.to_le_bytes());
	}

	/// Write a little-endian `i32`.
	pub fn write_i32(&mut self, addr: u64, value: i32) {
		self.write_bytes(addr, &value.to_le_bytes());
	}

	/// Allocate a NUL-terminated copy of `text` and return its address.
	pub fn alloc_cstr(&mut self, text: &str) -> u64 {
		let addr = self.alloc(text.len() as u64 + 1);
		self.write_bytes(addr, text.as_bytes());
		addr
	}

	/// Finish and return the image bytes.
	pub fn into_bytes(self) -> Vec<u8> {
		self.bytes
	}
}

/// One module planted into a synthetic kernel image.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
	/// Name stored in both `module.name` and `kobject.name`; empty means a NULL kobject name.
	pub name: String,
	/// Value of `kobj.kref.refcount.counter`.
	pub refcount: i32,
	/// Whether the module is linked into the `modules` list.
	pub listed: bool,
}

impl ModuleSpec {
	/// Describe one module.
	pub fn new(name: &str, refcount: i32, listed: bool) -> Self {
		Self {
			name: name.to_owned(),
			refcount,
			listed,
		}
	}
}

/// A synthetic kernel image with its profile.
#[derive(Debug, Clone)]
pub struct LinuxFixture {
	/// Address of the first byte.
	pub base: u64,
	/// Raw image bytes.
	pub bytes: Vec<u8>,
	/// JSON profile describing the image.
	pub profile: Value,
	/// Address of each planted `struct module`, in `ModuleSpec` order.
	pub modules: Vec<u64>,
}

impl LinuxFixture {
	/// Profile as JSON text.
	pub fn profile_json(&self) -> String {
		self.profile.to_string()
	}

	/// Write `image.bin` and `profile.json` into `dir` and return their paths.
	pub fn write_to(&self, dir: &Path) -> (PathBuf, PathBuf) {
		let image = dir.join("image.bin");
		let profile = dir.join("profile.json");
		std::fs::write(&image, &self.bytes).expect("image writes");
		std::fs::write(&profile, self.profile_json()).expect("profile writes");
		(image, profile)
	}
}

/// Build an image whose `module_kset` holds every spec and whose `modules`
/// list links only the specs marked `listed`.
pub fn build_linux_fixture(specs: &[ModuleSpec]) -> LinuxFixture {
	build_fixture(specs, true)
}

/// Same as [`build_linux_fixture`] but the profile lacks `module_kset`.
pub fn build_linux_fixture_without_kset(specs: &[ModuleSpec]) -> LinuxFixture {
	build_fixture(specs, false)
}

fn build_fixture(specs: &[ModuleSpec], with_kset: bool) -> LinuxFixture {
	let mut image = ImageBuilder::new(KERNEL_BASE, 0x4000);

	let modules_head = image.alloc(16);
	let kset = image.alloc(56);

	let mut modules = Vec::with_capacity(specs.len());
	for spec in specs {
		let module = image.alloc(MODULE_SIZE);
		image.write_u32(module, 0);
		let mut name = spec.name.as_bytes().to_vec();
		name.truncate(55);
		image.write_bytes(module + MODULE_NAME_OFFSET, &name);

		let kobj = module + MODULE_KOBJ_OFFSET;
		let name_ptr = if spec.name.is_empty() { 0 } else { image.alloc_cstr(&spec.name) };
		image.write_u64(kobj, name_ptr);
		image.write_i32(kobj + KOBJ_REFCOUNT_OFFSET, spec.refcount);
		image.write_u64(kobj + 32, module);
		image.write_u64(module + 120, 0x1001);
		image.write_u32(module + 128, 0x4000);
		modules.push(module);
	}

	let listed: Vec<u64> = specs
		.iter()
		.zip(&modules)
		.filter(|(spec, _)| spec.listed)
		.map(|(_, module)| module + MODULE_LIST_OFFSET)
		.collect();
	link_circular(&mut image, modules_head, &listed);

	let entries: Vec<u64> = modules.iter().map(|module| module + MODULE_KOBJ_OFFSET + KOBJ_ENTRY_OFFSET).collect();
	link_circular(&mut image, kset, &entries);

	let mut profile = linux_profile();
	profile["constants"]["modules"] = json!(format!("0x{modules_head:x}"));
	if with_kset {
		profile["constants"]["module_kset"] = json!(format!("0x{kset:x}"));
	}

	LinuxFixture {
		base: image.base(),
		bytes: image.into_bytes(),
		profile,
		modules,
	}
}

/// Link `nodes` (addresses of `list_head`s) into a circular list headed at `head`.
pub fn link_circular(image: &mut ImageBuilder, head: u64, nodes: &[u64]) {
	let mut ring = Vec::with_capacity(nodes.len() + 1);
	ring.push(head);
	ring.extend_from_slice(nodes);

	for (idx, node) in ring.iter().enumerate() {
		let next = ring[(idx + 1) % ring.len()];
		let prev = ring[(idx + ring.len() - 1) % ring.len()];
		image.write_u64(*node, next);
		image.write_u64(*node + 8, prev);
	}
}

/// Profile covering the kernel structs the module checks touch.
pub fn linux_profile() -> Value {
	let list_head = json!({ "kind": "struct", "name": "list_head" });
	json!({
		"pointer_size": 8,
		"endianness": "little",
		"constants": {},
		"structs": {
			"list_head": {
				"size": 16,
				"members": {
					"next": { "offset": 0, "type": { "kind": "pointer", "target": list_head } },
					"prev": { "offset": 8, "type": { "kind": "pointer", "target": list_head } }
				}
			},
			"atomic_t": {
				"size": 4,
				"members": {
					"counter": { "offset": 0, "type": { "kind": "int", "size": 4, "signed": true } }
				}
			},
			"kref": {
				"size": 4,
				"members": {
					"refcount": { "offset": 0, "type": { "kind": "struct", "name": "atomic_t" } }
				}
			},
			"kobject": {
				"size": 32,
				"members": {
					"name": { "offset": 0, "type": { "kind": "pointer", "target": { "kind": "string", "length": 64 } } },
					"entry": { "offset": 8, "type": list_head },
					"kref": { "offset": 24, "type": { "kind": "struct", "name": "kref" } },
					"state_in_sysfs": { "offset": 28, "type": { "kind": "bool" } }
				}
			},
			"module_kobject": {
				"size": 40,
				"members": {
					"kobj": { "offset": 0, "type": { "kind": "struct", "name": "kobject" } },
					"mod": { "offset": 32, "type": { "kind": "pointer", "target": { "kind": "struct", "name": "module" } } }
				}
			},
			"module": {
				"size": MODULE_SIZE,
				"members": {
					"state": { "offset": 0, "type": {
						"kind": "enumeration",
						"size": 4,
						"choices": {
							"0": "MODULE_STATE_LIVE",
							"1": "MODULE_STATE_COMING",
							"2": "MODULE_STATE_GOING",
							"3": "MODULE_STATE_UNFORMED"
						}
					} },
					"list": { "offset": MODULE_LIST_OFFSET, "type": list_head },
					"name": { "offset": MODULE_NAME_OFFSET, "type": { "kind": "string", "length": 56 } },
					"mkobj": { "offset": MODULE_KOBJ_OFFSET, "type": { "kind": "struct", "name": "module_kobject" } },
					"taints": { "offset": 120, "type": {
						"kind": "flags",
						"size": 8,
						"maskmap": {
							"TAINT_PROPRIETARY_MODULE": 1,
							"TAINT_FORCED_MODULE": 2,
							"TAINT_OOT_MODULE": 4096,
							"TAINT_UNSIGNED_MODULE": 8192
						}
					} },
					"core_size": { "offset": 128, "type": { "kind": "int", "size": 4 } },
					"load_time": { "offset": 136, "type": { "kind": "unix_timestamp", "size": 8 } }
				}
			},
			"kset": {
				"size": 56,
				"members": {
					"list": { "offset": 0, "type": list_head },
					"list_lock": { "offset": 16, "type": { "kind": "int", "size": 4 } },
					"kobj": { "offset": 24, "type": { "kind": "struct", "name": "kobject" } }
				}
			}
		}
	})
}
