use crate::Result;
use crate::detect::lsmod::{c_string, module_list, module_name};
use crate::detect::{CandidateRecord, CrossView, reconcile};
use crate::image::{Memory, Object, Value, WalkOptions, list_of_type, require_member};
use crate::render::{ColumnSpec, RenderOptions, RendererRegistry, TableSink, emit_table};

/// Reference count below which a kset entry is not treated as a loaded module.
pub const MIN_MODULE_REFCOUNT: i64 = 3;

/// Options for [`CheckModules`].
#[derive(Debug, Clone, Copy)]
pub struct CheckModulesOptions {
	/// Entries with a lower `kref.refcount.counter` are skipped.
	pub min_refcount: i64,
	/// Bounds for both list walks.
	pub walk: WalkOptions,
}

impl Default for CheckModulesOptions {
	fn default() -> Self {
		Self {
			min_refcount: MIN_MODULE_REFCOUNT,
			walk: WalkOptions::default(),
		}
	}
}

/// One module found through `module_kset`.
#[derive(Debug, Clone)]
pub struct ModuleRow<'a> {
	/// Recovered `struct module`.
	pub module: Object<'a>,
	/// `module.name`.
	pub name: String,
	/// `kobj.kref.refcount.counter` at traversal time.
	pub refcount: i64,
	/// Whether the `modules` list links the same object.
	pub known: bool,
}

impl<'a> ModuleRow<'a> {
	/// Cell values in [`CheckModules::columns`] order.
	pub fn values(&self) -> Vec<Value<'a>> {
		vec![Value::Object(self.module.clone()), Value::Str(self.name.clone()), Value::Int(self.refcount), Value::Bool(self.known)]
	}
}

/// Cross-view check of sysfs-registered modules against the `modules` list.
///
/// A module unlinked from `modules` to hide from `lsmod` still owns a kobject
/// in `module_kset`; such modules come out with `known == false`.
pub struct CheckModules<'a> {
	mem: Memory<'a>,
	options: CheckModulesOptions,
}

impl<'a> CheckModules<'a> {
	/// Check modules in `mem`.
	pub fn new(mem: Memory<'a>, options: CheckModulesOptions) -> Self {
		Self { mem, options }
	}

	/// Report columns.
	pub fn columns() -> Result<Vec<ColumnSpec>> {
		Ok(vec![
			ColumnSpec::new("Module", "module_addr", "[addrpad]")?,
			ColumnSpec::new("Module Name", "module", "30")?,
			ColumnSpec::new("Ref Count", "refcount", "^10")?,
			ColumnSpec::new("Known", "known", "")?,
		])
	}

	/// Run the check; `Ok(None)` when the profile has no `module_kset`.
	pub fn run(&self) -> Result<Option<Vec<ModuleRow<'a>>>> {
		let Some(results) = reconcile(self)? else {
			return Ok(None);
		};
		let rows = results
			.into_iter()
			.map(|result| ModuleRow {
				name: result.candidate.name,
				refcount: result.candidate.refcount.unwrap_or_default(),
				module: result.candidate.object,
				known: result.known,
			})
			.collect();
		Ok(Some(rows))
	}

	/// Run the check and stream the report into `sink`.
	///
	/// Returns `false` without touching the sink when the check is inactive.
	pub fn render(&self, registry: &RendererRegistry, sink: &mut dyn TableSink, options: &RenderOptions) -> Result<bool> {
		let Some(rows) = self.run()? else {
			return Ok(false);
		};
		let values: Vec<Vec<Value<'a>>> = rows.iter().map(ModuleRow::values).collect();
		emit_table(registry, sink, &Self::columns()?, &values, self.mem.profile.pointer_size, options)?;
		Ok(true)
	}

	fn candidate(&self, kobj: &Object<'a>) -> Result<Option<CandidateRecord<'a>>> {
		let name = c_string(&kobj.member("name")).unwrap_or_default();
		if name.is_empty() {
			log::trace!("kobject at 0x{:x} has no name, skipped", kobj.offset());
			return Ok(None);
		}
		let Some(refcount) = kobj.member_path("kref.refcount.counter").as_i128().and_then(|count| i64::try_from(count).ok()) else {
			log::trace!("kobject {name} has an unreadable refcount, skipped");
			return Ok(None);
		};
		if refcount < self.options.min_refcount {
			log::trace!("kobject {name} refcount {refcount} below {}, skipped", self.options.min_refcount);
			return Ok(None);
		}

		let module = self.mem.container_of(kobj, "module", "mkobj.kobj")?;
		Ok(Some(CandidateRecord {
			name: module_name(&module),
			object: module,
			path: "module_kset",
			refcount: Some(refcount),
		}))
	}
}

impl<'a> CrossView<'a> for CheckModules<'a> {
	fn name(&self) -> &str {
		"check_modules"
	}

	fn is_active(&self) -> bool {
		self.mem.profile.constant("module_kset").is_some()
	}

	fn traverse_structural(&self) -> Result<Vec<CandidateRecord<'a>>> {
		let Some(kset) = self.mem.constant_object("module_kset", "kset")? else {
			return Ok(Vec::new());
		};
		let head = require_member(&kset, "list")?;
		let walk = list_of_type(&head, "kobject", "entry", &self.options.walk)?;
		if let Some(stop) = walk.stop {
			log::warn!("module_kset list ended early after {} entries: {:?}", walk.items.len(), stop.reason);
		}

		let mut candidates = Vec::new();
		for kobj in &walk.items {
			if let Some(candidate) = self.candidate(kobj)? {
				candidates.push(candidate);
			}
		}
		Ok(candidates)
	}

	fn traverse_independent(&self) -> Result<Vec<Object<'a>>> {
		Ok(module_list(self.mem, &self.options.walk)?.items)
	}
}

/// Run [`CheckModules`] with default options.
pub fn check_modules(mem: Memory<'_>) -> Result<Option<Vec<ModuleRow<'_>>>> {
	CheckModules::new(mem, CheckModulesOptions::default()).run()
}

#[cfg(test)]
mod tests;
