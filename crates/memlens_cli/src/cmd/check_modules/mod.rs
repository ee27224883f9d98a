use memlens::Result;
use memlens::detect::{CheckModules, CheckModulesOptions, MIN_MODULE_REFCOUNT};
use memlens::image::WalkOptions;
use memlens::render::{RenderOptions, RendererRegistry};

use crate::cmd::util::{ImageArgs, Session, stdout_sink};

#[derive(clap::Args)]
pub struct Args {
	#[command(flatten)]
	pub source: ImageArgs,
	/// Skip kset entries whose reference count is below this.
	#[arg(long = "min-refcount", default_value_t = MIN_MODULE_REFCOUNT)]
	pub min_refcount: i64,
	/// Maximum entries to visit in each list.
	#[arg(long = "max-steps", default_value_t = WalkOptions::default().max_steps)]
	pub max_steps: usize,
	#[arg(long)]
	pub json: bool,
}

/// Compare `module_kset` against the `modules` list and report every module
/// with whether the list knows it.
pub fn run(args: Args) -> Result<()> {
	let session = Session::load(&args.source)?;
	let options = CheckModulesOptions {
		min_refcount: args.min_refcount,
		walk: WalkOptions { max_steps: args.max_steps },
	};
	let check = CheckModules::new(session.mem(), options);

	let registry = RendererRegistry::with_builtins();
	let mut sink = stdout_sink(args.json, session.profile.pointer_size);
	if !check.render(&registry, sink.as_mut(), &RenderOptions::default())? {
		eprintln!("check-modules: profile has no module_kset, nothing to check");
	}
	Ok(())
}

#[cfg(test)]
mod tests;
