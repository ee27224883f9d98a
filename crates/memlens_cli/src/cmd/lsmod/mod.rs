use memlens::Result;
use memlens::detect::{lsmod_columns, lsmod_row, module_list};
use memlens::image::WalkOptions;
use memlens::render::{RenderOptions, RendererRegistry, emit_table};

use crate::cmd::util::{ImageArgs, Session, stdout_sink};

#[derive(clap::Args)]
pub struct Args {
	#[command(flatten)]
	pub source: ImageArgs,
	/// Maximum list entries to visit.
	#[arg(long = "max-steps", default_value_t = WalkOptions::default().max_steps)]
	pub max_steps: usize,
	#[arg(long)]
	pub json: bool,
}

/// List modules linked into the kernel's `modules` list.
pub fn run(args: Args) -> Result<()> {
	let session = Session::load(&args.source)?;
	let mem = session.mem();

	let walk = module_list(mem, &WalkOptions { max_steps: args.max_steps })?;
	let rows: Vec<_> = walk.items.iter().map(lsmod_row).collect();

	let registry = RendererRegistry::with_builtins();
	let mut sink = stdout_sink(args.json, session.profile.pointer_size);
	emit_table(&registry, sink.as_mut(), &lsmod_columns()?, &rows, session.profile.pointer_size, &RenderOptions::default())
}

#[cfg(test)]
mod tests;
