use memlens::image::Value;
use memlens::render::{RenderOptions, RendererRegistry, Verbosity};
use memlens::{MemlensError, Result};

use crate::cmd::util::{ImageArgs, Session, emit_json, parse_addr, ptr_hex};

#[derive(clap::Args)]
pub struct Args {
	#[command(flatten)]
	pub source: ImageArgs,
	/// Profile constant whose address holds the object.
	#[arg(long, conflicts_with = "addr", required_unless_present = "addr")]
	pub constant: Option<String>,
	/// Address of the object.
	#[arg(long, value_parser = parse_addr)]
	pub addr: Option<u64>,
	/// Struct type to view the address as.
	#[arg(long = "type")]
	pub type_name: String,
	/// address, full, compact, value or row.
	#[arg(long, default_value = "full")]
	pub verbosity: Verbosity,
	/// Render detail where renderers distinguish it (raw timestamps).
	#[arg(long)]
	pub details: bool,
	/// Output width hint.
	#[arg(long)]
	pub width: Option<usize>,
	/// Nested delegation depth before `-` is rendered.
	#[arg(long = "max-depth", default_value_t = RenderOptions::default().max_depth)]
	pub max_depth: usize,
	#[arg(long)]
	pub json: bool,
}

/// Render one typed object from the image.
pub fn run(args: Args) -> Result<()> {
	let session = Session::load(&args.source)?;
	let mem = session.mem();

	let (addr, label) = match (&args.constant, args.addr) {
		(Some(name), _) => {
			let addr = session.profile.constant(name).ok_or_else(|| MemlensError::UnknownConstant { name: name.clone() })?;
			(addr, name.clone())
		}
		(None, Some(addr)) => (addr, String::new()),
		(None, None) => return Err(MemlensError::InvalidAddressLiteral { value: "<missing>".to_owned() }),
	};

	let object = mem.struct_at(&args.type_name, addr)?.named(label);
	let options = RenderOptions {
		details: args.details,
		width: args.width,
		max_depth: args.max_depth,
		..RenderOptions::default()
	};
	let registry = RendererRegistry::with_builtins();
	let cell = registry.render(&Value::Object(object), args.verbosity, &options);

	if args.json {
		return emit_json(&ShowJson {
			addr: ptr_hex(addr),
			type_name: args.type_name,
			verbosity: args.verbosity.to_string(),
			lines: cell.lines().to_vec(),
		});
	}
	for line in cell.lines() {
		println!("{line}");
	}
	Ok(())
}

#[derive(serde::Serialize)]
struct ShowJson {
	addr: String,
	#[serde(rename = "type")]
	type_name: String,
	verbosity: String,
	lines: Vec<String>,
}
