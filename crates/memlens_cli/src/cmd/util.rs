use std::io::{self, Write};
use std::path::PathBuf;

use memlens::image::{Memory, MemoryImage, Profile, parse_address};
use memlens::render::{JsonSink, TableSink, TextSink};
use memlens::{MemlensError, Result};

/// Image and profile selection shared by every command.
#[derive(clap::Args)]
pub struct ImageArgs {
	/// Raw or zstd-compressed memory dump.
	#[arg(long)]
	pub image: PathBuf,
	/// Address the first byte of the dump is mapped at.
	#[arg(long, default_value = "0", value_parser = parse_addr)]
	pub base: u64,
	/// JSON profile describing struct layouts and constants.
	#[arg(long)]
	pub profile: PathBuf,
}

/// A loaded image with its profile.
pub struct Session {
	pub image: MemoryImage,
	pub profile: Profile,
}

impl Session {
	pub fn load(args: &ImageArgs) -> Result<Self> {
		let profile = Profile::load(&args.profile)?;
		let image = MemoryImage::open(&args.image, args.base)?;
		log::debug!("session: {} at {} with profile {}", args.image.display(), ptr_hex(args.base), args.profile.display());
		Ok(Self { image, profile })
	}

	pub fn mem(&self) -> Memory<'_> {
		Memory::new(&self.profile, self.image.space())
	}
}

/// Parse a decimal or `0x` hex address argument.
pub fn parse_addr(value: &str) -> Result<u64> {
	parse_address(value).ok_or_else(|| MemlensError::InvalidAddressLiteral { value: value.to_owned() })
}

pub fn ptr_hex(addr: u64) -> String {
	format!("0x{addr:016x}")
}

/// Table sink over stdout: JSON rows or an aligned text table.
pub fn stdout_sink(json: bool, pointer_size: usize) -> Box<dyn TableSink> {
	if json {
		Box::new(JsonSink::new(io::stdout()))
	} else {
		Box::new(TextSink::new(io::stdout()).with_pointer_size(pointer_size))
	}
}

pub fn emit_json<T: serde::Serialize>(value: &T) -> Result<()> {
	let mut out = io::stdout().lock();
	serde_json::to_writer_pretty(&mut out, value)?;
	writeln!(out)?;
	Ok(())
}
