use memlens::Result;

use crate::cmd::util::{ImageArgs, Session, emit_json, ptr_hex};

#[derive(clap::Args)]
pub struct Args {
	#[command(flatten)]
	pub source: ImageArgs,
	#[arg(long)]
	pub json: bool,
}

/// Print image segments, compression and a profile summary.
pub fn run(args: Args) -> Result<()> {
	let session = Session::load(&args.source)?;
	let segments: Vec<SegmentJson> = session
		.image
		.space()
		.segments()
		.iter()
		.map(|segment| SegmentJson {
			start: ptr_hex(segment.start),
			end: ptr_hex(segment.end()),
			len: segment.bytes.len(),
		})
		.collect();
	let payload = InfoJson {
		image: args.source.image.display().to_string(),
		compression: session.image.compression.as_str().to_owned(),
		segments,
		pointer_size: session.profile.pointer_size,
		endianness: format!("{:?}", session.profile.endianness).to_lowercase(),
		structs: session.profile.structs.len(),
		constants: session.profile.constants.iter().map(|(name, addr)| (name.clone(), ptr_hex(*addr))).collect(),
	};

	if args.json {
		return emit_json(&payload);
	}

	println!("image: {}", payload.image);
	println!("compression: {}", payload.compression);
	println!("segments: {}", payload.segments.len());
	for segment in &payload.segments {
		println!("  {}-{}\t{} bytes", segment.start, segment.end, segment.len);
	}
	println!("pointer_size: {}", payload.pointer_size);
	println!("endianness: {}", payload.endianness);
	println!("structs: {}", payload.structs);
	println!("constants: {}", payload.constants.len());
	for (name, addr) in &payload.constants {
		println!("  {addr}\t{name}");
	}
	Ok(())
}

#[derive(serde::Serialize)]
struct SegmentJson {
	start: String,
	end: String,
	len: usize,
}

#[derive(serde::Serialize)]
struct InfoJson {
	image: String,
	compression: String,
	segments: Vec<SegmentJson>,
	pointer_size: usize,
	endianness: String,
	structs: usize,
	constants: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
mod tests;
