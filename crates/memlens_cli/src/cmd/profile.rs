use memlens::Result;
use memlens::image::Profile;

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	/// JSON profile to list.
	#[arg(long)]
	pub profile: std::path::PathBuf,
	/// Show the members of one struct instead of the struct list.
	#[arg(long = "struct")]
	pub struct_name: Option<String>,
	#[arg(long)]
	pub json: bool,
}

/// List struct layouts, or the members of one struct ordered by offset.
pub fn run(args: Args) -> Result<()> {
	let profile = Profile::load(&args.profile)?;

	let Some(struct_name) = args.struct_name else {
		let structs: Vec<StructJson> = profile
			.structs
			.iter()
			.map(|(name, layout)| StructJson {
				name: name.clone(),
				size: layout.size,
				members: layout.members.len(),
			})
			.collect();
		if args.json {
			return emit_json(&structs);
		}
		println!("size\tmembers\tname");
		for row in &structs {
			println!("{}\t{}\t{}", row.size, row.members, row.name);
		}
		return Ok(());
	};

	let layout = profile.struct_layout(&struct_name)?;
	let mut members: Vec<MemberJson> = layout
		.members
		.iter()
		.map(|(name, member)| MemberJson {
			offset: member.offset,
			name: name.clone(),
			type_name: member.ty.type_name().into_owned(),
			size: member.ty.size(&profile),
		})
		.collect();
	members.sort_by(|a, b| a.offset.cmp(&b.offset).then_with(|| a.name.cmp(&b.name)));

	if args.json {
		return emit_json(&members);
	}
	println!("struct {struct_name} (size {})", layout.size);
	println!("offset\tsize\ttype\tname");
	for member in &members {
		let size = member.size.map_or_else(|| "-".to_owned(), |size| size.to_string());
		println!("0x{:04x}\t{size}\t{}\t{}", member.offset, member.type_name, member.name);
	}
	Ok(())
}

#[derive(serde::Serialize)]
struct StructJson {
	name: String,
	size: u64,
	members: usize,
}

#[derive(serde::Serialize)]
struct MemberJson {
	offset: u64,
	name: String,
	#[serde(rename = "type")]
	type_name: String,
	size: Option<u64>,
}
