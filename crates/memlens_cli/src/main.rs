#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

mod cmd;

#[derive(Parser)]
#[command(name = "memlens", version, about = "Typed rendering and cross-view checks over memory images")]
struct Cli {
	/// Raise log verbosity (repeat for more: warn, info, debug, trace).
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Summarise the image and profile.
	Info(cmd::info::Args),
	/// List struct layouts from the profile.
	Profile(cmd::profile::Args),
	/// Render one typed object.
	Show(cmd::show::Args),
	/// List modules linked into the kernel's module list.
	Lsmod(cmd::lsmod::Args),
	/// Report sysfs-registered modules missing from the module list.
	CheckModules(cmd::check_modules::Args),
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> memlens::Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match cli.command {
		Command::Info(args) => cmd::info::run(args),
		Command::Profile(args) => cmd::profile::run(args),
		Command::Show(args) => cmd::show::run(args),
		Command::Lsmod(args) => cmd::lsmod::run(args),
		Command::CheckModules(args) => cmd::check_modules::run(args),
	}
}

fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => LevelFilter::Error,
		1 => LevelFilter::Warn,
		2 => LevelFilter::Info,
		3 => LevelFilter::Debug,
		_ => LevelFilter::Trace,
	};
	if TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto).is_err() {
		eprintln!("warning: logger already initialised");
	}
}
