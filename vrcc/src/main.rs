use clap::{Parser, Subcommand};

use crate::{coverage::Coverage, info::Info};

mod coverage;
mod info;

#[derive(Parser)]
struct Options {
	#[clap(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	Info(Info),
	Coverage(Coverage),
}

fn main() {
	env_logger::init();

	let opts: Options = Options::parse();
	match opts.command {
		Command::Info(info) => info::info(info),
		Command::Coverage(coverage) => coverage::coverage(coverage),
	}
}
