use std::path::PathBuf;

use clap::Args;
use vrc::{coverage::Window, OpenOptions, VrcDataset};

#[derive(Args)]
/// Report what fraction of a pixel window has real tile data, without decoding it.
pub struct Coverage {
	input: PathBuf,
	band: usize,
	x_off: i64,
	y_off: i64,
	x_size: i64,
	y_size: i64,
}

pub fn coverage(args: Coverage) {
	let dataset = match VrcDataset::open(&args.input, &OpenOptions::default()) {
		Ok(x) => x,
		Err(err) => {
			eprintln!("container could not be opened: {}", err);
			return;
		},
	};

	let Some(band) = dataset.band(args.band) else {
		eprintln!("no such band: {}", args.band);
		return;
	};

	let window = Window {
		x_off: args.x_off,
		y_off: args.y_off,
		x_size: args.x_size,
		y_size: args.y_size,
	};
	let (status, pct) = band.data_coverage(window, None);
	println!("status: {:?}", status);
	if pct < 0.0 {
		println!("coverage: unknown");
	} else {
		println!("coverage: {:.1}%", pct);
	}
}
