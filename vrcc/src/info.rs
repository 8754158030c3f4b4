use std::path::PathBuf;

use clap::Args;
use vrc::{OpenOptions, VrcDataset};

#[derive(Args)]
/// Print a container's metadata, geotransform, and per-band overview counts.
pub struct Info {
	input: PathBuf,
}

pub fn info(info: Info) {
	let dataset = match VrcDataset::open(&info.input, &OpenOptions::default()) {
		Ok(x) => x,
		Err(err) => {
			eprintln!("container could not be opened: {}", err);
			return;
		},
	};

	let (width, height) = dataset.raster_size();
	let gt = dataset.geotransform();

	println!("Container");
	println!("  Title: {}", dataset.strings().long_title());
	println!("  Copyright: {}", dataset.strings().copyright());
	println!("  Size: {} x {}", width, height);
	println!(
		"  Geotransform: [{:.3}, {:.6}, {:.3}, {:.3}, {:.3}, {:.6}]",
		gt[0], gt[1], gt[2], gt[3], gt[4], gt[5]
	);
	println!("  EPSG: {}", dataset.spatial_reference().epsg);
	println!("  Bands: {}", dataset.band_count());

	for index in 1..=dataset.band_count() {
		let Some(band) = dataset.band(index) else { continue };
		println!(
			"    Band {}: {:?}, overviews={}",
			index,
			band.color_interpretation(),
			band.overview_count()
		);
	}
}
