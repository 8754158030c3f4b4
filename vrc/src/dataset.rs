//! The host-facing container and band types, tying together header
//! parsing, directory/overview lookup, PNG reconstruction, and sub-tile
//! composition into the `read_block` / `data_coverage` operations a raster
//! driver framework calls.
//!
//! Follows the `Mmap`-backed loading pattern used elsewhere for tile
//! containers, and mirrors `VRC.cpp`'s `VRCDataset` / `VRCRasterBand`
//! split between the container and its bands.

use std::{
	fmt::{Debug, Display},
	fs::File,
	path::Path,
	sync::Arc,
};

use memmap2::Mmap;

use crate::{
	compose, coverage,
	coverage::{CoverageStatus, Window},
	header::{ContainerHeader, Magic, OpenError, StringTable},
	overview::{self, TileHeader},
	png_reconstruct,
	subtile::SubTileGrid,
	thirtysix,
};

/// Host-settable knobs, replacing the original's `VRC_NOISY` /
/// `VRC_DUMP_TILE` / `VRC_MAX_SIZE` environment-variable switches with a
/// configuration struct threaded in at open time.
#[derive(Copy, Clone, Debug)]
pub struct OpenOptions {
	/// Upper bound on a single sub-tile's PNG scratch buffer. Sub-tiles
	/// that would need more are skipped as [`ReadError`] sub-tile failures.
	pub max_png_scratch_bytes: usize,
	/// Whether to log a diagnostic when a tile header's leading marker
	/// isn't exactly `7` (the container is still usable either way).
	pub verify_tile_header_marker: bool,
}

impl Default for OpenOptions {
	fn default() -> Self {
		Self {
			max_png_scratch_bytes: 4 * 1024 * 1024,
			verify_tile_header_marker: true,
		}
	}
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub enum ReadError {
	BlockIndexOutOfRange,
	BufferTooSmall,
}

impl Display for ReadError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::BlockIndexOutOfRange => write!(f, "block index outside the tile grid"),
			Self::BufferTooSmall => write!(f, "output buffer smaller than one block"),
		}
	}
}

impl Debug for ReadError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result { Display::fmt(self, f) }
}

impl std::error::Error for ReadError {}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ColorInterp {
	Red,
	Green,
	Blue,
	Alpha,
	Gray,
}

struct Shared {
	data: Mmap,
	header: ContainerHeader,
	options: OpenOptions,
}

/// A parsed, immutable VRC container. Owns the memory-mapped file, the
/// tile directory, and the palette/metadata derived at open time.
pub struct VrcDataset {
	shared: Arc<Shared>,
	bands: Vec<VrcBand>,
}

impl VrcDataset {
	pub fn open(path: &Path, options: &OpenOptions) -> Result<Self, OpenError> {
		tracy::zone!("VrcDataset::open");
		let file = File::open(path).map_err(|err| {
			log::error!("could not open {}: {err}", path.display());
			OpenError::Truncated
		})?;
		let data = unsafe {
			Mmap::map(&file).map_err(|err| {
				log::error!("could not mmap {}: {err}", path.display());
				OpenError::Truncated
			})?
		};
		let header = ContainerHeader::parse(&data)?;

		let shared = Arc::new(Shared {
			data,
			header,
			options: *options,
		});

		let band_count = match shared.header.magic {
			Magic::Metres => 4,
			Magic::ThirtySix => 1,
		};
		let bands = (1..=band_count)
			.map(|index| VrcBand::new_base(shared.clone(), index))
			.collect();

		Ok(Self { shared, bands })
	}

	pub fn raster_size(&self) -> (u32, u32) {
		(self.shared.header.raster_width as u32, self.shared.header.raster_height as u32)
	}

	/// `(left, pixel_w, 0, top, 0, -pixel_h)`, with the container's
	/// per-country coordinate adjustments applied to the origin only; pixel
	/// size is always derived from the raw bounding box extents.
	pub fn geotransform(&self) -> [f64; 6] {
		let header = &self.shared.header;
		let raw_left = header.outer_bbox.left as f64;
		let raw_right = header.outer_bbox.right as f64;
		let raw_bottom = header.outer_bbox.bottom as f64;
		let raw_top_adjusted = header.outer_bbox.top as f64 + header.top_skip_pixels as f64 * (header.scale as f64 / 10000.0);

		let (left, top) = adjust_origin(raw_left, raw_top_adjusted, &header.crs);

		let pixel_w = (raw_right - raw_left) / header.raster_width as f64;
		let pixel_h = (raw_top_adjusted - raw_bottom) / header.raster_height as f64;

		[left, pixel_w, 0.0, top, 0.0, -pixel_h]
	}

	pub fn spatial_reference(&self) -> &crate::crs::CrsInfo { &self.shared.header.crs }

	pub fn band_count(&self) -> usize { self.bands.len() }

	pub fn band(&self, index: usize) -> Option<&VrcBand> { self.bands.get(index.checked_sub(1)?) }

	pub fn strings(&self) -> &StringTable { &self.shared.header.strings }
}

/// Applies a country's coordinate adjustment to the geotransform origin
/// point only (`left`, `top`); pixel size deltas are never adjusted.
fn adjust_origin(left: f64, top: f64, crs: &crate::crs::CrsInfo) -> (f64, f64) {
	let (mut left, mut top) = (left, top);
	if let Some(scale) = crs.coordinate_scale {
		left /= scale;
		top /= scale;
	}
	if let Some(shift) = crs.y_shift {
		top += shift;
	}
	(left, top)
}

pub struct VrcBand {
	shared: Arc<Shared>,
	band_index: u32,
	level: i32,
	overviews: Vec<VrcBand>,
}

impl VrcBand {
	fn new_base(shared: Arc<Shared>, band_index: u32) -> Self {
		let max_overview = shared.header.max_overview_count as i32 - 1;
		let overviews = (0..max_overview.max(0))
			.map(|level| VrcBand {
				shared: shared.clone(),
				band_index,
				level,
				overviews: Vec::new(),
			})
			.collect();
		Self {
			shared,
			band_index,
			level: -1,
			overviews,
		}
	}

	pub fn color_interpretation(&self) -> ColorInterp {
		match (self.shared.header.magic, self.band_index) {
			(Magic::Metres, 1) => ColorInterp::Red,
			(Magic::Metres, 2) => ColorInterp::Green,
			(Magic::Metres, 3) => ColorInterp::Blue,
			(Magic::Metres, 4) => ColorInterp::Alpha,
			_ => ColorInterp::Gray,
		}
	}

	pub fn no_data_value(&self) -> f64 { 0.0 }

	/// Counts overview levels actually present in the first populated tile's
	/// overview table, capped at the structural capacity computed from
	/// `tile_size_max`/`tile_size_min`. Falls back to that structural count
	/// when no tile in the directory can be read (e.g. an empty container).
	pub fn overview_count(&self) -> usize {
		match self.present_overview_count_from_directory() {
			Some(present) => present.min(self.overviews.len()),
			None => self.overviews.len(),
		}
	}

	fn present_overview_count_from_directory(&self) -> Option<usize> {
		if self.level >= 0 {
			return None;
		}
		let data = &self.shared.data[..];
		let entry = self.shared.header.directory.iter().copied().find(|&e| e != 0)?;
		let tile_header = TileHeader::read(data, entry)?;
		Some(overview::present_overview_count(&tile_header))
	}

	pub fn overview(&self, level: usize) -> Option<&VrcBand> { self.overviews.get(level) }

	fn block_side(&self) -> u32 {
		let max = self.shared.header.tile_size_max;
		if self.level < 0 {
			max
		} else {
			max >> (self.level as u32 + 1)
		}
	}

	fn tile_grid(&self) -> (u32, u32) {
		(self.shared.header.tile_x_count.max(0) as u32, self.shared.header.tile_y_count.max(0) as u32)
	}

	/// Bytes per pixel this band's `read_block` writes: 1 for an ordinary
	/// metres RGBA channel, 4 for the thirty-six variant's `GDT_UInt32`
	/// match-count diagnostic.
	fn pixel_byte_size(&self) -> usize {
		match self.shared.header.magic {
			Magic::Metres => 1,
			Magic::ThirtySix => 4,
		}
	}

	pub fn read_block(&self, block_x: u32, block_y: u32, buf: &mut [u8]) -> Result<(), ReadError> {
		tracy::zone!("VrcBand::read_block");
		let (nx, ny) = self.tile_grid();
		if block_x >= nx || block_y >= ny {
			return Err(ReadError::BlockIndexOutOfRange);
		}
		let side = self.block_side();
		let needed = (side as usize) * (side as usize) * self.pixel_byte_size();
		if buf.len() < needed {
			return Err(ReadError::BufferTooSmall);
		}
		buf[..needed].fill(0);

		let data = &self.shared.data[..];
		let directory = &self.shared.header.directory;
		let entry = directory[(block_y * nx + block_x) as usize];
		if entry == 0 {
			return Ok(());
		}

		let file_len = data.len();
		let tile_header = match TileHeader::read(data, entry) {
			Some(h) => h,
			None => {
				log::debug!("tile ({block_x},{block_y}) header unreadable, emitting nodata");
				return Ok(());
			},
		};

		let selection = match overview::select_overview(&tile_header, self.level, file_len) {
			Some(s) => s,
			None => {
				log::debug!("tile ({block_x},{block_y}) overview level {} absent, emitting nodata", self.level);
				return Ok(());
			},
		};

		let grid = match SubTileGrid::read(data, selection.offset) {
			Some(g) => g,
			None => {
				log::debug!("tile ({block_x},{block_y}) sub-tile grid unreadable, emitting nodata");
				return Ok(());
			},
		};

		match self.shared.header.magic {
			Magic::Metres => self.compose_all_subtiles(&grid, data, side, selection.shrink_factor, &mut buf[..needed]),
			Magic::ThirtySix => {
				self.compose_all_subtiles_thirtysix(&grid, data, side, selection.shrink_factor, &mut buf[..needed])
			},
		}
		Ok(())
	}

	/// Fills every sub-tile's footprint with its signature match count
	/// (`u32`, little-endian), per the documented diagnostic-only strategy
	/// for the thirty-six variant's unsolved pixel encoding.
	fn compose_all_subtiles_thirtysix(&self, grid: &SubTileGrid, data: &[u8], block_side: u32, shrink_factor: u32, dst: &mut [u8]) {
		let n_x = grid.png_x_count;
		let n_y = grid.png_y_count;
		for sub_x in 0..n_x {
			for loop_y in 0..n_y {
				let vr_idx = compose::vr_index(sub_x, loop_y, n_y);
				let Some(&sub_offset) = grid.sub_tile_offset.get(vr_idx) else { continue };
				let Some(&sub_end) = grid.sub_tile_offset.get(vr_idx + 1) else { continue };
				if sub_offset == 0 || sub_end <= sub_offset {
					continue;
				}
				let head_len = ((sub_end - sub_offset) as usize).min(data.len().saturating_sub(sub_offset as usize));
				let head = &data[sub_offset as usize..sub_offset as usize + head_len];
				let match_count = thirtysix::verify_signature(head) as u32;

				let top_row = compose::top_row_for(loop_y, grid.png_y_size, shrink_factor, block_side);
				let left_col = compose::left_col_for(sub_x, grid.png_x_size, shrink_factor);
				let width = grid.png_x_size / shrink_factor;
				let height = grid.png_y_size / shrink_factor;
				compose::fill_constant_u32(dst, block_side, block_side, top_row, left_col, width, height, match_count);
			}
		}
	}

	fn compose_all_subtiles(&self, grid: &SubTileGrid, data: &[u8], block_side: u32, shrink_factor: u32, dst: &mut [u8]) {
		let n_x = grid.png_x_count;
		let n_y = grid.png_y_count;
		for sub_x in 0..n_x {
			for loop_y in 0..n_y {
				let vr_idx = compose::vr_index(sub_x, loop_y, n_y);
				let Some(&sub_offset) = grid.sub_tile_offset.get(vr_idx) else { continue };
				let Some(&sub_end) = grid.sub_tile_offset.get(vr_idx + 1) else { continue };
				if sub_offset == 0 || sub_end <= sub_offset {
					continue;
				}
				let data_len = (sub_end - sub_offset).saturating_sub(0x12);

				let decoded = match png_reconstruct::reconstruct_and_decode(
					data,
					sub_offset,
					grid.palette_offset,
					data_len,
					self.shared.options.max_png_scratch_bytes,
				) {
					Ok(d) => d,
					Err(e) => {
						log::debug!("sub-tile at {sub_offset} skipped: {e}");
						continue;
					},
				};

				let top_row = compose::top_row_for(loop_y, grid.png_y_size, shrink_factor, block_side);
				let left_col = compose::left_col_for(sub_x, grid.png_x_size, shrink_factor);

				if shrink_factor == 1 {
					compose::compose_direct(
						dst,
						block_side,
						block_side,
						top_row,
						left_col,
						&decoded.rgb,
						decoded.width,
						decoded.height,
						self.band_index,
					);
				} else {
					compose::compose_downsample(
						dst,
						block_side,
						block_side,
						top_row,
						left_col,
						&decoded.rgb,
						decoded.width,
						decoded.height,
						self.band_index,
					);
				}
			}
		}
	}

	pub fn data_coverage(&self, window: Window, early_exit_mask: Option<CoverageStatus>) -> (CoverageStatus, f64) {
		let (nx, ny) = self.tile_grid();
		let side = self.block_side();
		let header = &self.shared.header;
		// Right-edge short tiles are never adjusted, so the valid column range is
		// always the full raster width at this overview's scale.
		let left_valid = 0i64;
		let right_valid = if self.level < 0 {
			header.raster_width as i64
		} else {
			header.raster_width as i64 >> (self.level + 1)
		};
		coverage::compute_coverage(
			&header.directory,
			nx,
			ny,
			side,
			side,
			window,
			left_valid,
			right_valid,
			early_exit_mask,
		)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	/// A handcrafted minimal container: magic metres, one string ("title"),
	/// scale 10_000 (1m pixels), one 8x8 tile with a single 8x8 sub-tile
	/// whose PNG decodes to a constant RGB colour (10, 20, 30).
	#[rustfmt::skip]
	const MINIMAL_CONTAINER: &[u8] = &[
		0x7e, 0x1f, 0x2e, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x0f, 0x09, 0x00, 0x00,
		0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x74, 0x69, 0x74, 0x6c, 0x65, 0x00,
		0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10,
		0x27, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00,
		0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x6e, 0x00, 0x00, 0x00, 0x07,
		0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00,
		0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x07, 0x00,
		0x00, 0x00, 0x8e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
		0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
		0x01, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0xa6, 0x00, 0x00, 0x00,
		0xd5, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x08, 0x08, 0x02, 0x00,
		0x00, 0x00, 0x4b, 0x6d, 0x29, 0xdc, 0x00, 0x00, 0x00, 0x11, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda,
		0x63, 0xe0, 0x12, 0x91, 0xc3, 0x8a, 0x18, 0x86, 0x96, 0x04, 0x00, 0xd8, 0x13, 0x0f, 0x01, 0xbd,
		0x7d, 0x4c, 0xaa,
	];

	fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(bytes).unwrap();
		file.flush().unwrap();
		file
	}

	#[test]
	fn container_round_trip_constant_colour_tile() {
		let file = write_temp(MINIMAL_CONTAINER);
		let dataset = VrcDataset::open(file.path(), &OpenOptions::default()).unwrap();

		assert_eq!(dataset.raster_size(), (8, 8));
		assert_eq!(dataset.band_count(), 4);

		let mut buf = vec![0u8; 64];
		dataset.band(1).unwrap().read_block(0, 0, &mut buf).unwrap();
		assert!(buf.iter().all(|&b| b == 10));

		dataset.band(2).unwrap().read_block(0, 0, &mut buf).unwrap();
		assert!(buf.iter().all(|&b| b == 20));

		dataset.band(3).unwrap().read_block(0, 0, &mut buf).unwrap();
		assert!(buf.iter().all(|&b| b == 30));

		dataset.band(4).unwrap().read_block(0, 0, &mut buf).unwrap();
		assert!(buf.iter().all(|&b| b == 0));
	}

	#[test]
	fn geotransform_has_no_rotation_terms() {
		let file = write_temp(MINIMAL_CONTAINER);
		let dataset = VrcDataset::open(file.path(), &OpenOptions::default()).unwrap();
		let gt = dataset.geotransform();
		assert_eq!(gt[2], 0.0);
		assert_eq!(gt[4], 0.0);
		assert_eq!(gt[1], 1.0);
		assert_eq!(gt[5], -1.0);
	}

	#[test]
	fn country_17_adjusts_origin_only() {
		let crs = crate::crs::crs_for_country(17);
		let (left, top) = adjust_origin(0.0, 9_000_000.0, &crs);
		assert_eq!(left, 0.0);
		assert_eq!(top, 1.0);
	}

	#[test]
	fn country_155_shifts_top_by_ten_million() {
		let crs = crate::crs::crs_for_country(155);
		let (left, top) = adjust_origin(0.0, 100.0, &crs);
		assert_eq!(left, 0.0);
		assert_eq!(top, 10_000_100.0);
	}
}

