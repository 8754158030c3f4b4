//! Tile-offset directory construction.
//!
//! Grounded in `VRC.cpp`'s `VRCDataset::Open` directory-reading loop
//! (standard maps) and its pay-per-tile reconstruction path (`mapID == 8`),
//! which has no on-disk directory and instead chains through each tile's
//! overview header to find where the next tile starts.

use crate::byteio::ByteReader;

const MIN_PLAUSIBLE_OFFSET: u32 = 16;
const SENTINEL_CEILING: u32 = 10_000;

fn looks_like_real_offset(entry: u32, file_len: usize) -> bool {
	if entry < MIN_PLAUSIBLE_OFFSET {
		return false;
	}
	if entry < SENTINEL_CEILING && entry % 100 == 0 {
		return false;
	}
	if entry as usize >= file_len {
		return false;
	}
	true
}

fn soft_check_tile_header(data: &[u8], offset: u32) -> bool {
	let offset = offset as usize;
	if offset + 4 > data.len() {
		return false;
	}
	u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap()) == 7
}

/// Reads `tile_x_count * tile_y_count` on-disk entries (column-major,
/// bottom-to-top) from `reader`'s current position and rotates them into
/// row-major, top-to-bottom order.
pub fn build_standard(reader: &mut ByteReader, nx: u32, ny: u32, file_len: usize) -> Vec<u32> {
	let mut directory = vec![0u32; (nx as usize) * (ny as usize)];
	let data = reader.data();
	for x in 0..nx {
		for disk_row in 0..ny {
			let entry = reader.read_u32_le().unwrap_or(0);
			if !looks_like_real_offset(entry, file_len) {
				continue;
			}
			if !soft_check_tile_header(data, entry) {
				log::warn!("tile at offset {entry} does not begin with the expected 7 marker");
			}
			let row = ny - 1 - disk_row;
			directory[(row * nx + x) as usize] = entry;
		}
	}
	directory
}

/// Reconstructs the directory for a pay-per-tile (`map_id == 8`) container
/// by chaining from `first_tile_offset` through each tile's overview header.
pub fn build_pay_per_tile(data: &[u8], first_tile_offset: usize, nx: u32, ny: u32) -> Vec<u32> {
	let mut directory = vec![0u32; (nx as usize) * (ny as usize)];
	let total = (nx as u64) * (ny as u64);
	let mut found: u64 = 0;
	let mut offset = first_tile_offset;

	while found < total {
		if offset >= data.len() {
			log::debug!("pay-per-tile reconstruction ran off the end of the file after {found} tiles");
			break;
		}
		let vrow = found % ny as u64;
		let col = found / ny as u64;
		let gdal_tile = col + vrow * nx as u64;
		if let Some(slot) = directory.get_mut(gdal_tile as usize) {
			*slot = offset as u32;
		}

		match end_of_last_overview(data, offset) {
			Some(end) => offset = end,
			None => {
				log::debug!("could not walk tile header at offset {offset}, stopping reconstruction");
				break;
			},
		}
		found += 1;
	}
	directory
}

/// Reads a tile header at `offset` (`u32_le 7` then seven overview offsets)
/// and returns the absolute end position of the physically-last overview's
/// sub-tile data, found via that overview's own `sub_tile_offset` bound
/// entry.
fn end_of_last_overview(data: &[u8], offset: usize) -> Option<usize> {
	let mut r = ByteReader::new(data);
	r.seek(offset);
	let marker = r.read_u32_le().ok()?;
	if marker != 7 {
		return None;
	}
	let mut overview_offsets = [0u32; 7];
	for slot in &mut overview_offsets {
		*slot = r.read_u32_le().ok()?;
	}

	let last_overview_offset = *overview_offsets.iter().filter(|&&o| o != 0).max()?;
	let mut r = ByteReader::new(data);
	r.seek(last_overview_offset as usize);
	let nx = r.read_u32_le().ok()?;
	let ny = r.read_u32_le().ok()?;
	let _png_x_size = r.read_u32_le().ok()?;
	let _png_y_size = r.read_u32_le().ok()?;
	let count = (nx as usize).checked_mul(ny as usize)?.checked_add(1)?;
	let mut last = 0u32;
	for _ in 0..count {
		last = r.read_u32_le().ok()?;
	}
	Some(last as usize)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn standard_rotates_column_major_bottom_up_to_row_major_top_down() {
		// nx=2, ny=2. On-disk column-major bottom-to-top: col0(bottom,top), col1(bottom,top).
		let entries: [u32; 4] = [1000, 2000, 3000, 4000];
		let mut bytes = Vec::new();
		for e in entries {
			bytes.extend_from_slice(&e.to_le_bytes());
		}
		let mut r = ByteReader::new(&bytes);
		let dir = build_standard(&mut r, 2, 2, bytes.len());
		// row 0 (top): col0 = 2000 (col0 top), col1 = 4000 (col1 top)
		// row 1 (bottom): col0 = 1000, col1 = 3000
		assert_eq!(dir, vec![2000, 4000, 1000, 3000]);
	}

	#[test]
	fn small_sentinel_multiples_are_zeroed() {
		assert!(!looks_like_real_offset(500, 1_000_000));
		assert!(!looks_like_real_offset(9900, 1_000_000));
		assert!(looks_like_real_offset(9901, 1_000_000));
	}

	#[test]
	fn out_of_file_offsets_are_zeroed() { assert!(!looks_like_real_offset(2_000_000, 1_000_000)); }

	#[test]
	fn pay_per_tile_walks_two_tiles() {
		// Tile A at offset 0: header(7, then overview offsets with only level 0 set)
		let mut data = Vec::new();
		data.extend_from_slice(&7u32.to_le_bytes()); // tile header marker
		let overview_offset: u32 = 32; // where the overview header starts
		data.extend_from_slice(&overview_offset.to_le_bytes());
		for _ in 0..6 {
			data.extend_from_slice(&0u32.to_le_bytes());
		}
		// pad to overview_offset
		while data.len() < overview_offset as usize {
			data.push(0);
		}
		// overview header: nx=1, ny=1, png_x_size, png_y_size, sub_tile_offset[2]
		data.extend_from_slice(&1u32.to_le_bytes());
		data.extend_from_slice(&1u32.to_le_bytes());
		data.extend_from_slice(&256u32.to_le_bytes());
		data.extend_from_slice(&256u32.to_le_bytes());
		data.extend_from_slice(&1000u32.to_le_bytes()); // sub_tile_offset[0]
		let end_of_tile_a: u32 = 2000;
		data.extend_from_slice(&end_of_tile_a.to_le_bytes()); // sub_tile_offset[1] (bound)

		while data.len() < end_of_tile_a as usize {
			data.push(0);
		}
		// Tile B's header at end_of_tile_a, doesn't matter what it contains for this test
		data.extend_from_slice(&7u32.to_le_bytes());

		let dir = build_pay_per_tile(&data, 0, 2, 1);
		assert_eq!(dir[0], 0);
		assert_eq!(dir[1], end_of_tile_a);
	}
}
