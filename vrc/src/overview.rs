//! Per-tile overview header and overview-level selection.
//!
//! Grounded in `VRC.h`'s tile layout comment and `VRCDataset::IReadBlock`'s
//! overview-offset lookup: each nonzero directory entry points at a 7-entry
//! table (a leading `7` plus seven absolute offsets, index 0 = full
//! resolution, 1..6 successively halved overviews).

use crate::byteio::ByteReader;

pub const MAX_OVERVIEW_LEVEL: i32 = 5;

#[derive(Copy, Clone, Debug)]
pub struct TileHeader {
	pub overview_offset: [u32; 7],
}

impl TileHeader {
	/// Reads the tile header at `offset`. Returns `None` if the leading
	/// marker isn't `7` or the read runs past the end of the file.
	pub fn read(data: &[u8], offset: u32) -> Option<Self> {
		if offset == 0 {
			return None;
		}
		let mut r = ByteReader::new(data);
		r.seek(offset as usize);
		let marker = r.read_u32_le().ok()?;
		if marker != 7 {
			log::debug!("tile header at {offset} does not start with the expected 7 marker");
			return None;
		}
		let mut overview_offset = [0u32; 7];
		for slot in &mut overview_offset {
			*slot = r.read_u32_le().ok()?;
		}
		Some(Self { overview_offset })
	}
}

#[derive(Copy, Clone, Debug)]
pub struct OverviewSelection {
	pub offset: u32,
	pub shrink_factor: u32,
}

/// Selects which on-disk overview to read from for a requested level
/// (`-1` = base, `0..=5` = overview levels). If the exact level is absent
/// but the next-finer level is present, the finer level is selected with
/// `shrink_factor = 2` so the caller can downsample. Returns `None` if
/// neither is present.
pub fn select_overview(header: &TileHeader, overview: i32, file_len: usize) -> Option<OverviewSelection> {
	let index = (overview + 1) as usize;
	if index >= header.overview_offset.len() {
		return None;
	}

	let plausible = |o: u32| o != 0 && (o as usize) < file_len;

	let exact = header.overview_offset[index];
	if plausible(exact) {
		return Some(OverviewSelection {
			offset: exact,
			shrink_factor: 1,
		});
	}
	if index == 0 {
		return None;
	}
	let finer = header.overview_offset[index - 1];
	if plausible(finer) {
		return Some(OverviewSelection {
			offset: finer,
			shrink_factor: 2,
		});
	}
	None
}

/// How many overview levels (beyond the base) actually have offsets
/// present, scanning from level 0 upward and stopping at the first gap.
pub fn present_overview_count(header: &TileHeader) -> usize {
	header.overview_offset[1..].iter().take_while(|&&o| o != 0).count()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn header_with(offsets: [u32; 7]) -> TileHeader { TileHeader { overview_offset: offsets } }

	#[test]
	fn exact_level_present_has_shrink_one() {
		let header = header_with([100, 200, 300, 0, 0, 0, 0]);
		let sel = select_overview(&header, 0, 1_000_000).unwrap();
		assert_eq!(sel.offset, 200);
		assert_eq!(sel.shrink_factor, 1);
	}

	#[test]
	fn missing_level_falls_back_to_finer_with_shrink_two() {
		let header = header_with([100, 200, 0, 0, 0, 0, 0]);
		let sel = select_overview(&header, 1, 1_000_000).unwrap();
		assert_eq!(sel.offset, 200);
		assert_eq!(sel.shrink_factor, 2);
	}

	#[test]
	fn missing_base_and_finer_is_none() {
		let header = header_with([0, 0, 300, 0, 0, 0, 0]);
		assert!(select_overview(&header, 0, 1_000_000).is_none());
	}

	#[test]
	fn present_overview_count_stops_at_first_gap() {
		// overview_offset[0] is the base tile, not an overview level, so the
		// count below only ever looks at indices 1..6: 200, 300, 400, 500 are
		// present, then index 5 (0) stops the scan before index 6 (700).
		let header = header_with([100, 200, 300, 400, 500, 0, 700]);
		assert_eq!(present_overview_count(&header), 4);
	}

	#[test]
	fn tile_header_rejects_wrong_marker() {
		let mut data = Vec::new();
		data.extend_from_slice(&8u32.to_le_bytes());
		assert!(TileHeader::read(&data, 0).is_none());
	}
}
