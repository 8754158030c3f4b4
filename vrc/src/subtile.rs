//! Sub-tile grid header and the optional shared-palette record that follows
//! it.
//!
//! Grounded in `VRC.h`'s `VRCPNGTile` comment block: each overview is itself
//! a grid of PNG sub-tiles, indexed by an offset table with one extra
//! trailing entry that bounds the last sub-tile's byte length.

use crate::byteio::ByteReader;

pub struct SubTileGrid {
	pub png_x_count: u32,
	pub png_y_count: u32,
	pub png_x_size: u32,
	pub png_y_size: u32,
	/// `png_x_count * png_y_count + 1` absolute offsets; the last entry
	/// bounds the final sub-tile rather than addressing one.
	pub sub_tile_offset: Vec<u32>,
	/// Offset of the palette record, if one follows the offset table and
	/// passes its consistency checks.
	pub palette_offset: Option<u32>,
}

impl SubTileGrid {
	pub fn sub_tile_count(&self) -> usize { (self.png_x_count as usize) * (self.png_y_count as usize) }

	pub fn read(data: &[u8], offset: u32) -> Option<Self> {
		let mut r = ByteReader::new(data);
		r.seek(offset as usize);

		let png_x_count = r.read_u32_le().ok()?;
		let png_y_count = r.read_u32_le().ok()?;
		let png_x_size = r.read_u32_le().ok()?;
		let png_y_size = r.read_u32_le().ok()?;

		let count = (png_x_count as usize).checked_mul(png_y_count as usize)?.checked_add(1)?;
		let mut sub_tile_offset = Vec::with_capacity(count);
		for _ in 0..count {
			sub_tile_offset.push(r.read_u32_le().ok()?);
		}

		let palette_offset = validate_palette_record(data, r.position() as u32);

		Some(Self {
			png_x_count,
			png_y_count,
			png_x_size,
			png_y_size,
			sub_tile_offset,
			palette_offset,
		})
	}
}

/// Checks that the palette record at `offset` is internally consistent
/// (`vrc_len - png_len == 8`, `png_len % 3 == 0`); returns `offset` if so.
fn validate_palette_record(data: &[u8], offset: u32) -> Option<u32> {
	let mut r = ByteReader::new(data);
	r.seek(offset as usize);
	let vrc_len = r.read_u32_le().ok()?;
	let png_len = r.read_u32_be().ok()?;
	if vrc_len < 8 || vrc_len - 8 != png_len {
		return None;
	}
	if png_len % 3 != 0 {
		return None;
	}
	Some(offset)
}

/// Reads the palette body (`png_len` bytes of RGB triples) plus its 4-byte
/// CRC, given a record already validated by [`validate_palette_record`].
pub fn read_palette_body(data: &[u8], offset: u32) -> Option<(&[u8], u32)> {
	let mut r = ByteReader::new(data);
	r.seek(offset as usize);
	let _vrc_len = r.read_u32_le().ok()?;
	let png_len = r.read_u32_be().ok()?;
	let body = r.read_bytes(png_len as usize).ok()?;
	let crc = r.read_u32_be().ok()?;
	Some((body, crc))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn build_grid(nx: u32, ny: u32, offsets: &[u32]) -> Vec<u8> {
		let mut data = Vec::new();
		data.extend_from_slice(&nx.to_le_bytes());
		data.extend_from_slice(&ny.to_le_bytes());
		data.extend_from_slice(&256u32.to_le_bytes());
		data.extend_from_slice(&256u32.to_le_bytes());
		for o in offsets {
			data.extend_from_slice(&o.to_le_bytes());
		}
		data
	}

	#[test]
	fn reads_grid_dimensions_and_offsets() {
		let data = build_grid(2, 1, &[100, 200, 300]);
		let grid = SubTileGrid::read(&data, 0).unwrap();
		assert_eq!(grid.sub_tile_count(), 2);
		assert_eq!(grid.sub_tile_offset, vec![100, 200, 300]);
	}

	#[test]
	fn palette_record_with_bad_length_relation_is_rejected() {
		let mut data = build_grid(1, 1, &[100, 200]);
		data.extend_from_slice(&20u32.to_le_bytes()); // vrc_len
		data.extend_from_slice(&9u32.to_be_bytes()); // png_len, should be vrc_len-8=12
		let grid = SubTileGrid::read(&data, 0).unwrap();
		assert!(grid.palette_offset.is_none());
	}

	#[test]
	fn palette_record_with_non_multiple_of_three_is_rejected() {
		let mut data = build_grid(1, 1, &[100, 200]);
		data.extend_from_slice(&18u32.to_le_bytes()); // vrc_len
		data.extend_from_slice(&10u32.to_be_bytes()); // png_len = vrc_len - 8, but not %3==0
		let grid = SubTileGrid::read(&data, 0).unwrap();
		assert!(grid.palette_offset.is_none());
	}

	#[test]
	fn valid_palette_record_is_accepted() {
		let mut data = build_grid(1, 1, &[100, 200]);
		data.extend_from_slice(&14u32.to_le_bytes()); // vrc_len
		data.extend_from_slice(&6u32.to_be_bytes()); // png_len = 6, multiple of 3
		data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
		data.extend_from_slice(&0xAABBCCDDu32.to_be_bytes());
		let grid = SubTileGrid::read(&data, 0).unwrap();
		assert!(grid.palette_offset.is_some());
		let (body, crc) = read_palette_body(&data, grid.palette_offset.unwrap()).unwrap();
		assert_eq!(body, &[1, 2, 3, 4, 5, 6]);
		assert_eq!(crc, 0xAABBCCDD);
	}
}
