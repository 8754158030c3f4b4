//! Placing decoded sub-tile pixels into a tile's block buffer.
//!
//! Grounded in `VRC.cpp`'s `VRCRasterBand::ReadBlockFromPNGTile` copy loop:
//! sub-tiles are stored bottom-up, left-to-right on disk (VR order) but the
//! block buffer is filled top-down (GDAL order), so the row position is
//! computed by walking GDAL rows and mapping each one back to its VR index.

/// Position, within a VR sub-tile grid of `n_y` rows, of the GDAL-order row
/// `loop_y` (0 = topmost).
pub fn vr_row_for_gdal_row(loop_y: u32, n_y: u32) -> u32 { n_y - 1 - loop_y }

/// The flat index into `sub_tile_offset` for a sub-tile at VR column
/// `sub_x`, GDAL row `loop_y`.
pub fn vr_index(sub_x: u32, loop_y: u32, n_y: u32) -> usize {
	let sub_y = vr_row_for_gdal_row(loop_y, n_y);
	(sub_y + sub_x * n_y) as usize
}

/// The top row, in block-buffer coordinates, at which GDAL row `loop_y`
/// should be placed. May be negative for a short-top tile's topmost row.
pub fn top_row_for(loop_y: u32, png_h: u32, shrink_factor: u32, block_h: u32) -> i32 {
	let effective_h = (png_h / shrink_factor) as i32;
	block_h as i32 - (loop_y as i32 + 1) * effective_h
}

pub fn left_col_for(sub_x: u32, png_w: u32, shrink_factor: u32) -> u32 { sub_x * (png_w / shrink_factor) }

/// Clamps a possibly-negative top row to zero, logging when the clamp
/// discards more than a single row (i.e. something other than a short-top
/// single-sub-tile-tall tile).
pub fn clamp_top_row(top_row: i32) -> u32 {
	if top_row < 0 {
		log::debug!("sub-tile top_row {top_row} is negative, clamping to 0");
		0
	} else {
		top_row as u32
	}
}

/// Direct (no downsample) copy of one band of a decoded RGB sub-tile into
/// `dst`, a `block_w * block_h` single-channel buffer. Band 4 (alpha) is
/// left untouched, per the nodata contract.
pub fn compose_direct(
	dst: &mut [u8], block_w: u32, block_h: u32, top_row: i32, left_col: u32, src_rgb: &[u8], png_w: u32, png_h: u32,
	band: u32,
) {
	if band == 4 {
		return;
	}
	let top_row = clamp_top_row(top_row);
	if left_col >= block_w || top_row >= block_h {
		return;
	}
	let copy_stop_row = png_h.min(block_h - top_row);
	let copy_stop_col = png_w.min(block_w - left_col);
	let b = band - 1;
	for ii in 0..copy_stop_row {
		for jj in 0..copy_stop_col {
			let src_idx = (3 * png_w * ii + 3 * jj + b) as usize;
			let dst_idx = ((top_row + ii) * block_w + left_col + jj) as usize;
			dst[dst_idx] = src_rgb[src_idx];
		}
	}
}

/// 2x2-box-filter downsample of one band of a decoded RGB sub-tile into
/// `dst`. Out-of-bounds source pixels (an odd trailing row/column)
/// contribute zero to the average, matching the source pixel width used
/// by the `(png_h + 1) / 2` output bound.
pub fn compose_downsample(
	dst: &mut [u8], block_w: u32, block_h: u32, top_row: i32, left_col: u32, src_rgb: &[u8], png_w: u32, png_h: u32,
	band: u32,
) {
	if band == 4 {
		return;
	}
	let top_row = clamp_top_row(top_row);
	if left_col >= block_w || top_row >= block_h {
		return;
	}
	let out_h = (png_h + 1) / 2;
	let out_w = (png_w + 1) / 2;
	let copy_stop_row = out_h.min(block_h - top_row);
	let copy_stop_col = out_w.min(block_w - left_col);
	let b = band - 1;

	let sample = |y: u32, x: u32| -> u32 {
		if y < png_h && x < png_w {
			src_rgb[(3 * png_w * y + 3 * x + b) as usize] as u32
		} else {
			0
		}
	};

	for ii in 0..copy_stop_row {
		for jj in 0..copy_stop_col {
			let sum = sample(2 * ii, 2 * jj) + sample(2 * ii + 1, 2 * jj) + sample(2 * ii, 2 * jj + 1) + sample(2 * ii + 1, 2 * jj + 1);
			let dst_idx = ((top_row + ii) * block_w + left_col + jj) as usize;
			dst[dst_idx] = (sum / 4) as u8;
		}
	}
}

/// Fills a sub-tile's footprint in a `u32`-per-pixel canvas with a constant
/// value, 4 bytes per cell, little-endian. Used for the thirty-six variant's
/// match-count diagnostic pixels, which have no real per-pixel image data.
pub fn fill_constant_u32(dst: &mut [u8], block_w: u32, block_h: u32, top_row: i32, left_col: u32, width: u32, height: u32, value: u32) {
	let top_row = clamp_top_row(top_row);
	if left_col >= block_w || top_row >= block_h {
		return;
	}
	let copy_stop_row = height.min(block_h - top_row);
	let copy_stop_col = width.min(block_w - left_col);
	let bytes = value.to_le_bytes();
	for ii in 0..copy_stop_row {
		for jj in 0..copy_stop_col {
			let dst_idx = (((top_row + ii) * block_w + left_col + jj) * 4) as usize;
			dst[dst_idx..dst_idx + 4].copy_from_slice(&bytes);
		}
	}
}
