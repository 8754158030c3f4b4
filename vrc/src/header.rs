//! Container header: the fixed-layout prefix every VRC file starts with,
//! up to and including the tile directory and inner bounding box.
//!
//! Grounded in `VRC.cpp`'s `VRCDataset::Open` and `VRC.h`'s field layout
//! comment. Field order, offsets, and the "conventionally 7" / opaque-byte
//! observations are taken directly from there.

use std::fmt::{Debug, Display};

use crate::{
	byteio::{read_length_prefixed, ByteReader, ReadError},
	charset::{charset_for_country, recode},
	crs::{crs_for_country, CrsInfo},
	directory,
};

pub const MAGIC_METRES: u32 = 0x002e_1f7e;
pub const MAGIC_THIRTYSIX: u32 = 0x01ce_6336;

const MARKER: [u8; 11] = [0x07, 0, 0, 0, 0x01, 0, 0x01, 0, 0x01, 0, 0x01];
const PAY_PER_TILE_MAP_ID: i32 = 8;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Magic {
	Metres,
	ThirtySix,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct BBox {
	pub left: i32,
	pub top: i32,
	pub right: i32,
	pub bottom: i32,
}

/// A container's recoded string table. Index 0 is the long title, 1 the
/// copyright notice, 5 the device id; everything else is opaque metadata
/// preserved for round-tripping but not otherwise interpreted.
#[derive(Clone, Debug, Default)]
pub struct StringTable {
	entries: Vec<String>,
}

impl StringTable {
	pub fn get(&self, index: usize) -> Option<&str> { self.entries.get(index).map(String::as_str) }

	pub fn long_title(&self) -> &str { self.get(0).unwrap_or("") }

	pub fn copyright(&self) -> &str { self.get(1).unwrap_or("") }

	pub fn device_id(&self) -> &str { self.get(5).unwrap_or("") }

	pub fn len(&self) -> usize { self.entries.len() }

	pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub enum OpenError {
	UnknownMagic,
	ZeroScale,
	PixelTooSmall,
	InvalidRasterSize,
	ZeroTileSize,
	Truncated,
}

impl Display for OpenError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::UnknownMagic => write!(f, "unrecognised magic number"),
			Self::ZeroScale => write!(f, "scale field is zero"),
			Self::PixelTooSmall => write!(f, "pixel size below 0.5m"),
			Self::InvalidRasterSize => write!(f, "raster width or height is not positive"),
			Self::ZeroTileSize => write!(f, "tile_size_max is zero"),
			Self::Truncated => write!(f, "file is shorter than the header requires"),
		}
	}
}

impl Debug for OpenError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result { Display::fmt(self, f) }
}

impl std::error::Error for OpenError {}

impl From<ReadError> for OpenError {
	fn from(err: ReadError) -> Self {
		log::error!("header field read failed: {err}");
		Self::Truncated
	}
}

pub struct ContainerHeader {
	pub magic: Magic,
	pub download_id: u16,
	pub country_code: i16,
	pub sentinel: [u8; 4],
	pub byte_0c: u8,
	pub byte_0d: u8,
	pub map_id: i32,
	pub strings: StringTable,
	pub outer_bbox: BBox,
	pub scale: u32,
	pub tile_size_max: u32,
	pub tile_size_min: u32,
	/// Conventionally `7`; preserved but not otherwise checked.
	pub tile_header_marker_field: u32,
	/// Never verified upstream; preserved as opaque metadata.
	pub checksum: u32,
	pub tile_x_count: i32,
	pub tile_y_count: i32,
	pub directory: Vec<u32>,
	pub inner_bbox: BBox,
	pub third_marker_field: u32,
	pub max_overview_count: u32,
	pub raster_width: i32,
	pub raster_height: i32,
	pub top_skip_pixels: i32,
	pub crs: CrsInfo,
}

impl ContainerHeader {
	pub fn parse(data: &[u8]) -> Result<Self, OpenError> {
		let file_len = data.len();
		let mut r = ByteReader::new(data);

		let magic_raw = r.read_u32_le()?;
		let magic = if magic_raw == MAGIC_METRES {
			Magic::Metres
		} else if magic_raw == MAGIC_THIRTYSIX {
			Magic::ThirtySix
		} else {
			log::error!("unrecognised magic number {magic_raw:#010x}");
			return Err(OpenError::UnknownMagic);
		};

		let download_id = r.read_u16_le()?;
		let country_code = r.read_u16_le()? as i16;
		let mut sentinel = [0u8; 4];
		sentinel.copy_from_slice(r.read_bytes(4)?);
		let byte_0c = r.read_u8()?;
		if byte_0c != 0x0F {
			log::warn!("byte 0x0C is {byte_0c:#04x}, not the conventional 0x0F");
		}
		let byte_0d = r.read_u8()?;
		let map_id = r.read_i32_le()?;

		let mut string_count = r.read_u32_le()?;
		if string_count == 0 && map_id == PAY_PER_TILE_MAP_ID {
			log::warn!("string_count == 0 with map_id == 8, skipping 4 bytes and retrying");
			r.read_u32_le()?;
			string_count = r.read_u32_le()?;
		}

		let charset = charset_for_country(country_code);
		let mut entries = Vec::with_capacity(string_count as usize);
		for _ in 0..string_count {
			let raw = read_length_prefixed(data, r.position())?;
			let len = raw.len();
			entries.push(recode(raw, charset));
			r.seek(r.position() + 4 + len);
		}
		let strings = StringTable { entries };

		let outer_bbox = BBox {
			left: r.read_i32_le()?,
			top: r.read_i32_le()?,
			right: r.read_i32_le()?,
			bottom: r.read_i32_le()?,
		};
		let scale = r.read_u32_le()?;
		if scale == 0 {
			log::error!("scale field is zero");
			return Err(OpenError::ZeroScale);
		}
		let pixel_size = scale as f64 / 10000.0;
		if pixel_size < 0.5 {
			log::error!("pixel size {pixel_size}m is below the 0.5m floor");
			return Err(OpenError::PixelTooSmall);
		}

		let raw_raster_width = ((outer_bbox.right - outer_bbox.left) as f64 * 10000.0 / scale as f64) as i32;
		let raw_raster_height = ((outer_bbox.top - outer_bbox.bottom) as f64 * 10000.0 / scale as f64) as i32;
		if raw_raster_width <= 0 || raw_raster_height <= 0 {
			log::error!("raster size {raw_raster_width}x{raw_raster_height} is not positive");
			return Err(OpenError::InvalidRasterSize);
		}

		let tile_size_max = r.read_u32_le()?;
		if tile_size_max == 0 {
			log::error!("tile_size_max is zero");
			return Err(OpenError::ZeroTileSize);
		}
		let mut tile_size_min = r.read_u32_le()?;
		if tile_size_min == 0 {
			tile_size_min = tile_size_max;
		}
		if tile_size_max % tile_size_min != 0 || !(tile_size_max / tile_size_min).is_power_of_two() {
			log::warn!("tile_size_max {tile_size_max} is not tile_size_min {tile_size_min} << k");
		}
		let mut max_overview_count = 1 + (tile_size_max as f64 / tile_size_min as f64).log2().floor() as u32;
		if max_overview_count > 7 {
			max_overview_count = 7;
		}

		let tile_header_marker_field = r.read_u32_le()?;
		let checksum = r.read_u32_le()?;
		let tile_x_count = r.read_i32_le()?;
		let tile_y_count = r.read_i32_le()?;

		let directory = if map_id == PAY_PER_TILE_MAP_ID {
			let first_tile_offset = r.position();
			directory::build_pay_per_tile(data, first_tile_offset, tile_x_count.max(0) as u32, tile_y_count.max(0) as u32)
		} else {
			directory::build_standard(&mut r, tile_x_count.max(0) as u32, tile_y_count.max(0) as u32, file_len)
		};

		let marker = r.read_bytes(11).unwrap_or(&[]);
		if marker != MARKER {
			log::warn!("tile-directory marker sequence not found where expected");
		}

		let inner_bbox = BBox {
			left: r.read_i32_le().unwrap_or(0),
			top: r.read_i32_le().unwrap_or(0),
			right: r.read_i32_le().unwrap_or(0),
			bottom: r.read_i32_le().unwrap_or(0),
		};
		let third_marker_field = r.read_u32_le().unwrap_or(0);
		if third_marker_field != 7 {
			log::warn!("third marker field is {third_marker_field}, not the conventional 7");
		}

		let raster_width = raw_raster_width;
		let (raster_height, top_skip_pixels) = apply_short_top_adjustment(raw_raster_height, tile_size_max as i32);

		let crs = crs_for_country(country_code);

		Ok(Self {
			magic,
			download_id,
			country_code,
			sentinel,
			byte_0c,
			byte_0d,
			map_id,
			strings,
			outer_bbox,
			scale,
			tile_size_max,
			tile_size_min,
			tile_header_marker_field,
			checksum,
			tile_x_count,
			tile_y_count,
			directory,
			inner_bbox,
			third_marker_field,
			max_overview_count,
			raster_width,
			raster_height,
			top_skip_pixels,
			crs,
		})
	}
}

/// Rounds `raw_height` up to the next multiple of `tile_size_max`, returning
/// `(rounded_height, top_skip_pixels)`. `top_skip_pixels` is zero if
/// `raw_height` is already a multiple.
fn apply_short_top_adjustment(raw_height: i32, tile_size_max: i32) -> (i32, i32) {
	let remainder = raw_height % tile_size_max;
	if remainder == 0 {
		(raw_height, 0)
	} else {
		let rounded = raw_height + (tile_size_max - remainder);
		(rounded, rounded - raw_height)
	}
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Identify {
	True,
	Unknown,
	False,
}

/// Inspects only the leading magic bytes; never fails, never allocates.
pub fn identify(header_bytes: &[u8]) -> Identify {
	if header_bytes.len() < 4 {
		return Identify::Unknown;
	}
	let magic = u32::from_le_bytes(header_bytes[0..4].try_into().unwrap());
	if magic == MAGIC_METRES || magic == MAGIC_THIRTYSIX {
		Identify::True
	} else {
		Identify::False
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identify_metres_magic() {
		let bytes = [0x7E, 0x1F, 0x2E, 0x00, 0x04, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00];
		assert_eq!(identify(&bytes), Identify::True);
	}

	#[test]
	fn identify_unknown_magic() {
		let bytes = [0xAA, 0xBB, 0xCC, 0xDD, 0, 0, 0, 0, 0, 0, 0, 0];
		assert_eq!(identify(&bytes), Identify::False);
	}

	#[test]
	fn identify_short_buffer_is_unknown() { assert_eq!(identify(&[0x7E, 0x1F]), Identify::Unknown); }

	#[test]
	fn short_top_rounds_up_to_next_tile() {
		let (height, skip) = apply_short_top_adjustment(100_000, 65536);
		assert_eq!(height, 131_072);
		assert_eq!(skip, 31_072);
	}

	#[test]
	fn exact_multiple_has_no_skip() {
		let (height, skip) = apply_short_top_adjustment(131_072, 65536);
		assert_eq!(height, 131_072);
		assert_eq!(skip, 0);
	}
}
