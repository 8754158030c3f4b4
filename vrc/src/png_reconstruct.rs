//! Reassembling a valid in-memory PNG stream from the stripped-down chunks
//! stored on disk, and decoding it.
//!
//! Grounded in `VRC.cpp`'s `VRCRasterBand::ReadBlockFromPNGTile`: the
//! on-disk record keeps only the IHDR payload and the already-framed IDAT
//! chunks, dropping the 8-byte PNG signature, the IHDR chunk framing, any
//! palette framing, and the IEND chunk. This module puts all of that back
//! so a stock PNG decoder can read it.

use std::{
	fmt::{Debug, Display},
	io::Cursor,
};

use png::Transformations;

use crate::{byteio::ByteReader, crc::chunk_crc, subtile};

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const IEND_CHUNK: [u8; 12] = [0x00, 0x00, 0x00, 0x00, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82];
/// CRC of a synthesised 256-entry `(i, i, i)` greyscale PLTE chunk.
const SYNTHETIC_GREYSCALE_PALETTE_CRC: u32 = 0xE2B0_5D7D;

#[derive(Copy, Clone, Eq, PartialEq)]
pub enum DecodeError {
	CrcMismatch,
	UnsupportedPng,
	TruncatedData,
	OutOfMemory,
	InvalidHeader,
}

impl Display for DecodeError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::CrcMismatch => write!(f, "IHDR CRC does not match stored data"),
			Self::UnsupportedPng => write!(f, "sub-tile uses an unsupported PNG feature"),
			Self::TruncatedData => write!(f, "sub-tile data ends before the PNG decoder expected"),
			Self::OutOfMemory => write!(f, "sub-tile exceeds the scratch-buffer budget"),
			Self::InvalidHeader => write!(f, "sub-tile IHDR fields are out of range"),
		}
	}
}

impl Debug for DecodeError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result { Display::fmt(self, f) }
}

impl std::error::Error for DecodeError {}

pub struct DecodedSubTile {
	pub width: u32,
	pub height: u32,
	/// Tightly packed 8-bit RGB rows, `3 * width * height` bytes.
	pub rgb: Vec<u8>,
}

struct IhdrFields {
	width: u32,
	height: u32,
	bit_depth: u8,
	colour_type: u8,
	compression: u8,
	filter: u8,
	interlace: u8,
	crc: u32,
}

fn scratch_budget(data_len: usize) -> usize { 8 + 21 + (3 * 256 + 12) + data_len + 12 }

fn read_ihdr_fields(data: &[u8], header_off: u32) -> Result<IhdrFields, DecodeError> {
	let mut r = ByteReader::new(data);
	r.seek(header_off as usize + 1); // skip the leading 0x00 sentinel
	let width = r.read_u32_be().map_err(|_| DecodeError::TruncatedData)?;
	let height = r.read_u32_be().map_err(|_| DecodeError::TruncatedData)?;
	let bit_depth = r.read_u8().map_err(|_| DecodeError::TruncatedData)?;
	let colour_type = r.read_u8().map_err(|_| DecodeError::TruncatedData)?;
	let compression = r.read_u8().map_err(|_| DecodeError::TruncatedData)?;
	let filter = r.read_u8().map_err(|_| DecodeError::TruncatedData)?;
	let interlace = r.read_u8().map_err(|_| DecodeError::TruncatedData)?;
	let crc = r.read_u32_be().map_err(|_| DecodeError::TruncatedData)?;

	if !matches!(bit_depth, 1 | 2 | 4 | 8)
		|| !matches!(colour_type, 0 | 2 | 3)
		|| compression != 0
		|| filter != 0
		|| !matches!(interlace, 0 | 1)
	{
		return Err(DecodeError::InvalidHeader);
	}

	Ok(IhdrFields {
		width,
		height,
		bit_depth,
		colour_type,
		compression,
		filter,
		interlace,
		crc,
	})
}

fn ihdr_body_bytes(fields: &IhdrFields) -> [u8; 13] {
	let mut body = [0u8; 13];
	body[0..4].copy_from_slice(&fields.width.to_be_bytes());
	body[4..8].copy_from_slice(&fields.height.to_be_bytes());
	body[8] = fields.bit_depth;
	body[9] = fields.colour_type;
	body[10] = fields.compression;
	body[11] = fields.filter;
	body[12] = fields.interlace;
	body
}

fn synthetic_greyscale_palette() -> Vec<u8> {
	let mut body = Vec::with_capacity(768);
	for i in 0..=255u8 {
		body.extend_from_slice(&[i, i, i]);
	}
	body
}

/// Re-synthesises a full PNG byte stream from the on-disk sub-tile record
/// and decodes it with the PNG library.
///
/// `palette_offset` is the offset of a palette record already validated by
/// [`subtile::SubTileGrid::read`], if any.
pub fn reconstruct_and_decode(
	data: &[u8], header_off: u32, palette_offset: Option<u32>, data_len: u32, max_scratch_bytes: usize,
) -> Result<DecodedSubTile, DecodeError> {
	if scratch_budget(data_len as usize) > max_scratch_bytes {
		return Err(DecodeError::OutOfMemory);
	}

	let fields = read_ihdr_fields(data, header_off)?;
	let ihdr_body = ihdr_body_bytes(&fields);
	let computed_crc = chunk_crc(b"IHDR", &ihdr_body);
	if computed_crc != fields.crc {
		return Err(DecodeError::CrcMismatch);
	}

	let mut scratch = Vec::with_capacity(scratch_budget(data_len as usize));
	scratch.extend_from_slice(&PNG_SIGNATURE);
	scratch.extend_from_slice(&13u32.to_be_bytes());
	scratch.extend_from_slice(b"IHDR");
	scratch.extend_from_slice(&ihdr_body);
	scratch.extend_from_slice(&fields.crc.to_be_bytes());

	if let Some(palette_offset) = palette_offset {
		if let Some((body, crc)) = subtile::read_palette_body(data, palette_offset) {
			scratch.extend_from_slice(&(body.len() as u32).to_be_bytes());
			scratch.extend_from_slice(b"PLTE");
			scratch.extend_from_slice(body);
			scratch.extend_from_slice(&crc.to_be_bytes());
		}
	} else if fields.colour_type == 3 {
		let body = synthetic_greyscale_palette();
		scratch.extend_from_slice(&(body.len() as u32).to_be_bytes());
		scratch.extend_from_slice(b"PLTE");
		scratch.extend_from_slice(&body);
		scratch.extend_from_slice(&SYNTHETIC_GREYSCALE_PALETTE_CRC.to_be_bytes());
	}

	let idat_start = header_off as usize + 0x12;
	let idat_end = idat_start + data_len as usize;
	let idat = data.get(idat_start..idat_end).ok_or(DecodeError::TruncatedData)?;
	scratch.extend_from_slice(idat);

	scratch.extend_from_slice(&IEND_CHUNK);

	decode_scratch(&scratch, fields.width, fields.height)
}

fn decode_scratch(scratch: &[u8], declared_width: u32, declared_height: u32) -> Result<DecodedSubTile, DecodeError> {
	let mut decoder = png::Decoder::new(Cursor::new(scratch));
	decoder.set_transformations(
		Transformations::EXPAND | Transformations::STRIP_16 | Transformations::GRAY_TO_RGB | Transformations::STRIP_ALPHA,
	);
	let mut reader = decoder.read_info().map_err(|_| DecodeError::UnsupportedPng)?;
	let mut buf = vec![0u8; reader.output_buffer_size()];
	let info = reader.next_frame(&mut buf).map_err(|_| DecodeError::TruncatedData)?;

	let width = info.width;
	let height = info.height;
	if width != declared_width || height != declared_height {
		log::debug!("decoded PNG {width}x{height} differs from declared sub-tile size {declared_width}x{declared_height}");
	}

	buf.truncate(info.buffer_size());
	Ok(DecodedSubTile {
		width,
		height,
		rgb: buf,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn budget_rejects_oversized_sub_tile() {
		assert!(scratch_budget(10) < 1_000_000);
		assert!(scratch_budget(10) > 0);
	}

	#[test]
	fn synthetic_palette_is_768_bytes_of_ramp() {
		let palette = synthetic_greyscale_palette();
		assert_eq!(palette.len(), 768);
		assert_eq!(&palette[0..3], &[0, 0, 0]);
		assert_eq!(&palette[765..768], &[255, 255, 255]);
	}

	#[test]
	fn invalid_header_field_is_rejected() {
		let mut data = vec![0u8; 32];
		data[0] = 0x00;
		data[9] = 9; // invalid bit depth
		let result = read_ihdr_fields(&data, 0);
		assert!(matches!(result, Err(DecodeError::InvalidHeader)));
	}

	#[test]
	fn crc_mismatch_is_detected_before_decode() {
		// width=1, height=1, bitdepth=8, colortype=2, compression=0, filter=0, interlace=0
		let mut data = vec![0u8]; // leading sentinel
		data.extend_from_slice(&1u32.to_be_bytes());
		data.extend_from_slice(&1u32.to_be_bytes());
		data.extend_from_slice(&[8, 2, 0, 0, 0]);
		data.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes()); // wrong CRC
		let result = reconstruct_and_decode(&data, 0, None, 0, 1_000_000);
		assert!(matches!(result, Err(DecodeError::CrcMismatch)));
	}
}
