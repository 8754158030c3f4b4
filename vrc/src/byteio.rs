//! Primitive reads against an in-memory view of a VRC file.
//!
//! The container is read once into an `Mmap` at open time; all multi-byte
//! reads happen against that byte slice. VRC container integers are
//! little-endian; integers inside a reconstructed PNG chunk (width, height,
//! CRC, chunk length) are big-endian, so both orderings are exposed here.

use std::fmt::{Debug, Display};

#[derive(Copy, Clone, Eq, PartialEq)]
pub enum ReadError {
	EndOfFile,
	InvalidLength,
}

impl Display for ReadError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::EndOfFile => write!(f, "read past end of file"),
			Self::InvalidLength => write!(f, "length field out of range"),
		}
	}
}

impl Debug for ReadError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result { Display::fmt(self, f) }
}

impl std::error::Error for ReadError {}

/// A cursor over a byte slice, with both sequential reads (advancing the
/// cursor) and absolute-offset reads (leaving it untouched).
pub struct ByteReader<'a> {
	data: &'a [u8],
	cursor: usize,
}

impl<'a> ByteReader<'a> {
	pub fn new(data: &'a [u8]) -> Self { Self { data, cursor: 0 } }

	pub fn file_len(&self) -> usize { self.data.len() }

	pub fn position(&self) -> usize { self.cursor }

	/// The full underlying slice, independent of the cursor.
	pub fn data(&self) -> &'a [u8] { self.data }

	pub fn seek(&mut self, abs: usize) { self.cursor = abs; }

	fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
		let end = self.cursor.checked_add(n).ok_or(ReadError::EndOfFile)?;
		if end > self.data.len() {
			return Err(ReadError::EndOfFile);
		}
		let slice = &self.data[self.cursor..end];
		self.cursor = end;
		Ok(slice)
	}

	pub fn read_u8(&mut self) -> Result<u8, ReadError> { Ok(self.take(1)?[0]) }

	pub fn read_u16_le(&mut self) -> Result<u16, ReadError> {
		Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
	}

	pub fn read_u32_le(&mut self) -> Result<u32, ReadError> {
		Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
	}

	pub fn read_i32_le(&mut self) -> Result<i32, ReadError> {
		Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
	}

	pub fn read_u32_be(&mut self) -> Result<u32, ReadError> {
		Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
	}

	pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ReadError> { self.take(n) }
}

/// Reads a length-prefixed string from an absolute offset in `data`: an
/// `i32_le` length followed by that many raw bytes. A negative or zero
/// length yields an empty slice; a length that runs past the end of `data`
/// fails.
pub fn read_length_prefixed<'a>(data: &'a [u8], abs_offset: usize) -> Result<&'a [u8], ReadError> {
	let mut reader = ByteReader::new(data);
	reader.seek(abs_offset);
	let len = reader.read_i32_le()?;
	if len <= 0 {
		return Ok(&[]);
	}
	reader.read_bytes(len as usize)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn little_endian_round_trip() {
		for n in [0u32, 1, 0xFF, 0x1234_5678, u32::MAX] {
			let bytes = n.to_le_bytes();
			let mut reader = ByteReader::new(&bytes);
			assert_eq!(reader.read_u32_le().unwrap(), n);
		}
	}

	#[test]
	fn big_endian_round_trip() {
		for n in [0u32, 1, 0xFF, 0x1234_5678, u32::MAX] {
			let bytes = n.to_be_bytes();
			let mut reader = ByteReader::new(&bytes);
			assert_eq!(reader.read_u32_be().unwrap(), n);
		}
	}

	#[test]
	fn seek_to_end_then_read_is_eof() {
		let data = [1u8, 2, 3, 4];
		let mut reader = ByteReader::new(&data);
		reader.seek(data.len());
		assert_eq!(reader.read_u8(), Err(ReadError::EndOfFile));
	}

	#[test]
	fn length_prefixed_negative_is_empty() {
		let mut data = Vec::new();
		data.extend_from_slice(&(-1i32).to_le_bytes());
		assert_eq!(read_length_prefixed(&data, 0).unwrap(), &[] as &[u8]);
	}

	#[test]
	fn length_prefixed_short_read_fails() {
		let mut data = Vec::new();
		data.extend_from_slice(&(10i32).to_le_bytes());
		data.extend_from_slice(b"abc");
		assert_eq!(read_length_prefixed(&data, 0), Err(ReadError::EndOfFile));
	}
}
