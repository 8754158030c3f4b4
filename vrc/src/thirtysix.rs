//! Verification of the "thirty-six" variant's sub-tile header.
//!
//! The `thirty-six` magic (`0x01ce6336`) container's pixel encoding was
//! never fully reverse-engineered by the original driver. `VRC.h` records
//! three competing, mutually-exclusive hypotheses it tried
//! (`VRC36_PIXEL_IS_PIXEL`, `VRC36_PIXEL_IS_TILE`, `VRC36_PIXEL_IS_FILE`),
//! selected at compile time, with none confirmed correct — this crate
//! deliberately does not pick one. All this module does
//! is the one thing that *is* understood: matching the first up-to-144
//! bytes of a sub-tile against a fixed signature recovered from real files
//! (`VRCthirtysix.cpp`'s `verifySubTileMem`), returning how many bytes
//! matched. `VrcBand::read_block` uses this to fill a thirty-six band's
//! single `GDT_UInt32` band with the match count as a diagnostic value; no
//! real pixel data is ever produced from this.
//!
//! # Open Questions
//! Which (if any) of `PIXEL_IS_PIXEL` / `PIXEL_IS_TILE` / `PIXEL_IS_FILE` is
//! correct, and what byte 79's divergence (matching some but not all known
//! sources) actually signifies, are unresolved upstream and remain
//! unresolved here.

#[rustfmt::skip]
const EXPECTED: [u8; 144] = [
	0x00, 0xbe, 0xe9, 0x42, 0x77, 0x64, 0x30, 0x21,
	0x3d, 0x5c, 0x2e, 0x34, 0x77, 0x46, 0x5a, 0x59,
	0x79, 0x24, 0x4b, 0x4b, 0x4e, 0x51, 0x38, 0x48,
	0x3d, 0x6d, 0x3c, 0x31, 0x36, 0x55, 0x27, 0x20,
	0x66, 0x54, 0x47, 0x47, 0x69, 0x37, 0x5b, 0x55,
	0x5e, 0x5c, 0x17, 0x5d, 0x2e, 0x7f, 0x15, 0x39,
	0x2e, 0x4c, 0x0b, 0x1c, 0x51, 0x63, 0x79, 0x78,
	0x57, 0x09, 0x64, 0x5a, 0x5b, 0x6c, 0x02, 0x6f,
	0x1c, 0x54, 0x13, 0x0d, 0x11, 0x72, 0xd4, 0xeb,
	0x71, 0x03, 0x5e, 0x58, 0x79, 0x24, 0x47, 0x4b,
	0x4e, 0x52, 0x38, 0x48, 0x27, 0x4c, 0x2c, 0x33,
	0x22, 0x72, 0x03, 0x18, 0x59, 0x68, 0x77, 0x77,
	0x56, 0x0b, 0x65, 0x6b, 0x6c, 0x69, 0x1a, 0x6a,
	0x1c, 0x4c, 0x1e, 0x0d, 0x10, 0x72, 0x03, 0x18,
	0x59, 0x68, 0x77, 0x77, 0x56, 0x0b, 0x65, 0x6b,
	0x6c, 0x69, 0x1a, 0x6a, 0x1c, 0x4c, 0x1e, 0x0d,
	0x10, 0x72, 0x03, 0x18, 0x59, 0x68, 0x77, 0x77,
	0x56, 0x0b, 0x65, 0xbc, 0x84, 0x41, 0x23, 0x4a,
];

/// Byte at which some (e.g. US) sources' sub-tiles stop matching.
pub const KNOWN_DIVERGENCE_BYTE: usize = 79;

/// Number of leading bytes of `data` that match the fixed signature, up to
/// 144. Never inspects or returns pixel data.
pub fn verify_signature(data: &[u8]) -> usize {
	let head_len = data.len().min(EXPECTED.len());
	data.iter()
		.zip(EXPECTED.iter())
		.take(head_len)
		.take_while(|(a, b)| a == b)
		.count()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exact_match_returns_144() { assert_eq!(verify_signature(&EXPECTED), 144); }

	#[test]
	fn divergence_at_known_byte_returns_partial_match() {
		let mut data = EXPECTED;
		data[KNOWN_DIVERGENCE_BYTE] ^= 0xFF;
		assert_eq!(verify_signature(&data), KNOWN_DIVERGENCE_BYTE);
	}

	#[test]
	fn short_input_matches_up_to_its_own_length() {
		assert_eq!(verify_signature(&EXPECTED[..10]), 10);
	}

	#[test]
	fn empty_input_matches_zero() { assert_eq!(verify_signature(&[]), 0); }
}
