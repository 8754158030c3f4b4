//! Per-country charset lookup and recoding to UTF-8.
//!
//! Grounded in `VRCutils.cpp`'s `CharsetFromCountry`: every listed country
//! uses `LATIN9` (ISO-8859-15); anything else defaults to `UTF-8` (i.e. is
//! passed through as-is, already being the container's export format).

pub const LATIN9_COUNTRIES: &[i16] = &[1, 2, 5, 8, 9, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 132, 133, 155];

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Charset {
	Latin9,
	Utf8,
}

pub fn charset_for_country(country: i16) -> Charset {
	if LATIN9_COUNTRIES.contains(&country) {
		Charset::Latin9
	} else {
		Charset::Utf8
	}
}

/// ISO-8859-15 differs from ISO-8859-1 (a direct byte-to-codepoint mapping)
/// at only eight positions.
fn latin9_to_char(byte: u8) -> char {
	match byte {
		0xA4 => '\u{20AC}', // EURO SIGN
		0xA6 => '\u{0160}', // LATIN CAPITAL LETTER S WITH CARON
		0xA8 => '\u{0161}', // LATIN SMALL LETTER S WITH CARON
		0xB4 => '\u{017D}', // LATIN CAPITAL LETTER Z WITH CARON
		0xB8 => '\u{017E}', // LATIN SMALL LETTER Z WITH CARON
		0xBC => '\u{0152}', // LATIN CAPITAL LIGATURE OE
		0xBD => '\u{0153}', // LATIN SMALL LIGATURE OE
		0xBE => '\u{0178}', // LATIN CAPITAL LETTER Y WITH DIAERESIS
		other => other as char,
	}
}

/// Recodes a raw string table entry to UTF-8 per its country's charset.
pub fn recode(bytes: &[u8], charset: Charset) -> String {
	match charset {
		Charset::Latin9 => bytes.iter().map(|&b| latin9_to_char(b)).collect(),
		Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn known_countries_use_latin9() {
		assert_eq!(charset_for_country(17), Charset::Latin9);
		assert_eq!(charset_for_country(155), Charset::Latin9);
	}

	#[test]
	fn unknown_country_defaults_to_utf8() { assert_eq!(charset_for_country(9999), Charset::Utf8); }

	#[test]
	fn latin9_euro_sign_recodes() {
		assert_eq!(recode(&[0xA4], Charset::Latin9), "\u{20AC}");
	}

	#[test]
	fn ascii_round_trips_under_either_charset() {
		assert_eq!(recode(b"title", Charset::Latin9), "title");
		assert_eq!(recode(b"title", Charset::Utf8), "title");
	}
}
