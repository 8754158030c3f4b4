//! Country-code to coordinate-reference-system lookup.
//!
//! Grounded in `VRCutils.cpp`'s `CRSfromCountry`: a fixed table of numeric
//! country codes to EPSG identifiers, with two countries needing axis swaps
//! or coordinate adjustments and country 17 and 155 needing numeric fixups
//! that must be applied to the outer/inner bounding boxes before they're fit
//! for use. CRS *registry* lookup itself (turning an EPSG code into a usable
//! `OGRSpatialReference`) is out of scope here — this module only returns
//! the code and the adjustments.

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CrsInfo {
	pub epsg: u32,
	pub swap_axes: bool,
	/// Divide outer/inner bbox coordinates by this before using them.
	pub coordinate_scale: Option<f64>,
	/// Added to the Y (north) coordinate.
	pub y_shift: Option<f64>,
}

impl CrsInfo {
	const fn plain(epsg: u32) -> Self {
		Self {
			epsg,
			swap_axes: false,
			coordinate_scale: None,
			y_shift: None,
		}
	}

	const fn swapped(epsg: u32) -> Self {
		Self {
			epsg,
			swap_axes: true,
			coordinate_scale: None,
			y_shift: None,
		}
	}
}

/// WGS 84, the fallback for unrecognised country codes.
pub const DEFAULT: CrsInfo = CrsInfo::plain(4326);

pub fn crs_for_country(country: i16) -> CrsInfo {
	match country {
		1 => CrsInfo::plain(27700),
		2 => CrsInfo::plain(29901),
		5 => CrsInfo::swapped(2393),
		8 => CrsInfo::plain(31370),
		9 => CrsInfo::swapped(21781),
		12 => CrsInfo::plain(28992),
		13 => CrsInfo::plain(3907),
		14 => CrsInfo::swapped(3006),
		15 => CrsInfo::plain(25833),
		16 => CrsInfo::plain(32632),
		17 => CrsInfo {
			epsg: 4267,
			swap_axes: true,
			coordinate_scale: Some(9_000_000.0),
			y_shift: None,
		},
		18 => CrsInfo::swapped(2193),
		19 => CrsInfo::plain(2154),
		20 => CrsInfo::plain(2100),
		21 => CrsInfo::swapped(3042),
		132 => CrsInfo::plain(25832),
		133 => CrsInfo::plain(25833),
		155 => CrsInfo {
			epsg: 28355,
			swap_axes: false,
			coordinate_scale: None,
			y_shift: Some(10_000_000.0),
		},
		_ => DEFAULT,
	}
}
