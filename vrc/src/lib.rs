//! A read-only decoder for the ViewRanger VRC raster map container: a
//! proprietary tile-pyramid format where each tile's pixel data is stored as
//! PNG chunks stripped of their signature and framing.
//!
//! A container is identified by one of two magic values at offset 0:
//! `metres` (fully supported, 4 bands: RGB + alpha) or `thirty-six`
//! (partially understood; its pixel stream is never decoded, only
//! verified against a known byte signature). Every tile is itself a grid
//! of PNG sub-tiles across up to seven overview levels, with offsets
//! either stored directly in the file (standard maps) or reconstructed by
//! walking overview headers (pay-per-tile maps, `map_id == 8`).
//!
//! Entry points: [`VrcDataset::open`] to parse a container, then
//! [`VrcDataset::band`] and [`VrcBand::read_block`] /
//! [`VrcBand::data_coverage`] to pull pixels or sparse coverage
//! information out of it.

pub mod byteio;
pub mod charset;
pub mod compose;
pub mod coverage;
pub mod crc;
pub mod crs;
mod dataset;
pub mod directory;
pub mod header;
pub mod overview;
pub mod png_reconstruct;
pub mod subtile;
pub mod thirtysix;

pub use dataset::{ColorInterp, OpenOptions, ReadError, VrcBand, VrcDataset};
pub use header::{identify, Identify, OpenError, MAGIC_METRES, MAGIC_THIRTYSIX};
