//! Video elementary stream parsers.

pub mod mpeg2;
pub mod nal;
pub mod sps;
mod utils;

pub use mpeg2::{PictureCodingType, parse_mpeg2_seq_hdr, scan_picture_types};
pub use nal::{NalUnit, NalUnitType, SliceHeader, SliceType, parse_nal_unit, scan_annex_b};
pub use sps::parse_avc_sps;
