//! Event-driven reader for Adobe Photoshop PSD and PSB files.
//!
//! The decoder walks the five file sections (header, color mode data,
//! image resources, layers and mask, composite image) in order and
//! reports everything it understands through a caller-supplied
//! [`DecoderDelegate`]. It does not composite layers, apply blend
//! modes, or convert color; it hands the document's structure and raw
//! channel scanlines to the delegate and owns nothing afterwards.
//!
//! ```no_run
//! use std::fs::File;
//! use psd_reader::{decode_psd, DecoderDelegate};
//! use psd_reader::types::models::FileHeader;
//!
//! struct SizePrinter;
//!
//! impl DecoderDelegate for SizePrinter {
//!     fn on_file_header(&mut self, header: &FileHeader) {
//!         println!("{}x{}", header.width, header.height);
//!     }
//! }
//!
//! let file = File::open("image.psd")?;
//! decode_psd(file, &mut SizePrinter)?;
//! # Ok::<(), psd_reader::PsdError>(())
//! ```

pub mod psd;

pub use psd::types;
pub use psd::{
    decode_psd, DecodeOptions, Decoder, DecoderDelegate, NullDelegate, PsdError, PsdReader, Result,
};
