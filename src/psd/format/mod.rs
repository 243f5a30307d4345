//! File format parsing layer.
//!
//! One module per file section, in on-disk order, plus the shared
//! descriptor grammar:
//!
//! - [`header`]: the 26-byte file header
//! - [`color_mode`]: indexed palettes and duotone data
//! - [`resources`]: `8BIM` image resource blocks (slices, animation
//!   frames, descriptor-bearing resources)
//! - [`layers`]: layer records, channel pixels, tagged blocks
//! - [`image`]: the composite image and the shared RLE/raw channel
//!   reader
//! - [`descriptor`]: the recursive OSType grammar
//!
//! ```text
//! File structure:
//! ┌──────────────────────┐
//! │  File header         │ ← header::parse()
//! ├──────────────────────┤
//! │  Color mode data     │ ← color_mode::parse()
//! ├──────────────────────┤
//! │  Image resources     │ ← resources::parse()
//! ├──────────────────────┤
//! │  Layers and mask     │ ← layers::parse()
//! ├──────────────────────┤
//! │  Composite image     │ ← image::parse_composite()
//! └──────────────────────┘
//! ```

pub mod color_mode;
pub mod descriptor;
pub mod header;
pub mod image;
pub mod layers;
pub mod resources;
