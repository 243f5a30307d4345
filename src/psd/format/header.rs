//! File header parsing.
//!
//! Header structure (26 bytes):
//! ```text
//! [4 bytes] Signature "8BPS"
//! [2 bytes] Version (1 = PSD, 2 = PSB)
//! [6 bytes] Reserved
//! [2 bytes] Channel count (1..=56)
//! [4 bytes] Height in pixels
//! [4 bytes] Width in pixels
//! [2 bytes] Bits per channel (1, 8, 16 or 32)
//! [2 bytes] Color mode
//! ```

use std::io::{Read, Seek};

use log::{info, trace};

use crate::psd::error::{PsdError, Result};
use crate::psd::reader::PsdReader;
use crate::psd::types::models::{ColorMode, FileHeader, Version};

pub const FILE_SIGNATURE: &[u8; 4] = b"8BPS";

/// Parses and validates the file header. Any violation is fatal.
pub fn parse<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<FileHeader> {
    let signature = r.read_fourcc()?;
    if &signature != FILE_SIGNATURE {
        return Err(PsdError::BadSignature {
            context: "file header",
            found: signature,
        });
    }

    let version = Version::try_from(r.read_u16()?)?;

    // Reserved bytes; their content is not validated.
    r.skip(6)?;

    let nchannels = r.read_u16()?;
    let height = r.read_u32()?;
    let width = r.read_u32()?;
    let depth = r.read_u16()?;
    let color_mode_raw = r.read_u16()?;

    trace!(
        "header: version={version:?} nchannels={nchannels} \
         {width}x{height} depth={depth} color_mode={color_mode_raw}"
    );

    if !(1..=56).contains(&nchannels) {
        return Err(PsdError::ChannelCountOutOfRange(nchannels));
    }

    if !matches!(depth, 1 | 8 | 16 | 32) {
        return Err(PsdError::UnsupportedDepth(depth));
    }

    let color_mode = ColorMode::try_from(color_mode_raw)?;

    let limit = version.dimension_limit();
    if width == 0 || height == 0 || width > limit || height > limit {
        return Err(PsdError::DimensionsOutOfRange {
            width,
            height,
            limit,
        });
    }

    let header = FileHeader {
        version,
        nchannels,
        width,
        height,
        depth,
        color_mode,
    };
    info!(
        "parsed {:?} header: {}x{} depth={} {:?}, {} channels",
        header.version, header.width, header.height, header.depth, header.color_mode, nchannels
    );
    Ok(header)
}
