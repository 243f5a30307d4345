//! Color mode data section.
//!
//! A length-prefixed block that is non-empty only for indexed and
//! duotone documents: a 768-byte palette for the former, undocumented
//! bytes preserved verbatim for the latter.

use std::io::{Read, Seek};

use log::{debug, info};

use crate::psd::delegate::DecoderDelegate;
use crate::psd::error::{PsdError, Result};
use crate::psd::reader::PsdReader;
use crate::psd::types::models::{ColorMode, ColorModeData, FileHeader, IndexColor};

pub fn parse<R, D>(r: &mut PsdReader<R>, header: &FileHeader, delegate: &mut D) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let length = r.read_u32()?;
    debug!("color mode data: {length} bytes");

    let is_paletted = matches!(header.color_mode, ColorMode::Indexed | ColorMode::Duotone);
    if length == 0 {
        if is_paletted {
            return Err(PsdError::InvalidFormat(
                "indexed/duotone file with empty color mode data".to_string(),
            ));
        }
        return Ok(());
    }
    if !is_paletted {
        return Err(PsdError::InvalidFormat(format!(
            "unexpected color mode data ({length} bytes) for {:?} file",
            header.color_mode
        )));
    }

    let data = match header.color_mode {
        ColorMode::Indexed => {
            if length != 768 {
                return Err(PsdError::InvalidFormat(format!(
                    "indexed palette must be 768 bytes, found {length}"
                )));
            }
            // On disk as three planes: 256 reds, 256 greens, 256 blues.
            let mut planes = [0u8; 768];
            r.read_exact(&mut planes)?;
            let colors = (0..256)
                .map(|i| IndexColor {
                    r: planes[i],
                    g: planes[256 + i],
                    b: planes[512 + i],
                })
                .collect();
            info!("parsed 256-entry indexed palette");
            ColorModeData::Indexed(colors)
        }
        ColorMode::Duotone => {
            let mut raw = vec![0u8; length as usize];
            r.read_exact(&mut raw)?;
            info!("captured {length} bytes of duotone data");
            ColorModeData::Duotone(raw)
        }
        _ => unreachable!(),
    };

    delegate.on_color_mode_data(data);
    Ok(())
}
