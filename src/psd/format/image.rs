//! Channel pixel data: the composite image section and the shared
//! per-channel reading routine used by layer records.
//!
//! RLE data is PackBits: a per-scanline byte count table (2 bytes per
//! entry in PSD files, 4 in PSB), then sign-discriminated opcodes per
//! scanline. Raw data is emitted with the on-disk byte packings per
//! depth. The two ZIP methods are recognized tags without pixel decode.

use std::io::{Read, Seek};

use log::{debug, info, warn};

use crate::psd::delegate::DecoderDelegate;
use crate::psd::error::{PsdError, Result};
use crate::psd::reader::PsdReader;
use crate::psd::types::models::{
    ChannelId, CompressionMethod, FileHeader, ImageData, Version,
};

/// Parses the image data section: the composite (merged) image.
pub fn parse_composite<R, D>(
    r: &mut PsdReader<R>,
    header: &FileHeader,
    delegate: &mut D,
) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let compression = CompressionMethod::try_from(r.read_u16()?)?;
    info!("composite image: compression {compression:?}");

    let channels = match header.nchannels {
        1 => vec![ChannelId::Alpha],
        2 => vec![ChannelId::TransparencyMask, ChannelId::Red],
        3 => vec![ChannelId::Red, ChannelId::Green, ChannelId::Blue],
        4 => vec![
            ChannelId::Red,
            ChannelId::Green,
            ChannelId::Blue,
            ChannelId::Alpha,
        ],
        n => {
            return Err(PsdError::InvalidFormat(format!(
                "unsupported channel count for composite image: {n}"
            )))
        }
    };

    let image = ImageData {
        compression,
        width: header.width,
        height: header.height,
        depth: header.depth,
        channels,
    };
    read_image(r, header.version, &image, delegate)?;
    delegate.on_image_data(&image);
    Ok(())
}

/// Reads pixel data for every channel of `image`, emitting
/// begin/scanline/end events.
pub fn read_image<R, D>(
    r: &mut PsdReader<R>,
    version: Version,
    image: &ImageData,
    delegate: &mut D,
) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    delegate.on_begin_image(image);

    // RLE data is preceded by one byte count per scanline per channel.
    let mut byte_counts = Vec::new();
    if image.compression == CompressionMethod::Rle {
        let entries = image.height as usize * image.channels.len();
        byte_counts.reserve(entries);
        for _ in 0..entries {
            byte_counts.push(r.read_rle_count(version)?);
        }
    }

    let mut scanline = vec![0u8; rle_scanline_size(image)];
    let mut count_index = 0usize;
    for &channel_id in &image.channels {
        debug!(
            "channel {channel_id:?}: compression {:?}, depth {}, {}x{}",
            image.compression, image.depth, image.width, image.height
        );

        match image.compression {
            CompressionMethod::RawImageData => read_raw_channel(r, image, channel_id, delegate)?,
            CompressionMethod::Rle => {
                if image.depth == 8 {
                    for y in 0..image.height {
                        decode_rle_scanline(r, byte_counts[count_index], &mut scanline)?;
                        count_index += 1;
                        delegate.on_image_scanline(image, y, channel_id, &scanline);
                    }
                } else {
                    warn!("RLE at depth {} is not supported, skipping channel", image.depth);
                }
            }
            CompressionMethod::ZipWithoutPrediction | CompressionMethod::ZipWithPrediction => {
                debug!("ZIP-compressed channel data is not decoded");
            }
        }
    }

    delegate.on_end_image(image);
    Ok(())
}

/// Byte width of one RLE scanline buffer: whole bytes per row, padded
/// to even length.
fn rle_scanline_size(image: &ImageData) -> usize {
    let width = image.width as usize;
    let mut size = if image.depth >= 8 {
        width * (image.depth as usize / 8)
    } else {
        width.div_ceil(8 / image.depth as usize)
    };
    if size & 1 == 1 {
        size += 1;
    }
    size
}

/// Decodes one PackBits scanline of `byte_count` opcode bytes into
/// `scanline`.
///
/// Opcodes: `0..=127` copy the next `n + 1` literal bytes; `-127..=-1`
/// repeat the next byte `1 - n` times; `-128` is a no-op. When the
/// buffer fills early the remaining opcode bytes are still consumed so
/// the stream advances by exactly `byte_count`; when the opcodes run
/// out early the buffer tail is zero-filled.
fn decode_rle_scanline<R: Read + Seek>(
    r: &mut PsdReader<R>,
    byte_count: u32,
    scanline: &mut [u8],
) -> Result<()> {
    let mut remaining = i64::from(byte_count);
    let mut pos = 0usize;

    while remaining > 0 {
        let n = r.read_u8()? as i8;
        remaining -= 1;

        if n == -128 {
            continue;
        }
        if n >= 0 {
            let run = n as usize + 1;
            for _ in 0..run {
                let byte = r.read_u8()?;
                if pos < scanline.len() {
                    scanline[pos] = byte;
                    pos += 1;
                }
            }
            remaining -= run as i64;
        } else {
            let value = r.read_u8()?;
            remaining -= 1;
            let run = 1 - i64::from(n);
            for _ in 0..run {
                if pos >= scanline.len() {
                    break;
                }
                scanline[pos] = value;
                pos += 1;
            }
        }
    }

    for byte in &mut scanline[pos..] {
        *byte = 0;
    }
    Ok(())
}

/// Reads one uncompressed channel, one scanline event per row.
///
/// Emitted row packings: depth 1 is one byte per 8 pixels, depth 16
/// rows carry each sample low-byte-first, depth 32 rows
/// high-byte-first.
fn read_raw_channel<R, D>(
    r: &mut PsdReader<R>,
    image: &ImageData,
    channel_id: ChannelId,
    delegate: &mut D,
) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let width = image.width as usize;
    let row_bytes = match image.depth {
        1 => width.div_ceil(8),
        8 => width,
        16 => width * 2,
        32 => width * 4,
        depth => return Err(PsdError::UnsupportedDepth(depth)),
    };

    let mut row = Vec::with_capacity(row_bytes);
    for y in 0..image.height {
        row.clear();
        match image.depth {
            1 => {
                for _ in 0..width.div_ceil(8) {
                    row.push(r.read_u8()?);
                }
            }
            8 => {
                row.resize(width, 0);
                r.read_exact(&mut row)?;
            }
            16 => {
                for _ in 0..width {
                    let word = r.read_u16()?;
                    row.push((word & 0xff) as u8);
                    row.push((word >> 8) as u8);
                }
            }
            32 => {
                for _ in 0..width {
                    let dword = r.read_u32()?;
                    row.extend_from_slice(&dword.to_be_bytes());
                }
            }
            _ => unreachable!(),
        }
        delegate.on_image_scanline(image, y, channel_id, &row);
    }
    Ok(())
}
