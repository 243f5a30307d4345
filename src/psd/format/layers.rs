//! Layers and mask information section.
//!
//! Layout, all lengths 4 bytes in PSD files and 8 bytes in PSB files
//! where noted:
//! ```text
//! [4/8 bytes] Section length
//!   [4/8 bytes] Layers-info block length
//!     [2 bytes]  Signed layer count
//!     [...]      Layer records
//!     [...]      Per-layer per-channel pixel data
//!   [4 bytes]   Global mask info length + body
//!   [...]       Additional-layer-info tagged blocks
//! ```
//!
//! Tagged blocks are framed by `8BIM` (or `8B64`) plus a 4-byte key and
//! a padded length; the parser always resumes at the block's declared
//! end no matter how much the per-key sub-parser consumed.

use std::io::{Read, Seek};

use log::{debug, info, trace, warn};

use crate::psd::delegate::DecoderDelegate;
use crate::psd::error::{PsdError, Result};
use crate::psd::reader::PsdReader;
use crate::psd::types::models::{
    Bounds, Channel, ChannelId, CompressionMethod, FileHeader, FrameVisibility, GlobalMaskInfo,
    ImageData, LayerBlendMode, LayerRecord, LayersInformation, MaskKind, SectionType, Version,
};
use crate::psd::DecodeOptions;

use super::{descriptor, image};

pub const BLOCK_SIGNATURE: &[u8; 4] = b"8BIM";
pub const BLOCK_SIGNATURE_PSB: &[u8; 4] = b"8B64";

/// Tagged-block keys whose data length is 8 bytes in PSB files.
const PSB_WIDE_LENGTH_KEYS: [&[u8; 4]; 13] = [
    b"LMsk", b"Lr16", b"Lr32", b"Layr", b"Mt16", b"Mt32", b"Mtrn", b"Alph", b"FMsk", b"lnk2",
    b"FEid", b"FXid", b"PxSD",
];

/// Parses the whole layers-and-mask section and emits
/// `on_layers_and_mask` exactly once.
pub fn parse<R, D>(
    r: &mut PsdReader<R>,
    header: &FileHeader,
    options: &DecodeOptions,
    delegate: &mut D,
) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let length = r.read_length(header.version)?;
    let begin = r.tell()?;
    let end = begin + length;
    info!("layers and mask section: {length} bytes");

    if length == 0 {
        delegate.on_layers_and_mask(LayersInformation::default());
        return Ok(());
    }

    // Layers info block, prefixed with its own length.
    let info_length = r.read_length(header.version)?;
    let mut layers = parse_layers_info(r, header, info_length, options, delegate)?;

    // Global mask info.
    if end.saturating_sub(r.tell()?) >= 4 {
        layers.mask_info = parse_global_mask_info(r)?;
    }

    // Trailing tagged blocks. A scratch record absorbs per-layer state
    // that has no enclosing layer here.
    let mut scratch = empty_layer_record();
    while end.saturating_sub(r.tell()?) > 4 {
        if parse_tagged_block(r, header, &mut scratch, options, delegate)? == 0 {
            break;
        }
    }

    delegate.on_layers_and_mask(layers);
    r.seek_to(end)?;
    Ok(())
}

/// Parses a layers-info block body of the given length: layer records
/// followed by every layer's channel data. Used for the top-level block
/// and recursively for `Lr16`/`Lr32`/`Layr` tagged blocks.
fn parse_layers_info<R, D>(
    r: &mut PsdReader<R>,
    header: &FileHeader,
    length: u64,
    options: &DecodeOptions,
    delegate: &mut D,
) -> Result<LayersInformation>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let mut layers = LayersInformation::default();
    if length == 0 {
        return Ok(layers);
    }

    let begin = r.tell()?;
    let raw_count = r.read_i16()?;

    // A negative count flags the merged result's first alpha channel as
    // transparency data.
    let nlayers = if raw_count < 0 {
        layers.first_channel_is_transparency = true;
        -i32::from(raw_count)
    } else {
        i32::from(raw_count)
    };
    debug!(
        "layers info: {nlayers} layers, first_channel_is_transparency={}",
        layers.first_channel_is_transparency
    );

    for _ in 0..nlayers {
        let record = parse_layer_record(r, header, options, delegate)?;
        layers.layers.push(record);
    }

    // The merged transparency channel is not read by default; real
    // files interleave it inconsistently.
    if layers.first_channel_is_transparency && options.read_merged_transparency {
        let compression = CompressionMethod::try_from(r.read_u16()?)?;
        let transparency = ImageData {
            compression,
            width: header.width,
            height: header.height,
            depth: header.depth,
            channels: vec![ChannelId::TransparencyMask],
        };
        image::read_image(r, header.version, &transparency, delegate)?;
    }

    // Channel data follows the records, in record order, each channel
    // opening with its own 2-byte compression marker.
    for record in &layers.layers {
        delegate.on_begin_layer(record);
        for channel in &record.channels {
            let channel_end = r.tell()? + channel.length;
            let compression = CompressionMethod::try_from(r.read_u16()?)?;
            trace!(
                "channel {:?} of '{}': {} bytes, compression {compression:?}",
                channel.channel_id,
                record.name,
                channel.length
            );

            let channel_image = ImageData {
                compression,
                width: record.width(),
                height: record.height(),
                depth: header.depth,
                channels: vec![channel.channel_id],
            };
            image::read_image(r, header.version, &channel_image, delegate)?;
            r.seek_to(channel_end)?;
        }
        delegate.on_end_layer(record);
    }

    r.seek_to(begin + length)?;
    Ok(layers)
}

fn empty_layer_record() -> LayerRecord {
    LayerRecord {
        bounds: Bounds::default(),
        channels: Vec::new(),
        blend_mode: LayerBlendMode::Normal,
        opacity: 255,
        clipping: 0,
        flags: 0,
        name: String::new(),
        layer_id: None,
        section_type: SectionType::Other,
        in_frames: Vec::new(),
        layer_time: None,
    }
}

fn parse_layer_record<R, D>(
    r: &mut PsdReader<R>,
    header: &FileHeader,
    options: &DecodeOptions,
    delegate: &mut D,
) -> Result<LayerRecord>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let mut record = empty_layer_record();
    record.bounds = Bounds {
        top: r.read_i32()?,
        left: r.read_i32()?,
        bottom: r.read_i32()?,
        right: r.read_i32()?,
    };

    let nchannels = r.read_u16()?;
    record.channels.reserve(nchannels as usize);
    for _ in 0..nchannels {
        let channel_id = ChannelId::from(r.read_i16()?);
        let length = r.read_length(header.version)?;
        record.channels.push(Channel { channel_id, length });
    }

    let signature = r.read_fourcc()?;
    if &signature != BLOCK_SIGNATURE {
        return Err(PsdError::BadSignature {
            context: "layer record blend mode",
            found: signature,
        });
    }
    record.blend_mode = LayerBlendMode::try_from(r.read_fourcc()?)?;
    record.opacity = r.read_u8()?;
    record.clipping = r.read_u8()?;
    record.flags = r.read_u8()?;
    r.read_u8()?; // filler

    let extra_length = u64::from(r.read_u32()?);
    let extra_start = r.tell()?;
    let extra_end = extra_start + extra_length;

    // Layer mask data and blending ranges are skipped by length.
    let mask_length = u64::from(r.read_u32()?);
    r.skip(mask_length)?;
    let blending_ranges_length = u64::from(r.read_u32()?);
    r.skip(blending_ranges_length)?;

    record.name = r.read_pascal_string(4)?;
    trace!(
        "layer '{}': bounds {:?}, {nchannels} channels",
        record.name,
        record.bounds
    );

    while r.tell()? < extra_end {
        if parse_tagged_block(r, header, &mut record, options, delegate)? == 0 {
            break;
        }
    }
    r.seek_to(extra_end)?;
    Ok(record)
}

fn parse_global_mask_info<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<Option<GlobalMaskInfo>> {
    let length = u64::from(r.read_u32()?);
    debug!("global mask info: {length} bytes");
    if length == 0 {
        return Ok(None);
    }
    let begin = r.tell()?;

    r.read_u16()?; // overlay color space
    r.skip(8)?; // 4 * 2 bytes of color components
    let opacity = r.read_u16()?;
    if opacity > 100 {
        return Err(PsdError::InvalidFormat(format!(
            "global mask opacity out of range: {opacity}"
        )));
    }
    let kind = MaskKind::try_from(r.read_u8()?)?;

    r.seek_to(begin + length)?;
    Ok(Some(GlobalMaskInfo { opacity, kind }))
}

/// Parses one additional-layer-info tagged block into `record`.
///
/// Returns the total bytes consumed (signature to padded end), or 0
/// when the signature does not match and the caller should stop.
fn parse_tagged_block<R, D>(
    r: &mut PsdReader<R>,
    header: &FileHeader,
    record: &mut LayerRecord,
    options: &DecodeOptions,
    delegate: &mut D,
) -> Result<u64>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let block_begin = r.tell()?;
    let signature = r.read_fourcc()?;
    if &signature != BLOCK_SIGNATURE && &signature != BLOCK_SIGNATURE_PSB {
        return Ok(0);
    }

    let key = r.read_fourcc()?;
    let wide = header.version == Version::Psb && PSB_WIDE_LENGTH_KEYS.contains(&&key);
    let data_length = if wide {
        r.read_u64()?
    } else {
        u64::from(r.read_u32()?)
    };
    let data_start = r.tell()?;
    trace!(
        "tagged block '{}': {data_length} bytes",
        String::from_utf8_lossy(&key)
    );

    match &key {
        b"lsct" => parse_section_divider(r, record, data_length)?,
        b"luni" => {
            // Unicode name, overriding the Pascal-string one.
            let name = r.read_unicode_string()?;
            if !name.is_empty() {
                record.name = name;
            }
        }
        b"lyid" => record.layer_id = Some(r.read_u32()?),
        b"cinf" => {
            if let Some(desc) = descriptor::parse_versioned(r, "cinf block")? {
                trace!("cinf descriptor with {} fields", desc.fields.len());
            }
        }
        b"anFX" => {
            if let Some(desc) = descriptor::parse_versioned(r, "anFX block")? {
                trace!("anFX descriptor with {} fields", desc.fields.len());
            }
        }
        b"SoLE" => parse_placed_layer(r)?,
        b"Lr16" | b"Lr32" | b"Layr" => {
            let nested = parse_layers_info(r, header, data_length, options, delegate)?;
            debug!("nested layers-info block: {} layers", nested.layers.len());
        }
        b"shmd" => parse_metadata_blocks(r, record, delegate)?,
        _ => trace!("skipping tagged block '{}'", String::from_utf8_lossy(&key)),
    }

    // Resume at the padded block end regardless of interior consumption.
    let padded_length = data_length + (data_length & 1);
    r.seek_to(data_start + padded_length)?;
    Ok(data_start + padded_length - block_begin)
}

/// `lsct`: section divider marking folder structure.
fn parse_section_divider<R: Read + Seek>(
    r: &mut PsdReader<R>,
    record: &mut LayerRecord,
    length: u64,
) -> Result<()> {
    record.section_type = SectionType::try_from(r.read_u32()?)?;
    if length < 12 {
        return Ok(());
    }

    let signature = r.read_fourcc()?;
    if &signature != BLOCK_SIGNATURE {
        return Err(PsdError::BadSignature {
            context: "section divider",
            found: signature,
        });
    }
    let _blend_mode = LayerBlendMode::try_from(r.read_fourcc()?)?;
    if length < 16 {
        return Ok(());
    }

    // 0 = normal, 1 = scene group (affects the animation timeline).
    let sub_type = r.read_u32()?;
    if sub_type > 1 {
        return Err(PsdError::InvalidFormat(format!(
            "invalid section divider sub-type: {sub_type}"
        )));
    }
    Ok(())
}

/// `SoLE`: placed (smart object) layer data.
fn parse_placed_layer<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<()> {
    let inner_type = r.read_fourcc()?;
    let version = r.read_u32()?;
    if &inner_type == b"SoLd" && (version == 4 || version == 5) {
        let desc = descriptor::parse(r)?;
        trace!(
            "placed layer '{}' with {} fields",
            desc.class_id,
            desc.fields.len()
        );
    } else {
        debug!(
            "unsupported placed layer data '{}' version {version}",
            String::from_utf8_lossy(&inner_type)
        );
    }
    Ok(())
}

/// `shmd`: a counted sequence of metadata items, each `8BIM`-framed
/// with a key, 4 discarded bytes, and a length.
fn parse_metadata_blocks<R, D>(
    r: &mut PsdReader<R>,
    record: &mut LayerRecord,
    delegate: &mut D,
) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let count = r.read_u32()?;
    for _ in 0..count {
        let signature = r.read_fourcc()?;
        if &signature != BLOCK_SIGNATURE {
            return Err(PsdError::BadSignature {
                context: "layer metadata item",
                found: signature,
            });
        }
        let key = r.read_fourcc()?;
        r.skip(4)?; // copy-on-duplicate flag plus padding
        let item_length = u64::from(r.read_u32()?);
        let item_start = r.tell()?;

        match &key {
            b"mlst" => parse_frame_visibility(r, record)?,
            b"cust" => parse_layer_time(r, record)?,
            b"tmln" => parse_timeline(r, record, delegate)?,
            _ => trace!(
                "skipping metadata item '{}'",
                String::from_utf8_lossy(&key)
            ),
        }

        r.seek_to(item_start + item_length)?;
    }
    Ok(())
}

/// `mlst`: per-frame layer visibility.
///
/// The descriptor's `LaID` must match the layer's id; `LaSt` lists
/// layer states, each with an optional `enab` flag (default visible)
/// and an `FrLs` list of frame ids.
fn parse_frame_visibility<R: Read + Seek>(
    r: &mut PsdReader<R>,
    record: &mut LayerRecord,
) -> Result<()> {
    // Version field, read but not validated here.
    let _version = r.read_u32()?;
    let desc = descriptor::parse(r)?;

    let Some(layer_id) = desc.number("LaID") else {
        return Ok(());
    };
    if record.layer_id != Some(layer_id as u32) {
        warn!(
            "mlst layer id {layer_id} does not match layer {:?}",
            record.layer_id
        );
        return Ok(());
    }

    let Some(states) = desc.field("LaSt").and_then(|v| v.as_list()) else {
        return Ok(());
    };
    for state in states.iter().filter_map(|v| v.as_descriptor()) {
        let visible = state
            .field("enab")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if let Some(frame_ids) = state.field("FrLs").and_then(|v| v.as_list()) {
            for frame_id in frame_ids.iter().filter_map(|v| v.as_number()) {
                record.in_frames.push(FrameVisibility {
                    frame_id: frame_id as u32,
                    is_visible_in_frame: visible,
                });
            }
        }
    }
    trace!(
        "layer '{}' visible in {} frames",
        record.name,
        record.in_frames.len()
    );
    Ok(())
}

/// `cust`: per-layer metadata carrying the layer time.
fn parse_layer_time<R: Read + Seek>(r: &mut PsdReader<R>, record: &mut LayerRecord) -> Result<()> {
    let Some(desc) = descriptor::parse_versioned(r, "cust metadata")? else {
        return Ok(());
    };
    record.layer_time = desc.number("layerTime");
    Ok(())
}

/// `tmln`: per-layer timeline scope.
fn parse_timeline<R, D>(r: &mut PsdReader<R>, record: &LayerRecord, delegate: &mut D) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let Some(desc) = descriptor::parse_versioned(r, "tmln metadata")? else {
        return Ok(());
    };

    let Some(time_scope) = desc.field("timeScope").and_then(|v| v.as_descriptor()) else {
        return Ok(());
    };
    for (key, value) in time_scope.fields.iter() {
        let Some(entry) = value.as_descriptor() else {
            continue;
        };
        let numerator = entry.number("numerator").unwrap_or(0.0);
        let denominator = entry.number("denominator").unwrap_or(0.0);
        trace!("timeline {key}: {numerator}/{denominator}");
    }

    delegate.on_layer_timeline(record, &desc);
    Ok(())
}
