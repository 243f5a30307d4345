//! Image resources section.
//!
//! A length-prefixed run of `8BIM` records, each carrying a 16-bit
//! resource id, a 2-aligned Pascal name, and a length-prefixed payload
//! padded to even size. The parser always resumes at the record's
//! declared end, regardless of how many payload bytes the per-id
//! sub-parser consumed.

use std::io::{Read, Seek};

use log::{debug, info, warn};

use crate::psd::delegate::DecoderDelegate;
use crate::psd::error::{PsdError, Result};
use crate::psd::reader::PsdReader;
use crate::psd::types::descriptor::Descriptor;
use crate::psd::types::models::{
    Bounds, FileHeader, FrameInformation, ImageResource, ResourcePayload, Slice, SlicesData,
};

use super::descriptor;

pub const RESOURCE_SIGNATURE: &[u8; 4] = b"8BIM";

/// Marker key of the animated-data block inside resource 4003.
const ANIMATION_KEY: &[u8; 4] = b"AnDs";

/// Resource id of the slice resource.
const RES_SLICES: u16 = 1050;

/// Resource id of the animation frames resource.
const RES_ANIMATION_FRAMES: u16 = 4003;

/// Resource ids whose payload is a versioned descriptor.
fn has_descriptor(res_id: u16) -> bool {
    matches!(
        res_id,
        1065 | 1074 | 1075 | 1076 | 1078 | 1080 | 1082 | 1083 | 1088 | 3000
    )
}

pub fn parse<R, D>(r: &mut PsdReader<R>, _header: &FileHeader, delegate: &mut D) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    let length = u64::from(r.read_u32()?);
    let end = r.tell()? + length;
    info!("image resources section: {length} bytes");

    while r.tell()? < end {
        let signature = r.read_fourcc()?;
        if &signature != RESOURCE_SIGNATURE {
            return Err(PsdError::BadSignature {
                context: "image resource block",
                found: signature,
            });
        }

        let resource_id = r.read_u16()?;
        let name = r.read_pascal_string(2)?;
        let res_length = u64::from(r.read_u32()?);
        let payload_start = r.tell()?;
        debug!("resource {resource_id} '{name}': {res_length} bytes");

        let payload = parse_payload(r, resource_id, res_length, delegate)?;

        // Resume after the declared payload regardless of how much the
        // sub-parser consumed; odd payloads carry one pad byte.
        r.seek_to(payload_start + res_length)?;
        if res_length & 1 == 1 {
            r.skip(1)?;
        }

        delegate.on_image_resource(ImageResource {
            resource_id,
            name,
            payload,
        });
    }

    r.seek_to(end)?;
    Ok(())
}

fn parse_payload<R, D>(
    r: &mut PsdReader<R>,
    resource_id: u16,
    res_length: u64,
    delegate: &mut D,
) -> Result<ResourcePayload>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    if res_length == 0 {
        return Ok(ResourcePayload::Empty);
    }

    if has_descriptor(resource_id) {
        let version = r.read_u32()?;
        if version != descriptor::DESCRIPTOR_VERSION {
            // Recoverable: the record framing lets us skip the payload.
            warn!("resource {resource_id} has descriptor version {version}, skipping");
            return Ok(ResourcePayload::Empty);
        }
        return Ok(ResourcePayload::Descriptor(descriptor::parse(r)?));
    }

    match resource_id {
        RES_ANIMATION_FRAMES => parse_animation_resource(r, delegate),
        RES_SLICES => match parse_slices(r)? {
            Some(slices) => {
                delegate.on_slices_data(&slices);
                Ok(ResourcePayload::Slices(slices))
            }
            None => Ok(ResourcePayload::Empty),
        },
        _ => {
            let mut raw = vec![0u8; res_length as usize];
            r.read_exact(&mut raw)?;
            Ok(ResourcePayload::Raw(raw))
        }
    }
}

// --- Resource 4003: animation frames ------------------------------------

/// Parses the animated-data block of resource 4003.
///
/// The payload opens with three undocumented `u32`s which are skipped
/// without validation, then an `8BIM`-framed `AnDs` block holding a
/// versioned descriptor. Inside it, the `FSts` singleton carries the
/// active frame index (`AFrm`) and the `FrIn` list one descriptor per
/// frame (`FrDl` duration, `FrID` id, `FrGA`).
fn parse_animation_resource<R, D>(
    r: &mut PsdReader<R>,
    delegate: &mut D,
) -> Result<ResourcePayload>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    r.skip(12)?;

    let signature = r.read_fourcc()?;
    if &signature != RESOURCE_SIGNATURE {
        debug!("animation resource without 8BIM block, skipping");
        return Ok(ResourcePayload::Empty);
    }
    let key = r.read_fourcc()?;
    if &key != ANIMATION_KEY {
        debug!(
            "animation resource with unexpected key '{}', skipping",
            String::from_utf8_lossy(&key)
        );
        return Ok(ResourcePayload::Empty);
    }

    r.read_u32()?; // data length, implied by the record framing

    let version = r.read_u32()?;
    if version != descriptor::DESCRIPTOR_VERSION {
        warn!("animated data has descriptor version {version}, skipping");
        return Ok(ResourcePayload::Empty);
    }
    let desc = descriptor::parse(r)?;

    let active_frame_index = desc
        .field("FSts")
        .and_then(|v| v.as_list())
        .filter(|states| states.len() == 1)
        .and_then(|states| states[0].as_descriptor())
        .and_then(|state| state.number("AFrm"))
        .unwrap_or(0.0) as u32;

    let mut frames = Vec::new();
    if let Some(frame_list) = desc.field("FrIn").and_then(|v| v.as_list()) {
        frames.reserve(frame_list.len());
        for frame in frame_list.iter().filter_map(|v| v.as_descriptor()) {
            frames.push(FrameInformation {
                id: frame.number("FrID").unwrap_or(0.0) as u32,
                duration: frame.number("FrDl").unwrap_or(0.0) as u32,
                ga: frame.number("FrGA").unwrap_or(0.0),
            });
        }
    }

    info!(
        "animated data: {} frames, active index {active_frame_index}",
        frames.len()
    );
    delegate.on_frames_data(&frames, active_frame_index);

    Ok(ResourcePayload::Frames {
        frames,
        active_frame_index,
    })
}

// --- Resource 1050: slices ----------------------------------------------

fn parse_slices<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<Option<SlicesData>> {
    let version = r.read_u32()?;
    match version {
        6 => parse_slices_v6(r).map(Some),
        7 | 8 => match descriptor::parse_versioned(r, "slices resource")? {
            Some(desc) => slices_from_descriptor(&desc).map(Some),
            None => Ok(None),
        },
        _ => Err(PsdError::InvalidFormat(format!(
            "unknown slices resource version: {version}"
        ))),
    }
}

/// Version 6 flat layout.
fn parse_slices_v6<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<SlicesData> {
    let bounds = Bounds {
        top: r.read_i32()?,
        left: r.read_i32()?,
        bottom: r.read_i32()?,
        right: r.read_i32()?,
    };
    let group_name = r.read_unicode_string()?;
    let count = r.read_u32()?;
    debug!("slices v6: {count} slices in group '{group_name}'");

    let mut slices = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let slice_id = r.read_u32()?;
        let group_id = r.read_u32()?;
        let origin = r.read_u32()?;
        if origin == 1 {
            r.read_u32()?; // associated layer id
        }
        let _name = r.read_unicode_string()?;
        let _slice_type = r.read_u32()?;
        // Per-slice bounds are stored left/top/right/bottom, unlike the
        // group bounds above.
        let left = r.read_i32()?;
        let top = r.read_i32()?;
        let right = r.read_i32()?;
        let bottom = r.read_i32()?;
        let url = r.read_unicode_string()?;
        let _target = r.read_unicode_string()?;
        let message = r.read_unicode_string()?;
        let alt_tag = r.read_unicode_string()?;
        let cell_text_is_html = r.read_u8()? != 0;
        let cell_text = r.read_unicode_string()?;
        let _horizontal_alignment = r.read_u32()?;
        let _vertical_alignment = r.read_u32()?;
        r.skip(4)?; // aRGB cell color

        slices.push(Slice {
            slice_id,
            group_id,
            bounds: Bounds {
                top,
                left,
                bottom,
                right,
            },
            url,
            message,
            alt_tag,
            cell_text,
            cell_text_is_html,
        });
    }

    Ok(SlicesData {
        bounds,
        group_name,
        slices,
    })
}

/// Version 7/8 descriptor layout.
fn slices_from_descriptor(desc: &Descriptor) -> Result<SlicesData> {
    let bounds = desc
        .field("bounds")
        .and_then(|v| v.as_descriptor())
        .map(bounds_from_descriptor)
        .unwrap_or_default();
    let group_name = desc.text("baseName");

    let mut slices = Vec::new();
    if let Some(list) = desc.field("slices").and_then(|v| v.as_list()) {
        slices.reserve(list.len());
        for slice in list.iter().filter_map(|v| v.as_descriptor()) {
            slices.push(Slice {
                slice_id: slice.number("sliceID").unwrap_or(0.0) as u32,
                group_id: slice.number("groupID").unwrap_or(0.0) as u32,
                bounds: slice
                    .field("bounds")
                    .and_then(|v| v.as_descriptor())
                    .map(bounds_from_descriptor)
                    .unwrap_or_default(),
                url: slice.text("url"),
                message: slice.text("Msge"),
                alt_tag: slice.text("altTag"),
                cell_text: slice.text("cellText"),
                cell_text_is_html: slice
                    .field("cellTextIsHTML")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            });
        }
    }

    debug!("slices v7/8: {} slices in group '{group_name}'", slices.len());
    Ok(SlicesData {
        bounds,
        group_name,
        slices,
    })
}

fn bounds_from_descriptor(desc: &Descriptor) -> Bounds {
    Bounds {
        top: desc.number("Top").unwrap_or(0.0) as i32,
        left: desc.number("Left").unwrap_or(0.0) as i32,
        bottom: desc.number("Btom").unwrap_or(0.0) as i32,
        right: desc.number("Rght").unwrap_or(0.0) as i32,
    }
}
