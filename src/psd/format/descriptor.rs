//! Parser for the recursive OSType descriptor grammar.
//!
//! Grammar, all integers big-endian:
//!
//! ```text
//! Descriptor := UnicodeStr Key u32:n { Key Variable }^n
//! Key        := u32:len (len == 0 -> 4 ASCII bytes ; else len ASCII bytes)
//! Variable   := fourcc:osTypeKey Body(osTypeKey)
//! Reference  := u32:n { fourcc:refKey RefBody(refKey) }^n
//! List       := u32:n { Variable }^n
//! UnitFloat  := fourcc:unit f64
//! UnicodeStr := u32:chars utf16be[chars]
//! ```
//!
//! The enclosing structure (image resource, tagged block) reads the
//! descriptor-format-version sentinel before calling in here.

use std::io::{Read, Seek};

use log::{trace, warn};

use crate::psd::error::{PsdError, Result};
use crate::psd::reader::PsdReader;
use crate::psd::types::descriptor::{Descriptor, OsType, ReferenceItem, UnitKind};

/// The descriptor-format-version every modern PSD writes.
pub const DESCRIPTOR_VERSION: u32 = 16;

/// Reads a `u32` descriptor-format-version and, when it is 16, the
/// descriptor that follows.
///
/// Any other version is logged and `None` is returned with the
/// descriptor bytes unconsumed; every caller sits inside a
/// length-framed block and resynchronizes by seeking, so a stray
/// version skips one descriptor rather than failing the decode.
pub fn parse_versioned<R: Read + Seek>(
    r: &mut PsdReader<R>,
    context: &'static str,
) -> Result<Option<Descriptor>> {
    let version = r.read_u32()?;
    if version != DESCRIPTOR_VERSION {
        warn!("{context} has descriptor version {version}, skipping");
        return Ok(None);
    }
    parse(r).map(Some)
}

/// Reads one descriptor (name, class id, keyed fields).
pub fn parse<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<Descriptor> {
    let name = r.read_unicode_string()?;
    let class_id = read_key(r)?;
    let count = r.read_u32()?;
    trace!("descriptor '{class_id}' with {count} fields");

    let mut desc = Descriptor {
        name,
        class_id,
        fields: Default::default(),
    };
    for _ in 0..count {
        let key = read_key(r)?;
        let value = parse_value(r)?;
        desc.fields.insert(key, value);
    }
    Ok(desc)
}

/// Reads a key or class id: length-prefixed ASCII, where a zero length
/// means a fixed 4-byte code.
fn read_key<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<String> {
    let len = r.read_u32()?;
    let mut bytes = vec![0u8; if len == 0 { 4 } else { len as usize }];
    r.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads one tagged value: the OSType fourcc and its body.
fn parse_value<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<OsType> {
    let code = r.read_fourcc()?;
    match &code {
        b"Objc" | b"GlbO" => Ok(OsType::Descriptor(parse(r)?)),
        b"VlLs" => {
            let count = r.read_u32()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(parse_value(r)?);
            }
            Ok(OsType::List(values))
        }
        b"obj " => Ok(OsType::Reference(parse_reference(r)?)),
        b"doub" => Ok(OsType::Double(r.read_f64()?)),
        b"UntF" => {
            let unit = parse_unit(r.read_fourcc()?)?;
            let value = r.read_f64()?;
            Ok(OsType::UnitFloat { unit, value })
        }
        b"TEXT" => Ok(OsType::String(r.read_unicode_string()?)),
        b"enum" => Ok(OsType::Enumerated {
            type_id: read_key(r)?,
            value: read_key(r)?,
        }),
        b"long" => Ok(OsType::Long(r.read_i32()?)),
        b"comp" => Ok(OsType::LargeInteger(r.read_i64()?)),
        b"bool" => Ok(OsType::Boolean(r.read_u8()? != 0)),
        b"type" | b"GlbC" => Ok(OsType::ClassType {
            name: r.read_unicode_string()?,
            class_id: read_key(r)?,
        }),
        b"alis" => {
            let length = r.read_u32()?;
            r.skip(u64::from(length))?;
            Ok(OsType::Alias { length })
        }
        b"tdta" => {
            let length = r.read_u32()?;
            let mut data = vec![0u8; length as usize];
            r.read_exact(&mut data)?;
            Ok(OsType::RawData(data))
        }
        _ => Err(PsdError::UnknownOsTypeKey(code)),
    }
}

fn parse_reference<R: Read + Seek>(r: &mut PsdReader<R>) -> Result<Vec<ReferenceItem>> {
    let count = r.read_u32()?;
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let code = r.read_fourcc()?;
        let item = match &code {
            b"prop" => ReferenceItem::Property {
                name: r.read_unicode_string()?,
                class_id: read_key(r)?,
                key_id: read_key(r)?,
            },
            b"Clss" => ReferenceItem::Class {
                name: r.read_unicode_string()?,
                class_id: read_key(r)?,
            },
            b"Enmr" => ReferenceItem::Enumerated {
                name: r.read_unicode_string()?,
                class_id: read_key(r)?,
                type_id: read_key(r)?,
                value: read_key(r)?,
            },
            b"rele" => ReferenceItem::Offset {
                name: r.read_unicode_string()?,
                class_id: read_key(r)?,
                value: r.read_u32()?,
            },
            // Documented item kinds with no documented body. Rejecting
            // beats guessing a length and desynchronizing the stream.
            b"Idnt" | b"indx" | b"name" => {
                return Err(PsdError::UnknownReferenceKey(code));
            }
            _ => return Err(PsdError::UnknownReferenceKey(code)),
        };
        items.push(item);
    }
    Ok(items)
}

fn parse_unit(code: [u8; 4]) -> Result<UnitKind> {
    match &code {
        b"#Ang" => Ok(UnitKind::Angle),
        b"#Rsl" => Ok(UnitKind::Density),
        b"#Rlt" => Ok(UnitKind::Distance),
        b"#Nne" => Ok(UnitKind::None),
        b"#Prc" => Ok(UnitKind::Percent),
        b"#Pxl" => Ok(UnitKind::Pixel),
        _ => Err(PsdError::UnknownUnitFloat(code)),
    }
}
