//! The Adobe OSType variant tree.
//!
//! Structured metadata in PSD files (animation frames, slices, smart
//! object settings, per-layer timelines) is stored as a recursive
//! "descriptor" grammar: keyed maps whose values are tagged variants.
//! This module holds the owned tree the parser builds; the grammar
//! itself lives in [`format::descriptor`](crate::psd::format::descriptor).

use log::warn;

/// A descriptor: a named, class-tagged, ordered key→value map.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    /// UTF-16BE "name from classID" field.
    pub name: String,
    pub class_id: String,
    pub fields: DescriptorMap,
}

impl Descriptor {
    /// Looks up a field by key, ignoring the trailing spaces that
    /// four-character keys pad with (`url ` matches `url`).
    pub fn field(&self, key: &str) -> Option<&OsType> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k.trim_end() == key).then_some(v))
    }

    /// A field coerced through [`OsType::as_number`].
    pub fn number(&self, key: &str) -> Option<f64> {
        self.field(key).and_then(|v| v.as_number())
    }

    /// A `TEXT` field, or the empty string when absent.
    pub fn text(&self, key: &str) -> String {
        self.field(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned()
    }
}

/// Insertion-ordered map from descriptor keys to values.
///
/// Keys are 4-byte ASCII codes or longer ASCII strings. Iteration
/// preserves on-disk order. Duplicate keys are not expected; when one
/// appears the last value wins and a warning is logged.
#[derive(Debug, Clone, Default)]
pub struct DescriptorMap {
    entries: Vec<(String, OsType)>,
}

impl DescriptorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: OsType) {
        if let Some(existing) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            warn!("duplicate descriptor key '{key}', keeping the later value");
            existing.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&OsType> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OsType)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unit tag of a `UntF` unit-float value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// `#Ang`, degrees.
    Angle,
    /// `#Rsl`, per-inch density.
    Density,
    /// `#Rlt`, distance in points.
    Distance,
    /// `#Nne`, unitless.
    None,
    /// `#Prc`.
    Percent,
    /// `#Pxl`.
    Pixel,
}

/// One item of an `obj ` reference value.
///
/// The format documents seven item kinds; the three without a body
/// grammar (`Idnt`, `indx`, `name`) are rejected during parsing rather
/// than represented here.
#[derive(Debug, Clone)]
pub enum ReferenceItem {
    Property {
        name: String,
        class_id: String,
        key_id: String,
    },
    Class {
        name: String,
        class_id: String,
    },
    Enumerated {
        name: String,
        class_id: String,
        type_id: String,
        value: String,
    },
    Offset {
        name: String,
        class_id: String,
        value: u32,
    },
}

/// A value of the OSType grammar.
///
/// `Objc` and `GlbO` both map to `Descriptor`; `type` and `GlbC` both
/// map to `ClassType`.
#[derive(Debug, Clone)]
pub enum OsType {
    Descriptor(Descriptor),
    List(Vec<OsType>),
    Reference(Vec<ReferenceItem>),
    Double(f64),
    UnitFloat { unit: UnitKind, value: f64 },
    String(String),
    Enumerated { type_id: String, value: String },
    Long(i32),
    LargeInteger(i64),
    Boolean(bool),
    ClassType { name: String, class_id: String },
    /// Opaque length-prefixed alias blob; content is skipped on parse.
    Alias { length: u32 },
    RawData(Vec<u8>),
}

impl OsType {
    /// Numeric coercion shared by the three numeric kinds.
    ///
    /// Sub-parsers that pull counts and ids out of descriptors accept
    /// any of `long`, `comp` or `doub` in those positions.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            OsType::Long(v) => Some(f64::from(*v)),
            OsType::LargeInteger(v) => Some(*v as f64),
            OsType::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_descriptor(&self) -> Option<&Descriptor> {
        match self {
            OsType::Descriptor(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[OsType]> {
        match self {
            OsType::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OsType::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OsType::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}
