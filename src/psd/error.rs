//! Custom error types for the psd-reader crate.

use thiserror::Error;

/// Renders a four-character code for error messages, escaping
/// non-printable bytes.
fn fourcc(code: &[u8; 4]) -> String {
    code.iter()
        .flat_map(|&b| (b as char).escape_default())
        .collect()
}

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum PsdError {
    /// An error originating from I/O operations, including premature
    /// end-of-file inside a required region.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A signature (magic number) did not match the expected value.
    #[error("bad signature in {context}: found '{}'", fourcc(.found))]
    BadSignature {
        context: &'static str,
        found: [u8; 4],
    },

    /// The file version field is neither PSD (1) nor PSB (2).
    #[error("unsupported file version: {0}")]
    UnsupportedVersion(u16),

    /// The bits-per-channel value is not one of 1, 8, 16 or 32.
    #[error("unsupported image depth: {0}")]
    UnsupportedDepth(u16),

    /// The color mode field holds a value outside the documented set.
    #[error("invalid color mode: {0}")]
    InvalidColorMode(u16),

    /// The channel count field is outside 1..=56.
    #[error("channel count out of range: {0}")]
    ChannelCountOutOfRange(u16),

    /// Width or height exceeds the ceiling for the file version.
    #[error("dimensions {width}x{height} exceed the {limit}px limit for this version")]
    DimensionsOutOfRange {
        width: u32,
        height: u32,
        limit: u32,
    },

    /// A descriptor value carries an OSType code outside the grammar.
    #[error("unknown OSType key '{}'", fourcc(.0))]
    UnknownOsTypeKey([u8; 4]),

    /// A reference item carries a code outside the grammar, or one of
    /// the three codes with no documented body.
    #[error("unknown or undecodable reference key '{}'", fourcc(.0))]
    UnknownReferenceKey([u8; 4]),

    /// A unit-float value carries an unknown unit tag.
    #[error("unknown unit float tag '{}'", fourcc(.0))]
    UnknownUnitFloat([u8; 4]),

    /// The file is structurally invalid in a way not covered by a more
    /// specific variant.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// A convenience `Result` type alias using the crate's [`PsdError`] type.
pub type Result<T> = std::result::Result<T, PsdError>;
