//! Core PSD/PSB decoder module.

pub mod delegate;
pub mod error;
pub mod format;
pub mod reader;
pub mod types;

use std::io::{Read, Seek};

use log::info;

pub use delegate::{DecoderDelegate, NullDelegate};
pub use error::{PsdError, Result};
pub use reader::PsdReader;

use types::models::FileHeader;

/// Knobs for behaviors the format leaves to the reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Read the merged result's transparency channel when the layer
    /// count is negative. Off by default: files in the wild disagree on
    /// whether the channel is actually present at that position.
    pub read_merged_transparency: bool,
}

/// The main decoder for PSD and PSB files.
///
/// Drives the five file sections in order over a borrowed byte source,
/// emitting one delegate event per parsed item. The decoder is
/// single-threaded and performs no internal buffering beyond per-call
/// scratch space; event order mirrors on-disk order.
///
/// ```no_run
/// use std::fs::File;
/// use psd_reader::{Decoder, NullDelegate};
///
/// let file = File::open("image.psd")?;
/// let mut decoder = Decoder::new(file);
/// decoder.decode(&mut NullDelegate)?;
/// # Ok::<(), psd_reader::PsdError>(())
/// ```
#[derive(Debug)]
pub struct Decoder<R> {
    reader: PsdReader<R>,
    options: DecodeOptions,
    header: Option<FileHeader>,
}

impl<R: Read + Seek> Decoder<R> {
    /// Creates a decoder over `source` with default options.
    pub fn new(source: R) -> Self {
        Self::with_options(source, DecodeOptions::default())
    }

    pub fn with_options(source: R, options: DecodeOptions) -> Self {
        Self {
            reader: PsdReader::new(source),
            options,
            header: None,
        }
    }

    /// The file header, available once [`decode`](Self::decode) has
    /// parsed it (even if a later section failed).
    pub fn file_header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    /// Consumes the decoder, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    /// Parses the whole file, emitting delegate events as sections are
    /// understood.
    ///
    /// Stops at the first fatal error; events delivered before the
    /// failure remain valid, and the source is left wherever the fault
    /// occurred.
    pub fn decode<D: DecoderDelegate>(&mut self, delegate: &mut D) -> Result<()> {
        let header = format::header::parse(&mut self.reader)?;
        self.header = Some(header);
        delegate.on_file_header(&header);

        format::color_mode::parse(&mut self.reader, &header, delegate)?;
        format::resources::parse(&mut self.reader, &header, delegate)?;
        format::layers::parse(&mut self.reader, &header, &self.options, delegate)?;
        format::image::parse_composite(&mut self.reader, &header, delegate)?;

        info!("decode complete");
        Ok(())
    }
}

/// Convenience entry point: decode `source` into `delegate` with
/// default options.
pub fn decode_psd<R, D>(source: R, delegate: &mut D) -> Result<()>
where
    R: Read + Seek,
    D: DecoderDelegate,
{
    Decoder::new(source).decode(delegate)
}
