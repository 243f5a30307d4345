//! Low-level byte reading over a seekable source.
//!
//! Every multi-byte integer in a PSD file is big-endian. Several length
//! fields switch width with the file version: selected section lengths
//! are 4 bytes in PSD files and 8 bytes in PSB files, and RLE scanline
//! byte counts are 2 bytes in PSD and 4 bytes in PSB.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use encoding_rs::UTF_16BE;

use super::error::Result;
use super::types::models::Version;

/// Typed big-endian reader over any `Read + Seek` source.
///
/// The source is borrowed for the lifetime of the decode call and is
/// never closed by this crate. Read failures (including short reads in
/// required regions) propagate as [`PsdError::Io`](super::PsdError::Io).
#[derive(Debug)]
pub struct PsdReader<R> {
    inner: R,
}

impl<R: Read + Seek> PsdReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Consumes the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current absolute position in the source.
    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Jump to the given absolute position.
    pub fn seek_to(&mut self, abs_pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(abs_pos))?;
        Ok(())
    }

    /// Advance past `n` bytes without interpreting them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.inner.read_u16::<BigEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.inner.read_i16::<BigEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.inner.read_u32::<BigEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.inner.read_i32::<BigEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.inner.read_u64::<BigEndian>()?)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.inner.read_i64::<BigEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.inner.read_f64::<BigEndian>()?)
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    /// Read a four-character code as raw bytes.
    pub fn read_fourcc(&mut self) -> Result<[u8; 4]> {
        let mut code = [0u8; 4];
        self.inner.read_exact(&mut code)?;
        Ok(code)
    }

    /// Read a length that is 4 bytes in PSD files and 8 bytes in PSB
    /// files. Used by the layers-and-mask section and per-layer channel
    /// lengths.
    pub fn read_length(&mut self, version: Version) -> Result<u64> {
        match version {
            Version::Psd => Ok(u64::from(self.read_u32()?)),
            Version::Psb => self.read_u64(),
        }
    }

    /// Read an RLE scanline byte count: 2 bytes in PSD files, 4 bytes
    /// in PSB files.
    pub fn read_rle_count(&mut self, version: Version) -> Result<u32> {
        match version {
            Version::Psd => Ok(u32::from(self.read_u16()?)),
            Version::Psb => self.read_u32(),
        }
    }

    /// Read a Pascal string: a length byte, `length` content bytes, then
    /// zero padding until the total (including the length byte) is a
    /// multiple of `alignment`.
    ///
    /// Resource names use alignment 2, layer names alignment 4.
    pub fn read_pascal_string(&mut self, alignment: u64) -> Result<String> {
        let length = u64::from(self.read_u8()?);
        let mut bytes = vec![0u8; length as usize];
        self.inner.read_exact(&mut bytes)?;

        let consumed = 1 + length;
        let rem = consumed % alignment;
        if rem != 0 {
            self.skip(alignment - rem)?;
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a PSD Unicode string: a `u32` code-unit count followed by
    /// that many UTF-16BE code units (no BOM). Trailing NULs, which
    /// Photoshop includes in the count, are stripped.
    pub fn read_unicode_string(&mut self) -> Result<String> {
        let units = self.read_u32()?;
        let mut bytes = vec![0u8; units as usize * 2];
        self.inner.read_exact(&mut bytes)?;

        let (text, _, _) = UTF_16BE.decode(&bytes);
        Ok(text.trim_end_matches('\0').to_owned())
    }
}
