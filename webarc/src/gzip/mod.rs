// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Multi-member GZip framing (RFC 1952).
//!
//! [`GzipReader`] yields one [`GzipEntry`] per member and verifies header
//! and trailer checksums as the member is decompressed. [`GzipWriter`] and
//! [`GzipMemberWriter`] produce members.

mod reader;
mod writer;

use std::io::{self, Write};

use encoding::all::ISO_8859_1;
use encoding::{EncoderTrap, Encoding};

use crate::stream::PushbackRead;

pub use reader::{GzipEntry, GzipReader, GzipTrailer, DEFAULT_INPUT_BUFFER_SIZE};
pub use writer::{GzipMemberWriter, GzipWriter};

pub const MAGIC: [u8; 2] = [0x1f, 0x8b];

const CM_DEFLATE: u8 = 8;

const FTEXT: u8 = 0x01;
const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xe0;

/// `OS` value for "unknown".
pub const OS_UNKNOWN: u8 = 255;

/// Peek at the next two bytes and check for the GZip magic number.
///
/// The stream position is left unchanged.
pub fn is_gzip_magic<S: PushbackRead + ?Sized>(stream: &mut S) -> crate::Result<bool> {
    let mut magic = [0u8; 2];
    let n = stream.read_fully(&mut magic)?;
    stream.unread(&magic[..n])?;
    Ok(n == 2 && magic == MAGIC)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    Deflate,
    Unknown(u8),
}

impl From<u8> for CompressionMethod {
    fn from(value: u8) -> Self {
        match value {
            CM_DEFLATE => CompressionMethod::Deflate,
            x => CompressionMethod::Unknown(x),
        }
    }
}

impl From<CompressionMethod> for u8 {
    fn from(method: CompressionMethod) -> u8 {
        match method {
            CompressionMethod::Deflate => CM_DEFLATE,
            CompressionMethod::Unknown(x) => x,
        }
    }
}

/// Member header flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberFlags(pub u8);

impl MemberFlags {
    pub fn is_text(&self) -> bool {
        self.0 & FTEXT != 0
    }

    pub fn has_crc(&self) -> bool {
        self.0 & FHCRC != 0
    }

    pub fn has_extra(&self) -> bool {
        self.0 & FEXTRA != 0
    }

    pub fn has_name(&self) -> bool {
        self.0 & FNAME != 0
    }

    pub fn has_comment(&self) -> bool {
        self.0 & FCOMMENT != 0
    }

    /// Bits 5 to 7, which must be zero.
    pub fn reserved(&self) -> u8 {
        self.0 & FRESERVED
    }
}

/// Header of a GZip member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    pub compression_method: CompressionMethod,
    pub flags: MemberFlags,
    /// Modification time in seconds since the epoch, 0 if unknown.
    pub mtime: u32,
    pub extra_flags: u8,
    pub os: u8,
    pub extra: Option<Vec<u8>>,
    /// Original file name, decoded as ISO-8859-1.
    pub name: Option<String>,
    /// File comment, decoded as ISO-8859-1.
    pub comment: Option<String>,
    /// CRC16 stored in the header (`FHCRC`).
    pub header_crc16: Option<u16>,
    /// CRC16 computed over the header bytes preceding the stored CRC16.
    pub computed_crc16: u16,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipHeader {
    /// Header with deflate compression, no mtime and unknown OS.
    pub fn new() -> Self {
        GzipHeader {
            compression_method: CompressionMethod::Deflate,
            flags: MemberFlags::default(),
            mtime: 0,
            extra_flags: 0,
            os: OS_UNKNOWN,
            extra: None,
            name: None,
            comment: None,
            header_crc16: None,
            computed_crc16: 0,
        }
    }

    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn with_os(mut self, os: u8) -> Self {
        self.os = os;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_extra(mut self, extra: Vec<u8>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Write an `FHCRC` header checksum.
    pub fn with_header_crc(mut self, enabled: bool) -> Self {
        self.header_crc16 = if enabled { Some(0) } else { None };
        self
    }

    /// Whether the stored CRC16 is absent or matches the computed one.
    pub fn header_crc_ok(&self) -> bool {
        self.header_crc16.map_or(true, |crc| crc == self.computed_crc16)
    }

    /// Serialize the header. Flags are derived from the optional fields and
    /// the `FTEXT` bit of [`flags`](Self::flags).
    ///
    /// Returns the number of bytes written.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut flags = self.flags.0 & FTEXT;
        let mut body = Vec::new();
        if let Some(extra) = &self.extra {
            let len = u16::try_from(extra.len())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "GZip extra field too long"))?;
            flags |= FEXTRA;
            body.extend_from_slice(&len.to_le_bytes());
            body.extend_from_slice(extra);
        }
        if let Some(name) = &self.name {
            flags |= FNAME;
            body.extend(encode_latin1_z(name));
        }
        if let Some(comment) = &self.comment {
            flags |= FCOMMENT;
            body.extend(encode_latin1_z(comment));
        }
        if self.header_crc16.is_some() {
            flags |= FHCRC;
        }

        let mut bytes = Vec::with_capacity(10 + body.len() + 2);
        bytes.extend_from_slice(&MAGIC);
        bytes.push(self.compression_method.into());
        bytes.push(flags);
        bytes.extend_from_slice(&self.mtime.to_le_bytes());
        bytes.push(self.extra_flags);
        bytes.push(self.os);
        bytes.extend_from_slice(&body);
        if self.header_crc16.is_some() {
            let crc16 = (crc32fast::hash(&bytes) & 0xffff) as u16;
            bytes.extend_from_slice(&crc16.to_le_bytes());
        }
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }
}

fn encode_latin1_z(s: &str) -> Vec<u8> {
    let mut bytes = ISO_8859_1
        .encode(s, EncoderTrap::Replace)
        .unwrap_or_else(|_| s.bytes().filter(u8::is_ascii).collect());
    bytes.retain(|&b| b != 0);
    bytes.push(0);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ByteCountingReader;
    use std::io::Cursor;

    #[test]
    fn test_magic_peek_is_non_destructive() {
        let mut s = ByteCountingReader::new(Cursor::new(vec![0x1f, 0x8b, 8]), 2);
        assert!(is_gzip_magic(&mut s).unwrap());
        assert_eq!(s.consumed(), 0);
        assert_eq!(s.read_byte().unwrap(), Some(0x1f));

        let mut s = ByteCountingReader::new(Cursor::new(b"W".to_vec()), 2);
        assert!(!is_gzip_magic(&mut s).unwrap());
        assert_eq!(s.read_byte().unwrap(), Some(b'W'));
    }

    #[test]
    fn test_header_serialization() {
        let header = GzipHeader::new()
            .with_mtime(0x01020304)
            .with_name("file.warc")
            .with_comment("caf\u{e9}")
            .with_extra(vec![1, 2, 3])
            .with_header_crc(true);
        let mut out = Vec::new();
        let n = header.write(&mut out).unwrap();
        assert_eq!(n, out.len());
        assert_eq!(&out[..4], &[0x1f, 0x8b, 8, FEXTRA | FNAME | FCOMMENT | FHCRC]);
        assert_eq!(&out[4..8], &[4, 3, 2, 1]);
        assert_eq!(&out[12..15], &[1, 2, 3]);
        assert_eq!(&out[15..25], b"file.warc\0");
        assert_eq!(&out[25..30], b"caf\xe9\0");
        let crc = u16::from_le_bytes([out[30], out[31]]);
        assert_eq!(u32::from(crc), crc32fast::hash(&out[..30]) & 0xffff);
    }
}
