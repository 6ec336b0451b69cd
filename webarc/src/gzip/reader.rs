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

use std::io::{self, Read};

use flate2::{Decompress, FlushDecompress, Status};

use super::{CompressionMethod, GzipHeader, MemberFlags, MAGIC};
use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::error::{Error, Result};
use crate::stream::{decode_latin1, ByteCountingReader, PushbackRead};

/// Default size of the compressed input buffer.
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 8192;

const SKIP_BUFFER_SIZE: usize = 8192;

/// GZip member trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    pub crc32: u32,
    /// Uncompressed size modulo 2^32.
    pub isize: u32,
}

#[derive(Debug)]
struct Member {
    header: GzipHeader,
    offset: u64,
    crc: crc32fast::Hasher,
    size: u64,
    computed_crc32: Option<u32>,
    trailer: Option<GzipTrailer>,
    end_offset: Option<u64>,
    diagnostics: Diagnostics,
}

/// Reader for concatenated GZip members.
///
/// Only one member can be active at a time. Requesting the next entry
/// skips whatever is left of the current one.
pub struct GzipReader<R> {
    input: ByteCountingReader<R>,
    inflater: Decompress,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    member: Option<Member>,
    entries: u64,
    closed: bool,
}

impl<R: Read> GzipReader<R> {
    pub fn new(stream: R) -> Self {
        Self::with_buffer_size(stream, DEFAULT_INPUT_BUFFER_SIZE)
    }

    /// Create a reader with a custom compressed input buffer size.
    pub fn with_buffer_size(stream: R, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(16);
        Self::from_stream(ByteCountingReader::new(stream, buffer_size), buffer_size)
    }

    /// Create a reader over a stream that was positioned at `offset` by the caller.
    pub fn with_offset(stream: R, offset: u64) -> Self {
        Self::from_stream(
            ByteCountingReader::with_offset(stream, DEFAULT_INPUT_BUFFER_SIZE, offset),
            DEFAULT_INPUT_BUFFER_SIZE,
        )
    }

    /// Wrap an existing counting stream. The input buffer is capped at the
    /// stream's push-back capacity so over-read input can always be returned.
    pub fn from_stream(input: ByteCountingReader<R>, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.min(input.capacity()).max(1);
        GzipReader {
            input,
            inflater: Decompress::new(false),
            buf: vec![0u8; buffer_size],
            pos: 0,
            len: 0,
            member: None,
            entries: 0,
            closed: false,
        }
    }

    /// Compressed bytes consumed so far.
    pub fn consumed(&self) -> u64 {
        self.input.consumed() - (self.len - self.pos) as u64
    }

    /// Number of members read so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop reading. Further calls to [`next_entry`](Self::next_entry)
    /// return `None`. Calling `close` repeatedly is harmless.
    pub fn close(&mut self) {
        if !self.closed {
            log::debug!("Closing GZip reader after {} members", self.entries);
        }
        self.closed = true;
        self.member = None;
    }

    /// Advance to the next member, `None` at end of stream.
    pub fn next_entry(&mut self) -> Result<Option<GzipEntry<'_, R>>> {
        if self.closed {
            return Ok(None);
        }
        self.finish_member()?;
        self.member = None;
        match self.read_header()? {
            Some(member) => {
                log::debug!("GZip member {} at offset {}", self.entries, member.offset);
                self.member = Some(member);
                self.entries += 1;
                Ok(Some(GzipEntry { reader: self }))
            }
            None => Ok(None),
        }
    }

    /// Handle to the current member, if any.
    pub(crate) fn current_entry(&mut self) -> Option<GzipEntry<'_, R>> {
        if self.member.is_some() {
            Some(GzipEntry { reader: self })
        } else {
            None
        }
    }

    fn read_header(&mut self) -> Result<Option<Member>> {
        let offset = self.input.consumed();
        let mut fixed = [0u8; 10];
        let n = self.input.read_fully(&mut fixed)?;
        if n == 0 {
            return Ok(None);
        }
        if n < fixed.len() {
            return Err(Error::invalid_gzip(offset, format!("truncated header ({} of 10 bytes)", n)));
        }

        let mut diagnostics = Diagnostics::new();
        let mut raw = fixed.to_vec();
        if fixed[..2] != MAGIC {
            diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "Magic number",
                format!("{:02x}{:02x}", fixed[0], fixed[1]),
            ));
        }
        let compression_method = CompressionMethod::from(fixed[2]);
        if compression_method != CompressionMethod::Deflate {
            diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "Compression method",
                fixed[2].to_string(),
            ));
        }
        let flags = MemberFlags(fixed[3]);
        if flags.reserved() != 0 {
            diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "Flags",
                format!("{:#04x}", flags.0),
            ));
        }
        let mtime = u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
        let extra_flags = fixed[8];
        if !matches!(extra_flags, 0 | 2 | 4) {
            diagnostics.add_warning(Diagnosis::with_value(
                DiagnosisType::Unknown,
                "Extra flags",
                extra_flags.to_string(),
            ));
        }
        let os = fixed[9];
        if os > 13 && os != super::OS_UNKNOWN {
            diagnostics.add_warning(Diagnosis::with_value(
                DiagnosisType::Unknown,
                "Operating system",
                os.to_string(),
            ));
        }

        let extra = if flags.has_extra() {
            let mut xlen = [0u8; 2];
            if self.input.read_fully(&mut xlen)? < 2 {
                return Err(Error::invalid_gzip(offset, "truncated extra field length"));
            }
            raw.extend_from_slice(&xlen);
            let mut extra = vec![0u8; usize::from(u16::from_le_bytes(xlen))];
            if self.input.read_fully(&mut extra)? < extra.len() {
                return Err(Error::invalid_gzip(offset, "extra field shorter than its declared length"));
            }
            raw.extend_from_slice(&extra);
            Some(extra)
        } else {
            None
        };
        let name = if flags.has_name() {
            Some(self.read_zero_terminated(offset, &mut raw, "file name")?)
        } else {
            None
        };
        let comment = if flags.has_comment() {
            Some(self.read_zero_terminated(offset, &mut raw, "comment")?)
        } else {
            None
        };

        let computed_crc16 = (crc32fast::hash(&raw) & 0xffff) as u16;
        let header_crc16 = if flags.has_crc() {
            let mut crc = [0u8; 2];
            if self.input.read_fully(&mut crc)? < 2 {
                return Err(Error::invalid_gzip(offset, "truncated header CRC16"));
            }
            let crc = u16::from_le_bytes(crc);
            if crc != computed_crc16 {
                diagnostics.add_warning(Diagnosis::with_value(
                    DiagnosisType::Invalid,
                    "Header CRC16",
                    format!("{:04x} != {:04x}", crc, computed_crc16),
                ));
            }
            Some(crc)
        } else {
            None
        };

        self.inflater.reset(false);
        Ok(Some(Member {
            header: GzipHeader {
                compression_method,
                flags,
                mtime,
                extra_flags,
                os,
                extra,
                name,
                comment,
                header_crc16,
                computed_crc16,
            },
            offset,
            crc: crc32fast::Hasher::new(),
            size: 0,
            computed_crc32: None,
            trailer: None,
            end_offset: None,
            diagnostics,
        }))
    }

    fn read_zero_terminated(&mut self, offset: u64, raw: &mut Vec<u8>, what: &str) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            match self.input.read_byte()? {
                Some(0) => break,
                Some(b) => bytes.push(b),
                None => return Err(Error::invalid_gzip(offset, format!("unterminated {}", what))),
            }
        }
        raw.extend_from_slice(&bytes);
        raw.push(0);
        Ok(decode_latin1(&bytes))
    }

    fn read_member(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let GzipReader {
            input,
            inflater,
            buf,
            pos,
            len,
            member,
            ..
        } = self;
        let member = match member {
            Some(m) if m.end_offset.is_none() => m,
            _ => return Ok(0),
        };
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            if *pos == *len {
                let n = loop {
                    match input.read(buf) {
                        Ok(n) => break n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e),
                    }
                };
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("GZip member at offset {} ends inside the deflate stream", member.offset),
                    ));
                }
                *pos = 0;
                *len = n;
            }

            let in_before = inflater.total_in();
            let out_before = inflater.total_out();
            let status = inflater
                .decompress(&buf[*pos..*len], out, FlushDecompress::None)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let consumed = (inflater.total_in() - in_before) as usize;
            let produced = (inflater.total_out() - out_before) as usize;
            *pos += consumed;
            member.crc.update(&out[..produced]);
            member.size += produced as u64;

            if status == Status::StreamEnd {
                // Compressed data ends here, the rest of the buffer belongs to the trailer
                // and whatever follows the member.
                input.unread(&buf[*pos..*len])?;
                *pos = 0;
                *len = 0;
                Self::read_trailer(input, member)?;
                return Ok(produced);
            }
            if produced > 0 {
                return Ok(produced);
            }
            if consumed == 0 && *pos < *len {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "deflate stream stalled"));
            }
        }
    }

    fn read_trailer(input: &mut ByteCountingReader<R>, member: &mut Member) -> io::Result<()> {
        let mut trailer = [0u8; 8];
        if input.read_fully(&mut trailer)? < trailer.len() {
            return Err(Error::invalid_gzip(member.offset, "truncated trailer").into());
        }
        let trailer = GzipTrailer {
            crc32: u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]),
            isize: u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]),
        };
        let crc32 = member.crc.clone().finalize();
        if crc32 != trailer.crc32 {
            member.diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "CRC32",
                format!("{:08x} != {:08x}", trailer.crc32, crc32),
            ));
        }
        if (member.size & 0xffff_ffff) as u32 != trailer.isize {
            member.diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "ISIZE",
                format!("{} != {}", trailer.isize, member.size),
            ));
        }
        member.computed_crc32 = Some(crc32);
        member.trailer = Some(trailer);
        member.end_offset = Some(input.consumed());
        Ok(())
    }

    /// Skip the rest of the current member.
    fn finish_member(&mut self) -> io::Result<()> {
        if self.member.as_ref().is_some_and(|m| m.end_offset.is_none()) {
            let mut skip = vec![0u8; SKIP_BUFFER_SIZE];
            while self.read_member(&mut skip)? > 0 {}
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }
}

/// One GZip member. Reading yields the decompressed data.
pub struct GzipEntry<'a, R> {
    reader: &'a mut GzipReader<R>,
}

impl<R: Read> GzipEntry<'_, R> {
    fn member(&self) -> Option<&Member> {
        self.reader.member.as_ref()
    }

    pub fn header(&self) -> Option<&GzipHeader> {
        self.member().map(|m| &m.header)
    }

    /// Offset of the member header in the compressed stream.
    pub fn offset(&self) -> u64 {
        self.member().map_or(0, |m| m.offset)
    }

    /// Offset just past the trailer, once the member has been read completely.
    pub fn end_offset(&self) -> Option<u64> {
        self.member().and_then(|m| m.end_offset)
    }

    /// Decompressed bytes produced so far.
    pub fn uncompressed_size(&self) -> u64 {
        self.member().map_or(0, |m| m.size)
    }

    /// CRC32 of the decompressed data, once the member has been read completely.
    pub fn computed_crc32(&self) -> Option<u32> {
        self.member().and_then(|m| m.computed_crc32)
    }

    pub fn trailer(&self) -> Option<GzipTrailer> {
        self.member().and_then(|m| m.trailer)
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.member().map(|m| &m.diagnostics)
    }

    /// Whether no errors were found in header or trailer.
    pub fn is_compliant(&self) -> bool {
        self.member().is_some_and(|m| !m.diagnostics.has_errors())
    }

    /// Whether the trailer has been read.
    pub fn is_finished(&self) -> bool {
        self.end_offset().is_some()
    }

    /// Skip the remaining data and verify the trailer.
    pub fn close(&mut self) -> Result<()> {
        self.reader.finish_member()?;
        Ok(())
    }

    /// Take the diagnostics collected for this member.
    pub(crate) fn take_diagnostics(&mut self) -> Diagnostics {
        self.reader
            .member
            .as_mut()
            .map(|m| std::mem::take(&mut m.diagnostics))
            .unwrap_or_default()
    }
}

impl<R: Read> Read for GzipEntry<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read_member(buf)
    }
}
