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

//! Format-independent record reading.
//!
//! WARC and ARC share the same record life cycle: locate a header block,
//! expose a length-delimited payload, then verify digests and the newlines
//! that separate records. A [`RecordFormat`] supplies the parts that differ.

mod options;
mod reader;
mod record;

use std::fmt;
use std::io::{self, Read};

use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::{DigestAlgorithm, WarcDigest};
use crate::gzip::GzipEntry;
use crate::http::HttpHeader;
use crate::payload::Payload;
use crate::stream::{ByteCountingReader, PushbackRead};
use crate::Result;

pub use options::{InputCompression, ReaderOptions};
pub use reader::{ArchiveReader, ReaderStats, Records};
pub use record::{Record, RecordSummary};

/// Record syntax of an archive format.
pub trait RecordFormat: Default {
    type Header: fmt::Debug + Default;

    /// Newline sequences expected between the end of a payload and the next record.
    const TRAILING_NEWLINES: usize;

    /// Find the next record start and parse its header block.
    ///
    /// Returns the offset of the first header byte and the header, or
    /// `None` at end of stream. Problems found on the way are added to
    /// `diagnostics`.
    fn parse_header<S: PushbackRead + ?Sized>(
        &mut self,
        stream: &mut S,
        options: &ReaderOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<(u64, Self::Header)>>;

    /// Declared payload length.
    fn content_length(header: &Self::Header) -> Option<u64>;

    fn block_digest(_header: &Self::Header) -> Option<&WarcDigest> {
        None
    }

    fn payload_digest(_header: &Self::Header) -> Option<&WarcDigest> {
        None
    }

    /// Inspect the first payload bytes before the caller sees them.
    ///
    /// Returns the embedded HTTP header, if the record carries one.
    fn begin_payload<S: Read>(
        &mut self,
        header: &mut Self::Header,
        payload: &mut Payload<S>,
        http_digest: Option<DigestAlgorithm>,
        options: &ReaderOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<HttpHeader>>;

    /// Raw value of a header field by case-insensitive name.
    fn header_field<'h>(header: &'h Self::Header, name: &str) -> Option<&'h str>;
}

/// Stream a record reads from. Compressed records own a handle to
/// their GZip member.
pub(crate) enum RecordInput<'a, R> {
    Plain(&'a mut ByteCountingReader<R>),
    Gzip(ByteCountingReader<GzipEntry<'a, R>>),
}

impl<R: Read> RecordInput<'_, R> {
    /// Finish the GZip member of a compressed record. Data left in the
    /// member after the record is skipped and reported as UNDESIRED_DATA.
    fn close_member(&mut self, diagnostics: &mut Diagnostics) -> Result<()> {
        if let RecordInput::Gzip(stream) = self {
            let leftover = io::copy(stream, &mut io::sink())?;
            if leftover > 0 {
                let offset = stream.get_ref().offset();
                log::warn!("Skipped {} bytes after record in GZip member at offset {}", leftover, offset);
                diagnostics.add_error(Diagnosis::with_value(
                    DiagnosisType::UndesiredData,
                    "GZip member",
                    format!("{} bytes after record in member at offset {}", leftover, offset),
                ));
            }
            let entry = stream.get_mut();
            entry.close()?;
            diagnostics.append(&mut entry.take_diagnostics());
        }
        Ok(())
    }

    /// Offset just past the record in the underlying file.
    fn end_offset(&self) -> u64 {
        match self {
            RecordInput::Plain(stream) => stream.consumed(),
            RecordInput::Gzip(stream) => {
                let entry = stream.get_ref();
                entry.end_offset().unwrap_or_else(|| entry.offset())
            }
        }
    }
}

impl<R: Read> Read for RecordInput<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            RecordInput::Plain(stream) => stream.read(buf),
            RecordInput::Gzip(stream) => stream.read(buf),
        }
    }
}

impl<R: Read> PushbackRead for RecordInput<'_, R> {
    fn unread(&mut self, data: &[u8]) -> Result<()> {
        match self {
            RecordInput::Plain(stream) => stream.unread(data),
            RecordInput::Gzip(stream) => stream.unread(data),
        }
    }

    fn consumed(&self) -> u64 {
        match self {
            RecordInput::Plain(stream) => stream.consumed(),
            RecordInput::Gzip(stream) => stream.consumed(),
        }
    }
}

/// Count CRLF or LF sequences at the current position. The first byte
/// that is not part of one is pushed back.
pub(crate) fn parse_new_lines<S: PushbackRead + ?Sized>(stream: &mut S) -> Result<usize> {
    let mut count = 0;
    loop {
        match stream.read_byte()? {
            Some(b'\n') => count += 1,
            Some(b'\r') => match stream.read_byte()? {
                Some(b'\n') => count += 1,
                Some(b) => {
                    stream.unread(&[b'\r', b])?;
                    break;
                }
                None => {
                    stream.unread(b"\r")?;
                    break;
                }
            },
            Some(b) => {
                stream.unread(&[b])?;
                break;
            }
            None => break,
        }
    }
    Ok(count)
}
