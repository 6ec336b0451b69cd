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

use std::io::{Read, Write};

use chrono::Utc;
use flate2::Compression;
use uuid::Uuid;

use super::WarcRecordType;
use crate::digest::{compute, DigestAlgorithm, DigestEncoding, WarcDigest};
use crate::error::{Error, Result};
use crate::headers::{HeaderEncoding, HeaderMap};
use crate::writer::{RecordSink, WriterState};

/// Status line of records created by [`WarcRecordBuilder`].
pub const WARC_VERSION_LINE: &str = "WARC/1.1";

/// Header block and buffered content of a WARC record to be written.
#[derive(Debug, Clone)]
pub struct WarcRecordBuilder {
    record_type: WarcRecordType,
    headers: HeaderMap,
    content: Vec<u8>,
}

impl Default for WarcRecordBuilder {
    fn default() -> Self {
        Self::new(WarcRecordType::Resource)
    }
}

impl WarcRecordBuilder {
    /// Create a record with mandatory headers and empty content.
    pub fn new(record_type: WarcRecordType) -> Self {
        let mut builder = WarcRecordBuilder {
            record_type,
            headers: HeaderMap::new(HeaderEncoding::Unicode),
            content: Vec::new(),
        };
        builder.init_headers(0, record_type, None);
        builder
    }

    /// Reset the headers to the mandatory set.
    ///
    /// # Arguments
    ///
    /// * `content_length` - Record block length in bytes
    /// * `record_type` - WARC-Type
    /// * `record_urn` - WARC-Record-ID as URN without `'<'`, `'>'` (if unset, a random URN will be generated)
    pub fn init_headers(&mut self, content_length: usize, record_type: WarcRecordType, record_urn: Option<&str>) {
        let urn = match record_urn {
            Some(urn) => urn.to_string(),
            None => format!("urn:uuid:{}", Uuid::new_v4()),
        };
        self.record_type = record_type;

        self.headers.clear();
        self.headers.set_status_line(WARC_VERSION_LINE);
        self.headers.append("WARC-Type", record_type.as_str());
        let date = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        self.headers.append("WARC-Date", date);
        self.headers.append("WARC-Record-ID", format!("<{}>", urn));
        self.headers.append("Content-Length", content_length.to_string());
    }

    pub fn record_type(&self) -> WarcRecordType {
        self.record_type
    }

    pub fn set_record_type(&mut self, record_type: WarcRecordType) {
        self.record_type = record_type;
        self.headers.set("WARC-Type", record_type.as_str());
    }

    pub fn record_id(&self) -> Option<String> {
        self.headers.get("WARC-Record-ID")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Mark the content as an HTTP message by setting `Content-Type`.
    pub fn set_http(&mut self) {
        self.headers.set(
            "Content-Type",
            match self.record_type {
                WarcRecordType::Request => "application/http; msgtype=request",
                WarcRecordType::Response => "application/http; msgtype=response",
                _ => "application/http",
            },
        );
    }

    /// Set the record block and update `Content-Length`.
    pub fn set_content(&mut self, content: Vec<u8>) {
        self.headers.set("Content-Length", content.len().to_string());
        self.content = content;
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn content_length(&self) -> usize {
        self.content.len()
    }
}

/// Writes WARC records, optionally one GZip member per record.
///
/// # Example
///
/// ```rust
/// use webarc::{WarcRecordBuilder, WarcRecordType, WarcWriter};
///
/// let mut record = WarcRecordBuilder::new(WarcRecordType::Resource);
/// record.headers_mut().set("WARC-Target-URI", "http://example.com/");
/// record.headers_mut().set("Content-Type", "text/plain");
/// record.set_content(b"hello".to_vec());
///
/// let mut writer = WarcWriter::new(Vec::new());
/// writer.write_record(&record).unwrap();
/// let out = writer.into_inner().unwrap();
/// assert!(out.starts_with(b"WARC/1.1\r\n"));
/// assert!(out.ends_with(b"hello\r\n\r\n"));
/// ```
pub struct WarcWriter<W: Write> {
    sink: RecordSink<W>,
    block_digest: Option<(DigestAlgorithm, DigestEncoding)>,
}

impl<W: Write> WarcWriter<W> {
    pub fn new(out: W) -> Self {
        WarcWriter {
            sink: RecordSink::new(out, None),
            block_digest: None,
        }
    }

    /// Write every record into its own GZip member.
    pub fn new_compressed(out: W) -> Self {
        Self::with_compression_level(out, Compression::default())
    }

    pub fn with_compression_level(out: W, level: Compression) -> Self {
        WarcWriter {
            sink: RecordSink::new(out, Some(level)),
            block_digest: None,
        }
    }

    /// Add a `WARC-Block-Digest` to records written with
    /// [`write_record`](Self::write_record) that do not declare one.
    pub fn with_block_digest(mut self, algorithm: DigestAlgorithm, encoding: DigestEncoding) -> Self {
        self.block_digest = Some((algorithm, encoding));
        self
    }

    pub fn state(&self) -> WriterState {
        self.sink.state()
    }

    /// Number of records written.
    pub fn records(&self) -> u64 {
        self.sink.records()
    }

    pub fn is_compressed(&self) -> bool {
        self.sink.is_compressed()
    }

    /// Start a record. A missing status line is written as `WARC/1.1`.
    pub fn write_header(&mut self, header: &HeaderMap) -> Result<()> {
        let declared = match header.get("Content-Length") {
            Some(v) => Some(
                v.trim()
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidArgument(format!("invalid Content-Length '{}'", v)))?,
            ),
            None => None,
        };
        let mut buf = Vec::new();
        if header.status_line_bytes().is_empty() {
            buf.extend_from_slice(WARC_VERSION_LINE.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        header.write(&mut buf)?;
        buf.extend_from_slice(b"\r\n");
        self.sink.write_header(&buf, declared)
    }

    pub fn write_payload(&mut self, data: &[u8]) -> Result<()> {
        self.sink.write_payload(data)
    }

    /// Copy `length` bytes of payload from `reader`. Returns the number of
    /// bytes copied, which is less than `length` if `reader` ends early.
    pub fn stream_payload<T: Read>(&mut self, reader: T, length: u64) -> Result<u64> {
        self.sink.stream_payload(reader, length)
    }

    /// Finish the current record.
    pub fn close_record(&mut self) -> Result<()> {
        self.sink.close_record(b"\r\n\r\n")
    }

    /// Write header, content and trailer of a buffered record.
    pub fn write_record(&mut self, record: &WarcRecordBuilder) -> Result<()> {
        match self.block_digest {
            Some((algorithm, encoding)) if !record.headers().contains_key("WARC-Block-Digest") => {
                let digest = compute(algorithm, record.content());
                let mut headers = record.headers().clone();
                headers.set("WARC-Block-Digest", WarcDigest::from_bytes(algorithm, &digest, encoding).to_string());
                self.write_header(&headers)?;
            }
            _ => self.write_header(record.headers())?,
        }
        self.write_payload(record.content())?;
        self.close_record()
    }

    /// Flush and finish the last GZip member. Calling `close` again does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.sink.close()
    }

    /// The underlying sink, between records only.
    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.sink.get_mut()
    }

    /// Close the writer and return the sink.
    pub fn into_inner(self) -> Result<W> {
        self.sink.into_inner()
    }
}
