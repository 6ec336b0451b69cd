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

use std::fmt;
use std::io::{self, Read};
use std::mem;

use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::{DigestAlgorithm, DigestEncoding, WarcDigest};
use crate::engine::{parse_new_lines, ReaderOptions, ReaderStats, RecordFormat, RecordInput};
use crate::http::HttpHeader;
use crate::payload::Payload;
use crate::Result;

/// Extra push-back room on top of the largest sniffable HTTP header.
const PAYLOAD_PUSHBACK_SLACK: usize = 16;

enum Body<'a, R> {
    Payload(Payload<RecordInput<'a, R>>),
    Empty(RecordInput<'a, R>),
    Closed,
}

/// A record positioned at the start of its content.
///
/// Reading a `Record` yields the HTTP body if an HTTP response header was
/// recognized, otherwise the raw payload. The reader cannot advance while
/// a record is alive. Dropping it closes it, but only [`close`](Self::close)
/// reports I/O errors.
pub struct Record<'a, F: RecordFormat, R: Read> {
    header: F::Header,
    offset: u64,
    end_offset: Option<u64>,
    diagnostics: Diagnostics,
    body: Body<'a, R>,
    http: Option<HttpHeader>,
    content_length: Option<u64>,
    block_digest: Option<WarcDigest>,
    payload_digest: Option<WarcDigest>,
    block_digest_bytes: Option<Vec<u8>>,
    block_encoding: DigestEncoding,
    payload_encoding: DigestEncoding,
    stats: &'a mut ReaderStats,
    closed: bool,
}

impl<'a, F: RecordFormat, R: Read> Record<'a, F, R> {
    pub(crate) fn open(
        input: RecordInput<'a, R>,
        offset: u64,
        mut header: F::Header,
        mut diagnostics: Diagnostics,
        format: &mut F,
        options: &ReaderOptions,
        stats: &'a mut ReaderStats,
    ) -> Result<Self> {
        stats.records += 1;
        let content_length = F::content_length(&header);
        let block_algorithm = options.block_algorithm_for(F::block_digest(&header));
        let payload_algorithm = options.payload_algorithm_for(F::payload_digest(&header));

        let mut http = None;
        let body = match content_length {
            Some(length) if length > 0 => {
                let capacity = options.payload_header_max_size + PAYLOAD_PUSHBACK_SLACK;
                let mut payload = Payload::new(input, length, block_algorithm, capacity);
                http = format.begin_payload(&mut header, &mut payload, payload_algorithm, options, &mut diagnostics)?;
                if let Some(h) = &http {
                    for warning in h.diagnostics().warnings() {
                        diagnostics.add_warning(warning.clone());
                    }
                }
                Body::Payload(payload)
            }
            _ => Body::Empty(input),
        };
        log::trace!("Record at offset {} with content length {:?}", offset, content_length);

        Ok(Record {
            header,
            offset,
            end_offset: None,
            diagnostics,
            body,
            http,
            content_length,
            block_digest: None,
            payload_digest: None,
            block_digest_bytes: None,
            block_encoding: options.block_digest_encoding,
            payload_encoding: options.payload_digest_encoding,
            stats,
            closed: false,
        })
    }

    pub fn header(&self) -> &F::Header {
        &self.header
    }

    /// Raw value of a header field, looked up case-insensitively.
    pub fn header_field(&self, name: &str) -> Option<&str> {
        F::header_field(&self.header, name)
    }

    /// Offset of the record start in the input file. For compressed input
    /// this is the offset of the GZip member.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Offset just past the record, known once the record is closed.
    pub fn end_offset(&self) -> Option<u64> {
        self.end_offset
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Payload bytes not yet read.
    pub fn remaining(&self) -> u64 {
        match &self.body {
            Body::Payload(p) => p.remaining(),
            _ => 0,
        }
    }

    pub fn http_header(&self) -> Option<&HttpHeader> {
        self.http.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether no errors were found. Checks that need the whole payload
    /// are only complete after [`close`](Self::close).
    pub fn is_compliant(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Block digest computed while reading, available after closing.
    pub fn computed_block_digest(&self) -> Option<&WarcDigest> {
        self.block_digest.as_ref()
    }

    /// Digest of the HTTP body, available after closing.
    pub fn computed_payload_digest(&self) -> Option<&WarcDigest> {
        self.payload_digest.as_ref()
    }

    /// Raw bytes of the computed block digest.
    pub fn computed_block_digest_bytes(&self) -> Option<&[u8]> {
        self.block_digest_bytes.as_deref()
    }

    /// Raw bytes of the computed HTTP body digest.
    pub fn computed_payload_digest_bytes(&self) -> Option<&[u8]> {
        self.http.as_ref().and_then(HttpHeader::computed_digest)
    }

    /// Consume the rest of the record and run the checks that need it.
    ///
    /// Drains the payload, compares computed and declared digests, consumes
    /// the separating newlines and, for compressed input, the GZip trailer.
    /// Calling `close` again does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut input = match mem::replace(&mut self.body, Body::Closed) {
            Body::Payload(mut payload) => {
                if let Some(http) = self.http.as_mut() {
                    let mut buf = [0u8; 8192];
                    loop {
                        let n = payload.read(&mut buf)?;
                        if n == 0 {
                            break;
                        }
                        http.update_body(&buf[..n]);
                    }
                    http.finalize_digest();
                }
                payload.close()?;
                if payload.unavailable() > 0 {
                    self.diagnostics.add_error(Diagnosis::with_value(
                        DiagnosisType::Invalid,
                        "Payload",
                        format!("truncated, {} bytes missing", payload.unavailable()),
                    ));
                }
                if let (Some(algorithm), Some(digest)) = (payload.digest_algorithm(), payload.computed_digest()) {
                    verify_digest(F::block_digest(&self.header), algorithm, digest, "Block digest", &mut self.diagnostics);
                    self.block_digest = Some(WarcDigest::from_bytes(algorithm, digest, self.block_encoding));
                    self.block_digest_bytes = Some(digest.to_vec());
                }
                payload.into_inner()
            }
            Body::Empty(input) => input,
            Body::Closed => return Ok(()),
        };

        if let Some(http) = &self.http {
            if let (Some(algorithm), Some(digest)) = (http.digest_algorithm(), http.computed_digest()) {
                verify_digest(F::payload_digest(&self.header), algorithm, digest, "Payload digest", &mut self.diagnostics);
                self.payload_digest = Some(WarcDigest::from_bytes(algorithm, digest, self.payload_encoding));
            }
        }

        let newlines = parse_new_lines(&mut input)?;
        if newlines != F::TRAILING_NEWLINES {
            self.diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "Trailing newlines",
                format!("{} instead of {}", newlines, F::TRAILING_NEWLINES),
            ));
        }
        input.close_member(&mut self.diagnostics)?;
        self.end_offset = Some(input.end_offset());

        self.stats.errors += self.diagnostics.errors().len() as u64;
        self.stats.warnings += self.diagnostics.warnings().len() as u64;
        if self.diagnostics.has_errors() {
            self.stats.compliant = false;
        }
        Ok(())
    }

    /// Close the record and keep its metadata.
    pub fn into_summary(mut self) -> Result<RecordSummary<F::Header>> {
        self.close()?;
        Ok(RecordSummary {
            offset: self.offset,
            end_offset: self.end_offset.unwrap_or(self.offset),
            header: mem::take(&mut self.header),
            diagnostics: mem::take(&mut self.diagnostics),
            content_length: self.content_length,
            http_status: self.http.as_ref().map(HttpHeader::status_code),
            block_digest: self.block_digest.take(),
            payload_digest: self.payload_digest.take(),
        })
    }
}

/// Compare a declared digest with computed bytes. Declarations using a
/// different algorithm cannot be checked and are skipped.
fn verify_digest(
    declared: Option<&WarcDigest>,
    algorithm: DigestAlgorithm,
    computed: &[u8],
    entity: &str,
    diagnostics: &mut Diagnostics,
) {
    let Some(declared) = declared else {
        return;
    };
    if declared.digest_algorithm() != Some(algorithm) {
        log::debug!("{} declared as {}, computed as {}", entity, declared.algorithm(), algorithm.as_str());
        return;
    }
    match declared.decode(computed.len()) {
        None => diagnostics.add_error(Diagnosis::with_value(
            DiagnosisType::Invalid,
            "Encoding",
            format!("unknown encoding of {} '{}'", entity, declared.value()),
        )),
        Some(decoded) if decoded.bytes.as_deref() == Some(computed) => {}
        Some(_) => diagnostics.add_error(Diagnosis::with_value(
            DiagnosisType::Invalid,
            entity,
            format!("expected {}", declared),
        )),
    }
}

impl<F: RecordFormat, R: Read> Read for Record<'_, F, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Body::Payload(payload) = &mut self.body else {
            return Ok(0);
        };
        let n = payload.read(buf)?;
        if let Some(http) = self.http.as_mut() {
            http.update_body(&buf[..n]);
        }
        Ok(n)
    }
}

impl<F: RecordFormat, R: Read> Drop for Record<'_, F, R> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close record at offset {}: {}", self.offset, e);
        }
    }
}

impl<F: RecordFormat, R: Read> fmt::Debug for Record<'_, F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("offset", &self.offset)
            .field("header", &self.header)
            .field("content_length", &self.content_length)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Metadata of a closed record.
#[derive(Debug, Clone)]
pub struct RecordSummary<H> {
    pub offset: u64,
    pub end_offset: u64,
    pub header: H,
    pub diagnostics: Diagnostics,
    pub content_length: Option<u64>,
    /// Status code of the embedded HTTP response, if any.
    pub http_status: Option<u16>,
    pub block_digest: Option<WarcDigest>,
    pub payload_digest: Option<WarcDigest>,
}

impl<H> RecordSummary<H> {
    pub fn is_compliant(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}
