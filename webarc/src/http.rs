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

//! Sniffing of HTTP response headers embedded in record payloads.

use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::{DigestAlgorithm, DigestEngine};
use crate::error::Result;
use crate::fields::ContentType;
use crate::headers::{HeaderEncoding, HeaderMap};
use crate::stream::PushbackRead;

/// HTTP response header found at the start of a payload.
///
/// The payload bytes after the header form the HTTP body. A separate digest
/// over the body is kept here.
#[derive(Debug)]
pub struct HttpHeader {
    headers: HeaderMap,
    status_code: u16,
    content_type: Option<ContentType>,
    header_length: u64,
    diagnostics: Diagnostics,
    algorithm: Option<DigestAlgorithm>,
    digest: Option<DigestEngine>,
    computed_digest: Option<Vec<u8>>,
    body_length: u64,
}

fn valid_status_line(line: &[u8]) -> Option<u16> {
    let mut parts = line.splitn(3, |&b| b == b' ');
    let protocol = parts.next()?;
    if protocol.len() < 5 || !protocol[..5].eq_ignore_ascii_case(b"HTTP/") {
        return None;
    }
    let code = parts.next()?;
    if code.is_empty() || !code.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let code: u16 = std::str::from_utf8(code).ok()?.parse().ok()?;
    (100..=999).contains(&code).then_some(code)
}

impl HttpHeader {
    /// Try to parse an HTTP response header from the start of `stream`.
    ///
    /// At most `max_size` bytes are examined. If no valid header is found
    /// within that limit all examined bytes are pushed back and `None` is
    /// returned, so `stream` must be able to take back `max_size + 1` bytes.
    ///
    /// # Arguments
    ///
    /// * `stream` - Payload positioned at its first byte
    /// * `max_size` - Maximum header size
    /// * `digest` - Algorithm for the body digest
    pub fn sniff<S: PushbackRead + ?Sized>(
        stream: &mut S,
        max_size: usize,
        digest: Option<DigestAlgorithm>,
    ) -> Result<Option<Self>> {
        let start = stream.consumed();
        let mut raw: Vec<u8> = Vec::new();
        let mut lines: Vec<Vec<u8>> = Vec::new();
        let mut bare_lf = 0usize;
        let mut bare_cr = 0usize;

        let complete = 'header: loop {
            let mut line = Vec::new();
            loop {
                if raw.len() >= max_size {
                    break 'header false;
                }
                let Some(b) = stream.read_byte()? else {
                    break 'header false;
                };
                raw.push(b);
                match b {
                    b'\n' => {
                        bare_lf += 1;
                        break;
                    }
                    b'\r' => match stream.read_byte()? {
                        Some(b'\n') => {
                            raw.push(b'\n');
                            break;
                        }
                        Some(other) => {
                            stream.unread(&[other])?;
                            bare_cr += 1;
                            break;
                        }
                        None => {
                            bare_cr += 1;
                            break;
                        }
                    },
                    _ => line.push(b),
                }
            }
            if lines.is_empty() && valid_status_line(&line).is_none() {
                break 'header false;
            }
            if line.is_empty() {
                break 'header true;
            }
            lines.push(line);
        };

        if !complete {
            log::trace!("No HTTP response header at payload offset {}", start);
            stream.unread(&raw)?;
            return Ok(None);
        }

        let mut headers = HeaderMap::new(HeaderEncoding::Latin1);
        let mut diagnostics = Diagnostics::new();
        let mut lines = lines.into_iter();
        let status_line = lines.next().unwrap_or_default();
        let status_code = valid_status_line(&status_line).unwrap_or_default();
        headers.set_status_line(&status_line);
        for line in lines {
            if line.first().is_some_and(|b| *b == b' ' || *b == b'\t') {
                headers.add_continuation(&line);
            } else if let Some(colon) = line.iter().position(|&b| b == b':') {
                headers.append_bytes(&line[..colon], &line[colon + 1..]);
            } else {
                diagnostics.add_warning(Diagnosis::with_value(
                    DiagnosisType::Invalid,
                    "HTTP header line",
                    String::from_utf8_lossy(&line).into_owned(),
                ));
            }
        }
        if bare_lf > 0 {
            diagnostics.add_warning(Diagnosis::with_value(
                DiagnosisType::Recommended,
                "HTTP line endings",
                format!("CRLF instead of {} bare LF", bare_lf),
            ));
        }
        if bare_cr > 0 {
            diagnostics.add_warning(Diagnosis::with_value(
                DiagnosisType::Recommended,
                "HTTP line endings",
                format!("CRLF instead of {} bare CR", bare_cr),
            ));
        }

        let content_type = headers.get("content-type").and_then(|v| ContentType::parse(&v));
        Ok(Some(HttpHeader {
            headers,
            status_code,
            content_type,
            header_length: raw.len() as u64,
            diagnostics,
            algorithm: digest,
            digest: digest.map(DigestEngine::new),
            computed_digest: None,
            body_length: 0,
        }))
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn protocol(&self) -> Option<String> {
        self.headers.protocol()
    }

    pub fn reason_phrase(&self) -> Option<String> {
        self.headers.reason_phrase()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Parsed `Content-Type` of the HTTP body.
    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    /// Size of the header block in bytes, including the blank line.
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    /// Body bytes seen so far.
    pub fn body_length(&self) -> u64 {
        self.body_length
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether non-standard line endings or malformed lines were found.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.has_warnings()
    }

    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.algorithm
    }

    /// Digest over the body, available once the record is closed.
    pub fn computed_digest(&self) -> Option<&[u8]> {
        self.computed_digest.as_deref()
    }

    pub(crate) fn update_body(&mut self, data: &[u8]) {
        self.body_length += data.len() as u64;
        if let Some(d) = self.digest.as_mut() {
            d.update(data);
        }
    }

    pub(crate) fn finalize_digest(&mut self) {
        if let Some(d) = self.digest.take() {
            self.computed_digest = Some(d.finalize());
        }
    }
}
