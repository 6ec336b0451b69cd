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

use std::io::Read;

use super::{WarcHeader, FIELD_COUNT, KNOWN_VERSIONS, MAGIC};
use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::{DigestAlgorithm, WarcDigest};
use crate::engine::{ReaderOptions, RecordFormat};
use crate::header_line::{HeaderLine, HeaderLineReader};
use crate::http::HttpHeader;
use crate::payload::Payload;
use crate::stream::{decode_latin1, PushbackRead};
use crate::Result;

/// Record syntax of WARC files.
#[derive(Debug, Default, Clone)]
pub struct WarcFormat;

/// Split the part after `WARC/` into `(major, minor)`. Between two and
/// four dotted components are allowed, non-numeric ones become `-1`.
fn parse_version(version: &str) -> Option<(i32, i32)> {
    let parts: Vec<i32> = version
        .trim()
        .split('.')
        .map(|p| if p.bytes().all(|b| b.is_ascii_digit()) { p.parse().unwrap_or(-1) } else { -1 })
        .collect();
    if !(2..=4).contains(&parts.len()) {
        return None;
    }
    Some((parts[0], parts[1]))
}

/// Report lines skipped while looking for a record start.
fn report_skipped(garbage: usize, empty: usize, diagnostics: &mut Diagnostics) {
    if garbage > 0 {
        diagnostics.add_error(Diagnosis::with_value(
            DiagnosisType::UndesiredData,
            "Data",
            format!("{} lines before record", garbage),
        ));
    }
    if empty > 0 {
        diagnostics.add_error(Diagnosis::with_value(
            DiagnosisType::Invalid,
            "Empty lines",
            format!("{} before record", empty),
        ));
    }
}

impl RecordFormat for WarcFormat {
    type Header = WarcHeader;

    const TRAILING_NEWLINES: usize = 2;

    fn parse_header<S: PushbackRead + ?Sized>(
        &mut self,
        stream: &mut S,
        options: &ReaderOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<(u64, WarcHeader)>> {
        let mut garbage = 0;
        let mut empty = 0;
        let (offset, line) = loop {
            let offset = stream.consumed();
            let Some(line) = stream.read_line_bytes()? else {
                report_skipped(garbage, empty, diagnostics);
                return Ok(None);
            };
            if line.starts_with(MAGIC.as_bytes()) {
                break (offset, decode_latin1(&line));
            }
            if line.is_empty() {
                empty += 1;
            } else {
                garbage += 1;
            }
        };
        report_skipped(garbage, empty, diagnostics);

        let (major, minor) = match parse_version(&line[MAGIC.len()..]) {
            Some((major, minor)) if major >= 0 && minor >= 0 => {
                if !KNOWN_VERSIONS.contains(&(major, minor)) {
                    diagnostics.add_warning(Diagnosis::with_value(DiagnosisType::Unknown, "WARC version", line.as_str()));
                }
                (major, minor)
            }
            parsed => {
                diagnostics.add_error(Diagnosis::with_value(DiagnosisType::Invalid, "WARC version", line.as_str()));
                parsed.unwrap_or((-1, -1))
            }
        };
        log::debug!("WARC record at offset {} ({})", offset, line);

        let mut header = WarcHeader::new(line, major, minor);
        let mut seen = [false; FIELD_COUNT];
        let mut lines = HeaderLineReader::new();
        loop {
            match lines.read_line(stream)? {
                None => {
                    diagnostics.add_error(Diagnosis::with_value(
                        DiagnosisType::Invalid,
                        "Header",
                        "unexpected end of stream",
                    ));
                    break;
                }
                Some(line) if line.is_blank() => break,
                Some(HeaderLine::Line(l)) => {
                    diagnostics.add_error(Diagnosis::with_value(DiagnosisType::Invalid, "Header line", l));
                }
                Some(HeaderLine::Field { name, value }) => header.add_field(name, value, &mut seen, diagnostics),
            }
        }

        let size = stream.consumed() - offset;
        if size > options.record_header_max_size as u64 {
            diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "Header",
                format!("{} bytes exceed limit of {}", size, options.record_header_max_size),
            ));
        }
        if lines.bare_lf_count() > 0 {
            diagnostics.add_warning(Diagnosis::with_value(
                DiagnosisType::Recommended,
                "Line endings",
                format!("CRLF instead of {} bare LF", lines.bare_lf_count()),
            ));
        }
        header.check_fields(diagnostics);
        Ok(Some((offset, header)))
    }

    fn content_length(header: &WarcHeader) -> Option<u64> {
        header.content_length()
    }

    fn block_digest(header: &WarcHeader) -> Option<&WarcDigest> {
        header.block_digest()
    }

    fn payload_digest(header: &WarcHeader) -> Option<&WarcDigest> {
        header.payload_digest()
    }

    fn begin_payload<S: Read>(
        &mut self,
        header: &mut WarcHeader,
        payload: &mut Payload<S>,
        http_digest: Option<DigestAlgorithm>,
        options: &ReaderOptions,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Option<HttpHeader>> {
        if !header.is_http_response() {
            return Ok(None);
        }
        HttpHeader::sniff(payload, options.payload_header_max_size, http_digest)
    }

    fn header_field<'h>(header: &'h WarcHeader, name: &str) -> Option<&'h str> {
        header.header_field(name)
    }
}
