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

use super::{ArcHeader, ArcLayout, ArcRecordKind, ArcVersion, ArcVersionHeader, FILEDESC_SCHEME, VERSION_BLOCK_CONTENT_TYPE};
use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::DigestAlgorithm;
use crate::engine::{ReaderOptions, RecordFormat};
use crate::http::HttpHeader;
use crate::payload::Payload;
use crate::stream::{decode_latin1, PushbackRead};
use crate::Result;

/// Record syntax of ARC files.
///
/// Remembers the version block of the file, which decides how the
/// record lines after it are split.
#[derive(Debug, Default, Clone)]
pub struct ArcFormat {
    version_header: Option<ArcVersionHeader>,
    records: u64,
}

impl ArcFormat {
    /// Version block payload of the current file, once read.
    pub fn version_header(&self) -> Option<&ArcVersionHeader> {
        self.version_header.as_ref()
    }

    /// Record line layout announced by the version block.
    pub fn layout(&self) -> Option<ArcLayout> {
        self.version_header.as_ref().map(ArcVersionHeader::layout)
    }

    fn layout_for(&self, column_count: usize) -> ArcLayout {
        self.layout()
            .or_else(|| ArcLayout::from_field_count(column_count))
            .unwrap_or_default()
    }
}

impl RecordFormat for ArcFormat {
    type Header = ArcHeader;

    const TRAILING_NEWLINES: usize = 1;

    fn parse_header<S: PushbackRead + ?Sized>(
        &mut self,
        stream: &mut S,
        options: &ReaderOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<(u64, ArcHeader)>> {
        let mut empty = 0;
        let (offset, line) = loop {
            let offset = stream.consumed();
            let Some(line) = stream.read_line_bytes()? else {
                if empty > 0 {
                    diagnostics.add_error(Diagnosis::with_value(
                        DiagnosisType::Invalid,
                        "Empty lines",
                        format!("{} at end of file", empty),
                    ));
                }
                return Ok(None);
            };
            if !line.is_empty() {
                break (offset, decode_latin1(&line));
            }
            empty += 1;
        };
        if empty > 0 {
            diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "Empty lines",
                format!("{} before record", empty),
            ));
        }
        log::debug!("ARC record at offset {}", offset);

        let columns = line.split(' ').count();
        let header = if line.starts_with(FILEDESC_SCHEME) {
            let layout = ArcLayout::from_field_count(columns).unwrap_or_default();
            let header = ArcHeader::parse(&line, layout, ArcRecordKind::VersionBlock, diagnostics);
            let content_type = header.field("Content-type").unwrap_or_default();
            if !content_type.eq_ignore_ascii_case(VERSION_BLOCK_CONTENT_TYPE) {
                diagnostics.add_error(Diagnosis::with_value(DiagnosisType::Invalid, "Content-type", content_type));
            }
            header
        } else {
            if self.records == 0 && options.start_offset == 0 {
                diagnostics.add_error(Diagnosis::with_value(
                    DiagnosisType::Invalid,
                    "ARC file",
                    "Invalid file magic number",
                ));
            }
            ArcHeader::parse(&line, self.layout_for(columns), ArcRecordKind::Record, diagnostics)
        };

        let size = stream.consumed() - offset;
        if size > options.record_header_max_size as u64 {
            diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "Header",
                format!("{} bytes exceed limit of {}", size, options.record_header_max_size),
            ));
        }
        self.records += 1;
        Ok(Some((offset, header)))
    }

    fn content_length(header: &ArcHeader) -> Option<u64> {
        header.archive_length()
    }

    fn begin_payload<S: Read>(
        &mut self,
        header: &mut ArcHeader,
        payload: &mut Payload<S>,
        http_digest: Option<DigestAlgorithm>,
        options: &ReaderOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<HttpHeader>> {
        if header.kind() == ArcRecordKind::VersionBlock {
            let version_header = ArcVersionHeader::parse(payload, diagnostics)?;
            if version_header.version() == Some(ArcVersion::V1_1) && payload.remaining() == 0 {
                diagnostics.add_error(Diagnosis::with_value(
                    DiagnosisType::Invalid,
                    "Version block",
                    "missing XML metadata",
                ));
            }
            self.version_header = Some(version_header.clone());
            header.set_version_header(version_header);
            return Ok(None);
        }
        if !header.is_http() {
            return Ok(None);
        }
        HttpHeader::sniff(payload, options.payload_header_max_size, http_digest)
    }

    fn header_field<'h>(header: &'h ArcHeader, name: &str) -> Option<&'h str> {
        header.field(name)
    }
}
