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
use std::net::IpAddr;

use chrono::NaiveDateTime;
use url::Url;

use super::{starts_with_scheme, ArcLayout, ArcVersion, NO_TYPE};
use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::fields::{
    parse_arc_date, parse_content_type, parse_integer, parse_ip_address, parse_length, parse_long, parse_string,
    parse_uri, ContentType, Parsed,
};
use crate::stream::PushbackRead;
use crate::Result;

/// Whether a record line belongs to the version block or an ordinary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArcRecordKind {
    VersionBlock,
    #[default]
    Record,
}

/// Record line of an ARC record.
#[derive(Debug, Clone, Default)]
pub struct ArcHeader {
    kind: ArcRecordKind,
    layout: ArcLayout,
    fields: Vec<(&'static str, String)>,
    url: Option<Url>,
    ip_address: Option<IpAddr>,
    archive_date: Option<NaiveDateTime>,
    content_type: Option<ContentType>,
    result_code: Option<i32>,
    checksum: Option<String>,
    location: Option<String>,
    offset: Option<i64>,
    filename: Option<String>,
    archive_length: Option<u64>,
    version_header: Option<ArcVersionHeader>,
}

fn store<T>(slot: &mut Option<T>, (value, diagnosis): Parsed<T>, diagnostics: &mut Diagnostics) {
    *slot = value;
    if let Some(d) = diagnosis {
        diagnostics.add_error(d);
    }
}

/// `-` stands for an absent value in optional columns.
fn optional(value: &str) -> Option<&str> {
    (value != "-").then_some(value)
}

impl ArcHeader {
    /// Parse a record line laid out as `layout`.
    ///
    /// If the column count does not match, the first column is taken as the
    /// URL, the last one as the length and the others by position.
    pub fn parse(line: &str, layout: ArcLayout, kind: ArcRecordKind, diagnostics: &mut Diagnostics) -> Self {
        let names = layout.field_names();
        let values: Vec<&str> = line.split(' ').collect();
        if values.len() != names.len() {
            diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "ARC record",
                format!("{} fields instead of {}", values.len(), names.len()),
            ));
        }

        let mut header = ArcHeader {
            kind,
            layout,
            ..Default::default()
        };
        let last = names.len() - 1;
        for (i, &name) in names.iter().enumerate() {
            let value = if values.len() == names.len() || (i < last && (i == 0 || i + 1 < values.len())) {
                values.get(i)
            } else if i == last && values.len() > 1 {
                values.last()
            } else {
                None
            };
            if let Some(value) = value {
                header.set_field(name, value, diagnostics);
            }
        }
        header
    }

    /// Build a version 1 record line.
    pub fn new(url: &str, ip_address: &str, archive_date: NaiveDateTime, content_type: &str, length: u64) -> Self {
        let line = format!(
            "{} {} {} {} {}",
            url,
            ip_address,
            archive_date.format("%Y%m%d%H%M%S"),
            content_type,
            length
        );
        Self::parse(&line, ArcLayout::V1, ArcRecordKind::Record, &mut Diagnostics::new())
    }

    fn set_field(&mut self, name: &'static str, value: &str, diagnostics: &mut Diagnostics) {
        log::trace!("{}: {}", name, value);
        self.fields.push((name, value.to_string()));
        match name {
            "URL" => {
                if !starts_with_scheme(value) {
                    diagnostics.add_error(Diagnosis::with_value(DiagnosisType::Invalid, name, value));
                    return;
                }
                store(&mut self.url, parse_uri(value, name), diagnostics);
            }
            "IP-address" => store(&mut self.ip_address, parse_ip_address(value, name), diagnostics),
            "Archive-date" => store(&mut self.archive_date, parse_arc_date(value, name), diagnostics),
            "Content-type" => {
                if !value.eq_ignore_ascii_case(NO_TYPE) {
                    store(&mut self.content_type, parse_content_type(value, name), diagnostics);
                }
            }
            "Result-code" => {
                if let Some(v) = optional(value) {
                    store(&mut self.result_code, parse_integer(v, name), diagnostics);
                }
            }
            "Checksum" => {
                if let Some(v) = optional(value) {
                    store(&mut self.checksum, parse_string(v, name), diagnostics);
                }
            }
            "Location" => {
                if let Some(v) = optional(value) {
                    store(&mut self.location, parse_string(v, name), diagnostics);
                }
            }
            "Offset" => {
                if let Some(v) = optional(value) {
                    store(&mut self.offset, parse_long(v, name), diagnostics);
                }
            }
            "Filename" => {
                if let Some(v) = optional(value) {
                    store(&mut self.filename, parse_string(v, name), diagnostics);
                }
            }
            "Archive-length" => store(&mut self.archive_length, parse_length(value, name), diagnostics),
            _ => {}
        }
    }

    /// Line as written to a file, without the terminating newline. Missing
    /// columns are written as `-`.
    pub fn record_line(&self) -> String {
        self.layout
            .field_names()
            .iter()
            .map(|name| self.field(name).unwrap_or("-"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replace the `Archive-length` column.
    pub fn set_archive_length(&mut self, length: u64) {
        let value = length.to_string();
        match self.fields.iter_mut().find(|(n, _)| *n == "Archive-length") {
            Some((_, v)) => *v = value,
            None => self.fields.push(("Archive-length", value)),
        }
        self.archive_length = Some(length);
    }

    /// Raw column value by case-insensitive name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Columns in file order.
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn kind(&self) -> ArcRecordKind {
        self.kind
    }

    pub fn layout(&self) -> ArcLayout {
        self.layout
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn ip_address(&self) -> Option<IpAddr> {
        self.ip_address
    }

    pub fn archive_date(&self) -> Option<NaiveDateTime> {
        self.archive_date
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    pub fn result_code(&self) -> Option<i32> {
        self.result_code
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn archive_length(&self) -> Option<u64> {
        self.archive_length
    }

    /// Version information, for version blocks.
    pub fn version_header(&self) -> Option<&ArcVersionHeader> {
        self.version_header.as_ref()
    }

    pub(crate) fn set_version_header(&mut self, version_header: ArcVersionHeader) {
        self.version_header = Some(version_header);
    }

    /// Whether the URL scheme is `http` or `https`.
    pub fn is_http(&self) -> bool {
        self.url.as_ref().is_some_and(|u| matches!(u.scheme(), "http" | "https"))
    }
}

impl fmt::Display for ArcHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.record_line())
    }
}

/// First two payload lines of a version block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArcVersionHeader {
    version_line: String,
    block_description: String,
    version_number: Option<i32>,
    reserved: Option<i32>,
    origin_code: Option<String>,
    version: Option<ArcVersion>,
    layout: ArcLayout,
    valid: bool,
}

impl ArcVersionHeader {
    /// Read the version and block description lines from a version block
    /// payload. An unknown block description selects the version 1 layout.
    pub fn parse<S: PushbackRead + ?Sized>(stream: &mut S, diagnostics: &mut Diagnostics) -> Result<Self> {
        let version_line = stream.read_line()?.unwrap_or_default();
        let block_line = stream.read_line()?;
        let mut header = ArcVersionHeader {
            version_line,
            ..Default::default()
        };

        if header.version_line.is_empty() {
            diagnostics.add_error(Diagnosis::new(DiagnosisType::Empty, "Version line", None));
        } else {
            let parts: Vec<&str> = header.version_line.split(' ').collect();
            if parts.len() != 3 {
                diagnostics.add_error(Diagnosis::with_value(
                    DiagnosisType::Invalid,
                    "Version line",
                    header.version_line.as_str(),
                ));
            }
            if let Some(v) = parts.first() {
                store(&mut header.version_number, parse_integer(v, "Version number"), diagnostics);
            }
            if let Some(v) = parts.get(1) {
                store(&mut header.reserved, parse_integer(v, "Reserved"), diagnostics);
            }
            if let Some(v) = parts.get(2) {
                store(&mut header.origin_code, parse_string(v, "Origin code"), diagnostics);
            }
            if let (Some(n), Some(r)) = (header.version_number, header.reserved) {
                header.version = ArcVersion::from_values(n, r);
            }
            if header.version.is_none() {
                diagnostics.add_error(Diagnosis::with_value(
                    DiagnosisType::Invalid,
                    "ARC version",
                    header.version_line.as_str(),
                ));
            }
        }

        let described = block_line.as_deref().and_then(ArcLayout::from_block_description);
        header.block_description = block_line.unwrap_or_default();
        header.layout = described.unwrap_or(ArcLayout::V1);
        if described.is_none() {
            diagnostics.add_error(Diagnosis::with_value(
                DiagnosisType::Invalid,
                "Block description",
                header.block_description.as_str(),
            ));
        }

        header.valid = match (header.version, described) {
            (Some(version), Some(layout)) => {
                let matching = version.layout() == layout;
                if !matching {
                    diagnostics.add_error(Diagnosis::with_value(
                        DiagnosisType::Invalid,
                        "ARC version",
                        format!("version {} does not match block description", version),
                    ));
                }
                matching
            }
            _ => false,
        };
        Ok(header)
    }

    pub fn version_line(&self) -> &str {
        &self.version_line
    }

    pub fn block_description(&self) -> &str {
        &self.block_description
    }

    pub fn version_number(&self) -> Option<i32> {
        self.version_number
    }

    pub fn reserved(&self) -> Option<i32> {
        self.reserved
    }

    pub fn origin_code(&self) -> Option<&str> {
        self.origin_code.as_deref()
    }

    pub fn version(&self) -> Option<ArcVersion> {
        self.version
    }

    /// Layout of the following record lines.
    pub fn layout(&self) -> ArcLayout {
        self.layout
    }

    /// Whether version and block description are known and agree.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
