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

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use url::Url;

use super::{policy, WarcField, WarcRecordType, FIELD_COUNT, WARC_FIELDS_CONTENT_TYPE};
use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::WarcDigest;
use crate::fields::{
    parse_content_type, parse_digest, parse_integer, parse_ip_address, parse_length, parse_string, parse_uri,
    parse_warc_date, ContentType, Parsed,
};
use crate::headers::{CaseInsensitiveKey, HeaderEncoding, HeaderMap};

/// Reason given in `WARC-Truncated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarcTruncated {
    Length,
    Time,
    Disconnect,
    Unspecified,
    /// A reason not defined by the standard.
    Other(String),
}

impl WarcTruncated {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "length" => WarcTruncated::Length,
            "time" => WarcTruncated::Time,
            "disconnect" => WarcTruncated::Disconnect,
            "unspecified" => WarcTruncated::Unspecified,
            _ => WarcTruncated::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WarcTruncated::Length => "length",
            WarcTruncated::Time => "time",
            WarcTruncated::Disconnect => "disconnect",
            WarcTruncated::Unspecified => "unspecified",
            WarcTruncated::Other(s) => s,
        }
    }
}

/// Revisit profile given in `WARC-Profile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarcProfile {
    IdenticalPayloadDigest,
    ServerNotModified,
    Other(String),
}

impl WarcProfile {
    pub fn parse(value: &str) -> Self {
        let value = value.trim_start_matches('<').trim_end_matches('>');
        let known = |suffix: &str| {
            ["http://netpreserve.org/warc/1.0/revisit/", "http://netpreserve.org/warc/1.1/revisit/"]
                .iter()
                .any(|prefix| value.strip_prefix(prefix) == Some(suffix))
        };
        if known("identical-payload-digest") {
            WarcProfile::IdenticalPayloadDigest
        } else if known("server-not-modified") {
            WarcProfile::ServerNotModified
        } else {
            WarcProfile::Other(value.to_string())
        }
    }
}

fn assign<T>(slot: &mut Option<T>, (value, diagnosis): Parsed<T>) -> Option<Diagnosis> {
    *slot = value;
    diagnosis
}

/// Header block of a WARC record.
///
/// Recognized fields are parsed into typed slots, everything else is kept
/// verbatim. All lines are also kept in their original order.
#[derive(Debug, Clone, Default)]
pub struct WarcHeader {
    version_line: String,
    major: i32,
    minor: i32,
    fields: Vec<(String, String)>,
    unknown: Vec<(String, String)>,
    unknown_index: HashMap<CaseInsensitiveKey, usize>,

    record_type: Option<WarcRecordType>,
    record_id: Option<Url>,
    date: Option<DateTime<Utc>>,
    content_length: Option<u64>,
    content_type: Option<ContentType>,
    concurrent_to: Vec<Url>,
    block_digest: Option<WarcDigest>,
    payload_digest: Option<WarcDigest>,
    ip_address: Option<IpAddr>,
    refers_to: Option<Url>,
    target_uri: Option<Url>,
    truncated: Option<WarcTruncated>,
    warcinfo_id: Option<Url>,
    filename: Option<String>,
    profile: Option<WarcProfile>,
    identified_payload_type: Option<ContentType>,
    segment_origin_id: Option<Url>,
    segment_number: Option<i32>,
    segment_total_length: Option<u64>,
}

impl WarcHeader {
    pub(crate) fn new(version_line: String, major: i32, minor: i32) -> Self {
        WarcHeader {
            version_line,
            major,
            minor,
            ..Default::default()
        }
    }

    /// Route one header field to its slot.
    ///
    /// `seen` tracks which recognized fields occurred in this header. The
    /// first occurrence of a non-repeatable field wins.
    pub(crate) fn add_field(
        &mut self,
        name: String,
        value: String,
        seen: &mut [bool; FIELD_COUNT],
        diagnostics: &mut Diagnostics,
    ) {
        self.fields.push((name.clone(), value.clone()));
        let Some(field) = WarcField::from_name(&name) else {
            self.unknown_index.insert(CaseInsensitiveKey::from(name.as_str()), self.unknown.len());
            self.unknown.push((name, value));
            return;
        };
        if seen[field.index()] && !field.is_repeatable() {
            diagnostics.add_error(Diagnosis::with_value(DiagnosisType::Duplicate, field.name(), value));
            return;
        }
        seen[field.index()] = true;
        log::trace!("{}: {}", field, value);

        let n = field.name();
        let diagnosis = match field {
            WarcField::Type => {
                let (value, diagnosis) = parse_string(&value, n);
                self.record_type = value.map(|v| {
                    WarcRecordType::try_from(v.as_str()).unwrap_or_else(|_| {
                        diagnostics.add_warning(Diagnosis::with_value(DiagnosisType::Unknown, n, v.as_str()));
                        WarcRecordType::Unknown
                    })
                });
                diagnosis
            }
            WarcField::RecordId => assign(&mut self.record_id, parse_uri(&value, n)),
            WarcField::Date => assign(&mut self.date, parse_warc_date(&value, n)),
            WarcField::ContentLength => assign(&mut self.content_length, parse_length(&value, n)),
            WarcField::ContentType => assign(&mut self.content_type, parse_content_type(&value, n)),
            WarcField::ConcurrentTo => {
                let (uri, diagnosis) = parse_uri(&value, n);
                self.concurrent_to.extend(uri);
                diagnosis
            }
            WarcField::BlockDigest => assign(&mut self.block_digest, parse_digest(&value, n)),
            WarcField::PayloadDigest => assign(&mut self.payload_digest, parse_digest(&value, n)),
            WarcField::IpAddress => assign(&mut self.ip_address, parse_ip_address(&value, n)),
            WarcField::RefersTo => assign(&mut self.refers_to, parse_uri(&value, n)),
            WarcField::TargetUri => assign(&mut self.target_uri, parse_uri(&value, n)),
            WarcField::Truncated => {
                let (reason, diagnosis) = parse_string(&value, n);
                self.truncated = reason.map(|r| WarcTruncated::parse(&r));
                if let Some(WarcTruncated::Other(r)) = &self.truncated {
                    diagnostics.add_warning(Diagnosis::with_value(DiagnosisType::Unknown, n, r.as_str()));
                }
                diagnosis
            }
            WarcField::WarcinfoId => assign(&mut self.warcinfo_id, parse_uri(&value, n)),
            WarcField::Filename => assign(&mut self.filename, parse_string(&value, n)),
            WarcField::Profile => {
                let (uri, diagnosis) = parse_uri(&value, n);
                self.profile = uri.map(|_| WarcProfile::parse(value.trim()));
                if let Some(WarcProfile::Other(p)) = &self.profile {
                    diagnostics.add_warning(Diagnosis::with_value(DiagnosisType::Unknown, n, p.as_str()));
                }
                diagnosis
            }
            WarcField::IdentifiedPayloadType => {
                assign(&mut self.identified_payload_type, parse_content_type(&value, n))
            }
            WarcField::SegmentOriginId => assign(&mut self.segment_origin_id, parse_uri(&value, n)),
            WarcField::SegmentNumber => assign(&mut self.segment_number, parse_integer(&value, n)),
            WarcField::SegmentTotalLength => assign(&mut self.segment_total_length, parse_length(&value, n)),
        };
        if let Some(d) = diagnosis {
            diagnostics.add_error(d);
        }
    }

    /// Whether `field` holds a successfully parsed value.
    pub fn has_value(&self, field: WarcField) -> bool {
        match field {
            WarcField::Type => self.record_type.is_some(),
            WarcField::RecordId => self.record_id.is_some(),
            WarcField::Date => self.date.is_some(),
            WarcField::ContentLength => self.content_length.is_some(),
            WarcField::ContentType => self.content_type.is_some(),
            WarcField::ConcurrentTo => !self.concurrent_to.is_empty(),
            WarcField::BlockDigest => self.block_digest.is_some(),
            WarcField::PayloadDigest => self.payload_digest.is_some(),
            WarcField::IpAddress => self.ip_address.is_some(),
            WarcField::RefersTo => self.refers_to.is_some(),
            WarcField::TargetUri => self.target_uri.is_some(),
            WarcField::Truncated => self.truncated.is_some(),
            WarcField::WarcinfoId => self.warcinfo_id.is_some(),
            WarcField::Filename => self.filename.is_some(),
            WarcField::Profile => self.profile.is_some(),
            WarcField::IdentifiedPayloadType => self.identified_payload_type.is_some(),
            WarcField::SegmentOriginId => self.segment_origin_id.is_some(),
            WarcField::SegmentNumber => self.segment_number.is_some(),
            WarcField::SegmentTotalLength => self.segment_total_length.is_some(),
        }
    }

    /// Apply the field policy of the record type and the rules that
    /// depend on more than one field.
    pub(crate) fn check_fields(&self, diagnostics: &mut Diagnostics) {
        let record_type = self.record_type.unwrap_or(WarcRecordType::Unknown);
        for field in WarcField::ALL {
            let p = policy(record_type, field);
            let present = self.has_value(field);
            if p.is_required() && !present {
                diagnostics.add_error(Diagnosis::new(DiagnosisType::Wanted, field.name(), None));
            } else if p.is_forbidden() && present {
                diagnostics.add_error(Diagnosis::new(DiagnosisType::Unwanted, field.name(), None));
            }
        }

        if record_type == WarcRecordType::WarcInfo {
            if let Some(ct) = &self.content_type {
                if !ct.is("application", "warc-fields") {
                    diagnostics.add_warning(Diagnosis::with_value(
                        DiagnosisType::Recommended,
                        WarcField::ContentType.name(),
                        WARC_FIELDS_CONTENT_TYPE,
                    ));
                }
            }
        }

        if self.content_length.unwrap_or(0) > 0
            && record_type != WarcRecordType::Continuation
            && self.header_field(WarcField::ContentType.name()).is_none()
        {
            diagnostics.add_warning(Diagnosis::new(
                DiagnosisType::Recommended,
                WarcField::ContentType.name(),
                None,
            ));
        }

        if let Some(n) = self.segment_number {
            let invalid = match record_type {
                WarcRecordType::Response => n != 1,
                WarcRecordType::Continuation => n < 2,
                _ => false,
            };
            if invalid {
                diagnostics.add_error(Diagnosis::with_value(
                    DiagnosisType::Invalid,
                    WarcField::SegmentNumber.name(),
                    n.to_string(),
                ));
            }
        }
    }

    /// The `WARC/x.y` line as found in the file.
    pub fn version_line(&self) -> &str {
        &self.version_line
    }

    /// `(major, minor)`, components that are not numbers are `-1`.
    pub fn version(&self) -> (i32, i32) {
        (self.major, self.minor)
    }

    /// Raw value of a field by case-insensitive name.
    ///
    /// For recognized fields this is the first occurrence, for other fields
    /// the last one.
    pub fn header_field(&self, name: &str) -> Option<&str> {
        if WarcField::from_name(name).is_some() {
            return self
                .fields
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str());
        }
        self.unknown_field(name)
    }

    /// All header lines in file order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Fields without a typed slot, in file order.
    pub fn unknown_fields(&self) -> &[(String, String)] {
        &self.unknown
    }

    pub fn unknown_field(&self, name: &str) -> Option<&str> {
        let i = *self.unknown_index.get(&CaseInsensitiveKey::from(name))?;
        self.unknown.get(i).map(|(_, v)| v.as_str())
    }

    /// Header block as a [`HeaderMap`], e.g. for writing it back out.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new(HeaderEncoding::Unicode);
        map.set_status_line(&self.version_line);
        for (name, value) in &self.fields {
            map.append(name, value);
        }
        map
    }

    pub fn record_type(&self) -> Option<WarcRecordType> {
        self.record_type
    }

    pub fn record_id(&self) -> Option<&Url> {
        self.record_id.as_ref()
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    pub fn concurrent_to(&self) -> &[Url] {
        &self.concurrent_to
    }

    pub fn block_digest(&self) -> Option<&WarcDigest> {
        self.block_digest.as_ref()
    }

    pub fn payload_digest(&self) -> Option<&WarcDigest> {
        self.payload_digest.as_ref()
    }

    pub fn ip_address(&self) -> Option<IpAddr> {
        self.ip_address
    }

    pub fn refers_to(&self) -> Option<&Url> {
        self.refers_to.as_ref()
    }

    pub fn target_uri(&self) -> Option<&Url> {
        self.target_uri.as_ref()
    }

    pub fn truncated(&self) -> Option<&WarcTruncated> {
        self.truncated.as_ref()
    }

    pub fn warcinfo_id(&self) -> Option<&Url> {
        self.warcinfo_id.as_ref()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn profile(&self) -> Option<&WarcProfile> {
        self.profile.as_ref()
    }

    pub fn identified_payload_type(&self) -> Option<&ContentType> {
        self.identified_payload_type.as_ref()
    }

    pub fn segment_origin_id(&self) -> Option<&Url> {
        self.segment_origin_id.as_ref()
    }

    pub fn segment_number(&self) -> Option<i32> {
        self.segment_number
    }

    pub fn segment_total_length(&self) -> Option<u64> {
        self.segment_total_length
    }

    /// Whether the block is an HTTP response (`application/http; msgtype=response`).
    pub fn is_http_response(&self) -> bool {
        self.content_type.as_ref().is_some_and(|ct| {
            ct.is("application", "http")
                && ct.parameter("msgtype").is_some_and(|t| t.eq_ignore_ascii_case("response"))
        })
    }
}

impl fmt::Display for WarcHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.version_line)?;
        for (name, value) in &self.fields {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(fields: &[(&str, &str)]) -> (WarcHeader, Diagnostics) {
        let mut h = WarcHeader::new("WARC/1.1".to_string(), 1, 1);
        let mut seen = [false; FIELD_COUNT];
        let mut d = Diagnostics::new();
        for (n, v) in fields {
            h.add_field(n.to_string(), v.to_string(), &mut seen, &mut d);
        }
        h.check_fields(&mut d);
        (h, d)
    }

    const BASE: [(&str, &str); 3] = [
        ("WARC-Record-ID", "<urn:uuid:12345678-1234-1234-1234-123456789abc>"),
        ("WARC-Date", "2024-01-02T03:04:05Z"),
        ("Content-Length", "0"),
    ];

    #[test]
    fn test_typed_slots() {
        let mut fields = BASE.to_vec();
        fields.extend([
            ("WARC-Type", "response"),
            ("WARC-Target-URI", "https://example.com/"),
            ("WARC-IP-Address", "192.0.2.1"),
            ("Content-Type", "application/http; msgtype=response"),
            ("WARC-Concurrent-To", "<urn:uuid:a>"),
            ("WARC-Concurrent-To", "<urn:uuid:b>"),
            ("X-Custom", "1"),
            ("x-custom", "2"),
        ]);
        let (h, d) = header(&fields);
        assert!(d.is_empty(), "{:?}", d);
        assert_eq!(h.record_type(), Some(WarcRecordType::Response));
        assert_eq!(h.content_length(), Some(0));
        assert_eq!(h.concurrent_to().len(), 2);
        assert_eq!(h.ip_address().map(|ip| ip.to_string()).as_deref(), Some("192.0.2.1"));
        assert!(h.is_http_response());
        assert_eq!(h.unknown_fields().len(), 2);
        assert_eq!(h.header_field("X-CUSTOM"), Some("2"));
        assert_eq!(h.header_field("warc-type"), Some("response"));
        assert_eq!(h.fields().len(), 11);
    }

    #[test]
    fn test_duplicates_first_wins() {
        let mut fields = BASE.to_vec();
        fields.extend([
            ("WARC-Type", "resource"),
            ("WARC-Target-URI", "http://a.example/"),
            ("WARC-Type", "metadata"),
            ("WARC-Target-URI", "http://b.example/"),
            ("Content-Length", "5"),
        ]);
        let (h, d) = header(&fields);
        assert_eq!(d.errors().iter().filter(|e| e.kind() == DiagnosisType::Duplicate).count(), 3);
        assert_eq!(h.record_type(), Some(WarcRecordType::Resource));
        assert_eq!(h.target_uri().map(Url::as_str), Some("http://a.example/"));
        assert_eq!(h.content_length(), Some(0));
        assert_eq!(h.header_field("WARC-Type"), Some("resource"));
    }

    #[test]
    fn test_missing_mandatory_fields() {
        let (_, d) = header(&[("WARC-Type", "warcinfo"), ("Content-Length", "0000000000000000000")]);
        assert_eq!(d.count(DiagnosisType::Wanted, "WARC-Record-ID"), 1);
        assert_eq!(d.count(DiagnosisType::Wanted, "WARC-Date"), 1);
        assert_eq!(d.count(DiagnosisType::Wanted, "Content-Length"), 0);
        assert_eq!(d.errors().len(), 2);
    }

    #[test]
    fn test_unknown_type_uses_mandatory_fields_only() {
        let mut fields = BASE.to_vec();
        fields.extend([("WARC-Type", "bogus"), ("WARC-Filename", "x.warc")]);
        let (h, d) = header(&fields);
        assert_eq!(h.record_type(), Some(WarcRecordType::Unknown));
        assert!(!d.has_errors());
        assert_eq!(d.count(DiagnosisType::Unknown, "WARC-Type"), 1);
    }

    #[test]
    fn test_unwanted_field() {
        let mut fields = BASE.to_vec();
        fields.extend([
            ("WARC-Type", "warcinfo"),
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Warcinfo-ID", "<urn:uuid:x>"),
        ]);
        let (_, d) = header(&fields);
        assert_eq!(d.count(DiagnosisType::Unwanted, "WARC-Target-URI"), 1);
        assert_eq!(d.count(DiagnosisType::Unwanted, "WARC-Warcinfo-ID"), 1);
    }

    #[test]
    fn test_segment_rules() {
        let continuation = |n: &str| {
            let mut fields = BASE.to_vec();
            fields.extend([
                ("WARC-Type", "continuation"),
                ("WARC-Target-URI", "http://example.com/"),
                ("WARC-Segment-Origin-ID", "<urn:uuid:origin>"),
                ("WARC-Segment-Number", n),
            ]);
            header(&fields).1
        };
        let d = continuation("1");
        assert_eq!(d.count(DiagnosisType::Invalid, "WARC-Segment-Number"), 1);
        assert_eq!(d.errors().len(), 1);

        let d = continuation("2");
        assert!(d.is_empty(), "{:?}", d);

        let mut fields = BASE.to_vec();
        fields.extend([
            ("WARC-Type", "response"),
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Segment-Number", "3"),
        ]);
        let (_, d) = header(&fields);
        assert_eq!(d.count(DiagnosisType::Invalid, "WARC-Segment-Number"), 1);
    }

    #[test]
    fn test_content_type_recommendations() {
        let mut fields = vec![
            ("WARC-Record-ID", "<urn:uuid:1>"),
            ("WARC-Date", "2024-01-02T03:04:05Z"),
            ("Content-Length", "10"),
            ("WARC-Type", "warcinfo"),
            ("Content-Type", "text/plain"),
        ];
        let (_, d) = header(&fields);
        assert!(!d.has_errors());
        assert_eq!(d.warnings().len(), 1);
        assert_eq!(d.warnings()[0].kind(), DiagnosisType::Recommended);

        fields.pop();
        let (_, d) = header(&fields);
        assert_eq!(d.count(DiagnosisType::Recommended, "Content-Type"), 1);
    }

    #[test]
    fn test_truncated_and_profile() {
        let mut fields = BASE.to_vec();
        fields.extend([
            ("WARC-Type", "revisit"),
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Profile", "http://netpreserve.org/warc/1.1/revisit/server-not-modified"),
            ("WARC-Truncated", "length"),
        ]);
        let (h, d) = header(&fields);
        assert!(d.is_empty(), "{:?}", d);
        assert_eq!(h.profile(), Some(&WarcProfile::ServerNotModified));
        assert_eq!(h.truncated(), Some(&WarcTruncated::Length));

        let mut fields = BASE.to_vec();
        fields.extend([
            ("WARC-Type", "revisit"),
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Profile", "http://example.com/profile"),
            ("WARC-Truncated", "tired"),
        ]);
        let (h, d) = header(&fields);
        assert!(!d.has_errors());
        assert_eq!(d.count(DiagnosisType::Unknown, "WARC-Profile"), 1);
        assert_eq!(d.count(DiagnosisType::Unknown, "WARC-Truncated"), 1);
        assert_eq!(h.truncated().map(WarcTruncated::as_str), Some("tired"));
    }

    #[test]
    fn test_invalid_values() {
        let mut fields = BASE.to_vec();
        fields.extend([("WARC-Type", "resource"), ("WARC-Target-URI", "not a uri"), ("WARC-Date", "")]);
        let (h, d) = header(&fields);
        assert_eq!(d.count(DiagnosisType::Invalid, "WARC-Target-URI"), 1);
        assert_eq!(d.count(DiagnosisType::Wanted, "WARC-Target-URI"), 1);
        assert_eq!(d.count(DiagnosisType::Duplicate, "WARC-Date"), 1);
        assert!(h.date().is_some());
    }
}
