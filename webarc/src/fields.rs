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

//! Parsers turning raw header values into typed values.
//!
//! All parsers share the same shape: they never fail, but return the typed
//! value if there is one and at most one [`Diagnosis`] describing what was
//! wrong with the input. Callers decide which [`Diagnostics`](crate::Diagnostics)
//! list the diagnosis goes to.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use url::Url;

use crate::diagnostics::{Diagnosis, DiagnosisType};
use crate::digest::WarcDigest;

/// Parsed value plus optional diagnosis.
pub type Parsed<T> = (Option<T>, Option<Diagnosis>);

fn empty<T>(field: &str) -> Parsed<T> {
    (None, Some(Diagnosis::new(DiagnosisType::Empty, field, None)))
}

fn invalid<T>(field: &str, value: &str) -> Parsed<T> {
    (None, Some(Diagnosis::with_value(DiagnosisType::Invalid, field, value)))
}

fn parse_decimal<T: std::str::FromStr>(value: &str, field: &str) -> Parsed<T> {
    let value = value.trim();
    if value.is_empty() {
        return empty(field);
    }
    if value.starts_with('+') {
        return invalid(field, value);
    }
    match value.parse::<T>() {
        Ok(v) => (Some(v), None),
        Err(_) => invalid(field, value),
    }
}

/// Parse a base-10 32-bit integer. Overflow and a leading `+` are invalid.
pub fn parse_integer(value: &str, field: &str) -> Parsed<i32> {
    parse_decimal(value, field)
}

/// Parse a base-10 64-bit integer. Overflow and a leading `+` are invalid.
pub fn parse_long(value: &str, field: &str) -> Parsed<i64> {
    parse_decimal(value, field)
}

/// Parse a non-negative length.
pub fn parse_length(value: &str, field: &str) -> Parsed<u64> {
    match parse_long(value, field) {
        (Some(v), None) if v >= 0 => (Some(v as u64), None),
        (Some(_), _) => invalid(field, value.trim()),
        (None, d) => (None, d),
    }
}

/// Trimmed non-empty string.
pub fn parse_string(value: &str, field: &str) -> Parsed<String> {
    let value = value.trim();
    if value.is_empty() {
        empty(field)
    } else {
        (Some(value.to_string()), None)
    }
}

/// Parse an absolute URI, optionally wrapped in angle brackets.
pub fn parse_uri(value: &str, field: &str) -> Parsed<Url> {
    let mut value = value.trim();
    if value.is_empty() {
        return empty(field);
    }
    if let Some(inner) = value.strip_prefix('<').and_then(|v| v.strip_suffix('>')) {
        value = inner.trim();
    }
    match Url::parse(value) {
        Ok(url) => (Some(url), None),
        Err(_) => invalid(field, value),
    }
}

pub fn parse_ip_address(value: &str, field: &str) -> Parsed<IpAddr> {
    let value = value.trim();
    if value.is_empty() {
        return empty(field);
    }
    match value.parse::<IpAddr>() {
        Ok(ip) => (Some(ip), None),
        Err(_) => invalid(field, value),
    }
}

/// Parse a W3C/ISO 8601 date as used by `WARC-Date`.
///
/// Full timestamps with optional fractional seconds and date-only values
/// are accepted.
pub fn parse_warc_date(value: &str, field: &str) -> Parsed<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return empty(field);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return (Some(dt.with_timezone(&Utc)), None);
    }
    if let Some(dt) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return (Some(dt.and_utc()), None);
    }
    invalid(field, value)
}

/// Parse an ARC archive date (`yyyyMMddHHmmss`).
pub fn parse_arc_date(value: &str, field: &str) -> Parsed<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return empty(field);
    }
    if value.len() != 14 {
        return invalid(field, value);
    }
    match NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%S") {
        Ok(dt) => (Some(dt), None),
        Err(_) => invalid(field, value),
    }
}

pub fn parse_content_type(value: &str, field: &str) -> Parsed<ContentType> {
    let value = value.trim();
    if value.is_empty() {
        return empty(field);
    }
    match ContentType::parse(value) {
        Some(ct) => (Some(ct), None),
        None => invalid(field, value),
    }
}

/// Parse an `algorithm:value` digest descriptor.
pub fn parse_digest(value: &str, field: &str) -> Parsed<WarcDigest> {
    let value = value.trim();
    if value.is_empty() {
        return empty(field);
    }
    match WarcDigest::parse(value) {
        Some(d) => (Some(d), None),
        None => invalid(field, value),
    }
}

/// A MIME media type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    media_type: String,
    subtype: String,
    parameters: Vec<(String, String)>,
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b)
}

fn take_token(s: &str) -> Option<(&str, &str)> {
    let end = s.bytes().position(|b| !is_token_byte(b)).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some(s.split_at(end))
}

fn take_quoted(s: &str) -> Option<(String, &str)> {
    let mut out = String::new();
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, &s[i + 1..])),
            '\\' => out.push(chars.next()?.1),
            c => out.push(c),
        }
    }
    None
}

impl ContentType {
    /// Parse `type "/" subtype *(";" name "=" (token | quoted-string))`.
    pub fn parse(s: &str) -> Option<Self> {
        let (media_type, rest) = take_token(s.trim())?;
        let (subtype, mut rest) = take_token(rest.strip_prefix('/')?)?;
        let mut parameters = Vec::new();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            rest = rest.strip_prefix(';')?.trim_start();
            if rest.is_empty() {
                break;
            }
            let (name, after_name) = take_token(rest)?;
            let after_eq = after_name.trim_start().strip_prefix('=')?.trim_start();
            let (value, after_value) = if after_eq.starts_with('"') {
                take_quoted(after_eq)?
            } else {
                let (v, r) = take_token(after_eq)?;
                (v.to_string(), r)
            };
            parameters.push((name.to_ascii_lowercase(), value));
            rest = after_value;
        }
        Some(ContentType {
            media_type: media_type.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            parameters,
        })
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Look up a parameter value by (case-insensitive) name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    /// Whether the media type equals `media_type/subtype` (case-insensitive).
    pub fn is(&self, media_type: &str, subtype: &str) -> bool {
        self.media_type.eq_ignore_ascii_case(media_type) && self.subtype.eq_ignore_ascii_case(subtype)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.subtype)?;
        for (k, v) in &self.parameters {
            if !v.is_empty() && v.bytes().all(is_token_byte) {
                write!(f, "; {}={}", k, v)?;
            } else {
                write!(f, "; {}=\"{}\"", k, v.replace('\\', "\\\\").replace('"', "\\\""))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind<T>(p: &Parsed<T>) -> Option<DiagnosisType> {
        p.1.as_ref().map(|d| d.kind())
    }

    #[test]
    fn test_integers() {
        assert_eq!(parse_integer("42", "f").0, Some(42));
        assert_eq!(kind(&parse_integer("", "f")), Some(DiagnosisType::Empty));
        assert_eq!(kind(&parse_integer("+1", "f")), Some(DiagnosisType::Invalid));
        assert_eq!(kind(&parse_integer("2147483648", "f")), Some(DiagnosisType::Invalid));
        assert_eq!(parse_long("0000000000000000000", "Content-Length").0, Some(0));
        assert_eq!(kind(&parse_long("99999999999999999999", "f")), Some(DiagnosisType::Invalid));
        assert_eq!(kind(&parse_length("-1", "Content-Length")), Some(DiagnosisType::Invalid));
        assert_eq!(parse_length("-1", "Content-Length").0, None);
    }

    #[test]
    fn test_uri_brackets() {
        let (url, d) = parse_uri("<urn:uuid:3b1bd1b6-4e55-4d58-a5cb-c56fd05c4a40>", "WARC-Record-ID");
        assert!(d.is_none());
        assert_eq!(url.unwrap().as_str(), "urn:uuid:3b1bd1b6-4e55-4d58-a5cb-c56fd05c4a40");

        let (url, d) = parse_uri("not a uri", "WARC-Target-URI");
        assert!(url.is_none());
        assert_eq!(d.unwrap().kind(), DiagnosisType::Invalid);
    }

    #[test]
    fn test_dates() {
        let (dt, d) = parse_warc_date("2006-09-19T17:20:24Z", "WARC-Date");
        assert!(d.is_none());
        assert_eq!(dt.unwrap().to_rfc3339(), "2006-09-19T17:20:24+00:00");
        assert!(parse_warc_date("2006-09-19T17:20:24.123Z", "WARC-Date").0.is_some());
        assert_eq!(kind(&parse_warc_date("yesterday", "WARC-Date")), Some(DiagnosisType::Invalid));

        assert!(parse_arc_date("20010101120000", "Archive-date").0.is_some());
        assert_eq!(kind(&parse_arc_date("2001010112", "Archive-date")), Some(DiagnosisType::Invalid));
    }

    #[test]
    fn test_ip() {
        assert!(parse_ip_address("192.168.1.1", "WARC-IP-Address").0.is_some());
        assert!(parse_ip_address("::1", "WARC-IP-Address").0.is_some());
        assert_eq!(kind(&parse_ip_address("300.1.1.1", "WARC-IP-Address")), Some(DiagnosisType::Invalid));
    }

    #[test]
    fn test_content_type() {
        let ct = ContentType::parse("Application/HTTP; MsgType=response; charset=\"utf-8\"").unwrap();
        assert!(ct.is("application", "http"));
        assert_eq!(ct.parameter("msgtype"), Some("response"));
        assert_eq!(ct.parameter("CHARSET"), Some("utf-8"));
        assert_eq!(ct.to_string(), "application/http; msgtype=response; charset=utf-8");

        assert!(ContentType::parse("text/plain;").is_some());
        assert!(ContentType::parse("text").is_none());
        assert!(ContentType::parse("text/plain; charset").is_none());
        assert!(ContentType::parse("text/plain; a=\"unterminated").is_none());
    }

    #[test]
    fn test_digest() {
        assert!(parse_digest("sha1:VGMT4NSHA2AWVOR6EVYXQUGCNSONBWE5", "WARC-Block-Digest").0.is_some());
        let (d, diag) = parse_digest("sha1", "WARC-Block-Digest");
        assert!(d.is_none());
        assert_eq!(diag.unwrap().kind(), DiagnosisType::Invalid);
        assert_eq!(kind(&parse_digest(" ", "WARC-Block-Digest")), Some(DiagnosisType::Empty));
    }
}
