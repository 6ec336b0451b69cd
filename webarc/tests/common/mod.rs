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

//! Shared helpers for integration tests.
//!
//! Each integration test file compiles as its own crate and only uses some
//! of these helpers.

#![allow(dead_code)]

use chrono::NaiveDateTime;
use webarc::{ArcHeader, ArcVersion, ArcWriter, WarcRecordBuilder, WarcRecordType, WarcWriter};

/// Raw WARC record with the given header fields. `Content-Length` is not
/// added automatically.
pub fn raw_warc_record(fields: &[(&str, &str)], content: &[u8]) -> Vec<u8> {
    let mut out = b"WARC/1.1\r\n".to_vec();
    for (name, value) in fields {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(content);
    out.extend_from_slice(b"\r\n\r\n");
    out
}

/// Complete, compliant `resource` record.
pub fn resource_record(uri: &str, content: &[u8]) -> WarcRecordBuilder {
    let mut record = WarcRecordBuilder::new(WarcRecordType::Resource);
    record.headers_mut().set("WARC-Target-URI", uri);
    record.headers_mut().set("Content-Type", "text/plain");
    record.set_content(content.to_vec());
    record
}

/// `response` record carrying an HTTP response with `body`.
pub fn http_response_record(uri: &str, body: &[u8]) -> WarcRecordBuilder {
    let mut record = WarcRecordBuilder::new(WarcRecordType::Response);
    record.headers_mut().set("WARC-Target-URI", uri);
    record.set_http();
    let mut content = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    content.extend_from_slice(body);
    record.set_content(content);
    record
}

/// `count` resource records with distinct content.
pub fn resource_records(count: usize) -> Vec<WarcRecordBuilder> {
    (0..count)
        .map(|i| resource_record(&format!("http://example.com/{}", i), format!("record {}", i).as_bytes()))
        .collect()
}

/// Write `records` into an in-memory WARC file.
pub fn write_warc(records: &[WarcRecordBuilder], compressed: bool) -> Vec<u8> {
    let mut writer = if compressed {
        WarcWriter::new_compressed(Vec::new())
    } else {
        WarcWriter::new(Vec::new())
    };
    for record in records {
        writer.write_record(record).unwrap();
    }
    writer.into_inner().unwrap()
}

pub fn arc_date() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("20080430204825", "%Y%m%d%H%M%S").unwrap()
}

/// Version 1.0 ARC file with one record per `(url, content)` pair.
pub fn write_arc(records: &[(&str, &[u8])], compressed: bool) -> Vec<u8> {
    let mut writer = if compressed {
        ArcWriter::new_compressed(Vec::new())
    } else {
        ArcWriter::new(Vec::new())
    };
    let filedesc = ArcHeader::new("filedesc://test.arc", "0.0.0.0", arc_date(), "text/plain", 0);
    writer.write_version_block(&filedesc, ArcVersion::V1_0, "webarc", b"").unwrap();
    for (url, content) in records {
        let header = ArcHeader::new(url, "192.0.2.1", arc_date(), "text/html", 0);
        writer.write_record(&header, content).unwrap();
    }
    writer.into_inner().unwrap()
}
