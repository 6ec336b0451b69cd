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

//! Reading ARC files.

mod common;

use std::io::{Cursor, Read};

use common::*;
use webarc::arc::{ArcLayout, ArcRecordKind, VERSION_2_BLOCK_DEF};
use webarc::{ArcReader, ArcVersion, DiagnosisType};

#[test]
fn test_version_block_and_records() {
    let data = write_arc(&[("http://example.com/", b"<html></html>"), ("dns:example.com", b"192.0.2.1")], false);
    let mut reader = ArcReader::open(Cursor::new(data.clone())).unwrap();

    let mut version_block = reader.next_record().unwrap().unwrap();
    assert_eq!(version_block.offset(), 0);
    assert_eq!(version_block.header().kind(), ArcRecordKind::VersionBlock);
    let version = version_block.header().version_header().unwrap();
    assert_eq!(version.version(), Some(ArcVersion::V1_0));
    assert_eq!(version.origin_code(), Some("webarc"));
    assert!(version.is_valid());
    assert_eq!(version_block.remaining(), 0);
    version_block.close().unwrap();
    assert!(version_block.is_compliant(), "{:?}", version_block.diagnostics());
    drop(version_block);
    assert_eq!(reader.format().layout(), Some(ArcLayout::V1));

    let mut contents = Vec::new();
    while let Some(mut record) = reader.next_record().unwrap() {
        assert_eq!(record.header().kind(), ArcRecordKind::Record);
        assert!(record.http_header().is_none());
        let mut content = Vec::new();
        record.read_to_end(&mut content).unwrap();
        record.close().unwrap();
        assert!(record.is_compliant(), "{:?}", record.diagnostics());
        contents.push((record.header_field("url").unwrap().to_string(), content));
    }
    assert_eq!(contents.len(), 2);
    assert_eq!(contents[0].0, "http://example.com/");
    assert_eq!(contents[1].1, b"192.0.2.1");
    assert_eq!(reader.consumed_offset(), data.len() as u64);
    assert!(reader.is_compliant());
}

#[test]
fn test_http_record() {
    let body = b"HTTP/1.0 404 Not Found\r\nContent-Type: text/plain\r\n\r\nmissing";
    let data = write_arc(&[("http://example.com/missing", body)], true);
    let mut reader = ArcReader::open(Cursor::new(data)).unwrap();
    assert!(reader.is_compressed());
    let summaries: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1].http_status, Some(404));
    assert!(summaries.iter().all(|s| s.is_compliant()));
}

#[test]
fn test_missing_version_block() {
    let data = b"http://example.com/ 192.0.2.1 20080430204825 text/plain 2\nhi\n";
    let mut reader = ArcReader::new(Cursor::new(data.to_vec()));
    let summary = reader.records().next().unwrap().unwrap();
    assert_eq!(summary.diagnostics.count(DiagnosisType::Invalid, "ARC file"), 1);
    assert_eq!(summary.content_length, Some(2));
}

#[test]
fn test_version_2_file() {
    let block = format!("2 0 IA\n{}\n", VERSION_2_BLOCK_DEF);
    let record = "http://example.com/ 192.0.2.1 20080430204825 text/plain 200 - - 0 x.arc 2";
    let data = format!(
        "filedesc://x.arc 0.0.0.0 20080430204825 text/plain 200 - - 0 x.arc {}\n{}\n{}\nhi\n",
        block.len(),
        block,
        record
    );
    let mut reader = ArcReader::new(Cursor::new(data.into_bytes()));
    let summaries: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|s| s.is_compliant()), "{:?}", summaries);
    assert_eq!(summaries[1].header.layout(), ArcLayout::V2);
    assert_eq!(summaries[1].header.result_code(), Some(200));
    assert_eq!(summaries[1].header.filename(), Some("x.arc"));
}

#[test]
fn test_malformed_record_line() {
    let data = write_arc(&[], false);
    let mut data = String::from_utf8(data).unwrap();
    data.push_str("example.com 192.0.2.1 yesterday text/plain 0\n\n");
    let mut reader = ArcReader::new(Cursor::new(data.into_bytes()));
    let summaries: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(summaries.len(), 2);
    let d = &summaries[1].diagnostics;
    assert_eq!(d.count(DiagnosisType::Invalid, "URL"), 1);
    assert_eq!(d.count(DiagnosisType::Invalid, "Archive-date"), 1);
    assert_eq!(summaries[1].header.archive_length(), Some(0));
}
