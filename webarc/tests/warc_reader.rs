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

//! Reading and validating WARC files.

mod common;

use std::io::{Cursor, Read};

use common::*;
use webarc::digest::compute;
use webarc::{
    DiagnosisType, DigestAlgorithm, DigestEncoding, ReaderOptions, WarcDigest, WarcReader, WarcRecordType,
    WarcWriter,
};

const RECORD_ID: &str = "<urn:uuid:6a35bc6e-4c5f-4d1b-8a3e-bd1b4f7e1c01>";
const DATE: &str = "2024-03-01T12:00:00Z";

#[test]
fn test_sequential_read() {
    let data = write_warc(&resource_records(3), false);
    let mut reader = WarcReader::open(Cursor::new(data.clone())).unwrap();
    assert!(!reader.is_compressed());

    let mut contents = Vec::new();
    let mut last_end = 0;
    while let Some(mut record) = reader.next_record().unwrap() {
        assert_eq!(record.offset(), last_end);
        assert_eq!(record.header().record_type(), Some(WarcRecordType::Resource));
        let mut content = String::new();
        record.read_to_string(&mut content).unwrap();
        record.close().unwrap();
        assert!(record.is_compliant(), "{:?}", record.diagnostics());
        assert!(record.diagnostics().is_empty());
        last_end = record.end_offset().unwrap();
        contents.push(content);
    }
    assert_eq!(contents, ["record 0", "record 1", "record 2"]);
    assert_eq!(last_end, data.len() as u64);
    assert_eq!(reader.consumed_offset(), data.len() as u64);
    assert_eq!(reader.stats().records, 3);
    assert_eq!(reader.stats().errors, 0);
    assert!(reader.is_compliant());
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn test_warcinfo_with_long_content_length() {
    let data = raw_warc_record(&[("WARC-Type", "warcinfo"), ("Content-Length", "0000000000000000000")], b"");
    let mut reader = WarcReader::new(Cursor::new(data));
    let summaries: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(summaries.len(), 1);

    let d = &summaries[0].diagnostics;
    assert_eq!(d.count(DiagnosisType::Wanted, "WARC-Record-ID"), 1);
    assert_eq!(d.count(DiagnosisType::Wanted, "WARC-Date"), 1);
    assert_eq!(d.count(DiagnosisType::Wanted, "Content-Length"), 0);
    assert_eq!(d.errors().len(), 2);
    assert_eq!(summaries[0].content_length, Some(0));
    assert!(!reader.is_compliant());
}

#[test]
fn test_duplicate_fields_first_wins() {
    let data = raw_warc_record(
        &[
            ("WARC-Type", "resource"),
            ("WARC-Type", "metadata"),
            ("WARC-Record-ID", RECORD_ID),
            ("WARC-Date", DATE),
            ("WARC-Date", "2020-01-01T00:00:00Z"),
            ("WARC-Target-URI", "http://example.com/"),
            ("Content-Type", "text/plain"),
            ("Content-Length", "3"),
            ("Content-Length", "3"),
            ("WARC-Concurrent-To", "<urn:uuid:1>"),
            ("WARC-Concurrent-To", "<urn:uuid:2>"),
        ],
        b"abc",
    );
    let mut reader = WarcReader::new(Cursor::new(data));
    let summary = reader.records().next().unwrap().unwrap();
    assert_eq!(summary.diagnostics.errors().len(), 3);
    for d in summary.diagnostics.errors() {
        assert_eq!(d.kind(), DiagnosisType::Duplicate);
    }
    assert_eq!(summary.header.record_type(), Some(WarcRecordType::Resource));
    assert_eq!(summary.header.date().unwrap().to_rfc3339(), "2024-03-01T12:00:00+00:00");
    assert_eq!(summary.header.concurrent_to().len(), 2);
}

fn continuation(segment_number: &str) -> Vec<u8> {
    raw_warc_record(
        &[
            ("WARC-Type", "continuation"),
            ("WARC-Record-ID", RECORD_ID),
            ("WARC-Date", DATE),
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Segment-Origin-ID", "<urn:uuid:00000000-0000-0000-0000-000000000001>"),
            ("WARC-Segment-Number", segment_number),
            ("Content-Length", "4"),
        ],
        b"rest",
    )
}

#[test]
fn test_continuation_segment_number() {
    let mut reader = WarcReader::new(Cursor::new(continuation("1")));
    let summary = reader.records().next().unwrap().unwrap();
    let d = &summary.diagnostics;
    assert_eq!(d.count(DiagnosisType::Invalid, "WARC-Segment-Number"), 1);
    assert_eq!(d.errors().len(), 1);

    let mut reader = WarcReader::new(Cursor::new(continuation("2")));
    let summary = reader.records().next().unwrap().unwrap();
    assert!(summary.diagnostics.is_empty(), "{:?}", summary.diagnostics);
    assert_eq!(summary.header.segment_number(), Some(2));
}

#[test]
fn test_warcinfo_content_type_recommendation() {
    let data = raw_warc_record(
        &[
            ("WARC-Type", "warcinfo"),
            ("WARC-Record-ID", RECORD_ID),
            ("WARC-Date", DATE),
            ("WARC-Filename", "test.warc.gz"),
            ("Content-Type", "text/plain"),
            ("Content-Length", "17"),
        ],
        b"software: webarc\n",
    );
    let mut reader = WarcReader::new(Cursor::new(data));
    let summary = reader.records().next().unwrap().unwrap();
    assert!(summary.is_compliant());
    assert_eq!(summary.diagnostics.warnings().len(), 1);
    assert_eq!(summary.diagnostics.count(DiagnosisType::Recommended, "Content-Type"), 1);
    assert!(reader.is_compliant());
    assert_eq!(reader.stats().warnings, 1);
}

#[test]
fn test_block_digest_round_trip() {
    let mut writer = WarcWriter::new(Vec::new()).with_block_digest(DigestAlgorithm::Sha256, DigestEncoding::Base16);
    for record in resource_records(4) {
        writer.write_record(&record).unwrap();
    }
    let data = writer.into_inner().unwrap();

    let options = ReaderOptions::default().block_digest(true);
    let mut reader = WarcReader::with_options(Cursor::new(data), options).unwrap();
    let summaries: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(summaries.len(), 4);
    for summary in &summaries {
        assert!(summary.is_compliant(), "{:?}", summary.diagnostics);
        let computed = summary.block_digest.as_ref().unwrap();
        assert_eq!(computed.digest_algorithm(), Some(DigestAlgorithm::Sha256));
        let declared = summary.header.block_digest().unwrap();
        let decoded = declared.decode(32).unwrap();
        assert_eq!(decoded.encoding, DigestEncoding::Base16);
        assert_eq!(
            decoded.bytes.as_deref(),
            computed.decode(32).and_then(|d| d.bytes).as_deref()
        );
    }
}

fn digest_record(digest: &str, content: &[u8]) -> Vec<u8> {
    raw_warc_record(
        &[
            ("WARC-Type", "resource"),
            ("WARC-Record-ID", RECORD_ID),
            ("WARC-Date", DATE),
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Block-Digest", digest),
            ("Content-Type", "text/plain"),
            ("Content-Length", &content.len().to_string()),
        ],
        content,
    )
}

#[test]
fn test_block_digest_mismatch() {
    let options = ReaderOptions::default().block_digest(true);
    let read = |data: Vec<u8>| {
        let mut reader = WarcReader::with_options(Cursor::new(data), options.clone()).unwrap();
        let summary = reader.records().next().unwrap().unwrap();
        summary
    };

    let ok = read(digest_record("sha1:VGMT4NSHA2AWVOR6EVYXQUGCNSONBWE5", b"abc"));
    assert!(ok.diagnostics.is_empty(), "{:?}", ok.diagnostics);
    assert_eq!(ok.block_digest.unwrap().to_string(), "sha1:VGMT4NSHA2AWVOR6EVYXQUGCNSONBWE5");

    let hex = read(digest_record("sha1:a9993e364706816aba3e25717850c26c9cd0d89d", b"abc"));
    assert!(hex.diagnostics.is_empty(), "{:?}", hex.diagnostics);

    let bad = read(digest_record("sha1:VGMT4NSHA2AWVOR6EVYXQUGCNSONBWE5", b"abd"));
    assert_eq!(bad.diagnostics.count(DiagnosisType::Invalid, "Block digest"), 1);

    let unknown = read(digest_record("sha1:xyz", b"abc"));
    assert_eq!(unknown.diagnostics.count(DiagnosisType::Invalid, "Encoding"), 1);
    assert_eq!(unknown.diagnostics.errors().len(), 1);
}

#[test]
fn test_digest_not_checked_when_disabled() {
    let mut reader = WarcReader::new(Cursor::new(digest_record("sha1:VGMT4NSHA2AWVOR6EVYXQUGCNSONBWE5", b"abd")));
    let summary = reader.records().next().unwrap().unwrap();
    assert!(summary.diagnostics.is_empty());
    assert!(summary.block_digest.is_none());
}

#[test]
fn test_http_response() {
    let body = b"<html><body>Hello</body></html>";
    let data = write_warc(&[http_response_record("http://example.com/", body)], false);
    let options = ReaderOptions::default()
        .payload_digest(true)
        .payload_digest_algorithm(Some(DigestAlgorithm::Sha1));
    let mut reader = WarcReader::with_options(Cursor::new(data), options).unwrap();

    let mut record = reader.next_record().unwrap().unwrap();
    let http = record.http_header().unwrap();
    assert_eq!(http.status_code(), 200);
    assert_eq!(http.headers().get("content-type").as_deref(), Some("text/html"));
    assert_eq!(http.content_type().map(|ct| ct.subtype().to_string()).as_deref(), Some("html"));

    let mut content = Vec::new();
    record.read_to_end(&mut content).unwrap();
    assert_eq!(content, body);
    record.close().unwrap();
    assert!(record.is_compliant(), "{:?}", record.diagnostics());

    let expected = WarcDigest::from_bytes(DigestAlgorithm::Sha1, &compute(DigestAlgorithm::Sha1, body), DigestEncoding::Base32);
    assert_eq!(record.computed_payload_digest(), Some(&expected));
    assert_eq!(record.computed_payload_digest_bytes(), Some(&compute(DigestAlgorithm::Sha1, body)[..]));
    assert!(record.computed_block_digest_bytes().is_none());
}

#[test]
fn test_response_without_http_header() {
    let mut record = http_response_record("http://example.com/", b"");
    record.set_content(b"not an http message".to_vec());
    let data = write_warc(&[record], false);
    let mut reader = WarcReader::new(Cursor::new(data));
    let mut record = reader.next_record().unwrap().unwrap();
    assert!(record.http_header().is_none());
    let mut content = String::new();
    record.read_to_string(&mut content).unwrap();
    assert_eq!(content, "not an http message");
}

#[test]
fn test_truncated_payload() {
    let mut data = raw_warc_record(
        &[
            ("WARC-Type", "resource"),
            ("WARC-Record-ID", RECORD_ID),
            ("WARC-Date", DATE),
            ("WARC-Target-URI", "http://example.com/"),
            ("Content-Type", "text/plain"),
            ("Content-Length", "100"),
        ],
        b"hello",
    );
    data.truncate(data.len() - 4);

    let mut reader = WarcReader::new(Cursor::new(data));
    let mut record = reader.next_record().unwrap().unwrap();
    let mut content = Vec::new();
    record.read_to_end(&mut content).unwrap();
    assert_eq!(content, b"hello");
    record.close().unwrap();
    record.close().unwrap();
    let d = record.diagnostics();
    assert_eq!(d.count(DiagnosisType::Invalid, "Payload"), 1);
    assert_eq!(d.count(DiagnosisType::Invalid, "Trailing newlines"), 1);
    drop(record);
    assert!(reader.next_record().unwrap().is_none());
    assert!(!reader.is_compliant());
}

#[test]
fn test_missing_trailing_newline() {
    let mut data = write_warc(&resource_records(2), false);
    let first = WarcReader::new(Cursor::new(data.clone()))
        .records()
        .next()
        .unwrap()
        .unwrap();
    let end = first.end_offset as usize;
    data.drain(end - 2..end);

    let mut reader = WarcReader::new(Cursor::new(data));
    let summaries: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].diagnostics.count(DiagnosisType::Invalid, "Trailing newlines"), 1);
    assert!(summaries[1].is_compliant());
}

#[test]
fn test_garbage_between_and_after_records() {
    let records = resource_records(2);
    let mut data = write_warc(&records[..1], false);
    data.extend_from_slice(b"garbage\r\nmore garbage\r\n");
    data.extend_from_slice(&write_warc(&records[1..], false));
    data.extend_from_slice(b"trailing junk\n");

    let mut reader = WarcReader::new(Cursor::new(data));
    let summaries: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(summaries.len(), 2);
    assert!(summaries[0].is_compliant());
    assert_eq!(summaries[1].diagnostics.count(DiagnosisType::UndesiredData, "Data"), 1);
    assert_eq!(reader.diagnostics().count(DiagnosisType::UndesiredData, "Data"), 1);
    assert!(!reader.is_compliant());
}

#[test]
fn test_random_access_by_offset() {
    for compressed in [false, true] {
        let data = write_warc(&resource_records(5), compressed);
        let mut reader = WarcReader::open(Cursor::new(data.clone())).unwrap();
        assert_eq!(reader.is_compressed(), compressed);
        let summaries: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(summaries.len(), 5);

        for summary in &summaries {
            let offset = summary.offset;
            let stream = Cursor::new(data[offset as usize..].to_vec());
            let mut reader = WarcReader::new_at(stream, offset).unwrap();
            let mut record = reader.next_record().unwrap().unwrap();
            assert_eq!(record.offset(), offset);
            assert_eq!(
                record.header().record_id(),
                summary.header.record_id(),
                "record at offset {}",
                offset
            );
            record.close().unwrap();
            assert_eq!(record.end_offset(), Some(summary.end_offset));
        }
    }
}

#[test]
fn test_unknown_fields_and_lookup() {
    let data = raw_warc_record(
        &[
            ("WARC-Type", "resource"),
            ("WARC-Record-ID", RECORD_ID),
            ("WARC-Date", DATE),
            ("WARC-Target-URI", "http://example.com/"),
            ("X-Crawler", "first"),
            ("x-crawler", "second"),
            ("Content-Length", "0"),
        ],
        b"",
    );
    let mut reader = WarcReader::new(Cursor::new(data));
    let record = reader.next_record().unwrap().unwrap();
    assert_eq!(record.header_field("warc-target-uri"), Some("http://example.com/"));
    assert_eq!(record.header_field("X-CRAWLER"), Some("second"));
    assert_eq!(record.header().unknown_fields().len(), 2);
    assert_eq!(record.header().unknown_fields()[0].0, "X-Crawler");
    assert_eq!(record.remaining(), 0);
}

#[test]
fn test_bare_lf_headers_are_warnings() {
    let data = b"WARC/1.0\nWARC-Type: resource\nWARC-Record-ID: <urn:x:1>\nWARC-Date: 2024-03-01T12:00:00Z\n\
WARC-Target-URI: http://example.com/\nContent-Type: text/plain\nContent-Length: 2\n\nhi\r\n\r\n";
    let mut reader = WarcReader::new(Cursor::new(data.to_vec()));
    let summary = reader.records().next().unwrap().unwrap();
    assert!(summary.is_compliant(), "{:?}", summary.diagnostics);
    assert_eq!(summary.diagnostics.count(DiagnosisType::Recommended, "Line endings"), 1);
}

#[test]
fn test_close_reader() {
    let data = write_warc(&resource_records(2), false);
    let mut reader = WarcReader::new(Cursor::new(data));
    drop(reader.next_record().unwrap());
    reader.close();
    reader.close();
    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.stats().records, 1);
}
