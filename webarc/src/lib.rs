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

//! Streaming reader, validator and writer for ARC and WARC web archives.
//!
//! Records are read one at a time from plain or multi-member GZip input.
//! Every record knows its offset in the file, exposes its payload as a
//! bounded stream that digests bytes as they pass and collects compliance
//! problems as [`Diagnosis`] values instead of failing.
//!
//! ```rust
//! use std::io::Read;
//! use webarc::{DiagnosisType, WarcReader};
//!
//! let data = b"WARC/1.1\r\nWARC-Type: resource\r\nContent-Length: 2\r\n\r\nhi\r\n\r\n";
//! let mut reader = WarcReader::open(&data[..]).unwrap();
//! let mut record = reader.next_record().unwrap().unwrap();
//! let mut content = Vec::new();
//! record.read_to_end(&mut content).unwrap();
//! record.close().unwrap();
//!
//! assert_eq!(content, b"hi");
//! assert_eq!(record.diagnostics().count(DiagnosisType::Wanted, "WARC-Record-ID"), 1);
//! ```

pub mod arc;
pub mod diagnostics;
pub mod digest;
pub mod engine;
pub mod error;
pub mod fields;
pub mod gzip;
mod header_line;
pub mod headers;
pub mod http;
pub mod payload;
pub mod stream;
pub mod warc;
pub mod writer;

pub use arc::{ArcFormat, ArcHeader, ArcVersion, ArcVersionHeader, ArcWriter};
pub use diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
pub use digest::{DigestAlgorithm, DigestEncoding, WarcDigest};
pub use engine::{ArchiveReader, InputCompression, ReaderOptions, ReaderStats, Record, RecordFormat, RecordSummary};
pub use error::{Error, Result};
pub use gzip::{GzipReader, GzipWriter};
pub use headers::{CaseInsensitiveKey, HeaderEncoding, HeaderMap};
pub use http::HttpHeader;
pub use stream::{ByteCountingReader, PushbackRead};
pub use warc::{WarcFormat, WarcHeader, WarcRecordBuilder, WarcRecordType, WarcWriter};
pub use writer::WriterState;

/// Reader over WARC records.
pub type WarcReader<R> = ArchiveReader<WarcFormat, R>;

/// WARC record borrowed from a [`WarcReader`].
pub type WarcRecord<'a, R> = Record<'a, WarcFormat, R>;

/// Reader over ARC records.
pub type ArcReader<R> = ArchiveReader<ArcFormat, R>;

/// ARC record borrowed from an [`ArcReader`].
pub type ArcRecord<'a, R> = Record<'a, ArcFormat, R>;
