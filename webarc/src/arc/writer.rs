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

use std::io::{Read, Write};

use flate2::Compression;

use super::{ArcHeader, ArcVersion};
use crate::error::{Error, Result};
use crate::writer::{RecordSink, WriterState};

/// Writes ARC records, optionally one GZip member per record.
///
/// A file should start with a version block written by
/// [`write_version_block`](Self::write_version_block).
pub struct ArcWriter<W: Write> {
    sink: RecordSink<W>,
}

impl<W: Write> ArcWriter<W> {
    pub fn new(out: W) -> Self {
        ArcWriter {
            sink: RecordSink::new(out, None),
        }
    }

    /// Write every record into its own GZip member.
    pub fn new_compressed(out: W) -> Self {
        Self::with_compression_level(out, Compression::default())
    }

    pub fn with_compression_level(out: W, level: Compression) -> Self {
        ArcWriter {
            sink: RecordSink::new(out, Some(level)),
        }
    }

    pub fn state(&self) -> WriterState {
        self.sink.state()
    }

    /// Number of records written, including the version block.
    pub fn records(&self) -> u64 {
        self.sink.records()
    }

    pub fn is_compressed(&self) -> bool {
        self.sink.is_compressed()
    }

    /// Write the version block. `header` supplies the `filedesc://` record
    /// line, its length is replaced. The layout of `header` must be the
    /// one used by `version`.
    pub fn write_version_block(
        &mut self,
        header: &ArcHeader,
        version: ArcVersion,
        origin_code: &str,
        metadata: &[u8],
    ) -> Result<()> {
        if header.layout() != version.layout() {
            return Err(Error::InvalidArgument(format!(
                "{:?} record line does not match ARC version {}",
                header.layout(),
                version
            )));
        }
        let (number, reserved) = version.values();
        let mut content = format!(
            "{} {} {}\n{}\n",
            number,
            reserved,
            origin_code,
            version.layout().block_description()
        )
        .into_bytes();
        content.extend_from_slice(metadata);
        self.write_record(header, &content)
    }

    /// Start a record. The header must declare an `Archive-length`.
    pub fn write_header(&mut self, header: &ArcHeader) -> Result<()> {
        let Some(length) = header.archive_length() else {
            return Err(Error::InvalidArgument("record line without Archive-length".to_string()));
        };
        let mut line = header.record_line().into_bytes();
        line.push(b'\n');
        self.sink.write_header(&line, Some(length))
    }

    pub fn write_payload(&mut self, data: &[u8]) -> Result<()> {
        self.sink.write_payload(data)
    }

    /// Copy `length` bytes of payload from `reader`. Returns the number of
    /// bytes copied.
    pub fn stream_payload<T: Read>(&mut self, reader: T, length: u64) -> Result<u64> {
        self.sink.stream_payload(reader, length)
    }

    /// Finish the current record.
    pub fn close_record(&mut self) -> Result<()> {
        self.sink.close_record(b"\n")
    }

    /// Write `header` with its length set to `content.len()`, then the
    /// content and trailer.
    pub fn write_record(&mut self, header: &ArcHeader, content: &[u8]) -> Result<()> {
        let mut header = header.clone();
        header.set_archive_length(content.len() as u64);
        self.write_header(&header)?;
        self.write_payload(content)?;
        self.close_record()
    }

    /// Flush and finish the last GZip member. Calling `close` again does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.sink.close()
    }

    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.sink.get_mut()
    }

    /// Close the writer and return the sink.
    pub fn into_inner(self) -> Result<W> {
        self.sink.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::{ArcLayout, ArcRecordKind, VERSION_1_BLOCK_DEF};
    use crate::diagnostics::Diagnostics;
    use chrono::NaiveDateTime;

    fn date() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("20080430204825", "%Y%m%d%H%M%S").unwrap()
    }

    #[test]
    fn test_write_file() {
        let filedesc = ArcHeader::new("filedesc://test.arc", "0.0.0.0", date(), "text/plain", 0);
        let record = ArcHeader::new("http://example.com/", "192.0.2.1", date(), "text/plain", 0);

        let mut writer = ArcWriter::new(Vec::new());
        writer.write_version_block(&filedesc, ArcVersion::V1_0, "IA", b"").unwrap();
        writer.write_record(&record, b"hello").unwrap();
        assert_eq!(writer.records(), 2);
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let block = format!("1 0 IA\n{}\n", VERSION_1_BLOCK_DEF);
        let expected = format!(
            "filedesc://test.arc 0.0.0.0 20080430204825 text/plain {}\n{}\n\
             http://example.com/ 192.0.2.1 20080430204825 text/plain 5\nhello\n",
            block.len(),
            block
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_misuse() {
        let filedesc = ArcHeader::new("filedesc://test.arc", "0.0.0.0", date(), "text/plain", 0);
        let mut writer = ArcWriter::new(Vec::new());
        assert!(matches!(
            writer.write_version_block(&filedesc, ArcVersion::V2_0, "IA", b""),
            Err(Error::InvalidArgument(_))
        ));

        let no_length = ArcHeader::parse(
            "http://example.com/ 192.0.2.1 20080430204825 text/plain",
            ArcLayout::V1,
            ArcRecordKind::Record,
            &mut Diagnostics::new(),
        );
        assert!(matches!(writer.write_header(&no_length), Err(Error::InvalidArgument(_))));
        assert!(writer.write_payload(b"x").unwrap_err().is_usage_error());
        assert_eq!(writer.state(), WriterState::Open);
    }
}
