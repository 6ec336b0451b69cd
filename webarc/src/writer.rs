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

//! Record writer state shared by the WARC and ARC writers.

use std::fmt;
use std::io::{self, Read, Write};
use std::mem;

use flate2::Compression;

use crate::error::{Error, Result};
use crate::gzip::{GzipHeader, GzipMemberWriter};

/// Position of a writer in the record life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Ready for the first record.
    Open,
    HeaderWritten,
    PayloadStreaming,
    /// Ready for the next record.
    RecordClosed,
    Closed,
}

impl WriterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriterState::Open => "open",
            WriterState::HeaderWritten => "header written",
            WriterState::PayloadStreaming => "payload streaming",
            WriterState::RecordClosed => "record closed",
            WriterState::Closed => "closed",
        }
    }

    fn accepts_header(&self) -> bool {
        matches!(self, WriterState::Open | WriterState::RecordClosed)
    }

    fn in_record(&self) -> bool {
        matches!(self, WriterState::HeaderWritten | WriterState::PayloadStreaming)
    }
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Sink<W: Write> {
    Plain(W),
    Member(GzipMemberWriter<W>),
    // Left behind when starting or finishing a member failed.
    Broken,
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Member(m) => m.write(buf),
            Sink::Broken => Err(io::Error::new(io::ErrorKind::BrokenPipe, "writer is broken")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Member(m) => m.flush(),
            Sink::Broken => Ok(()),
        }
    }
}

/// Output stream plus the record state machine. With compression every
/// record goes into its own GZip member.
pub(crate) struct RecordSink<W: Write> {
    sink: Sink<W>,
    compression: Option<Compression>,
    state: WriterState,
    declared_length: Option<u64>,
    written: u64,
    records: u64,
}

impl<W: Write> RecordSink<W> {
    pub(crate) fn new(out: W, compression: Option<Compression>) -> Self {
        RecordSink {
            sink: Sink::Plain(out),
            compression,
            state: WriterState::Open,
            declared_length: None,
            written: 0,
            records: 0,
        }
    }

    pub(crate) fn state(&self) -> WriterState {
        self.state
    }

    pub(crate) fn records(&self) -> u64 {
        self.records
    }

    pub(crate) fn is_compressed(&self) -> bool {
        self.compression.is_some()
    }

    fn misuse(&self, operation: &'static str) -> Error {
        Error::WriterState {
            operation,
            state: self.state.as_str(),
        }
    }

    /// Start a record by writing its header block.
    pub(crate) fn write_header(&mut self, header: &[u8], declared_length: Option<u64>) -> Result<()> {
        if !self.state.accepts_header() {
            return Err(self.misuse("write a header"));
        }
        if let Some(level) = self.compression {
            self.sink = match mem::replace(&mut self.sink, Sink::Broken) {
                Sink::Plain(out) => Sink::Member(GzipMemberWriter::new(out, &GzipHeader::new(), level)?),
                other => other,
            };
        }
        self.sink.write_all(header)?;
        self.declared_length = declared_length;
        self.written = 0;
        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    pub(crate) fn write_payload(&mut self, data: &[u8]) -> Result<()> {
        if !self.state.in_record() {
            return Err(self.misuse("write payload"));
        }
        self.sink.write_all(data)?;
        self.written += data.len() as u64;
        self.state = WriterState::PayloadStreaming;
        Ok(())
    }

    /// Copy up to `length` bytes from `reader` and return the number copied.
    pub(crate) fn stream_payload<T: Read>(&mut self, reader: T, length: u64) -> Result<u64> {
        if !self.state.in_record() {
            return Err(self.misuse("stream payload"));
        }
        let n = io::copy(&mut reader.take(length), &mut self.sink)?;
        self.written += n;
        self.state = WriterState::PayloadStreaming;
        Ok(n)
    }

    /// Write the record trailer and finish the GZip member. Fails without
    /// writing anything if fewer or more payload bytes than declared were
    /// written.
    pub(crate) fn close_record(&mut self, trailer: &[u8]) -> Result<()> {
        if !self.state.in_record() {
            return Err(self.misuse("close a record"));
        }
        if let Some(declared) = self.declared_length {
            if declared != self.written {
                return Err(Error::InvalidArgument(format!(
                    "{} payload bytes written, header declares {}",
                    self.written, declared
                )));
            }
        }
        self.sink.write_all(trailer)?;
        self.finish_member()?;
        self.records += 1;
        self.state = WriterState::RecordClosed;
        log::trace!("Record {} written ({} payload bytes)", self.records, self.written);
        Ok(())
    }

    fn finish_member(&mut self) -> Result<()> {
        self.sink = match mem::replace(&mut self.sink, Sink::Broken) {
            Sink::Member(member) => Sink::Plain(member.finish()?),
            other => other,
        };
        Ok(())
    }

    /// Finish any open GZip member and flush. A record that was left open
    /// is not completed. Calling `close` repeatedly is harmless.
    pub(crate) fn close(&mut self) -> Result<()> {
        if self.state == WriterState::Closed {
            return Ok(());
        }
        if self.state.in_record() {
            log::warn!("Closing writer with an incomplete record");
        }
        self.state = WriterState::Closed;
        self.finish_member()?;
        self.sink.flush()?;
        Ok(())
    }

    pub(crate) fn get_mut(&mut self) -> Option<&mut W> {
        match &mut self.sink {
            Sink::Plain(w) => Some(w),
            _ => None,
        }
    }

    pub(crate) fn into_inner(mut self) -> Result<W> {
        self.close()?;
        match mem::replace(&mut self.sink, Sink::Broken) {
            Sink::Plain(w) => Ok(w),
            _ => Err(Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "writer is broken"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gzip::GzipReader;
    use flate2::read::MultiGzDecoder;

    #[test]
    fn test_state_machine() {
        let mut sink = RecordSink::new(Vec::new(), None);
        assert_eq!(sink.state(), WriterState::Open);
        let err = sink.write_payload(b"x").unwrap_err();
        assert!(err.is_usage_error());
        assert!(sink.close_record(b"\n").unwrap_err().is_usage_error());

        sink.write_header(b"head\n", Some(4)).unwrap();
        assert_eq!(sink.state(), WriterState::HeaderWritten);
        assert!(sink.write_header(b"again\n", None).unwrap_err().is_usage_error());
        assert_eq!(sink.stream_payload(&b"bodyextra"[..], 4).unwrap(), 4);
        assert_eq!(sink.state(), WriterState::PayloadStreaming);
        sink.close_record(b"\n").unwrap();
        assert_eq!(sink.state(), WriterState::RecordClosed);
        assert_eq!(sink.records(), 1);

        sink.close().unwrap();
        sink.close().unwrap();
        assert!(sink.write_header(b"late\n", None).unwrap_err().is_usage_error());
        assert_eq!(sink.into_inner().unwrap(), b"head\nbody\n");
    }

    #[test]
    fn test_length_mismatch() {
        let mut sink = RecordSink::new(Vec::new(), None);
        sink.write_header(b"h", Some(10)).unwrap();
        sink.write_payload(b"short").unwrap();
        let err = sink.close_record(b"\n").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(sink.state(), WriterState::PayloadStreaming);
        sink.write_payload(b"12345").unwrap();
        sink.close_record(b"\n").unwrap();
    }

    #[test]
    fn test_member_per_record() {
        let mut sink = RecordSink::new(Vec::new(), Some(Compression::fast()));
        for i in 0..3 {
            sink.write_header(format!("record {}\n", i).as_bytes(), None).unwrap();
            sink.close_record(b"\n").unwrap();
        }
        let out = sink.into_inner().unwrap();
        let mut reader = GzipReader::new(&out[..]);
        while reader.next_entry().unwrap().is_some() {}
        assert_eq!(reader.entries(), 3);

        let mut text = String::new();
        MultiGzDecoder::new(&out[..]).read_to_string(&mut text).unwrap();
        assert_eq!(text, "record 0\n\nrecord 1\n\nrecord 2\n\n");
    }
}
