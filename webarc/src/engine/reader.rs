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

use crate::diagnostics::{Diagnosis, DiagnosisType, Diagnostics};
use crate::engine::{InputCompression, ReaderOptions, Record, RecordFormat, RecordInput, RecordSummary};
use crate::gzip::{is_gzip_magic, GzipReader};
use crate::stream::{ByteCountingReader, PushbackRead, DEFAULT_PUSHBACK_CAPACITY};
use crate::Result;

enum Input<R> {
    Plain(ByteCountingReader<R>),
    Gzip(GzipReader<R>),
}

/// Counters over all records read so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderStats {
    pub records: u64,
    pub errors: u64,
    pub warnings: u64,
    /// Cleared by the first record with an error.
    pub compliant: bool,
}

impl Default for ReaderStats {
    fn default() -> Self {
        ReaderStats {
            records: 0,
            errors: 0,
            warnings: 0,
            compliant: true,
        }
    }
}

/// Sequential reader over the records of an archive file.
///
/// # Example
///
/// ```rust
/// use std::io::Read;
/// use webarc::WarcReader;
///
/// let data = b"WARC/1.1\r\nWARC-Type: resource\r\nContent-Length: 5\r\n\r\nhello\r\n\r\n";
/// let mut reader = WarcReader::open(&data[..]).unwrap();
/// while let Some(mut record) = reader.next_record().unwrap() {
///     let mut content = String::new();
///     record.read_to_string(&mut content).unwrap();
///     assert_eq!(content, "hello");
/// }
/// assert_eq!(reader.stats().records, 1);
/// ```
pub struct ArchiveReader<F: RecordFormat, R: Read> {
    input: Input<R>,
    format: F,
    options: ReaderOptions,
    stats: ReaderStats,
    diagnostics: Diagnostics,
    closed: bool,
}

impl<F: RecordFormat, R: Read> ArchiveReader<F, R> {
    /// Read uncompressed records.
    pub fn new(stream: R) -> Self {
        Self::build(Input::Plain(ByteCountingReader::new(stream, DEFAULT_PUSHBACK_CAPACITY)), ReaderOptions::default())
    }

    /// Read records stored in GZip members.
    pub fn new_compressed(stream: R) -> Self {
        Self::build(Input::Gzip(GzipReader::new(stream)), ReaderOptions::default())
    }

    /// Read records, detecting GZip compression from the first bytes.
    pub fn open(stream: R) -> Result<Self> {
        Self::with_options(stream, ReaderOptions::default())
    }

    /// Resume reading from a stream the caller positioned at `offset`,
    /// e.g. a record offset returned earlier.
    pub fn new_at(stream: R, offset: u64) -> Result<Self> {
        Self::with_options(stream, ReaderOptions::default().start_offset(offset))
    }

    pub fn with_options(stream: R, options: ReaderOptions) -> Result<Self> {
        let capacity = options.input_buffer_size.max(DEFAULT_PUSHBACK_CAPACITY);
        let mut input = ByteCountingReader::with_offset(stream, capacity, options.start_offset);
        let compressed = match options.compression {
            InputCompression::Auto => is_gzip_magic(&mut input)?,
            InputCompression::None => false,
            InputCompression::Gzip => true,
        };
        log::debug!(
            "Opening {} input at offset {}",
            if compressed { "compressed" } else { "uncompressed" },
            options.start_offset
        );
        let input = if compressed {
            Input::Gzip(GzipReader::from_stream(input, options.input_buffer_size))
        } else {
            Input::Plain(input)
        };
        Ok(Self::build(input, options))
    }

    fn build(input: Input<R>, options: ReaderOptions) -> Self {
        ArchiveReader {
            input,
            format: F::default(),
            options,
            stats: ReaderStats::default(),
            diagnostics: Diagnostics::new(),
            closed: false,
        }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Format state, e.g. the ARC version block.
    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.input, Input::Gzip(_))
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    /// Whether every record read so far was free of errors and no stray
    /// data was found between records.
    pub fn is_compliant(&self) -> bool {
        self.stats.compliant && !self.diagnostics.has_errors()
    }

    /// Problems found outside of records, such as data before a record start.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Input bytes consumed so far. Between records this is the offset of
    /// the next record or GZip member.
    pub fn consumed_offset(&self) -> u64 {
        match &self.input {
            Input::Plain(stream) => stream.consumed(),
            Input::Gzip(gz) => gz.consumed(),
        }
    }

    /// Advance to the next record, `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<Record<'_, F, R>>> {
        if self.closed {
            return Ok(None);
        }
        let ArchiveReader {
            input,
            format,
            options,
            stats,
            diagnostics,
            ..
        } = self;

        match input {
            Input::Plain(stream) => {
                let mut header_diagnostics = Diagnostics::new();
                match format.parse_header(stream, options, &mut header_diagnostics)? {
                    Some((offset, header)) => {
                        let input = RecordInput::Plain(stream);
                        Record::open(input, offset, header, header_diagnostics, format, options, stats).map(Some)
                    }
                    None => {
                        diagnostics.append(&mut header_diagnostics);
                        Ok(None)
                    }
                }
            }
            Input::Gzip(gz) => {
                let (offset, header, header_diagnostics, pending, consumed) = loop {
                    let Some(entry) = gz.next_entry()? else {
                        return Ok(None);
                    };
                    let offset = entry.offset();
                    let mut stream = ByteCountingReader::new(entry, DEFAULT_PUSHBACK_CAPACITY);
                    let mut header_diagnostics = Diagnostics::new();
                    match format.parse_header(&mut stream, options, &mut header_diagnostics)? {
                        Some((_, header)) => {
                            let (_, pending, consumed) = stream.into_parts();
                            break (offset, header, header_diagnostics, pending, consumed);
                        }
                        None => {
                            let mut entry = stream.into_inner();
                            entry.close()?;
                            header_diagnostics.append(&mut entry.take_diagnostics());
                            diagnostics.append(&mut header_diagnostics);
                            diagnostics.add_error(Diagnosis::with_value(
                                DiagnosisType::UndesiredData,
                                "GZip member",
                                format!("no record in member at offset {}", offset),
                            ));
                        }
                    }
                };
                let Some(entry) = gz.current_entry() else {
                    return Ok(None);
                };
                let stream = ByteCountingReader::from_parts(entry, DEFAULT_PUSHBACK_CAPACITY, pending, consumed);
                let input = RecordInput::Gzip(stream);
                Record::open(input, offset, header, header_diagnostics, format, options, stats).map(Some)
            }
        }
    }

    /// Iterate over all remaining records, closing each one.
    pub fn records(&mut self) -> Records<'_, F, R> {
        Records {
            reader: self,
            failed: false,
        }
    }

    /// Stop reading. Further calls to [`next_record`](Self::next_record)
    /// return `None`. Calling `close` repeatedly is harmless.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        log::debug!("Closing reader after {} records", self.stats.records);
        if let Input::Gzip(gz) = &mut self.input {
            gz.close();
        }
        self.closed = true;
    }
}

/// Iterator returned by [`ArchiveReader::records`].
///
/// Stops after the first error.
pub struct Records<'a, F: RecordFormat, R: Read> {
    reader: &'a mut ArchiveReader<F, R>,
    failed: bool,
}

impl<F: RecordFormat, R: Read> Iterator for Records<'_, F, R> {
    type Item = Result<RecordSummary<F::Header>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = match self.reader.next_record() {
            Ok(Some(record)) => record.into_summary(),
            Ok(None) => return None,
            Err(e) => Err(e),
        };
        self.failed = result.is_err();
        Some(result)
    }
}
