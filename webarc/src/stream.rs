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

//! Offset-tracking byte streams with bounded push-back.

use std::io::{self, Read};

use encoding::all::ISO_8859_1;
use encoding::{DecoderTrap, Encoding};

use crate::error::{Error, Result};

/// Default push-back capacity of a [`ByteCountingReader`].
pub const DEFAULT_PUSHBACK_CAPACITY: usize = 8192;

/// A byte stream that knows how many bytes it has handed out and can take
/// bytes back.
///
/// [`consumed`](PushbackRead::consumed) is the net number of bytes delivered
/// minus the bytes pushed back, i.e. the position a caller would seek to in
/// order to resume at the next unread byte.
pub trait PushbackRead: Read {
    /// Push back bytes previously read. The next read returns `bytes` first,
    /// in the same order.
    fn unread(&mut self, bytes: &[u8]) -> Result<()>;

    /// Net number of bytes consumed so far.
    fn consumed(&self) -> u64;

    /// Read a single byte, `None` on EOF.
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut b = [0u8; 1];
        loop {
            match self.read(&mut b) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(b[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Fill `buf` as far as possible and return the number of bytes read.
    /// A return value smaller than `buf.len()` means EOF was reached.
    fn read_fully(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Read one line terminated by `\n` with a trailing `\r` stripped.
    ///
    /// Returns `None` only if EOF is hit before any byte was read. A final
    /// line without terminator is returned as is.
    fn read_line_bytes(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let mut any = false;
        while let Some(b) = self.read_byte()? {
            any = true;
            if b == b'\n' {
                break;
            }
            line.push(b);
        }
        if !any {
            return Ok(None);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Read one line and decode it as ISO-8859-1.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.read_line_bytes()?.map(|l| decode_latin1(&l)))
    }
}

impl<T: PushbackRead + ?Sized> PushbackRead for &mut T {
    fn unread(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).unread(bytes)
    }

    fn consumed(&self) -> u64 {
        (**self).consumed()
    }
}

pub(crate) fn decode_latin1(bytes: &[u8]) -> String {
    ISO_8859_1
        .decode(bytes, DecoderTrap::Replace)
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

/// Wraps a reader, counts consumed bytes and offers a bounded push-back buffer.
#[derive(Debug)]
pub struct ByteCountingReader<R> {
    inner: R,
    // Stored in reverse, the last element is the next byte to be read.
    pushback: Vec<u8>,
    capacity: usize,
    consumed: u64,
}

impl<R: Read> ByteCountingReader<R> {
    /// Create a new reader.
    ///
    /// # Arguments
    ///
    /// * `inner` - Source stream
    /// * `capacity` - Maximum number of bytes that can be pushed back at once
    pub fn new(inner: R, capacity: usize) -> Self {
        Self::with_offset(inner, capacity, 0)
    }

    /// Create a new reader whose consumed counter starts at `offset`.
    ///
    /// Useful for streams that were seeked to a known position beforehand.
    pub fn with_offset(inner: R, capacity: usize, offset: u64) -> Self {
        ByteCountingReader {
            inner,
            pushback: Vec::new(),
            capacity,
            consumed: offset,
        }
    }

    /// Rebuild a reader from the parts returned by [`into_parts`](Self::into_parts).
    pub(crate) fn from_parts(inner: R, capacity: usize, pending: Vec<u8>, consumed: u64) -> Self {
        let mut pushback = pending;
        pushback.reverse();
        let capacity = capacity.max(pushback.len());
        ByteCountingReader {
            inner,
            pushback,
            capacity,
            consumed,
        }
    }

    /// Split into inner reader, pending push-back bytes (in read order) and
    /// the consumed counter.
    pub(crate) fn into_parts(self) -> (R, Vec<u8>, u64) {
        let mut pending = self.pushback;
        pending.reverse();
        (self.inner, pending, self.consumed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pushed back bytes waiting to be read again.
    pub fn pending(&self) -> usize {
        self.pushback.len()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the inner reader. Pending push-back bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Skip up to `n` bytes and return the number of bytes actually skipped.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        io::copy(&mut self.by_ref().take(n), &mut io::sink())
    }
}

impl<R: Read> Read for ByteCountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = if !self.pushback.is_empty() {
            let n = buf.len().min(self.pushback.len());
            for b in buf.iter_mut().take(n) {
                // n never exceeds the buffered length
                *b = self.pushback.pop().unwrap_or_default();
            }
            n
        } else {
            self.inner.read(buf)?
        };
        self.consumed += n as u64;
        Ok(n)
    }
}

impl<R: Read> PushbackRead for ByteCountingReader<R> {
    fn unread(&mut self, bytes: &[u8]) -> Result<()> {
        let requested = self.pushback.len() + bytes.len();
        if requested > self.capacity {
            return Err(Error::PushbackOverflow {
                capacity: self.capacity,
                requested,
            });
        }
        self.pushback.extend(bytes.iter().rev());
        self.consumed = self.consumed.saturating_sub(bytes.len() as u64);
        Ok(())
    }

    fn consumed(&self) -> u64 {
        self.consumed
    }
}
