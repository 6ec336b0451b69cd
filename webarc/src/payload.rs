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

//! Bounded, digesting view over a record payload.

use std::io::{self, Read};

use crate::digest::{DigestAlgorithm, DigestEngine};
use crate::error::{Error, Result};
use crate::stream::PushbackRead;

const SKIP_BUFFER_SIZE: usize = 8192;

/// Exposes exactly `length` bytes of a parent stream.
///
/// Every byte taken from the parent is folded into an optional digest.
/// Bytes handed back with [`unread`](PushbackRead::unread) are kept in a
/// bounded lookahead buffer and are not digested a second time.
///
/// If the parent ends early, the shortfall is reported by
/// [`unavailable`](Self::unavailable) instead of an error.
#[derive(Debug)]
pub struct Payload<S> {
    inner: S,
    length: u64,
    pulled: u64,
    unavailable: u64,
    pushback: Vec<u8>,
    pushback_capacity: usize,
    algorithm: Option<DigestAlgorithm>,
    digest: Option<DigestEngine>,
    computed_digest: Option<Vec<u8>>,
    closed: bool,
}

impl<S: Read> Payload<S> {
    /// Create a new payload view.
    ///
    /// # Arguments
    ///
    /// * `inner` - Parent stream positioned at the first payload byte
    /// * `length` - Declared payload length
    /// * `digest` - Algorithm for the running digest, if any
    /// * `pushback_capacity` - Size of the lookahead buffer
    pub fn new(inner: S, length: u64, digest: Option<DigestAlgorithm>, pushback_capacity: usize) -> Self {
        Payload {
            inner,
            length,
            pulled: 0,
            unavailable: 0,
            pushback: Vec::new(),
            pushback_capacity,
            algorithm: digest,
            digest: digest.map(DigestEngine::new),
            computed_digest: None,
            closed: false,
        }
    }

    /// Declared length.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Bytes not yet delivered to the consumer.
    pub fn remaining(&self) -> u64 {
        if self.closed {
            return 0;
        }
        self.length - self.pulled + self.pushback.len() as u64
    }

    /// Bytes missing because the parent stream ended early.
    pub fn unavailable(&self) -> u64 {
        self.unavailable
    }

    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.algorithm
    }

    /// Digest over all payload bytes, available once the payload is closed.
    pub fn computed_digest(&self) -> Option<&[u8]> {
        self.computed_digest.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the parent stream. Close the payload first to leave the parent
    /// positioned right behind the payload.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn pull(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = (self.length - self.pulled).min(buf.len() as u64) as usize;
        if want == 0 {
            return Ok(0);
        }
        let n = loop {
            match self.inner.read(&mut buf[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            self.unavailable = self.length - self.pulled;
            return Ok(0);
        }
        if let Some(digest) = self.digest.as_mut() {
            digest.update(&buf[..n]);
        }
        self.pulled += n as u64;
        Ok(n)
    }

    /// Skip all remaining bytes and finalize the digest.
    ///
    /// Calling `close` more than once has no further effect.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.pushback.clear();
        let mut skip = vec![0u8; SKIP_BUFFER_SIZE];
        while self.pulled < self.length {
            if self.pull(&mut skip)? == 0 {
                break;
            }
        }
        self.closed = true;
        self.computed_digest = self.digest.take().map(DigestEngine::finalize);
        Ok(())
    }
}

impl<S: Read> Read for Payload<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed || buf.is_empty() {
            return Ok(0);
        }
        if !self.pushback.is_empty() {
            let n = buf.len().min(self.pushback.len());
            for b in buf.iter_mut().take(n) {
                *b = self.pushback.pop().unwrap_or_default();
            }
            return Ok(n);
        }
        self.pull(buf)
    }
}

impl<S: Read> PushbackRead for Payload<S> {
    fn unread(&mut self, bytes: &[u8]) -> Result<()> {
        let requested = self.pushback.len() + bytes.len();
        if requested > self.pushback_capacity {
            return Err(Error::PushbackOverflow {
                capacity: self.pushback_capacity,
                requested,
            });
        }
        self.pushback.extend(bytes.iter().rev());
        Ok(())
    }

    /// Offset relative to the start of the payload.
    fn consumed(&self) -> u64 {
        debug_assert!(self.pushback.len() as u64 <= self.pulled);
        self.pulled.saturating_sub(self.pushback.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::compute;
    use crate::stream::ByteCountingReader;
    use std::io::Cursor;

    #[test]
    fn test_bounded_read() {
        let mut parent = ByteCountingReader::new(Cursor::new(b"0123456789rest".to_vec()), 16);
        let mut payload = Payload::new(&mut parent, 10, Some(DigestAlgorithm::Sha1), 16);
        let mut out = Vec::new();
        payload.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0123456789");
        assert_eq!(payload.remaining(), 0);
        assert_eq!(payload.unavailable(), 0);
        payload.close().unwrap();
        assert_eq!(payload.computed_digest(), Some(compute(DigestAlgorithm::Sha1, b"0123456789").as_slice()));
        drop(payload);
        assert_eq!(parent.consumed(), 10);
    }

    #[test]
    fn test_close_skips_and_is_idempotent() {
        let mut parent = ByteCountingReader::new(Cursor::new(b"abcdefXY".to_vec()), 16);
        let mut payload = Payload::new(&mut parent, 6, Some(DigestAlgorithm::Sha256), 16);
        let mut two = [0u8; 2];
        payload.read_fully(&mut two).unwrap();
        payload.close().unwrap();
        let first = payload.computed_digest().map(<[u8]>::to_vec);
        payload.close().unwrap();
        assert_eq!(payload.computed_digest().map(<[u8]>::to_vec), first);
        assert_eq!(first, Some(compute(DigestAlgorithm::Sha256, b"abcdef")));
        assert_eq!(payload.read(&mut two).unwrap(), 0);
        drop(payload);
        assert_eq!(parent.read_line().unwrap().as_deref(), Some("XY"));
    }

    #[test]
    fn test_truncation() {
        let mut payload = Payload::new(Cursor::new(b"abc".to_vec()), 10, None, 16);
        let mut out = Vec::new();
        payload.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abc");
        assert_eq!(payload.unavailable(), 7);
        payload.close().unwrap();
        assert_eq!(payload.unavailable(), 7);
        assert_eq!(payload.computed_digest(), None);
    }

    #[test]
    fn test_pushback_not_digested_twice() {
        let mut payload = Payload::new(Cursor::new(b"HTTP/1.1 200".to_vec()), 12, Some(DigestAlgorithm::Sha1), 4);
        let mut head = [0u8; 4];
        payload.read_fully(&mut head).unwrap();
        payload.unread(&head).unwrap();
        assert_eq!(payload.consumed(), 0);
        assert_eq!(payload.remaining(), 12);
        assert!(payload.unread(b"x").is_err());
        let mut out = Vec::new();
        payload.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"HTTP/1.1 200");
        payload.close().unwrap();
        assert_eq!(payload.computed_digest(), Some(compute(DigestAlgorithm::Sha1, b"HTTP/1.1 200").as_slice()));
    }
}
