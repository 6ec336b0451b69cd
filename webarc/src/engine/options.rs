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

//! Reader configuration.

use crate::digest::{DigestAlgorithm, DigestEncoding, WarcDigest};
use crate::gzip::DEFAULT_INPUT_BUFFER_SIZE;

/// How the input stream is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputCompression {
    /// Detect GZip by peeking at the magic number.
    #[default]
    Auto,
    /// Plain, uncompressed records.
    None,
    /// One or more records per GZip member.
    Gzip,
}

/// Options for [`ArchiveReader`](crate::ArchiveReader).
///
/// # Example
///
/// ```rust
/// use webarc::{DigestAlgorithm, ReaderOptions};
///
/// let options = ReaderOptions::default()
///     .block_digest(true)
///     .block_digest_algorithm(Some(DigestAlgorithm::Sha1))
///     .start_offset(1024);
/// assert!(options.block_digest);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    pub compression: InputCompression,
    /// Offset the stream was positioned at by the caller.
    pub start_offset: u64,
    /// Compute a digest over every record block.
    pub block_digest: bool,
    /// Algorithm used when a record declares no block digest.
    pub block_digest_algorithm: Option<DigestAlgorithm>,
    /// Encoding of computed block digest descriptors.
    pub block_digest_encoding: DigestEncoding,
    /// Compute a digest over every embedded HTTP body.
    pub payload_digest: bool,
    /// Algorithm used when a record declares no payload digest.
    pub payload_digest_algorithm: Option<DigestAlgorithm>,
    /// Encoding of computed payload digest descriptors.
    pub payload_digest_encoding: DigestEncoding,
    /// Header blocks larger than this are diagnosed.
    pub record_header_max_size: usize,
    /// Largest embedded HTTP header that can be sniffed.
    pub payload_header_max_size: usize,
    /// Compressed input buffer size.
    pub input_buffer_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            compression: InputCompression::Auto,
            start_offset: 0,
            block_digest: false,
            block_digest_algorithm: None,
            block_digest_encoding: DigestEncoding::Base32,
            payload_digest: false,
            payload_digest_algorithm: None,
            payload_digest_encoding: DigestEncoding::Base32,
            record_header_max_size: 8192,
            payload_header_max_size: 32768,
            input_buffer_size: DEFAULT_INPUT_BUFFER_SIZE,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compression(mut self, compression: InputCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    pub fn block_digest(mut self, enabled: bool) -> Self {
        self.block_digest = enabled;
        self
    }

    pub fn block_digest_algorithm(mut self, algorithm: Option<DigestAlgorithm>) -> Self {
        self.block_digest_algorithm = algorithm;
        self
    }

    pub fn block_digest_encoding(mut self, encoding: DigestEncoding) -> Self {
        self.block_digest_encoding = encoding;
        self
    }

    pub fn payload_digest(mut self, enabled: bool) -> Self {
        self.payload_digest = enabled;
        self
    }

    pub fn payload_digest_algorithm(mut self, algorithm: Option<DigestAlgorithm>) -> Self {
        self.payload_digest_algorithm = algorithm;
        self
    }

    pub fn payload_digest_encoding(mut self, encoding: DigestEncoding) -> Self {
        self.payload_digest_encoding = encoding;
        self
    }

    pub fn record_header_max_size(mut self, size: usize) -> Self {
        self.record_header_max_size = size;
        self
    }

    pub fn payload_header_max_size(mut self, size: usize) -> Self {
        self.payload_header_max_size = size;
        self
    }

    pub fn input_buffer_size(mut self, size: usize) -> Self {
        self.input_buffer_size = size;
        self
    }

    pub(crate) fn block_algorithm_for(&self, declared: Option<&WarcDigest>) -> Option<DigestAlgorithm> {
        select_algorithm(self.block_digest, declared, self.block_digest_algorithm)
    }

    pub(crate) fn payload_algorithm_for(&self, declared: Option<&WarcDigest>) -> Option<DigestAlgorithm> {
        select_algorithm(self.payload_digest, declared, self.payload_digest_algorithm)
    }
}

/// The declared algorithm wins over the configured one. A declared but
/// unsupported algorithm disables digesting.
fn select_algorithm(
    enabled: bool,
    declared: Option<&WarcDigest>,
    configured: Option<DigestAlgorithm>,
) -> Option<DigestAlgorithm> {
    if !enabled {
        return None;
    }
    match declared {
        Some(d) => {
            let algorithm = d.digest_algorithm();
            if algorithm.is_none() {
                log::debug!("Unsupported digest algorithm '{}'", d.algorithm());
            }
            algorithm
        }
        None => configured,
    }
}
