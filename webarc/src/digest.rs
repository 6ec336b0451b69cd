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

//! Digest algorithms, digest descriptors and the base16/32/64 codecs used
//! to embed digests in header values.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use sha1::{Digest, Sha1};
use sha2::{Sha224, Sha256, Sha384, Sha512};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Look up an algorithm by name.
    ///
    /// Names are case-insensitive and may contain a dash (`SHA-1`, `sha256`).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "sha1" => Some(DigestAlgorithm::Sha1),
            "sha224" => Some(DigestAlgorithm::Sha224),
            "sha256" => Some(DigestAlgorithm::Sha256),
            "sha384" => Some(DigestAlgorithm::Sha384),
            "sha512" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha224 => "sha224",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Length of the raw digest in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
enum EngineState {
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

/// Running hash over a stream of bytes.
#[derive(Clone)]
pub struct DigestEngine {
    algorithm: DigestAlgorithm,
    state: EngineState,
}

impl fmt::Debug for DigestEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestEngine").field("algorithm", &self.algorithm).finish()
    }
}

impl DigestEngine {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let state = match algorithm {
            DigestAlgorithm::Sha1 => EngineState::Sha1(Sha1::new()),
            DigestAlgorithm::Sha224 => EngineState::Sha224(Sha224::new()),
            DigestAlgorithm::Sha256 => EngineState::Sha256(Sha256::new()),
            DigestAlgorithm::Sha384 => EngineState::Sha384(Sha384::new()),
            DigestAlgorithm::Sha512 => EngineState::Sha512(Sha512::new()),
        };
        DigestEngine { algorithm, state }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            EngineState::Sha1(h) => h.update(data),
            EngineState::Sha224(h) => h.update(data),
            EngineState::Sha256(h) => h.update(data),
            EngineState::Sha384(h) => h.update(data),
            EngineState::Sha512(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self.state {
            EngineState::Sha1(h) => h.finalize().to_vec(),
            EngineState::Sha224(h) => h.finalize().to_vec(),
            EngineState::Sha256(h) => h.finalize().to_vec(),
            EngineState::Sha384(h) => h.finalize().to_vec(),
            EngineState::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// Compute the digest of a complete buffer.
pub fn compute(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut engine = DigestEngine::new(algorithm);
    engine.update(data);
    engine.finalize()
}

/// Encoding of a digest value inside a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestEncoding {
    Base16,
    #[default]
    Base32,
    Base64,
}

impl DigestEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "base16" | "hex" => Some(DigestEncoding::Base16),
            "base32" => Some(DigestEncoding::Base32),
            "base64" => Some(DigestEncoding::Base64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DigestEncoding::Base16 => "base16",
            DigestEncoding::Base32 => "base32",
            DigestEncoding::Base64 => "base64",
        }
    }

    pub fn encode(&self, data: &[u8]) -> String {
        match self {
            DigestEncoding::Base16 => hex::encode(data),
            DigestEncoding::Base32 => base32_encode(data),
            DigestEncoding::Base64 => STANDARD.encode(data),
        }
    }

    /// Decode `value`, `None` if it is not valid in this encoding.
    pub fn decode(&self, value: &str) -> Option<Vec<u8>> {
        match self {
            DigestEncoding::Base16 => hex::decode(value).ok(),
            DigestEncoding::Base32 => base32_decode(value),
            DigestEncoding::Base64 => {
                if value.ends_with('=') {
                    STANDARD.decode(value).ok()
                } else {
                    STANDARD_NO_PAD.decode(value).ok()
                }
            }
        }
    }

    /// Guess the encoding of a value from its length, given the length of
    /// the raw digest it should decode to.
    ///
    /// Padded forms are checked first, then unpadded base64 and base32.
    pub fn detect(encoded_len: usize, raw_len: usize) -> Option<Self> {
        if encoded_len == (raw_len + 2) / 3 * 4 {
            Some(DigestEncoding::Base64)
        } else if encoded_len == (raw_len + 4) / 5 * 8 {
            Some(DigestEncoding::Base32)
        } else if encoded_len == raw_len * 2 {
            Some(DigestEncoding::Base16)
        } else if encoded_len == (raw_len * 4 + 2) / 3 {
            Some(DigestEncoding::Base64)
        } else if encoded_len == (raw_len * 8 + 4) / 5 {
            Some(DigestEncoding::Base32)
        } else {
            None
        }
    }
}

impl fmt::Display for DigestEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// RFC 4648 base32 with padding.
pub fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() + 4) / 5 * 8);
    for chunk in data.chunks(5) {
        let mut block = [0u8; 5];
        block[..chunk.len()].copy_from_slice(chunk);
        let bits = block.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        let symbols = (chunk.len() * 8 + 4) / 5;
        for i in 0..8 {
            if i < symbols {
                let idx = ((bits >> (35 - i * 5)) & 0x1f) as usize;
                out.push(BASE32_ALPHABET[idx] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

/// Decode RFC 4648 base32. Padding is optional and lower case is accepted.
pub fn base32_decode(value: &str) -> Option<Vec<u8>> {
    let trimmed = value.trim_end_matches('=');
    let mut out = Vec::with_capacity(trimmed.len() * 5 / 8);
    let mut buffer = 0u32;
    let mut bits = 0u32;
    for c in trimmed.bytes() {
        let v = match c.to_ascii_uppercase() {
            c @ b'A'..=b'Z' => c - b'A',
            c @ b'2'..=b'7' => c - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | u32::from(v);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    Some(out)
}

/// A digest descriptor as found in `WARC-Block-Digest` or `WARC-Payload-Digest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarcDigest {
    algorithm: String,
    value: String,
    encoding: Option<DigestEncoding>,
}

impl WarcDigest {
    /// Parse an `algorithm:value` string.
    ///
    /// The algorithm is lower-cased. Returns `None` if the colon is missing
    /// or either part is empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (algorithm, value) = s.split_once(':')?;
        let algorithm = algorithm.trim().to_ascii_lowercase();
        let value = value.trim();
        if algorithm.is_empty() || value.is_empty() {
            return None;
        }
        let encoding = DigestAlgorithm::from_name(&algorithm)
            .and_then(|a| DigestEncoding::detect(value.len(), a.output_len()));
        Some(WarcDigest {
            algorithm,
            value: value.to_string(),
            encoding,
        })
    }

    /// Build a descriptor from computed digest bytes.
    pub fn from_bytes(algorithm: DigestAlgorithm, digest: &[u8], encoding: DigestEncoding) -> Self {
        WarcDigest {
            algorithm: algorithm.as_str().to_string(),
            value: encoding.encode(digest),
            encoding: Some(encoding),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Supported algorithm matching the declared name, if any.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        DigestAlgorithm::from_name(&self.algorithm)
    }

    /// Encoded digest value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Encoding guessed from the value length, `None` if unknown.
    pub fn encoding(&self) -> Option<DigestEncoding> {
        self.encoding
    }

    /// Decode the value to raw bytes of length `raw_len`.
    ///
    /// Returns `None` if no encoding matches the value length.
    pub fn decode(&self, raw_len: usize) -> Option<DigestDecoded> {
        let encoding = DigestEncoding::detect(self.value.len(), raw_len)?;
        Some(DigestDecoded {
            encoding,
            bytes: encoding.decode(&self.value),
        })
    }
}

/// Result of decoding a declared digest value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestDecoded {
    /// Encoding chosen from the value length.
    pub encoding: DigestEncoding,
    /// Decoded bytes, `None` if the value contained invalid characters.
    pub bytes: Option<Vec<u8>>,
}

impl fmt::Display for WarcDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}
