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

//! Ordered header blocks and case-insensitive header names.

use std::hash::{Hash, Hasher};
use std::io;

use crate::stream::decode_latin1;

/// Case-insensitive string key for headers.
#[derive(Debug, Eq, Clone)]
pub struct CaseInsensitiveKey(String);

impl CaseInsensitiveKey {
    pub fn new(s: impl Into<String>) -> Self {
        CaseInsensitiveKey(s.into())
    }

    /// Key with its original casing.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for CaseInsensitiveKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Hash for CaseInsensitiveKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl From<&str> for CaseInsensitiveKey {
    fn from(s: &str) -> Self {
        CaseInsensitiveKey(s.to_string())
    }
}

impl From<String> for CaseInsensitiveKey {
    fn from(s: String) -> Self {
        CaseInsensitiveKey(s)
    }
}

impl From<CaseInsensitiveKey> for String {
    fn from(key: CaseInsensitiveKey) -> Self {
        key.0
    }
}

/// Byte encoding of header names and values.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum HeaderEncoding {
    /// UTF-8, used for WARC headers.
    Unicode,
    /// ISO-8859-1, used for HTTP and ARC headers.
    Latin1,
}

/// Ordered header block with an optional status line.
///
/// Used for embedded HTTP headers and for serializing WARC header blocks.
/// Duplicate names are preserved in insertion order.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    encoding: HeaderEncoding,
    status_line: Vec<u8>,
    headers: Vec<(Vec<u8>, Vec<u8>)>,
}

impl HeaderMap {
    pub fn new(encoding: HeaderEncoding) -> Self {
        HeaderMap {
            encoding,
            status_line: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn encoding(&self) -> HeaderEncoding {
        self.encoding
    }

    /// Status line decoded with the header encoding.
    pub fn status_line(&self) -> String {
        self.decode(&self.status_line)
    }

    pub fn status_line_bytes(&self) -> &[u8] {
        &self.status_line
    }

    pub fn set_status_line(&mut self, status_line: impl AsRef<[u8]>) {
        self.status_line = status_line.as_ref().to_vec();
    }

    fn status_parts(&self) -> Option<std::slice::SplitN<'_, u8, impl FnMut(&u8) -> bool>> {
        if !self.status_line.starts_with(b"HTTP/") {
            return None;
        }
        Some(self.status_line.splitn(3, |&b| b == b' '))
    }

    /// HTTP protocol token of the status line, e.g. `HTTP/1.1`.
    pub fn protocol(&self) -> Option<String> {
        let mut parts = self.status_parts()?;
        Some(self.decode(parts.next()?))
    }

    /// HTTP status code, `None` if this is not an HTTP header block.
    pub fn status_code(&self) -> Option<u16> {
        let mut parts = self.status_parts()?;
        parts.next()?;
        std::str::from_utf8(parts.next()?).ok()?.trim().parse().ok()
    }

    /// HTTP reason phrase, `None` if absent.
    pub fn reason_phrase(&self) -> Option<String> {
        let mut parts = self.status_parts()?;
        parts.next()?;
        parts.next()?;
        Some(self.decode(parts.next()?))
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match self.encoding {
            HeaderEncoding::Unicode => String::from_utf8_lossy(bytes).into_owned(),
            HeaderEncoding::Latin1 => decode_latin1(bytes),
        }
    }

    /// Value of a (case-insensitive) header. Duplicates are joined with `","`.
    pub fn get(&self, key: &str) -> Option<String> {
        let values = self.get_all(key);
        if values.is_empty() {
            None
        } else {
            Some(values.join(","))
        }
    }

    /// All values of a (case-insensitive) header in order of occurrence.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key.as_bytes()))
            .map(|(_, v)| self.decode(v))
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(key.as_bytes()))
    }

    /// Replace the first occurrence of `key` and drop all later ones, or
    /// append the header if it does not exist yet.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        let key = key.as_ref().trim().as_bytes();
        let value = value.as_ref().trim().as_bytes();
        let mut found = false;
        self.headers.retain_mut(|(k, v)| {
            if !k.eq_ignore_ascii_case(key) {
                true
            } else if !found {
                *v = value.to_vec();
                found = true;
                true
            } else {
                false
            }
        });
        if !found {
            self.headers.push((key.to_vec(), value.to_vec()));
        }
    }

    /// Append a header without checking for existing ones.
    pub fn append(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        self.append_bytes(key.as_ref().as_bytes(), value.as_ref().as_bytes());
    }

    pub fn append_bytes(&mut self, key: &[u8], value: &[u8]) {
        self.headers.push((key.trim_ascii().to_vec(), value.trim_ascii().to_vec()));
    }

    /// Remove all occurrences of `key`. Returns whether any were removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.headers.len();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key.as_bytes()));
        before != self.headers.len()
    }

    /// Extend the value of the last header by a folded continuation line.
    pub(crate) fn add_continuation(&mut self, value: &[u8]) {
        match self.headers.last_mut() {
            Some((_, last)) => {
                if !last.is_empty() {
                    last.push(b' ');
                }
                last.extend_from_slice(value.trim_ascii());
            }
            None => self.headers.push((Vec::new(), value.trim_ascii().to_vec())),
        }
    }

    /// Iterator over decoded `(name, value)` pairs.
    pub fn items(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.headers.iter().map(|(k, v)| (self.decode(k), self.decode(v)))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn clear(&mut self) {
        self.headers.clear();
        self.status_line.clear();
    }

    /// Serialize status line and headers, each terminated by CRLF. The
    /// blank line ending the block is not written.
    ///
    /// Line breaks inside values are replaced by spaces.
    pub fn write<W: io::Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut written = 0usize;
        if !self.status_line.is_empty() {
            writer.write_all(&self.status_line)?;
            writer.write_all(b"\r\n")?;
            written += self.status_line.len() + 2;
        }
        for (key, value) in &self.headers {
            if !key.is_empty() {
                writer.write_all(key)?;
                writer.write_all(b": ")?;
                written += key.len() + 2;
            }
            let sanitized: Vec<u8> = value
                .iter()
                .map(|&b| if b == b'\r' || b == b'\n' { b' ' } else { b })
                .collect();
            writer.write_all(&sanitized)?;
            writer.write_all(b"\r\n")?;
            written += sanitized.len() + 2;
        }
        Ok(written)
    }
}
