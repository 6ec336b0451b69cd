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

//! Byte-level tokenizer for `Name: value` header lines.

use crate::error::Result;
use crate::stream::{decode_latin1, PushbackRead};

/// One logical header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderLine {
    /// A line without name/value structure. The empty line terminating a
    /// header block is `Line("")`.
    Line(String),
    /// A header field with folded continuation lines joined by a single space.
    Field { name: String, value: String },
}

impl HeaderLine {
    pub fn is_blank(&self) -> bool {
        matches!(self, HeaderLine::Line(l) if l.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Line,
    Name,
    Value,
    Lws,
    QuotedText,
    QuotedPair,
    QuotedLws,
}

/// Separators as defined by RFC 2616, section 2.2.
fn is_separator(b: u8) -> bool {
    b"()<>@,;:\\\"/[]?={} \t".contains(&b)
}

fn is_token(b: u8) -> bool {
    b > 0x20 && b < 0x7f && !is_separator(b)
}

/// Reads header lines from a push-back stream.
///
/// Names are restricted to RFC 2616 tokens. Separator and control bytes are
/// dropped from names. Values may contain UTF-8 sequences, quoted strings and
/// folded continuation lines. Quoted strings are kept verbatim including
/// their quotes and escapes.
#[derive(Debug, Default, Clone)]
pub struct HeaderLineReader {
    bare_lf: usize,
}

impl HeaderLineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines seen so far that ended in a bare `\n` instead of `\r\n`.
    pub fn bare_lf_count(&self) -> usize {
        self.bare_lf
    }

    /// Read the next logical line, `None` at EOF.
    pub fn read_line<S: PushbackRead + ?Sized>(&mut self, stream: &mut S) -> Result<Option<HeaderLine>> {
        let mut state = State::Start;
        let mut raw: Vec<u8> = Vec::new();
        let mut name: Vec<u8> = Vec::new();
        let mut value = String::new();
        let mut prev_cr = false;
        let mut skip_ws = false;

        loop {
            let b = match stream.read_byte()? {
                Some(b) => b,
                None => return Ok(Self::finish_eof(state, &raw, &name, value)),
            };
            if matches!(state, State::Lws | State::QuotedLws) && b != b' ' && b != b'\t' {
                // Not a continuation, the byte belongs to the next line.
                stream.unread(&[b])?;
                return Ok(Some(Self::field(&name, value)));
            }
            if b == b'\r' {
                prev_cr = true;
                continue;
            }
            if b == b'\n' && !prev_cr {
                self.bare_lf += 1;
            }
            prev_cr = false;

            match state {
                State::Start => match b {
                    b'\n' => return Ok(Some(HeaderLine::Line(String::new()))),
                    b' ' | b'\t' => {
                        raw.push(b);
                        state = State::Line;
                    }
                    _ => {
                        raw.push(b);
                        state = State::Name;
                        if b == b':' {
                            state = State::Value;
                            skip_ws = true;
                        } else if is_token(b) {
                            name.push(b);
                        }
                    }
                },
                State::Line => {
                    if b == b'\n' {
                        return Ok(Some(HeaderLine::Line(decode_latin1(&raw))));
                    }
                    raw.push(b);
                }
                State::Name => match b {
                    b'\n' => return Ok(Some(HeaderLine::Line(decode_latin1(&raw)))),
                    b':' => {
                        state = State::Value;
                        skip_ws = true;
                    }
                    _ => {
                        raw.push(b);
                        if is_token(b) {
                            name.push(b);
                        }
                    }
                },
                State::Value => match b {
                    b'\n' => state = State::Lws,
                    b' ' | b'\t' if skip_ws => {}
                    b'"' => {
                        skip_ws = false;
                        value.push('"');
                        state = State::QuotedText;
                    }
                    _ => {
                        skip_ws = false;
                        Self::push_value_byte(stream, b, &mut value)?;
                    }
                },
                State::Lws => {
                    value.push(' ');
                    skip_ws = true;
                    state = State::Value;
                }
                State::QuotedText => match b {
                    b'"' => {
                        value.push('"');
                        state = State::Value;
                    }
                    b'\\' => {
                        value.push('\\');
                        state = State::QuotedPair;
                    }
                    b'\n' => state = State::QuotedLws,
                    _ => Self::push_value_byte(stream, b, &mut value)?,
                },
                State::QuotedPair => {
                    if b == b'\n' {
                        state = State::QuotedLws;
                    } else {
                        Self::push_value_byte(stream, b, &mut value)?;
                        state = State::QuotedText;
                    }
                }
                State::QuotedLws => {
                    // Folded line inside an unterminated quoted string.
                    value.push(' ');
                    state = State::QuotedText;
                }
            }
        }
    }

    fn field(name: &[u8], value: String) -> HeaderLine {
        HeaderLine::Field {
            name: String::from_utf8_lossy(name).into_owned(),
            value: value.trim().to_string(),
        }
    }

    fn finish_eof(state: State, raw: &[u8], name: &[u8], value: String) -> Option<HeaderLine> {
        match state {
            State::Start => None,
            State::Line | State::Name => Some(HeaderLine::Line(decode_latin1(raw))),
            _ => Some(Self::field(name, value)),
        }
    }

    /// Append a value byte, decoding UTF-8 sequences. Control bytes other
    /// than tab and broken sequences are dropped.
    fn push_value_byte<S: PushbackRead + ?Sized>(stream: &mut S, b: u8, value: &mut String) -> Result<()> {
        if b < 0x80 {
            if b == b'\t' || (b >= 0x20 && b != 0x7f) {
                value.push(b as char);
            }
            return Ok(());
        }
        let (len, mut cp) = match b {
            0xc0..=0xdf => (2, u32::from(b & 0x1f)),
            0xe0..=0xef => (3, u32::from(b & 0x0f)),
            0xf0..=0xf7 => (4, u32::from(b & 0x07)),
            _ => return Ok(()),
        };
        for _ in 1..len {
            match stream.read_byte()? {
                Some(c) if c & 0xc0 == 0x80 => cp = (cp << 6) | u32::from(c & 0x3f),
                Some(c) => {
                    // Not a continuation byte, let the state machine see it.
                    stream.unread(&[c])?;
                    return Ok(());
                }
                None => return Ok(()),
            }
        }
        if let Some(c) = char::from_u32(cp) {
            value.push(c);
        }
        Ok(())
    }
}
