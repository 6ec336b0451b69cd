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

use std::io::{self, Write};

use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::GzipHeader;

/// Writes a single GZip member.
///
/// The header is written on construction, the trailer on [`finish`](Self::finish).
pub struct GzipMemberWriter<W: Write> {
    encoder: DeflateEncoder<W>,
    crc: crc32fast::Hasher,
    size: u64,
}

impl<W: Write> GzipMemberWriter<W> {
    pub fn new(mut out: W, header: &GzipHeader, level: Compression) -> io::Result<Self> {
        header.write(&mut out)?;
        Ok(GzipMemberWriter {
            encoder: DeflateEncoder::new(out, level),
            crc: crc32fast::Hasher::new(),
            size: 0,
        })
    }

    /// Uncompressed bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Flush the deflate stream, write the trailer and return the sink.
    pub fn finish(self) -> io::Result<W> {
        let crc32 = self.crc.finalize();
        let mut out = self.encoder.finish()?;
        out.write_all(&crc32.to_le_bytes())?;
        out.write_all(&((self.size & 0xffff_ffff) as u32).to_le_bytes())?;
        Ok(out)
    }
}

impl<W: Write> Write for GzipMemberWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.encoder.write(buf)?;
        self.crc.update(&buf[..n]);
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

/// Writes complete GZip members to a sink.
pub struct GzipWriter<W: Write> {
    out: W,
    level: Compression,
    members: u64,
}

impl<W: Write> GzipWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_level(out, Compression::default())
    }

    pub fn with_level(out: W, level: Compression) -> Self {
        GzipWriter { out, level, members: 0 }
    }

    pub fn members(&self) -> u64 {
        self.members
    }

    /// Compress `data` into one member.
    pub fn write_member(&mut self, header: &GzipHeader, data: &[u8]) -> io::Result<()> {
        let mut member = GzipMemberWriter::new(&mut self.out, header, self.level)?;
        member.write_all(data)?;
        member.finish()?;
        self.members += 1;
        Ok(())
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::MultiGzDecoder;
    use std::io::Read;

    #[test]
    fn test_members_are_standard_gzip() {
        let mut writer = GzipWriter::with_level(Vec::new(), Compression::best());
        writer.write_member(&GzipHeader::new().with_name("a.txt"), b"hello ").unwrap();
        writer.write_member(&GzipHeader::new(), b"world").unwrap();
        assert_eq!(writer.members(), 2);

        let mut out = String::new();
        MultiGzDecoder::new(writer.into_inner().as_slice()).read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_member_writer_trailer() {
        let mut member = GzipMemberWriter::new(Vec::new(), &GzipHeader::new(), Compression::fast()).unwrap();
        member.write_all(b"abc").unwrap();
        assert_eq!(member.size(), 3);
        let bytes = member.finish().unwrap();
        let n = bytes.len();
        assert_eq!(&bytes[n - 4..], &3u32.to_le_bytes());
        assert_eq!(&bytes[n - 8..n - 4], &crc32fast::hash(b"abc").to_le_bytes());
    }
}
