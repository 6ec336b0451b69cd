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

//! Legacy ARC files.
//!
//! An ARC file starts with a version block whose record line begins with
//! `filedesc://`. Its payload names the file version and the layout of the
//! record lines that follow.

mod format;
mod header;
mod writer;

use std::fmt;

pub use format::ArcFormat;
pub use header::{ArcHeader, ArcRecordKind, ArcVersionHeader};
pub use writer::ArcWriter;

/// Scheme of the version block URL.
pub const FILEDESC_SCHEME: &str = "filedesc://";

/// Block description of version 1 files.
pub const VERSION_1_BLOCK_DEF: &str = "URL IP-address Archive-date Content-type Archive-length";

/// Block description of version 2 files.
pub const VERSION_2_BLOCK_DEF: &str =
    "URL IP-address Archive-date Content-type Result-code Checksum Location Offset Filename Archive-length";

/// Content type of the version block.
pub const VERSION_BLOCK_CONTENT_TYPE: &str = "text/plain";

/// Content type placeholder for records without one.
pub const NO_TYPE: &str = "no-type";

/// Known ARC versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcVersion {
    V1_0,
    V1_1,
    V2_0,
}

impl ArcVersion {
    /// Map `(version number, reserved)` from the version block.
    pub fn from_values(number: i32, reserved: i32) -> Option<Self> {
        match (number, reserved) {
            (1, 0) => Some(ArcVersion::V1_0),
            (1, 1) => Some(ArcVersion::V1_1),
            (2, 0) => Some(ArcVersion::V2_0),
            _ => None,
        }
    }

    pub fn values(&self) -> (i32, i32) {
        match self {
            ArcVersion::V1_0 => (1, 0),
            ArcVersion::V1_1 => (1, 1),
            ArcVersion::V2_0 => (2, 0),
        }
    }

    /// Record line layout used by this version.
    pub fn layout(&self) -> ArcLayout {
        match self {
            ArcVersion::V1_0 | ArcVersion::V1_1 => ArcLayout::V1,
            ArcVersion::V2_0 => ArcLayout::V2,
        }
    }
}

impl fmt::Display for ArcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (number, reserved) = self.values();
        write!(f, "{}.{}", number, reserved)
    }
}

/// Columns of a record line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArcLayout {
    #[default]
    V1,
    V2,
}

const V1_FIELDS: [&str; 5] = ["URL", "IP-address", "Archive-date", "Content-type", "Archive-length"];

const V2_FIELDS: [&str; 10] = [
    "URL",
    "IP-address",
    "Archive-date",
    "Content-type",
    "Result-code",
    "Checksum",
    "Location",
    "Offset",
    "Filename",
    "Archive-length",
];

impl ArcLayout {
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            ArcLayout::V1 => &V1_FIELDS,
            ArcLayout::V2 => &V2_FIELDS,
        }
    }

    pub fn block_description(&self) -> &'static str {
        match self {
            ArcLayout::V1 => VERSION_1_BLOCK_DEF,
            ArcLayout::V2 => VERSION_2_BLOCK_DEF,
        }
    }

    pub fn from_block_description(line: &str) -> Option<Self> {
        match line {
            VERSION_1_BLOCK_DEF => Some(ArcLayout::V1),
            VERSION_2_BLOCK_DEF => Some(ArcLayout::V2),
            _ => None,
        }
    }

    /// Layout with exactly `count` columns.
    pub fn from_field_count(count: usize) -> Option<Self> {
        match count {
            5 => Some(ArcLayout::V1),
            10 => Some(ArcLayout::V2),
            _ => None,
        }
    }
}

/// Whether `url` starts with `alpha *(alpha | digit | "+" | "-" | ".") ":"`.
pub fn starts_with_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut bytes = scheme.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions() {
        assert_eq!(ArcVersion::from_values(1, 1), Some(ArcVersion::V1_1));
        assert_eq!(ArcVersion::from_values(2, 1), None);
        assert_eq!(ArcVersion::V2_0.layout(), ArcLayout::V2);
        assert_eq!(ArcVersion::V1_1.to_string(), "1.1");
    }

    #[test]
    fn test_layouts() {
        assert_eq!(ArcLayout::from_block_description(VERSION_2_BLOCK_DEF), Some(ArcLayout::V2));
        assert_eq!(ArcLayout::from_block_description("URL IP"), None);
        assert_eq!(ArcLayout::V1.field_names().len(), 5);
        assert_eq!(ArcLayout::V2.field_names().join(" "), VERSION_2_BLOCK_DEF);
    }

    #[test]
    fn test_scheme() {
        assert!(starts_with_scheme("http://example.com/"));
        assert!(starts_with_scheme("filedesc://x.arc"));
        assert!(starts_with_scheme("dns:example.com"));
        assert!(starts_with_scheme("svn+ssh://host"));
        assert!(!starts_with_scheme("1http://x"));
        assert!(!starts_with_scheme("example.com/path"));
        assert!(!starts_with_scheme(":foo"));
    }
}
