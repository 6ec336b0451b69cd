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

//! WARC (ISO 28500) records.

mod format;
mod header;
mod policy;
mod writer;

use std::fmt;

pub use format::WarcFormat;
pub use header::{WarcHeader, WarcProfile, WarcTruncated};
pub use policy::{policy, FieldPolicy};
pub use writer::{WarcRecordBuilder, WarcWriter};

/// Versions this crate knows about, as `(major, minor)`.
pub const KNOWN_VERSIONS: [(i32, i32); 4] = [(0, 17), (0, 18), (1, 0), (1, 1)];

/// Magic prefix of the first line of every record.
pub const MAGIC: &str = "WARC/";

/// Content type expected for `warcinfo` blocks.
pub const WARC_FIELDS_CONTENT_TYPE: &str = "application/warc-fields";

/// WARC record type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarcRecordType {
    WarcInfo,
    Response,
    Resource,
    Request,
    Metadata,
    Revisit,
    Conversion,
    Continuation,
    Unknown,
}

impl WarcRecordType {
    pub const ALL: [WarcRecordType; 9] = [
        WarcRecordType::Unknown,
        WarcRecordType::WarcInfo,
        WarcRecordType::Response,
        WarcRecordType::Resource,
        WarcRecordType::Request,
        WarcRecordType::Metadata,
        WarcRecordType::Revisit,
        WarcRecordType::Conversion,
        WarcRecordType::Continuation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WarcRecordType::WarcInfo => "warcinfo",
            WarcRecordType::Response => "response",
            WarcRecordType::Resource => "resource",
            WarcRecordType::Request => "request",
            WarcRecordType::Metadata => "metadata",
            WarcRecordType::Revisit => "revisit",
            WarcRecordType::Conversion => "conversion",
            WarcRecordType::Continuation => "continuation",
            WarcRecordType::Unknown => "unknown",
        }
    }

    /// Row in the field policy matrix.
    pub fn index(&self) -> usize {
        match self {
            WarcRecordType::Unknown => 0,
            WarcRecordType::WarcInfo => 1,
            WarcRecordType::Response => 2,
            WarcRecordType::Resource => 3,
            WarcRecordType::Request => 4,
            WarcRecordType::Metadata => 5,
            WarcRecordType::Revisit => 6,
            WarcRecordType::Conversion => 7,
            WarcRecordType::Continuation => 8,
        }
    }
}

impl TryFrom<&str> for WarcRecordType {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "warcinfo" => Ok(WarcRecordType::WarcInfo),
            "response" => Ok(WarcRecordType::Response),
            "resource" => Ok(WarcRecordType::Resource),
            "request" => Ok(WarcRecordType::Request),
            "metadata" => Ok(WarcRecordType::Metadata),
            "revisit" => Ok(WarcRecordType::Revisit),
            "conversion" => Ok(WarcRecordType::Conversion),
            "continuation" => Ok(WarcRecordType::Continuation),
            _ => Err("Unknown record type."),
        }
    }
}

impl From<WarcRecordType> for &'static str {
    fn from(value: WarcRecordType) -> Self {
        value.as_str()
    }
}

impl fmt::Display for WarcRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header fields with a typed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarcField {
    Type,
    RecordId,
    Date,
    ContentLength,
    ContentType,
    ConcurrentTo,
    BlockDigest,
    PayloadDigest,
    IpAddress,
    RefersTo,
    TargetUri,
    Truncated,
    WarcinfoId,
    Filename,
    Profile,
    IdentifiedPayloadType,
    SegmentOriginId,
    SegmentNumber,
    SegmentTotalLength,
}

/// Number of [`WarcField`] variants.
pub const FIELD_COUNT: usize = 19;

impl WarcField {
    pub const ALL: [WarcField; FIELD_COUNT] = [
        WarcField::Type,
        WarcField::RecordId,
        WarcField::Date,
        WarcField::ContentLength,
        WarcField::ContentType,
        WarcField::ConcurrentTo,
        WarcField::BlockDigest,
        WarcField::PayloadDigest,
        WarcField::IpAddress,
        WarcField::RefersTo,
        WarcField::TargetUri,
        WarcField::Truncated,
        WarcField::WarcinfoId,
        WarcField::Filename,
        WarcField::Profile,
        WarcField::IdentifiedPayloadType,
        WarcField::SegmentOriginId,
        WarcField::SegmentNumber,
        WarcField::SegmentTotalLength,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WarcField::Type => "WARC-Type",
            WarcField::RecordId => "WARC-Record-ID",
            WarcField::Date => "WARC-Date",
            WarcField::ContentLength => "Content-Length",
            WarcField::ContentType => "Content-Type",
            WarcField::ConcurrentTo => "WARC-Concurrent-To",
            WarcField::BlockDigest => "WARC-Block-Digest",
            WarcField::PayloadDigest => "WARC-Payload-Digest",
            WarcField::IpAddress => "WARC-IP-Address",
            WarcField::RefersTo => "WARC-Refers-To",
            WarcField::TargetUri => "WARC-Target-URI",
            WarcField::Truncated => "WARC-Truncated",
            WarcField::WarcinfoId => "WARC-Warcinfo-ID",
            WarcField::Filename => "WARC-Filename",
            WarcField::Profile => "WARC-Profile",
            WarcField::IdentifiedPayloadType => "WARC-Identified-Payload-Type",
            WarcField::SegmentOriginId => "WARC-Segment-Origin-ID",
            WarcField::SegmentNumber => "WARC-Segment-Number",
            WarcField::SegmentTotalLength => "WARC-Segment-Total-Length",
        }
    }

    /// Column in the field policy matrix.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Whether the field may occur more than once.
    pub fn is_repeatable(&self) -> bool {
        matches!(self, WarcField::ConcurrentTo)
    }
}

impl fmt::Display for WarcField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
