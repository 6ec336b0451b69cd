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

use super::{WarcField, WarcRecordType, FIELD_COUNT};

/// Requirement level of a field for a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    Ignore,
    Mandatory,
    Shall,
    ShallNot,
    May,
    MayNot,
}

impl FieldPolicy {
    /// An absent value is diagnosed as wanted.
    pub fn is_required(&self) -> bool {
        matches!(self, FieldPolicy::Mandatory | FieldPolicy::Shall)
    }

    /// A present value is diagnosed as unwanted.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, FieldPolicy::ShallNot | FieldPolicy::MayNot)
    }
}

const TYPE_COUNT: usize = 9;

// Row indexes, see WarcRecordType::index
const UNKNOWN: usize = 0;
const WARCINFO: usize = 1;
const RESPONSE: usize = 2;
const RESOURCE: usize = 3;
const REQUEST: usize = 4;
const METADATA: usize = 5;
const REVISIT: usize = 6;
const CONVERSION: usize = 7;
const CONTINUATION: usize = 8;

type Matrix = [[FieldPolicy; FIELD_COUNT]; TYPE_COUNT];

const fn set(mut m: Matrix, rows: &[usize], field: WarcField, p: FieldPolicy) -> Matrix {
    let mut i = 0;
    while i < rows.len() {
        m[rows[i]][field as usize] = p;
        i += 1;
    }
    m
}

const fn build_matrix() -> Matrix {
    use FieldPolicy::*;

    let mut m = [[Ignore; FIELD_COUNT]; TYPE_COUNT];
    let all = [UNKNOWN, WARCINFO, RESPONSE, RESOURCE, REQUEST, METADATA, REVISIT, CONVERSION, CONTINUATION];
    m = set(m, &all, WarcField::RecordId, Mandatory);
    m = set(m, &all, WarcField::Type, Mandatory);
    m = set(m, &all, WarcField::Date, Mandatory);
    m = set(m, &all, WarcField::ContentLength, Mandatory);

    m = set(m, &[CONTINUATION], WarcField::ContentType, ShallNot);

    let capture = [REQUEST, RESPONSE, RESOURCE, METADATA, REVISIT];
    let no_capture = [WARCINFO, CONVERSION, CONTINUATION];
    m = set(m, &capture, WarcField::IpAddress, May);
    m = set(m, &no_capture, WarcField::IpAddress, ShallNot);
    m = set(m, &capture, WarcField::ConcurrentTo, May);
    m = set(m, &no_capture, WarcField::ConcurrentTo, ShallNot);

    m = set(m, &[METADATA, CONVERSION, REVISIT], WarcField::RefersTo, May);
    m = set(m, &[WARCINFO, REQUEST, RESPONSE, RESOURCE, CONTINUATION], WarcField::RefersTo, ShallNot);

    m = set(m, &[REQUEST, RESPONSE, RESOURCE, CONVERSION, CONTINUATION, REVISIT], WarcField::TargetUri, Shall);
    m = set(m, &[METADATA], WarcField::TargetUri, May);
    m = set(m, &[WARCINFO], WarcField::TargetUri, ShallNot);

    m = set(m, &[RESPONSE, RESOURCE, REQUEST, METADATA, REVISIT, CONVERSION, CONTINUATION], WarcField::WarcinfoId, May);
    m = set(m, &[WARCINFO], WarcField::WarcinfoId, MayNot);

    m = set(m, &[WARCINFO], WarcField::Filename, May);
    m = set(m, &[RESPONSE, RESOURCE, REQUEST, METADATA, REVISIT, CONVERSION, CONTINUATION], WarcField::Filename, ShallNot);

    m = set(m, &[REVISIT], WarcField::Profile, Mandatory);

    m = set(m, &[CONTINUATION], WarcField::SegmentOriginId, Mandatory);
    m = set(m, &[WARCINFO, RESPONSE, RESOURCE, REQUEST, METADATA, REVISIT, CONVERSION], WarcField::SegmentOriginId, ShallNot);
    m = set(m, &[CONTINUATION], WarcField::SegmentNumber, Mandatory);
    m
}

static POLICY_MATRIX: Matrix = build_matrix();

/// Look up the policy of `field` for records of type `record_type`.
pub fn policy(record_type: WarcRecordType, field: WarcField) -> FieldPolicy {
    POLICY_MATRIX[record_type.index()][field.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mandatory_everywhere() {
        for t in WarcRecordType::ALL {
            for f in [WarcField::RecordId, WarcField::Type, WarcField::Date, WarcField::ContentLength] {
                assert_eq!(policy(t, f), FieldPolicy::Mandatory, "{} {}", t, f);
            }
        }
    }

    #[test]
    fn test_type_specific() {
        use WarcRecordType::*;
        assert_eq!(policy(Continuation, WarcField::ContentType), FieldPolicy::ShallNot);
        assert_eq!(policy(Response, WarcField::TargetUri), FieldPolicy::Shall);
        assert_eq!(policy(WarcInfo, WarcField::TargetUri), FieldPolicy::ShallNot);
        assert_eq!(policy(WarcInfo, WarcField::WarcinfoId), FieldPolicy::MayNot);
        assert_eq!(policy(WarcInfo, WarcField::Filename), FieldPolicy::May);
        assert_eq!(policy(Revisit, WarcField::Profile), FieldPolicy::Mandatory);
        assert_eq!(policy(Continuation, WarcField::SegmentOriginId), FieldPolicy::Mandatory);
        assert_eq!(policy(Response, WarcField::SegmentNumber), FieldPolicy::Ignore);

        for f in WarcField::ALL {
            let p = policy(Unknown, f);
            assert!(p == FieldPolicy::Mandatory || p == FieldPolicy::Ignore);
        }
    }
}
