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

//! Error types for fatal failures.
//!
//! Compliance problems found in archive data are never reported through
//! [`Error`]. They are collected as [`Diagnosis`](crate::Diagnosis) values on
//! the record or reader that observed them.

use std::io;

use thiserror::Error;

/// Fatal failure while reading or writing an archive.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure of the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A GZip member header or trailer could not be read.
    #[error("invalid GZip member at offset {offset}: {reason}")]
    InvalidGzip {
        /// Offset of the member in the compressed stream.
        offset: u64,
        /// What went wrong.
        reason: String,
    },

    /// More bytes were pushed back than the lookahead buffer can hold.
    #[error("push-back of {requested} bytes exceeds lookahead capacity of {capacity} bytes")]
    PushbackOverflow {
        /// Configured lookahead capacity.
        capacity: usize,
        /// Bytes that would have been buffered.
        requested: usize,
    },

    /// Writer operation called out of order.
    #[error("cannot {operation} while writer is in state {state}")]
    WriterState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the writer was in.
        state: &'static str,
    },

    /// Invalid argument passed by the caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Create an [`Error::InvalidGzip`].
    pub fn invalid_gzip(offset: u64, reason: impl Into<String>) -> Self {
        Error::InvalidGzip {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether this error originates from the writer state machine.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::WriterState { .. } | Error::InvalidArgument(_))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::PushbackOverflow { .. } => io::Error::new(io::ErrorKind::OutOfMemory, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Result alias for fallible operations of this crate.
pub type Result<T> = std::result::Result<T, Error>;
