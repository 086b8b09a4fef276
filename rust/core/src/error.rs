// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for EHX ingestion.
//!
//! Only document-level failures are errors. Missing or unparsable domain
//! fields on a single entity are recorded as [`ParseNote`](crate::ParseNote)s
//! and never abort the build.

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting an EHX document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The byte stream is not valid UTF-8.
    #[error("EHX document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The document is not well-formed XML.
    #[error("malformed EHX document at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: u32,
        column: u32,
    },

    /// The caller requested cancellation between panel iterations.
    #[error("EHX processing was cancelled")]
    Cancelled,
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        let pos = err.pos();
        Error::Parse {
            message: err.to_string(),
            line: pos.row,
            column: pos.col,
        }
    }
}
