// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the EHX processing pipeline.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a pipeline run. No partial project is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Ingestion failed or was cancelled.
    #[error(transparent)]
    Core(#[from] ehx_lite_core::Error),

    /// The input exceeds the configured size limit.
    #[error("EHX document is {size_mb} MB, limit is {max_mb} MB")]
    DocumentTooLarge { size_mb: usize, max_mb: usize },

    /// A material was listed under a subassembly or panel it does not
    /// reference.
    #[error("material at {ingest} is listed under subassembly {scope} but references {actual}")]
    IsolationBreach {
        ingest: ehx_lite_core::IngestIndex,
        scope: String,
        actual: String,
    },
}

impl Error {
    /// Returns `true` if the run stopped because cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Core(ehx_lite_core::Error::Cancelled))
    }
}
