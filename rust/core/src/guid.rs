// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier tokens and ingestion ordering.
//!
//! EHX GUIDs are treated as opaque tokens: they are compared for equality
//! only, and uniqueness is scoped to the entity kind that declares them.

use std::fmt;
use std::sync::Arc;

/// An opaque EHX identifier (`LevelGuid`, `PanelGuid`, `BoardGuid`, ...).
///
/// Cloning is cheap; the token text is shared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Guid(Arc<str>);

impl Guid {
    /// Creates a GUID from raw element text.
    ///
    /// Surrounding whitespace is stripped. Returns `None` for blank text so
    /// that an empty `<PanelGuid/>` is treated the same as a missing one.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Guid(Arc::from(trimmed)))
        }
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", &self.0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Guid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Sequential position of an entity's element in document order.
///
/// Every tie-break in the pipeline resolves to "lowest ingestion index
/// wins".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IngestIndex(pub u32);

impl fmt::Display for IngestIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
