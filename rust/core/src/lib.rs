// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # EHX-Lite Core
//!
//! EHX document ingestion and the Level → Bundle → Panel hierarchy model,
//! built on [roxmltree](https://docs.rs/roxmltree) and
//! [slotmap](https://docs.rs/slotmap).
//!
//! ## Overview
//!
//! - **Document Ingestion**: XML bytes to an owned, pre-ordered element tree
//! - **Hierarchy Building**: nested and flat exports resolve to the same
//!   arena-backed entity graph
//! - **Identifier Indexes**: GUID lookups per entity kind, canonical
//!   (first-ingested) entry first
//! - **Label Ordering**: natural label order and bundle-number extraction
//!
//! ## Quick Start
//!
//! ```rust
//! use ehx_lite_core::{build_hierarchy, Document, Guid};
//!
//! let xml = r#"<EHX>
//!   <Level><LevelGuid>L1</LevelGuid><LevelNo>1</LevelNo></Level>
//!   <Bundle><BundleGuid>B1</BundleGuid><LevelGuid>L1</LevelGuid><Label>B1</Label></Bundle>
//!   <Panel><PanelGuid>P1</PanelGuid><BundleGuid>B1</BundleGuid><Label>05-100</Label></Panel>
//! </EHX>"#;
//!
//! let doc = Document::parse_str(xml)?;
//! let hierarchy = build_hierarchy(&doc)?;
//!
//! let panel = hierarchy.panel_by_guid(&Guid::new("P1").unwrap()).unwrap();
//! assert_eq!(hierarchy.panel(panel).unwrap().label, "05-100");
//! # Ok::<(), ehx_lite_core::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization of entities and keys

pub mod builder;
pub mod cancel;
pub mod document;
pub mod error;
pub mod guid;
pub mod keys;
pub mod label;
pub mod model;
pub mod schema;

pub use builder::{build_hierarchy, HierarchyBuilder};
pub use cancel::CancelFlag;
pub use document::{Document, Element, ElementId};
pub use error::{Error, Result};
pub use guid::{Guid, IngestIndex};
pub use keys::{BundleKey, EntityKind, LevelKey, MaterialKey, PanelKey, SubAssemblyKey};
pub use label::{bundle_number, natural_cmp, natural_sort};
pub use model::{
    Bundle, Geometry, GuidMatches, Hierarchy, Level, Material, Panel, ParseNote, SubAssembly,
};
pub use schema::{parse_number, MaterialKind, RoleTag, SubAssemblyKind};
