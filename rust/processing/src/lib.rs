// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # EHX-Lite Processing
//!
//! The EHX pipeline on top of [`ehx_lite_core`]: rough-opening/header
//! association, first-wins deduplication, per-subassembly isolation,
//! canonical sorting, beam pocket and junction derivation, validation.
//!
//! ```rust
//! use ehx_lite_core::Guid;
//! use ehx_lite_processing::{process, PipelineConfig};
//!
//! let xml = br#"<EHX><Level><LevelGuid>L1</LevelGuid><LevelNo>1</LevelNo>
//!   <Bundle><BundleGuid>B1</BundleGuid><Label>B1</Label>
//!     <Panel><PanelGuid>P1</PanelGuid><Label>05-100</Label>
//!       <SubAssembly><SubAssemblyGuid>J</SubAssemblyGuid><SubAssemblyName>LType</SubAssemblyName></SubAssembly>
//!     </Panel>
//!   </Bundle></Level></EHX>"#;
//!
//! let project = process(xml, &PipelineConfig::default())?;
//! let panel = project.hierarchy().panel_by_guid(&Guid::new("P1").unwrap()).unwrap();
//! assert_eq!(project.junctions(panel)[0].to_string(), "LType (1)");
//! assert!(project.report().is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod association;
pub mod beam_pocket;
pub mod config;
pub mod dedup;
pub mod error;
pub mod isolation;
pub mod junction;
pub mod pipeline;
pub mod sorter;
pub mod validator;

#[cfg(test)]
mod fixtures;

pub use association::{AssociationRecord, Associations};
pub use beam_pocket::{BeamPocket, BeamPockets, Composition};
pub use config::PipelineConfig;
pub use dedup::{deduplicate, partition_first_wins, DedupStats};
pub use error::{Error, Result};
pub use isolation::IsolatedMaterials;
pub use junction::{Junction, JunctionType, Junctions};
pub use pipeline::{process, process_document, process_with_cancel, ProcessedProject};
pub use sorter::{SortedBundle, SortedHierarchy, SortedLevel, SortedPanel, SortedSubAssembly};
pub use validator::{validate, Issue, IssueCategory, IssueKind, ValidationReport};
