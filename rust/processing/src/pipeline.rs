// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline orchestration.
//!
//! Stages 1-6 (ingest, build, associate, deduplicate, isolate, sort) run in
//! sequence and poll the cancel flag. Stages 7-9 (beam pockets, junctions,
//! validation) only read the finished graph and fan out with `rayon::join`.

use std::time::Instant;

use ehx_lite_core::{
    CancelFlag, Document, Guid, Hierarchy, HierarchyBuilder, Level, Material, MaterialKind, Panel,
    PanelKey, ParseNote, SubAssembly,
};

use crate::association::{AssociationRecord, Associations};
use crate::beam_pocket::{BeamPocket, BeamPockets};
use crate::config::PipelineConfig;
use crate::dedup::{deduplicate, DedupStats};
use crate::error::{Error, Result};
use crate::isolation::IsolatedMaterials;
use crate::junction::{Junction, Junctions};
use crate::sorter::SortedHierarchy;
use crate::validator::{validate, ValidationReport};

/// The immutable result of one pipeline run.
#[derive(Debug, Clone)]
pub struct ProcessedProject {
    hierarchy: Hierarchy,
    associations: Associations,
    isolated: IsolatedMaterials,
    sorted: SortedHierarchy,
    beam_pockets: BeamPockets,
    junctions: Junctions,
    report: ValidationReport,
    dedup: DedupStats,
}

impl ProcessedProject {
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn level_by_guid(&self, guid: &str) -> Option<&Level> {
        let guid = Guid::new(guid)?;
        self.hierarchy
            .level_by_guid(&guid)
            .and_then(|k| self.hierarchy.level(k))
    }

    pub fn panel_by_guid(&self, guid: &str) -> Option<&Panel> {
        let guid = Guid::new(guid)?;
        self.hierarchy
            .panel_by_guid(&guid)
            .and_then(|k| self.hierarchy.panel(k))
    }

    pub fn subassembly_by_guid(&self, guid: &str) -> Option<&SubAssembly> {
        let guid = Guid::new(guid)?;
        self.hierarchy
            .subassembly_by_guid(&guid)
            .and_then(|k| self.hierarchy.subassembly(k))
    }

    pub fn material_by_guid(&self, kind: MaterialKind, guid: &str) -> Option<&Material> {
        let guid = Guid::new(guid)?;
        self.hierarchy
            .material_by_guid(kind, &guid)
            .and_then(|k| self.hierarchy.material(k))
    }

    /// Canonical display and export order.
    pub fn sorted(&self) -> &SortedHierarchy {
        &self.sorted
    }

    pub fn associations(&self) -> &Associations {
        &self.associations
    }

    pub fn association(&self, guid: &str) -> Option<&AssociationRecord> {
        self.associations.get(&Guid::new(guid)?)
    }

    pub fn isolated(&self) -> &IsolatedMaterials {
        &self.isolated
    }

    pub fn beam_pockets(&self, panel: PanelKey) -> &[BeamPocket] {
        self.beam_pockets.for_panel(panel)
    }

    pub fn all_beam_pockets(&self) -> &BeamPockets {
        &self.beam_pockets
    }

    pub fn junctions(&self, panel: PanelKey) -> &[Junction] {
        self.junctions.for_panel(panel)
    }

    pub fn all_junctions(&self) -> &Junctions {
        &self.junctions
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Degraded-parse notes from hierarchy building.
    pub fn notes(&self) -> &[ParseNote] {
        self.hierarchy.notes()
    }

    pub fn dedup_stats(&self) -> DedupStats {
        self.dedup
    }
}

/// Runs the full pipeline over an EHX byte stream.
pub fn process(bytes: &[u8], config: &PipelineConfig) -> Result<ProcessedProject> {
    process_with_cancel(bytes, config, &CancelFlag::new())
}

/// Runs the full pipeline, polling `cancel` between panel-level iterations.
pub fn process_with_cancel(
    bytes: &[u8],
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Result<ProcessedProject> {
    if bytes.len() > config.max_document_bytes() {
        return Err(Error::DocumentTooLarge {
            size_mb: bytes.len().div_ceil(1024 * 1024),
            max_mb: config.max_document_mb,
        });
    }

    let start = Instant::now();
    tracing::info!(size = bytes.len(), "Starting EHX processing");

    let result = Document::parse(bytes)
        .map_err(Error::from)
        .and_then(|doc| process_document(&doc, config, cancel));

    match &result {
        Ok(project) => tracing::info!(
            panels = project.hierarchy.panel_count(),
            materials = project.hierarchy.material_count(),
            issues = project.report.len(),
            notes = project.notes().len(),
            total_ms = start.elapsed().as_millis() as u64,
            "EHX processing complete"
        ),
        Err(err) if err.is_cancelled() => {
            tracing::warn!(elapsed_ms = start.elapsed().as_millis() as u64, "EHX processing cancelled")
        }
        Err(_) => {}
    }
    result
}

/// Runs stages 2-9 over an already parsed document.
pub fn process_document(
    doc: &Document,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Result<ProcessedProject> {
    cancel.check()?;
    let mut hierarchy = HierarchyBuilder::new(doc).with_cancel(cancel).build()?;

    cancel.check()?;
    let mut associations = Associations::build(&hierarchy, cancel)?;

    cancel.check()?;
    let dedup = deduplicate(&mut hierarchy, &mut associations, cancel)?;

    cancel.check()?;
    let isolated = IsolatedMaterials::partition(&hierarchy, cancel)?;
    isolated.check(&hierarchy)?;

    cancel.check()?;
    let sorted = SortedHierarchy::sort(&hierarchy, &isolated, cancel)?;

    let (beam_pockets, (junctions, report)) = if config.parallel_fan_out {
        rayon::join(
            || BeamPockets::extract(&hierarchy, &isolated),
            || {
                rayon::join(
                    || Junctions::extract(&hierarchy),
                    || validate(&hierarchy, &associations),
                )
            },
        )
    } else {
        (
            BeamPockets::extract(&hierarchy, &isolated),
            (Junctions::extract(&hierarchy), validate(&hierarchy, &associations)),
        )
    };

    Ok(ProcessedProject {
        hierarchy,
        associations,
        isolated,
        sorted,
        beam_pockets,
        junctions,
        report,
        dedup,
    })
}
