// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Beam Pocket Extractor
//!
//! Each BeamPocket subassembly yields AFF (the Trimmer's height), opening
//! width (the Trimmer's boundary span) and a composition of KingStud labels.
//! Within a panel, complete records with exactly equal AFF, width and
//! composition are merged; partial records stay separate.

use std::fmt;

use ehx_lite_core::{
    natural_cmp, Hierarchy, MaterialKey, PanelKey, RoleTag, SubAssemblyKey, SubAssemblyKind,
};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::isolation::IsolatedMaterials;

/// Label counts, kept in first-seen order.
///
/// Equality compares the label → count mapping and ignores order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Composition(Vec<(String, u32)>);

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut composition = Self::new();
        for label in labels {
            composition.add(label, 1);
        }
        composition
    }

    pub fn add(&mut self, label: &str, count: u32) {
        match self.0.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += count,
            None => self.0.push((label.to_string(), count)),
        }
    }

    pub fn merge(&mut self, other: &Composition) {
        for (label, count) in &other.0 {
            self.add(label, *count);
        }
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, n)| *n)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(l, n)| (l.as_str(), *n))
    }

    /// Entries in natural label order.
    pub fn sorted(&self) -> Vec<(&str, u32)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| natural_cmp(a.0, b.0));
        entries
    }
}

impl PartialEq for Composition {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(l, n)| other.get(l) == Some(n))
    }
}

/// Renders `D (2), E (2)` in natural label order.
impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, count)) in self.sorted().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{label} ({count})")?;
        }
        Ok(())
    }
}

/// A (possibly merged) beam pocket.
#[derive(Debug, Clone, Serialize)]
pub struct BeamPocket {
    pub panel: PanelKey,
    /// Contributing subassemblies, in ingestion order.
    pub subassemblies: Vec<SubAssemblyKey>,
    pub aff: Option<f64>,
    pub opening_width: Option<f64>,
    /// Summed over every merged instance.
    pub composition: Option<Composition>,
    pub instances: u32,
    #[serde(skip)]
    unit: Option<Composition>,
}

impl BeamPocket {
    /// `true` when AFF, width and composition are all present.
    pub fn is_complete(&self) -> bool {
        self.aff.is_some() && self.opening_width.is_some() && self.unit.is_some()
    }

    /// `AFF: 75.25`
    pub fn aff_text(&self) -> Option<String> {
        self.aff.map(|v| format!("AFF: {v}"))
    }

    /// `Opening Width: 36`
    pub fn opening_width_text(&self) -> Option<String> {
        self.opening_width.map(|v| format!("Opening Width: {v}"))
    }

    pub fn composition_text(&self) -> Option<String> {
        self.composition.as_ref().map(|c| c.to_string())
    }

    // TODO: take an AFF/width tolerance once exporters round coordinates
    fn matches(&self, other: &BeamPocket) -> bool {
        self.is_complete()
            && other.is_complete()
            && self.aff == other.aff
            && self.opening_width == other.opening_width
            && self.unit == other.unit
    }

    fn absorb(&mut self, other: BeamPocket) {
        self.subassemblies.extend(other.subassemblies);
        if let (Some(total), Some(extra)) = (&mut self.composition, &other.composition) {
            total.merge(extra);
        }
        self.instances += other.instances;
    }
}

/// Beam pockets grouped per panel.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BeamPockets {
    panels: Vec<(PanelKey, Vec<BeamPocket>)>,
    #[serde(skip)]
    index: FxHashMap<PanelKey, usize>,
}

impl BeamPockets {
    pub fn extract(h: &Hierarchy, isolated: &IsolatedMaterials) -> Self {
        let mut out = Self::default();
        for pk in h.panels_in_document_order() {
            let pockets = extract_panel(h, isolated, pk);
            if !pockets.is_empty() {
                out.index.insert(pk, out.panels.len());
                out.panels.push((pk, pockets));
            }
        }
        tracing::debug!(
            panels = out.panels.len(),
            pockets = out.panels.iter().map(|(_, p)| p.len()).sum::<usize>(),
            "extracted beam pockets"
        );
        out
    }

    pub fn for_panel(&self, panel: PanelKey) -> &[BeamPocket] {
        self.index
            .get(&panel)
            .map_or(&[], |&i| self.panels[i].1.as_slice())
    }

    /// Panels with at least one pocket, in document order.
    pub fn iter(&self) -> impl Iterator<Item = (PanelKey, &[BeamPocket])> {
        self.panels.iter().map(|(pk, p)| (*pk, p.as_slice()))
    }
}

/// Extracts and merges the beam pockets of one panel.
pub fn extract_panel(h: &Hierarchy, isolated: &IsolatedMaterials, pk: PanelKey) -> Vec<BeamPocket> {
    let Some(panel) = h.panel(pk) else {
        return Vec::new();
    };

    let mut merged: Vec<BeamPocket> = Vec::new();
    for &sk in &panel.subassemblies {
        let Some(sub) = h.subassembly(sk) else { continue };
        if sub.kind != SubAssemblyKind::BeamPocket {
            continue;
        }
        let materials = sub
            .guid
            .as_ref()
            .map_or(&[][..], |g| isolated.for_subassembly(pk, g));
        let pocket = measure(h, pk, sk, materials);

        match merged.iter_mut().find(|m| m.matches(&pocket)) {
            Some(existing) => existing.absorb(pocket),
            None => merged.push(pocket),
        }
    }
    merged
}

fn measure(h: &Hierarchy, pk: PanelKey, sk: SubAssemblyKey, materials: &[MaterialKey]) -> BeamPocket {
    let members: Vec<_> = materials.iter().filter_map(|&mk| h.material(mk)).collect();

    let trimmer = members
        .iter()
        .filter(|m| m.role == RoleTag::Trimmer)
        .min_by_key(|m| m.ingest);
    let aff = trimmer.and_then(|t| t.geometry.height);
    let opening_width = trimmer.and_then(|t| t.geometry.span());

    let king_studs: Vec<&str> = members
        .iter()
        .filter(|m| m.role == RoleTag::KingStud)
        .map(|m| m.label.as_str())
        .collect();
    let unit = (!king_studs.is_empty()).then(|| Composition::from_labels(king_studs));

    BeamPocket {
        panel: pk,
        subassemblies: vec![sk],
        aff,
        opening_width,
        composition: unit.clone(),
        instances: 1,
        unit,
    }
}
