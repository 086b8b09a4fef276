// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hierarchical Sorter - canonical display and export order
//!
//! | Tier | Order |
//! |------|-------|
//! | Level | `LevelNo` (unnumbered last), then ingestion |
//! | Bundle | bundle number from `B<n>` (unnumbered last), then ingestion |
//! | Panel | natural label order, then ingestion |
//! | SubAssembly | kind priority (Header, RoughOpening, BeamPocket, Generic), natural label, ingestion |
//! | Material | Header role first, natural label, ingestion |
//!
//! Unassigned bundles and panels follow every level.

use std::cmp::Ordering;

use ehx_lite_core::{
    bundle_number, natural_cmp, BundleKey, CancelFlag, Guid, Hierarchy, LevelKey, MaterialKey,
    PanelKey, SubAssemblyKey,
};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::Result;
use crate::isolation::IsolatedMaterials;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortedSubAssembly {
    pub key: SubAssemblyKey,
    pub materials: Vec<MaterialKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortedPanel {
    pub key: PanelKey,
    pub subassemblies: Vec<SortedSubAssembly>,
    /// Materials referencing no subassembly.
    pub loose_materials: Vec<MaterialKey>,
    /// Materials referencing a subassembly this panel does not declare.
    pub unmatched_materials: Vec<MaterialKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortedBundle {
    pub key: BundleKey,
    pub panels: Vec<SortedPanel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortedLevel {
    pub key: LevelKey,
    pub bundles: Vec<SortedBundle>,
}

/// Read-only nested view of the hierarchy in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SortedHierarchy {
    pub levels: Vec<SortedLevel>,
    pub unassigned_bundles: Vec<SortedBundle>,
    pub unassigned_panels: Vec<SortedPanel>,
}

impl SortedHierarchy {
    pub fn sort(h: &Hierarchy, isolated: &IsolatedMaterials, cancel: &CancelFlag) -> Result<Self> {
        let sorter = Sorter { h, isolated, cancel };

        let mut level_keys = h.level_keys().to_vec();
        level_keys.sort_by(|&a, &b| sorter.cmp_levels(a, b));

        let mut levels = Vec::with_capacity(level_keys.len());
        for lk in level_keys {
            let bundles = h.level(lk).map_or(&[][..], |l| l.bundles.as_slice());
            levels.push(SortedLevel {
                key: lk,
                bundles: sorter.bundles(bundles)?,
            });
        }

        let sorted = Self {
            levels,
            unassigned_bundles: sorter.bundles(h.unassigned_bundles())?,
            unassigned_panels: sorter.panels(h.unassigned_panels())?,
        };
        tracing::debug!(levels = sorted.levels.len(), "sorted hierarchy");
        Ok(sorted)
    }

    /// Every panel in canonical order, unassigned ones last.
    pub fn panel_order(&self) -> Vec<PanelKey> {
        self.panels().map(|p| p.key).collect()
    }

    /// Every panel-scoped material in canonical order.
    pub fn material_order(&self) -> Vec<MaterialKey> {
        let mut out = Vec::new();
        for panel in self.panels() {
            for sub in &panel.subassemblies {
                out.extend_from_slice(&sub.materials);
            }
            out.extend_from_slice(&panel.loose_materials);
            out.extend_from_slice(&panel.unmatched_materials);
        }
        out
    }

    fn panels(&self) -> impl Iterator<Item = &SortedPanel> {
        self.levels
            .iter()
            .flat_map(|l| l.bundles.iter())
            .chain(self.unassigned_bundles.iter())
            .flat_map(|b| b.panels.iter())
            .chain(self.unassigned_panels.iter())
    }
}

struct Sorter<'a> {
    h: &'a Hierarchy,
    isolated: &'a IsolatedMaterials,
    cancel: &'a CancelFlag,
}

impl Sorter<'_> {
    fn cmp_levels(&self, a: LevelKey, b: LevelKey) -> Ordering {
        match (self.h.level(a), self.h.level(b)) {
            (Some(a), Some(b)) => (a.number.is_none(), a.number, a.ingest)
                .cmp(&(b.number.is_none(), b.number, b.ingest)),
            _ => Ordering::Equal,
        }
    }

    fn bundles(&self, keys: &[BundleKey]) -> Result<Vec<SortedBundle>> {
        let mut keys = keys.to_vec();
        keys.sort_by_cached_key(|&bk| {
            let bundle = self.h.bundle(bk);
            let number = bundle.and_then(|b| bundle_number(&b.label));
            (number.is_none(), number, bundle.map(|b| b.ingest))
        });
        keys.into_iter()
            .map(|bk| {
                let panels = self.h.bundle(bk).map_or(&[][..], |b| b.panels.as_slice());
                Ok(SortedBundle {
                    key: bk,
                    panels: self.panels(panels)?,
                })
            })
            .collect()
    }

    fn panels(&self, keys: &[PanelKey]) -> Result<Vec<SortedPanel>> {
        let mut keys = keys.to_vec();
        keys.sort_by(|&a, &b| match (self.h.panel(a), self.h.panel(b)) {
            (Some(a), Some(b)) => natural_cmp(&a.label, &b.label).then(a.ingest.cmp(&b.ingest)),
            _ => Ordering::Equal,
        });
        keys.into_iter().map(|pk| self.panel(pk)).collect()
    }

    fn panel(&self, pk: PanelKey) -> Result<SortedPanel> {
        self.cancel.check()?;
        let (subassemblies, matched) = self.subassemblies(pk);

        let unmatched: Vec<MaterialKey> = self
            .isolated
            .scopes(pk)
            .filter(|guid| !matched.contains(*guid))
            .flat_map(|guid| self.isolated.for_subassembly(pk, guid).iter().copied())
            .collect();

        Ok(SortedPanel {
            key: pk,
            subassemblies,
            loose_materials: self.materials(self.isolated.loose(pk)),
            unmatched_materials: self.materials(&unmatched),
        })
    }

    /// Sorted subassemblies of a panel, plus the identifiers they claim.
    fn subassemblies(&self, pk: PanelKey) -> (Vec<SortedSubAssembly>, FxHashSet<Guid>) {
        let Some(panel) = self.h.panel(pk) else {
            return (Vec::new(), FxHashSet::default());
        };

        // Materials go to the lowest-ingest subassembly declaring the identifier
        let mut claimed: FxHashSet<Guid> = FxHashSet::default();
        let mut owners: FxHashSet<SubAssemblyKey> = FxHashSet::default();
        for &sk in &panel.subassemblies {
            if let Some(guid) = self.h.subassembly(sk).and_then(|s| s.guid.clone()) {
                if claimed.insert(guid) {
                    owners.insert(sk);
                }
            }
        }

        let mut keys = panel.subassemblies.clone();
        keys.sort_by(|&a, &b| match (self.h.subassembly(a), self.h.subassembly(b)) {
            (Some(a), Some(b)) => a
                .kind
                .priority()
                .cmp(&b.kind.priority())
                .then_with(|| natural_cmp(&a.label, &b.label))
                .then(a.ingest.cmp(&b.ingest)),
            _ => Ordering::Equal,
        });

        let sorted = keys
            .into_iter()
            .map(|sk| {
                let materials = match self.h.subassembly(sk).and_then(|s| s.guid.as_ref()) {
                    Some(guid) if owners.contains(&sk) => {
                        self.materials(self.isolated.for_subassembly(pk, guid))
                    }
                    _ => Vec::new(),
                };
                SortedSubAssembly { key: sk, materials }
            })
            .collect();
        (sorted, claimed)
    }

    fn materials(&self, keys: &[MaterialKey]) -> Vec<MaterialKey> {
        let mut keys = keys.to_vec();
        keys.sort_by(|&a, &b| match (self.h.material(a), self.h.material(b)) {
            (Some(a), Some(b)) => (!a.role.is_header())
                .cmp(&!b.role.is_header())
                .then_with(|| natural_cmp(&a.label, &b.label))
                .then(a.ingest.cmp(&b.ingest)),
            _ => Ordering::Equal,
        });
        keys
    }
}
