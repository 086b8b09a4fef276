// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Junction Extractor - per-panel junction-type tallies from naming text.

use std::fmt;

use ehx_lite_core::{Hierarchy, PanelKey};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Junction vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum JunctionType {
    LType,
    Ladder,
    Subcomponent,
}

impl JunctionType {
    /// Output order.
    pub const ALL: [JunctionType; 3] = [
        JunctionType::LType,
        JunctionType::Ladder,
        JunctionType::Subcomponent,
    ];

    /// Case-insensitive substring match; the first matching type wins.
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("ltype") || lower.contains("l-type") {
            Some(JunctionType::LType)
        } else if lower.contains("ladder") {
            Some(JunctionType::Ladder)
        } else if lower.contains("subcomponent") {
            Some(JunctionType::Subcomponent)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JunctionType::LType => "LType",
            JunctionType::Ladder => "Ladder",
            JunctionType::Subcomponent => "Subcomponent",
        }
    }
}

impl fmt::Display for JunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Junction {
    pub kind: JunctionType,
    pub count: u32,
}

/// Renders `LType (2)`.
impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.count)
    }
}

/// Tallies junction types over names. Output follows [`JunctionType::ALL`]
/// and omits zero counts.
pub fn tally_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Junction> {
    let mut counts = [0u32; JunctionType::ALL.len()];
    for kind in names.into_iter().filter_map(JunctionType::parse) {
        counts[kind as usize] += 1;
    }
    JunctionType::ALL
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(&kind, count)| Junction { kind, count })
        .collect()
}

/// Junctions of one panel: its subassembly names plus attached junction
/// records.
pub fn extract_panel(h: &Hierarchy, pk: PanelKey) -> Vec<Junction> {
    let Some(panel) = h.panel(pk) else {
        return Vec::new();
    };
    let sub_names = panel
        .subassemblies
        .iter()
        .filter_map(|&sk| h.subassembly(sk))
        .map(|s| s.name_text());
    let attached = panel.junction_names.iter().map(String::as_str);
    tally_names(sub_names.chain(attached))
}

/// `LType (2), Ladder (1)`
pub fn render(junctions: &[Junction]) -> String {
    junctions
        .iter()
        .map(Junction::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Junction tallies per panel.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Junctions {
    panels: Vec<(PanelKey, Vec<Junction>)>,
    #[serde(skip)]
    index: FxHashMap<PanelKey, usize>,
}

impl Junctions {
    pub fn extract(h: &Hierarchy) -> Self {
        let mut out = Self::default();
        for pk in h.panels_in_document_order() {
            let junctions = extract_panel(h, pk);
            if !junctions.is_empty() {
                out.index.insert(pk, out.panels.len());
                out.panels.push((pk, junctions));
            }
        }
        tracing::debug!(panels = out.panels.len(), "extracted junctions");
        out
    }

    pub fn for_panel(&self, panel: PanelKey) -> &[Junction] {
        self.index
            .get(&panel)
            .map_or(&[], |&i| self.panels[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (PanelKey, &[Junction])> {
        self.panels.iter().map(|(pk, j)| (*pk, j.as_slice()))
    }
}
