// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity key types for arena-based storage.
//!
//! Every entity in a [`Hierarchy`](crate::Hierarchy) is addressed by a
//! type-safe key created by `slotmap::SlotMap`. Keys are the non-owning
//! references of the graph: a panel's back-reference to its bundle, a
//! material's back-reference to its panel, and so on.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a building level.
    pub struct LevelKey;

    /// Key for a wall-panel bundle.
    pub struct BundleKey;

    /// Key for a wall panel.
    pub struct PanelKey;

    /// Key for a subassembly (rough opening, header, beam pocket, ...).
    pub struct SubAssemblyKey;

    /// Key for a framing material (board, sheet, bracing).
    pub struct MaterialKey;
}

/// Discriminant for the entity kinds that declare identifiers.
///
/// Material kinds are listed separately because identifier uniqueness is
/// scoped per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum EntityKind {
    Level,
    Bundle,
    Panel,
    SubAssembly,
    Board,
    Sheet,
    Bracing,
    Junction,
}

impl EntityKind {
    /// Returns the EHX element name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Level => "Level",
            EntityKind::Bundle => "Bundle",
            EntityKind::Panel => "Panel",
            EntityKind::SubAssembly => "SubAssembly",
            EntityKind::Board => "Board",
            EntityKind::Sheet => "Sheet",
            EntityKind::Bracing => "Bracing",
            EntityKind::Junction => "Junction",
        }
    }

    /// Maps an element name to its entity kind.
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "Level" => Some(EntityKind::Level),
            "Bundle" => Some(EntityKind::Bundle),
            "Panel" => Some(EntityKind::Panel),
            "SubAssembly" => Some(EntityKind::SubAssembly),
            "Board" => Some(EntityKind::Board),
            "Sheet" => Some(EntityKind::Sheet),
            "Bracing" => Some(EntityKind::Bracing),
            "Junction" => Some(EntityKind::Junction),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
