// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the EHX entity graph.
//!
//! The [`Hierarchy`] is the single owner of every level, bundle, panel,
//! subassembly and material. Entities live in slot maps with stable keys;
//! parents hold ordered key lists of the children they own, children hold
//! non-owning back-reference keys. Flat per-kind indexes map identifiers to
//! keys so later stages never re-walk the document.
//!
//! Identifier indexes hold every entity declaring a GUID, in ingestion
//! order. When a GUID is declared more than once the first key is the
//! canonical one.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::guid::{Guid, IngestIndex};
use crate::keys::*;
use crate::schema::{MaterialKind, RoleTag, SubAssemblyKind};

/// Keys sharing one identifier, in ingestion order.
pub type GuidMatches<K> = SmallVec<[K; 1]>;

/// A building level.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Level {
    pub guid: Option<Guid>,
    pub label: String,
    /// Numeric `LevelNo`, when present.
    pub number: Option<i64>,
    pub ingest: IngestIndex,
    /// `true` when the level was created from a reference rather than a
    /// `<Level>` declaration.
    pub synthesized: bool,
    pub bundles: Vec<BundleKey>,
}

/// A wall-panel bundle.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bundle {
    pub guid: Option<Guid>,
    pub label: String,
    pub level: Option<LevelKey>,
    pub level_guid: Option<Guid>,
    pub ingest: IngestIndex,
    pub synthesized: bool,
    pub panels: Vec<PanelKey>,
}

/// A wall panel.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Panel {
    pub guid: Option<Guid>,
    pub label: String,
    pub bundle: Option<BundleKey>,
    pub level_guid: Option<Guid>,
    pub bundle_guid: Option<Guid>,
    pub ingest: IngestIndex,
    pub subassemblies: Vec<SubAssemblyKey>,
    pub materials: Vec<MaterialKey>,
    /// `SubAssemblyName` text of `<Junction>` records attached to this panel.
    pub junction_names: Vec<String>,
}

/// A subassembly grouping under a panel.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubAssembly {
    pub guid: Option<Guid>,
    pub label: String,
    /// `SubAssemblyName` text.
    pub name: Option<String>,
    pub family: Option<String>,
    pub kind: SubAssemblyKind,
    pub panel: Option<PanelKey>,
    pub panel_guid: Option<Guid>,
    pub ingest: IngestIndex,
}

impl SubAssembly {
    /// Returns the text scanned for junction vocabulary.
    pub fn name_text(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.label)
    }
}

/// Raw geometry of a material, in document units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Geometry {
    /// Height coordinate (top of the member in elevation).
    pub height: Option<f64>,
    /// Boundary coordinate pair (left/right extent in plan).
    pub boundaries: Option<(f64, f64)>,
}

impl Geometry {
    /// Distance between the two boundary coordinates.
    pub fn span(&self) -> Option<f64> {
        self.boundaries.map(|(a, b)| (b - a).abs())
    }
}

/// A framing material.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Material {
    pub kind: MaterialKind,
    pub guid: Option<Guid>,
    pub label: String,
    pub role: RoleTag,
    pub description: Option<String>,
    pub geometry: Geometry,
    pub subassembly_guid: Option<Guid>,
    pub panel: Option<PanelKey>,
    pub panel_guid: Option<Guid>,
    pub bundle_guid: Option<Guid>,
    pub level_guid: Option<Guid>,
    pub ingest: IngestIndex,
}

impl Material {
    /// Deduplication key: `(kind, identifier)`.
    pub fn dedup_key(&self) -> Option<(MaterialKind, &Guid)> {
        self.guid.as_ref().map(|g| (self.kind, g))
    }
}

/// A degraded-parse note: a domain field was missing or unparsable on one
/// entity, or a reference could not be resolved.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParseNote {
    pub ingest: IngestIndex,
    pub element: EntityKind,
    pub field: &'static str,
    pub message: String,
}

/// The owned Level → Bundle → Panel → SubAssembly → Material graph.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    pub(crate) levels: SlotMap<LevelKey, Level>,
    pub(crate) bundles: SlotMap<BundleKey, Bundle>,
    pub(crate) panels: SlotMap<PanelKey, Panel>,
    pub(crate) subassemblies: SlotMap<SubAssemblyKey, SubAssembly>,
    pub(crate) materials: SlotMap<MaterialKey, Material>,

    // Top-level ownership
    pub(crate) level_order: Vec<LevelKey>,
    pub(crate) unassigned_bundles: Vec<BundleKey>,
    pub(crate) unassigned_panels: Vec<PanelKey>,
    pub(crate) unassigned_subassemblies: Vec<SubAssemblyKey>,
    pub(crate) unassigned_materials: Vec<MaterialKey>,

    // Identifier indexes
    pub(crate) level_index: FxHashMap<Guid, GuidMatches<LevelKey>>,
    pub(crate) bundle_index: FxHashMap<Guid, GuidMatches<BundleKey>>,
    pub(crate) panel_index: FxHashMap<Guid, GuidMatches<PanelKey>>,
    pub(crate) subassembly_index: FxHashMap<Guid, GuidMatches<SubAssemblyKey>>,
    pub(crate) material_index: FxHashMap<(MaterialKind, Guid), GuidMatches<MaterialKey>>,

    pub(crate) notes: Vec<ParseNote>,
}

impl Hierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Entity lookup ---

    pub fn level(&self, key: LevelKey) -> Option<&Level> {
        self.levels.get(key)
    }

    pub fn bundle(&self, key: BundleKey) -> Option<&Bundle> {
        self.bundles.get(key)
    }

    pub fn panel(&self, key: PanelKey) -> Option<&Panel> {
        self.panels.get(key)
    }

    pub fn subassembly(&self, key: SubAssemblyKey) -> Option<&SubAssembly> {
        self.subassemblies.get(key)
    }

    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    // --- Ordered ownership ---

    /// Levels in declaration order.
    pub fn level_keys(&self) -> &[LevelKey] {
        &self.level_order
    }

    /// Bundles whose level could not be resolved.
    pub fn unassigned_bundles(&self) -> &[BundleKey] {
        &self.unassigned_bundles
    }

    /// Panels whose bundle could not be resolved.
    pub fn unassigned_panels(&self) -> &[PanelKey] {
        &self.unassigned_panels
    }

    /// Subassemblies whose panel could not be resolved.
    pub fn unassigned_subassemblies(&self) -> &[SubAssemblyKey] {
        &self.unassigned_subassemblies
    }

    /// Materials whose panel could not be resolved.
    pub fn unassigned_materials(&self) -> &[MaterialKey] {
        &self.unassigned_materials
    }

    // --- Iteration ---

    pub fn levels(&self) -> impl Iterator<Item = (LevelKey, &Level)> {
        self.levels.iter()
    }

    pub fn bundles(&self) -> impl Iterator<Item = (BundleKey, &Bundle)> {
        self.bundles.iter()
    }

    pub fn panels(&self) -> impl Iterator<Item = (PanelKey, &Panel)> {
        self.panels.iter()
    }

    pub fn subassemblies(&self) -> impl Iterator<Item = (SubAssemblyKey, &SubAssembly)> {
        self.subassemblies.iter()
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialKey, &Material)> {
        self.materials.iter()
    }

    /// Panel keys in ingestion order.
    pub fn panels_in_document_order(&self) -> Vec<PanelKey> {
        let mut keys: Vec<_> = self.panels.iter().map(|(k, p)| (p.ingest, k)).collect();
        keys.sort_unstable_by_key(|(ingest, _)| *ingest);
        keys.into_iter().map(|(_, k)| k).collect()
    }

    /// Subassembly keys in ingestion order.
    pub fn subassemblies_in_document_order(&self) -> Vec<SubAssemblyKey> {
        let mut keys: Vec<_> = self.subassemblies.iter().map(|(k, s)| (s.ingest, k)).collect();
        keys.sort_unstable_by_key(|(ingest, _)| *ingest);
        keys.into_iter().map(|(_, k)| k).collect()
    }

    /// Material keys in ingestion order.
    pub fn materials_in_document_order(&self) -> Vec<MaterialKey> {
        let mut keys: Vec<_> = self.materials.iter().map(|(k, m)| (m.ingest, k)).collect();
        keys.sort_unstable_by_key(|(ingest, _)| *ingest);
        keys.into_iter().map(|(_, k)| k).collect()
    }

    // --- Counts ---

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn subassembly_count(&self) -> usize {
        self.subassemblies.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    // --- Identifier lookup ---

    /// All levels declaring `guid`, canonical first.
    pub fn levels_by_guid(&self, guid: &Guid) -> &[LevelKey] {
        self.level_index.get(guid).map_or(&[], |m| m.as_slice())
    }

    pub fn bundles_by_guid(&self, guid: &Guid) -> &[BundleKey] {
        self.bundle_index.get(guid).map_or(&[], |m| m.as_slice())
    }

    pub fn panels_by_guid(&self, guid: &Guid) -> &[PanelKey] {
        self.panel_index.get(guid).map_or(&[], |m| m.as_slice())
    }

    pub fn subassemblies_by_guid(&self, guid: &Guid) -> &[SubAssemblyKey] {
        self.subassembly_index.get(guid).map_or(&[], |m| m.as_slice())
    }

    /// All materials of `kind` declaring `guid`, in ingestion order.
    pub fn materials_by_guid(&self, kind: MaterialKind, guid: &Guid) -> &[MaterialKey] {
        self.material_index
            .get(&(kind, guid.clone()))
            .map_or(&[], |m| m.as_slice())
    }

    /// Canonical level for `guid`.
    pub fn level_by_guid(&self, guid: &Guid) -> Option<LevelKey> {
        self.levels_by_guid(guid).first().copied()
    }

    pub fn bundle_by_guid(&self, guid: &Guid) -> Option<BundleKey> {
        self.bundles_by_guid(guid).first().copied()
    }

    pub fn panel_by_guid(&self, guid: &Guid) -> Option<PanelKey> {
        self.panels_by_guid(guid).first().copied()
    }

    pub fn subassembly_by_guid(&self, guid: &Guid) -> Option<SubAssemblyKey> {
        self.subassemblies_by_guid(guid).first().copied()
    }

    pub fn material_by_guid(&self, kind: MaterialKind, guid: &Guid) -> Option<MaterialKey> {
        self.materials_by_guid(kind, guid).first().copied()
    }

    /// Iterates the material identifier index: `(kind, guid) -> keys`.
    pub fn material_guids(&self) -> impl Iterator<Item = (MaterialKind, &Guid, &[MaterialKey])> {
        self.material_index
            .iter()
            .map(|((kind, guid), keys)| (*kind, guid, keys.as_slice()))
    }

    /// Degraded-parse notes in ingestion order.
    pub fn notes(&self) -> &[ParseNote] {
        &self.notes
    }

    // --- Mutation (pipeline stages only) ---

    /// Removes a material from the graph, detaching it from its owner and the
    /// identifier index.
    pub fn remove_material(&mut self, key: MaterialKey) -> Option<Material> {
        let material = self.materials.remove(key)?;

        match material.panel.and_then(|p| self.panels.get_mut(p)) {
            Some(panel) => panel.materials.retain(|&k| k != key),
            None => self.unassigned_materials.retain(|&k| k != key),
        }

        if let Some(guid) = &material.guid {
            let index_key = (material.kind, guid.clone());
            if let Some(keys) = self.material_index.get_mut(&index_key) {
                keys.retain(|k| *k != key);
                if keys.is_empty() {
                    self.material_index.remove(&index_key);
                }
            }
        }

        Some(material)
    }

    // --- Insertion (builder only) ---

    pub(crate) fn insert_level(&mut self, level: Level) -> LevelKey {
        let guid = level.guid.clone();
        let key = self.levels.insert(level);
        self.level_order.push(key);
        if let Some(guid) = guid {
            self.level_index.entry(guid).or_default().push(key);
        }
        key
    }

    pub(crate) fn insert_bundle(&mut self, bundle: Bundle) -> BundleKey {
        let guid = bundle.guid.clone();
        let level = bundle.level;
        let key = self.bundles.insert(bundle);
        match level.and_then(|l| self.levels.get_mut(l)) {
            Some(level) => level.bundles.push(key),
            None => self.unassigned_bundles.push(key),
        }
        if let Some(guid) = guid {
            self.bundle_index.entry(guid).or_default().push(key);
        }
        key
    }

    pub(crate) fn insert_panel(&mut self, panel: Panel) -> PanelKey {
        let guid = panel.guid.clone();
        let bundle = panel.bundle;
        let key = self.panels.insert(panel);
        match bundle.and_then(|b| self.bundles.get_mut(b)) {
            Some(bundle) => bundle.panels.push(key),
            None => self.unassigned_panels.push(key),
        }
        if let Some(guid) = guid {
            self.panel_index.entry(guid).or_default().push(key);
        }
        key
    }

    pub(crate) fn insert_subassembly(&mut self, sub: SubAssembly) -> SubAssemblyKey {
        let guid = sub.guid.clone();
        let panel = sub.panel;
        let key = self.subassemblies.insert(sub);
        match panel.and_then(|p| self.panels.get_mut(p)) {
            Some(panel) => panel.subassemblies.push(key),
            None => self.unassigned_subassemblies.push(key),
        }
        if let Some(guid) = guid {
            self.subassembly_index.entry(guid).or_default().push(key);
        }
        key
    }

    pub(crate) fn insert_material(&mut self, material: Material) -> MaterialKey {
        let index_key = material.guid.clone().map(|g| (material.kind, g));
        let panel = material.panel;
        let key = self.materials.insert(material);
        match panel.and_then(|p| self.panels.get_mut(p)) {
            Some(panel) => panel.materials.push(key),
            None => self.unassigned_materials.push(key),
        }
        if let Some(index_key) = index_key {
            self.material_index.entry(index_key).or_default().push(key);
        }
        key
    }

    pub(crate) fn note(
        &mut self,
        ingest: IngestIndex,
        element: EntityKind,
        field: &'static str,
        message: impl Into<String>,
    ) {
        let note = ParseNote {
            ingest,
            element,
            field,
            message: message.into(),
        };
        tracing::debug!(
            ingest = note.ingest.0,
            element = %note.element,
            field = note.field,
            "{}",
            note.message
        );
        self.notes.push(note);
    }
}
