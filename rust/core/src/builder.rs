// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hierarchy Builder - element tree to entity graph
//!
//! EHX exports come in two shapes: nested (`Level > Bundle > Panel >
//! SubAssembly > Board`) and flat (every entity a sibling under the root,
//! linked only by reference GUIDs such as `<PanelGuid>` on a `<Board>`).
//! Both resolve to the same [`Hierarchy`]:
//!
//! 1. Classify every element as a declaration or a plain field. An entity
//!    element is a declaration only if it has child elements; a `Level` or
//!    `Bundle` nested inside a `Panel` is a reference block, not a
//!    declaration.
//! 2. Record the nearest enclosing declaration of each kind for every
//!    element (parents precede children in document order, so one forward
//!    sweep is enough).
//! 3. Instantiate entities kind by kind. A parent is taken from the
//!    enclosing declaration when there is one, otherwise from the element's
//!    own reference field.
//!
//! Levels and bundles that are referenced but never declared are
//! synthesized from the first reference. Entities whose parent cannot be
//! resolved are kept in the hierarchy's `unassigned_*` lists. Every such
//! degradation is recorded as a [`ParseNote`](crate::ParseNote).

use rustc_hash::FxHashMap;

use crate::cancel::CancelFlag;
use crate::document::{Document, ElementId};
use crate::error::Result;
use crate::guid::{Guid, IngestIndex};
use crate::keys::*;
use crate::model::*;
use crate::schema::{fields, parse_number, MaterialKind, RoleTag, SubAssemblyKind};

/// Nearest enclosing declarations of an element.
#[derive(Debug, Clone, Copy, Default)]
struct Enclosing {
    level: Option<ElementId>,
    bundle: Option<ElementId>,
    panel: Option<ElementId>,
    subassembly: Option<ElementId>,
}

/// Builds a [`Hierarchy`] from a parsed [`Document`].
///
/// # Example
///
/// ```
/// use ehx_lite_core::{Document, HierarchyBuilder};
///
/// let doc = Document::parse_str(
///     "<EHX><Panel><PanelGuid>p-1</PanelGuid><Label>05-100</Label></Panel></EHX>",
/// ).unwrap();
/// let hierarchy = HierarchyBuilder::new(&doc).build().unwrap();
/// assert_eq!(hierarchy.panel_count(), 1);
/// ```
pub struct HierarchyBuilder<'a> {
    doc: &'a Document,
    cancel: Option<&'a CancelFlag>,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc, cancel: None }
    }

    /// Polls `flag` between panel-level iterations.
    pub fn with_cancel(mut self, flag: &'a CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Builds the hierarchy. Fails only on cancellation.
    pub fn build(self) -> Result<Hierarchy> {
        let mut pass = BuildPass::new(self.doc, self.cancel);
        pass.classify();
        pass.build_levels();
        pass.build_bundles();
        pass.build_panels()?;
        pass.build_subassemblies()?;
        pass.build_materials()?;
        pass.attach_junctions()?;

        let h = pass.h;
        tracing::debug!(
            levels = h.level_count(),
            bundles = h.bundle_count(),
            panels = h.panel_count(),
            subassemblies = h.subassembly_count(),
            materials = h.material_count(),
            notes = h.notes().len(),
            "built EHX hierarchy"
        );
        Ok(h)
    }
}

/// Convenience wrapper for [`HierarchyBuilder`].
pub fn build_hierarchy(doc: &Document) -> Result<Hierarchy> {
    HierarchyBuilder::new(doc).build()
}

struct BuildPass<'a> {
    doc: &'a Document,
    cancel: Option<&'a CancelFlag>,
    h: Hierarchy,

    declarations: Vec<Option<EntityKind>>,
    enclosing: Vec<Enclosing>,

    level_elems: FxHashMap<ElementId, LevelKey>,
    bundle_elems: FxHashMap<ElementId, BundleKey>,
    panel_elems: FxHashMap<ElementId, PanelKey>,
    subassembly_elems: FxHashMap<ElementId, SubAssemblyKey>,
    panel_labels: FxHashMap<String, PanelKey>,
}

impl<'a> BuildPass<'a> {
    fn new(doc: &'a Document, cancel: Option<&'a CancelFlag>) -> Self {
        Self {
            doc,
            cancel,
            h: Hierarchy::new(),
            declarations: Vec::with_capacity(doc.len()),
            enclosing: Vec::with_capacity(doc.len()),
            level_elems: FxHashMap::default(),
            bundle_elems: FxHashMap::default(),
            panel_elems: FxHashMap::default(),
            subassembly_elems: FxHashMap::default(),
            panel_labels: FxHashMap::default(),
        }
    }

    fn check_cancel(&self) -> Result<()> {
        match self.cancel {
            Some(flag) => flag.check(),
            None => Ok(()),
        }
    }

    fn elements_of(&self, kind: EntityKind) -> Vec<ElementId> {
        self.declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == Some(kind))
            .map(|(i, _)| ElementId(i as u32))
            .collect()
    }

    fn text(&self, id: ElementId, name: &str) -> Option<&'a str> {
        self.doc.child_text(id, name)
    }

    fn guid(&self, id: ElementId, name: &str) -> Option<Guid> {
        self.text(id, name).and_then(Guid::new)
    }

    fn ingest(id: ElementId) -> IngestIndex {
        IngestIndex(id.0)
    }

    // -------------------------------------------------------------------------
    // Classification
    // -------------------------------------------------------------------------

    fn classify(&mut self) {
        let doc = self.doc;
        for (id, element) in doc.iter() {
            let enclosing = element
                .parent
                .map(|p| self.enclosing_of_parent(p))
                .unwrap_or_default();

            let declaration = EntityKind::from_element(&element.name)
                .filter(|_| element.has_children())
                .filter(|kind| match kind {
                    EntityKind::Level | EntityKind::Bundle => enclosing.panel.is_none(),
                    _ => true,
                });

            debug_assert_eq!(id.index(), self.declarations.len());
            self.declarations.push(declaration);
            self.enclosing.push(enclosing);
        }
    }

    fn enclosing_of_parent(&self, parent: ElementId) -> Enclosing {
        let mut ctx = self.enclosing[parent.index()];
        match self.declarations[parent.index()] {
            Some(EntityKind::Level) => ctx.level = Some(parent),
            Some(EntityKind::Bundle) => ctx.bundle = Some(parent),
            Some(EntityKind::Panel) => ctx.panel = Some(parent),
            Some(EntityKind::SubAssembly) => ctx.subassembly = Some(parent),
            _ => {}
        }
        ctx
    }

    // -------------------------------------------------------------------------
    // Levels and bundles
    // -------------------------------------------------------------------------

    fn build_levels(&mut self) {
        for id in self.elements_of(EntityKind::Level) {
            let ingest = Self::ingest(id);
            let guid = self.guid(id, fields::LEVEL_GUID);
            let level_no = self.text(id, fields::LEVEL_NO);
            let number = level_no.and_then(parse_number).map(|n| n as i64);
            let label = self
                .text(id, fields::DESCRIPTION)
                .or(level_no)
                .map(str::to_string)
                .or_else(|| guid.as_ref().map(|g| g.to_string()))
                .unwrap_or_else(|| format!("Level {}", self.h.level_count() + 1));

            if guid.is_none() {
                self.h
                    .note(ingest, EntityKind::Level, fields::LEVEL_GUID, "level declares no LevelGuid");
            }

            let key = self.h.insert_level(Level {
                guid,
                label,
                number,
                ingest,
                synthesized: false,
                bundles: Vec::new(),
            });
            self.level_elems.insert(id, key);
        }
    }

    /// Resolves a level reference, synthesizing an undeclared level.
    fn resolve_level(
        &mut self,
        guid: Option<&Guid>,
        level_no: Option<&str>,
        ingest: IngestIndex,
        referrer: EntityKind,
    ) -> Option<LevelKey> {
        let guid = guid?;
        if let Some(key) = self.h.level_by_guid(guid) {
            return Some(key);
        }
        self.h.note(
            ingest,
            referrer,
            fields::LEVEL_GUID,
            format!("level {guid} is referenced but never declared"),
        );
        Some(self.h.insert_level(Level {
            guid: Some(guid.clone()),
            label: level_no.map_or_else(|| guid.to_string(), str::to_string),
            number: level_no.and_then(parse_number).map(|n| n as i64),
            ingest,
            synthesized: true,
            bundles: Vec::new(),
        }))
    }

    fn build_bundles(&mut self) {
        for id in self.elements_of(EntityKind::Bundle) {
            let ingest = Self::ingest(id);
            let enclosing = self.enclosing[id.index()];
            let guid = self.guid(id, fields::BUNDLE_GUID);
            let label = self
                .doc
                .child_text_any(id, &[fields::LABEL, fields::BUNDLE_NAME, "Name"])
                .map(str::to_string)
                .or_else(|| guid.as_ref().map(|g| g.to_string()))
                .unwrap_or_default();

            let structural_level = enclosing.level.and_then(|l| self.level_elems.get(&l).copied());
            let level_guid = self.guid(id, fields::LEVEL_GUID).or_else(|| {
                structural_level
                    .and_then(|k| self.h.level(k))
                    .and_then(|l| l.guid.clone())
            });
            let level = match structural_level {
                Some(key) => Some(key),
                None => {
                    let level_no = self.text(id, fields::LEVEL_NO);
                    self.resolve_level(level_guid.as_ref(), level_no, ingest, EntityKind::Bundle)
                }
            };

            if guid.is_none() {
                self.h
                    .note(ingest, EntityKind::Bundle, fields::BUNDLE_GUID, "bundle declares no BundleGuid");
            }
            if level.is_none() {
                self.h.note(
                    ingest,
                    EntityKind::Bundle,
                    fields::LEVEL_GUID,
                    format!("bundle '{label}' has no resolvable level"),
                );
            }

            let key = self.h.insert_bundle(Bundle {
                guid,
                label,
                level,
                level_guid,
                ingest,
                synthesized: false,
                panels: Vec::new(),
            });
            self.bundle_elems.insert(id, key);
        }
    }

    /// Resolves a bundle reference, synthesizing an undeclared bundle.
    fn resolve_bundle(
        &mut self,
        guid: Option<&Guid>,
        name: Option<&str>,
        level_guid: Option<&Guid>,
        level_no: Option<&str>,
        ingest: IngestIndex,
    ) -> Option<BundleKey> {
        let guid = guid?;
        if let Some(key) = self.h.bundle_by_guid(guid) {
            return Some(key);
        }
        self.h.note(
            ingest,
            EntityKind::Panel,
            fields::BUNDLE_GUID,
            format!("bundle {guid} is referenced but never declared"),
        );
        let level = self.resolve_level(level_guid, level_no, ingest, EntityKind::Panel);
        Some(self.h.insert_bundle(Bundle {
            guid: Some(guid.clone()),
            label: name.map_or_else(|| guid.to_string(), str::to_string),
            level,
            level_guid: level_guid.cloned(),
            ingest,
            synthesized: true,
            panels: Vec::new(),
        }))
    }

    // -------------------------------------------------------------------------
    // Panels
    // -------------------------------------------------------------------------

    fn build_panels(&mut self) -> Result<()> {
        for id in self.elements_of(EntityKind::Panel) {
            self.check_cancel()?;
            let ingest = Self::ingest(id);
            let enclosing = self.enclosing[id.index()];

            let guid = self.guid(id, fields::PANEL_GUID);
            let label = match self.doc.child_text_any(id, &[fields::LABEL, "PanelName", fields::PANEL_ID]) {
                Some(label) => label.to_string(),
                None => {
                    self.h
                        .note(ingest, EntityKind::Panel, fields::LABEL, "panel has no Label");
                    guid.as_ref()
                        .map(|g| g.to_string())
                        .unwrap_or_else(|| format!("Panel_{}", self.h.panel_count() + 1))
                }
            };

            let reference = self
                .doc
                .children(id)
                .find(|&c| self.doc.name(c) == "Bundle" && self.doc.get(c).has_children());
            let bundle_name = reference
                .and_then(|r| self.doc.child_text_any(r, &[fields::BUNDLE_NAME, fields::LABEL]))
                .or_else(|| self.text(id, fields::BUNDLE_NAME));

            let structural_bundle = enclosing.bundle.and_then(|b| self.bundle_elems.get(&b).copied());
            let structural_level = enclosing.level.and_then(|l| self.level_elems.get(&l).copied());

            let bundle_guid = self
                .guid(id, fields::BUNDLE_GUID)
                .or_else(|| reference.and_then(|r| self.guid(r, fields::BUNDLE_GUID)))
                .or_else(|| {
                    structural_bundle
                        .and_then(|k| self.h.bundle(k))
                        .and_then(|b| b.guid.clone())
                });
            let level_guid = self
                .guid(id, fields::LEVEL_GUID)
                .or_else(|| {
                    structural_level
                        .and_then(|k| self.h.level(k))
                        .and_then(|l| l.guid.clone())
                })
                .or_else(|| {
                    bundle_guid
                        .as_ref()
                        .and_then(|g| self.h.bundle_by_guid(g))
                        .and_then(|k| self.h.bundle(k))
                        .and_then(|b| b.level_guid.clone())
                });

            let bundle = match structural_bundle {
                Some(key) => Some(key),
                None => {
                    let level_no = self.text(id, fields::LEVEL_NO);
                    self.resolve_bundle(
                        bundle_guid.as_ref(),
                        bundle_name,
                        level_guid.as_ref(),
                        level_no,
                        ingest,
                    )
                }
            };

            if guid.is_none() {
                self.h
                    .note(ingest, EntityKind::Panel, fields::PANEL_GUID, format!("panel '{label}' declares no PanelGuid"));
            }
            if bundle.is_none() {
                self.h.note(
                    ingest,
                    EntityKind::Panel,
                    fields::BUNDLE_GUID,
                    format!("panel '{label}' has no resolvable bundle"),
                );
            }

            let key = self.h.insert_panel(Panel {
                guid,
                label: label.clone(),
                bundle,
                level_guid,
                bundle_guid,
                ingest,
                subassemblies: Vec::new(),
                materials: Vec::new(),
                junction_names: Vec::new(),
            });
            self.panel_elems.insert(id, key);
            self.panel_labels.entry(label).or_insert(key);
        }
        Ok(())
    }

    /// Structural panel first, then the element's own `PanelGuid`.
    fn resolve_panel(&self, id: ElementId) -> Option<PanelKey> {
        let enclosing = self.enclosing[id.index()];
        enclosing
            .panel
            .and_then(|p| self.panel_elems.get(&p).copied())
            .or_else(|| {
                self.guid(id, fields::PANEL_GUID)
                    .and_then(|g| self.h.panel_by_guid(&g))
            })
    }

    // -------------------------------------------------------------------------
    // Subassemblies
    // -------------------------------------------------------------------------

    fn build_subassemblies(&mut self) -> Result<()> {
        for id in self.elements_of(EntityKind::SubAssembly) {
            self.check_cancel()?;
            let ingest = Self::ingest(id);

            let guid = self.guid(id, fields::SUBASSEMBLY_GUID);
            let name = self.text(id, fields::SUBASSEMBLY_NAME).map(str::to_string);
            let family = self.text(id, fields::FAMILY_MEMBER_NAME).map(str::to_string);
            let kind = SubAssemblyKind::classify(family.as_deref(), name.as_deref());
            let label = self
                .text(id, fields::LABEL)
                .map(str::to_string)
                .or_else(|| name.clone())
                .unwrap_or_default();

            let panel = self.resolve_panel(id);
            let panel_guid = match panel {
                Some(key) => self.h.panel(key).and_then(|p| p.guid.clone()),
                None => self.guid(id, fields::PANEL_GUID),
            };

            if guid.is_none() {
                self.h.note(
                    ingest,
                    EntityKind::SubAssembly,
                    fields::SUBASSEMBLY_GUID,
                    format!("{kind} subassembly '{label}' declares no SubAssemblyGuid"),
                );
            }
            if panel.is_none() {
                self.h.note(
                    ingest,
                    EntityKind::SubAssembly,
                    fields::PANEL_GUID,
                    format!("subassembly '{label}' has no resolvable panel"),
                );
            }

            let key = self.h.insert_subassembly(SubAssembly {
                guid,
                label,
                name,
                family,
                kind,
                panel,
                panel_guid,
                ingest,
            });
            self.subassembly_elems.insert(id, key);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Materials
    // -------------------------------------------------------------------------

    fn build_materials(&mut self) -> Result<()> {
        let mut elements: Vec<(ElementId, MaterialKind)> = MaterialKind::ALL
            .iter()
            .flat_map(|&kind| {
                self.elements_of(kind.entity_kind())
                    .into_iter()
                    .map(move |id| (id, kind))
            })
            .collect();
        elements.sort_unstable_by_key(|(id, _)| *id);

        for (id, kind) in elements {
            self.check_cancel()?;
            let material = self.material(id, kind);
            self.h.insert_material(material);
        }
        Ok(())
    }

    fn material(&mut self, id: ElementId, kind: MaterialKind) -> Material {
        let ingest = Self::ingest(id);
        let entity = kind.entity_kind();
        let enclosing = self.enclosing[id.index()];
        let nested = self.doc.child(id, fields::MATERIAL);

        let guid = self
            .guid(id, kind.guid_field())
            .or_else(|| nested.and_then(|m| self.guid(m, kind.guid_field())));
        let label = self
            .doc
            .child_text_any(id, &[fields::LABEL, "LabelText"])
            .unwrap_or_default()
            .to_string();
        let role = match self.doc.child_text_any(id, &[fields::FAMILY_MEMBER_NAME, "Type", "Name"]) {
            Some(family) => RoleTag::parse(family),
            None => RoleTag::Other(kind.element_name().to_string()),
        };
        let description = nested
            .and_then(|m| self.text(m, fields::DESCRIPTION))
            .or_else(|| self.doc.child_text_any(id, &[fields::DESCRIPTION, "TypeOfSheathing"]))
            .map(str::to_string);

        let structural_sub = enclosing.subassembly;
        let subassembly_guid = self
            .guid(id, fields::SUBASSEMBLY_GUID)
            .or_else(|| structural_sub.and_then(|s| self.guid(s, fields::SUBASSEMBLY_GUID)));

        let panel = self.resolve_panel(id).or_else(|| {
            structural_sub
                .and_then(|s| self.subassembly_elems.get(&s))
                .and_then(|&k| self.h.subassembly(k))
                .and_then(|s| s.panel)
        });
        let (panel_guid, bundle_guid, level_guid) = match panel.and_then(|k| self.h.panel(k)) {
            Some(p) => (p.guid.clone(), p.bundle_guid.clone(), p.level_guid.clone()),
            None => (
                self.guid(id, fields::PANEL_GUID),
                self.guid(id, fields::BUNDLE_GUID),
                self.guid(id, fields::LEVEL_GUID),
            ),
        };

        let geometry = self.geometry(id, entity);

        if guid.is_none() {
            self.h.note(
                ingest,
                entity,
                kind.guid_field(),
                format!("{kind} '{label}' declares no {}", kind.guid_field()),
            );
        }
        if panel.is_none() {
            self.h.note(
                ingest,
                entity,
                fields::PANEL_GUID,
                format!("{kind} '{label}' has no resolvable panel"),
            );
        }

        Material {
            kind,
            guid,
            label,
            role,
            description,
            geometry,
            subassembly_guid,
            panel,
            panel_guid,
            bundle_guid,
            level_guid,
            ingest,
        }
    }

    /// Height = highest `ElevationView` Y (falling back to a direct `<Y>`),
    /// boundaries = min/max `BottomView` X (falling back to direct `<X>`s).
    fn geometry(&mut self, id: ElementId, entity: EntityKind) -> Geometry {
        let ys = self.view_coordinates(id, fields::ELEVATION_VIEW, fields::Y, entity);
        let height = ys
            .into_iter()
            .reduce(f64::max)
            .or_else(|| self.text(id, fields::Y).and_then(parse_number));

        let mut xs = self.view_coordinates(id, fields::BOTTOM_VIEW, fields::X, entity);
        if xs.len() < 2 {
            xs = self
                .doc
                .children(id)
                .filter(|&c| self.doc.name(c) == fields::X)
                .filter_map(|c| self.doc.text(c).and_then(parse_number))
                .collect();
        }
        let boundaries = if xs.len() >= 2 {
            let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
            let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            Some((min, max))
        } else {
            None
        };

        Geometry { height, boundaries }
    }

    fn view_coordinates(
        &mut self,
        id: ElementId,
        view: &str,
        axis: &'static str,
        entity: EntityKind,
    ) -> Vec<f64> {
        let mut values = Vec::new();
        let doc = self.doc;
        for view_id in doc.descendants(id).filter(|&d| doc.name(d) == view) {
            for coord in doc.descendants(view_id).filter(|&d| doc.name(d) == axis) {
                let Some(text) = doc.text(coord) else { continue };
                match parse_number(text) {
                    Some(value) => values.push(value),
                    None => self.h.note(
                        Self::ingest(id),
                        entity,
                        axis,
                        format!("unparsable {view} coordinate '{text}'"),
                    ),
                }
            }
        }
        values
    }

    // -------------------------------------------------------------------------
    // Junctions
    // -------------------------------------------------------------------------

    fn attach_junctions(&mut self) -> Result<()> {
        for id in self.elements_of(EntityKind::Junction) {
            self.check_cancel()?;
            let ingest = Self::ingest(id);

            let Some(name) = self.text(id, fields::SUBASSEMBLY_NAME) else {
                self.h.note(
                    ingest,
                    EntityKind::Junction,
                    fields::SUBASSEMBLY_NAME,
                    "junction has no SubAssemblyName",
                );
                continue;
            };

            let panel = self.resolve_panel(id).or_else(|| {
                self.doc
                    .child_text_any(id, &[fields::PANEL_ID, fields::LABEL])
                    .and_then(|reference| {
                        Guid::new(reference)
                            .and_then(|g| self.h.panel_by_guid(&g))
                            .or_else(|| self.panel_labels.get(reference).copied())
                    })
            });

            match panel {
                Some(key) => {
                    if let Some(panel) = self.h.panels.get_mut(key) {
                        panel.junction_names.push(name.to_string());
                    }
                }
                None => self.h.note(
                    ingest,
                    EntityKind::Junction,
                    fields::PANEL_ID,
                    format!("junction '{name}' has no resolvable panel"),
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const NESTED: &str = r#"<EHX>
  <Level>
    <LevelGuid>L1</LevelGuid>
    <LevelNo>1</LevelNo>
    <Description>Level 1</Description>
    <Bundle>
      <BundleGuid>B1</BundleGuid>
      <Label>B1 (2x6 Ext)</Label>
      <Panel>
        <PanelGuid>P1</PanelGuid>
        <Label>05-100</Label>
        <SubAssembly>
          <SubAssemblyGuid>S1</SubAssemblyGuid>
          <FamilyMemberName>RoughOpening</FamilyMemberName>
          <SubAssemblyName>Window 3068</SubAssemblyName>
          <Board>
            <BoardGuid>M1</BoardGuid>
            <FamilyMemberName>Header</FamilyMemberName>
            <Label>H</Label>
            <Material><Description>2x10 SPF</Description></Material>
          </Board>
        </SubAssembly>
        <Board>
          <BoardGuid>M2</BoardGuid>
          <FamilyMemberName>BottomPlate</FamilyMemberName>
          <Label>A</Label>
        </Board>
      </Panel>
    </Bundle>
  </Level>
</EHX>"#;

    const FLAT: &str = r#"<EHX>
  <Level>
    <LevelGuid>L1</LevelGuid>
    <LevelNo>1</LevelNo>
    <Description>Level 1</Description>
  </Level>
  <Bundle>
    <BundleGuid>B1</BundleGuid>
    <LevelGuid>L1</LevelGuid>
    <Label>B1 (2x6 Ext)</Label>
  </Bundle>
  <Panel>
    <PanelGuid>P1</PanelGuid>
    <BundleGuid>B1</BundleGuid>
    <Label>05-100</Label>
  </Panel>
  <SubAssembly>
    <SubAssemblyGuid>S1</SubAssemblyGuid>
    <PanelGuid>P1</PanelGuid>
    <FamilyMemberName>RoughOpening</FamilyMemberName>
    <SubAssemblyName>Window 3068</SubAssemblyName>
  </SubAssembly>
  <Board>
    <BoardGuid>M1</BoardGuid>
    <PanelGuid>P1</PanelGuid>
    <SubAssemblyGuid>S1</SubAssemblyGuid>
    <FamilyMemberName>Header</FamilyMemberName>
    <Label>H</Label>
  </Board>
  <Board>
    <BoardGuid>M2</BoardGuid>
    <PanelGuid>P1</PanelGuid>
    <FamilyMemberName>BottomPlate</FamilyMemberName>
    <Label>A</Label>
  </Board>
</EHX>"#;

    fn build(xml: &str) -> Hierarchy {
        let doc = Document::parse_str(xml).unwrap();
        build_hierarchy(&doc).unwrap()
    }

    fn guid(s: &str) -> Guid {
        Guid::new(s).unwrap()
    }

    fn shape(h: &Hierarchy) -> Vec<String> {
        let mut out = Vec::new();
        for &lk in h.level_keys() {
            let level = h.level(lk).unwrap();
            out.push(format!("level {}", level.label));
            for &bk in &level.bundles {
                let bundle = h.bundle(bk).unwrap();
                out.push(format!(" bundle {}", bundle.label));
                for &pk in &bundle.panels {
                    let panel = h.panel(pk).unwrap();
                    out.push(format!("  panel {}", panel.label));
                    for &sk in &panel.subassemblies {
                        let sub = h.subassembly(sk).unwrap();
                        out.push(format!("   sub {} {}", sub.kind, sub.label));
                    }
                    for &mk in &panel.materials {
                        let m = h.material(mk).unwrap();
                        out.push(format!(
                            "   material {} {} {:?}",
                            m.role,
                            m.label,
                            m.subassembly_guid.as_ref().map(Guid::as_str)
                        ));
                    }
                }
            }
        }
        out
    }

    #[test]
    fn nested_document_builds_full_tree() {
        let h = build(NESTED);
        assert_eq!(h.level_count(), 1);
        assert_eq!(h.bundle_count(), 1);
        assert_eq!(h.panel_count(), 1);
        assert_eq!(h.subassembly_count(), 1);
        assert_eq!(h.material_count(), 2);
        assert!(h.notes().is_empty(), "unexpected notes: {:?}", h.notes());

        let header = h.material_by_guid(MaterialKind::Board, &guid("M1")).unwrap();
        let header = h.material(header).unwrap();
        assert_eq!(header.role, RoleTag::Header);
        assert_eq!(header.subassembly_guid, Some(guid("S1")));
        assert_eq!(header.panel_guid, Some(guid("P1")));
        assert_eq!(header.bundle_guid, Some(guid("B1")));
        assert_eq!(header.level_guid, Some(guid("L1")));
        assert_eq!(header.description.as_deref(), Some("2x10 SPF"));
    }

    #[test]
    fn flat_and_nested_resolve_identically() {
        assert_eq!(shape(&build(NESTED)), shape(&build(FLAT)));
    }

    #[test]
    fn panel_bundle_reference_block() {
        let h = build(
            r#"<EHX>
  <Level><LevelGuid>L1</LevelGuid><LevelNo>2</LevelNo></Level>
  <Panel>
    <PanelGuid>P1</PanelGuid>
    <Label>02_001</Label>
    <LevelGuid>L1</LevelGuid>
    <Bundle>
      <BundleGuid>B7</BundleGuid>
      <BundleName>B7</BundleName>
      <BundleLayer>1</BundleLayer>
    </Bundle>
  </Panel>
</EHX>"#,
        );
        let bk = h.bundle_by_guid(&guid("B7")).unwrap();
        let bundle = h.bundle(bk).unwrap();
        assert!(bundle.synthesized);
        assert_eq!(bundle.label, "B7");
        assert_eq!(bundle.level, h.level_by_guid(&guid("L1")));
        assert_eq!(bundle.panels.len(), 1);
        assert_eq!(h.notes().len(), 1);
        assert_eq!(h.notes()[0].field, fields::BUNDLE_GUID);
    }

    #[test]
    fn text_only_level_inside_panel_is_a_field() {
        let h = build(
            "<EHX><Panel><PanelGuid>P1</PanelGuid><Label>A</Label><Level>1</Level></Panel></EHX>",
        );
        assert_eq!(h.level_count(), 0);
        assert_eq!(h.panel_count(), 1);
    }

    #[test]
    fn missing_ancestors_degrade_with_notes() {
        let h = build(
            r#"<EHX>
  <Panel><Label>05-100</Label></Panel>
  <Board><FamilyMemberName>Stud</FamilyMemberName><Label>B</Label></Board>
</EHX>"#,
        );
        assert_eq!(h.unassigned_panels().len(), 1);
        assert_eq!(h.unassigned_materials().len(), 1);
        let fields: Vec<&str> = h.notes().iter().map(|n| n.field).collect();
        assert_eq!(fields, vec!["PanelGuid", "BundleGuid", "BoardGuid", "PanelGuid"]);
    }

    #[test]
    fn geometry_from_views() {
        let h = build(
            r#"<EHX><Panel><PanelGuid>P1</PanelGuid><Label>A</Label>
  <Board>
    <BoardGuid>T1</BoardGuid>
    <FamilyMemberName>Trimmer</FamilyMemberName>
    <ElevationView>
      <Point><X>12</X><Y>0</Y></Point>
      <Point><X>12</X><Y>75.25</Y></Point>
    </ElevationView>
    <BottomView>
      <Point><X>48.0</X><Y>0</Y></Point>
      <Point><X>12.0</X><Y>0</Y></Point>
    </BottomView>
  </Board>
  <Board>
    <BoardGuid>T2</BoardGuid>
    <FamilyMemberName>Trimmer</FamilyMemberName>
    <Y>81</Y>
    <ElevationView><Point><Y>n/a</Y></Point></ElevationView>
  </Board>
</Panel></EHX>"#,
        );
        let t1 = h.material_by_guid(MaterialKind::Board, &guid("T1")).unwrap();
        let g = h.material(t1).unwrap().geometry;
        approx::assert_relative_eq!(g.height.unwrap(), 75.25);
        assert_eq!(g.boundaries, Some((12.0, 48.0)));

        let t2 = h.material_by_guid(MaterialKind::Board, &guid("T2")).unwrap();
        let g = h.material(t2).unwrap().geometry;
        assert_eq!(g.height, Some(81.0));
        assert_eq!(g.boundaries, None);
        let coordinate_notes: Vec<_> = h.notes().iter().filter(|n| n.field == "Y").collect();
        assert_eq!(coordinate_notes.len(), 1);
        assert_eq!(coordinate_notes[0].ingest, h.material(t2).unwrap().ingest);
    }

    #[test]
    fn junctions_attach_by_label() {
        let h = build(
            r#"<EHX>
  <Panel><PanelGuid>P1</PanelGuid><Label>05-100</Label></Panel>
  <Junction><Label>05-100</Label><SubAssemblyName>LType</SubAssemblyName></Junction>
  <Junction><PanelID>P1</PanelID><SubAssemblyName>Ladder 16oc</SubAssemblyName></Junction>
  <Junction><Label>07-999</Label><SubAssemblyName>LType</SubAssemblyName></Junction>
</EHX>"#,
        );
        let pk = h.panel_by_guid(&guid("P1")).unwrap();
        assert_eq!(h.panel(pk).unwrap().junction_names, vec!["LType", "Ladder 16oc"]);
        let unresolved = h
            .notes()
            .iter()
            .filter(|n| n.element == EntityKind::Junction)
            .count();
        assert_eq!(unresolved, 1);
    }

    #[test]
    fn duplicate_guids_keep_first_as_canonical() {
        let h = build(
            r#"<EHX><Panel><PanelGuid>P1</PanelGuid><Label>A</Label>
  <SubAssembly><SubAssemblyGuid>S1</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName><Label>first</Label></SubAssembly>
  <SubAssembly><SubAssemblyGuid>S1</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName><Label>second</Label></SubAssembly>
</Panel></EHX>"#,
        );
        let matches = h.subassemblies_by_guid(&guid("S1"));
        assert_eq!(matches.len(), 2);
        let canonical = h.subassembly_by_guid(&guid("S1")).unwrap();
        assert_eq!(h.subassembly(canonical).unwrap().label, "first");
    }

    #[test]
    fn cancellation_discards_build() {
        let doc = Document::parse_str(NESTED).unwrap();
        let flag = CancelFlag::new();
        flag.cancel();
        let result = HierarchyBuilder::new(&doc).with_cancel(&flag).build();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn build_is_deterministic() {
        let a = build(FLAT);
        let b = build(FLAT);
        assert_eq!(shape(&a), shape(&b));
        assert_eq!(a.notes(), b.notes());
    }
}
