// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Association Engine - rough openings to their header materials
//!
//! One record per subassembly identifier. The lowest-ingest RoughOpening
//! declaring the identifier is canonical; any further RoughOpenings sharing
//! it are kept on the record as conflicts for the validator. Headers are the
//! Header-role materials of the canonical opening's panel whose back-reference
//! equals the identifier.

use ehx_lite_core::{
    CancelFlag, Guid, Hierarchy, MaterialKey, PanelKey, SubAssemblyKey, SubAssemblyKind,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use smallvec::SmallVec;

use crate::error::Result;
use crate::isolation::in_scope;

/// Association of one subassembly identifier.
#[derive(Debug, Clone, Serialize)]
pub struct AssociationRecord {
    pub guid: Guid,
    /// Canonical RoughOpening. `None` when Header materials reference an
    /// identifier that no RoughOpening declares.
    pub canonical: Option<SubAssemblyKey>,
    /// Further RoughOpenings declaring the same identifier, in ingestion
    /// order.
    pub conflicting: Vec<SubAssemblyKey>,
    /// Linked Header materials, in ingestion order.
    pub headers: SmallVec<[MaterialKey; 2]>,
}

impl AssociationRecord {
    pub fn has_conflict(&self) -> bool {
        !self.conflicting.is_empty()
    }
}

/// All association records, in order of the first entity involved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Associations {
    records: Vec<AssociationRecord>,
    #[serde(skip)]
    index: FxHashMap<Guid, usize>,
}

impl Associations {
    pub fn build(h: &Hierarchy, cancel: &CancelFlag) -> Result<Self> {
        let mut assoc = Self::default();

        // Rough openings first: canonical and conflicting members
        for sk in h.subassemblies_in_document_order() {
            let Some(sub) = h.subassembly(sk) else { continue };
            if sub.kind != SubAssemblyKind::RoughOpening {
                continue;
            }
            let Some(guid) = &sub.guid else { continue };
            match assoc.index.get(guid) {
                Some(&i) => assoc.records[i].conflicting.push(sk),
                None => assoc.insert(AssociationRecord {
                    guid: guid.clone(),
                    canonical: Some(sk),
                    conflicting: Vec::new(),
                    headers: SmallVec::new(),
                }),
            }
        }

        for record in &mut assoc.records {
            cancel.check()?;
            let Some(panel) = record
                .canonical
                .and_then(|sk| h.subassembly(sk))
                .and_then(|s| s.panel)
            else {
                continue;
            };
            record.headers = headers_in(h, panel, &record.guid);
        }

        // Header materials pointing at an identifier no RoughOpening declares
        let mut orphan_scopes: Vec<(Guid, PanelKey)> = Vec::new();
        let mut seen: FxHashSet<Guid> = FxHashSet::default();
        for mk in h.materials_in_document_order() {
            let Some(material) = h.material(mk) else { continue };
            if !material.role.is_header() {
                continue;
            }
            let (Some(guid), Some(panel)) = (&material.subassembly_guid, material.panel) else {
                continue;
            };
            if assoc.index.contains_key(guid) || !seen.insert(guid.clone()) {
                continue;
            }
            orphan_scopes.push((guid.clone(), panel));
        }
        for (guid, panel) in orphan_scopes {
            cancel.check()?;
            let headers = headers_in(h, panel, &guid);
            assoc.insert(AssociationRecord {
                guid,
                canonical: None,
                conflicting: Vec::new(),
                headers,
            });
        }

        tracing::debug!(
            records = assoc.records.len(),
            conflicts = assoc.records.iter().filter(|r| r.has_conflict()).count(),
            "associated rough openings with headers"
        );
        Ok(assoc)
    }

    fn insert(&mut self, record: AssociationRecord) {
        self.index.insert(record.guid.clone(), self.records.len());
        self.records.push(record);
    }

    pub fn get(&self, guid: &Guid) -> Option<&AssociationRecord> {
        self.index.get(guid).map(|&i| &self.records[i])
    }

    /// Header materials linked to `guid`; empty when none.
    pub fn headers(&self, guid: &Guid) -> &[MaterialKey] {
        self.get(guid).map_or(&[], |r| r.headers.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssociationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops removed materials from every header list.
    pub fn prune(&mut self, removed: &FxHashSet<MaterialKey>) {
        if removed.is_empty() {
            return;
        }
        for record in &mut self.records {
            record.headers.retain(|mk| !removed.contains(mk));
        }
    }
}

fn headers_in(h: &Hierarchy, panel: PanelKey, guid: &Guid) -> SmallVec<[MaterialKey; 2]> {
    let Some(p) = h.panel(panel) else {
        return SmallVec::new();
    };
    p.materials
        .iter()
        .copied()
        .filter(|&mk| {
            h.material(mk)
                .is_some_and(|m| m.role.is_header() && in_scope(m, panel, guid))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn build(xml: &str) -> (Hierarchy, Associations) {
        let h = fixtures::hierarchy(xml);
        let assoc = Associations::build(&h, &CancelFlag::new()).unwrap();
        (h, assoc)
    }

    #[test]
    fn links_headers_by_identifier_and_role() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            r#"<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>
<Board><BoardGuid>1</BoardGuid><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>H</Label></Board>
<Board><BoardGuid>2</BoardGuid><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>Trimmer</FamilyMemberName><Label>T</Label></Board>
<Board><BoardGuid>3</BoardGuid><SubAssemblyGuid>OTHER</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>H</Label></Board>"#,
        );
        let (h, assoc) = build(&xml);
        let ro = fixtures::guid("RO");
        let record = assoc.get(&ro).unwrap();
        assert_eq!(record.canonical, Some(fixtures::subassembly(&h, "RO")));
        assert_eq!(record.headers.as_slice(), &[fixtures::board(&h, "1")]);
        assert!(!record.has_conflict());
    }

    #[test]
    fn opening_without_headers_has_empty_list() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            "<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>",
        );
        let (_, assoc) = build(&xml);
        assert!(assoc.headers(&fixtures::guid("RO")).is_empty());
        assert_eq!(assoc.len(), 1);
    }

    #[test]
    fn first_rough_opening_is_canonical() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            r#"<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName><Label>first</Label></SubAssembly>
<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName><Label>second</Label></SubAssembly>"#,
        );
        let (h, assoc) = build(&xml);
        let record = assoc.get(&fixtures::guid("RO")).unwrap();
        let canonical = h.subassembly(record.canonical.unwrap()).unwrap();
        assert_eq!(canonical.label, "first");
        assert_eq!(record.conflicting.len(), 1);
        assert_eq!(h.subassembly(record.conflicting[0]).unwrap().label, "second");
    }

    #[test]
    fn headers_from_other_panels_are_excluded() {
        let xml = r#"<EHX>
  <Panel><PanelGuid>P1</PanelGuid><Label>A</Label>
    <SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>
  </Panel>
  <Panel><PanelGuid>P2</PanelGuid><Label>B</Label>
    <Board><BoardGuid>9</BoardGuid><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>H</Label></Board>
  </Panel>
</EHX>"#;
        let (_, assoc) = build(xml);
        assert!(assoc.headers(&fixtures::guid("RO")).is_empty());
    }

    #[test]
    fn orphan_headers_get_a_record_without_canonical() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            r#"<Board><BoardGuid>1</BoardGuid><SubAssemblyGuid>GONE</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>H</Label></Board>"#,
        );
        let (h, assoc) = build(&xml);
        let record = assoc.get(&fixtures::guid("GONE")).unwrap();
        assert_eq!(record.canonical, None);
        assert_eq!(record.headers.as_slice(), &[fixtures::board(&h, "1")]);
    }

    #[test]
    fn prune_drops_removed_keys() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            r#"<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>
<Board><BoardGuid>1</BoardGuid><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>H</Label></Board>"#,
        );
        let (h, mut assoc) = build(&xml);
        let removed: FxHashSet<_> = [fixtures::board(&h, "1")].into_iter().collect();
        assoc.prune(&removed);
        assert!(assoc.headers(&fixtures::guid("RO")).is_empty());
    }
}
