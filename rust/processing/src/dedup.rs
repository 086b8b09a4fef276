// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deduplicator - first-wins removal of repeated material records.

use std::hash::Hash;

use ehx_lite_core::{CancelFlag, Hierarchy, MaterialKey};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::association::Associations;
use crate::error::Result;

/// Counts from one deduplication pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub examined: usize,
    pub removed: usize,
}

/// Splits `items` into (kept, dropped). The first item producing a key is
/// kept; later items with the same key are dropped. Items without a key are
/// always kept. Order is preserved on both sides.
pub fn partition_first_wins<T, K, F>(items: Vec<T>, mut key: F) -> (Vec<T>, Vec<T>)
where
    K: Hash + Eq,
    F: FnMut(&T) -> Option<K>,
{
    let mut seen = FxHashSet::default();
    let mut kept = Vec::with_capacity(items.len());
    let mut dropped = Vec::new();
    for item in items {
        let duplicate = key(&item).is_some_and(|k| !seen.insert(k));
        if duplicate {
            dropped.push(item);
        } else {
            kept.push(item);
        }
    }
    (kept, dropped)
}

/// Removes repeated `(kind, identifier)` materials from the hierarchy,
/// keeping the lowest ingestion index, and prunes association header lists.
pub fn deduplicate(
    h: &mut Hierarchy,
    associations: &mut Associations,
    cancel: &CancelFlag,
) -> Result<DedupStats> {
    let order = h.materials_in_document_order();
    let examined = order.len();

    let (_, dropped) = partition_first_wins(order, |&mk: &MaterialKey| {
        h.material(mk)
            .and_then(|m| m.dedup_key())
            .map(|(kind, guid)| (kind, guid.clone()))
    });

    cancel.check()?;
    let mut removed = FxHashSet::default();
    for mk in dropped {
        if let Some(material) = h.remove_material(mk) {
            tracing::debug!(
                kind = %material.kind,
                guid = ?material.guid,
                ingest = material.ingest.0,
                "dropped duplicate material"
            );
            removed.insert(mk);
        }
    }
    associations.prune(&removed);

    let stats = DedupStats {
        examined,
        removed: removed.len(),
    };
    tracing::debug!(examined = stats.examined, removed = stats.removed, "deduplicated materials");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use ehx_lite_core::{Guid, MaterialKind};

    const DUPLICATES: &str = r#"<EHX><Panel><PanelGuid>P1</PanelGuid><Label>A</Label>
  <SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>
  <Board><BoardGuid>1</BoardGuid><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>first</Label></Board>
  <Board><BoardGuid>1</BoardGuid><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>second</Label></Board>
  <Sheet><SheetGuid>1</SheetGuid><Label>sheet</Label></Sheet>
  <Board><FamilyMemberName>Stud</FamilyMemberName><Label>no-id</Label></Board>
  <Board><FamilyMemberName>Stud</FamilyMemberName><Label>no-id</Label></Board>
</Panel></EHX>"#;

    #[test]
    fn first_occurrence_wins() {
        let mut h = fixtures::hierarchy(DUPLICATES);
        let cancel = CancelFlag::new();
        let mut assoc = Associations::build(&h, &cancel).unwrap();
        assert_eq!(assoc.headers(&fixtures::guid("RO")).len(), 2);

        let stats = deduplicate(&mut h, &mut assoc, &cancel).unwrap();
        assert_eq!(stats, DedupStats { examined: 5, removed: 1 });

        let boards = h.materials_by_guid(MaterialKind::Board, &fixtures::guid("1"));
        assert_eq!(boards.len(), 1);
        assert_eq!(h.material(boards[0]).unwrap().label, "first");
        assert_eq!(assoc.headers(&fixtures::guid("RO")), boards);
    }

    #[test]
    fn kinds_do_not_collide() {
        let mut h = fixtures::hierarchy(DUPLICATES);
        let cancel = CancelFlag::new();
        let mut assoc = Associations::build(&h, &cancel).unwrap();
        deduplicate(&mut h, &mut assoc, &cancel).unwrap();
        let guid = Guid::new("1").unwrap();
        assert_eq!(h.materials_by_guid(MaterialKind::Sheet, &guid).len(), 1);
    }

    #[test]
    fn deduplication_is_idempotent() {
        let mut h = fixtures::hierarchy(DUPLICATES);
        let cancel = CancelFlag::new();
        let mut assoc = Associations::build(&h, &cancel).unwrap();
        deduplicate(&mut h, &mut assoc, &cancel).unwrap();
        let after_first = h.materials_in_document_order();

        let stats = deduplicate(&mut h, &mut assoc, &cancel).unwrap();
        assert_eq!(stats.removed, 0);
        assert_eq!(h.materials_in_document_order(), after_first);
    }

    #[test]
    fn partition_is_idempotent() {
        let items = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        let (once, dropped) = partition_first_wins(items, |(k, _)| Some(*k));
        assert_eq!(once, vec![("a", 1), ("b", 2), ("c", 4)]);
        assert_eq!(dropped, vec![("a", 3), ("b", 5)]);
        let (twice, none) = partition_first_wins(once.clone(), |(k, _)| Some(*k));
        assert_eq!(twice, once);
        assert!(none.is_empty());
    }

    #[test]
    fn keyless_items_are_kept() {
        let items = vec![None, Some(1), None, Some(1)];
        let (kept, dropped) = partition_first_wins(items, |v| *v);
        assert_eq!(kept, vec![None, Some(1), None]);
        assert_eq!(dropped, vec![Some(1)]);
    }
}
