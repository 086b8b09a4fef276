// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Isolation Guard - per-subassembly material partitioning
//!
//! Every derived material list is scoped by identifier equality alone: the
//! material's own panel, then its subassembly back-reference. Labels and
//! roles never decide membership, so two subassemblies with look-alike
//! members cannot exchange materials.

use ehx_lite_core::{CancelFlag, Guid, Hierarchy, Material, MaterialKey, PanelKey};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// Returns `true` if `material` belongs in the list scoped to the
/// subassembly `guid` of panel `panel`.
#[inline]
pub fn in_scope(material: &Material, panel: PanelKey, guid: &Guid) -> bool {
    material.panel == Some(panel) && material.subassembly_guid.as_ref() == Some(guid)
}

/// Materials partitioned by (panel, subassembly identifier), plus the
/// per-panel materials that reference no subassembly.
#[derive(Debug, Clone, Default)]
pub struct IsolatedMaterials {
    by_subassembly: FxHashMap<(PanelKey, Guid), Vec<MaterialKey>>,
    loose: FxHashMap<PanelKey, Vec<MaterialKey>>,
}

impl IsolatedMaterials {
    /// Partitions the materials of every panel. Lists keep ingestion order.
    pub fn partition(h: &Hierarchy, cancel: &CancelFlag) -> Result<Self> {
        let mut isolated = Self::default();

        for pk in h.panels_in_document_order() {
            cancel.check()?;
            let Some(panel) = h.panel(pk) else { continue };
            for &mk in &panel.materials {
                let Some(material) = h.material(mk) else { continue };
                match &material.subassembly_guid {
                    Some(guid) => isolated
                        .by_subassembly
                        .entry((pk, guid.clone()))
                        .or_default()
                        .push(mk),
                    None => isolated.loose.entry(pk).or_default().push(mk),
                }
            }
        }

        tracing::debug!(
            scopes = isolated.by_subassembly.len(),
            loose_panels = isolated.loose.len(),
            "partitioned materials by subassembly"
        );
        Ok(isolated)
    }

    /// Materials of `panel` referencing subassembly `guid`.
    pub fn for_subassembly(&self, panel: PanelKey, guid: &Guid) -> &[MaterialKey] {
        self.by_subassembly
            .get(&(panel, guid.clone()))
            .map_or(&[], Vec::as_slice)
    }

    /// Materials of `panel` that reference no subassembly.
    pub fn loose(&self, panel: PanelKey) -> &[MaterialKey] {
        self.loose.get(&panel).map_or(&[], Vec::as_slice)
    }

    /// Subassembly identifiers that have materials in `panel`.
    pub fn scopes(&self, panel: PanelKey) -> impl Iterator<Item = &Guid> {
        self.by_subassembly
            .keys()
            .filter(move |(pk, _)| *pk == panel)
            .map(|(_, guid)| guid)
    }

    /// Re-verifies the partition against the hierarchy.
    pub fn check(&self, h: &Hierarchy) -> Result<()> {
        for ((pk, guid), keys) in &self.by_subassembly {
            for &mk in keys {
                let Some(material) = h.material(mk) else { continue };
                if !in_scope(material, *pk, guid) {
                    return Err(breach(material, guid.as_str()));
                }
            }
        }
        for (pk, keys) in &self.loose {
            for &mk in keys {
                let Some(material) = h.material(mk) else { continue };
                if material.panel != Some(*pk) || material.subassembly_guid.is_some() {
                    return Err(breach(material, "<none>"));
                }
            }
        }
        Ok(())
    }
}

fn breach(material: &Material, scope: &str) -> Error {
    Error::IsolationBreach {
        ingest: material.ingest,
        scope: scope.to_string(),
        actual: material
            .subassembly_guid
            .as_ref()
            .map_or_else(|| "<none>".to_string(), |g| g.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    const TWO_OPENINGS: &str = r#"<EHX>
  <Panel><PanelGuid>P1</PanelGuid><Label>A</Label>
    <SubAssembly><SubAssemblyGuid>X</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>
    <SubAssembly><SubAssemblyGuid>Y</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>
    <Board><BoardGuid>1</BoardGuid><SubAssemblyGuid>X</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>H</Label></Board>
    <Board><BoardGuid>2</BoardGuid><SubAssemblyGuid>Y</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>H</Label></Board>
    <Board><BoardGuid>3</BoardGuid><FamilyMemberName>Stud</FamilyMemberName><Label>S</Label></Board>
  </Panel>
  <Panel><PanelGuid>P2</PanelGuid><Label>B</Label>
    <Board><BoardGuid>4</BoardGuid><SubAssemblyGuid>X</SubAssemblyGuid><FamilyMemberName>Header</FamilyMemberName><Label>H</Label></Board>
  </Panel>
</EHX>"#;

    #[test]
    fn lists_never_cross_identifiers() {
        let h = fixtures::hierarchy(TWO_OPENINGS);
        let isolated = IsolatedMaterials::partition(&h, &CancelFlag::new()).unwrap();
        let p1 = fixtures::panel(&h, "P1");
        let x = fixtures::guid("X");
        let y = fixtures::guid("Y");

        let x_list = isolated.for_subassembly(p1, &x);
        let y_list = isolated.for_subassembly(p1, &y);
        assert_eq!(x_list.len(), 1);
        assert_eq!(y_list.len(), 1);
        for &mk in x_list {
            assert_eq!(h.material(mk).unwrap().subassembly_guid.as_ref(), Some(&x));
        }
        for &mk in y_list {
            assert_eq!(h.material(mk).unwrap().subassembly_guid.as_ref(), Some(&y));
        }
        assert_eq!(isolated.loose(p1).len(), 1);
        assert!(isolated.check(&h).is_ok());
    }

    #[test]
    fn same_identifier_in_another_panel_stays_separate() {
        let h = fixtures::hierarchy(TWO_OPENINGS);
        let isolated = IsolatedMaterials::partition(&h, &CancelFlag::new()).unwrap();
        let p1 = fixtures::panel(&h, "P1");
        let p2 = fixtures::panel(&h, "P2");
        let x = fixtures::guid("X");
        let p2_list = isolated.for_subassembly(p2, &x);
        assert_eq!(p2_list.len(), 1);
        assert!(!isolated.for_subassembly(p1, &x).contains(&p2_list[0]));
    }

    #[test]
    fn check_detects_foreign_material() {
        let h = fixtures::hierarchy(TWO_OPENINGS);
        let mut isolated = IsolatedMaterials::partition(&h, &CancelFlag::new()).unwrap();
        let p1 = fixtures::panel(&h, "P1");
        let intruder = isolated.for_subassembly(p1, &fixtures::guid("Y"))[0];
        isolated
            .by_subassembly
            .get_mut(&(p1, fixtures::guid("X")))
            .unwrap()
            .push(intruder);
        assert!(matches!(isolated.check(&h), Err(Error::IsolationBreach { .. })));
    }

    #[test]
    fn cancelled_partition() {
        let h = fixtures::hierarchy(TWO_OPENINGS);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = IsolatedMaterials::partition(&h, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }
}
