// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validator - read-only relationship checks over the finished graph.

use std::collections::BTreeSet;
use std::fmt;

use ehx_lite_core::{Guid, Hierarchy, IngestIndex, MaterialKind};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::association::Associations;

/// Issue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueCategory {
    AssociationConflict,
}

/// Issue kind, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IssueKind {
    /// More than one RoughOpening declares one identifier.
    MultipleRoughOpenings,
    /// A material references a subassembly identifier nothing declares.
    OrphanMaterial,
    /// Materials of different kinds share one identifier.
    CrossKindIdentifier,
}

impl IssueKind {
    pub fn category(&self) -> IssueCategory {
        IssueCategory::AssociationConflict
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IssueKind::MultipleRoughOpenings => "MultipleRoughOpenings",
            IssueKind::OrphanMaterial => "OrphanMaterial",
            IssueKind::CrossKindIdentifier => "CrossKindIdentifier",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub category: IssueCategory,
    pub kind: IssueKind,
    pub guid: Guid,
    /// Ingestion index of the first entity involved.
    pub ingest: IngestIndex,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Ordered validation issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Scans the hierarchy and association records.
pub fn validate(h: &Hierarchy, associations: &Associations) -> ValidationReport {
    let mut issues = Vec::new();
    multiple_rough_openings(h, associations, &mut issues);
    orphan_materials(h, &mut issues);
    cross_kind_identifiers(h, &mut issues);

    issues.sort_by_key(|i| (i.kind, i.ingest));
    tracing::debug!(issues = issues.len(), "validated hierarchy");
    ValidationReport { issues }
}

fn multiple_rough_openings(h: &Hierarchy, associations: &Associations, out: &mut Vec<Issue>) {
    for record in associations.iter().filter(|r| r.has_conflict()) {
        let Some(canonical) = record.canonical.and_then(|sk| h.subassembly(sk)) else {
            continue;
        };
        out.push(Issue {
            category: IssueCategory::AssociationConflict,
            kind: IssueKind::MultipleRoughOpenings,
            guid: record.guid.clone(),
            ingest: canonical.ingest,
            message: format!(
                "{} RoughOpening subassemblies share identifier {}; '{}' at {} is canonical",
                record.conflicting.len() + 1,
                record.guid,
                canonical.label,
                canonical.ingest
            ),
        });
    }
}

fn orphan_materials(h: &Hierarchy, out: &mut Vec<Issue>) {
    for mk in h.materials_in_document_order() {
        let Some(material) = h.material(mk) else { continue };
        let Some(guid) = &material.subassembly_guid else { continue };
        if h.subassembly_by_guid(guid).is_some() {
            continue;
        }
        out.push(Issue {
            category: IssueCategory::AssociationConflict,
            kind: IssueKind::OrphanMaterial,
            guid: guid.clone(),
            ingest: material.ingest,
            message: format!(
                "{} '{}' at {} references undeclared subassembly {}",
                material.kind, material.label, material.ingest, guid
            ),
        });
    }
}

fn cross_kind_identifiers(h: &Hierarchy, out: &mut Vec<Issue>) {
    let mut usage: FxHashMap<&Guid, (BTreeSet<MaterialKind>, IngestIndex)> = FxHashMap::default();
    for (kind, guid, keys) in h.material_guids() {
        let first = keys
            .iter()
            .filter_map(|&mk| h.material(mk))
            .map(|m| m.ingest)
            .min();
        let Some(first) = first else { continue };
        let entry = usage.entry(guid).or_insert_with(|| (BTreeSet::new(), first));
        entry.0.insert(kind);
        entry.1 = entry.1.min(first);
    }

    for (guid, (kinds, first)) in usage {
        if kinds.len() < 2 {
            continue;
        }
        let names: Vec<&str> = kinds.iter().map(MaterialKind::element_name).collect();
        out.push(Issue {
            category: IssueCategory::AssociationConflict,
            kind: IssueKind::CrossKindIdentifier,
            guid: guid.clone(),
            ingest: first,
            message: format!("identifier {guid} is used by {}", names.join(", ")),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use ehx_lite_core::CancelFlag;

    fn report(xml: &str) -> ValidationReport {
        let h = fixtures::hierarchy(xml);
        let assoc = Associations::build(&h, &CancelFlag::new()).unwrap();
        validate(&h, &assoc)
    }

    #[test]
    fn duplicate_rough_openings_reported_once() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            r#"<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName><Label>first</Label></SubAssembly>
<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName><Label>second</Label></SubAssembly>
<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName><Label>third</Label></SubAssembly>"#,
        );
        let report = report(&xml);
        assert_eq!(report.len(), 1);
        let issue = &report.issues()[0];
        assert_eq!(issue.kind, IssueKind::MultipleRoughOpenings);
        assert_eq!(issue.category, IssueCategory::AssociationConflict);
        assert_eq!(issue.guid.as_str(), "RO");
        assert!(issue.message.contains("'first'"), "{}", issue.message);
    }

    #[test]
    fn orphan_material() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            r#"<Board><BoardGuid>1</BoardGuid><SubAssemblyGuid>NOPE</SubAssemblyGuid><FamilyMemberName>Stud</FamilyMemberName><Label>A</Label></Board>"#,
        );
        let report = report(&xml);
        assert_eq!(report.of_kind(IssueKind::OrphanMaterial).count(), 1);
    }

    #[test]
    fn cross_kind_identifier_reported_once() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            r#"<Board><BoardGuid>X</BoardGuid><Label>A</Label></Board>
<Sheet><SheetGuid>X</SheetGuid><Label>S</Label></Sheet>
<Bracing><BracingGuid>X</BracingGuid><Label>B</Label></Bracing>
<Board><BoardGuid>Y</BoardGuid><Label>A</Label></Board>"#,
        );
        let report = report(&xml);
        assert_eq!(report.len(), 1);
        let issue = &report.issues()[0];
        assert_eq!(issue.kind, IssueKind::CrossKindIdentifier);
        assert_eq!(issue.message, "identifier X is used by Board, Sheet, Bracing");
    }

    #[test]
    fn issues_ordered_by_category_then_ingest() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            r#"<Board><BoardGuid>Z</BoardGuid><Label>A</Label></Board>
<Sheet><SheetGuid>Z</SheetGuid><Label>S</Label></Sheet>
<Board><BoardGuid>2</BoardGuid><SubAssemblyGuid>NOPE2</SubAssemblyGuid><Label>B</Label></Board>
<Board><BoardGuid>1</BoardGuid><SubAssemblyGuid>NOPE1</SubAssemblyGuid><Label>A</Label></Board>
<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>
<SubAssembly><SubAssemblyGuid>RO</SubAssemblyGuid><FamilyMemberName>RoughOpening</FamilyMemberName></SubAssembly>"#,
        );
        let report = report(&xml);
        let order: Vec<(IssueKind, &str)> = report
            .iter()
            .map(|i| (i.kind, i.guid.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (IssueKind::MultipleRoughOpenings, "RO"),
                (IssueKind::OrphanMaterial, "NOPE2"),
                (IssueKind::OrphanMaterial, "NOPE1"),
                (IssueKind::CrossKindIdentifier, "Z"),
            ]
        );
    }

    #[test]
    fn clean_document_has_no_issues() {
        let xml = fixtures::single_panel(
            "P1",
            "05-100",
            &fixtures::beam_pocket("BP", &["D", "E"]),
        );
        assert!(report(&xml).is_empty());
    }
}
