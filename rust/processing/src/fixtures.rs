// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared EHX snippets and lookups for unit tests.

use ehx_lite_core::{
    build_hierarchy, Document, Guid, Hierarchy, MaterialKey, MaterialKind, PanelKey, SubAssemblyKey,
};

pub fn hierarchy(xml: &str) -> Hierarchy {
    let doc = Document::parse_str(xml).expect("fixture parses");
    build_hierarchy(&doc).expect("fixture builds")
}

pub fn guid(s: &str) -> Guid {
    Guid::new(s).expect("non-blank guid")
}

pub fn panel(h: &Hierarchy, g: &str) -> PanelKey {
    h.panel_by_guid(&guid(g)).expect("panel exists")
}

pub fn subassembly(h: &Hierarchy, g: &str) -> SubAssemblyKey {
    h.subassembly_by_guid(&guid(g)).expect("subassembly exists")
}

pub fn board(h: &Hierarchy, g: &str) -> MaterialKey {
    h.material_by_guid(MaterialKind::Board, &guid(g))
        .expect("board exists")
}

/// A `<Board>` with elevation height and bottom-view boundaries.
pub fn framed_board(
    g: &str,
    sub: &str,
    family: &str,
    label: &str,
    height: f64,
    left: f64,
    right: f64,
) -> String {
    format!(
        "<Board><BoardGuid>{g}</BoardGuid><SubAssemblyGuid>{sub}</SubAssemblyGuid>\
         <FamilyMemberName>{family}</FamilyMemberName><Label>{label}</Label>\
         <ElevationView><Point><X>{left}</X><Y>0</Y></Point><Point><X>{left}</X><Y>{height}</Y></Point></ElevationView>\
         <BottomView><Point><X>{left}</X><Y>0</Y></Point><Point><X>{right}</X><Y>0</Y></Point></BottomView></Board>"
    )
}

/// A BeamPocket subassembly: one Trimmer at 75.25 spanning 12..48, and a
/// KingStud per label.
pub fn beam_pocket(sub: &str, king_studs: &[&str]) -> String {
    let mut xml = format!(
        "<SubAssembly><SubAssemblyGuid>{sub}</SubAssemblyGuid>\
         <FamilyMemberName>BeamPocket</FamilyMemberName><SubAssemblyName>BP {sub}</SubAssemblyName></SubAssembly>"
    );
    xml.push_str(&framed_board(&format!("{sub}-T"), sub, "Trimmer", "T", 75.25, 12.0, 48.0));
    for (i, label) in king_studs.iter().enumerate() {
        xml.push_str(&format!(
            "<Board><BoardGuid>{sub}-K{i}</BoardGuid><SubAssemblyGuid>{sub}</SubAssemblyGuid>\
             <FamilyMemberName>KingStud</FamilyMemberName><Label>{label}</Label></Board>"
        ));
    }
    xml
}

/// Wraps panel content in a single-level, single-bundle document.
pub fn single_panel(panel_guid: &str, label: &str, content: &str) -> String {
    format!(
        "<EHX><Level><LevelGuid>L1</LevelGuid><LevelNo>1</LevelNo>\
         <Bundle><BundleGuid>B1</BundleGuid><Label>B1</Label>\
         <Panel><PanelGuid>{panel_guid}</PanelGuid><Label>{label}</Label>{content}</Panel>\
         </Bundle></Level></EHX>"
    )
}
