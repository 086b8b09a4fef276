// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EHX vocabulary: element and field names, entity classification.

use std::fmt;

use crate::keys::EntityKind;

/// Field names read by the hierarchy builder.
pub mod fields {
    pub const LEVEL_GUID: &str = "LevelGuid";
    pub const LEVEL_NO: &str = "LevelNo";
    pub const BUNDLE_GUID: &str = "BundleGuid";
    pub const BUNDLE_NAME: &str = "BundleName";
    pub const PANEL_GUID: &str = "PanelGuid";
    pub const PANEL_ID: &str = "PanelID";
    pub const SUBASSEMBLY_GUID: &str = "SubAssemblyGuid";
    pub const SUBASSEMBLY_NAME: &str = "SubAssemblyName";
    pub const FAMILY_MEMBER_NAME: &str = "FamilyMemberName";
    pub const LABEL: &str = "Label";
    pub const DESCRIPTION: &str = "Description";
    pub const MATERIAL: &str = "Material";
    pub const ELEVATION_VIEW: &str = "ElevationView";
    pub const BOTTOM_VIEW: &str = "BottomView";
    pub const POINT: &str = "Point";
    pub const X: &str = "X";
    pub const Y: &str = "Y";
}

/// Concrete material kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MaterialKind {
    Board,
    Sheet,
    Bracing,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 3] = [MaterialKind::Board, MaterialKind::Sheet, MaterialKind::Bracing];

    /// Returns the EHX element name.
    pub fn element_name(&self) -> &'static str {
        match self {
            MaterialKind::Board => "Board",
            MaterialKind::Sheet => "Sheet",
            MaterialKind::Bracing => "Bracing",
        }
    }

    /// Returns the kind-specific identifier field name.
    pub fn guid_field(&self) -> &'static str {
        match self {
            MaterialKind::Board => "BoardGuid",
            MaterialKind::Sheet => "SheetGuid",
            MaterialKind::Bracing => "BracingGuid",
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            MaterialKind::Board => EntityKind::Board,
            MaterialKind::Sheet => EntityKind::Sheet,
            MaterialKind::Bracing => EntityKind::Bracing,
        }
    }

    pub fn from_entity_kind(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Board => Some(MaterialKind::Board),
            EntityKind::Sheet => Some(MaterialKind::Sheet),
            EntityKind::Bracing => Some(MaterialKind::Bracing),
            _ => None,
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Subassembly classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SubAssemblyKind {
    RoughOpening,
    Header,
    BeamPocket,
    Generic,
}

impl SubAssemblyKind {
    /// Classifies a subassembly from its `FamilyMemberName`, falling back to
    /// its `SubAssemblyName`.
    pub fn classify(family: Option<&str>, name: Option<&str>) -> Self {
        family
            .and_then(Self::match_text)
            .or_else(|| name.and_then(Self::match_text))
            .unwrap_or(SubAssemblyKind::Generic)
    }

    fn match_text(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        let compact: String = lower.chars().filter(|c| !matches!(c, ' ' | '_' | '-')).collect();
        if compact.contains("roughopening") {
            Some(SubAssemblyKind::RoughOpening)
        } else if compact.contains("beampocket") {
            Some(SubAssemblyKind::BeamPocket)
        } else if compact.contains("header") {
            Some(SubAssemblyKind::Header)
        } else {
            None
        }
    }

    /// Display priority: Header=0, RoughOpening=1, BeamPocket=2, Generic=3.
    pub fn priority(&self) -> u8 {
        match self {
            SubAssemblyKind::Header => 0,
            SubAssemblyKind::RoughOpening => 1,
            SubAssemblyKind::BeamPocket => 2,
            SubAssemblyKind::Generic => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubAssemblyKind::RoughOpening => "RoughOpening",
            SubAssemblyKind::Header => "Header",
            SubAssemblyKind::BeamPocket => "BeamPocket",
            SubAssemblyKind::Generic => "Generic",
        }
    }
}

impl fmt::Display for SubAssemblyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Framing role of a material, taken from `FamilyMemberName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RoleTag {
    Header,
    Trimmer,
    KingStud,
    Stud,
    RoughOpening,
    /// Any other family member name, kept verbatim.
    Other(String),
}

impl RoleTag {
    /// Parses a family member name. Matching is case-insensitive and ignores
    /// spaces, so `"King Stud"` and `"KingStud"` are the same role.
    pub fn parse(family: &str) -> Self {
        let compact: String = family
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if compact.contains("header") {
            RoleTag::Header
        } else if compact.contains("trimmer") {
            RoleTag::Trimmer
        } else if compact.contains("kingstud") {
            RoleTag::KingStud
        } else if compact.contains("roughopening") {
            RoleTag::RoughOpening
        } else if compact.contains("stud") {
            RoleTag::Stud
        } else {
            RoleTag::Other(family.trim().to_string())
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, RoleTag::Header)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleTag::Header => "Header",
            RoleTag::Trimmer => "Trimmer",
            RoleTag::KingStud => "KingStud",
            RoleTag::Stud => "Stud",
            RoleTag::RoughOpening => "RoughOpening",
            RoleTag::Other(name) => name,
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a coordinate or dimension value.
///
/// EHX writes plain decimals (`75.25`, `12.`, `-3`). Non-finite results are
/// rejected.
#[inline]
pub fn parse_number(text: &str) -> Option<f64> {
    lexical_core::parse::<f64>(text.trim().as_bytes())
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subassembly_kind_from_family() {
        assert_eq!(
            SubAssemblyKind::classify(Some("RoughOpening"), None),
            SubAssemblyKind::RoughOpening
        );
        assert_eq!(
            SubAssemblyKind::classify(Some("Beampocket"), Some("Window 3068")),
            SubAssemblyKind::BeamPocket
        );
        assert_eq!(
            SubAssemblyKind::classify(None, Some("FM25 - Header 2x10")),
            SubAssemblyKind::Header
        );
        assert_eq!(
            SubAssemblyKind::classify(Some("LType"), Some("LType")),
            SubAssemblyKind::Generic
        );
    }

    #[test]
    fn family_takes_precedence_over_name() {
        assert_eq!(
            SubAssemblyKind::classify(Some("Rough Opening"), Some("Header")),
            SubAssemblyKind::RoughOpening
        );
    }

    #[test]
    fn kind_priority_order() {
        assert!(SubAssemblyKind::Header.priority() < SubAssemblyKind::RoughOpening.priority());
        assert!(SubAssemblyKind::RoughOpening.priority() < SubAssemblyKind::BeamPocket.priority());
        assert!(SubAssemblyKind::BeamPocket.priority() < SubAssemblyKind::Generic.priority());
    }

    #[test]
    fn role_tags() {
        assert_eq!(RoleTag::parse("Header"), RoleTag::Header);
        assert_eq!(RoleTag::parse("Trimmer"), RoleTag::Trimmer);
        assert_eq!(RoleTag::parse("King Stud"), RoleTag::KingStud);
        assert_eq!(RoleTag::parse("KingStud"), RoleTag::KingStud);
        assert_eq!(RoleTag::parse("CriticalStud"), RoleTag::Stud);
        assert_eq!(RoleTag::parse("RoughOpening"), RoleTag::RoughOpening);
        assert_eq!(
            RoleTag::parse(" BottomPlate "),
            RoleTag::Other("BottomPlate".to_string())
        );
    }

    #[test]
    fn material_kind_fields() {
        assert_eq!(MaterialKind::Board.guid_field(), "BoardGuid");
        assert_eq!(MaterialKind::Sheet.guid_field(), "SheetGuid");
        assert_eq!(MaterialKind::Bracing.guid_field(), "BracingGuid");
        for kind in MaterialKind::ALL {
            assert_eq!(MaterialKind::from_entity_kind(kind.entity_kind()), Some(kind));
        }
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("75.25"), Some(75.25));
        assert_eq!(parse_number(" 12 "), Some(12.0));
        assert_eq!(parse_number("-3.5"), Some(-3.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }
}
