// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document Ingestor - XML to a generic labeled-element tree
//!
//! The EHX byte stream is parsed with [roxmltree](https://docs.rs/roxmltree)
//! and copied into an owned, arena-indexed element tree. Elements are stored
//! in document (pre-)order, so an element's index doubles as its ingestion
//! position and every subtree occupies a contiguous index range.

use rustc_hash::FxHashMap;

use crate::error::Result;

/// Index of an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    /// Returns the element's position in document order.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A labeled element: tag name, trimmed text content, attributes, children.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: Box<str>,
    /// Direct text content, trimmed. `None` when blank.
    pub text: Option<Box<str>>,
    pub attributes: Vec<(Box<str>, Box<str>)>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    /// One past the last descendant's index.
    subtree_end: u32,
}

impl Element {
    /// Returns `true` if this element has at least one child element.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v.as_ref())
    }
}

/// An owned EHX element tree.
///
/// # Example
///
/// ```
/// use ehx_lite_core::Document;
///
/// let doc = Document::parse_str("<EHX><Panel><Label>05-100</Label></Panel></EHX>").unwrap();
/// let panel = doc.child(doc.root(), "Panel").unwrap();
/// assert_eq!(doc.child_text(panel, "Label"), Some("05-100"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
}

impl Document {
    /// Parses an EHX byte stream.
    ///
    /// Fails with [`Error::InvalidUtf8`](crate::Error::InvalidUtf8) or
    /// [`Error::Parse`](crate::Error::Parse); there is no
    /// partial result.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Self::parse_str(text)
    }

    /// Parses an EHX document that is already decoded.
    pub fn parse_str(text: &str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(text, options)?;

        let mut elements: Vec<Element> = Vec::new();
        let mut ids: FxHashMap<roxmltree::NodeId, ElementId> = FxHashMap::default();

        // descendants() is pre-order, so parents are always assigned first
        for node in xml.root_element().descendants().filter(|n| n.is_element()) {
            let id = ElementId(elements.len() as u32);
            ids.insert(node.id(), id);

            let parent = node.parent_element().and_then(|p| ids.get(&p.id()).copied());
            if let Some(parent) = parent {
                elements[parent.index()].children.push(id);
            }

            let text = node
                .children()
                .filter(|c| c.is_text())
                .filter_map(|c| c.text())
                .map(str::trim)
                .find(|t| !t.is_empty())
                .map(Box::from);

            elements.push(Element {
                name: Box::from(node.tag_name().name()),
                text,
                attributes: node
                    .attributes()
                    .map(|a| (Box::from(a.name()), Box::from(a.value())))
                    .collect(),
                parent,
                children: Vec::new(),
                subtree_end: 0,
            });
        }

        // Children always carry larger indices, so a reverse sweep sees every
        // child's subtree before its parent.
        for i in (0..elements.len()).rev() {
            let end = match elements[i].children.last() {
                Some(last) => elements[last.index()].subtree_end,
                None => i as u32 + 1,
            };
            elements[i].subtree_end = end;
        }

        tracing::debug!(elements = elements.len(), "parsed EHX element tree");
        Ok(Self { elements })
    }

    /// Returns the root element.
    #[inline]
    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    /// Returns the number of elements in the document.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the document holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element for an id.
    ///
    /// Ids are only produced by this document, so lookup cannot fail.
    #[inline]
    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    /// Returns the tag name of an element.
    #[inline]
    pub fn name(&self, id: ElementId) -> &str {
        &self.get(id).name
    }

    /// Returns the trimmed text of an element.
    #[inline]
    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.get(id).text.as_deref()
    }

    /// Iterates the child elements of an element in document order.
    pub fn children(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.get(id).children.iter().copied()
    }

    /// Returns the first child element with the given name.
    pub fn child(&self, id: ElementId, name: &str) -> Option<ElementId> {
        self.children(id).find(|&c| self.name(c) == name)
    }

    /// Returns the text of the first child element with the given name.
    pub fn child_text(&self, id: ElementId, name: &str) -> Option<&str> {
        self.child(id, name).and_then(|c| self.text(c))
    }

    /// Returns the text of the first listed child name that has text.
    pub fn child_text_any(&self, id: ElementId, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|n| self.child_text(id, n))
    }

    /// Iterates every descendant of an element (excluding itself) in
    /// document order.
    pub fn descendants(&self, id: ElementId) -> impl Iterator<Item = ElementId> {
        let end = self.get(id).subtree_end;
        (id.0 + 1..end).map(ElementId)
    }

    /// Returns the first descendant with the given name.
    pub fn find(&self, id: ElementId, name: &str) -> Option<ElementId> {
        self.descendants(id).find(|&d| self.name(d) == name)
    }

    /// Iterates the ancestors of an element, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.get(id).parent, move |&p| self.get(p).parent)
    }

    /// Iterates every element in document order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElementId(i as u32), e))
    }
}
