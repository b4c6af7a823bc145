//! The finished output of a parse, and a trait for replaying it into a caller-supplied tree.
//!
//! Tree construction itself always builds its own internal representation to follow the
//! construction algorithm faithfully -- [`ParsedTree`] is a read-only snapshot taken after the
//! fact, and [`TreeSink`] is how a caller hands that snapshot to their own DOM, arena, or string
//! builder instead of walking [`ParsedTree`] directly.

use std::collections::BTreeMap;

use crate::HtmlString;

/// An opaque handle to a node inside a [`ParsedTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeNodeId(pub(crate) usize);

/// What kind of node a [`TreeNodeId`] refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNodeKind {
    /// A [doctype](https://html.spec.whatwg.org/multipage/parsing.html#create-a-new-doctype-node).
    Doctype {
        /// The doctype's name, e.g. `html`.
        name: HtmlString,
        /// The `PUBLIC` identifier, if one was given.
        public_identifier: Option<HtmlString>,
        /// The `SYSTEM` identifier, if one was given.
        system_identifier: Option<HtmlString>,
    },
    /// An element, with its tag name and attributes (duplicate attributes are already resolved:
    /// first occurrence wins, per the tokenizer's attribute-collection rule).
    Element {
        /// The element's local name, e.g. `div`.
        tag_name: HtmlString,
        /// This element's attributes.
        attributes: BTreeMap<HtmlString, HtmlString>,
    },
    /// A run of character data.
    Text(HtmlString),
    /// A comment's data.
    Comment(HtmlString),
}

/// The finished, parent-indexed tree a [`crate::Parser`] run produced.
///
/// This is a snapshot, not a live DOM: it has no document node of its own -- [`Self::root_children`]
/// are the document's direct children (ordinarily a doctype and the root `<html>` element, plus
/// any comments outside of it).
#[derive(Debug, Clone, Default)]
pub struct ParsedTree {
    pub(crate) kinds: Vec<TreeNodeKind>,
    pub(crate) parents: Vec<Option<TreeNodeId>>,
    pub(crate) children: Vec<Vec<TreeNodeId>>,
    pub(crate) root_children: Vec<TreeNodeId>,
}

impl ParsedTree {
    /// The document's direct children, in document order.
    #[must_use]
    pub fn root_children(&self) -> &[TreeNodeId] {
        &self.root_children
    }

    /// What kind of node `id` is.
    #[must_use]
    pub fn kind(&self, id: TreeNodeId) -> &TreeNodeKind {
        &self.kinds[id.0]
    }

    /// `id`'s parent, or `None` if `id` is a direct child of the document.
    #[must_use]
    pub fn parent(&self, id: TreeNodeId) -> Option<TreeNodeId> {
        self.parents[id.0]
    }

    /// `id`'s children, in document order.
    #[must_use]
    pub fn children(&self, id: TreeNodeId) -> &[TreeNodeId] {
        &self.children[id.0]
    }

    /// Replays this tree into `sink`, depth-first, parents before children.
    ///
    /// `sink` only ever sees the finished tree -- it plays no role while tree construction is
    /// actually running, so none of the construction algorithm's intermediate mutations (foster
    /// parenting, the adoption agency algorithm reparenting nodes mid-parse, a node being moved
    /// after it was first attached) are visible to it.
    pub fn drive_sink<S: TreeSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        for &child in &self.root_children {
            self.drive_node(child, None, sink)?;
        }
        Ok(())
    }

    fn drive_node<S: TreeSink>(
        &self,
        id: TreeNodeId,
        parent: Option<&S::Handle>,
        sink: &mut S,
    ) -> Result<(), S::Error> {
        match &self.kinds[id.0] {
            TreeNodeKind::Doctype { name, public_identifier, system_identifier } => {
                sink.append_doctype(name, public_identifier.as_ref(), system_identifier.as_ref())?;
            }
            TreeNodeKind::Text(data) => {
                sink.append_text(parent, data)?;
            }
            TreeNodeKind::Comment(data) => {
                sink.append_comment(parent, data)?;
            }
            TreeNodeKind::Element { tag_name, attributes } => {
                let handle = sink.create_element(parent, tag_name, attributes)?;
                for &child in &self.children[id.0] {
                    self.drive_node(child, Some(&handle), sink)?;
                }
            }
        }
        Ok(())
    }
}

/// A client-supplied tree implementation a [`ParsedTree`] can be replayed into.
///
/// Grounded in the same shape as other tree-sink traits in the ecosystem: a handful of
/// creation/append calls keyed by an opaque per-sink handle type, with errors surfacing through
/// an associated `Error` type rather than being swallowed.
pub trait TreeSink {
    /// The sink's own handle to a node it created, e.g. an arena index or an `Rc` pointer.
    type Handle: Clone;
    /// What a sink call can fail with.
    type Error;

    /// Create an element under `parent` (`None` meaning the document root) and return a handle
    /// to it so later calls can append further children to it.
    fn create_element(
        &mut self,
        parent: Option<&Self::Handle>,
        tag_name: &HtmlString,
        attributes: &BTreeMap<HtmlString, HtmlString>,
    ) -> Result<Self::Handle, Self::Error>;

    /// Append a text node under `parent`.
    fn append_text(&mut self, parent: Option<&Self::Handle>, data: &HtmlString) -> Result<(), Self::Error>;

    /// Append a comment under `parent`.
    fn append_comment(&mut self, parent: Option<&Self::Handle>, data: &HtmlString) -> Result<(), Self::Error>;

    /// Append a doctype node to the document.
    fn append_doctype(
        &mut self,
        name: &HtmlString,
        public_identifier: Option<&HtmlString>,
        system_identifier: Option<&HtmlString>,
    ) -> Result<(), Self::Error>;
}
