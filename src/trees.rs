//! The tree construction stage of the parser
//! (<https://html.spec.whatwg.org/multipage/parsing.html#tree-construction>).
//!
//! [`construction_dispatcher`] owns the big insertion-mode state machine; [`scopes`] holds the
//! small scope-query predicates ("has an element in scope", "in button scope", ...) that the
//! dispatcher consults when deciding whether e.g. a stray `</p>` should be ignored.

pub(crate) mod construction_dispatcher;
pub(crate) mod scopes;
pub(crate) mod sink;

pub use construction_dispatcher::{ParseOutcome, TreeConstructionDispatcher};
pub use sink::{ParsedTree, TreeNodeId, TreeNodeKind, TreeSink};
