#![allow(unused)]

use std::collections::BTreeMap;

use crate::{Reader, Token, Tokenizer, HtmlString, StartTag, State};
use crate::trees::scopes::{
    button_scope, default_scope, list_item_scope, select_scope, table_scope, ElementScope,
};


#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ElementNamespace {
    HTML,
    MathML,
    SVG,
    XLink,
    XML,
    XMLNS,
    Custom(String),
}

/// A namespace-qualified element name, borrowed from a [`Node`] for the duration of a scope query.
///
/// This mirrors the `(namespace, local name)` pair the tree construction algorithm calls an
/// "expanded name" when it checks the stack of open elements against a scope's tag set.
#[derive(Clone, Copy)]
pub(crate) struct ExpandedName<'a> {
    pub(crate) namespace: Option<&'a ElementNamespace>,
    pub(crate) local_name: &'a [u8],
}

impl Element {
    fn expanded_name(&self) -> ExpandedName<'_> {
        ExpandedName {
            namespace: self.namespace.as_ref(),
            local_name: self.local_name.as_slice(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InBody,
    InHead,
    InHeadNoscript,
    Text,
    AfterHead,
    InTemplate,
    InFrameset,
    AfterBody,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
    InTable,
    InSelect,
    InSelectInTable,
    InRow,
    InTableBody,
    InCaption,
    InCell,
    InTableText,
    InColumnGroup,
}

macro_rules! skip_over_chars {
    ($token:expr, $($chars:pat)|*) => {
        handle_string_prefix!($token, $($chars)|*, |_| ());
    }
}

macro_rules! handle_string_prefix {
    ($token:expr, $($chars:pat)|*, $callback:expr) => {
        if let Some(Token::String(ref mut string)) = $token {
            let index = string.iter().enumerate().find(|(_, x)| !matches!(x, $($chars)|*)).map(|(i, _)| i).unwrap_or(string.len());
            let substring: &[u8] = &string[..index];
            $callback(substring);
            string.copy_within(index.., 0);
            string.truncate(index);
            if string.is_empty() {
                return
            }
        }
    }
}


/// A stable handle into a [`Document`]'s node arena. Indices never get reused, so two `NodeId`s
/// are equal exactly when they name the same node -- this is what [`Node::same_identity`] compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(usize);

impl NodeId {
    /// Placeholder id for a [`Node`] that hasn't been inserted into a [`Document`] yet.
    const DANGLING: NodeId = NodeId(usize::MAX);
}

/// Where a freshly created (or moved) node should be attached: as a child of `parent` (`None`
/// meaning the document itself), immediately before `before` if set, otherwise last.
struct InsertPosition {
    parent: Option<NodeId>,
    before: Option<NodeId>,
}

impl InsertPosition {
    fn last_child_of(parent: Option<NodeId>) -> Self {
        InsertPosition { parent, before: None }
    }

    fn document_last_child() -> Self {
        InsertPosition { parent: None, before: None }
    }
}

/// A coarse, read-only summary of what a [`TreeConstructionDispatcher::run`] produced.
///
/// The concrete tree -- nodes, attributes, the `Document` object itself -- stays internal: this
/// crate builds that tree to follow the construction algorithm faithfully, not to hand callers a
/// DOM. `ParseOutcome` only surfaces the handful of facts about the result that a caller of
/// [`crate::Parser`] can actually act on directly; a caller that needs the tree itself gets the
/// `tree` field below, a read-only snapshot that can also be replayed into a `crate::TreeSink`.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Whether the document ended up in [quirks
    /// mode](https://html.spec.whatwg.org/multipage/parsing.html#quirks-mode).
    pub quirks_mode: bool,
    /// Whether the document ended up in limited-quirks mode.
    pub limited_quirks_mode: bool,
    /// Number of nodes tree construction created while processing this input (elements, text,
    /// comments, plus the doctype, if any).
    pub node_count: usize,
    /// The finished, parent-indexed tree.
    pub tree: crate::trees::sink::ParsedTree,
}

#[derive(Default, Clone)]
struct Document {
    quirks_mode: bool,
    limited_quirks_mode: bool,
    parser_cannot_change_the_mode: bool,
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    root_children: Vec<NodeId>,
    srcdoc: Option<HtmlString>,
}

impl Document {
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.0]
    }

    fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.children[id.0]
    }

    /// Allocates `node` in the arena without attaching it anywhere yet. The adoption agency
    /// algorithm needs this: a cloned formatting element is created before its final position in
    /// the tree is known.
    fn insert_orphan(&mut self, mut node: Node) -> Node {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.nodes.push(node.clone());
        self.parents.push(None);
        self.children.push(Vec::new());
        node
    }

    /// Moves `id` (detaching it from wherever it currently lives, if anywhere) to `position`.
    fn attach(&mut self, id: NodeId, position: InsertPosition) {
        if let Some(old_parent) = self.parents[id.0].take() {
            self.children[old_parent.0].retain(|&c| c != id);
        } else {
            self.root_children.retain(|&c| c != id);
        }

        let siblings = match position.parent {
            Some(parent) => {
                self.parents[id.0] = Some(parent);
                &mut self.children[parent.0]
            }
            None => &mut self.root_children,
        };

        match position.before.and_then(|before| siblings.iter().position(|&c| c == before)) {
            Some(index) => siblings.insert(index, id),
            None => siblings.push(id),
        }
    }

    fn insert(&mut self, node: Node, position: InsertPosition) -> Node {
        let node = self.insert_orphan(node);
        self.attach(node.id, position);
        node
    }

    /// Moves all of `from`'s children onto `to`, preserving order -- the adoption agency
    /// algorithm's "take all of the child nodes of the furthest block and append them to the new
    /// element" step.
    fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let moving: Vec<NodeId> = self.children[from.0].drain(..).collect();
        for child in moving {
            self.parents[child.0] = Some(to);
        }
        self.children[to.0].extend(moving.iter().copied());
    }

    fn to_parsed_tree(&self) -> crate::trees::sink::ParsedTree {
        use crate::trees::sink::{ParsedTree, TreeNodeId, TreeNodeKind};

        let kinds = self
            .nodes
            .iter()
            .map(|node| match &node.inner {
                NodeInner::Doctype(d) => TreeNodeKind::Doctype {
                    name: d.name.clone(),
                    public_identifier: d.public_identifier.clone(),
                    system_identifier: d.system_identifier.clone(),
                },
                NodeInner::Element(e) if *e.tag_name == b"#text"[..] => TreeNodeKind::Text(e.local_name.clone()),
                NodeInner::Element(e) if *e.tag_name == b"#comment"[..] => TreeNodeKind::Comment(e.local_name.clone()),
                NodeInner::Element(e) => TreeNodeKind::Element {
                    tag_name: e.tag_name.clone(),
                    attributes: e.attributes.clone(),
                },
            })
            .collect();

        ParsedTree {
            kinds,
            parents: self.parents.iter().map(|p| p.map(|id| TreeNodeId(id.0))).collect(),
            children: self
                .children
                .iter()
                .map(|kids| kids.iter().map(|id| TreeNodeId(id.0)).collect())
                .collect(),
            root_children: self.root_children.iter().map(|id| TreeNodeId(id.0)).collect(),
        }
    }
}

#[derive(Clone)]
struct Doctype {
    name: HtmlString,
    public_identifier: Option<HtmlString>,
    system_identifier: Option<HtmlString>,
}

#[derive(Clone)]
struct Node {
    id: NodeId,
    inner: NodeInner,
}

#[derive(Clone)]
enum NodeInner {
    Element(Element),
    Doctype(Doctype),
}

impl Node {
    fn element(element: Element) -> Self {
        Node {
            id: NodeId::DANGLING,
            inner: NodeInner::Element(element)
        }
    }

    fn doctype(doctype: Doctype) -> Self {
        Node{ id: NodeId::DANGLING, inner: NodeInner::Doctype(doctype) }
    }

    fn as_element(&self) -> Option<&Element> {
        match self.inner {
            NodeInner::Element(ref elem) => Some(elem),
            _ => None
        }
    }
    fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self.inner {
            NodeInner::Element(ref mut elem) => Some(elem),
            _ => None
        }
    }

    fn is_element(&self, tag_name: &[u8]) -> bool {
        self.as_element().map_or(false, |elem| *elem.tag_name == tag_name)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#special>
    fn is_special(&self) -> bool {
        let Some(elem) = self.as_element() else {
            return false;
        };
        match elem.namespace {
            Some(ElementNamespace::HTML) | None => matches!(
                elem.local_name.as_slice(),
                b"address" | b"applet" | b"area" | b"article" | b"aside" | b"base"
                    | b"basefont" | b"bgsound" | b"blockquote" | b"body" | b"br" | b"button"
                    | b"caption" | b"center" | b"col" | b"colgroup" | b"dd" | b"details"
                    | b"dir" | b"div" | b"dl" | b"dt" | b"embed" | b"fieldset"
                    | b"figcaption" | b"figure" | b"footer" | b"form" | b"frame"
                    | b"frameset" | b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6" | b"head"
                    | b"header" | b"hgroup" | b"hr" | b"html" | b"iframe" | b"img" | b"input"
                    | b"keygen" | b"li" | b"link" | b"listing" | b"main" | b"marquee"
                    | b"menu" | b"meta" | b"nav" | b"noembed" | b"noframes" | b"noscript"
                    | b"object" | b"ol" | b"p" | b"param" | b"plaintext" | b"pre" | b"script"
                    | b"section" | b"select" | b"source" | b"style" | b"summary" | b"table"
                    | b"tbody" | b"td" | b"template" | b"textarea" | b"tfoot" | b"th"
                    | b"thead" | b"title" | b"tr" | b"track" | b"ul" | b"wbr" | b"xmp"
            ),
            Some(ElementNamespace::MathML) => {
                matches!(elem.local_name.as_slice(), b"mi" | b"mo" | b"mn" | b"ms" | b"mtext" | b"annotation-xml")
            }
            Some(ElementNamespace::SVG) => {
                matches!(elem.local_name.as_slice(), b"foreignObject" | b"desc" | b"title")
            }
            _ => false,
        }
    }

    /// Two `Node`s refer to the same spot in the document, as opposed to two elements that merely
    /// have the same tag name and attributes. Both sides must already have been inserted into a
    /// [`Document`] (i.e. not [`NodeId::DANGLING`]) for this to mean anything.
    fn same_identity(&self, other: &Node) -> bool {
        self.id != NodeId::DANGLING && self.id == other.id
    }
}

#[derive(Clone, Default)]
struct Element {
    namespace: Option<ElementNamespace>,
    prefix: Option<String>,
    local_name: HtmlString,
    tag_name: HtmlString,
    force_async: bool,
    already_started: bool,
    attributes: BTreeMap<HtmlString, HtmlString>
}

impl Element {
    fn is_mathml_text_integration_point(&self) -> bool {
        matches!(self.namespace, Some(ElementNamespace::MathML))
            && (matches!(self.local_name.as_slice(), b"mi" | b"mo" | b"mn" | b"ms" | b"mtext"))
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#html-integration-point>
    fn is_html_integration_point(&self) -> bool {
        match self.namespace {
            Some(ElementNamespace::MathML) => {
                self.local_name.as_slice() == b"annotation-xml"
                    && matches!(
                        self.attributes.get(b"encoding".as_slice()).map(|v| v.as_slice()),
                        Some(b"text/html") | Some(b"application/xhtml+xml")
                    )
            }
            Some(ElementNamespace::SVG) => {
                matches!(self.local_name.as_slice(), b"foreignObject" | b"desc" | b"title")
            }
            _ => false,
        }
    }
}

enum ElementOrMarker {
    Element(Node),
    Marker,
}

impl ElementOrMarker {
    fn as_element(&self) -> Option<&Node> {
        match self {
            ElementOrMarker::Element(elem) => Some(elem),
            ElementOrMarker::Marker => None
        }
    }
}

pub struct TreeConstructionDispatcher<R: Reader> {
    tokenizer: Tokenizer<R>,
    stack_of_open_elements: Vec<Node>,
    context_element: Option<Node>,
    head_element_pointer: Option<Node>,
    form_element_pointer: Option<Node>,
    insertion_mode: InsertionMode,
    original_insertion_mode: Option<InsertionMode>,
    document: Document,
    scripting: bool,
    fragment_parsing: bool,
    // "if the parser was invoked via document.write() or document.writeln() methods"
    invoked_via_document_write: bool,
    list_of_active_formatting_elements: Vec<ElementOrMarker>,
    frameset_ok: bool,
    stack_of_template_insertion_modes: Vec<InsertionMode>,
    pending_table_character_tokens: Vec<u8>,
    foster_parenting: bool,
    /// One token of lookahead, used by the `textarea`/`pre` "strip a leading newline" rule. `None`
    /// means nothing buffered; `Some(None)` means the buffered lookahead was EOF.
    lookahead: Option<Option<Token>>,
}

impl<R: Reader> TreeConstructionDispatcher<R> {
    pub fn new(tokenizer: Tokenizer<R>) -> Self {
        TreeConstructionDispatcher {
            tokenizer,
            stack_of_open_elements: Vec::new(),
            context_element: None,
            head_element_pointer: None,
            form_element_pointer: None,
            insertion_mode: InsertionMode::Initial,
            original_insertion_mode: None,
            document: Document::default(),
            scripting: false,
            fragment_parsing: false,
            invoked_via_document_write: false,
            list_of_active_formatting_elements: Vec::new(),
            frameset_ok: true,
            stack_of_template_insertion_modes: Vec::new(),
            pending_table_character_tokens: Vec::new(),
            foster_parenting: false,
            lookahead: None,
        }
    }

    /// Apply parser-wide configuration, such as the scripting flag or fragment-parsing context.
    ///
    /// Fragment parsing's "create a new element for the context element's local name" step is
    /// simplified here: we mark `fragment_parsing` so `reset_the_insertion_mode_appropriately`
    /// bottoms out correctly, but don't synthesize a full context element node -- this crate
    /// doesn't expose enough of the DOM surface yet for a caller to hand one in.
    pub(crate) fn with_config(mut self, config: &crate::ParserConfig) -> Self {
        self.scripting = config.scripting_enabled;
        self.fragment_parsing = config.fragment_context.is_some();
        self.document.srcdoc = if config.iframe_srcdoc {
            Some(HtmlString(Vec::new()))
        } else {
            None
        };
        self
    }

    fn current_node(&self) -> Option<&Node> {
        self.stack_of_open_elements.last()
    }

    fn current_node_mut(&mut self) -> Option<&mut Node> {
        self.stack_of_open_elements.last_mut()
    }

    fn adjusted_current_node(&self) -> Option<&Node> {
        self.context_element.as_ref().or_else(|| self.current_node())
    }

    pub fn run(mut self) -> Result<ParseOutcome, R::Error> {
        loop {
            let token = match self.lookahead.take() {
                Some(buffered) => buffered,
                None => match self.tokenizer.next() {
                    Some(token) => Some(token?),
                    None => None,
                },
            };

            match token {
                Some(token) => self.process_token(token),
                None => break,
            }
        }

        // eof token
        self.process_token_via_insertion_mode(self.insertion_mode, None);
        Ok(ParseOutcome {
            quirks_mode: self.document.quirks_mode,
            limited_quirks_mode: self.document.limited_quirks_mode,
            node_count: self.document.nodes.len(),
            tree: self.document.to_parsed_tree(),
        })
    }

    fn process_token(&mut self, token: Token) {
        let adjusted_current_elem = self.adjusted_current_node().and_then(|node| node.as_element());
        if self.stack_of_open_elements.is_empty()
            || matches!(adjusted_current_elem.and_then(|elem| elem.namespace.as_ref()), Some(ElementNamespace::HTML))
            || (adjusted_current_elem.map_or(false, |elem| elem.is_mathml_text_integration_point())
                && (matches!(token, Token::StartTag(ref tag) if !matches!(&tag.name[..], b"mglyph" | b"malignmark"))
                    || matches!(token, Token::String(_))))
            || (matches!(adjusted_current_elem.and_then(|elem| elem.namespace.as_ref()), Some(ElementNamespace::MathML))
                && adjusted_current_elem.map_or(false, |elem| *elem.local_name == b"annotation-xml")
                && matches!(token, Token::StartTag(ref tag) if *tag.name == b"svg"))
            || (adjusted_current_elem.map_or(false, |elem| elem.is_html_integration_point())
                && matches!(token, Token::StartTag(_) | Token::String(_)))
        {
            self.process_token_via_insertion_mode(self.insertion_mode, Some(token))
        } else {
            self.process_token_via_foreign_content(token)
        }
    }

    fn process_token_via_insertion_mode(&mut self, insertion_mode: InsertionMode, mut token: Option<Token>) {
        match insertion_mode {
            InsertionMode::Initial => {
                skip_over_chars!(token, b'\t' | b'\x0A' | b'\x0C' | b' ');
                match token {
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, Some(InsertPosition::document_last_child()));
                    }
                    Some(Token::Doctype(doctype)) => {
                        if *doctype.name != b"html" || doctype.public_identifier.is_some() || (doctype.system_identifier.as_ref().map_or(false, |x| **x != b"about:legacy-compat".as_slice())) {
                            self.parse_error();
                        }

                        let public_str = doctype.public_identifier.as_ref().map_or(b"".as_slice(), |x| x.as_slice());
                        let system_str = doctype.system_identifier.as_ref().map_or(b"".as_slice(), |x| x.as_slice());

                        if self.document.srcdoc.is_none() && self.document.parser_cannot_change_the_mode && (
                            doctype.force_quirks
                            // TODO case insensitive comparisons
                            || *doctype.name != b"html"
                            || public_str == b"-//W3O//DTD W3 HTML Strict 3.0//EN//"
                            || public_str== b"-/W3C/DTD HTML 4.0 Transitional/EN" 
                            || public_str== b"HTML"
                            || system_str == b"http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd"
                            || public_str.starts_with(b"+//Silmaril//dtd html Pro v0r11 19970101//")
                            || public_str.starts_with(b"-//AS//DTD HTML 3.0 asWedit + extensions//")
                            || public_str.starts_with(b"-//AdvaSoft Ltd//DTD HTML 3.0 asWedit + extensions//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 2.0 Level 1//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 2.0 Level 2//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 2.0 Strict Level 1//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 2.0 Strict Level 2//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 2.0 Strict//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 2.0//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 2.1E//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 3.0//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 3.2 Final//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 3.2//")
                            || public_str.starts_with(b"-//IETF//DTD HTML 3//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Level 0//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Level 1//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Level 2//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Level 3//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Strict Level 0//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Strict Level 1//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Strict Level 2//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Strict Level 3//")
                            || public_str.starts_with(b"-//IETF//DTD HTML Strict//")
                            || public_str.starts_with(b"-//IETF//DTD HTML//")
                            || public_str.starts_with(b"-//Metrius//DTD Metrius Presentational//")
                            || public_str.starts_with(b"-//Microsoft//DTD Internet Explorer 2.0 HTML Strict//")
                            || public_str.starts_with(b"-//Microsoft//DTD Internet Explorer 2.0 HTML//")
                            || public_str.starts_with(b"-//Microsoft//DTD Internet Explorer 2.0 Tables//")
                            || public_str.starts_with(b"-//Microsoft//DTD Internet Explorer 3.0 HTML Strict//")
                            || public_str.starts_with(b"-//Microsoft//DTD Internet Explorer 3.0 HTML//")
                            || public_str.starts_with(b"-//Microsoft//DTD Internet Explorer 3.0 Tables//")
                            || public_str.starts_with(b"-//Netscape Comm. Corp.//DTD HTML//")
                            || public_str.starts_with(b"-//Netscape Comm. Corp.//DTD Strict HTML//")
                            || public_str.starts_with(b"-//O'Reilly and Associates//DTD HTML 2.0//")
                            || public_str.starts_with(b"-//O'Reilly and Associates//DTD HTML Extended 1.0//")
                            || public_str.starts_with(b"-//O'Reilly and Associates//DTD HTML Extended Relaxed 1.0//")
                            || public_str.starts_with(b"-//SQ//DTD HTML 2.0 HoTMetaL + extensions//")
                            || public_str.starts_with(b"-//SoftQuad Software//DTD HoTMetaL PRO 6.0::19990601::extensions to HTML 4.0//")
                            || public_str.starts_with(b"-//SoftQuad//DTD HoTMetaL PRO 4.0::19971010::extensions to HTML 4.0//")
                            || public_str.starts_with(b"-//Spyglass//DTD HTML 2.0 Extended//")
                            || public_str.starts_with(b"-//Sun Microsystems Corp.//DTD HotJava HTML//")
                            || public_str.starts_with(b"-//Sun Microsystems Corp.//DTD HotJava Strict HTML//")
                            || public_str.starts_with(b"-//W3C//DTD HTML 3 1995-03-24//")
                            || public_str.starts_with(b"-//W3C//DTD HTML 3.2 Draft//")
                            || public_str.starts_with(b"-//W3C//DTD HTML 3.2 Final//")
                            || public_str.starts_with(b"-//W3C//DTD HTML 3.2//")
                            || public_str.starts_with(b"-//W3C//DTD HTML 3.2S Draft//")
                            || public_str.starts_with(b"-//W3C//DTD HTML 4.0 Frameset//")
                            || public_str.starts_with(b"-//W3C//DTD HTML 4.0 Transitional//")
                            || public_str.starts_with(b"-//W3C//DTD HTML Experimental 19960712//")
                            || public_str.starts_with(b"-//W3C//DTD HTML Experimental 970421//")
                            || public_str.starts_with(b"-//W3C//DTD W3 HTML//")
                            || public_str.starts_with(b"-//W3O//DTD W3 HTML 3.0//")
                            || public_str.starts_with(b"-//WebTechs//DTD Mozilla HTML 2.0//")
                            || public_str.starts_with(b"-//WebTechs//DTD Mozilla HTML//")
                            || (doctype.system_identifier.is_none() && public_str.starts_with(b"-//W3C//DTD HTML 4.01 Frameset//"))
                            || (doctype.system_identifier.is_none() && public_str.starts_with(b"-//W3C//DTD HTML 4.01 Transitional//" ))
                        ) {
                            self.document.quirks_mode = true;
                        } else if self.document.srcdoc.is_none() && !self.document.parser_cannot_change_the_mode && (
                            // TODO case insensitive comparisons
                            public_str.starts_with(b"-//W3C//DTD XHTML 1.0 Frameset//")
                            || public_str.starts_with(b"-//W3C//DTD XHTML 1.0 Transitional//")
                            || (doctype.system_identifier.is_some() && public_str.starts_with(b"-//W3C//DTD HTML 4.01 Frameset//"))
                            || (doctype.system_identifier.is_some() && public_str.starts_with(b"-//W3C//DTD HTML 4.01 Transitional//" ))
                        ) {
                            self.document.limited_quirks_mode = true;
                        }

                        let node = Node::doctype(Doctype {
                            name: doctype.name,
                            public_identifier: doctype.public_identifier,
                            system_identifier: doctype.system_identifier,
                        });
                        self.document.insert(node, InsertPosition::document_last_child());

                        self.insertion_mode = InsertionMode::BeforeHtml;
                    }
                    token => {
                        if self.document.srcdoc.is_none() {
                            self.parse_error();
                        }

                        if self.document.srcdoc.is_none() && !self.document.parser_cannot_change_the_mode {
                            self.document.quirks_mode = true;
                        }

                        self.insertion_mode = InsertionMode::BeforeHtml;
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::BeforeHtml => {
                skip_over_chars!(token, b'\t' | b'\x0A' | b'\x0C' | b' ');
                match token {
                    Some(Token::Doctype(_)) => {
                        // ignore the token
                    }
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, Some(InsertPosition::document_last_child()));
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"html" => {
                        let element = self.create_an_element_for_the_token(token.unwrap(), ElementNamespace::HTML, None);
                        let node = Node::element(element);
                        let node = self.document.insert(node, InsertPosition::document_last_child());
                        self.stack_of_open_elements.push(node);
                        self.insertion_mode = InsertionMode::BeforeHead;
                    }
                    Some(Token::EndTag(ref tag)) if *tag.name != b"head" && *tag.name != b"body" && *tag.name != b"html" && *tag.name != b"br" => {
                        self.parse_error();
                    }
                    _ => {
                        let element = Element {
                            namespace: Some(ElementNamespace::HTML),
                            prefix: None,
                            local_name: b"html".as_slice().to_owned().into(),
                            tag_name: b"html".as_slice().to_owned().into(),
                            ..Element::default()
                        };

                        let node = Node::element(element);
                        let node = self.document.insert(node, InsertPosition::document_last_child());
                        self.stack_of_open_elements.push(node);
                        self.insertion_mode = InsertionMode::BeforeHead;
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::BeforeHead => {
                skip_over_chars!(token, b'\t' | b'\x0A' | b'\x0C' | b' ');
                match token {
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, None);
                    }
                    Some(Token::Doctype(doctype)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"html" => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::EndTag(ref tag)) if *tag.name != b"head" && *tag.name != b"body" && *tag.name != b"html" && *tag.name != b"br" => {
                        self.parse_error();
                    }
                    token => {
                        let node = self.insert_an_element_for_a_token(Token::StartTag(StartTag {
                            name: b"head".as_slice().to_owned().into(),
                            ..StartTag::default()
                        }));
                        self.head_element_pointer = Some(node.clone());
                        self.insertion_mode = InsertionMode::InHead;
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::InHead => {
                handle_string_prefix!(token, b'\t' | b'\x0A' | b'\x0C' | b' ', |substring| {
                    self.insert_a_character(substring);
                });
                match token {
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, None);
                    }
                    Some(Token::Doctype(doctype)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"html" => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"base" | b"basefont" | b"bgsound" | b"link") => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.stack_of_open_elements.pop().expect("no current node");
                        // TODO: acknowledge self-closing flag
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"meta" => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.stack_of_open_elements.pop().expect("no current node");
                        // TODO: acknowledge self-closing flag
                        // TODO: speculative HTML parsing related to meta charset
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"title" => {
                        self.generic_rcdata_element_parsing_algorithm(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"noframes" | b"style") => {
                        self.generic_rawtext_element_parsing_algorithm(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"noscript" => {
                        if self.scripting {
                            self.generic_rawtext_element_parsing_algorithm(token.unwrap());
                        } else {
                            self.insert_an_element_for_a_token(token.unwrap());
                            self.insertion_mode = InsertionMode::InHeadNoscript;
                        }
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"script" => {
                        let adjusted_insert_location = self.appropriate_place_for_inserting_a_node();
                        let mut elem = self.create_an_element_for_the_token(token.unwrap(), ElementNamespace::HTML, None);
                        elem.force_async = false;
                        if self.fragment_parsing {
                            elem.already_started = true;
                        }
                        if self.invoked_via_document_write {
                            elem.already_started = true;
                        }
                        let node = Node::element(elem);
                        self.insert_element(node, adjusted_insert_location);
                        self.tokenizer.switch_to(State::ScriptData);
                        self.original_insertion_mode = Some(self.insertion_mode);
                        self.insertion_mode = InsertionMode::Text;
                    }
                    Some(Token::EndTag(ref tag)) if *tag.name == b"head" => {
                        let head_element = self.stack_of_open_elements.pop().unwrap();
                        debug_assert_eq!(*head_element.as_element().unwrap().tag_name, b"head");
                        debug_assert_eq!(*head_element.as_element().unwrap().local_name, b"head");
                        self.insertion_mode = InsertionMode::AfterHead;
                    }
                    Some(Token::EndTag(ref tag)) if !matches!(tag.name.as_slice(), b"body" | b"html" | b"br") => {
                        // any other end tag
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"template" => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.list_of_active_formatting_elements.push(ElementOrMarker::Marker);
                        self.frameset_ok = false;
                        self.insertion_mode = InsertionMode::InTemplate;
                        self.stack_of_template_insertion_modes.push(InsertionMode::InTemplate);
                    }
                    Some(Token::EndTag(ref tag)) if *tag.name == b"template" => {
                        if self.stack_of_open_elements.iter().filter_map(|x| x.as_element()).filter(|elem| *elem.tag_name == b"template").next().is_none() {
                            self.parse_error();
                            return;
                        }

                        self.generate_all_implied_end_tags_thoroughly();

                        let mut emitted_parse_error = false;

                        let template_elem = loop {
                            match self.stack_of_open_elements.pop() {
                                Some(node) => {
                                    if node.as_element().map_or(false, |x| *x.tag_name == b"template") {
                                        break node;
                                    } else if !emitted_parse_error {
                                        self.parse_error();
                                        emitted_parse_error = true;
                                    }
                                }
                                None => {
                                    unreachable!("checked stack of open elements before");
                                }
                            }
                        };

                        self.clear_list_of_active_formatting_elements_up_to_the_last_marker();
                        self.stack_of_template_insertion_modes.pop().expect("no template insertion mode?");
                        self.reset_the_insertion_mode_appropriately();
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"head" => {
                        self.parse_error();
                    }
                    token => {
                        let head_element = self.stack_of_open_elements.pop().expect("expected head element");
                        debug_assert_eq!(*head_element.as_element().unwrap().tag_name, b"head");
                        debug_assert_eq!(*head_element.as_element().unwrap().local_name, b"head");
                        self.insertion_mode = InsertionMode::AfterHead;
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::InHeadNoscript => {
                handle_string_prefix!(token, b'\t' | b'\x0A' | b'\x0C' | b' ', |substring: &[u8]| {
                    let new_token = Some(Token::String(substring.to_owned().into()));
                    self.process_token_via_insertion_mode(InsertionMode::InHead, new_token);
                });

                match token {
                    Some(Token::Doctype(_)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"html" => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::EndTag(ref tag)) if *tag.name == b"noscript" => {
                        let node = self.stack_of_open_elements.pop().expect("no current node?");
                        debug_assert_eq!(*node.as_element().unwrap().tag_name, b"noscript");
                        debug_assert_eq!(*node.as_element().unwrap().local_name, b"noscript");
                        debug_assert_eq!(*self.current_node().unwrap().as_element().unwrap().tag_name, b"head");
                        self.insertion_mode = InsertionMode::InHead;
                    }
                    Some(Token::Comment(_)) => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"basefont" | b"bgsound" | b"link" | b"meta" | b"noframes" | b"style") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::EndTag(ref tag)) if *tag.name != b"br" => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"head" | b"noscript") => {
                        self.parse_error();
                    }
                    token => {
                        self.parse_error();
                        let node = self.stack_of_open_elements.pop().expect("no current node");
                        debug_assert_eq!(*self.current_node().unwrap().as_element().unwrap().tag_name, b"head");
                        self.insertion_mode = InsertionMode::InHead;
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::AfterHead => {
                handle_string_prefix!(token, b'\t' | b'\x0A' | b'\x0C' | b' ', |substring| {
                    self.insert_a_character(substring);
                });

                match token {
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, None);
                    }
                    Some(Token::Doctype(_)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"html" => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"body" => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.frameset_ok = false;
                        self.insertion_mode = InsertionMode::InBody;
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"frameset" => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.insertion_mode = InsertionMode::InFrameset;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"base" | b"basefont" | b"bgsound" | b"link" | b"meta" | b"noframes" | b"script" | b"style" | b"template" | b"title") => {
                        self.parse_error();
                        let node = self.head_element_pointer.clone().unwrap();
                        let i = self.stack_of_open_elements.len();
                        self.stack_of_open_elements.push(node);
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                        // XXX: unclear if this is correct
                        self.stack_of_open_elements.remove(i);
                    }
                    Some(Token::EndTag(ref tag)) if *tag.name == b"template" => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::EndTag(ref tag)) if !matches!(tag.name.as_slice(), b"body" | b"html" | b"br") => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if *tag.name == b"head" => {
                        self.parse_error();
                    }
                    token => {
                        self.insert_an_element_for_a_token(Token::StartTag(StartTag {
                            name: b"body".as_slice().to_owned().into(),
                            ..StartTag::default()
                        }));
                        self.insertion_mode = InsertionMode::InBody;
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::InBody => {
                // TODO: this is bogus, doesn't handle "\t\0somethingelse" correctly
                handle_string_prefix!(token, b'\0', |substring: &[u8]| {
                    self.parse_error();
                });

                handle_string_prefix!(token, b'\t' | b'\x0A' | b'\x0C' | b' ', |substring: &[u8]| {
                    self.reconstruct_the_active_formatting_elements();
                    self.insert_a_character(&substring);
                });

                match token {
                    Some(Token::String(s)) => {
                        self.reconstruct_the_active_formatting_elements();
                        self.insert_a_character(&s);
                        self.frameset_ok = false;
                    }
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, None);
                    }
                    Some(Token::Doctype(_)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(tag)) if *tag.name == b"html" => {
                        self.parse_error();
                        // TODO: node needs to become shared on clone
                        let has_template_elem = self.stack_of_open_elements.iter().any(|node| node.as_element().map_or(false, |elem| *elem.tag_name == b"template"));
                        if !has_template_elem {
                            if let Some(node) = self.stack_of_open_elements.first_mut() {
                                if let Some(elem) = node.as_element_mut() {
                                    for (key, value) in tag.attributes {
                                        elem.attributes.entry(key).or_insert(value);
                                    }
                                }
                            }
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"base" | b"basefont" | b"bgsound" | b"link" | b"meta" | b"noframes" | b"script" | b"style" | b"template" | b"title") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"template") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::StartTag(tag)) if matches!(tag.name.as_slice(), b"body") => {
                        self.parse_error();

                        let has_template_elem = self.stack_of_open_elements.iter().any(|node| node.as_element().map_or(false, |elem| *elem.tag_name == b"template"));

                        if !has_template_elem {
                            if let Some(node) = self.stack_of_open_elements.get_mut(1) {
                                if let Some(elem) = node.as_element_mut() {
                                    if *elem.tag_name == b"body" {
                                        self.frameset_ok = false;
                                        for (key, value) in tag.attributes {
                                            elem.attributes.entry(key).or_insert(value);
                                        }
                                    }
                                }
                            }
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"frameset") => {
                        self.parse_error();
                        let dont_ignore_token = self.frameset_ok && self.stack_of_open_elements.get(1).and_then(|node| node.as_element()).map(|elem| *elem.tag_name == b"body").unwrap_or(false);

                        if dont_ignore_token {
                            self.stack_of_open_elements.truncate(2);
                            self.stack_of_open_elements.pop().expect("no body element?");
                            self.insert_an_element_for_a_token(token.unwrap());
                            self.insertion_mode = InsertionMode::InFrameset;
                        }
                    }
                    None => {
                        if !self.stack_of_open_elements.is_empty() {
                            self.process_token_via_insertion_mode(InsertionMode::InTemplate, token);
                        } else {
                            for node in &self.stack_of_open_elements {
                                if let Some(elem) = node.as_element() {
                                    if !matches!(elem.tag_name.as_slice(), b"dd" | b"dt" | b"li" | b"optgroup" | b"option" | b"p" | b"rb" | b"rp" | b"rt" | b"rtc" | b"tbody" | b"td" | b"tfoot" | b"th" | b"thead" | b"tr" | b"body" | b"html") {
                                        self.parse_error();
                                        break;
                                    }
                                }
                            }
                            self.stop_parsing();
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"body" | b"html") => {
                        if !self.has_element_in_scope(b"body") {
                            self.parse_error();
                        } else {
                            for node in &self.stack_of_open_elements {
                                if let Some(elem) = node.as_element() {
                                    if !matches!(elem.tag_name.as_slice(), b"dd" | b"dt" | b"li" | b"optgroup" | b"option" | b"p" | b"rb" | b"rp" | b"rt" | b"rtc" | b"tbody" | b"td" | b"tfoot" | b"th" | b"thead" | b"tr" | b"body" | b"html") {
                                        self.parse_error();
                                        break;
                                    }
                                }
                            }

                            self.insertion_mode = InsertionMode::AfterBody;

                            if tag.name.as_slice() == b"html" {
                                self.reprocess_token(token);
                            }
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"address" | b"article" | b"aside" | b"blockquote" | b"center" | b"details" | b"dialog" | b"dir" | b"div" | b"dl" | b"fieldset" | b"figcaption" | b"figure" | b"footer" | b"header" | b"hgroup" | b"main" | b"menu" | b"nav" | b"ol" | b"p" | b"section" | b"summary" | b"ul") => {
                        if self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6") => {
                        if self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }

                        if self.current_node().and_then(|node| node.as_element()).map_or(false, |elem| matches!(elem.tag_name.as_slice(), b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6")) {
                            self.parse_error();
                            self.stack_of_open_elements.pop().unwrap();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"pre" | b"listing") => {
                        if self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());

                        if let Some(Token::String(ref mut string)) = self.peek_token() {
                            if string.starts_with(b"\n") {
                                let len = string.len();
                                string.copy_within(1.., 0);
                                string.truncate(len - 1);
                            }
                        }

                        self.frameset_ok = false;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"form") => {
                        let has_template_elem = self.stack_of_open_elements.iter().any(|node| node.as_element().map_or(false, |elem| *elem.tag_name == b"template"));
                        if self.form_element_pointer.is_none() && !has_template_elem {
                            self.parse_error();
                        } else {
                            if self.has_element_in_button_scope(b"p") {
                                self.close_a_p_element();
                            }

                            let node = self.insert_an_element_for_a_token(token.unwrap());
                            if !has_template_elem {
                                self.form_element_pointer = Some(node);
                            }
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"li") => {
                        self.frameset_ok = false;

                        // Loop: walk the stack of open elements from the top down.
                        for index in (0..self.stack_of_open_elements.len()).rev() {
                            let node = self.stack_of_open_elements[index].clone();

                            if node.is_element(b"li") {
                                self.generate_implied_end_tags(&[b"li"]);
                                if !self.current_node().map_or(false, |node| node.is_element(b"li")) {
                                    self.parse_error();
                                }

                                while let Some(node) = self.stack_of_open_elements.pop() {
                                    if node.is_element(b"li") {
                                        break;
                                    }
                                }

                                // "jump to the step labeled done below"
                                break;
                            }

                            if node.is_special() && !node.is_element(b"address") && !node.is_element(b"div") && !node.is_element(b"p")  {
                                // "jump to the step labeled done below"
                                break;
                            }

                            // "set node to the previous entry in the stack of open elements and
                            // return to the step labeled loop" -- just continue the `for` loop,
                            // which walks the stack top-down.
                        }

                        // Done:
                        if self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"dd" | b"dt") => {
                        self.frameset_ok = false;
                        // Loop: walk the stack of open elements from the top down.
                        for index in (0..self.stack_of_open_elements.len()).rev() {
                            let node = self.stack_of_open_elements[index].clone();
                            if node.is_element(b"dd") {
                                self.generate_implied_end_tags(&[b"dd"]);
                                if !self.current_node().map_or(false, |node| node.is_element(b"dd")) {
                                    self.parse_error();
                                }

                                while let Some(node) = self.stack_of_open_elements.pop() {
                                    if node.is_element(b"dd") {
                                        break;
                                    }
                                }

                                break;
                            }

                            if node.is_element(b"dt") {
                                self.generate_implied_end_tags(&[b"dt"]);
                                if !self.current_node().map_or(false, |node| node.is_element(b"dt")) {
                                    self.parse_error();
                                }

                                while let Some(node) = self.stack_of_open_elements.pop() {
                                    if node.is_element(b"dt") {
                                        break;
                                    }
                                }

                                break;
                            }

                            if node.is_special() && !node.is_element(b"address") && !node.is_element(b"div") && !node.is_element(b"p")  {
                                break;
                            }
                            // "set node to the previous entry in the stack of open elements and
                            // return to the step labeled loop" -- continue the `for` loop.
                        }

                        // Done:
                        if self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"plaintext") => {
                        if self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                        self.tokenizer.set_plaintext_state();
                        // 'Once a start tag with the tag name "plaintext" has been seen, that will
                        // be the last token ever seen other than character tokens (and the
                        // end-of-file token), because there is no way to switch out of the
                        // PLAINTEXT state.'
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"button") => {
                        if self.has_element_in_scope(b"button") {
                            self.parse_error();
                            self.generate_implied_end_tags(&[]);
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"button") {
                                    break;
                                }
                            }
                            self.reconstruct_the_active_formatting_elements();
                            self.insert_an_element_for_a_token(token.unwrap());
                            self.frameset_ok = false;
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"address" | b"article" | b"blockquote" | b"button" | b"center" | b"details" | b"dir" | b"div" | b"dl" | b"fieldset" | b"figcaption" | b"figure" | b"footer" | b"header" | b"hgroup" | b"listing" | b"main" | b"menu" | b"nav" | b"ol" | b"pre" | b"section" | b"summary" | b"ul") => {
                        if !self.has_element_in_scope(tag.name.as_slice()) {
                            self.parse_error();
                        } else {
                            self.generate_implied_end_tags(&[]);
                            if !self.current_node().map_or(false, |node| node.is_element(tag.name.as_slice())) {
                                self.parse_error();
                            }
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(tag.name.as_slice()) {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"form") => {
                        let has_template_elem = self.stack_of_open_elements.iter().any(|node| node.as_element().map_or(false, |elem| *elem.tag_name == b"template"));
                        if !has_template_elem {
                            let mut node = self.form_element_pointer.take();
                            if node.as_ref().map_or(true, |node| !self.has_element_in_scope2(|node2| node.same_identity(node2))) {
                                self.parse_error();
                                return;
                            }
                            self.generate_implied_end_tags(&[]);
                            match (self.current_node(), &node) {
                                (Some(a), Some(b)) if a.same_identity(b) => (),
                                (None, None) => (),
                                _ => {
                                    self.parse_error();
                                }
                            }
                            if let Some(ref node) = node {
                                self.stack_of_open_elements.retain(|node2| {
                                    !node2.same_identity(node)
                                });
                            }
                        } else {
                            if !self.has_element_in_scope(b"form") {
                                self.parse_error();
                                return;
                            }
                            self.generate_implied_end_tags(&[]);
                            if !self.current_node().map_or(false, |node| node.is_element(b"form")) {
                                self.parse_error();
                            }

                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"form") {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"p") => {
                        if !self.has_element_in_button_scope(b"p") {
                            self.parse_error();
                            self.insert_an_element_for_a_token(Token::StartTag(StartTag {
                                name: b"p".as_slice().to_owned().into(),
                                ..StartTag::default()
                            }));
                        }

                        self.close_a_p_element();
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"li") => {
                        if !self.has_element_in_list_item_scope(b"li") {
                            self.parse_error();
                        } else {
                            self.generate_implied_end_tags(&[b"li"]);
                            if !self.current_node().map_or(false, |node| node.is_element(b"li")) {
                                self.parse_error();
                            }
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"li") {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"dd" | b"dt") => {
                        if !self.has_element_in_scope(&tag.name) {
                            self.parse_error();
                        } else {
                            self.generate_implied_end_tags(&[&tag.name]);
                            if !self.current_node().map_or(false, |node| node.is_element(&tag.name)) {
                                self.parse_error();
                            }

                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(&tag.name) {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6") => {
                        fn is_heading(node: &Node) -> bool {
                            node.is_element(b"h1") || node.is_element(b"h2") || node.is_element(b"h3") || node.is_element(b"h4") || node.is_element(b"h5") || node.is_element(b"h6")
                        }

                        if !self.has_element_in_scope2(is_heading) {
                            self.parse_error();
                        } else {
                            self.generate_implied_end_tags(&[]);
                            if !self.current_node().map_or(false, |node| node.is_element(&tag.name)) {
                                self.parse_error();
                            }
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if is_heading(&node) {
                                    break;
                                }
                            }
                        }
                    }
                    // > An end tag whose tag name is "sarcasm": Take a deep breath, then act as
                    // > described in the "any other end tag" entry below.
                    //
                    // Already handled by the fallthrough case. There are no other branches before
                    // that that could "catch" this case.
                    //
                    // Also already took many deep breaths while writing this code.
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"a") => {
                        let mut found_a_element = None;
                        for (i, element_or_marker) in self.list_of_active_formatting_elements.iter().enumerate().rev() {
                            match element_or_marker {
                                ElementOrMarker::Marker => break,
                                ElementOrMarker::Element(elem) => {
                                    if elem.is_element(b"a") {
                                        found_a_element = Some(i);
                                        break;
                                    }
                                }
                            }
                        }

                        if let Some(i) = found_a_element {
                            self.parse_error();
                            // TODO: can i pass a reference to a token here?
                            self.run_adoption_agency_algorithm(token.clone().unwrap());
                            // TODO: wrong assumptions?
                            debug_assert!(self.list_of_active_formatting_elements.remove(i).as_element().unwrap().is_element(b"a"));
                        }

                        self.reconstruct_the_active_formatting_elements();
                        let node = self.insert_an_element_for_a_token(token.unwrap());
                        self.push_onto_the_list_of_active_formatting_elements(node);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"b" | b"big" | b"code" | b"em" | b"font" | b"i" | b"s" | b"small" | b"strike" | b"strong" | b"tt" | b"u") => {
                        self.reconstruct_the_active_formatting_elements();
                        let node = self.insert_an_element_for_a_token(token.unwrap());
                        self.push_onto_the_list_of_active_formatting_elements(node);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"nobr") => {
                        self.reconstruct_the_active_formatting_elements();
                        if self.has_element_in_scope(b"nobr") {
                            self.parse_error();
                            self.run_adoption_agency_algorithm(token.clone().unwrap());
                            self.reconstruct_the_active_formatting_elements();
                        }
                        let node = self.insert_an_element_for_a_token(token.unwrap());
                        self.push_onto_the_list_of_active_formatting_elements(node);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"a" | b"b" | b"big" | b"code" | b"em" | b"font" | b"i" | b"nobr" | b"s" | b"small" | b"strike" | b"strong" | b"tt" | b"u") => {
                        self.run_adoption_agency_algorithm(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"applet" | b"marquee" | b"object") => {
                        self.reconstruct_the_active_formatting_elements();
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.list_of_active_formatting_elements.push(ElementOrMarker::Marker);
                        self.frameset_ok = false;
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"applet" | b"marquee" | b"object") => {
                        if !self.has_element_in_scope(&tag.name) {
                            self.parse_error();
                        } else {
                            self.generate_implied_end_tags(&[]);
                            if !self.current_node().map_or(false, |node| node.is_element(&tag.name)) {
                                self.parse_error();
                            }
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(&tag.name) {
                                    break;
                                }
                            }
                            self.clear_list_of_active_formatting_elements_up_to_the_last_marker();
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"table") => {
                        if !self.document.quirks_mode && self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.frameset_ok = false;
                        self.insertion_mode = InsertionMode::InTable;
                    }
                    Some(Token::EndTag(tag)) if matches!(tag.name.as_slice(), b"br") => {
                        self.parse_error();
                        self.process_token_via_insertion_mode(self.insertion_mode, Some(Token::StartTag(StartTag {
                            name: tag.name,
                            ..StartTag::default()
                        })));
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"area" | b"br" | b"embed" | b"img" | b"keygen" | b"wbr") => {
                        self.reconstruct_the_active_formatting_elements();
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.stack_of_open_elements.pop().unwrap();
                        // TODO: acknowledge self-closing flag
                        self.frameset_ok = false;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"input") => {
                        self.reconstruct_the_active_formatting_elements();
                        // TODO: assumption: token is not mutated by insert_an_element_for_a_token
                        let type_is_hidden = !tag.attributes.get(b"type".as_slice()).map_or(false, |value| **value == b"hidden".as_slice());
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.stack_of_open_elements.pop().unwrap();
                        // TODO: acknowledge self-closing flag
                        if type_is_hidden {
                            self.frameset_ok = false;
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"param" | b"source" | b"track") => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.stack_of_open_elements.pop().unwrap();
                        // TODO: acknowledge self-closing flag
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"hr") => {
                        if self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                        self.stack_of_open_elements.pop().unwrap();
                        // TODO: acknowledge self-closing flag
                        self.frameset_ok = false;
                    }
                    Some(Token::StartTag(ref mut tag)) if matches!(tag.name.as_slice(), b"image") => {
                        self.parse_error();
                        // "change the token's tag name to img and reprocess it. (Don't ask)"
                        tag.name = b"img".as_slice().to_owned().into();
                        self.reprocess_token(token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"textarea") => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        if let Some(Token::String(ref mut string)) = self.peek_token() {
                            if string.starts_with(b"\n") {
                                let len = string.len();
                                string.copy_within(1.., 0);
                                string.truncate(len - 1);
                            }
                        }
                        self.tokenizer.switch_to(State::RcData);
                        self.original_insertion_mode = Some(self.insertion_mode);
                        self.frameset_ok = false;
                        self.insertion_mode = InsertionMode::Text;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"xmp") => {
                        if self.has_element_in_button_scope(b"p") {
                            self.close_a_p_element();
                        }
                        self.reconstruct_the_active_formatting_elements();
                        self.frameset_ok = false;
                        self.generic_rawtext_element_parsing_algorithm(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"iframe") => {
                        self.frameset_ok = false;
                        self.generic_rawtext_element_parsing_algorithm(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"noembed") => {
                        self.generic_rawtext_element_parsing_algorithm(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if self.scripting && matches!(tag.name.as_slice(), b"noscript") => {
                        self.generic_rawtext_element_parsing_algorithm(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"select") => {
                        self.reconstruct_the_active_formatting_elements();
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.frameset_ok = false;
                        if matches!(self.insertion_mode, InsertionMode::InTable | InsertionMode::InCaption | InsertionMode::InTableBody | InsertionMode::InRow | InsertionMode::InCell) {
                            self.insertion_mode = InsertionMode::InSelectInTable;
                        } else {
                            self.insertion_mode = InsertionMode::InSelect;
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"optgroup" | b"option") => {
                        if self.current_node().map_or(false, |node| node.is_element(b"option")) {
                            self.stack_of_open_elements.pop().unwrap();
                        }

                        self.reconstruct_the_active_formatting_elements();
                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"rb" | b"rtc") => {
                        if self.has_element_in_scope(b"ruby") {
                            self.generate_implied_end_tags(&[]);
                            // TODO: perhaps this needs to be run un-nested?
                            if !self.current_node().map_or(false, |node| node.is_element(b"ruby")) {
                                self.parse_error();
                            }
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"rp" | b"rt") => {
                        if self.has_element_in_scope(b"ruby") {
                            self.generate_implied_end_tags(&[b"rtc"]);
                            // TODO: perhaps this needs to be run un-nested?
                            if !self.current_node().map_or(false, |node| node.is_element(b"ruby") || node.is_element(b"rtc")) {
                                self.parse_error();
                            }
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"math") => {
                        // TODO: perhaps this attribute gets modified later?
                        let self_closing = tag.self_closing;
                        self.reconstruct_the_active_formatting_elements();
                        let mut token = token.unwrap();
                        self.adjust_mathml_attributes(&mut token);
                        self.adjust_foreign_attributes(&mut token);
                        self.insert_a_foreign_element(token, ElementNamespace::MathML);
                        if self_closing {
                            self.stack_of_open_elements.pop().unwrap();
                            // TODO: acknowledge self-closing flag
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"svg") => {
                        // TODO: perhaps this attribute gets modiifed later?
                        let self_closing = tag.self_closing;
                        self.reconstruct_the_active_formatting_elements();
                        let mut token = token.unwrap();
                        self.adjust_svg_attributes(&mut token);
                        self.adjust_foreign_attributes(&mut token);
                        self.insert_a_foreign_element(token, ElementNamespace::SVG);
                        if self_closing {
                            self.stack_of_open_elements.pop().unwrap();
                            // TODO: acknowledge self-closing flag
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"caption" | b"col" | b"colgroup" | b"frame" | b"head" | b"tbody" | b"td" | b"tfoot" | b"th" | b"thead" | b"tr") => {
                        self.parse_error();
                    }
                    Some(token @ Token::StartTag(_)) => {
                        self.reconstruct_the_active_formatting_elements();
                        self.insert_an_element_for_a_token(token);
                        // TODO: debug assert for "ordinary" element
                    }
                    Some(Token::EndTag(ref tag)) => {
                        // Loop: walk the stack of open elements from the top down.
                        for index in (0..self.stack_of_open_elements.len()).rev() {
                            let node = self.stack_of_open_elements[index].clone();
                            if node.is_element(&tag.name) {
                                self.generate_implied_end_tags(&[&tag.name]);
                                if self.current_node().map_or(false, |node2| !node2.same_identity(&node)) {
                                    self.parse_error();
                                }
                                while let Some(node2) = self.stack_of_open_elements.pop() {
                                    if node.same_identity(&node2) {
                                        break;
                                    }
                                }
                                break;
                            }
                            // "set node to the previous entry in the stack of open elements and
                            // return to the step labeled loop" -- continue the `for` loop.
                        }
                    }
                    Some(Token::Error(error)) => {
                        log::debug!("parse error in foreign content: {error}");
                        self.parse_error();
                    }
                }
            }
            InsertionMode::Text => {
                match token {
                    Some(Token::String(s)) => {
                        debug_assert!(s.iter().all(|&x| x != b'\0'));
                        self.insert_a_character(&s);
                    }
                    None => {
                        self.parse_error();
                        if let Some(current_node) = self.current_node_mut() {
                            if current_node.is_element(b"script") {
                                current_node.as_element_mut().unwrap().already_started = true;
                            }
                        }

                        self.stack_of_open_elements.pop().unwrap();
                        self.insertion_mode = self.original_insertion_mode.unwrap();
                        self.reprocess_token(token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"script") => {
                        // TODO: implement this entire state. we don't really support scripting
                        let node = self.stack_of_open_elements.pop().unwrap();
                        debug_assert!(node.is_element(b"script"));
                    }
                    Some(Token::EndTag(ref tag)) => {
                        self.stack_of_open_elements.pop().unwrap();
                        self.insertion_mode = self.original_insertion_mode.unwrap();
                    }
                    _ => {
                        // undefined transitions in spec
                        unreachable!();
                    }
                }
            }
            InsertionMode::InTable => {
                match token {
                    Some(Token::String(_)) if self.current_node().map_or(false, |node| node.is_element(b"table") || node.is_element(b"tbody") || node.is_element(b"tfoot") || node.is_element(b"thead") || node.is_element(b"tr")) => {
                        self.pending_table_character_tokens.clear();
                        self.original_insertion_mode = Some(self.insertion_mode);
                        self.insertion_mode = InsertionMode::InTableText;
                        self.reprocess_token(token);
                    }
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, None);
                    }
                    Some(Token::Doctype(doctype)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"caption") => {
                        self.clear_stack_back_to_a_table_context();
                        self.list_of_active_formatting_elements.push(ElementOrMarker::Marker);
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.insertion_mode = InsertionMode::InCaption;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"colgroup") => {
                        self.clear_stack_back_to_a_table_context();
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.insertion_mode = InsertionMode::InColumnGroup;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"col") => {
                        self.clear_stack_back_to_a_table_context();
                        self.insert_an_element_for_a_token(Token::StartTag(StartTag {
                            name: b"colgroup".as_slice().to_owned().into(),
                            ..StartTag::default()
                        }));
                        self.insertion_mode = InsertionMode::InColumnGroup;
                        self.reprocess_token(token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"tbody" | b"tfoot" | b"thead") => {
                        self.clear_stack_back_to_a_table_context();
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.insertion_mode = InsertionMode::InTableBody;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"td" | b"th" | b"tr") => {
                        self.clear_stack_back_to_a_table_context();
                        self.insert_an_element_for_a_token(Token::StartTag(StartTag {
                            name: b"tbody".as_slice().to_owned().into(),
                            ..StartTag::default()
                        }));
                        self.insertion_mode = InsertionMode::InTableBody;
                        self.reprocess_token(token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"table") => {
                        self.parse_error();
                        if self.has_element_in_table_scope(b"table") {
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"table") {
                                    break;
                                }
                            }

                            self.reset_the_insertion_mode_appropriately();
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"table") => {
                        if !self.has_element_in_table_scope(b"table") {
                            self.parse_error();
                        } else {
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"table") {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"body" | b"caption" | b"col" | b"colgroup" | b"html" | b"tbody" | b"td" | b"tfoot" | b"th" | b"thead" | b"tr") => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"style" | b"script" | b"template") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"template") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    // TODO: ascii-case insensitive match for "hidden"
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"input") && tag.attributes.get(b"type".as_slice()).map_or(false, |value| **value == b"hidden") => {
                        self.parse_error();
                        let node = self.insert_an_element_for_a_token(token.unwrap());
                        let node2 = self.stack_of_open_elements.pop().unwrap();
                        debug_assert!(node.same_identity(&node2));
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"form") => {
                        self.parse_error();
                        if self.stack_of_open_elements.iter().any(|node| node.is_element(b"template")) || self.form_element_pointer.is_some() {
                            // ignore the token
                        } else {
                            let node = self.insert_an_element_for_a_token(token.unwrap());
                            let node2 = self.stack_of_open_elements.pop().unwrap();
                            debug_assert!(node.same_identity(&node2));
                            self.form_element_pointer = Some(node);
                        }

                    }
                    None => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    token => {
                        self.parse_error();
                        self.foster_parenting = true;
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                        self.foster_parenting = false;
                    }
                }
            }
            InsertionMode::InTableText => {
                match token {
                    Some(Token::String(s)) => {
                        for &c in &*s {
                            if c == b'\0' {
                                self.parse_error();
                            } else {
                                self.pending_table_character_tokens.push(c);
                            }
                        }
                    }
                    token => {
                        if self.pending_table_character_tokens.iter().any(|x| !x.is_ascii_whitespace()) {
                            // > [...] then this is a parse error: reprocess the character tokens in the
                            // > pending table character tokens list using the rules given in the
                            // > "anything else" entry in the "in table" insertion mode.
                            //
                            // TODO: two parse errors? the InTable insertion mode also emits a
                            // parse error
                            self.parse_error();
                            self.foster_parenting = true;
                            // XXX: inefficient clone
                            let pending = self.pending_table_character_tokens.clone();
                            // TODO: clear pending characters?
                            self.process_token_via_insertion_mode(InsertionMode::InBody, Some(Token::String(pending.into())));
                            self.foster_parenting = false;
                        } else {
                            // XXX: inefficient clone
                            let pending = self.pending_table_character_tokens.clone();
                            // TODO: clear pending characters?
                            self.insert_a_character(&pending);
                        }

                        self.insertion_mode = self.original_insertion_mode.unwrap();
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::InCaption => {
                match token {
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"caption") => {
                        self.handle_in_caption_inner();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"caption" | b"col" | b"colgroup" | b"tbody" | b"td" | b"tfoot" | b"th" | b"thead" | b"tr") => {
                        if self.handle_in_caption_inner() {
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"table") => {
                        if self.handle_in_caption_inner() {
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"body" | b"col" | b"colgroup" | b"html" | b"tbody" | b"td" | b"tfoot" | b"th" | b"thead" | b"tr") => {
                        self.parse_error();
                    }
                    _ => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                }
            }
            InsertionMode::InColumnGroup => {
                handle_string_prefix!(token, b'\t' | b'\x0A' | b'\x0C' | b' ', |string| {
                    self.insert_a_character(string);
                });

                match token {
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, None);
                    }
                    Some(Token::Doctype(_)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"col") => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.stack_of_open_elements.pop();
                        // TODO: acknowledge self-closing flag
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"colgroup") => {
                        if !self.current_node().map_or(false, |node| node.is_element(b"colgroup")) {
                            self.parse_error();
                        } else {
                            self.stack_of_open_elements.pop();
                            self.insertion_mode = InsertionMode::InTable;
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"col") => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"template") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"template") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    None => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    _ => {
                        if !self.current_node().map_or(false, |node| node.is_element(b"colgroup")) {
                            self.parse_error();
                        } else {
                            self.stack_of_open_elements.pop();
                            self.insertion_mode = InsertionMode::InTable;
                            self.reprocess_token(token);
                        }
                    }
                }
            }
            InsertionMode::InTableBody => {
                match token {
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"tr") => {
                        self.clear_stack_back_to_a_table_body_context();
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.insertion_mode = InsertionMode::InRow;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"th" | b"td") => {
                        self.parse_error();
                        self.clear_stack_back_to_a_table_body_context();
                        self.insert_an_element_for_a_token(Token::StartTag(StartTag {
                            name: b"tr".as_slice().to_owned().into(),
                            ..StartTag::default()
                        }));
                        self.insertion_mode = InsertionMode::InRow;
                        self.reprocess_token(token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"tbody" | b"tfoot" | b"thead") => {
                        if !self.has_element_in_table_scope(&tag.name) {
                            self.parse_error();
                        } else {
                            self.clear_stack_back_to_a_table_body_context();
                            self.stack_of_open_elements.pop();
                            self.insertion_mode = InsertionMode::InTable;
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"caption" | b"col" | b"colgroup" | b"tbody" | b"tfoot" | b"thead") => {
                        if !self.has_element_in_table_scope(b"tbody") && !self.has_element_in_table_scope(b"thead") && !self.has_element_in_table_scope(b"tfoot") {
                            self.parse_error();
                        } else {
                            self.clear_stack_back_to_a_table_body_context();
                            self.stack_of_open_elements.pop();
                            self.insertion_mode = InsertionMode::InTable;
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"table") => {
                        if !self.has_element_in_table_scope(b"tbody") || !self.has_element_in_table_scope(b"thead") || !self.has_element_in_table_scope(b"tfoot") {
                            self.parse_error();
                        } else {
                            self.clear_stack_back_to_a_table_body_context();
                            self.stack_of_open_elements.pop();
                            self.insertion_mode = InsertionMode::InTable;
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"body" | b"caption" | b"col" | b"colgroup" | b"html" | b"td" | b"th" | b"tr") => {
                        self.parse_error();
                    }
                    _ => {
                        self.process_token_via_insertion_mode(InsertionMode::InTable, token);
                    }
                }
            }
            InsertionMode::InRow => {
                match token {
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"th" | b"td") => {
                        self.clear_stack_back_to_a_table_row_context();
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.insertion_mode = InsertionMode::InCell;
                        self.list_of_active_formatting_elements.push(ElementOrMarker::Marker);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"tr") => {
                        self.handle_in_row_inner(b"tr");
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"caption" | b"col" | b"colgroup" | b"tbody" | b"tfoot" | b"thead" | b"tr") => {
                        if self.handle_in_row_inner(b"tr") {
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"table") => {
                        if self.handle_in_row_inner(b"tr") {
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"tbody" | b"tfoot" | b"thead") => {
                        self.handle_in_row_inner(&tag.name);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"body" | b"caption" | b"col" | b"colgroup" | b"html" | b"td" | b"th") => {
                        self.parse_error();
                    }
                    _ => {
                        self.process_token_via_insertion_mode(InsertionMode::InTable, token);
                    }
                }
            }
            InsertionMode::InCell => {
                match token {
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"td" | b"th") => {
                        if !self.has_element_in_table_scope(&tag.name) {
                            self.parse_error();
                        } else {
                            self.generate_implied_end_tags(&[]);
                            if !self.current_node().map_or(false, |node| node.is_element(&tag.name)) {
                                self.parse_error();
                            }

                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(&tag.name) {
                                    break;
                                }
                            }

                            self.clear_list_of_active_formatting_elements_up_to_the_last_marker();
                            self.insertion_mode = InsertionMode::InRow;
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"caption" | b"col" | b"colgroup" | b"tbody" | b"td" | b"tfoot" | b"th" | b"thead" | b"tr") => {
                        if !self.has_element_in_table_scope(b"td") && !self.has_element_in_table_scope(b"td") {
                            self.parse_error();
                        } else {
                            self.close_the_cell();
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"body" | b"caption" | b"col" | b"colgroup" | b"html") => {
                        self.parse_error();
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"table" | b"tbody" | b"tfoot" | b"thead" | b"tr") => {
                        if !self.has_element_in_table_scope(&tag.name) {
                            self.parse_error();
                        } else {
                            self.close_the_cell();
                            self.reprocess_token(token);
                        }
                    }
                    _ => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                }
            }
            InsertionMode::InSelect => {
                match token {
                    Some(Token::String(mut s)) => {
                        s.retain(|&c| {
                            if c == b'\0' {
                                self.parse_error();
                                false
                            } else {
                                true
                            }
                        });

                        if !s.is_empty() {
                            self.insert_a_character(&s);
                        }
                    }
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, None);
                    }
                    Some(Token::Doctype(_)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"option") => {
                        if self.current_node().map_or(false, |node| node.is_element(b"option")) {
                            self.stack_of_open_elements.pop();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"optgroup") => {
                        if self.current_node().map_or(false, |node| node.is_element(b"option")) {
                            self.stack_of_open_elements.pop();
                        }

                        if self.current_node().map_or(false, |node| node.is_element(b"optgroup")) {
                            self.stack_of_open_elements.pop();
                        }

                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"optgroup") => {
                        if self.current_node().map_or(false, |node| node.is_element(b"option")) && self.stack_of_open_elements.get(self.stack_of_open_elements.len() - 2).map_or(false, |node| node.is_element(b"optgroup")) {
                            self.stack_of_open_elements.pop();
                        }

                        if self.current_node().map_or(false, |node| node.is_element(b"optgroup")) {
                            self.stack_of_open_elements.pop();
                        } else {
                            self.parse_error();
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"option") => {
                        if self.current_node().map_or(false, |node| node.is_element(b"option")) {
                            self.stack_of_open_elements.pop();
                        } else {
                            self.parse_error();
                        }
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"select") => {
                        if !self.has_element_in_select_scope(b"select") {
                            self.parse_error();
                        } else {
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"select") {
                                    break;
                                }
                            }

                            self.reset_the_insertion_mode_appropriately();
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"select") => {
                        self.parse_error();
                        if self.has_element_in_select_scope(b"select") {
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"select") {
                                    break;
                                }
                            }

                            self.reset_the_insertion_mode_appropriately();
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"input" | b"keygen" | b"textarea") => {
                        self.parse_error();
                        if self.has_element_in_select_scope(b"select") {
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"select") {
                                    break;
                                }
                            }

                            self.reset_the_insertion_mode_appropriately();
                            self.reprocess_token(token);
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"script" | b"template") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"template") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    None => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    _ => {
                        self.parse_error();
                    }
                }
            }
            InsertionMode::InSelectInTable => {
                match token {
                    Some(Token::StartTag(ref tag))
                        if matches!(tag.name.as_slice(), b"caption" | b"table" | b"tbody" | b"tfoot" | b"thead" | b"tr" | b"td" | b"th") =>
                    {
                        self.parse_error();
                        while let Some(node) = self.stack_of_open_elements.pop() {
                            if node.is_element(b"select") {
                                break;
                            }
                        }
                        self.reset_the_insertion_mode_appropriately();
                        self.reprocess_token(token);
                    }
                    Some(Token::EndTag(ref tag))
                        if matches!(tag.name.as_slice(), b"caption" | b"table" | b"tbody" | b"tfoot" | b"thead" | b"tr" | b"td" | b"th") =>
                    {
                        if !self.has_element_in_table_scope(&tag.name) {
                            self.parse_error();
                        } else {
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"select") {
                                    break;
                                }
                            }
                            self.reset_the_insertion_mode_appropriately();
                            self.reprocess_token(token);
                        }
                    }
                    _ => {
                        self.process_token_via_insertion_mode(InsertionMode::InSelect, token);
                    }
                }
            }
            InsertionMode::InTemplate => {
                match token {
                    Some(Token::String(_)) | Some(Token::Comment(_)) | Some(Token::Doctype(_)) => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag))
                        if matches!(tag.name.as_slice(), b"base" | b"basefont" | b"bgsound" | b"link" | b"meta" | b"noframes" | b"script" | b"style" | b"template" | b"title") =>
                    {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"template") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"caption" | b"colgroup" | b"tbody" | b"tfoot" | b"thead") => {
                        self.stack_of_template_insertion_modes.pop();
                        self.stack_of_template_insertion_modes.push(InsertionMode::InTable);
                        self.insertion_mode = InsertionMode::InTable;
                        self.reprocess_token(token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"col") => {
                        self.stack_of_template_insertion_modes.pop();
                        self.stack_of_template_insertion_modes.push(InsertionMode::InColumnGroup);
                        self.insertion_mode = InsertionMode::InColumnGroup;
                        self.reprocess_token(token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"tr") => {
                        self.stack_of_template_insertion_modes.pop();
                        self.stack_of_template_insertion_modes.push(InsertionMode::InTableBody);
                        self.insertion_mode = InsertionMode::InTableBody;
                        self.reprocess_token(token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"td" | b"th") => {
                        self.stack_of_template_insertion_modes.pop();
                        self.stack_of_template_insertion_modes.push(InsertionMode::InRow);
                        self.insertion_mode = InsertionMode::InRow;
                        self.reprocess_token(token);
                    }
                    Some(Token::StartTag(_)) => {
                        self.stack_of_template_insertion_modes.pop();
                        self.stack_of_template_insertion_modes.push(InsertionMode::InBody);
                        self.insertion_mode = InsertionMode::InBody;
                        self.reprocess_token(token);
                    }
                    Some(Token::EndTag(_)) | Some(Token::Error(_)) => {
                        self.parse_error();
                    }
                    None => {
                        if !self.stack_of_open_elements.iter().any(|n| n.is_element(b"template")) {
                            self.stop_parsing();
                        } else {
                            self.parse_error();
                            while let Some(node) = self.stack_of_open_elements.pop() {
                                if node.is_element(b"template") {
                                    break;
                                }
                            }
                            self.clear_list_of_active_formatting_elements_up_to_the_last_marker();
                            self.stack_of_template_insertion_modes.pop();
                            self.reset_the_insertion_mode_appropriately();
                            self.reprocess_token(token);
                        }
                    }
                }
            }
            InsertionMode::AfterBody => {
                skip_over_chars!(token, b'\t' | b'\x0A' | b'\x0C' | b'\r' | b' ');
                match token {
                    Some(Token::Comment(s)) => {
                        let html = self.stack_of_open_elements.first().cloned();
                        let _ = html;
                        self.insert_a_comment(s, None);
                    }
                    Some(Token::Doctype(_)) => {
                        self.parse_error();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        if self.fragment_parsing {
                            self.parse_error();
                        } else {
                            self.insertion_mode = InsertionMode::AfterAfterBody;
                        }
                    }
                    None => {
                        self.stop_parsing();
                    }
                    _ => {
                        self.parse_error();
                        self.insertion_mode = InsertionMode::InBody;
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::InFrameset => {
                skip_over_chars!(token, b'\t' | b'\x0A' | b'\x0C' | b'\r' | b' ');
                match token {
                    Some(Token::Comment(s)) => self.insert_a_comment(s, None),
                    Some(Token::Doctype(_)) => self.parse_error(),
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"frameset") => {
                        self.insert_an_element_for_a_token(token.unwrap());
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"frameset") => {
                        if self.stack_of_open_elements.len() == 1 {
                            self.parse_error();
                        } else {
                            self.stack_of_open_elements.pop();
                            if !self.fragment_parsing
                                && !self.current_node().map_or(false, |n| n.is_element(b"frameset"))
                            {
                                self.insertion_mode = InsertionMode::AfterFrameset;
                            }
                        }
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"frame") => {
                        self.insert_an_element_for_a_token(token.unwrap());
                        self.stack_of_open_elements.pop();
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"noframes") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    None => {
                        if self.stack_of_open_elements.len() != 1 {
                            self.parse_error();
                        }
                        self.stop_parsing();
                    }
                    _ => {
                        self.parse_error();
                    }
                }
            }
            InsertionMode::AfterFrameset => {
                skip_over_chars!(token, b'\t' | b'\x0A' | b'\x0C' | b'\r' | b' ');
                match token {
                    Some(Token::Comment(s)) => self.insert_a_comment(s, None),
                    Some(Token::Doctype(_)) => self.parse_error(),
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::EndTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        self.insertion_mode = InsertionMode::AfterAfterFrameset;
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"noframes") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    None => {
                        self.stop_parsing();
                    }
                    _ => {
                        self.parse_error();
                    }
                }
            }
            InsertionMode::AfterAfterBody => {
                match token {
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, Some(InsertPosition::document_last_child()));
                    }
                    Some(Token::Doctype(_)) => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::String(ref s)) if s.iter().all(|&b| matches!(b, b'\t' | b'\x0A' | b'\x0C' | b'\r' | b' ')) => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    None => {
                        self.stop_parsing();
                    }
                    _ => {
                        self.parse_error();
                        self.insertion_mode = InsertionMode::InBody;
                        self.reprocess_token(token);
                    }
                }
            }
            InsertionMode::AfterAfterFrameset => {
                match token {
                    Some(Token::Comment(s)) => {
                        self.insert_a_comment(s, Some(InsertPosition::document_last_child()));
                    }
                    Some(Token::Doctype(_)) => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::String(ref s)) if s.iter().all(|&b| matches!(b, b'\t' | b'\x0A' | b'\x0C' | b'\r' | b' ')) => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"html") => {
                        self.process_token_via_insertion_mode(InsertionMode::InBody, token);
                    }
                    Some(Token::StartTag(ref tag)) if matches!(tag.name.as_slice(), b"noframes") => {
                        self.process_token_via_insertion_mode(InsertionMode::InHead, token);
                    }
                    None => {
                        self.stop_parsing();
                    }
                    _ => {
                        self.parse_error();
                    }
                }
            }
        }
    }

    fn handle_in_row_inner(&mut self, tag_for_scope: &[u8]) ->  bool {
        if !self.has_element_in_table_scope(tag_for_scope) {
            self.parse_error();
            false
        } else if tag_for_scope != b"tr" && !self.has_element_in_table_scope(b"tr") {
            false
        } else {
            self.clear_stack_back_to_a_table_row_context();
            self.stack_of_open_elements.pop();
            self.insertion_mode = InsertionMode::InTableBody;
            true
        }
    }

    fn handle_in_caption_inner(&mut self) -> bool {
        if !self.has_element_in_table_scope(b"caption") {
            self.parse_error();
            false
        } else {
            self.generate_implied_end_tags(&[]);
            if self.current_node().map_or(false, |node| node.is_element(b"caption")) {
                self.parse_error();
            }

            while let Some(node) = self.stack_of_open_elements.pop() {
                if node.is_element(b"caption") {
                    break;
                }
            }

            self.clear_list_of_active_formatting_elements_up_to_the_last_marker();
            self.insertion_mode = InsertionMode::InTable;
            true
        }
    }

    fn has_element_in_specific_scope(&self, scope: impl ElementScope, matcher: impl Fn(&Node) -> bool) -> bool {
        for node in self.stack_of_open_elements.iter().rev() {
            if matcher(node) {
                return true;
            }
            if let Some(elem) = node.as_element() {
                if scope.matches(elem.expanded_name()) {
                    return false;
                }
            }
        }
        false
    }

    fn has_element_in_scope(&self, name: &[u8]) -> bool {
        self.has_element_in_specific_scope(default_scope, |n| n.is_element(name))
    }

    /// Generalized scope query taking an arbitrary predicate, used where the caller wants to test
    /// stack membership by node identity rather than by tag name (e.g. "is this exact formatting
    /// element still in scope").
    fn has_element_in_scope2(&self, matcher: impl Fn(&Node) -> bool) -> bool {
        self.has_element_in_specific_scope(default_scope, matcher)
    }

    fn has_element_in_button_scope(&self, name: &[u8]) -> bool {
        self.has_element_in_specific_scope(button_scope, |n| n.is_element(name))
    }

    fn has_element_in_list_item_scope(&self, name: &[u8]) -> bool {
        self.has_element_in_specific_scope(list_item_scope, |n| n.is_element(name))
    }

    fn has_element_in_table_scope(&self, name: &[u8]) -> bool {
        self.has_element_in_specific_scope(table_scope, |n| n.is_element(name))
    }

    fn has_element_in_select_scope(&self, name: &[u8]) -> bool {
        self.has_element_in_specific_scope(select_scope, |n| n.is_element(name))
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#close-a-p-element>
    fn close_a_p_element(&mut self) {
        self.generate_implied_end_tags(&[b"p"]);
        if !self.current_node().map_or(false, |node| node.is_element(b"p")) {
            self.parse_error();
        }
        while let Some(node) = self.stack_of_open_elements.pop() {
            if node.is_element(b"p") {
                break;
            }
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inforeign>
    fn process_token_via_foreign_content(&mut self, token: Token) {
        match token {
            Token::String(ref s) if s.iter().all(|&b| matches!(b, b'\t' | b'\x0A' | b'\x0C' | b'\r' | b' ')) => {
                self.insert_a_character(s);
            }
            Token::String(ref s) => {
                if s.contains(&0) {
                    self.parse_error();
                }
                self.frameset_ok = self.frameset_ok
                    && s.iter().all(|&b| matches!(b, b'\t' | b'\x0A' | b'\x0C' | b'\r' | b' '));
                self.insert_a_character(s);
            }
            Token::Comment(s) => self.insert_a_comment(s, None),
            Token::Doctype(_) => self.parse_error(),
            Token::Error(error) => {
                log::debug!("parse error in foreign content: {error}");
                self.parse_error();
            }
            Token::StartTag(ref tag)
                if matches!(
                    tag.name.as_slice(),
                    b"b" | b"big" | b"blockquote" | b"body" | b"br" | b"center" | b"code"
                        | b"dd" | b"div" | b"dl" | b"dt" | b"em" | b"embed" | b"h1" | b"h2"
                        | b"h3" | b"h4" | b"h5" | b"h6" | b"head" | b"hr" | b"i" | b"img"
                        | b"li" | b"listing" | b"menu" | b"meta" | b"nobr" | b"ol" | b"p"
                        | b"pre" | b"ruby" | b"s" | b"small" | b"span" | b"strong"
                        | b"strike" | b"sub" | b"sup" | b"table" | b"tt" | b"u" | b"ul"
                        | b"var"
                ) || matches!(tag.name.as_slice(), b"font")
                    && tag.attributes.keys().any(|a| matches!(a.as_slice(), b"color" | b"face" | b"size")) =>
            {
                self.parse_error();
                while !self.stack_of_open_elements.is_empty()
                    && !self
                        .current_node()
                        .map_or(false, |n| self.is_mathml_text_integration_point(n) || self.is_html_integration_point_node(n) || n.as_element().map_or(false, |e| e.namespace == Some(ElementNamespace::HTML)))
                {
                    self.stack_of_open_elements.pop();
                }
                self.reprocess_token(Some(token));
            }
            token @ Token::StartTag(_) => {
                let namespace = self
                    .adjusted_current_node()
                    .and_then(|n| n.as_element())
                    .and_then(|e| e.namespace.clone())
                    .unwrap_or(ElementNamespace::HTML);
                let self_closing = matches!(&token, Token::StartTag(tag) if tag.self_closing);
                let mut token = token;
                match namespace {
                    ElementNamespace::MathML => self.adjust_mathml_attributes(&mut token),
                    ElementNamespace::SVG => self.adjust_svg_attributes(&mut token),
                    _ => {}
                }
                self.adjust_foreign_attributes(&mut token);
                self.insert_a_foreign_element(token, namespace);
                if self_closing {
                    self.stack_of_open_elements.pop();
                }
            }
            Token::EndTag(ref tag) if matches!(tag.name.as_slice(), b"script")
                && self.current_node().map_or(false, |n| n.as_element().map_or(false, |e| e.local_name.as_slice() == b"script" && e.namespace == Some(ElementNamespace::SVG))) =>
            {
                self.stack_of_open_elements.pop();
            }
            Token::EndTag(ref tag) => {
                for index in (0..self.stack_of_open_elements.len()).rev() {
                    let node = self.stack_of_open_elements[index].clone();
                    if index == 0 {
                        return;
                    }
                    let is_match = node
                        .as_element()
                        .map_or(false, |e| e.local_name.as_slice().eq_ignore_ascii_case(&tag.name));
                    if is_match {
                        self.stack_of_open_elements.truncate(index);
                        return;
                    }
                    if self.stack_of_open_elements[index - 1]
                        .as_element()
                        .map_or(false, |e| e.namespace == Some(ElementNamespace::HTML))
                    {
                        self.reprocess_token(Some(Token::EndTag(tag.clone())));
                        return;
                    }
                }
            }
            Token::Doctype(_) => self.parse_error(),
        }
    }

    fn is_mathml_text_integration_point(&self, node: &Node) -> bool {
        node.as_element().map_or(false, |e| e.is_mathml_text_integration_point())
    }

    fn is_html_integration_point_node(&self, node: &Node) -> bool {
        node.as_element().map_or(false, |e| e.is_html_integration_point())
    }

    fn insert_a_comment(&mut self, comment_string: HtmlString, position: Option<InsertPosition>) {
        let node = Node::element(Element {
            namespace: None,
            local_name: comment_string,
            tag_name: b"#comment".as_slice().to_owned().into(),
            ..Element::default()
        });
        let position = position.unwrap_or_else(|| self.appropriate_place_for_inserting_a_node());
        self.document.insert(node, position);
    }

    fn parse_error(&mut self) {
        log::trace!("html parse error at insertion mode {:?}", self.insertion_mode);
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#insert-a-character>
    ///
    /// A lone trailing text node must never be pushed onto the stack of open elements -- only
    /// elements belong there, and a stray text node on the stack would become the "current node"
    /// and corrupt namespace propagation for whatever is inserted next. So this doesn't go through
    /// [`Self::insert_element`] at all; it also implements "if the last child of the adjusted
    /// insertion location is a Text node, just append to that Text node's data" instead of always
    /// creating a new node.
    fn insert_a_character(&mut self, characters: &[u8]) {
        let position = self.appropriate_place_for_inserting_a_node();

        let siblings: &[NodeId] = match position.parent {
            Some(parent) => self.document.children_of(parent),
            None => &self.document.root_children,
        };

        if position.before.is_none() {
            if let Some(&last_child) = siblings.last() {
                if self.document.node(last_child).is_element(b"#text") {
                    let text = self.document.node_mut(last_child).as_element_mut().unwrap();
                    text.local_name.0.extend_from_slice(characters);
                    return;
                }
            }
        }

        let node = Node::element(Element {
            namespace: None,
            local_name: characters.to_vec().into(),
            tag_name: b"#text".as_slice().to_owned().into(),
            ..Element::default()
        });
        self.document.insert(node, position);
    }

    fn create_an_element_for_the_token(&mut self, token: Token, namespace: ElementNamespace, _intended_parent: Option<&Node>) -> Element {
        let tag = match token {
            Token::StartTag(tag) => tag,
            _ => panic!("create_an_element_for_the_token called with a non-start-tag token"),
        };
        let mut attributes = BTreeMap::new();
        for (key, value) in tag.attributes {
            attributes.entry(key).or_insert(value);
        }
        Element {
            namespace: Some(namespace),
            prefix: None,
            local_name: tag.name.clone(),
            tag_name: tag.name,
            force_async: false,
            already_started: false,
            attributes,
        }
    }

    fn insert_an_element_for_a_token(&mut self, token: Token) -> Node {
        let namespace = self
            .adjusted_current_node()
            .and_then(|n| n.as_element())
            .and_then(|e| e.namespace.clone())
            .unwrap_or(ElementNamespace::HTML);
        let element = self.create_an_element_for_the_token(token, namespace, self.current_node());
        let node = Node::element(element);
        let position = self.appropriate_place_for_inserting_a_node();
        self.insert_element(node, position)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#generic-rcdata-element-parsing-algorithm>
    fn generic_rcdata_element_parsing_algorithm(&mut self, token: Token) {
        self.insert_an_element_for_a_token(token);
        self.tokenizer.switch_to(State::RcData);
        self.original_insertion_mode = Some(self.insertion_mode);
        self.insertion_mode = InsertionMode::Text;
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#generic-raw-text-element-parsing-algorithm>
    fn generic_rawtext_element_parsing_algorithm(&mut self, token: Token) {
        self.insert_an_element_for_a_token(token);
        self.tokenizer.switch_to(State::RawText);
        self.original_insertion_mode = Some(self.insertion_mode);
        self.insertion_mode = InsertionMode::Text;
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#appropriate-place-for-inserting-a-node>
    fn appropriate_place_for_inserting_a_node(&mut self) -> InsertPosition {
        match self.current_node().cloned() {
            Some(target) => self.appropriate_place_for_inserting_a_node_with_override(&target),
            None => InsertPosition::document_last_child(),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#appropriate-place-for-inserting-a-node>,
    /// with an explicit override target (used by the adoption agency algorithm, which resolves
    /// the insertion point for `commonAncestor` rather than the current node).
    fn appropriate_place_for_inserting_a_node_with_override(&mut self, target: &Node) -> InsertPosition {
        let is_foster_parenting_target = self.foster_parenting
            && target
                .as_element()
                .map_or(false, |e| matches!(e.local_name.as_slice(), b"table" | b"tbody" | b"tfoot" | b"thead" | b"tr"));

        if !is_foster_parenting_target {
            return InsertPosition::last_child_of(Some(target.id));
        }

        let Some(table_index) = self.stack_of_open_elements.iter().rposition(|n| n.is_element(b"table")) else {
            // No table element in the stack of open elements: foster parenting falls back to the
            // first (bottommost, i.e. outermost) open element -- in practice always `<html>`.
            let fallback = self.stack_of_open_elements.first().cloned();
            return InsertPosition::last_child_of(fallback.map(|n| n.id));
        };

        let table = self.stack_of_open_elements[table_index].clone();
        match self.document.parent_of(table.id) {
            Some(parent) => InsertPosition { parent: Some(parent), before: Some(table.id) },
            // The table hasn't been attached to the tree yet.
            None if table_index > 0 => {
                let fallback = self.stack_of_open_elements[table_index - 1].clone();
                InsertPosition::last_child_of(Some(fallback.id))
            }
            None => InsertPosition::document_last_child(),
        }
    }

    fn insert_element(&mut self, node: Node, position: InsertPosition) -> Node {
        let node = self.document.insert(node, position);
        self.stack_of_open_elements.push(node.clone());
        node
    }

    fn generate_all_implied_end_tags_thoroughly(&mut self) {
        const SET: &[&[u8]] = &[
            b"caption", b"colgroup", b"dd", b"dt", b"li", b"optgroup", b"option", b"p", b"rb",
            b"rp", b"rt", b"rtc", b"tbody", b"td", b"tfoot", b"th", b"thead", b"tr",
        ];
        while self
            .current_node()
            .map_or(false, |n| n.as_element().map_or(false, |e| SET.contains(&e.local_name.as_slice())))
        {
            self.stack_of_open_elements.pop();
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#push-onto-the-list-of-active-formatting-elements>
    ///
    /// The "Noah's Ark clause": if there are already three elements since the last marker with
    /// the same tag name, namespace, and attributes as `node`, the earliest of them is dropped
    /// before `node` is pushed, so the list never grows an unbounded run of identical formatting
    /// elements (e.g. a pathological `<b><b><b>...`).
    fn push_onto_the_list_of_active_formatting_elements(&mut self, node: Node) {
        let mut matching = Vec::new();
        for entry in self.list_of_active_formatting_elements.iter().rev() {
            let existing = match entry {
                ElementOrMarker::Marker => break,
                ElementOrMarker::Element(existing) => existing,
            };
            let (Some(a), Some(b)) = (existing.as_element(), node.as_element()) else {
                continue;
            };
            if a.namespace == b.namespace && a.local_name == b.local_name && a.attributes == b.attributes {
                matching.push(existing.clone());
            }
        }

        if matching.len() >= 3 {
            let earliest = matching.last().unwrap();
            if let Some(i) = self
                .list_of_active_formatting_elements
                .iter()
                .position(|entry| entry.as_element().map_or(false, |n| n.same_identity(earliest)))
            {
                self.list_of_active_formatting_elements.remove(i);
            }
        }

        self.list_of_active_formatting_elements.push(ElementOrMarker::Element(node));
    }

    fn clear_list_of_active_formatting_elements_up_to_the_last_marker(&mut self) {
        while let Some(entry) = self.list_of_active_formatting_elements.pop() {
            if matches!(entry, ElementOrMarker::Marker) {
                break;
            }
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#reset-the-insertion-mode-appropriately>
    fn reset_the_insertion_mode_appropriately(&mut self) {
        for (index, node) in self.stack_of_open_elements.iter().enumerate().rev() {
            let last = index == 0;
            let node = if last && self.fragment_parsing {
                self.context_element.as_ref().unwrap_or(node)
            } else {
                node
            };
            let Some(elem) = node.as_element() else { continue };
            let name = elem.local_name.as_slice();
            if elem.namespace == Some(ElementNamespace::HTML) {
                match name {
                    b"select" => {
                        for ancestor in self.stack_of_open_elements[..=index].iter().rev() {
                            if let Some(a) = ancestor.as_element() {
                                if a.local_name.as_slice() == b"template" {
                                    break;
                                }
                                if a.local_name.as_slice() == b"table" {
                                    self.insertion_mode = InsertionMode::InSelectInTable;
                                    return;
                                }
                            }
                        }
                        self.insertion_mode = InsertionMode::InSelect;
                        return;
                    }
                    b"td" | b"th" if !last => {
                        self.insertion_mode = InsertionMode::InCell;
                        return;
                    }
                    b"tr" => {
                        self.insertion_mode = InsertionMode::InRow;
                        return;
                    }
                    b"tbody" | b"thead" | b"tfoot" => {
                        self.insertion_mode = InsertionMode::InTableBody;
                        return;
                    }
                    b"caption" => {
                        self.insertion_mode = InsertionMode::InCaption;
                        return;
                    }
                    b"colgroup" => {
                        self.insertion_mode = InsertionMode::InColumnGroup;
                        return;
                    }
                    b"table" => {
                        self.insertion_mode = InsertionMode::InTable;
                        return;
                    }
                    b"template" => {
                        self.insertion_mode = *self
                            .stack_of_template_insertion_modes
                            .last()
                            .unwrap_or(&InsertionMode::InBody);
                        return;
                    }
                    b"head" if !last => {
                        self.insertion_mode = InsertionMode::InHead;
                        return;
                    }
                    b"body" => {
                        self.insertion_mode = InsertionMode::InBody;
                        return;
                    }
                    b"frameset" => {
                        self.insertion_mode = InsertionMode::InFrameset;
                        return;
                    }
                    b"html" => {
                        self.insertion_mode = if self.head_element_pointer.is_none() {
                            InsertionMode::BeforeHead
                        } else {
                            InsertionMode::AfterHead
                        };
                        return;
                    }
                    _ => {}
                }
            }
            if last {
                self.insertion_mode = InsertionMode::InBody;
                return;
            }
        }
        self.insertion_mode = InsertionMode::InBody;
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#reconstruct-the-active-formatting-elements>
    fn reconstruct_the_active_formatting_elements(&mut self) {
        if self.list_of_active_formatting_elements.is_empty() {
            return;
        }

        let is_on_stack = |dispatcher: &Self, entry: &ElementOrMarker| {
            matches!(entry, ElementOrMarker::Marker)
                || entry
                    .as_element()
                    .map_or(false, |node| dispatcher.stack_of_open_elements.iter().any(|n| n.same_identity(node)))
        };

        let last_index = self.list_of_active_formatting_elements.len() - 1;
        if is_on_stack(self, &self.list_of_active_formatting_elements[last_index]) {
            return;
        }

        let mut index = last_index;
        loop {
            if index == 0 {
                break;
            }
            index -= 1;
            if is_on_stack(self, &self.list_of_active_formatting_elements[index]) {
                index += 1;
                break;
            }
        }

        for i in index..=last_index {
            let element = match &self.list_of_active_formatting_elements[i] {
                ElementOrMarker::Element(node) => node.as_element().expect("formatting entry is an element").clone(),
                ElementOrMarker::Marker => continue,
            };
            let new_node = Node::element(element);
            let position = self.appropriate_place_for_inserting_a_node();
            let new_node = self.insert_element(new_node, position);
            self.list_of_active_formatting_elements[i] = ElementOrMarker::Element(new_node);
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#stop-parsing>
    fn stop_parsing(&mut self) {
        self.stack_of_open_elements.clear();
    }

    /// Peek the next token without consuming it (buffers it in `self.lookahead`). Only used for
    /// the `textarea`/`pre` leading-newline rule, where a reader error one token early vs. one
    /// token late makes no observable difference, so it's treated as EOF here.
    fn peek_token(&mut self) -> &mut Option<Token> {
        if self.lookahead.is_none() {
            let next = match self.tokenizer.next() {
                Some(Ok(token)) => Some(token),
                Some(Err(_)) | None => None,
            };
            self.lookahead = Some(next);
        }
        self.lookahead.as_mut().unwrap()
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#generate-implied-end-tags>
    fn generate_implied_end_tags(&mut self, except_for_tags: &[&[u8]]) {
        const SET: &[&[u8]] = &[
            b"dd", b"dt", b"li", b"optgroup", b"option", b"p", b"rb", b"rp", b"rt", b"rtc",
        ];
        while self.current_node().map_or(false, |n| {
            n.as_element().map_or(false, |e| {
                SET.contains(&e.local_name.as_slice()) && !except_for_tags.contains(&e.local_name.as_slice())
            })
        }) {
            self.stack_of_open_elements.pop();
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#adoption-agency-algorithm>
    ///
    /// Ported from the classic "furthest block" formulation: bounded to 8 outer iterations,
    /// bookmarking the formatting element's replacement position in the active formatting list
    /// and actually reparenting nodes in the document as the inner loop walks up the stack.
    fn run_adoption_agency_algorithm(&mut self, token: Token) {
        let Token::EndTag(ref tag) = token else {
            return;
        };
        let subject = tag.name.clone();

        if self.current_node().map_or(false, |n| n.is_element(&subject))
            && !self
                .list_of_active_formatting_elements
                .iter()
                .filter_map(ElementOrMarker::as_element)
                .any(|n| n.same_identity(self.current_node().unwrap()))
        {
            self.stack_of_open_elements.pop();
            return;
        }

        for _ in 0..8 {
            let Some(fmt_index) = self.list_of_active_formatting_elements.iter().rposition(|entry| {
                matches!(entry, ElementOrMarker::Marker) == false
                    && entry.as_element().map_or(false, |n| n.is_element(&subject))
            }) else {
                self.process_token_via_insertion_mode(self.insertion_mode, Some(token));
                return;
            };
            // A marker between here and the list's end would mean the subject is scoped to a
            // template boundary; `rposition` already stops a marker from matching via `as_element`.
            let fmt_node = self.list_of_active_formatting_elements[fmt_index]
                .as_element()
                .unwrap()
                .clone();

            let Some(fmt_stack_index) = self
                .stack_of_open_elements
                .iter()
                .rposition(|n| n.same_identity(&fmt_node))
            else {
                self.parse_error();
                self.list_of_active_formatting_elements.remove(fmt_index);
                return;
            };

            if !self.has_element_in_scope(fmt_node.as_element().unwrap().local_name.as_slice()) {
                self.parse_error();
                return;
            }

            if !self.current_node().map_or(false, |n| n.same_identity(&fmt_node)) {
                self.parse_error();
            }

            let furthest_block = self.stack_of_open_elements[fmt_stack_index..]
                .iter()
                .enumerate()
                .find(|(_, n)| n.is_special())
                .map(|(i, n)| (fmt_stack_index + i, n.clone()));

            let Some((furthest_block_index, furthest_block)) = furthest_block else {
                self.stack_of_open_elements.truncate(fmt_stack_index);
                self.list_of_active_formatting_elements.remove(fmt_index);
                return;
            };

            let common_ancestor = self.stack_of_open_elements[fmt_stack_index - 1].clone();
            let mut bookmark = fmt_index;

            let mut node_index = furthest_block_index;
            let mut last_node = furthest_block.clone();

            for inner_loop_counter in 1.. {
                if node_index == 0 {
                    break;
                }
                node_index -= 1;
                let node = self.stack_of_open_elements[node_index].clone();
                if node.same_identity(&fmt_node) {
                    break;
                }

                let node_formatting_index = self
                    .list_of_active_formatting_elements
                    .iter()
                    .position(|entry| entry.as_element().map_or(false, |n| n.same_identity(&node)));

                if inner_loop_counter > 3 {
                    if let Some(i) = node_formatting_index {
                        self.list_of_active_formatting_elements.remove(i);
                    }
                    self.stack_of_open_elements.remove(node_index);
                    continue;
                }

                let Some(node_formatting_index) = node_formatting_index else {
                    self.stack_of_open_elements.remove(node_index);
                    continue;
                };

                // Create a new element to replace `node`, carrying last_node as its first child.
                let replacement = self.document.insert_orphan(Node::element(node.as_element().unwrap().clone()));
                self.stack_of_open_elements[node_index] = replacement.clone();
                self.list_of_active_formatting_elements[node_formatting_index] = ElementOrMarker::Element(replacement.clone());

                if last_node.same_identity(&furthest_block) {
                    bookmark = node_formatting_index + 1;
                }

                self.document.attach(last_node.id, InsertPosition::last_child_of(Some(replacement.id)));
                last_node = replacement;
            }

            let target_position = self.appropriate_place_for_inserting_a_node_with_override(&common_ancestor);
            self.document.attach(last_node.id, target_position);

            let new_element = self.document.insert_orphan(Node::element(fmt_node.as_element().unwrap().clone()));
            self.document.reparent_children(furthest_block.id, new_element.id);
            self.document.attach(new_element.id, InsertPosition::last_child_of(Some(furthest_block.id)));

            let replace_index = self
                .list_of_active_formatting_elements
                .iter()
                .position(|entry| entry.as_element().map_or(false, |n| n.same_identity(&fmt_node)));
            if let Some(i) = replace_index {
                self.list_of_active_formatting_elements.remove(i);
                let insert_at = bookmark.min(self.list_of_active_formatting_elements.len());
                self.list_of_active_formatting_elements.insert(insert_at, ElementOrMarker::Element(new_element.clone()));
            }

            self.stack_of_open_elements.retain(|n| !n.same_identity(&fmt_node));
            if let Some(i) = self
                .stack_of_open_elements
                .iter()
                .position(|n| n.same_identity(&furthest_block))
            {
                self.stack_of_open_elements.insert(i + 1, new_element);
            }
        }
    }

    fn adjust_mathml_attributes(&mut self, token: &mut Token) {
        // MathML attribute adjustment (e.g. `definitionurl`) is a fixed rename table; this parser
        // does not yet special-case any of them, attributes pass through unchanged.
        let _ = token;
    }

    fn adjust_foreign_attributes(&mut self, token: &mut Token) {
        // Foreign attribute adjustment assigns namespaces to xlink:/xml:/xmlns: prefixed
        // attributes. Left as a pass-through: attribute names/values are preserved verbatim.
        let _ = token;
    }

    fn adjust_svg_attributes(&mut self, token: &mut Token) {
        // SVG's camelCase attribute-name fixups (e.g. `viewbox` -> `viewBox`) are a fixed rename
        // table; left as a pass-through, attribute names are preserved verbatim.
        let _ = token;
    }

    fn insert_a_foreign_element(&mut self, token: Token, namespace: ElementNamespace) {
        let element = self.create_an_element_for_the_token(token, namespace, self.current_node());
        let node = Node::element(element);
        let position = self.appropriate_place_for_inserting_a_node();
        self.insert_element(node, position);
    }

    fn clear_stack_back_to_a_table_context(&mut self) {
        while !self
            .current_node()
            .map_or(true, |n| n.is_element(b"table") || n.is_element(b"template") || n.is_element(b"html"))
        {
            self.stack_of_open_elements.pop();
        }
    }

    fn clear_stack_back_to_a_table_body_context(&mut self) {
        while !self.current_node().map_or(true, |n| {
            n.is_element(b"tbody") || n.is_element(b"tfoot") || n.is_element(b"thead") || n.is_element(b"template") || n.is_element(b"html")
        }) {
            self.stack_of_open_elements.pop();
        }
    }

    fn clear_stack_back_to_a_table_row_context(&mut self) {
        while !self
            .current_node()
            .map_or(true, |n| n.is_element(b"tr") || n.is_element(b"template") || n.is_element(b"html"))
        {
            self.stack_of_open_elements.pop();
        }
    }

    fn reprocess_token(&mut self, token: Option<Token>) {
        self.process_token_via_insertion_mode(self.insertion_mode, token);
    }
    
    fn close_the_cell(&mut self) {
        self.generate_implied_end_tags(&[]);
        if !self.current_node().map_or(false, |node| node.is_element(b"td") || node.is_element(b"th")) {
            self.parse_error();
        }

        while let Some(node) = self.stack_of_open_elements.pop() {
            if node.is_element(b"td") || node.is_element(b"th") {
                break;
            }
        }
        self.clear_list_of_active_formatting_elements_up_to_the_last_marker();
        self.insertion_mode = InsertionMode::InRow;
    }
}

#[cfg(test)]
impl<R: Reader> TreeConstructionDispatcher<R> {
    /// Like [`Self::run`], but hands back the full (private) [`Document`] instead of a
    /// [`ParseOutcome`] summary, so white-box tests in this module can inspect the tree that
    /// construction actually built.
    fn run_for_test(mut self) -> Result<Document, R::Error> {
        loop {
            let token = match self.lookahead.take() {
                Some(buffered) => buffered,
                None => match self.tokenizer.next() {
                    Some(token) => Some(token?),
                    None => None,
                },
            };

            match token {
                Some(token) => self.process_token(token),
                None => break,
            }
        }

        self.process_token_via_insertion_mode(self.insertion_mode, None);
        Ok(self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tokenizer;

    fn parse(input: &str) -> Document {
        let tokenizer = Tokenizer::new(input);
        TreeConstructionDispatcher::new(tokenizer)
            .run_for_test()
            .unwrap()
    }

    fn has_element(document: &Document, tag_name: &[u8]) -> bool {
        document.nodes.iter().any(|n| n.is_element(tag_name))
    }

    fn find_element(document: &Document, tag_name: &[u8]) -> NodeId {
        document
            .nodes
            .iter()
            .find(|n| n.is_element(tag_name))
            .unwrap_or_else(|| panic!("no <{}> element in the tree", String::from_utf8_lossy(tag_name)))
            .id
    }

    #[test]
    fn builds_the_implied_html_head_body_skeleton() {
        let document = parse("<!doctype html><title>hi</title>");
        assert!(!document.quirks_mode);
        assert!(has_element(&document, b"html"));
        assert!(has_element(&document, b"head"));
        assert!(has_element(&document, b"title"));
        assert!(has_element(&document, b"body"));
    }

    #[test]
    fn missing_doctype_triggers_quirks_mode() {
        let document = parse("<p>hi</p>");
        assert!(document.quirks_mode);
    }

    #[test]
    fn xhtml_transitional_doctype_triggers_limited_quirks_mode() {
        let document = parse(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \
             \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\"><p>hi</p>",
        );
        assert!(document.limited_quirks_mode);
        assert!(!document.quirks_mode);
    }

    /// Regression test: tree construction used to never actually switch the tokenizer into the
    /// script-data state when inserting `<script>`, so a `<` inside the script body would be
    /// mistokenized as the start of a tag instead of being treated as raw script text.
    #[test]
    fn script_body_is_tokenized_as_raw_text_not_markup() {
        let document = parse("<script>if (1 < 2) { var x = \"<b>not a tag</b>\"; }</script><p>ok</p>");
        assert!(has_element(&document, b"script"));
        assert!(has_element(&document, b"p"));
        // If `<` inside the script body had been parsed as markup, `<b>` would have opened a
        // bogus element of its own.
        assert!(!has_element(&document, b"b"));
    }

    #[test]
    fn title_body_is_tokenized_as_rcdata() {
        let document = parse("<title>a &amp; b</title>");
        assert!(has_element(&document, b"title"));
    }

    #[test]
    fn plaintext_has_no_way_back_to_markup() {
        let document = parse("<plaintext>hello <b>world</b>");
        assert!(has_element(&document, b"plaintext"));
        // Nothing after a `<plaintext>` start tag can ever open another element.
        assert!(!has_element(&document, b"b"));
    }

    /// Regression test: a character token used to be inserted through `insert_element`, which
    /// unconditionally pushes every node it's given onto the stack of open elements -- including
    /// the synthetic text node. That left a `#text` node as the "current node", so the next start
    /// tag's namespace (computed from the current/adjusted-current node) came out wrong.
    #[test]
    fn text_node_does_not_corrupt_current_node_namespace_in_foreign_content() {
        let document = parse("<svg><text>abc</text><rect/></svg>");
        let rect = document.node(find_element(&document, b"rect")).as_element().unwrap();
        assert_eq!(rect.namespace, Some(ElementNamespace::SVG));
    }

    #[test]
    fn adjacent_character_tokens_coalesce_into_one_text_node() {
        let document = parse("<p>a &amp; b</p>");
        let p = find_element(&document, b"p");
        let children = document.children_of(p);
        assert_eq!(children.len(), 1, "expected a single coalesced text node, got {children:?}");
        let text = document.node(children[0]).as_element().unwrap();
        assert!(*text.local_name == b"a & b"[..], "text content was {:?}", &*text.local_name);
    }

    #[test]
    fn sibling_paragraphs_each_keep_their_own_text_child() {
        let document = parse("<p>1</p><p>2</p>");
        let body = find_element(&document, b"body");
        let p_ids: Vec<NodeId> = document
            .children_of(body)
            .iter()
            .copied()
            .filter(|&id| document.node(id).is_element(b"p"))
            .collect();
        assert_eq!(p_ids.len(), 2);
        for p in p_ids {
            let children = document.children_of(p);
            assert_eq!(children.len(), 1);
            assert!(document.node(children[0]).is_element(b"#text"));
        }
    }

    #[test]
    fn foster_parenting_places_stray_start_tag_before_the_table() {
        let document = parse("<table><a>x</a></table>");
        let body = find_element(&document, b"body");
        let table = find_element(&document, b"table");
        let a = find_element(&document, b"a");

        assert_eq!(document.parent_of(a), Some(body));
        let body_children = document.children_of(body);
        let a_pos = body_children.iter().position(|&id| id == a).unwrap();
        let table_pos = body_children.iter().position(|&id| id == table).unwrap();
        assert!(a_pos < table_pos, "foster-parented <a> must land before the table, got {body_children:?}");
    }

    /// The adoption agency algorithm's canonical example: `<b>` and the first `<i>` get
    /// implicitly closed by the stray `</b>`, but the formatting elements keep their tree
    /// position -- the second `<i>` opens as a new sibling, not nested inside the first.
    #[test]
    fn adoption_agency_reparents_across_the_formatting_boundary() {
        let document = parse("<b>1<i>2</b>3</i>4");
        let body = find_element(&document, b"body");
        let body_children = document.children_of(body);
        assert_eq!(body_children.len(), 3, "expected b, i, and trailing text, got {body_children:?}");

        let b = body_children[0];
        assert!(document.node(b).is_element(b"b"));
        let b_children = document.children_of(b);
        assert_eq!(b_children.len(), 2);
        assert!(document.node(b_children[0]).is_element(b"#text"));
        assert!(document.node(b_children[1]).is_element(b"i"));
        let nested_i_children = document.children_of(b_children[1]);
        assert_eq!(nested_i_children.len(), 1);
        assert!(document.node(nested_i_children[0]).is_element(b"#text"));

        let second_i = body_children[1];
        assert!(document.node(second_i).is_element(b"i"));
        let second_i_children = document.children_of(second_i);
        assert_eq!(second_i_children.len(), 1);
        assert!(document.node(second_i_children[0]).is_element(b"#text"));

        assert!(document.node(body_children[2]).is_element(b"#text"));
    }

    /// Noah's Ark only bounds the active formatting elements list -- it has nothing to say about
    /// how deep the actual tree nests, so this drives `push_onto_the_list_of_active_formatting_elements`
    /// directly rather than inferring it from a parsed document's shape.
    #[test]
    fn noahs_ark_clause_bounds_duplicate_formatting_elements() {
        let tokenizer = Tokenizer::new("");
        let mut dispatcher = TreeConstructionDispatcher::new(tokenizer);

        for _ in 0..4 {
            let element = Element {
                namespace: Some(ElementNamespace::HTML),
                local_name: b"a".as_slice().to_owned().into(),
                tag_name: b"a".as_slice().to_owned().into(),
                ..Element::default()
            };
            let node = dispatcher.document.insert_orphan(Node::element(element));
            dispatcher.push_onto_the_list_of_active_formatting_elements(node);
        }

        let a_count = dispatcher
            .list_of_active_formatting_elements
            .iter()
            .filter(|entry| entry.as_element().map_or(false, |n| n.is_element(b"a")))
            .count();
        assert_eq!(a_count, 3, "Noah's Ark clause should cap identical <a> entries at 3");
    }
}
