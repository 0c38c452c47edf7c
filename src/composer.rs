//! Composer: folds the event stream of one document into a node tree.
//!
//! Nodes live in an arena owned by the [`Document`]; children and alias targets are
//! [`NodeId`]s into it. Mapping children are stored flat, key at even and value at odd
//! positions, so duplicate keys survive until the decoder decides what to do with them.

use std::io::Read;
use std::ops::Index;

use ahash::AHashMap;

use crate::error::{Error, ScanError};
use crate::location::Mark;
use crate::parser::{Event, EventKind, Parser};
use crate::scanner::ScalarStyle;

/// Index of a node inside its [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Mapping,
    Sequence,
    Scalar,
    Alias,
}

/// A composed node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// The expanded tag; empty when the node carries none.
    pub tag: String,
    /// Scalar text, or the anchor name for aliases. Empty for collections.
    pub value: String,
    /// Whether the tag may be inferred from the value (plain scalars, untagged collections).
    pub implicit: bool,
    pub style: Option<ScalarStyle>,
    pub children: Vec<NodeId>,
    /// Target of an alias node.
    pub alias: Option<NodeId>,
    pub mark: Mark,
}

impl Node {
    fn new(kind: NodeKind, mark: Mark) -> Self {
        Self {
            kind,
            tag: String::new(),
            value: String::new(),
            implicit: false,
            style: None,
            children: Vec::new(),
            alias: None,
            mark,
        }
    }
}

/// One composed document: the node arena, the root and the anchor table.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    anchors: AHashMap<String, NodeId>,
}

impl Document {
    fn new(mark: Mark) -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document, mark)],
            anchors: AHashMap::new(),
        }
    }

    /// The document node. Its single child is the content root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The content root, if the document has one.
    pub fn content(&self) -> Option<NodeId> {
        self.nodes[0].children.first().copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Look up an anchor. Redefined anchors resolve to their latest definition.
    pub fn anchor(&self, name: &str) -> Option<NodeId> {
        self.anchors.get(name).copied()
    }

    /// Number of nodes, the document node included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push(&mut self, node: Node, anchor: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        if let Some(anchor) = anchor {
            self.anchors.insert(anchor, id);
        }
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }
}

impl Index<NodeId> for Document {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.node(id)
    }
}

/// Builds [`Document`]s from a [`Parser`].
pub struct Composer<'a> {
    parser: Parser<'a>,
}

impl<'a> Composer<'a> {
    pub fn new(parser: Parser<'a>) -> Self {
        Self { parser }
    }

    pub fn from_slice(input: &'a [u8]) -> Self {
        Self::new(Parser::from_slice(input))
    }

    pub fn from_read<R: Read + 'a>(input: R) -> Self {
        Self::new(Parser::from_read(input))
    }

    fn next(&mut self) -> Result<Event, Error> {
        self.parser.next_event()?.ok_or_else(|| Error::msg("unexpected end of the event stream"))
    }

    /// Compose the next document of the stream; `None` once the stream is exhausted.
    ///
    /// Events after the document end are not pulled, so problems in later documents
    /// go unnoticed.
    pub fn compose_document(&mut self) -> Result<Option<Document>, Error> {
        let start = loop {
            let event = match self.parser.next_event()? {
                Some(event) => event,
                None => return Ok(None),
            };
            match event.kind {
                EventKind::StreamStart(_) | EventKind::DocumentEnd { .. } => continue,
                EventKind::StreamEnd => return Ok(None),
                EventKind::DocumentStart { .. } => break event.start,
                _ => return Err(unexpected(&event)),
            }
        };

        let mut doc = Document::new(start);
        // Collections still waiting for their end event.
        let mut open = vec![doc.root()];
        loop {
            let event = self.next()?;
            let parent = open.last().copied().unwrap_or(doc.root());
            let is_sequence = matches!(event.kind, EventKind::SequenceStart { .. });
            match event.kind {
                EventKind::Scalar {
                    anchor,
                    tag,
                    value,
                    plain_implicit,
                    style,
                    ..
                } => {
                    let mut node = Node::new(NodeKind::Scalar, event.start);
                    node.tag = tag.unwrap_or_default();
                    node.value = value;
                    node.implicit = plain_implicit;
                    node.style = Some(style);
                    let id = doc.push(node, anchor);
                    doc.attach(parent, id);
                }
                EventKind::Alias { anchor } => {
                    let target = doc.anchor(&anchor).ok_or_else(|| {
                        Error::msg(format!("unknown anchor '{anchor}' referenced")).at(event.start)
                    })?;
                    let mut node = Node::new(NodeKind::Alias, event.start);
                    node.value = anchor;
                    node.alias = Some(target);
                    let id = doc.push(node, None);
                    doc.attach(parent, id);
                }
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    ..
                }
                | EventKind::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    ..
                } => {
                    let kind = if is_sequence {
                        NodeKind::Sequence
                    } else {
                        NodeKind::Mapping
                    };
                    let mut node = Node::new(kind, event.start);
                    node.tag = tag.unwrap_or_default();
                    node.implicit = implicit;
                    // Registered before the children so a nested alias can refer back to it.
                    let id = doc.push(node, anchor);
                    doc.attach(parent, id);
                    open.push(id);
                }
                EventKind::SequenceEnd | EventKind::MappingEnd => {
                    open.pop();
                }
                EventKind::DocumentEnd { .. } => break,
                EventKind::StreamStart(_)
                | EventKind::StreamEnd
                | EventKind::DocumentStart { .. } => return Err(unexpected(&event)),
            }
        }
        debug_print!("composed {} nodes", doc.len());
        Ok(Some(doc))
    }
}

fn unexpected(event: &Event) -> Error {
    ScanError::new(event.start, format!("unexpected event {:?}", event.kind)).into()
}
