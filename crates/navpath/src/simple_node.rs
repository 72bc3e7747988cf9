//! Simple in-memory tree with a [`Navigator`] implementation, used by the
//! integration tests, property tests and benches, and handy for quick
//! prototyping against the engine.
//!
//! ```
//! use navpath::simple_node::{doc, elem, text_node};
//! use navpath::{Navigator, compile};
//!
//! // <root><child>Hello</child><child/></root>
//! let tree = doc()
//!     .child(elem("root")
//!         .child(elem("child").child(text_node("Hello")))
//!         .child(elem("child").attr("world", "yes")))
//!     .build();
//!
//! let expr = compile("//child[@world='yes']").unwrap();
//! let mut iter = expr.select(&tree.navigator());
//! assert!(iter.move_next().unwrap());
//! assert_eq!(iter.current().local_name(), "child");
//! ```

use std::sync::{Arc, RwLock, Weak};

use crate::model::{Navigator, NodeKind};

#[derive(Debug)]
struct Inner {
    kind: NodeKind,
    local: String,
    prefix: String,
    ns_uri: String,
    value: String,
    parent: RwLock<Option<Weak<Inner>>>,
    attributes: RwLock<Vec<DocNode>>,
    children: RwLock<Vec<DocNode>>,
}

/// An `Arc`-backed node; cloning shares the node.
#[derive(Debug, Clone)]
pub struct DocNode(Arc<Inner>);

impl PartialEq for DocNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for DocNode {}

impl DocNode {
    fn new(kind: NodeKind, local: &str, prefix: &str, ns_uri: &str, value: &str) -> Self {
        DocNode(Arc::new(Inner {
            kind,
            local: local.to_string(),
            prefix: prefix.to_string(),
            ns_uri: ns_uri.to_string(),
            value: value.to_string(),
            parent: RwLock::new(None),
            attributes: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
        }))
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    pub fn local_name(&self) -> &str {
        &self.0.local
    }

    fn parent(&self) -> Option<DocNode> {
        self.0
            .parent
            .read()
            .expect("tree lock poisoned")
            .as_ref()
            .and_then(Weak::upgrade)
            .map(DocNode)
    }

    fn children(&self) -> Vec<DocNode> {
        self.0.children.read().expect("tree lock poisoned").clone()
    }

    fn attributes(&self) -> Vec<DocNode> {
        self.0.attributes.read().expect("tree lock poisoned").clone()
    }

    fn text_value(&self) -> String {
        match self.0.kind {
            NodeKind::Element | NodeKind::Root => {
                let mut out = String::new();
                fn dfs(node: &DocNode, out: &mut String) {
                    if node.0.kind == NodeKind::Text {
                        out.push_str(&node.0.value);
                    }
                    for child in node.children() {
                        dfs(&child, out);
                    }
                }
                dfs(self, &mut out);
                out
            }
            _ => self.0.value.clone(),
        }
    }

    fn tree_root(&self) -> DocNode {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// Cursor positioned on this node; `move_to_root` goes to the tree root.
    pub fn navigator(&self) -> DocNavigator {
        DocNavigator {
            root: self.tree_root(),
            cursor: Cursor::Node(self.clone()),
        }
    }

    fn sibling_index(&self) -> Option<(DocNode, usize)> {
        let parent = self.parent()?;
        let index = parent.children().iter().position(|c| c == self)?;
        Some((parent, index))
    }
}

/// Builder for elements and documents.
pub struct DocBuilder {
    node: DocNode,
    children: Vec<DocNode>,
    attributes: Vec<DocNode>,
}

pub enum DocNodeOrBuilder {
    Built(DocNode),
    Builder(DocBuilder),
}

impl From<DocNode> for DocNodeOrBuilder {
    fn from(node: DocNode) -> Self {
        DocNodeOrBuilder::Built(node)
    }
}
impl From<DocBuilder> for DocNodeOrBuilder {
    fn from(builder: DocBuilder) -> Self {
        DocNodeOrBuilder::Builder(builder)
    }
}

impl DocBuilder {
    fn new(node: DocNode) -> Self {
        Self {
            node,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<DocNodeOrBuilder>) -> Self {
        let node = match child.into() {
            DocNodeOrBuilder::Built(n) => n,
            DocNodeOrBuilder::Builder(b) => b.build(),
        };
        self.children.push(node);
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push(DocNode::new(NodeKind::Attribute, name, "", "", value));
        self
    }

    pub fn build(self) -> DocNode {
        {
            let mut attrs = self.node.0.attributes.write().expect("tree lock poisoned");
            for attr in &self.attributes {
                *attr.0.parent.write().expect("tree lock poisoned") =
                    Some(Arc::downgrade(&self.node.0));
            }
            attrs.extend(self.attributes);
        }
        {
            let mut children = self.node.0.children.write().expect("tree lock poisoned");
            for child in &self.children {
                *child.0.parent.write().expect("tree lock poisoned") =
                    Some(Arc::downgrade(&self.node.0));
            }
            children.extend(self.children);
        }
        self.node
    }
}

/// Document root builder.
pub fn doc() -> DocBuilder {
    DocBuilder::new(DocNode::new(NodeKind::Root, "", "", "", ""))
}

/// Element builder.
pub fn elem(name: &str) -> DocBuilder {
    DocBuilder::new(DocNode::new(NodeKind::Element, name, "", "", ""))
}

/// Element builder with a namespace prefix and URI.
pub fn elem_ns(prefix: &str, uri: &str, name: &str) -> DocBuilder {
    DocBuilder::new(DocNode::new(NodeKind::Element, name, prefix, uri, ""))
}

/// Text node.
pub fn text_node(value: &str) -> DocNode {
    DocNode::new(NodeKind::Text, "", "", "", value)
}

/// Comment node.
pub fn comment_node(value: &str) -> DocNode {
    DocNode::new(NodeKind::Comment, "", "", "", value)
}

#[derive(Debug, Clone)]
enum Cursor {
    Node(DocNode),
    Attr { owner: DocNode, index: usize },
}

/// Cursor over a [`DocNode`] tree.
#[derive(Debug, Clone)]
pub struct DocNavigator {
    root: DocNode,
    cursor: Cursor,
}

impl DocNavigator {
    /// The node the cursor is on; attribute positions expose the attribute
    /// node itself.
    pub fn node(&self) -> DocNode {
        match &self.cursor {
            Cursor::Node(n) => n.clone(),
            Cursor::Attr { owner, index } => owner.attributes()[*index].clone(),
        }
    }
}

impl Navigator for DocNavigator {
    fn node_type(&self) -> NodeKind {
        self.node().0.kind
    }

    fn local_name(&self) -> String {
        self.node().0.local.clone()
    }

    fn prefix(&self) -> String {
        self.node().0.prefix.clone()
    }

    fn namespace_uri(&self) -> String {
        self.node().0.ns_uri.clone()
    }

    fn value(&self) -> String {
        self.node().text_value()
    }

    fn move_to_root(&mut self) {
        self.cursor = Cursor::Node(self.root.clone());
    }

    fn move_to_parent(&mut self) -> bool {
        match &self.cursor {
            Cursor::Attr { owner, .. } => {
                self.cursor = Cursor::Node(owner.clone());
                true
            }
            Cursor::Node(node) => match node.parent() {
                Some(parent) => {
                    self.cursor = Cursor::Node(parent);
                    true
                }
                None => false,
            },
        }
    }

    fn move_to_child(&mut self) -> bool {
        let Cursor::Node(node) = &self.cursor else {
            return false;
        };
        match node.children().first() {
            Some(first) => {
                self.cursor = Cursor::Node(first.clone());
                true
            }
            None => false,
        }
    }

    fn move_to_first(&mut self) -> bool {
        let Cursor::Node(node) = &self.cursor else {
            return false;
        };
        match node.sibling_index() {
            Some((parent, _)) => {
                let first = parent.children()[0].clone();
                self.cursor = Cursor::Node(first);
                true
            }
            None => false,
        }
    }

    fn move_to_next(&mut self) -> bool {
        let Cursor::Node(node) = &self.cursor else {
            return false;
        };
        let Some((parent, index)) = node.sibling_index() else {
            return false;
        };
        match parent.children().get(index + 1) {
            Some(next) => {
                self.cursor = Cursor::Node(next.clone());
                true
            }
            None => false,
        }
    }

    fn move_to_previous(&mut self) -> bool {
        let Cursor::Node(node) = &self.cursor else {
            return false;
        };
        let Some((parent, index)) = node.sibling_index() else {
            return false;
        };
        if index == 0 {
            return false;
        }
        self.cursor = Cursor::Node(parent.children()[index - 1].clone());
        true
    }

    fn move_to_next_attribute(&mut self) -> bool {
        match &self.cursor {
            Cursor::Node(node) => {
                if node.attributes().is_empty() {
                    return false;
                }
                self.cursor = Cursor::Attr {
                    owner: node.clone(),
                    index: 0,
                };
                true
            }
            Cursor::Attr { owner, index } => {
                if index + 1 < owner.attributes().len() {
                    self.cursor = Cursor::Attr {
                        owner: owner.clone(),
                        index: index + 1,
                    };
                    true
                } else {
                    false
                }
            }
        }
    }

    fn move_to(&mut self, other: &Self) -> bool {
        if self.root != other.root {
            return false;
        }
        self.cursor = other.cursor.clone();
        true
    }
}
