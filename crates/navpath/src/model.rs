//! The navigator capability: the engine's only view onto a host tree.
//!
//! A [`Navigator`] is a stateful cursor. It sits on one node of a tree and
//! moves to neighbouring positions; `Clone` produces an independent cursor at
//! the same position, which is how axis operators explore without disturbing
//! the caller. The engine never sees the concrete tree — DOM, XML, HTML or
//! JSON alike — only this cursor.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Kind of the node a navigator is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The root of the document or node tree.
    Root,
    /// An element, such as `<book>`.
    Element,
    /// An attribute, such as `category="web"`.
    Attribute,
    /// Text content.
    Text,
    /// A comment, such as `<!-- fin -->`.
    Comment,
}

/// Cursor over a host tree.
///
/// Every move operation mutates the cursor in place and reports whether the
/// move happened; a failed move leaves the position unchanged. Cursors must
/// be cheap to clone.
pub trait Navigator: Clone + Send + Sync + 'static {
    /// Kind of the current node.
    fn node_type(&self) -> NodeKind;

    /// Local part of the node name, without prefix. Empty for text, comment
    /// and root nodes.
    fn local_name(&self) -> String;

    /// Namespace prefix of the current node; may be empty.
    fn prefix(&self) -> String;

    /// Resolved namespace URI of the current node; may be empty.
    fn namespace_uri(&self) -> String;

    /// String value per XPath rules: for text, attribute and comment nodes
    /// the text itself; for element and root nodes the concatenation of all
    /// descendant text nodes.
    fn value(&self) -> String;

    /// Move to the root node. Unconditional.
    fn move_to_root(&mut self);

    /// Move to the parent node; `false` at the root.
    fn move_to_parent(&mut self) -> bool;

    /// Move to the first child; `false` if there are no children.
    fn move_to_child(&mut self) -> bool;

    /// Move to the first sibling of the current node.
    fn move_to_first(&mut self) -> bool;

    /// Move to the next sibling.
    fn move_to_next(&mut self) -> bool;

    /// Move to the previous sibling.
    fn move_to_previous(&mut self) -> bool;

    /// Advance over the attributes of the current element; call in a loop
    /// until it returns `false`.
    fn move_to_next_attribute(&mut self) -> bool;

    /// Move to the same position as `other`; `false` if `other` belongs to a
    /// different tree.
    fn move_to(&mut self, other: &Self) -> bool;
}

/// Stable identity hash of a navigator position.
///
/// Built from `(kind, local-name, parent-hash, sibling-index,
/// attribute-index)`. Two cursors on the same node of the same tree hash
/// equal; this is the identity the public iterator and the union operator
/// dedup on. Cost is proportional to the node's depth and left-sibling count.
pub fn position_hash<N: Navigator>(nav: &N) -> u64 {
    let kind = nav.node_type();
    let mut hasher = DefaultHasher::new();
    (kind as u8).hash(&mut hasher);
    nav.local_name().hash(&mut hasher);

    let mut parent = nav.clone();
    if parent.move_to_parent() {
        position_hash(&parent).hash(&mut hasher);
    } else {
        0u64.hash(&mut hasher);
    }

    if kind == NodeKind::Attribute {
        0usize.hash(&mut hasher);
        attribute_index(nav, &parent).hash(&mut hasher);
    } else {
        sibling_index(nav).hash(&mut hasher);
        0usize.hash(&mut hasher);
    }
    hasher.finish()
}

/// Position hash of the parent node, or 0 at the root. Used to detect
/// sibling-group boundaries in positional predicates.
pub(crate) fn parent_hash<N: Navigator>(nav: &N) -> u64 {
    let mut parent = nav.clone();
    if parent.move_to_parent() {
        position_hash(&parent)
    } else {
        0
    }
}

fn sibling_index<N: Navigator>(nav: &N) -> usize {
    let mut cursor = nav.clone();
    let mut index = 0usize;
    while cursor.move_to_previous() {
        index += 1;
    }
    index
}

fn attribute_index<N: Navigator>(nav: &N, parent: &N) -> usize {
    let name = nav.local_name();
    let mut cursor = parent.clone();
    let mut index = 0usize;
    while cursor.move_to_next_attribute() {
        if cursor.local_name() == name {
            break;
        }
        index += 1;
    }
    index
}
