//! Axis query operators. Each is a stateful generator: it pulls a node from
//! its input, saves a copy of the cursor at that position and drives the
//! axis traversal on the copy, so the caller's cursor is never disturbed.

use crate::engine::{BoxQuery, Query, QueryContext, ResultKind, Scalar};
use crate::errors::Error;
use crate::model::{Navigator, NodeKind};

/// Node-kind component of an axis predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KindFilter {
    Any,
    Is(NodeKind),
    /// `node()` on the child axis: elements and text.
    ElementOrText,
}

/// Name component of an axis predicate. An empty local name matches every
/// name; when `ns_uri` is present (namespace-aware compilation) matching is
/// by resolved URI, otherwise by raw prefix.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameFilter {
    pub(crate) local: String,
    pub(crate) prefix: String,
    pub(crate) ns_uri: Option<String>,
}

/// Combined type and name predicate qualifying an axis.
#[derive(Debug, Clone)]
pub(crate) struct NodeTest {
    pub(crate) kind: KindFilter,
    pub(crate) name: NameFilter,
}

impl NodeTest {
    pub(crate) fn matches<N: Navigator>(&self, n: &N) -> bool {
        let kind_ok = match self.kind {
            KindFilter::Any => true,
            KindFilter::Is(kind) => n.node_type() == kind,
            KindFilter::ElementOrText => {
                matches!(n.node_type(), NodeKind::Element | NodeKind::Text)
            }
        };
        kind_ok && self.name_matches(n)
    }

    fn name_matches<N: Navigator>(&self, n: &N) -> bool {
        if self.name.local.is_empty() {
            if self.name.prefix.is_empty() && self.name.ns_uri.is_none() {
                return true;
            }
            // prefix wildcard: `foo:*`
            return match &self.name.ns_uri {
                Some(uri) => n.namespace_uri() == *uri,
                None => n.prefix() == self.name.prefix,
            };
        }
        self.name.local == n.local_name()
            && match &self.name.ns_uri {
                Some(uri) => n.namespace_uri() == *uri,
                None => n.prefix() == self.name.prefix,
            }
    }
}

/// Depth-first preorder walk over the subtree under a fixed starting cursor.
/// The level counter keeps the walk from escaping into ancestors.
#[derive(Debug, Clone)]
struct SubtreeWalk<N: Navigator> {
    nav: N,
    level: usize,
    pending_self: bool,
}

impl<N: Navigator> SubtreeWalk<N> {
    fn new(nav: N, include_self: bool) -> Self {
        Self {
            nav,
            level: 0,
            pending_self: include_self,
        }
    }

    fn next(&mut self, test: &NodeTest) -> Option<N> {
        if self.pending_self {
            self.pending_self = false;
            if test.matches(&self.nav) {
                return Some(self.nav.clone());
            }
        }
        loop {
            if self.nav.move_to_child() {
                self.level += 1;
            } else {
                loop {
                    if self.level == 0 {
                        return None;
                    }
                    if self.nav.move_to_next() {
                        break;
                    }
                    self.nav.move_to_parent();
                    self.level -= 1;
                }
            }
            if test.matches(&self.nav) {
                return Some(self.nav.clone());
            }
        }
    }
}

/// `child::*` — first child, then successive next-siblings.
pub(crate) struct ChildQuery<N: Navigator> {
    input: BoxQuery<N>,
    test: NodeTest,
    state: Option<(N, bool)>,
    posit: usize,
}

impl<N: Navigator> ChildQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, test: NodeTest) -> Self {
        Self {
            input,
            test,
            state: None,
            posit: 0,
        }
    }
}

impl<N: Navigator> Query<N> for ChildQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            if self.state.is_none() {
                let Some(node) = self.input.select(ctx)? else {
                    return Ok(None);
                };
                self.posit = 0;
                self.state = Some((node, true));
            }
            let (nav, first) = self.state.as_mut().expect("state just filled");
            loop {
                let moved = if *first {
                    nav.move_to_child()
                } else {
                    nav.move_to_next()
                };
                if !moved {
                    break;
                }
                *first = false;
                if self.test.matches(nav) {
                    self.posit += 1;
                    return Ok(Some(nav.clone()));
                }
            }
            self.state = None;
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.state = None;
        self.posit = 0;
    }

    fn test(&self, n: &N) -> bool {
        self.test.matches(n)
    }

    fn position(&self) -> usize {
        self.posit
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(self.input.box_clone(), self.test.clone()))
    }
}

/// `descendant::*` and `descendant-or-self::*`; also the fused form the
/// builder emits for `//X`.
pub(crate) struct DescendantQuery<N: Navigator> {
    input: BoxQuery<N>,
    test: NodeTest,
    include_self: bool,
    walk: Option<SubtreeWalk<N>>,
    posit: usize,
}

impl<N: Navigator> DescendantQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, test: NodeTest, include_self: bool) -> Self {
        Self {
            input,
            test,
            include_self,
            walk: None,
            posit: 0,
        }
    }
}

impl<N: Navigator> Query<N> for DescendantQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            if self.walk.is_none() {
                let Some(node) = self.input.select(ctx)? else {
                    return Ok(None);
                };
                self.posit = 0;
                self.walk = Some(SubtreeWalk::new(node, self.include_self));
            }
            if let Some(found) = self.walk.as_mut().expect("walk just filled").next(&self.test) {
                self.posit += 1;
                return Ok(Some(found));
            }
            self.walk = None;
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.walk = None;
        self.posit = 0;
    }

    fn test(&self, n: &N) -> bool {
        self.test.matches(n)
    }

    fn position(&self) -> usize {
        self.posit
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.input.box_clone(),
            self.test.clone(),
            self.include_self,
        ))
    }
}

/// `ancestor::*` and `ancestor-or-self::*` — climbs parents until the root.
pub(crate) struct AncestorQuery<N: Navigator> {
    input: BoxQuery<N>,
    test: NodeTest,
    include_self: bool,
    state: Option<(N, bool)>,
}

impl<N: Navigator> AncestorQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, test: NodeTest, include_self: bool) -> Self {
        Self {
            input,
            test,
            include_self,
            state: None,
        }
    }
}

impl<N: Navigator> Query<N> for AncestorQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            if self.state.is_none() {
                let Some(node) = self.input.select(ctx)? else {
                    return Ok(None);
                };
                self.state = Some((node, self.include_self));
            }
            let found = {
                let (nav, pending_self) = self.state.as_mut().expect("state just filled");
                if *pending_self {
                    *pending_self = false;
                    if self.test.matches(nav) {
                        return Ok(Some(nav.clone()));
                    }
                }
                let mut found = None;
                while nav.move_to_parent() {
                    if self.test.matches(nav) {
                        found = Some(nav.clone());
                        break;
                    }
                }
                found
            };
            match found {
                Some(node) => return Ok(Some(node)),
                None => self.state = None,
            }
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.state = None;
    }

    fn test(&self, n: &N) -> bool {
        self.test.matches(n)
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.input.box_clone(),
            self.test.clone(),
            self.include_self,
        ))
    }
}

/// `parent::*` — at most one result per input node.
pub(crate) struct ParentQuery<N: Navigator> {
    input: BoxQuery<N>,
    test: NodeTest,
}

impl<N: Navigator> ParentQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, test: NodeTest) -> Self {
        Self { input, test }
    }
}

impl<N: Navigator> Query<N> for ParentQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            let Some(mut nav) = self.input.select(ctx)? else {
                return Ok(None);
            };
            if nav.move_to_parent() && self.test.matches(&nav) {
                return Ok(Some(nav));
            }
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
    }

    fn test(&self, n: &N) -> bool {
        self.test.matches(n)
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(self.input.box_clone(), self.test.clone()))
    }
}

/// `self::*` — yields the input node iff the predicate matches.
pub(crate) struct SelfQuery<N: Navigator> {
    input: BoxQuery<N>,
    test: NodeTest,
}

impl<N: Navigator> SelfQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, test: NodeTest) -> Self {
        Self { input, test }
    }
}

impl<N: Navigator> Query<N> for SelfQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            let Some(nav) = self.input.select(ctx)? else {
                return Ok(None);
            };
            if self.test.matches(&nav) {
                return Ok(Some(nav));
            }
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
    }

    fn test(&self, n: &N) -> bool {
        self.test.matches(n)
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(self.input.box_clone(), self.test.clone()))
    }
}

/// `attribute::*` — iterates `move_to_next_attribute`.
pub(crate) struct AttributeQuery<N: Navigator> {
    input: BoxQuery<N>,
    test: NodeTest,
    state: Option<N>,
    posit: usize,
}

impl<N: Navigator> AttributeQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, test: NodeTest) -> Self {
        Self {
            input,
            test,
            state: None,
            posit: 0,
        }
    }
}

impl<N: Navigator> Query<N> for AttributeQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            if self.state.is_none() {
                let Some(node) = self.input.select(ctx)? else {
                    return Ok(None);
                };
                self.posit = 0;
                self.state = Some(node);
            }
            let nav = self.state.as_mut().expect("state just filled");
            while nav.move_to_next_attribute() {
                if self.test.matches(nav) {
                    self.posit += 1;
                    return Ok(Some(nav.clone()));
                }
            }
            self.state = None;
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.state = None;
        self.posit = 0;
    }

    fn test(&self, n: &N) -> bool {
        self.test.matches(n)
    }

    fn position(&self) -> usize {
        self.posit
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(self.input.box_clone(), self.test.clone()))
    }
}

/// `following-sibling::*` / `preceding-sibling::*`.
pub(crate) struct SiblingQuery<N: Navigator> {
    input: BoxQuery<N>,
    test: NodeTest,
    forward: bool,
    state: Option<N>,
    posit: usize,
}

impl<N: Navigator> SiblingQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, test: NodeTest, forward: bool) -> Self {
        Self {
            input,
            test,
            forward,
            state: None,
            posit: 0,
        }
    }
}

impl<N: Navigator> Query<N> for SiblingQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            if self.state.is_none() {
                let Some(node) = self.input.select(ctx)? else {
                    return Ok(None);
                };
                self.posit = 0;
                self.state = Some(node);
            }
            let nav = self.state.as_mut().expect("state just filled");
            loop {
                let moved = if self.forward {
                    nav.move_to_next()
                } else {
                    nav.move_to_previous()
                };
                if !moved {
                    break;
                }
                if self.test.matches(nav) {
                    self.posit += 1;
                    return Ok(Some(nav.clone()));
                }
            }
            self.state = None;
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.state = None;
        self.posit = 0;
    }

    fn test(&self, n: &N) -> bool {
        self.test.matches(n)
    }

    fn position(&self) -> usize {
        self.posit
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.input.box_clone(),
            self.test.clone(),
            self.forward,
        ))
    }
}

struct AfterState<N: Navigator> {
    nav: N,
    walk: Option<SubtreeWalk<N>>,
}

/// `following::*` / `preceding::*` — for each input node, advance to the
/// next (previous) sibling subtree, climbing to the parent when the sibling
/// chain runs out, and traverse each subtree depth-first. `preceding`
/// visits subtrees in reverse document order, each traversed forward.
pub(crate) struct AfterQuery<N: Navigator> {
    input: BoxQuery<N>,
    test: NodeTest,
    forward: bool,
    state: Option<AfterState<N>>,
}

impl<N: Navigator> AfterQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, test: NodeTest, forward: bool) -> Self {
        Self {
            input,
            test,
            forward,
            state: None,
        }
    }
}

impl<N: Navigator> Query<N> for AfterQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            if self.state.is_none() {
                let Some(node) = self.input.select(ctx)? else {
                    return Ok(None);
                };
                self.state = Some(AfterState {
                    nav: node,
                    walk: None,
                });
            }
            let state = self.state.as_mut().expect("state just filled");
            'subtrees: loop {
                if state.walk.is_none() {
                    loop {
                        let moved = if self.forward {
                            state.nav.move_to_next()
                        } else {
                            state.nav.move_to_previous()
                        };
                        if moved {
                            break;
                        }
                        if !state.nav.move_to_parent() {
                            break 'subtrees;
                        }
                    }
                    state.walk = Some(SubtreeWalk::new(state.nav.clone(), true));
                }
                if let Some(found) = state.walk.as_mut().expect("walk just filled").next(&self.test)
                {
                    return Ok(Some(found));
                }
                state.walk = None;
            }
            self.state = None;
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.state = None;
    }

    fn test(&self, n: &N) -> bool {
        self.test.matches(n)
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.input.box_clone(),
            self.test.clone(),
            self.forward,
        ))
    }
}

/// The `namespace::` axis: always empty.
#[derive(Debug, Clone, Default)]
pub(crate) struct EmptyQuery;

impl<N: Navigator> Query<N> for EmptyQuery {
    fn select(&mut self, _ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        Ok(None)
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {}

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(EmptyQuery)
    }
}
