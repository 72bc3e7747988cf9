//! XPath 1.0 engine over a cursor-style navigator capability.
//!
//! An expression is compiled once — scanner, recursive-descent parser, then
//! a builder that lowers the AST into a tree of lazy query operators — and
//! evaluated any number of times against any tree the host exposes through
//! the [`Navigator`] trait. Results are one of four kinds: a node-set
//! (a lazy [`NodeIterator`] with document-order dedup), a number, a string
//! or a boolean.
//!
//! ```
//! use navpath::simple_node::{doc, elem, text_node};
//! use navpath::{Value, compile};
//!
//! let tree = doc()
//!     .child(elem("book").child(elem("title").child(text_node("Learning XML"))))
//!     .build();
//! let expr = compile("count(//title)").unwrap();
//! match expr.evaluate(&tree.navigator()).unwrap() {
//!     Value::Number(n) => assert_eq!(n, 1.0),
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```

mod cache;
mod compiler;
mod engine;
mod errors;
mod model;
pub mod parser;
pub mod simple_node;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use engine::{BoxQuery, QueryContext, ResultKind, Scalar};

pub use cache::set_regex_cache;
pub use errors::{Error, ErrorKind};
pub use model::{Navigator, NodeKind, position_hash};

/// Compile `expr` into a reusable expression.
///
/// All scanner, parser and builder failures surface here; a compiled
/// expression is immutable and can be evaluated concurrently as long as each
/// evaluation gets its own navigator.
pub fn compile<N: Navigator>(expr: &str) -> Result<Expression<N>, Error> {
    let query = compiler::build::<N>(expr, None)?;
    tracing::debug!(expr, "compiled xpath expression");
    Ok(Expression {
        source: expr.to_string(),
        query,
    })
}

/// Compile with namespace bindings: name tests carrying a prefix match on
/// the resolved URI. A prefix missing from `ns` fails compilation.
pub fn compile_with_namespaces<N: Navigator>(
    expr: &str,
    ns: &HashMap<String, String>,
) -> Result<Expression<N>, Error> {
    let query = compiler::build::<N>(expr, Some(ns))?;
    tracing::debug!(expr, namespaces = ns.len(), "compiled xpath expression");
    Ok(Expression {
        source: expr.to_string(),
        query,
    })
}

/// Result of evaluating an expression.
pub enum Value<N: Navigator> {
    /// Lazy node-set; nodes come in first-seen order, never twice.
    Nodes(NodeIterator<N>),
    Number(f64),
    Text(String),
    Bool(bool),
}

impl<N: Navigator> fmt::Debug for Value<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nodes(_) => f.write_str("Nodes(..)"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
        }
    }
}

/// A compiled XPath expression.
pub struct Expression<N: Navigator> {
    source: String,
    query: BoxQuery<N>,
}

impl<N: Navigator> Expression<N> {
    /// Evaluate against the tree under `nav`. Node-set producers return a
    /// fresh iterator; everything else evaluates to the scalar directly.
    pub fn evaluate(&self, nav: &N) -> Result<Value<N>, Error> {
        let mut query = self.query.box_clone();
        if query.result_kind() == ResultKind::Nodes {
            return Ok(Value::Nodes(NodeIterator::new(query, nav.clone())));
        }
        let mut ctx = QueryContext::new(nav.clone());
        Ok(match query.evaluate(&mut ctx)? {
            Scalar::Number(n) => Value::Number(n),
            Scalar::Text(s) => Value::Text(s),
            Scalar::Bool(b) => Value::Bool(b),
        })
    }

    /// Node-set entry point: an iterator over the matching nodes. For an
    /// expression that does not produce a node-set the iterator is empty.
    pub fn select(&self, nav: &N) -> NodeIterator<N> {
        NodeIterator::new(self.query.box_clone(), nav.clone())
    }

    /// The expression text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl<N: Navigator> Clone for Expression<N> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            query: self.query.box_clone(),
        }
    }
}

impl<N: Navigator> fmt::Debug for Expression<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Iterator over the nodes selected by an expression.
///
/// `move_next` advances to the next distinct node (identity taken from
/// [`position_hash`]) and `current` exposes the cursor at that node. The
/// cursor stays owned by the iterator; advancing repositions it.
pub struct NodeIterator<N: Navigator> {
    query: BoxQuery<N>,
    ctx: QueryContext<N>,
    seen: HashSet<u64>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<N: Navigator> NodeIterator<N> {
    fn new(query: BoxQuery<N>, nav: N) -> Self {
        Self {
            query,
            ctx: QueryContext::new(nav),
            seen: HashSet::new(),
            cancel: None,
        }
    }

    /// Advance to the next matching node. Returns `false` when the set is
    /// exhausted.
    pub fn move_next(&mut self) -> Result<bool, Error> {
        loop {
            if let Some(token) = &self.cancel {
                if token.load(Ordering::Relaxed) {
                    return Err(Error::eval("evaluation cancelled"));
                }
            }
            let Some(node) = self.query.select(&mut self.ctx)? else {
                return Ok(false);
            };
            if !self.seen.insert(model::position_hash(&node)) {
                continue;
            }
            if !self.ctx.nav.move_to(&node) {
                self.ctx.nav = node;
            }
            return Ok(true);
        }
    }

    /// Cursor at the most recently yielded node.
    pub fn current(&self) -> &N {
        &self.ctx.nav
    }

    /// Attach a cancellation token, checked on every `move_next`; a tripped
    /// token ends the iteration with an evaluation error.
    pub fn with_cancellation(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Drain the remaining nodes into a vector of cursors.
    pub fn collect_nodes(&mut self) -> Result<Vec<N>, Error> {
        let mut nodes = Vec::new();
        while self.move_next()? {
            nodes.push(self.current().clone());
        }
        Ok(nodes)
    }
}
