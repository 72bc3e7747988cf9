//! The query runtime: one operator per axis, function, operator and filter,
//! each exposing a cursor (`select`) and a value evaluator (`evaluate`).

pub(crate) mod axes;
pub(crate) mod expr;
pub(crate) mod functions;

use crate::errors::Error;
use crate::model::Navigator;

pub(crate) type BoxQuery<N> = Box<dyn Query<N>>;

/// Result kind an operator statically declares. Conversions between kinds
/// happen only when an operator demands a particular one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResultKind {
    Nodes,
    Number,
    Text,
    Bool,
}

/// Scalar value produced by `Query::evaluate`. Node-sets never materialise
/// as scalars; operators that need node values pull them through `select`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
}

/// Evaluation context threaded through the operator tree.
///
/// `nav` is the shared cursor (the "current node" of the public iterator);
/// the filter operator moves it to each candidate before evaluating the
/// predicate. `position`/`size` carry the 1-based position and the size of
/// the node set a predicate is evaluated against; 0 means unknown, in which
/// case `position()`/`last()` fall back to re-scanning the sibling set.
pub(crate) struct QueryContext<N: Navigator> {
    pub(crate) nav: N,
    pub(crate) position: usize,
    pub(crate) size: usize,
}

impl<N: Navigator> QueryContext<N> {
    pub(crate) fn new(nav: N) -> Self {
        Self {
            nav,
            position: 0,
            size: 0,
        }
    }
}

/// A compiled query operator.
///
/// Operators own their inputs exclusively; per-evaluation state lives inside
/// the operator and is cleared by `reset`. `box_clone` yields a pristine
/// copy, which is how a compiled expression stays immutable while each
/// evaluation gets fresh state.
pub(crate) trait Query<N: Navigator>: Send + Sync {
    /// Advance the cursor: return the next matching node, or `None` when the
    /// operator is exhausted.
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error>;

    /// Evaluate to a typed scalar. Only called on operators whose
    /// `result_kind` is not `Nodes`.
    fn evaluate(&mut self, ctx: &mut QueryContext<N>) -> Result<Scalar, Error>;

    /// Clear iteration state so the operator can be driven again.
    fn reset(&mut self);

    /// Node predicate used by context-dependent functions when re-scanning a
    /// sibling set.
    fn test(&self, _n: &N) -> bool {
        true
    }

    /// 1-based position of the most recently selected node within the
    /// current input, or 0 if the operator does not track one.
    fn position(&self) -> usize {
        0
    }

    fn result_kind(&self) -> ResultKind;

    fn box_clone(&self) -> BoxQuery<N>;
}

/// Yields the context node once; with `root` set, the root of its tree.
/// This is the leaf every location path bottoms out at.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContextQuery {
    count: usize,
    pub(crate) root: bool,
}

impl ContextQuery {
    pub(crate) fn new(root: bool) -> Self {
        Self { count: 0, root }
    }
}

impl<N: Navigator> Query<N> for ContextQuery {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        if self.count == 0 {
            self.count = 1;
            let mut nav = ctx.nav.clone();
            if self.root {
                nav.move_to_root();
            }
            return Ok(Some(nav));
        }
        Ok(None)
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.count = 0;
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(self.root))
    }
}

/// Constant operand (string or number literal).
#[derive(Debug, Clone)]
pub(crate) struct ConstantQuery {
    val: Scalar,
}

impl ConstantQuery {
    pub(crate) fn new(val: Scalar) -> Self {
        Self { val }
    }
}

impl<N: Navigator> Query<N> for ConstantQuery {
    fn select(&mut self, _ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        Ok(None)
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Ok(self.val.clone())
    }

    fn reset(&mut self) {}

    fn result_kind(&self) -> ResultKind {
        match self.val {
            Scalar::Number(_) => ResultKind::Number,
            Scalar::Text(_) => ResultKind::Text,
            Scalar::Bool(_) => ResultKind::Bool,
        }
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(self.clone())
    }
}

/// XPath number() conversion for strings: trimmed parse, NaN on failure.
pub(crate) fn number_from_str(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// XPath string() rendering of a number.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

pub(crate) fn scalar_to_string(val: &Scalar) -> String {
    match val {
        Scalar::Number(n) => format_number(*n),
        Scalar::Text(s) => s.clone(),
        Scalar::Bool(b) => b.to_string(),
    }
}

pub(crate) fn scalar_to_number(val: &Scalar) -> f64 {
    match val {
        Scalar::Number(n) => *n,
        Scalar::Text(s) => number_from_str(s),
        Scalar::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
    }
}

pub(crate) fn scalar_to_bool(val: &Scalar) -> bool {
    match val {
        Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
        Scalar::Text(s) => !s.is_empty(),
        Scalar::Bool(b) => *b,
    }
}

/// Argument coercion to string: a node-set argument contributes the string
/// value of its first node (empty set yields the empty string).
pub(crate) fn arg_string<N: Navigator>(
    q: &mut BoxQuery<N>,
    ctx: &mut QueryContext<N>,
) -> Result<String, Error> {
    if q.result_kind() == ResultKind::Nodes {
        q.reset();
        Ok(q.select(ctx)?.map(|n| n.value()).unwrap_or_default())
    } else {
        Ok(scalar_to_string(&q.evaluate(ctx)?))
    }
}

/// Argument coercion to number: node-sets go through
/// `number(string-value(first-node))`; the empty set is NaN.
pub(crate) fn arg_number<N: Navigator>(
    q: &mut BoxQuery<N>,
    ctx: &mut QueryContext<N>,
) -> Result<f64, Error> {
    if q.result_kind() == ResultKind::Nodes {
        q.reset();
        Ok(match q.select(ctx)? {
            Some(n) => number_from_str(&n.value()),
            None => f64::NAN,
        })
    } else {
        Ok(scalar_to_number(&q.evaluate(ctx)?))
    }
}

/// Argument coercion to boolean: a node-set is true iff non-empty.
pub(crate) fn arg_bool<N: Navigator>(
    q: &mut BoxQuery<N>,
    ctx: &mut QueryContext<N>,
) -> Result<bool, Error> {
    if q.result_kind() == ResultKind::Nodes {
        q.reset();
        Ok(q.select(ctx)?.is_some())
    } else {
        Ok(scalar_to_bool(&q.evaluate(ctx)?))
    }
}

/// Strict string coercion: numbers and booleans are type errors, per the
/// string functions that require a string-typed argument.
pub(crate) fn arg_string_strict<N: Navigator>(
    q: &mut BoxQuery<N>,
    ctx: &mut QueryContext<N>,
    func: &str,
) -> Result<String, Error> {
    match q.result_kind() {
        ResultKind::Number | ResultKind::Bool => Err(Error::eval(format!(
            "{func}() argument must resolve to a string"
        ))),
        _ => arg_string(q, ctx),
    }
}
