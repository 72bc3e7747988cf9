//! Arithmetic, comparison, boolean, union and filter operators.

use std::collections::{HashSet, VecDeque};

use crate::engine::{
    BoxQuery, Query, QueryContext, ResultKind, Scalar, arg_bool, arg_number, scalar_to_number,
    scalar_to_string,
};
use crate::errors::Error;
use crate::model::{Navigator, parent_hash, position_hash};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
}

/// `+ - * div mod` with XPath number coercion on both sides.
pub(crate) struct NumericQuery<N: Navigator> {
    op: ArithOp,
    left: BoxQuery<N>,
    right: BoxQuery<N>,
}

impl<N: Navigator> NumericQuery<N> {
    pub(crate) fn new(op: ArithOp, left: BoxQuery<N>, right: BoxQuery<N>) -> Self {
        Self { op, left, right }
    }
}

impl<N: Navigator> Query<N> for NumericQuery<N> {
    fn select(&mut self, _ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        Ok(None)
    }

    fn evaluate(&mut self, ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        let a = arg_number(&mut self.left, ctx)?;
        let b = arg_number(&mut self.right, ctx)?;
        let out = match self.op {
            ArithOp::Plus => a + b,
            ArithOp::Minus => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Mod => a % b,
        };
        Ok(Scalar::Number(out))
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Number
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.op,
            self.left.box_clone(),
            self.right.box_clone(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn num_cmp(op: CmpOp, a: f64, b: f64) -> bool {
    // Comparisons against NaN are false, including `!=`.
    if a.is_nan() || b.is_nan() {
        return false;
    }
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

/// One scalar-vs-scalar comparison after node-set unrolling: numbers win,
/// strings compare as strings only for `=` / `!=`.
fn compare_pair(op: CmpOp, a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Number(x), Scalar::Number(y)) => num_cmp(op, *x, *y),
        (Scalar::Number(x), _) => num_cmp(op, *x, scalar_to_number(b)),
        (_, Scalar::Number(y)) => num_cmp(op, scalar_to_number(a), *y),
        _ => match op {
            CmpOp::Eq => scalar_to_string(a) == scalar_to_string(b),
            CmpOp::Ne => scalar_to_string(a) != scalar_to_string(b),
            _ => num_cmp(op, scalar_to_number(a), scalar_to_number(b)),
        },
    }
}

/// `= != < <= > >=` with the XPath 1.0 cartesian rule: when either side is a
/// node-set the comparison is true iff some pair satisfies it.
pub(crate) struct ComparisonQuery<N: Navigator> {
    op: CmpOp,
    left: BoxQuery<N>,
    right: BoxQuery<N>,
}

impl<N: Navigator> ComparisonQuery<N> {
    pub(crate) fn new(op: CmpOp, left: BoxQuery<N>, right: BoxQuery<N>) -> Self {
        Self { op, left, right }
    }

    fn compare(&mut self, ctx: &mut QueryContext<N>) -> Result<bool, Error> {
        let lk = self.left.result_kind();
        let rk = self.right.result_kind();

        // Equality on booleans coerces both sides to boolean first.
        if matches!(self.op, CmpOp::Eq | CmpOp::Ne)
            && (lk == ResultKind::Bool || rk == ResultKind::Bool)
        {
            let a = arg_bool(&mut self.left, ctx)?;
            let b = arg_bool(&mut self.right, ctx)?;
            return Ok(if self.op == CmpOp::Eq { a == b } else { a != b });
        }

        match (lk == ResultKind::Nodes, rk == ResultKind::Nodes) {
            (true, true) => {
                self.left.reset();
                let mut left_values = Vec::new();
                while let Some(n) = self.left.select(ctx)? {
                    left_values.push(Scalar::Text(n.value()));
                }
                self.right.reset();
                while let Some(n) = self.right.select(ctx)? {
                    let rv = Scalar::Text(n.value());
                    if left_values.iter().any(|lv| compare_pair(self.op, lv, &rv)) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (true, false) => {
                let rv = self.right.evaluate(ctx)?;
                self.left.reset();
                while let Some(n) = self.left.select(ctx)? {
                    if compare_pair(self.op, &Scalar::Text(n.value()), &rv) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (false, true) => {
                let lv = self.left.evaluate(ctx)?;
                self.right.reset();
                while let Some(n) = self.right.select(ctx)? {
                    if compare_pair(self.op, &lv, &Scalar::Text(n.value())) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (false, false) => {
                let a = self.left.evaluate(ctx)?;
                let b = self.right.evaluate(ctx)?;
                Ok(compare_pair(self.op, &a, &b))
            }
        }
    }
}

impl<N: Navigator> Query<N> for ComparisonQuery<N> {
    fn select(&mut self, _ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        Ok(None)
    }

    fn evaluate(&mut self, ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Ok(Scalar::Bool(self.compare(ctx)?))
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Bool
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.op,
            self.left.box_clone(),
            self.right.box_clone(),
        ))
    }
}

/// `or` / `and`: short-circuits on the left operand.
pub(crate) struct BooleanQuery<N: Navigator> {
    is_or: bool,
    left: BoxQuery<N>,
    right: BoxQuery<N>,
}

impl<N: Navigator> BooleanQuery<N> {
    pub(crate) fn new(is_or: bool, left: BoxQuery<N>, right: BoxQuery<N>) -> Self {
        Self { is_or, left, right }
    }
}

impl<N: Navigator> Query<N> for BooleanQuery<N> {
    fn select(&mut self, _ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        Ok(None)
    }

    fn evaluate(&mut self, ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        let left = arg_bool(&mut self.left, ctx)?;
        if left == self.is_or {
            return Ok(Scalar::Bool(left));
        }
        Ok(Scalar::Bool(arg_bool(&mut self.right, ctx)?))
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Bool
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.is_or,
            self.left.box_clone(),
            self.right.box_clone(),
        ))
    }
}

/// `|`: set union, deduplicated by position hash, left side first.
pub(crate) struct UnionQuery<N: Navigator> {
    left: BoxQuery<N>,
    right: BoxQuery<N>,
    on_right: bool,
    seen: HashSet<u64>,
}

impl<N: Navigator> UnionQuery<N> {
    pub(crate) fn new(left: BoxQuery<N>, right: BoxQuery<N>) -> Self {
        Self {
            left,
            right,
            on_right: false,
            seen: HashSet::new(),
        }
    }
}

impl<N: Navigator> Query<N> for UnionQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        loop {
            if !self.on_right {
                match self.left.select(ctx)? {
                    Some(n) => {
                        if self.seen.insert(position_hash(&n)) {
                            return Ok(Some(n));
                        }
                    }
                    None => self.on_right = true,
                }
            } else {
                match self.right.select(ctx)? {
                    Some(n) => {
                        if self.seen.insert(position_hash(&n)) {
                            return Ok(Some(n));
                        }
                    }
                    None => return Ok(None),
                }
            }
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.on_right = false;
        self.seen.clear();
    }

    fn test(&self, n: &N) -> bool {
        self.left.test(n) || self.right.test(n)
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(self.left.box_clone(), self.right.box_clone()))
    }
}

/// `input[condition]`.
///
/// For each input node the shared cursor is moved to the candidate and the
/// condition evaluated against it; the node passes when the condition is a
/// true boolean, a non-empty string, a number equal to the node's 1-based
/// position within the input, or a non-empty node-set.
///
/// Positions reset at sibling-group boundaries (detected by parent hash).
/// When the condition mentions `last()`, the current sibling group is
/// buffered first so the set size is known before the condition runs.
pub(crate) struct FilterQuery<N: Navigator> {
    input: BoxQuery<N>,
    condition: BoxQuery<N>,
    needs_size: bool,

    posit: usize,
    last_parent: Option<u64>,
    out_posit: usize,
    out_parent: Option<u64>,

    group: VecDeque<(N, usize)>,
    group_size: usize,
    group_idx: usize,
    lookahead: Option<(N, usize, u64)>,
}

impl<N: Navigator> FilterQuery<N> {
    pub(crate) fn new(input: BoxQuery<N>, condition: BoxQuery<N>, needs_size: bool) -> Self {
        Self {
            input,
            condition,
            needs_size,
            posit: 0,
            last_parent: None,
            out_posit: 0,
            out_parent: None,
            group: VecDeque::new(),
            group_size: 0,
            group_idx: 0,
            lookahead: None,
        }
    }

    fn pull(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<(N, usize, u64)>, Error> {
        let Some(node) = self.input.select(ctx)? else {
            return Ok(None);
        };
        let pos = self.input.position();
        let parent = parent_hash(&node);
        Ok(Some((node, pos, parent)))
    }

    /// Buffer one sibling group (consecutive input nodes under the same
    /// parent) so `last()` can see the set size.
    fn fill_group(&mut self, ctx: &mut QueryContext<N>) -> Result<bool, Error> {
        let (first, first_pos, first_parent) = match self.lookahead.take() {
            Some(entry) => entry,
            None => match self.pull(ctx)? {
                Some(entry) => entry,
                None => return Ok(false),
            },
        };
        self.group.push_back((first, first_pos));
        while let Some((node, pos, parent)) = self.pull(ctx)? {
            if parent == first_parent {
                self.group.push_back((node, pos));
            } else {
                self.lookahead = Some((node, pos, parent));
                break;
            }
        }
        self.group_size = self.group.len();
        self.group_idx = 0;
        Ok(true)
    }

    fn passes(
        &mut self,
        ctx: &mut QueryContext<N>,
        node: &N,
        position: usize,
        size: usize,
    ) -> Result<bool, Error> {
        let saved_nav = ctx.nav.clone();
        if !ctx.nav.move_to(node) {
            ctx.nav = node.clone();
        }
        let saved = (ctx.position, ctx.size);
        ctx.position = position;
        ctx.size = size;
        let pass = match self.condition.result_kind() {
            ResultKind::Bool => {
                matches!(self.condition.evaluate(ctx)?, Scalar::Bool(true))
            }
            ResultKind::Text => !scalar_to_string(&self.condition.evaluate(ctx)?).is_empty(),
            ResultKind::Number => {
                let value = scalar_to_number(&self.condition.evaluate(ctx)?);
                value == position as f64
            }
            ResultKind::Nodes => {
                self.condition.reset();
                self.condition.select(ctx)?.is_some()
            }
        };
        (ctx.position, ctx.size) = saved;
        if !ctx.nav.move_to(&saved_nav) {
            ctx.nav = saved_nav;
        }
        Ok(pass)
    }

    fn note_yield(&mut self, parent: u64) {
        if self.out_parent == Some(parent) {
            self.out_posit += 1;
        } else {
            self.out_parent = Some(parent);
            self.out_posit = 1;
        }
    }
}

impl<N: Navigator> Query<N> for FilterQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        if self.needs_size {
            loop {
                if self.group.is_empty() && !self.fill_group(ctx)? {
                    return Ok(None);
                }
                while let Some((node, pos)) = self.group.pop_front() {
                    self.group_idx += 1;
                    let position = if pos > 0 { pos } else { self.group_idx };
                    if self.passes(ctx, &node, position, self.group_size)? {
                        self.note_yield(parent_hash(&node));
                        return Ok(Some(node));
                    }
                }
            }
        }
        loop {
            let Some((node, pos, parent)) = self.pull(ctx)? else {
                return Ok(None);
            };
            let position = if pos > 0 {
                pos
            } else {
                if self.last_parent == Some(parent) {
                    self.posit += 1;
                } else {
                    self.last_parent = Some(parent);
                    self.posit = 1;
                }
                self.posit
            };
            if self.passes(ctx, &node, position, 0)? {
                self.note_yield(parent);
                return Ok(Some(node));
            }
        }
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.condition.reset();
        self.posit = 0;
        self.last_parent = None;
        self.out_posit = 0;
        self.out_parent = None;
        self.group.clear();
        self.group_size = 0;
        self.group_idx = 0;
        self.lookahead = None;
    }

    fn test(&self, n: &N) -> bool {
        self.input.test(n)
    }

    fn position(&self) -> usize {
        self.out_posit
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.input.box_clone(),
            self.condition.box_clone(),
            self.needs_size,
        ))
    }
}
