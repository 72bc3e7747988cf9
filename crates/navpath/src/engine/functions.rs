//! The XPath function library. Which function a call resolves to, and with
//! how many arguments, is settled by the builder; evaluation here only does
//! the work.

use crate::cache::get_regex;
use crate::engine::{
    BoxQuery, Query, QueryContext, ResultKind, Scalar, arg_bool, arg_number, arg_string,
    arg_string_strict, number_from_str,
};
use crate::errors::Error;
use crate::model::{Navigator, position_hash};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FuncKind {
    Last,
    Position,
    Count,
    Name,
    LocalName,
    NamespaceUri,
    Sum,
    StringJoin,
    True,
    False,
    Not,
    Boolean,
    Lang,
    Number,
    Floor,
    Ceiling,
    Round,
    String,
    Concat,
    StartsWith,
    EndsWith,
    Contains,
    Substring,
    SubstringBefore,
    SubstringAfter,
    StringLength,
    NormalizeSpace,
    Translate,
    LowerCase,
    Matches,
    Replace,
}

impl FuncKind {
    fn result_kind(self) -> ResultKind {
        use FuncKind::*;
        match self {
            Last | Position | Count | Sum | Number | Floor | Ceiling | Round | StringLength => {
                ResultKind::Number
            }
            True | False | Not | Boolean | Lang => ResultKind::Bool,
            _ => ResultKind::Text,
        }
    }
}

/// A function call wired by the builder. `input` is a clone of the first
/// axis operator of the expression; `position()` and `last()` use its node
/// predicate when they have to re-scan the sibling set of the current node.
pub(crate) struct FunctionQuery<N: Navigator> {
    func: FuncKind,
    args: Vec<BoxQuery<N>>,
    input: Option<BoxQuery<N>>,
}

impl<N: Navigator> FunctionQuery<N> {
    pub(crate) fn new(func: FuncKind, args: Vec<BoxQuery<N>>, input: Option<BoxQuery<N>>) -> Self {
        Self { func, args, input }
    }

    fn node_test(&self, n: &N) -> bool {
        self.input.as_ref().is_none_or(|q| q.test(n))
    }

    /// 1-based position of the context node among its qualifying siblings.
    fn position_value(&self, ctx: &QueryContext<N>) -> f64 {
        if ctx.position > 0 {
            return ctx.position as f64;
        }
        let current = position_hash(&ctx.nav);
        let mut nav = ctx.nav.clone();
        nav.move_to_first();
        let mut count = 0.0;
        loop {
            if self.node_test(&nav) {
                count += 1.0;
                if position_hash(&nav) == current {
                    break;
                }
            }
            if !nav.move_to_next() {
                break;
            }
        }
        count
    }

    /// Size of the context node's qualifying sibling set.
    fn last_value(&self, ctx: &QueryContext<N>) -> f64 {
        if ctx.size > 0 {
            return ctx.size as f64;
        }
        let mut nav = ctx.nav.clone();
        nav.move_to_first();
        let mut count = 0.0;
        loop {
            if self.node_test(&nav) {
                count += 1.0;
            }
            if !nav.move_to_next() {
                break;
            }
        }
        count
    }

    /// First node of the optional node-set argument, defaulting to the
    /// context node.
    fn target_node(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        match self.args.first_mut() {
            None => Ok(Some(ctx.nav.clone())),
            Some(arg) => {
                if arg.result_kind() != ResultKind::Nodes {
                    return Err(Error::eval("argument must be a node-set"));
                }
                arg.reset();
                arg.select(ctx)
            }
        }
    }
}

impl<N: Navigator> Query<N> for FunctionQuery<N> {
    fn select(&mut self, _ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        Ok(None)
    }

    fn evaluate(&mut self, ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        use FuncKind::*;
        let out = match self.func {
            Last => Scalar::Number(self.last_value(ctx)),
            Position => Scalar::Number(self.position_value(ctx)),
            Count => {
                let arg = &mut self.args[0];
                if arg.result_kind() != ResultKind::Nodes {
                    return Err(Error::eval("count() argument must be a node-set"));
                }
                arg.reset();
                let mut count = 0.0;
                while arg.select(ctx)?.is_some() {
                    count += 1.0;
                }
                Scalar::Number(count)
            }
            Name => match self.target_node(ctx)? {
                Some(n) => {
                    let prefix = n.prefix();
                    let local = n.local_name();
                    Scalar::Text(if prefix.is_empty() {
                        local
                    } else {
                        format!("{prefix}:{local}")
                    })
                }
                None => Scalar::Text(std::string::String::new()),
            },
            LocalName => match self.target_node(ctx)? {
                Some(n) => Scalar::Text(n.local_name()),
                None => Scalar::Text(std::string::String::new()),
            },
            NamespaceUri => match self.target_node(ctx)? {
                Some(n) => Scalar::Text(n.namespace_uri()),
                None => Scalar::Text(std::string::String::new()),
            },
            Sum => {
                let arg = &mut self.args[0];
                match arg.result_kind() {
                    ResultKind::Nodes => {
                        arg.reset();
                        let mut total = 0.0;
                        while let Some(n) = arg.select(ctx)? {
                            total += number_from_str(&n.value());
                        }
                        Scalar::Number(total)
                    }
                    ResultKind::Number => Scalar::Number(arg_number(arg, ctx)?),
                    _ => {
                        return Err(Error::eval(
                            "sum() argument must be a node-set or a number",
                        ));
                    }
                }
            }
            StringJoin => {
                let sep = arg_string(&mut self.args[1], ctx)?;
                let arg = &mut self.args[0];
                if arg.result_kind() == ResultKind::Nodes {
                    arg.reset();
                    let mut parts = Vec::new();
                    while let Some(n) = arg.select(ctx)? {
                        parts.push(n.value());
                    }
                    Scalar::Text(parts.join(&sep))
                } else {
                    Scalar::Text(arg_string(arg, ctx)?)
                }
            }
            True => Scalar::Bool(true),
            False => Scalar::Bool(false),
            Not => Scalar::Bool(!arg_bool(&mut self.args[0], ctx)?),
            Boolean => Scalar::Bool(arg_bool(&mut self.args[0], ctx)?),
            Lang => Scalar::Bool(false),
            Number => match self.args.first_mut() {
                None => Scalar::Number(number_from_str(&ctx.nav.value())),
                Some(arg) => Scalar::Number(arg_number(arg, ctx)?),
            },
            Floor => Scalar::Number(arg_number(&mut self.args[0], ctx)?.floor()),
            Ceiling => Scalar::Number(arg_number(&mut self.args[0], ctx)?.ceil()),
            Round => Scalar::Number(xpath_round(arg_number(&mut self.args[0], ctx)?)),
            String => match self.args.first_mut() {
                None => Scalar::Text(ctx.nav.value()),
                Some(arg) => Scalar::Text(arg_string(arg, ctx)?),
            },
            Concat => {
                let mut out = std::string::String::new();
                for arg in &mut self.args {
                    out.push_str(&arg_string(arg, ctx)?);
                }
                Scalar::Text(out)
            }
            StartsWith => {
                let s = arg_string_strict(&mut self.args[0], ctx, "starts-with")?;
                let prefix = arg_string_strict(&mut self.args[1], ctx, "starts-with")?;
                Scalar::Bool(s.starts_with(&prefix))
            }
            EndsWith => {
                let s = arg_string_strict(&mut self.args[0], ctx, "ends-with")?;
                let suffix = arg_string_strict(&mut self.args[1], ctx, "ends-with")?;
                Scalar::Bool(s.ends_with(&suffix))
            }
            Contains => {
                let s = arg_string_strict(&mut self.args[0], ctx, "contains")?;
                let needle = arg_string_strict(&mut self.args[1], ctx, "contains")?;
                Scalar::Bool(s.contains(&needle))
            }
            Substring => {
                let s = arg_string(&mut self.args[0], ctx)?;
                let start = arg_number(&mut self.args[1], ctx)?;
                let length = match self.args.get_mut(2) {
                    Some(arg) => Some(arg_number(arg, ctx)?),
                    None => None,
                };
                Scalar::Text(substring(&s, start, length))
            }
            SubstringBefore => {
                let s = arg_string(&mut self.args[0], ctx)?;
                let sep = arg_string(&mut self.args[1], ctx)?;
                Scalar::Text(match s.find(&sep) {
                    Some(at) => s[..at].to_string(),
                    None => std::string::String::new(),
                })
            }
            SubstringAfter => {
                let s = arg_string(&mut self.args[0], ctx)?;
                let sep = arg_string(&mut self.args[1], ctx)?;
                Scalar::Text(match s.find(&sep) {
                    Some(at) => s[at + sep.len()..].to_string(),
                    None => std::string::String::new(),
                })
            }
            StringLength => {
                let s = match self.args.first_mut() {
                    None => ctx.nav.value(),
                    Some(arg) => arg_string(arg, ctx)?,
                };
                Scalar::Number(s.chars().count() as f64)
            }
            NormalizeSpace => {
                let s = match self.args.first_mut() {
                    None => ctx.nav.value(),
                    Some(arg) => arg_string(arg, ctx)?,
                };
                Scalar::Text(normalize_space(&s))
            }
            Translate => {
                let s = arg_string(&mut self.args[0], ctx)?;
                let from = arg_string(&mut self.args[1], ctx)?;
                let to = arg_string(&mut self.args[2], ctx)?;
                Scalar::Text(translate(&s, &from, &to))
            }
            LowerCase => Scalar::Text(arg_string(&mut self.args[0], ctx)?.to_lowercase()),
            Matches => {
                let s = arg_string_strict(&mut self.args[0], ctx, "matches")?;
                let pattern = arg_string_strict(&mut self.args[1], ctx, "matches")?;
                let regex = get_regex(&pattern).map_err(|err| Error::eval(err.message))?;
                let matched = regex
                    .is_match(&s)
                    .map_err(|err| Error::eval(format!("regex evaluation failed: {err}")))?;
                Scalar::Bool(matched)
            }
            Replace => {
                let s = arg_string_strict(&mut self.args[0], ctx, "replace")?;
                let pattern = arg_string_strict(&mut self.args[1], ctx, "replace")?;
                let replacement = arg_string(&mut self.args[2], ctx)?;
                let regex = get_regex(&pattern).map_err(|err| Error::eval(err.message))?;
                Scalar::Text(regex.replace_all(&s, replacement.as_str()).into_owned())
            }
        };
        Ok(out)
    }

    fn reset(&mut self) {
        for arg in &mut self.args {
            arg.reset();
        }
    }

    fn result_kind(&self) -> ResultKind {
        self.func.result_kind()
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(
            self.func,
            self.args.iter().map(|a| a.box_clone()).collect(),
            self.input.as_ref().map(|q| q.box_clone()),
        ))
    }
}

/// `reverse(node-set)` — the one function producing a node-set.
pub(crate) struct ReverseQuery<N: Navigator> {
    arg: BoxQuery<N>,
    buf: Option<Vec<N>>,
}

impl<N: Navigator> ReverseQuery<N> {
    pub(crate) fn new(arg: BoxQuery<N>) -> Self {
        Self { arg, buf: None }
    }
}

impl<N: Navigator> Query<N> for ReverseQuery<N> {
    fn select(&mut self, ctx: &mut QueryContext<N>) -> Result<Option<N>, Error> {
        if self.buf.is_none() {
            self.arg.reset();
            let mut nodes = Vec::new();
            while let Some(n) = self.arg.select(ctx)? {
                nodes.push(n);
            }
            nodes.reverse();
            self.buf = Some(nodes);
        }
        let buf = self.buf.as_mut().expect("buffer just filled");
        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(buf.remove(0)))
    }

    fn evaluate(&mut self, _ctx: &mut QueryContext<N>) -> Result<Scalar, Error> {
        Err(Error::eval("node-set used where a value is required"))
    }

    fn reset(&mut self) {
        self.arg.reset();
        self.buf = None;
    }

    fn test(&self, n: &N) -> bool {
        self.arg.test(n)
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Nodes
    }

    fn box_clone(&self) -> BoxQuery<N> {
        Box::new(Self::new(self.arg.box_clone()))
    }
}

/// Collapse runs of Unicode whitespace (non-breaking space included) to one
/// ASCII space and strip both ends.
pub(crate) fn normalize_space(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !out.is_empty() {
                pending = true;
            }
        } else {
            if pending {
                out.push(' ');
                pending = false;
            }
            out.push(c);
        }
    }
    out
}

/// XPath round: `.5` rounds towards positive infinity.
pub(crate) fn xpath_round(x: f64) -> f64 {
    if x.is_nan() { x } else { (x + 0.5).floor() }
}

/// XPath substring with 1-based, rounded, clipped character indices.
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let start = xpath_round(start);
    if start.is_nan() {
        return String::new();
    }
    let end = match length {
        None => chars.len() as f64 + 1.0,
        Some(len) => {
            let len = xpath_round(len);
            if len.is_nan() {
                return String::new();
            }
            start + len
        }
    };
    let begin = start.max(1.0);
    let end = end.min(chars.len() as f64 + 1.0);
    if !(end > begin) {
        return String::new();
    }
    chars[begin as usize - 1..end as usize - 1].iter().collect()
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}
