//! The builder: lowers the AST into a tree of query operators.

use std::collections::HashMap;

use crate::engine::axes::{
    AfterQuery, AncestorQuery, AttributeQuery, ChildQuery, DescendantQuery, EmptyQuery, KindFilter,
    NameFilter, NodeTest, ParentQuery, SelfQuery, SiblingQuery,
};
use crate::engine::expr::{ArithOp, BooleanQuery, CmpOp, ComparisonQuery, FilterQuery, NumericQuery, UnionQuery};
use crate::engine::functions::{FuncKind, FunctionQuery, ReverseQuery};
use crate::engine::{BoxQuery, ConstantQuery, ContextQuery, ResultKind, Scalar};
use crate::errors::Error;
use crate::model::{Navigator, NodeKind};
use crate::parser;
use crate::parser::ast::{AxisNode, Node, Op, Operand, Prop};

const MAX_DEPTH: usize = 1024;

/// Parse and lower `expr` into a query operator tree. `ns` carries the
/// prefix bindings of a namespace-aware compilation.
pub(crate) fn build<N: Navigator>(
    expr: &str,
    ns: Option<&HashMap<String, String>>,
) -> Result<BoxQuery<N>, Error> {
    let ast = parser::parse(expr)?;
    let mut builder = Builder {
        depth: 0,
        first_input: None,
        ns,
    };
    builder.process_node(&ast)
}

struct Builder<'a, N: Navigator> {
    depth: usize,
    /// The most recently built axis operator. Context-dependent functions
    /// receive a clone of it so `position()`/`last()` can re-walk the
    /// sibling set with the same node predicate.
    first_input: Option<BoxQuery<N>>,
    ns: Option<&'a HashMap<String, String>>,
}

impl<N: Navigator> Builder<'_, N> {
    fn process_node(&mut self, root: &Node) -> Result<BoxQuery<N>, Error> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::build("the xpath expression is too complex"));
        }
        match root {
            Node::Operand(Operand::Number(n)) => {
                Ok(Box::new(ConstantQuery::new(Scalar::Number(*n))))
            }
            Node::Operand(Operand::Text(s)) => {
                Ok(Box::new(ConstantQuery::new(Scalar::Text(s.clone()))))
            }
            Node::Root { .. } => Ok(Box::new(ContextQuery::new(true))),
            Node::Axis(axis) => {
                let q = self.process_axis(axis)?;
                self.first_input = Some(q.box_clone());
                Ok(q)
            }
            Node::Filter { input, condition } => self.process_filter(input, condition),
            Node::Function { prefix, name, args } => self.process_function(prefix, name, args),
            Node::Operator { op, left, right } => self.process_operator(*op, left, right),
            Node::Variable { prefix, name } => {
                let qualified = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}:{name}")
                };
                Err(Error::build(format!(
                    "variables are not supported: ${qualified}"
                )))
            }
        }
    }

    /// Type and name predicate for an axis step. The default node kind
    /// depends on the axis; the child axis narrows `text()` / `node()` /
    /// `comment()` tests to the corresponding kinds.
    fn axis_test(&self, axis: &AxisNode) -> Result<NodeTest, Error> {
        let kind = match axis.axis.as_str() {
            "attribute" => KindFilter::Is(NodeKind::Attribute),
            "self" | "parent" => KindFilter::Any,
            "child" => match axis.prop {
                Prop::None | Prop::ProcessingInstruction => KindFilter::Is(NodeKind::Element),
                Prop::Text => KindFilter::Is(NodeKind::Text),
                Prop::Node => KindFilter::ElementOrText,
                Prop::Comment => KindFilter::Is(NodeKind::Comment),
            },
            _ => match axis.prop {
                Prop::Comment => KindFilter::Is(NodeKind::Comment),
                Prop::Text | Prop::Node => KindFilter::Any,
                Prop::None | Prop::ProcessingInstruction => KindFilter::Is(NodeKind::Element),
            },
        };
        let ns_uri = match self.ns {
            Some(map) if !axis.prefix.is_empty() => Some(
                map.get(&axis.prefix)
                    .cloned()
                    .ok_or_else(|| Error::build(format!("prefix {} not defined", axis.prefix)))?,
            ),
            _ => None,
        };
        Ok(NodeTest {
            kind,
            name: NameFilter {
                local: axis.local_name.clone(),
                prefix: axis.prefix.clone(),
                ns_uri,
            },
        })
    }

    fn process_axis(&mut self, axis: &AxisNode) -> Result<BoxQuery<N>, Error> {
        let test = self.axis_test(axis)?;

        // Fuse `descendant-or-self::node()/child::X` (the `//` expansion)
        // into a single descendant{self} over the grandparent input.
        if axis.axis == "child" {
            if let Some(input) = axis.input.as_deref() {
                if let Node::Axis(inner) = input {
                    if inner.axis == "descendant-or-self"
                        && inner.local_name.is_empty()
                        && inner.prefix.is_empty()
                        && matches!(inner.prop, Prop::None | Prop::Node)
                    {
                        let grand: BoxQuery<N> = match inner.input.as_deref() {
                            Some(node) => self.process_node(node)?,
                            None => Box::new(ContextQuery::new(false)),
                        };
                        return Ok(Box::new(DescendantQuery::new(grand, test, true)));
                    }
                }
            }
        }

        let input: BoxQuery<N> = match axis.input.as_deref() {
            Some(node) => self.process_node(node)?,
            None => Box::new(ContextQuery::new(false)),
        };

        Ok(match axis.axis.as_str() {
            "ancestor" => Box::new(AncestorQuery::new(input, test, false)),
            "ancestor-or-self" => Box::new(AncestorQuery::new(input, test, true)),
            "attribute" => Box::new(AttributeQuery::new(input, test)),
            "child" => Box::new(ChildQuery::new(input, test)),
            "descendant" => Box::new(DescendantQuery::new(input, test, false)),
            "descendant-or-self" => Box::new(DescendantQuery::new(input, test, true)),
            "following" => Box::new(AfterQuery::new(input, test, true)),
            "following-sibling" => Box::new(SiblingQuery::new(input, test, true)),
            "parent" => Box::new(ParentQuery::new(input, test)),
            "preceding" => Box::new(AfterQuery::new(input, test, false)),
            "preceding-sibling" => Box::new(SiblingQuery::new(input, test, false)),
            "self" => Box::new(SelfQuery::new(input, test)),
            "namespace" => Box::new(EmptyQuery),
            other => return Err(Error::build(format!("unknown axis: {other}"))),
        })
    }

    fn process_filter(&mut self, input: &Node, condition: &Node) -> Result<BoxQuery<N>, Error> {
        let input_query = self.process_node(input)?;
        let condition_query = self.process_node(condition)?;
        Ok(Box::new(FilterQuery::new(
            input_query,
            condition_query,
            mentions_last(condition),
        )))
    }

    fn process_function(
        &mut self,
        prefix: &str,
        name: &str,
        args: &[Box<Node>],
    ) -> Result<BoxQuery<N>, Error> {
        if !prefix.is_empty() {
            return Err(Error::build(format!(
                "unknown function {prefix}:{name}()"
            )));
        }
        if name == "reverse" {
            check_arity(name, args.len(), 1, 1)?;
            let arg = self.process_node(&args[0])?;
            if arg.result_kind() != ResultKind::Nodes {
                return Err(Error::build(
                    "reverse() argument must evaluate to a node-set",
                ));
            }
            return Ok(Box::new(ReverseQuery::new(arg)));
        }

        use FuncKind::*;
        let (func, min, max) = match name {
            "last" => (Last, 0, 0),
            "position" => (Position, 0, 0),
            "count" => (Count, 1, 1),
            "name" => (Name, 0, 1),
            "local-name" => (LocalName, 0, 1),
            "namespace-uri" => (NamespaceUri, 0, 1),
            "sum" => (Sum, 1, 1),
            "string-join" => (StringJoin, 2, 2),
            "true" => (True, 0, 0),
            "false" => (False, 0, 0),
            "not" => (Not, 1, 1),
            "boolean" => (Boolean, 1, 1),
            "lang" => (Lang, 1, 1),
            "number" => (Number, 0, 1),
            "floor" => (Floor, 1, 1),
            "ceiling" => (Ceiling, 1, 1),
            "round" => (Round, 1, 1),
            "string" => (String, 0, 1),
            "concat" => (Concat, 2, usize::MAX),
            "starts-with" => (StartsWith, 2, 2),
            "ends-with" => (EndsWith, 2, 2),
            "contains" => (Contains, 2, 2),
            "substring" => (Substring, 2, 3),
            "substring-before" => (SubstringBefore, 2, 2),
            "substring-after" => (SubstringAfter, 2, 2),
            "string-length" => (StringLength, 0, 1),
            "normalize-space" => (NormalizeSpace, 0, 1),
            "translate" => (Translate, 3, 3),
            "lower-case" => (LowerCase, 1, 1),
            "matches" => (Matches, 2, 2),
            "replace" => (Replace, 3, 3),
            other => {
                return Err(Error::build(format!(
                    "not yet support this function {other}()"
                )));
            }
        };
        check_arity(name, args.len(), min, max)?;

        // A literal regex pattern is compiled (and validated) right here;
        // dynamic patterns fail at evaluation instead.
        if matches!(func, Matches | Replace) {
            if let Node::Operand(Operand::Text(pattern)) = &*args[1] {
                crate::cache::get_regex(pattern)?;
            }
        }

        let mut arg_queries = Vec::with_capacity(args.len());
        for arg in args {
            arg_queries.push(self.process_node(arg)?);
        }
        let input = self
            .first_input
            .as_ref()
            .map(|q| q.box_clone());
        Ok(Box::new(FunctionQuery::new(func, arg_queries, input)))
    }

    fn process_operator(&mut self, op: Op, left: &Node, right: &Node) -> Result<BoxQuery<N>, Error> {
        let left = self.process_node(left)?;
        let right = self.process_node(right)?;
        Ok(match op {
            Op::Plus => Box::new(NumericQuery::new(ArithOp::Plus, left, right)),
            Op::Minus => Box::new(NumericQuery::new(ArithOp::Minus, left, right)),
            Op::Mul => Box::new(NumericQuery::new(ArithOp::Mul, left, right)),
            Op::Div => Box::new(NumericQuery::new(ArithOp::Div, left, right)),
            Op::Mod => Box::new(NumericQuery::new(ArithOp::Mod, left, right)),
            Op::Eq => Box::new(ComparisonQuery::new(CmpOp::Eq, left, right)),
            Op::Ne => Box::new(ComparisonQuery::new(CmpOp::Ne, left, right)),
            Op::Lt => Box::new(ComparisonQuery::new(CmpOp::Lt, left, right)),
            Op::Le => Box::new(ComparisonQuery::new(CmpOp::Le, left, right)),
            Op::Gt => Box::new(ComparisonQuery::new(CmpOp::Gt, left, right)),
            Op::Ge => Box::new(ComparisonQuery::new(CmpOp::Ge, left, right)),
            Op::Or => Box::new(BooleanQuery::new(true, left, right)),
            Op::And => Box::new(BooleanQuery::new(false, left, right)),
            Op::Union => {
                if left.result_kind() != ResultKind::Nodes
                    || right.result_kind() != ResultKind::Nodes
                {
                    return Err(Error::build("union operand must evaluate to a node-set"));
                }
                Box::new(UnionQuery::new(left, right))
            }
        })
    }
}

fn check_arity(name: &str, got: usize, min: usize, max: usize) -> Result<(), Error> {
    if got < min {
        return Err(Error::build(format!(
            "{name}() must have at least {min} parameter(s), got {got}"
        )));
    }
    if got > max {
        return Err(Error::build(format!(
            "{name}() takes at most {max} parameter(s), got {got}"
        )));
    }
    Ok(())
}

/// Whether a predicate expression mentions `last()`, in which case the
/// filter buffers each sibling group up front so the set size is known.
fn mentions_last(node: &Node) -> bool {
    match node {
        Node::Function { name, args, .. } => {
            name == "last" || args.iter().any(|a| mentions_last(a))
        }
        Node::Operator { left, right, .. } => mentions_last(left) || mentions_last(right),
        Node::Filter { input, condition } => mentions_last(input) || mentions_last(condition),
        Node::Axis(axis) => axis.input.as_deref().is_some_and(mentions_last),
        _ => false,
    }
}
