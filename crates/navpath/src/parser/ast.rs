//! Abstract syntax tree produced by the parser. Nodes are immutable after
//! parse; the builder consumes them by reference.

use smallvec::SmallVec;

/// Binary operators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Union,
}

/// Literal operand of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Text(String),
}

/// Node kind qualifier of a step: `text()`, `node()`, `comment()` or
/// `processing-instruction()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prop {
    #[default]
    None,
    Comment,
    Text,
    ProcessingInstruction,
    Node,
}

/// One step of a location path: `axis::nodetest`.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisNode {
    /// Axis name as written (`child`, `descendant-or-self`, ...). Validated
    /// by the builder, not the parser.
    pub axis: String,
    /// Local name of the node test; empty matches any name.
    pub local_name: String,
    /// Namespace prefix of the node test; empty for unprefixed tests.
    pub prefix: String,
    /// Node kind qualifier.
    pub prop: Prop,
    /// The step's input, absent for a leading relative step.
    pub input: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `/` or `//` at the start of an absolute path.
    Root { slash: String },
    Axis(AxisNode),
    Filter {
        input: Box<Node>,
        condition: Box<Node>,
    },
    Function {
        prefix: String,
        name: String,
        args: SmallVec<[Box<Node>; 2]>,
    },
    Operator {
        op: Op,
        left: Box<Node>,
        right: Box<Node>,
    },
    Operand(Operand),
    Variable {
        prefix: String,
        name: String,
    },
}

impl Node {
    pub(crate) fn axis(
        axis: &str,
        local_name: &str,
        prefix: &str,
        prop: Prop,
        input: Option<Node>,
    ) -> Node {
        Node::Axis(AxisNode {
            axis: axis.to_string(),
            local_name: local_name.to_string(),
            prefix: prefix.to_string(),
            prop,
            input: input.map(Box::new),
        })
    }

    pub(crate) fn operator(op: Op, left: Node, right: Node) -> Node {
        Node::Operator {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub(crate) fn filter(input: Node, condition: Node) -> Node {
        Node::Filter {
            input: Box::new(input),
            condition: Box::new(condition),
        }
    }
}
