//! Recursive-descent parser for the XPath 1.0 grammar.
//!
//! Grammar reference: https://www.w3.org/TR/xpath/

pub mod ast;
pub(crate) mod scan;

use smallvec::SmallVec;

use crate::errors::Error;
use ast::{Node, Op, Operand, Prop};
use scan::{Scanner, TokenKind};

const MAX_DEPTH: usize = 200;

struct Parser {
    scanner: Scanner,
    depth: usize,
}

/// Parse `expr` into an AST.
pub fn parse(expr: &str) -> Result<Node, Error> {
    let mut scanner = Scanner::new(expr);
    scanner.next_item()?;
    let mut parser = Parser { scanner, depth: 0 };
    let node = parser.parse_expression()?;
    if parser.scanner.kind != TokenKind::Eof {
        return Err(Error::parse(format!(
            "{} has an invalid token",
            parser.scanner.text()
        )));
    }
    Ok(node)
}

/// Reports whether the current item is the operator name `op` (e.g. `or`,
/// `div`). Operator names are plain unprefixed names.
fn test_op(scanner: &Scanner, op: &str) -> bool {
    scanner.kind == TokenKind::Name && scanner.prefix.is_empty() && scanner.name == op
}

fn is_node_type(scanner: &Scanner) -> bool {
    matches!(
        scanner.name.as_str(),
        "node" | "text" | "processing-instruction" | "comment"
    ) && scanner.prefix.is_empty()
}

fn is_primary_expr(scanner: &Scanner) -> bool {
    match scanner.kind {
        TokenKind::Text | TokenKind::Number | TokenKind::Dollar | TokenKind::LParens => true,
        TokenKind::Name => scanner.can_be_func && !is_node_type(scanner),
        _ => false,
    }
}

fn is_step(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Dot
            | TokenKind::DotDot
            | TokenKind::At
            | TokenKind::Axe
            | TokenKind::Star
            | TokenKind::Name
    )
}

impl Parser {
    fn next(&mut self) -> Result<(), Error> {
        self.scanner.next_item()?;
        Ok(())
    }

    fn check_item(&self, kind: TokenKind) -> Result<(), Error> {
        if self.scanner.kind != kind {
            return Err(Error::parse(format!(
                "{} has an invalid token",
                self.scanner.text()
            )));
        }
        Ok(())
    }

    fn skip_item(&mut self, kind: TokenKind) -> Result<(), Error> {
        self.check_item(kind)?;
        self.next()
    }

    fn parse_expression(&mut self) -> Result<Node, Error> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::parse(format!(
                "the xpath query is too complex (depth > {MAX_DEPTH})"
            )));
        }
        let node = self.parse_or_expr()?;
        self.depth -= 1;
        Ok(node)
    }

    // OrExpr ::= AndExpr | OrExpr 'or' AndExpr
    fn parse_or_expr(&mut self) -> Result<Node, Error> {
        let mut opnd = self.parse_and_expr()?;
        while test_op(&self.scanner, "or") {
            self.next()?;
            opnd = Node::operator(Op::Or, opnd, self.parse_and_expr()?);
        }
        Ok(opnd)
    }

    // AndExpr ::= EqualityExpr | AndExpr 'and' EqualityExpr
    fn parse_and_expr(&mut self) -> Result<Node, Error> {
        let mut opnd = self.parse_equality_expr()?;
        while test_op(&self.scanner, "and") {
            self.next()?;
            opnd = Node::operator(Op::And, opnd, self.parse_equality_expr()?);
        }
        Ok(opnd)
    }

    // EqualityExpr ::= RelationalExpr | EqualityExpr ('=' | '!=') RelationalExpr
    fn parse_equality_expr(&mut self) -> Result<Node, Error> {
        let mut opnd = self.parse_relational_expr()?;
        loop {
            let op = match self.scanner.kind {
                TokenKind::Eq => Op::Eq,
                TokenKind::Ne => Op::Ne,
                _ => break,
            };
            self.next()?;
            opnd = Node::operator(op, opnd, self.parse_relational_expr()?);
        }
        Ok(opnd)
    }

    // RelationalExpr ::= AdditiveExpr | RelationalExpr ('<' | '>' | '<=' | '>=') AdditiveExpr
    fn parse_relational_expr(&mut self) -> Result<Node, Error> {
        let mut opnd = self.parse_additive_expr()?;
        loop {
            let op = match self.scanner.kind {
                TokenKind::Lt => Op::Lt,
                TokenKind::Gt => Op::Gt,
                TokenKind::Le => Op::Le,
                TokenKind::Ge => Op::Ge,
                _ => break,
            };
            self.next()?;
            opnd = Node::operator(op, opnd, self.parse_additive_expr()?);
        }
        Ok(opnd)
    }

    // AdditiveExpr ::= MultiplicativeExpr | AdditiveExpr ('+' | '-') MultiplicativeExpr
    fn parse_additive_expr(&mut self) -> Result<Node, Error> {
        let mut opnd = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.scanner.kind {
                TokenKind::Plus => Op::Plus,
                TokenKind::Minus => Op::Minus,
                _ => break,
            };
            self.next()?;
            opnd = Node::operator(op, opnd, self.parse_multiplicative_expr()?);
        }
        Ok(opnd)
    }

    // MultiplicativeExpr ::= UnaryExpr | MultiplicativeExpr ('*' | 'div' | 'mod') UnaryExpr
    fn parse_multiplicative_expr(&mut self) -> Result<Node, Error> {
        let mut opnd = self.parse_unary_expr()?;
        loop {
            let op = if self.scanner.kind == TokenKind::Star {
                Op::Mul
            } else if test_op(&self.scanner, "div") {
                Op::Div
            } else if test_op(&self.scanner, "mod") {
                Op::Mod
            } else {
                break;
            };
            self.next()?;
            opnd = Node::operator(op, opnd, self.parse_unary_expr()?);
        }
        Ok(opnd)
    }

    // UnaryExpr ::= UnionExpr | '-' UnaryExpr
    fn parse_unary_expr(&mut self) -> Result<Node, Error> {
        let mut minus = false;
        while self.scanner.kind == TokenKind::Minus {
            self.next()?;
            minus = !minus;
        }
        let opnd = self.parse_union_expr()?;
        if minus {
            Ok(Node::operator(
                Op::Mul,
                opnd,
                Node::Operand(Operand::Number(-1.0)),
            ))
        } else {
            Ok(opnd)
        }
    }

    // UnionExpr ::= PathExpr | UnionExpr '|' PathExpr
    fn parse_union_expr(&mut self) -> Result<Node, Error> {
        let mut opnd = self.parse_path_expr()?;
        while self.scanner.kind == TokenKind::Union {
            self.next()?;
            opnd = Node::operator(Op::Union, opnd, self.parse_path_expr()?);
        }
        Ok(opnd)
    }

    // PathExpr ::= LocationPath | FilterExpr (('/' | '//') RelativeLocationPath)?
    fn parse_path_expr(&mut self) -> Result<Node, Error> {
        if is_primary_expr(&self.scanner) {
            let mut opnd = self.parse_filter_expr()?;
            match self.scanner.kind {
                TokenKind::Slash => {
                    self.next()?;
                    opnd = self.parse_relative_location_path(Some(opnd))?;
                }
                TokenKind::SlashSlash => {
                    self.next()?;
                    let expanded =
                        Node::axis("descendant-or-self", "", "", Prop::None, Some(opnd));
                    opnd = self.parse_relative_location_path(Some(expanded))?;
                }
                _ => {}
            }
            Ok(opnd)
        } else {
            self.parse_location_path()
        }
    }

    // FilterExpr ::= PrimaryExpr Predicate*
    fn parse_filter_expr(&mut self) -> Result<Node, Error> {
        let mut opnd = self.parse_primary_expr()?;
        while self.scanner.kind == TokenKind::LBracket {
            let condition = self.parse_predicate()?;
            opnd = Node::filter(opnd, condition);
        }
        Ok(opnd)
    }

    // Predicate ::= '[' PredicateExpr ']'
    fn parse_predicate(&mut self) -> Result<Node, Error> {
        self.skip_item(TokenKind::LBracket)?;
        let opnd = self.parse_expression()?;
        self.skip_item(TokenKind::RBracket)?;
        Ok(opnd)
    }

    // LocationPath ::= RelativeLocationPath | AbsoluteLocationPath
    fn parse_location_path(&mut self) -> Result<Node, Error> {
        match self.scanner.kind {
            TokenKind::Slash => {
                self.next()?;
                let root = Node::Root {
                    slash: "/".to_string(),
                };
                if is_step(self.scanner.kind) {
                    self.parse_relative_location_path(Some(root))
                } else {
                    Ok(root)
                }
            }
            TokenKind::SlashSlash => {
                self.next()?;
                let root = Node::Root {
                    slash: "//".to_string(),
                };
                let expanded = Node::axis("descendant-or-self", "", "", Prop::None, Some(root));
                self.parse_relative_location_path(Some(expanded))
            }
            _ => self.parse_relative_location_path(None),
        }
    }

    // RelativeLocationPath ::= Step | RelativeLocationPath ('/' | '//') Step
    fn parse_relative_location_path(&mut self, input: Option<Node>) -> Result<Node, Error> {
        let mut opnd = input;
        loop {
            opnd = Some(self.parse_step(opnd)?);
            match self.scanner.kind {
                TokenKind::SlashSlash => {
                    self.next()?;
                    opnd = Some(Node::axis("descendant-or-self", "", "", Prop::None, opnd));
                }
                TokenKind::Slash => {
                    self.next()?;
                }
                _ => break,
            }
        }
        Ok(opnd.expect("relative path always produces a step"))
    }

    // Step ::= AxisSpecifier NodeTest Predicate* | AbbreviatedStep
    fn parse_step(&mut self, input: Option<Node>) -> Result<Node, Error> {
        if self.scanner.kind == TokenKind::Dot || self.scanner.kind == TokenKind::DotDot {
            let axis = if self.scanner.kind == TokenKind::Dot {
                "self"
            } else {
                "parent"
            };
            self.next()?;
            return Ok(Node::axis(axis, "", "", Prop::None, input));
        }
        let axis = match self.scanner.kind {
            TokenKind::At => {
                self.next()?;
                "attribute".to_string()
            }
            TokenKind::Axe => {
                let name = self.scanner.name.clone();
                self.next()?;
                name
            }
            _ => "child".to_string(),
        };
        let mut opnd = self.parse_node_test(input, &axis)?;
        while self.scanner.kind == TokenKind::LBracket {
            let condition = self.parse_predicate()?;
            opnd = Node::filter(opnd, condition);
        }
        Ok(opnd)
    }

    // NodeTest ::= NameTest | NodeType '(' ')' | 'processing-instruction' '(' Literal ')'
    fn parse_node_test(&mut self, input: Option<Node>, axis: &str) -> Result<Node, Error> {
        match self.scanner.kind {
            TokenKind::Name => {
                if self.scanner.can_be_func && is_node_type(&self.scanner) {
                    let prop = match self.scanner.name.as_str() {
                        "comment" => Prop::Comment,
                        "text" => Prop::Text,
                        "processing-instruction" => Prop::ProcessingInstruction,
                        "node" => Prop::Node,
                        _ => Prop::None,
                    };
                    let mut name = String::new();
                    self.next()?;
                    self.skip_item(TokenKind::LParens)?;
                    if prop == Prop::ProcessingInstruction && self.scanner.kind != TokenKind::RParens
                    {
                        self.check_item(TokenKind::Text)?;
                        name = self.scanner.strval.clone();
                        self.next()?;
                    }
                    self.skip_item(TokenKind::RParens)?;
                    Ok(Node::axis(axis, &name, "", prop, input))
                } else {
                    let prefix = self.scanner.prefix.clone();
                    let mut name = self.scanner.name.clone();
                    if name == "*" {
                        name.clear();
                    }
                    self.next()?;
                    Ok(Node::axis(axis, &name, &prefix, Prop::None, input))
                }
            }
            TokenKind::Star => {
                self.next()?;
                Ok(Node::axis(axis, "", "", Prop::None, input))
            }
            _ => Err(Error::parse("expression must evaluate to a node-set")),
        }
    }

    // PrimaryExpr ::= VariableReference | '(' Expr ')' | Literal | Number | FunctionCall
    fn parse_primary_expr(&mut self) -> Result<Node, Error> {
        match self.scanner.kind {
            TokenKind::Text => {
                let opnd = Node::Operand(Operand::Text(self.scanner.strval.clone()));
                self.next()?;
                Ok(opnd)
            }
            TokenKind::Number => {
                let opnd = Node::Operand(Operand::Number(self.scanner.numval));
                self.next()?;
                Ok(opnd)
            }
            TokenKind::Dollar => {
                self.next()?;
                self.check_item(TokenKind::Name)?;
                let opnd = Node::Variable {
                    prefix: self.scanner.prefix.clone(),
                    name: self.scanner.name.clone(),
                };
                self.next()?;
                Ok(opnd)
            }
            TokenKind::LParens => {
                self.next()?;
                let opnd = self.parse_expression()?;
                self.skip_item(TokenKind::RParens)?;
                Ok(opnd)
            }
            TokenKind::Name if self.scanner.can_be_func && !is_node_type(&self.scanner) => {
                self.parse_method()
            }
            _ => Err(Error::parse(format!(
                "{} has an invalid token",
                self.scanner.text()
            ))),
        }
    }

    // FunctionCall ::= FunctionName '(' (Argument (',' Argument)*)? ')'
    fn parse_method(&mut self) -> Result<Node, Error> {
        let name = self.scanner.name.clone();
        let prefix = self.scanner.prefix.clone();
        let mut args: SmallVec<[Box<Node>; 2]> = SmallVec::new();

        self.skip_item(TokenKind::Name)?;
        self.skip_item(TokenKind::LParens)?;
        if self.scanner.kind != TokenKind::RParens {
            loop {
                args.push(Box::new(self.parse_expression()?));
                if self.scanner.kind == TokenKind::RParens {
                    break;
                }
                self.skip_item(TokenKind::Comma)?;
            }
        }
        self.skip_item(TokenKind::RParens)?;
        Ok(Node::Function { prefix, name, args })
    }
}
