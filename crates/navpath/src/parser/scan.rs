//! Scanner: character stream to token stream.

use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Comma,
    Slash,
    At,
    Dot,
    LParens,
    RParens,
    LBracket,
    RBracket,
    Star,
    Plus,
    Minus,
    Eq,
    Lt,
    Gt,
    Bang,
    Dollar,
    Union,
    Ne,
    Le,
    Ge,
    DotDot,
    SlashSlash,
    Name,
    Text,
    Number,
    Axe,
    Eof,
}

/// Cursor over the expression text. One token of lookahead is exposed
/// through the public fields, exactly one `next_item` call ahead of the
/// parser.
pub(crate) struct Scanner {
    text: String,
    chars: Vec<char>,
    pos: usize,
    curr: char,

    pub(crate) kind: TokenKind,
    pub(crate) name: String,
    pub(crate) prefix: String,
    pub(crate) strval: String,
    pub(crate) numval: f64,
    /// Set when a just-scanned name is followed by `(`.
    pub(crate) can_be_func: bool,
}

impl Scanner {
    pub(crate) fn new(text: &str) -> Self {
        let mut scanner = Self {
            text: text.to_string(),
            chars: text.chars().collect(),
            pos: 0,
            curr: '\0',
            kind: TokenKind::Eof,
            name: String::new(),
            prefix: String::new(),
            strval: String::new(),
            numval: 0.0,
            can_be_func: false,
        };
        scanner.next_char();
        scanner
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    fn next_char(&mut self) -> bool {
        if self.pos >= self.chars.len() {
            self.curr = '\0';
            return false;
        }
        self.curr = self.chars[self.pos];
        self.pos += 1;
        true
    }

    pub(crate) fn next_item(&mut self) -> Result<bool, Error> {
        self.skip_space();
        match self.curr {
            '\0' => {
                self.kind = TokenKind::Eof;
                return Ok(false);
            }
            ',' | '@' | '(' | ')' | '|' | '*' | '[' | ']' | '+' | '-' | '=' | '$' => {
                self.kind = single_char_kind(self.curr);
                self.next_char();
            }
            '<' => {
                self.kind = TokenKind::Lt;
                self.next_char();
                if self.curr == '=' {
                    self.kind = TokenKind::Le;
                    self.next_char();
                }
            }
            '>' => {
                self.kind = TokenKind::Gt;
                self.next_char();
                if self.curr == '=' {
                    self.kind = TokenKind::Ge;
                    self.next_char();
                }
            }
            '!' => {
                self.kind = TokenKind::Bang;
                self.next_char();
                if self.curr == '=' {
                    self.kind = TokenKind::Ne;
                    self.next_char();
                }
            }
            '.' => {
                self.kind = TokenKind::Dot;
                self.next_char();
                if self.curr == '.' {
                    self.kind = TokenKind::DotDot;
                    self.next_char();
                } else if self.curr.is_ascii_digit() {
                    self.kind = TokenKind::Number;
                    self.numval = self.scan_fraction()?;
                }
            }
            '/' => {
                self.kind = TokenKind::Slash;
                self.next_char();
                if self.curr == '/' {
                    self.kind = TokenKind::SlashSlash;
                    self.next_char();
                }
            }
            '"' | '\'' => {
                self.kind = TokenKind::Text;
                self.strval = self.scan_string()?;
            }
            c => {
                if c.is_ascii_digit() {
                    self.kind = TokenKind::Number;
                    self.numval = self.scan_number()?;
                } else if is_name_char(c) {
                    self.kind = TokenKind::Name;
                    self.name = self.scan_name();
                    self.prefix.clear();
                    // "foo:bar" is one token, not three, because no spaces
                    // are allowed inside a qualified name; it has to be told
                    // apart from "foo::" and "foo ::".
                    if self.curr == ':' {
                        self.next_char();
                        if self.curr == ':' {
                            self.next_char();
                            self.kind = TokenKind::Axe;
                        } else {
                            self.prefix = std::mem::take(&mut self.name);
                            if self.curr == '*' {
                                self.next_char();
                                self.name = "*".to_string();
                            } else if is_name_char(self.curr) {
                                self.name = self.scan_name();
                            } else {
                                return Err(Error::lex(format!(
                                    "{} has an invalid qualified name",
                                    self.text
                                )));
                            }
                        }
                    } else {
                        self.skip_space();
                        if self.curr == ':' {
                            self.next_char();
                            if self.curr == ':' {
                                self.next_char();
                                self.kind = TokenKind::Axe;
                            } else {
                                return Err(Error::lex(format!(
                                    "{} has an invalid qualified name",
                                    self.text
                                )));
                            }
                        }
                    }
                    self.skip_space();
                    self.can_be_func = self.curr == '(';
                } else {
                    return Err(Error::lex(format!(
                        "{} has an invalid token: {c:?}",
                        self.text
                    )));
                }
            }
        }
        Ok(true)
    }

    fn skip_space(&mut self) {
        while self.curr.is_whitespace() {
            if !self.next_char() {
                break;
            }
        }
    }

    fn scan_fraction(&mut self) -> Result<f64, Error> {
        // self.pos is one past the digit following '.', so the literal
        // started two chars back.
        let start = self.pos - 2;
        let mut len = 1;
        while self.curr.is_ascii_digit() {
            self.next_char();
            len += 1;
        }
        self.parse_number(start, len)
    }

    fn scan_number(&mut self) -> Result<f64, Error> {
        let start = self.pos - 1;
        let mut len = 0;
        while self.curr.is_ascii_digit() {
            self.next_char();
            len += 1;
        }
        if self.curr == '.' {
            self.next_char();
            len += 1;
            while self.curr.is_ascii_digit() {
                self.next_char();
                len += 1;
            }
        }
        self.parse_number(start, len)
    }

    fn parse_number(&self, start: usize, len: usize) -> Result<f64, Error> {
        let literal: String = self.chars[start..start + len].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|err| Error::lex(format!("invalid number {literal:?}: {err}")))
    }

    fn scan_string(&mut self) -> Result<String, Error> {
        let delimiter = self.curr;
        self.next_char();
        let start = self.pos - 1;
        let mut len = 0;
        while self.curr != delimiter {
            if !self.next_char() {
                return Err(Error::lex(format!("{} has an unclosed string", self.text)));
            }
            len += 1;
        }
        self.next_char();
        Ok(self.chars[start..start + len].iter().collect())
    }

    fn scan_name(&mut self) -> String {
        let start = self.pos - 1;
        let mut len = 0;
        while is_name_char(self.curr) {
            len += 1;
            if !self.next_char() {
                break;
            }
        }
        self.chars[start..start + len].iter().collect()
    }
}

/// Name characters: Unicode letters and digits plus `_` and `-`. Accepts
/// non-ASCII identifiers (Cyrillic, Greek, CJK, ...).
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn single_char_kind(c: char) -> TokenKind {
    match c {
        ',' => TokenKind::Comma,
        '@' => TokenKind::At,
        '(' => TokenKind::LParens,
        ')' => TokenKind::RParens,
        '|' => TokenKind::Union,
        '*' => TokenKind::Star,
        '[' => TokenKind::LBracket,
        ']' => TokenKind::RBracket,
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '=' => TokenKind::Eq,
        '$' => TokenKind::Dollar,
        _ => unreachable!("not a single-char token: {c:?}"),
    }
}
