use core::fmt;

/// Which stage of the pipeline produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Scanner: unknown token, unclosed string, malformed qualified name.
    Lex,
    /// Parser: grammar violation, depth exceeded, unexpected token.
    Parse,
    /// Builder: unknown axis or function, wrong arity, unresolved prefix.
    Build,
    /// Runtime: strict type mismatch, invalid dynamic regex, cancellation.
    Eval,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Lex => "lex",
            ErrorKind::Parse => "parse",
            ErrorKind::Build => "build",
            ErrorKind::Eval => "eval",
        };
        f.write_str(s)
    }
}

/// Error returned from `compile*` and from evaluation entry points.
///
/// Scanner, parser and builder failures are reported from the compile
/// boundary; evaluation-time failures terminate the current `evaluate` /
/// `move_next` call. Empty node-sets are never errors.
#[derive(Debug, Clone, thiserror::Error)]
#[error("xpath {kind} error: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn lex(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lex, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Build, message)
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Eval, message)
    }
}
