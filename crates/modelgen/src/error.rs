//! Error taxonomy (§7), grounded in the teacher's stage-separated
//! `ReplError`/`ResourceError` enums: plain `Display`/`Error` impls, no
//! `thiserror`/`anyhow` — the core crate's only error-reporting dependency
//! is the standard library, matching the teacher's core library exactly.

use std::fmt;

use crate::token::{Pos, TokenKind};

/// A parse-time failure: an unexpected token, or a lex-level failure
/// (unterminated string, invalid byte) surfaced once the parser reaches it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub filename: String,
    pub pos: Pos,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(pos: Pos, message: impl Into<String>) -> Self {
        ParseError {
            filename: String::new(),
            pos,
            message: message.into(),
        }
    }

    pub(crate) fn unexpected(pos: Pos, found: TokenKind, expected: &str) -> Self {
        ParseError::new(pos, format!("expected {expected}, found {found:?}"))
    }

    /// Attaches the source file this error came from, for the
    /// `filename:line:col: Error: <message>` diagnostic format (§6).
    /// A no-op once a filename is already set, so an inner error keeps
    /// reporting the file it actually occurred in as it bubbles through
    /// an outer module's `import`/`__eval`.
    pub(crate) fn with_filename(mut self, filename: impl Into<String>) -> Self {
        if self.filename.is_empty() {
            self.filename = filename.into();
        }
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: Error: {}", self.filename, self.pos, self.message)
    }
}

impl std::error::Error for ParseError {}

/// One entry of a captured call-stack, used for `traceback()` and for
/// attaching call-site context to a [`RuntimeError`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub caller_name: Option<String>,
    pub pos: Pos,
}

/// A fatal runtime error (§7): name/type/arity/arithmetic/index/I-O errors
/// all funnel through this one type, distinguished by `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub filename: String,
    pub pos: Pos,
    pub message: String,
    pub trace: Vec<TraceEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    Name,
    Type,
    Arity,
    Arithmetic,
    Index,
    Io,
}

impl RuntimeError {
    pub(crate) fn new(kind: RuntimeErrorKind, pos: Pos, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            filename: String::new(),
            pos,
            message: message.into(),
            trace: Vec::new(),
        }
    }

    pub(crate) fn name(pos: Pos, message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Name, pos, message)
    }

    pub(crate) fn type_error(pos: Pos, message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Type, pos, message)
    }

    pub(crate) fn arity(pos: Pos, message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Arity, pos, message)
    }

    pub(crate) fn arithmetic(pos: Pos, message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Arithmetic, pos, message)
    }

    pub(crate) fn index(pos: Pos, message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Index, pos, message)
    }

    pub(crate) fn io(pos: Pos, message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Io, pos, message)
    }

    pub(crate) fn with_trace(mut self, trace: Vec<TraceEntry>) -> Self {
        self.trace = trace;
        self
    }

    /// Attaches the module this error occurred in, for the
    /// `filename:line:col: Error: <message>` diagnostic format (§6). A
    /// no-op once a filename is already set, so the error keeps
    /// pointing at the module it actually happened in as it unwinds
    /// through an outer module's `import`/`__eval` call.
    pub(crate) fn with_filename(mut self, filename: impl Into<String>) -> Self {
        if self.filename.is_empty() {
            self.filename = filename.into();
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: Error: {}", self.filename, self.pos, self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Every failure mode an [`crate::instance::Instance`] entry point can
/// surface, separated by pipeline stage like the teacher's `ReplError`.
#[derive(Debug, Clone, PartialEq)]
pub enum FatalError {
    Parse(ParseError),
    Runtime(RuntimeError),
    Io(String),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::Parse(e) => write!(f, "{e}"),
            FatalError::Runtime(e) => write!(f, "{e}"),
            FatalError::Io(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for FatalError {}

impl From<ParseError> for FatalError {
    fn from(e: ParseError) -> Self {
        FatalError::Parse(e)
    }
}

impl From<RuntimeError> for FatalError {
    fn from(e: RuntimeError) -> Self {
        FatalError::Runtime(e)
    }
}
