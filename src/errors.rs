//! Per-stage error types and the aggregate `DriftError`, grounded on the
//! teacher crate's `ReplError` pattern (same `From`-impl-per-stage shape)
//! and its `strum`-derived exception kind enum.

use std::fmt;

use strum::{Display as StrumDisplay, EnumString, IntoStaticStr};

/// The literal taxonomy tags from the error-handling design: one variant
/// per distinct failure a user can observe, regardless of which pipeline
/// stage raised it. `Display` on this type IS the wire tag used in the
/// `<Exception { Kind=... }>` printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, IntoStaticStr)]
pub enum ExcKind {
    UnknownSymbol,
    CharacterExp,
    StringExp,
    Unexpected,
    InvalidSyntax,
    IncrementOp,
    TypeError,
    DivisionZero,
    CannotPublic,
    Enumeration,
    CallInherit,
    RuntimeError,
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub kind: ExcKind,
    pub message: String,
    pub line: i64,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Exception {{ Kind={} Message=\"{}\" Line={} }}>", self.kind, self.message, self.line)
    }
}
impl std::error::Error for LexError {}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ExcKind,
    pub message: String,
    pub line: i64,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Exception {{ Kind={} Message=\"{}\" Line={} }}>", self.kind, self.message, self.line)
    }
}
impl std::error::Error for ParseError {}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ExcKind,
    pub message: String,
    pub line: i64,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Exception {{ Kind={} Message=\"{}\" Line={} }}>", self.kind, self.message, self.line)
    }
}
impl std::error::Error for CompileError {}

/// A runtime exception carried by the VM. Distinct from `CompileError`
/// because it crosses call-frame boundaries and is the only error kind
/// the REPL expects to see after a statement begins executing.
#[derive(Debug, Clone)]
pub struct Exception {
    pub kind: ExcKind,
    pub message: String,
    pub line: i64,
}

impl Exception {
    pub fn new(kind: ExcKind, message: impl Into<String>, line: i64) -> Self {
        Self { kind, message: message.into(), line }
    }

    pub fn runtime(message: impl Into<String>, line: i64) -> Self {
        Self::new(ExcKind::RuntimeError, message, line)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Exception {{ Kind={} Message=\"{}\" Line={} }}>", self.kind, self.message, self.line)
    }
}
impl std::error::Error for Exception {}

#[derive(Debug, Clone)]
pub struct ResourceError {
    pub message: String,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Exception {{ Kind=RuntimeError Message=\"{}\" Line=0 }}>", self.message)
    }
}
impl std::error::Error for ResourceError {}

/// Unifies every stage's error type, mirroring the teacher's `ReplError`
/// aggregate: one variant per pipeline stage, each with a `From` impl so
/// `?` works across stage boundaries.
#[derive(Debug, Clone)]
pub enum DriftError {
    Lex(LexError),
    Parse(ParseError),
    Compile(CompileError),
    Runtime(Exception),
    Resource(ResourceError),
}

impl fmt::Display for DriftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Compile(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
            Self::Resource(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DriftError {}

impl From<LexError> for DriftError {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}
impl From<ParseError> for DriftError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}
impl From<CompileError> for DriftError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}
impl From<Exception> for DriftError {
    fn from(e: Exception) -> Self {
        Self::Runtime(e)
    }
}
impl From<ResourceError> for DriftError {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}
