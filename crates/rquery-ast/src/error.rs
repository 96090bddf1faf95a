//! Error kinds raised by the builder surface and (re-exported by `rquery`) by
//! the executor. Modeled on `prqlc-ast`'s `Error`/`Reason` split: a stable,
//! matchable kind plus an optional free-text message for humans.

use std::fmt;

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Misuse of the builder surface: a positive scope depth, an aggregate
    /// named `"key"` colliding with `Groupby`'s default key column, etc.
    InvalidConstruction,
    /// `CurrentContext(d)` referenced with no matching enclosing scope.
    UnboundContext,
    /// An operator applied to evaluated operands it cannot act on.
    TypeMismatch,
    /// `Sum`/`Min`/`Max` of an empty sequence.
    EmptyAggregate,
    /// `One` applied to a sequence with more than one element.
    MultipleResults,
    /// A translator declined an AST; the caller should fall back in-memory.
    UnsupportedByBackend,
    /// A storage backend failed for reasons of its own.
    BackendFailure,
}

impl ErrorKind {
    /// A stable identifier hosts can match on without parsing `Display` text.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidConstruction => "invalid_construction",
            ErrorKind::UnboundContext => "unbound_context",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::EmptyAggregate => "empty_aggregate",
            ErrorKind::MultipleResults => "multiple_results",
            ErrorKind::UnsupportedByBackend => "unsupported_by_backend",
            ErrorKind::BackendFailure => "backend_failure",
        }
    }
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            context: None,
        }
    }

    pub fn with_context<S: ToString>(kind: ErrorKind, context: S) -> Self {
        Error {
            kind,
            context: Some(context.to_string()),
        }
    }

    pub fn invalid_construction<S: ToString>(context: S) -> Self {
        Error::with_context(ErrorKind::InvalidConstruction, context)
    }

    pub fn unbound_context(depth: i64) -> Self {
        Error::with_context(
            ErrorKind::UnboundContext,
            format!("no enclosing scope at depth {depth}"),
        )
    }

    pub fn type_mismatch<S: ToString>(context: S) -> Self {
        Error::with_context(ErrorKind::TypeMismatch, context)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{}: {}", self.kind.code(), context),
            None => write!(f, "{}", self.kind.code()),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;
