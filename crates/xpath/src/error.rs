use core::fmt;
use std::sync::Arc;

/// Failure kinds surfaced by the engine.
///
/// The set is closed; human-readable text lives in [`Error::message`] and is
/// never used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A handle that is `NULL`, out of range, or from a closed context.
    InvalidNodeHandle,
    /// `resolve` on an index the pool never handed out.
    UnknownSymbol,
    /// Coercion that the value model forbids (e.g. node-set view of a fragment).
    UnsupportedConversion,
    /// Accessor called on a value after `detach()`.
    UseAfterDetach,
    /// Variable reference with no visible binding at evaluation time.
    UnresolvedVariable,
    /// Function not provided by the core library or the extension provider.
    UnknownFunction,
    /// Known function called with an unsupported number of arguments.
    WrongArity,
    /// Build-time variable fixup found no matching declaration.
    Fixup,
    /// `reset`/`clone_iterator` on an iterator marked non-restartable.
    IteratorNotRestartable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidNodeHandle => "InvalidNodeHandle",
            ErrorCode::UnknownSymbol => "UnknownSymbol",
            ErrorCode::UnsupportedConversion => "UnsupportedConversion",
            ErrorCode::UseAfterDetach => "UseAfterDetach",
            ErrorCode::UnresolvedVariable => "UnresolvedVariable",
            ErrorCode::UnknownFunction => "UnknownFunction",
            ErrorCode::WrongArity => "WrongArity",
            ErrorCode::Fixup => "FixupError",
            ErrorCode::IteratorNotRestartable => "IteratorNotRestartable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>, // optional chained cause
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            source: None,
        }
    }

    /// Compose an error with a source cause.
    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }

    /// Broken caller contracts; the current evaluation cannot continue.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::IteratorNotRestartable | ErrorCode::UseAfterDetach
        )
    }

    pub(crate) fn invalid_handle(handle: impl fmt::Display) -> Self {
        Self::from_code(
            ErrorCode::InvalidNodeHandle,
            format!("invalid node handle {handle}"),
        )
    }

    pub(crate) fn use_after_detach(what: &str) -> Self {
        Self::from_code(
            ErrorCode::UseAfterDetach,
            format!("{what} used after detach"),
        )
    }

    pub(crate) fn unsupported(from: &str, to: &str) -> Self {
        Self::from_code(
            ErrorCode::UnsupportedConversion,
            format!("cannot convert {from} to {to}"),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.code)
    }
}
