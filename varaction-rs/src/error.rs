//! Error taxonomy shared by every operator handler and the evaluator.
//!
//! Each variant maps back to the errno-style return code that callers of the
//! evaluation core expect (see [`Error::code`]).

/// Failure of a single evaluation step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Null/malformed node references or a malformed `IF`/`ELSE` shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operator applied to a type it does not support, or an unmapped operator.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Timer id out of range or unregistered, or an identifier the store
    /// does not know.
    #[error("not found: {0}")]
    NotFound(String),

    /// Propagated unmodified from the external variable store.
    #[error("variable store failure (code {code})")]
    Store { code: i32 },

    /// String buffer growth failed.
    #[error("cannot allocate a {requested}-byte string buffer")]
    Allocation { requested: usize },
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Numeric return code surfaced to the caller of a statement list.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => libc::EINVAL,
            Error::Unsupported(_) => libc::ENOTSUP,
            Error::NotFound(_) => libc::ENOENT,
            Error::Store { code } => *code,
            Error::Allocation { .. } => libc::ENOMEM,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Tests ─────────────────────────────────────────────────────────────────────
