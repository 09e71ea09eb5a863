use thiserror::Error;

/// Failure of a single `eval` call.
///
/// Every error is fatal to the evaluation that raised it; nothing is
/// recovered internally. Messages carry the offending token text and,
/// where one exists, its byte index in the source string.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Malformed token in the source string.
    #[error("malformed token `{text}` at index {at}: {reason}")]
    Lex {
        text: String,
        at: usize,
        reason: &'static str,
    },

    /// Unexpected or missing token.
    #[error("parse error at index {at}: {reason}, found `{text}`")]
    Parse {
        text: String,
        at: usize,
        reason: &'static str,
    },

    /// Identifier not present in the host symbol table.
    #[error("undefined symbol `{0}`")]
    UndefinedSymbol(String),

    /// Operation applied to a value whose type cannot support it:
    /// `*` on a non-pointer, `.` on a non-struct, `->` on a non-pointer,
    /// indexing a scalar, or an operator unknown for the operand type.
    #[error("type error: {0}")]
    Type(String),

    /// `.m` / `->m` where the struct has no member `m`.
    #[error("no member `{member}` in `{container}`")]
    MemberNotFound { container: String, member: String },

    /// Integer `/` or `%` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// Assignment attempted while the evaluation was opened read-only.
    #[error("assignment not allowed in this evaluation")]
    AssignmentDenied,

    /// `&` on an immediate, or an assignment target without backing
    /// storage.
    #[error("not an lvalue: {0}")]
    NotAnLvalue(String),

    /// Error surfaced by the host `DebugAccess` implementation.
    #[error(transparent)]
    HostIo(#[from] anyhow::Error),
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub(crate) fn host(err: anyhow::Error) -> Self {
        EvalError::HostIo(err)
    }
}
