//! Error taxonomy (§7). Every fallible adapter, virtual-table, and SQL
//! function call returns one of these. `NotFound` reaching a scalar-function
//! context is translated to SQL `NULL` rather than propagated as an error;
//! everything else aborts the statement.

use thiserror::Error;

/// The seven error kinds named by the spec. Not a 1:1 mirror of any single
/// exception hierarchy — chosen so every adapter/vtab/function boundary can
/// report one without inventing ad hoc strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed SQL argument value (bad pattern, bad ea, out-of-range slot,
    /// unknown enum literal).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Address has no function/name/comment/etc. Surfaces as SQL `NULL` in
    /// scalar context, not an error.
    #[error("not found")]
    NotFound,

    /// Operation unavailable (decompiler absent, TVF missing a required
    /// argument).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The statement would force a prohibited full scan.
    #[error("constraint required: {0}")]
    ConstraintRequired(String),

    /// The underlying workspace rejected a mutation.
    #[error("workspace error: {0}")]
    WorkspaceError(String),

    /// Cancelled during a long operation.
    #[error("interrupted")]
    Interrupted,

    /// Programmer error, e.g. a cursor invariant broken.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound)
    }
}

/// Every `VTab`/`VTabCursor`/scalar-function body crosses back into the SQL
/// engine through `rusqlite::Error`, the only channel it exposes; this is
/// the one conversion point (§9 "error propagation across FFI").
impl From<EngineError> for rusqlite::Error {
    fn from(e: EngineError) -> Self {
        rusqlite::Error::ModuleError(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
