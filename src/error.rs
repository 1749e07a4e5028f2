//! Render Errors - Failure kinds of the template and render pipeline.
//!
//! Pure render and template operations return these directly; nothing in
//! the pipeline unwinds. The display strings are stable within a release
//! but not part of the contract; match on the kind.

use std::collections::TryReserveError;

/// Failure of a template, program, mount or hydrate operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The dynamic value count does not match the program's slot count.
    #[error("dynamic value count does not match placeholder count")]
    MismatchedValues,

    /// Template or program structure violation: unclosed tag, bad close
    /// order, stray placeholder braces, non-empty stacks at the end.
    #[error("invalid markup: {0}")]
    InvalidMarkup(String),

    /// A close op arrived without a matching open.
    #[error("close without matching open")]
    StackUnderflow,

    /// A portal target did not resolve, or hydration ran out of children.
    #[error("node not found: {0}")]
    MissingNode(String),

    /// Hydration found a node of the wrong kind.
    #[error("unexpected node: {0}")]
    UnexpectedNode(String),

    /// Hydration found the right kind of node with the wrong content.
    #[error("hydration mismatch: {0}")]
    HydrationMismatch(String),

    /// The allocator refused a reservation.
    #[error("allocation failed")]
    AllocationFailed,
}

impl From<TryReserveError> for RenderError {
    fn from(_: TryReserveError) -> Self {
        Self::AllocationFailed
    }
}
