//! Error Boundaries - Effect failure values and the handler stack.
//!
//! Effect callbacks report failure as a value, never by unwinding: an
//! uncaught error must be able to cross a WASM host boundary, and host
//! imports see no exceptions. A failure travels to the topmost boundary
//! handler; with no boundary installed it surfaces from the flush (and
//! from the `try_set` that triggered it).
//!
//! # API
//!
//! - `EffectError` - The failure value an effect callback returns
//! - `push_error_boundary(handler)` - Install a handler, returns a guard
//! - `ErrorBoundaryGuard::release()` - Uninstall (strict LIFO)

use std::fmt;
use std::rc::Rc;

use crate::runtime::with_runtime;

// =============================================================================
// EffectError
// =============================================================================

/// A failure raised by an effect callback.
///
/// Carries a short stable name (what failed) and an optional detail
/// string. The name is what a resource stores in its `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectError {
    name: &'static str,
    detail: Option<String>,
}

impl EffectError {
    /// Create an error from a stable name.
    pub fn new(name: &'static str) -> Self {
        Self { name, detail: None }
    }

    /// Attach a detail string.
    pub fn with_detail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            detail: Some(detail.into()),
        }
    }

    /// The stable error name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The detail string, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.name, detail),
            None => f.write_str(self.name),
        }
    }
}

impl std::error::Error for EffectError {}

// =============================================================================
// Boundary Stack
// =============================================================================

/// Guard for an installed error boundary. Must be released in LIFO order.
#[must_use = "the boundary stays installed until the guard is released"]
pub struct ErrorBoundaryGuard {
    index: usize,
}

/// Install an error-boundary handler. Effect failures raised while the
/// boundary is topmost are passed to `handler` instead of surfacing.
/// Handlers absorb the error and stay installed after firing.
pub fn push_error_boundary(handler: impl Fn(&EffectError) + 'static) -> ErrorBoundaryGuard {
    with_runtime(|rt| {
        let mut handlers = rt.error_handlers.borrow_mut();
        handlers.push(Rc::new(handler));
        ErrorBoundaryGuard {
            index: handlers.len() - 1,
        }
    })
}

impl ErrorBoundaryGuard {
    /// Uninstall the boundary. The guard must be the most recently
    /// installed one still live.
    pub fn release(self) {
        with_runtime(|rt| {
            let mut handlers = rt.error_handlers.borrow_mut();
            assert_eq!(
                handlers.len() - 1,
                self.index,
                "error boundary released out of LIFO order"
            );
            handlers.pop();
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
