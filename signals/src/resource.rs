//! Resource - Fetch-driven async state machines.
//!
//! A resource couples a source signal with a fetcher. Whenever the source
//! changes, the resource's state signal walks `Pending` and lands on
//! `Ready` or `Failed`. Fetchers run synchronously inside the effect run;
//! real asynchrony lives with the embedder, which re-writes the source
//! (or keeps its own tick loop) to drive new fetches.
//!
//! Resources created inside an entered [`SuspenseBoundary`] register with
//! it: the boundary's pending count rises while a fetch is in flight and
//! falls when it settles, whatever the outcome.

use std::cell::Cell;
use std::fmt::Display;
use std::rc::Rc;

use crate::context::{provide_context, use_context, ContextGuard};
use crate::effect::{effect, Effect};
use crate::signal::{signal, Signal};

// =============================================================================
// TYPES
// =============================================================================

/// Lifecycle of a fetched value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState<T> {
    /// No fetch has started.
    Idle,
    /// A fetch is in flight.
    Pending,
    /// The last fetch succeeded.
    Ready(T),
    /// The last fetch failed; carries the error's display form.
    Failed(String),
}

impl<T> ResourceState<T> {
    /// Whether a fetch is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The ready value, if any.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// The ambient suspense accounting a resource attaches to, provided by
/// [`SuspenseBoundary::enter`].
#[derive(Clone, Copy)]
pub struct SuspenseContext {
    pending: Signal<usize>,
}

// =============================================================================
// Resource
// =============================================================================

/// Handle to a fetch-driven state machine.
pub struct Resource<T: 'static> {
    state: Signal<ResourceState<T>>,
    fetch: Effect,
    suspense: Option<SuspenseContext>,
    registered: Rc<Cell<bool>>,
}

/// Create a resource. Reads `source` (tracking it), feeds the value to
/// `fetcher`, and records the outcome in the state signal. The first
/// fetch happens before this returns.
pub fn resource<S, T, E, F>(source: Signal<S>, fetcher: F) -> Resource<T>
where
    S: Clone + 'static,
    T: Clone + 'static,
    E: Display,
    F: Fn(S) -> Result<T, E> + 'static,
{
    let state = signal(ResourceState::Idle);
    let suspense = use_context::<SuspenseContext>().map(|ctx| *ctx);
    let registered = Rc::new(Cell::new(false));

    let in_flight = registered.clone();
    let fetch = effect(move || {
        let input = source.get();
        if let Some(ctx) = suspense {
            if !in_flight.get() {
                ctx.pending.set(ctx.pending.peek() + 1);
                in_flight.set(true);
            }
        }
        state.set(ResourceState::Pending);
        match fetcher(input) {
            Ok(value) => state.set(ResourceState::Ready(value)),
            Err(err) => state.set(ResourceState::Failed(err.to_string())),
        }
        if in_flight.get() {
            if let Some(ctx) = suspense {
                ctx.pending.set(ctx.pending.peek().saturating_sub(1));
            }
            in_flight.set(false);
        }
    });

    Resource {
        state,
        fetch,
        suspense,
        registered,
    }
}

impl<T: Clone + 'static> Resource<T> {
    /// Read the state, subscribing the running effect (if any).
    pub fn state(&self) -> ResourceState<T> {
        self.state.get()
    }

    /// Read the state without tracking.
    pub fn peek_state(&self) -> ResourceState<T> {
        self.state.peek()
    }

    /// The backing state signal, for bindings and memos.
    pub fn state_signal(&self) -> Signal<ResourceState<T>> {
        self.state
    }

    /// Tear down the resource. An in-flight suspense registration is
    /// cancelled before the effect and state signal are dropped.
    pub fn dispose(self) {
        if self.registered.get() {
            if let Some(ctx) = self.suspense {
                ctx.pending.set(ctx.pending.peek().saturating_sub(1));
            }
            self.registered.set(false);
        }
        self.fetch.dispose();
        self.state.dispose();
    }
}

// =============================================================================
// Suspense Boundary
// =============================================================================

/// Counts the fetches in flight under a lexical scope.
pub struct SuspenseBoundary {
    pending: Signal<usize>,
}

impl SuspenseBoundary {
    /// Create a boundary with no registered resources.
    pub fn new() -> Self {
        Self { pending: signal(0) }
    }

    /// Provide this boundary to resources created until the guard is
    /// released.
    pub fn enter(&self) -> ContextGuard {
        provide_context(SuspenseContext {
            pending: self.pending,
        })
    }

    /// The pending-count signal (read side).
    pub fn pending_signal(&self) -> Signal<usize> {
        self.pending
    }

    /// Current pending count, tracking the running effect (if any).
    pub fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Drop the pending-count signal.
    pub fn dispose(self) {
        self.pending.dispose();
    }
}

impl Default for SuspenseBoundary {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
