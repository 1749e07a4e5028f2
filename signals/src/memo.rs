//! Memo - Derived values.
//!
//! A memo is a signal the caller never writes: an owned effect computes
//! the value and stores it, so readers of the memo track the memo itself
//! rather than everything the computation read.

use crate::effect::{effect, Effect};
use crate::signal::{signal, Signal};

// =============================================================================
// Memo
// =============================================================================

/// A derived value backed by an owned signal and an owned effect.
/// Cheap to copy.
pub struct Memo<T: 'static> {
    inner: Signal<Option<T>>,
    compute: Effect,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Memo<T> {}

impl<T> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo").field("inner", &self.inner).finish()
    }
}

/// Create a memo from a computation. The computation runs immediately,
/// so the memo is readable as soon as this returns, and re-runs whenever
/// a signal it read changes.
pub fn memo<T: Clone + 'static>(mut f: impl FnMut() -> T + 'static) -> Memo<T> {
    let inner = signal(None::<T>);
    let compute = effect(move || {
        let value = f();
        inner.set(Some(value));
    });
    Memo { inner, compute }
}

impl<T: Clone + 'static> Memo<T> {
    /// Read the memoized value, subscribing the running effect (if any).
    pub fn get(&self) -> T {
        match self.inner.get() {
            Some(value) => value,
            None => {
                // The cell is only empty before the first compute has
                // landed; force it and read again.
                self.compute.trigger();
                self.inner
                    .peek()
                    .expect("memo compute did not produce a value")
            }
        }
    }

    /// Read the memoized value without tracking.
    pub fn peek(&self) -> T {
        match self.inner.peek() {
            Some(value) => value,
            None => {
                self.compute.trigger();
                self.inner
                    .peek()
                    .expect("memo compute did not produce a value")
            }
        }
    }

    /// Dispose the memo: the compute effect and the backing signal.
    pub fn dispose(self) {
        self.compute.dispose();
        self.inner.dispose();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::reset_runtime;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_memo_squares() {
        reset_runtime();

        let src = signal(10);
        let m = memo(move || src.get() * src.get());
        assert_eq!(m.get(), 100);

        src.set(5);
        assert_eq!(m.get(), 25);

        m.dispose();
    }

    #[test]
    fn test_memo_is_trackable() {
        reset_runtime();

        let src = signal(1);
        let doubled = memo(move || src.get() * 2);

        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let fx = crate::effect::effect(move || {
            seen_clone.set(doubled.get());
        });
        assert_eq!(seen.get(), 2);

        src.set(4);
        assert_eq!(seen.get(), 8);

        fx.dispose();
        doubled.dispose();
    }

    #[test]
    fn test_memo_compute_runs_once_per_source_change() {
        reset_runtime();

        let src = signal(1);
        let computes = Rc::new(Cell::new(0));
        let computes_clone = computes.clone();
        let m = memo(move || {
            computes_clone.set(computes_clone.get() + 1);
            src.get() + 1
        });

        assert_eq!(computes.get(), 1);
        let _ = m.get();
        let _ = m.get();
        assert_eq!(computes.get(), 1); // reads alone never recompute

        src.set(2);
        assert_eq!(computes.get(), 2);
        assert_eq!(m.get(), 3);

        m.dispose();
    }
}
