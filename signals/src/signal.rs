//! Signal - Reactive value cells.
//!
//! A `Signal<T>` is a `Copy` key into the thread's runtime. Reading it
//! inside an effect subscribes that effect; writing it enqueues every
//! subscriber and, outside a batch, drains the queue immediately.
//!
//! # API
//!
//! - `signal(value)` - Create a signal
//! - `get` / `peek` - Tracked / untracked read
//! - `with` - Tracked read by reference (no clone)
//! - `set` / `try_set` - Write and notify
//! - `update` - Mutate in place and notify
//! - `dispose` - Free the cell and unsubscribe everyone
//!
//! # Example
//!
//! ```ignore
//! use ripple_signals::{signal, effect};
//!
//! let count = signal(0);
//! let stop = effect(move || println!("count is {}", count.get()));
//! count.set(1); // effect re-runs
//! ```

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::EffectError;
use crate::runtime::{with_runtime, SignalId};

// =============================================================================
// Signal
// =============================================================================

/// A reactive value cell. Cheap to copy; the value lives in the runtime.
pub struct Signal<T: 'static> {
    id: SignalId,
    ty: PhantomData<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Signal<T> {}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Signal").field(&self.id).finish()
    }
}

/// Create a signal holding `value`.
pub fn signal<T: 'static>(value: T) -> Signal<T> {
    let id = with_runtime(|rt| rt.create_signal(Rc::new(RefCell::new(value))));
    Signal {
        id,
        ty: PhantomData,
    }
}

impl<T: 'static> Signal<T> {
    /// Read the value, subscribing the running effect (if any).
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Read the value without tracking.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        let cell = with_runtime(|rt| rt.signal_value(self.id))
            .expect("signal read after dispose");
        let value = cell.borrow();
        value
            .downcast_ref::<T>()
            .expect("signal cell holds its declared type")
            .clone()
    }

    /// Read through a borrow, subscribing the running effect (if any).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let cell = with_runtime(|rt| {
            rt.track(self.id);
            rt.signal_value(self.id)
        })
        .expect("signal read after dispose");
        let value = cell.borrow();
        f(value
            .downcast_ref::<T>()
            .expect("signal cell holds its declared type"))
    }

    /// Write a new value and notify subscribers. There is no equality
    /// short-circuit; every write notifies.
    ///
    /// An effect failure no boundary absorbed is logged here. Use
    /// [`try_set`](Self::try_set) to receive it instead.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            log::error!("uncaught effect error: {err}");
        }
    }

    /// Write a new value and notify subscribers, returning the first
    /// effect failure that no error boundary absorbed.
    pub fn try_set(&self, value: T) -> Result<(), EffectError> {
        with_runtime(|rt| {
            let Some(cell) = rt.signal_value(self.id) else {
                // Write to a disposed signal: nothing left to notify.
                return Ok(());
            };
            if let Some(slot) = cell.borrow_mut().downcast_mut::<T>() {
                *slot = value;
            }
            rt.notify(self.id)
        })
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let outcome = with_runtime(|rt| {
            let Some(cell) = rt.signal_value(self.id) else {
                return Ok(());
            };
            if let Some(slot) = cell.borrow_mut().downcast_mut::<T>() {
                f(slot);
            }
            rt.notify(self.id)
        });
        if let Err(err) = outcome {
            log::error!("uncaught effect error: {err}");
        }
    }

    /// Free the cell. Subscribers are unsubscribed; further reads panic
    /// as stale-key lookups, further writes are no-ops.
    pub fn dispose(self) {
        with_runtime(|rt| rt.dispose_signal(self.id));
    }

    /// Whether the signal has been disposed.
    pub fn is_disposed(&self) -> bool {
        with_runtime(|rt| rt.signal_value(self.id).is_none())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::effect;
    use crate::runtime::reset_runtime;
    use std::cell::Cell;

    #[test]
    fn test_get_and_set() {
        reset_runtime();

        let s = signal(41);
        assert_eq!(s.get(), 41);
        s.set(42);
        assert_eq!(s.get(), 42);
    }

    #[test]
    fn test_effect_reruns_on_write() {
        reset_runtime();

        // Reactive counter: accumulate every observed value.
        let s = signal(1);
        let acc = Rc::new(Cell::new(0));
        let acc_clone = acc.clone();
        let fx = effect(move || {
            acc_clone.set(acc_clone.get() + s.get());
        });

        assert_eq!(acc.get(), 1);
        s.set(2);
        s.set(3);
        assert_eq!(acc.get(), 6);

        fx.dispose();
    }

    #[test]
    fn test_peek_does_not_track() {
        reset_runtime();

        let s = signal(0);
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let fx = effect(move || {
            let _ = s.peek();
            runs_clone.set(runs_clone.get() + 1);
        });

        assert_eq!(runs.get(), 1);
        s.set(7);
        assert_eq!(runs.get(), 1);

        fx.dispose();
    }

    #[test]
    fn test_with_reads_by_reference() {
        reset_runtime();

        let s = signal(String::from("hello"));
        let len = s.with(|v| v.len());
        assert_eq!(len, 5);
    }

    #[test]
    fn test_update_notifies() {
        reset_runtime();

        let s = signal(vec![1, 2]);
        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let fx = effect(move || {
            seen_clone.set(s.with(Vec::len));
        });

        assert_eq!(seen.get(), 2);
        s.update(|v| v.push(3));
        assert_eq!(seen.get(), 3);

        fx.dispose();
    }

    #[test]
    fn test_write_after_dispose_is_noop() {
        reset_runtime();

        let s = signal(0);
        s.dispose();
        assert!(s.is_disposed());
        s.set(5); // silently dropped
    }

    #[test]
    fn test_every_write_notifies_even_when_equal() {
        reset_runtime();

        let s = signal(1);
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let fx = effect(move || {
            let _ = s.get();
            runs_clone.set(runs_clone.get() + 1);
        });

        s.set(1);
        s.set(1);
        assert_eq!(runs.get(), 3);

        fx.dispose();
    }
}
