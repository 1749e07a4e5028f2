//! Effect - Reactive computations.
//!
//! An effect runs its callback once at creation, recording every signal
//! it reads. Writes to any of those signals enqueue it; the next flush
//! re-runs it, which re-records its dependencies from scratch. That makes
//! conditional reads work: a branch not taken this run is not a
//! dependency until it is taken again.
//!
//! # API
//!
//! - `effect(f)` - Create from an infallible callback
//! - `try_effect(f)` - Create from a callback that can fail
//! - `Effect::trigger` - Force a run outside the scheduler
//! - `Effect::dispose` - Unsubscribe, dequeue and drop the callback

use crate::error::EffectError;
use crate::runtime::{with_runtime, EffectId};

// =============================================================================
// Effect
// =============================================================================

/// Handle to a reactive computation. Cheap to copy.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Effect {
    id: EffectId,
}

/// Create an effect. The callback runs immediately to capture its first
/// set of dependencies.
pub fn effect(mut f: impl FnMut() + 'static) -> Effect {
    try_effect(move || {
        f();
        Ok(())
    })
}

/// Create an effect whose callback can fail. Failures go to the topmost
/// error boundary; a failure of the initial run that no boundary absorbs
/// is logged.
pub fn try_effect(f: impl FnMut() -> Result<(), EffectError> + 'static) -> Effect {
    let id = with_runtime(|rt| rt.create_effect(Box::new(f)));
    if let Err(err) = with_runtime(|rt| rt.run_effect(id)) {
        log::error!("uncaught effect error: {err}");
    }
    Effect { id }
}

impl Effect {
    /// Run the effect now, outside the scheduler. A trigger that lands
    /// while the effect is already running schedules exactly one extra
    /// run instead of re-entering the callback.
    pub fn trigger(&self) {
        if let Err(err) = with_runtime(|rt| rt.run_effect(self.id)) {
            log::error!("uncaught effect error: {err}");
        }
    }

    /// Dispose the effect: unsubscribe from every signal, purge it from
    /// the scheduler queue and drop the callback. Queued triggers that
    /// have not run yet are skipped.
    pub fn dispose(self) {
        with_runtime(|rt| rt.dispose_effect(self.id));
    }

    /// Whether the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        with_runtime(|rt| !rt.effect_alive(self.id))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;
    use crate::runtime::reset_runtime;
    use crate::scheduler::{batch, begin_batch, end_batch};
    use crate::signal::signal;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_dependencies_refresh_each_run() {
        reset_runtime();

        let gate = signal(true);
        let a = signal(1);
        let b = signal(10);
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();

        let fx = effect(move || {
            runs_clone.set(runs_clone.get() + 1);
            if gate.get() {
                let _ = a.get();
            } else {
                let _ = b.get();
            }
        });
        assert_eq!(runs.get(), 1);

        // `a` is a dependency while the gate is open.
        a.set(2);
        assert_eq!(runs.get(), 2);

        // Flip the gate: `b` becomes the dependency, `a` stops being one.
        gate.set(false);
        assert_eq!(runs.get(), 3);
        a.set(3);
        assert_eq!(runs.get(), 3);
        b.set(11);
        assert_eq!(runs.get(), 4);

        fx.dispose();
    }

    #[test]
    fn test_write_enqueues_subscriber_once() {
        reset_runtime();

        let a = signal(0);
        let b = signal(0);
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let fx = effect(move || {
            let _ = a.get();
            let _ = b.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        // Two writes inside one batch, one run.
        batch(|| {
            a.set(1);
            b.set(1);
        });
        assert_eq!(runs.get(), 2);

        fx.dispose();
    }

    #[test]
    fn test_self_write_runs_exactly_once_more() {
        reset_runtime();

        let s = signal(0);
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let fx = effect(move || {
            runs_clone.set(runs_clone.get() + 1);
            // Rewrite our own dependency once, on the first run only.
            if s.get() == 0 {
                s.set(1);
            }
        });

        // Initial run writes, which schedules one follow-up run.
        assert_eq!(runs.get(), 2);
        assert_eq!(s.peek(), 1);

        fx.dispose();
    }

    #[test]
    fn test_dispose_while_queued_skips_run() {
        reset_runtime();

        let s = signal(0);
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let fx = effect(move || {
            let _ = s.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        begin_batch();
        s.set(1); // queued
        fx.dispose();
        end_batch();

        assert_eq!(runs.get(), 1);
        assert!(fx.is_disposed());
    }

    #[test]
    fn test_effects_run_in_enqueue_order() {
        reset_runtime();

        let s = signal(0);
        let order: Rc<std::cell::RefCell<Vec<&'static str>>> =
            Rc::new(std::cell::RefCell::new(Vec::new()));

        let order_a = order.clone();
        let fx_a = effect(move || {
            let _ = s.get();
            order_a.borrow_mut().push("a");
        });
        let order_b = order.clone();
        let fx_b = effect(move || {
            let _ = s.get();
            order_b.borrow_mut().push("b");
        });

        order.borrow_mut().clear();
        s.set(1);
        assert_eq!(order.borrow().as_slice(), ["a", "b"]);

        fx_a.dispose();
        fx_b.dispose();
    }

    #[test]
    fn test_trigger_after_dispose_is_noop() {
        reset_runtime();

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let fx = effect(move || {
            runs_clone.set(runs_clone.get() + 1);
        });
        fx.dispose();
        fx.trigger();
        assert_eq!(runs.get(), 1);
    }
}
