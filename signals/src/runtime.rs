//! Runtime - Thread-local reactive graph storage.
//!
//! One `Runtime` per thread owns every signal value cell, every effect,
//! the subscriber/source edges between them, the scheduler queue, the
//! context stack and the error-boundary stack. Signals and effects are
//! generational arena keys into this storage, so a disposed handle is
//! detectable as a stale-key lookup rather than a dangling pointer.
//!
//! Nothing in here is public API; the `signal`, `effect`, `memo`,
//! `resource` and `context` modules are thin handles over this storage.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::hash::BuildHasherDefault;
use std::rc::Rc;

use indexmap::IndexSet;
use rustc_hash::{FxHashSet, FxHasher};
use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::error::EffectError;

pub(crate) type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

new_key_type! {
    /// Generational key of a signal value cell.
    pub struct SignalId;
    /// Generational key of an effect.
    pub struct EffectId;
}

// =============================================================================
// Effect State
// =============================================================================

/// Per-effect bookkeeping shared between the arena and a running callback.
///
/// Kept behind an `Rc` so the run loop can hold it while the arena is
/// re-borrowed by the callback (to create signals, dispose effects, etc.).
pub(crate) struct EffectState {
    pub callback: RefCell<Box<dyn FnMut() -> Result<(), EffectError>>>,
    pub running: Cell<bool>,
    pub needs_rerun: Cell<bool>,
}

/// One entry on the typed context stack.
pub(crate) struct ContextEntry {
    pub key: std::any::TypeId,
    pub value: Rc<dyn Any>,
}

// =============================================================================
// Runtime
// =============================================================================

pub(crate) struct Runtime {
    /// Signal value cells, type-erased.
    pub signals: RefCell<SlotMap<SignalId, Rc<RefCell<dyn Any>>>>,
    /// Effects subscribed to each signal, in subscription order.
    pub signal_subscribers: RefCell<SecondaryMap<SignalId, FxIndexSet<EffectId>>>,
    /// Effect callbacks and run flags.
    pub effects: RefCell<SlotMap<EffectId, Rc<EffectState>>>,
    /// Signals each effect read during its last run.
    pub effect_sources: RefCell<SecondaryMap<EffectId, FxIndexSet<SignalId>>>,
    /// The effect currently running, if any. Reads register against it.
    pub observer: Cell<Option<EffectId>>,

    /// Pending effects in enqueue order.
    pub queue: RefCell<Vec<EffectId>>,
    /// Membership set for the queue. Cleared when a flush completes.
    pub queued: RefCell<FxHashSet<EffectId>>,
    /// Open batch nesting depth.
    pub batch_depth: Cell<usize>,
    /// Set while the queue is being drained.
    pub is_flushing: Cell<bool>,

    /// LIFO stack of typed context values.
    pub contexts: RefCell<Vec<ContextEntry>>,
    /// LIFO stack of error-boundary handlers.
    pub error_handlers: RefCell<Vec<Rc<dyn Fn(&EffectError)>>>,
}

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

/// Run `f` with the thread's runtime.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    RUNTIME.with(f)
}

impl Runtime {
    fn new() -> Self {
        Self {
            signals: RefCell::new(SlotMap::with_key()),
            signal_subscribers: RefCell::new(SecondaryMap::new()),
            effects: RefCell::new(SlotMap::with_key()),
            effect_sources: RefCell::new(SecondaryMap::new()),
            observer: Cell::new(None),
            queue: RefCell::new(Vec::new()),
            queued: RefCell::new(FxHashSet::default()),
            batch_depth: Cell::new(0),
            is_flushing: Cell::new(false),
            contexts: RefCell::new(Vec::new()),
            error_handlers: RefCell::new(Vec::new()),
        }
    }

    // =========================================================================
    // Signals
    // =========================================================================

    pub fn create_signal(&self, value: Rc<RefCell<dyn Any>>) -> SignalId {
        let id = self.signals.borrow_mut().insert(value);
        self.signal_subscribers
            .borrow_mut()
            .insert(id, FxIndexSet::default());
        id
    }

    pub fn signal_value(&self, id: SignalId) -> Option<Rc<RefCell<dyn Any>>> {
        self.signals.borrow().get(id).cloned()
    }

    /// Register the current observer (if any) as a subscriber of `id`,
    /// and `id` as a source of the observer. Both sides are idempotent.
    pub fn track(&self, id: SignalId) {
        let Some(observer) = self.observer.get() else {
            return;
        };
        if !self.signals.borrow().contains_key(id) {
            return;
        }
        if let Some(subs) = self.signal_subscribers.borrow_mut().get_mut(id) {
            subs.insert(observer);
        }
        if let Some(sources) = self.effect_sources.borrow_mut().get_mut(observer) {
            sources.insert(id);
        }
    }

    /// Enqueue every subscriber of `id`, then flush if nothing defers it.
    pub fn notify(&self, id: SignalId) -> Result<(), EffectError> {
        let subscribers: Vec<EffectId> = match self.signal_subscribers.borrow().get(id) {
            Some(subs) => subs.iter().copied().collect(),
            None => return Ok(()),
        };
        for effect in subscribers {
            self.enqueue(effect);
        }
        self.flush_if_idle()
    }

    pub fn dispose_signal(&self, id: SignalId) {
        self.signals.borrow_mut().remove(id);
        let subscribers = self.signal_subscribers.borrow_mut().remove(id);
        if let Some(subscribers) = subscribers {
            let mut sources = self.effect_sources.borrow_mut();
            for effect in subscribers {
                if let Some(set) = sources.get_mut(effect) {
                    set.shift_remove(&id);
                }
            }
        }
    }

    // =========================================================================
    // Effects
    // =========================================================================

    pub fn create_effect(
        &self,
        callback: Box<dyn FnMut() -> Result<(), EffectError>>,
    ) -> EffectId {
        let state = Rc::new(EffectState {
            callback: RefCell::new(callback),
            running: Cell::new(false),
            needs_rerun: Cell::new(false),
        });
        let id = self.effects.borrow_mut().insert(state);
        self.effect_sources
            .borrow_mut()
            .insert(id, FxIndexSet::default());
        id
    }

    pub fn effect_alive(&self, id: EffectId) -> bool {
        self.effects.borrow().contains_key(id)
    }

    /// Trigger an effect.
    ///
    /// Disposed effects are skipped. A trigger that arrives while the same
    /// effect is running marks it for one extra run instead of re-entering
    /// the callback. Errors are offered to the topmost error boundary; only
    /// uncaught ones come back out.
    pub fn run_effect(&self, id: EffectId) -> Result<(), EffectError> {
        let Some(state) = self.effects.borrow().get(id).cloned() else {
            return Ok(());
        };
        if state.running.get() {
            state.needs_rerun.set(true);
            return Ok(());
        }
        state.running.set(true);
        let result = loop {
            state.needs_rerun.set(false);
            if let Err(err) = self.run_once(id, &state) {
                break Err(err);
            }
            if !state.needs_rerun.get() || !self.effect_alive(id) {
                break Ok(());
            }
        };
        state.running.set(false);
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.dispatch_error(err),
        }
    }

    /// One callback invocation: clear stale subscriptions, swap the
    /// observer in, run, swap it back.
    fn run_once(&self, id: EffectId, state: &EffectState) -> Result<(), EffectError> {
        self.clear_sources(id);
        let prev = self.observer.replace(Some(id));
        let result = (state.callback.borrow_mut())();
        self.observer.set(prev);
        result
    }

    /// Unsubscribe an effect from every signal it read last run.
    pub fn clear_sources(&self, id: EffectId) {
        let sources = match self.effect_sources.borrow_mut().get_mut(id) {
            Some(set) => std::mem::take(set),
            None => return,
        };
        let mut subscribers = self.signal_subscribers.borrow_mut();
        for signal in sources {
            if let Some(subs) = subscribers.get_mut(signal) {
                subs.shift_remove(&id);
            }
        }
    }

    pub fn dispose_effect(&self, id: EffectId) {
        self.clear_sources(id);
        self.effects.borrow_mut().remove(id);
        self.effect_sources.borrow_mut().remove(id);
        self.queued.borrow_mut().remove(&id);
        if !self.is_flushing.get() {
            self.queue.borrow_mut().retain(|queued| *queued != id);
        }
    }

    // =========================================================================
    // Scheduler
    // =========================================================================

    /// Append an effect to the queue unless it is disposed or already there.
    pub fn enqueue(&self, id: EffectId) {
        if !self.effect_alive(id) {
            return;
        }
        if !self.queued.borrow_mut().insert(id) {
            return;
        }
        self.queue.borrow_mut().push(id);
    }

    pub fn flush_if_idle(&self) -> Result<(), EffectError> {
        if self.batch_depth.get() == 0 && !self.is_flushing.get() {
            self.flush()
        } else {
            Ok(())
        }
    }

    /// Drain the queue in FIFO order. Effects enqueued while draining are
    /// picked up by the same pass. A reentrant call is a no-op.
    ///
    /// An error no boundary absorbed aborts the drain: the rest of the
    /// queue is dropped (those effects re-enqueue on their next signal
    /// write) and the error is handed to the caller.
    pub fn flush(&self) -> Result<(), EffectError> {
        if self.is_flushing.get() {
            return Ok(());
        }
        self.is_flushing.set(true);
        let mut index = 0;
        let result = loop {
            let next = {
                let queue = self.queue.borrow();
                queue.get(index).copied()
            };
            let Some(id) = next else {
                break Ok(());
            };
            index += 1;
            if let Err(err) = self.run_effect(id) {
                break Err(err);
            }
        };
        self.queue.borrow_mut().clear();
        self.queued.borrow_mut().clear();
        self.is_flushing.set(false);
        result
    }

    // =========================================================================
    // Error Boundaries
    // =========================================================================

    /// Offer an uncaught effect error to the topmost boundary handler.
    /// Handlers absorb; with no handler installed the error travels on.
    pub fn dispatch_error(&self, err: EffectError) -> Result<(), EffectError> {
        let handler = self.error_handlers.borrow().last().cloned();
        match handler {
            Some(handler) => {
                handler(&err);
                Ok(())
            }
            None => Err(err),
        }
    }
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Drop every signal, effect, queued trigger, context entry and error
/// handler on this thread (for testing).
pub fn reset_runtime() {
    with_runtime(|rt| {
        rt.signals.borrow_mut().clear();
        rt.signal_subscribers.borrow_mut().clear();
        rt.effects.borrow_mut().clear();
        rt.effect_sources.borrow_mut().clear();
        rt.observer.set(None);
        rt.queue.borrow_mut().clear();
        rt.queued.borrow_mut().clear();
        rt.batch_depth.set(0);
        rt.is_flushing.set(false);
        rt.contexts.borrow_mut().clear();
        rt.error_handlers.borrow_mut().clear();
    });
}
