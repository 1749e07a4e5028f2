//! Scheduler - Batching and queue draining.
//!
//! Signal writes enqueue their subscribers into a deduplicated FIFO
//! queue. Outside a batch the queue drains immediately after the write;
//! inside a batch it drains when the outermost `end_batch` closes, so a
//! burst of writes costs each subscriber one run. Writes made while the
//! queue is draining extend the same drain and never start a nested one.
//!
//! # API
//!
//! - `begin_batch` / `end_batch` - Bracket a deferral region
//! - `batch(f)` - Run `f` inside a batch
//! - `flush_now()` - Drain explicitly (for embedders driving ticks)

use crate::error::EffectError;
use crate::runtime::with_runtime;

// =============================================================================
// Errors
// =============================================================================

/// Failure of an explicit [`flush_now`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlushError {
    /// The queue was already draining when `flush_now` was called.
    #[error("flush already in progress")]
    Reentrant,
    /// An effect failed and no error boundary absorbed it.
    #[error(transparent)]
    Effect(#[from] EffectError),
}

// =============================================================================
// Batching
// =============================================================================

/// Open a batch. Writes defer their effects until the matching
/// `end_batch` of the outermost batch.
pub fn begin_batch() {
    with_runtime(|rt| rt.batch_depth.set(rt.batch_depth.get() + 1));
}

/// Close a batch. Closing the outermost batch drains the queue.
/// An effect failure no boundary absorbed is logged.
pub fn end_batch() {
    let result = with_runtime(|rt| {
        let depth = rt.batch_depth.get();
        assert!(depth > 0, "end_batch without a matching begin_batch");
        rt.batch_depth.set(depth - 1);
        if depth == 1 {
            rt.flush_if_idle()
        } else {
            Ok(())
        }
    });
    if let Err(err) = result {
        log::error!("uncaught effect error: {err}");
    }
}

/// Run `f` with writes batched.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    begin_batch();
    let result = f();
    end_batch();
    result
}

/// Drain the queue now. Fails with [`FlushError::Reentrant`] when called
/// from inside a running flush (an effect callback, typically), and with
/// the effect's error when a failure reaches the caller uncaught.
pub fn flush_now() -> Result<(), FlushError> {
    with_runtime(|rt| {
        if rt.is_flushing.get() {
            return Err(FlushError::Reentrant);
        }
        rt.flush().map_err(FlushError::from)
    })
}

// =============================================================================
// Tests
// =============================================================================
