//! # ripple-signals
//!
//! Fine-grained reactive signals for Ripple.
//!
//! Values live in signals; computations live in effects. An effect
//! subscribes to exactly the signals it read on its last run, so
//! dependency graphs follow the data instead of being declared. Writes
//! notify through a deduplicated FIFO scheduler: outside a batch they
//! take effect immediately, inside a batch they coalesce until the
//! outermost batch closes.
//!
//! Everything is single-threaded and cooperative. Each thread owns one
//! runtime; signals and effects are generational keys into it, so a
//! disposed handle fails loudly instead of dangling.
//!
//! ## Modules
//!
//! - [`signal`] - Reactive value cells
//! - [`effect`] - Reactive computations
//! - [`memo`] - Derived values
//! - [`scheduler`] - Batching and queue draining
//! - [`resource`] - Fetch-driven state machines and suspense accounting
//! - [`context`] - Ambient values for a lexical region
//! - [`error`] - Effect failures and error boundaries
//!
//! ## Example
//!
//! ```ignore
//! use ripple_signals::{signal, effect, batch};
//!
//! let width = signal(80);
//! let height = signal(24);
//! let fx = effect(move || {
//!     println!("{} x {}", width.get(), height.get());
//! });
//!
//! // One re-run, not two.
//! batch(|| {
//!     width.set(120);
//!     height.set(40);
//! });
//! fx.dispose();
//! ```

pub mod context;
pub mod effect;
pub mod error;
pub mod memo;
pub mod resource;
mod runtime;
pub mod scheduler;
pub mod signal;

pub use context::{provide_context, use_context, ContextGuard};
pub use effect::{effect, try_effect, Effect};
pub use error::{push_error_boundary, EffectError, ErrorBoundaryGuard};
pub use memo::{memo, Memo};
pub use resource::{resource, Resource, ResourceState, SuspenseBoundary, SuspenseContext};
pub use runtime::reset_runtime;
pub use scheduler::{batch, begin_batch, end_batch, flush_now, FlushError};
pub use signal::{signal, Signal};
