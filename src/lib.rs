//! # ripple
//!
//! Reactive UI runtime for WebAssembly hosts.
//!
//! Built on [`ripple-signals`](ripple_signals) for fine-grained
//! reactivity. The runtime never owns the host tree: mounting and
//! hydration go through a narrow callback table the embedder installs,
//! which on `wasm32` forwards to `ripple_dom_*` imports and off wasm
//! runs headless.
//!
//! ## Architecture
//!
//! Templates compile once into a static/dynamic split, which builds a
//! flat op program. The same program drives both attachment paths:
//!
//! ```text
//! template literal → TemplatePlan → RenderProgram → mount (fresh nodes)
//!                                                 ↘ hydrate (SSR nodes)
//! ```
//!
//! Either path returns a [`MountResult`](mount::MountResult) mapping
//! dynamic slots and hydration ids to host nodes, which is where
//! bindings and event listeners attach.
//!
//! ## Modules
//!
//! - [`template`] - Template literal compiler
//! - [`program`] - Render op programs
//! - [`mount`] - Mount interpreter
//! - [`hydrate`] - Hydrate interpreter
//! - [`host`] - Host callback tables
//! - [`events`] - Delegated event registry and dispatch
//! - [`binding`] - Signal-to-node bindings
//! - [`error`] - Render error kinds

pub mod binding;
pub mod error;
pub mod events;
pub mod host;
pub mod hydrate;
pub mod marker;
#[cfg(any(test, feature = "test-host"))]
pub mod mock;
pub mod mount;
pub mod program;
pub mod template;

// Re-export commonly used items
pub use binding::{bind_attribute, bind_text, Binding};
pub use error::RenderError;
pub use events::{
    add_listener, dispatch, remove_listener, reset_events, DispatchOptions, EventFlags,
    EventHandler, ListenerOptions, SyntheticEvent,
};
pub use host::{
    reset_hydration_host, reset_mount_host, set_hydration_host, set_mount_host, HydrationHost,
    MountHost, NodeId, NodeType, NO_NODE,
};
pub use hydrate::hydrate;
pub use mount::{mount, IslandRecord, MountResult, PortalRecord, SuspenseRecord};
pub use program::{build_program, RenderOp, RenderProgram};
pub use template::{compile, TemplatePlan};
