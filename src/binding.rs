//! Bindings - Signals wired to host nodes.
//!
//! A binding is a single-purpose effect connecting one signal to one
//! host mutation. Because the scheduler deduplicates, a flush pushes at
//! most one host call per binding no matter how many writes preceded it.

use ripple_signals::{effect, Effect, Signal};

use crate::host::{with_mount_host, NodeId};

// =============================================================================
// Binding
// =============================================================================

/// Handle to a live binding. Dispose it to stop updates.
#[derive(Clone, Copy, Debug)]
pub struct Binding {
    effect: Effect,
}

impl Binding {
    /// Stop pushing updates to the host.
    pub fn dispose(self) {
        self.effect.dispose();
    }
}

/// Keep a text node's content equal to a signal. The current value is
/// pushed immediately.
pub fn bind_text(node: NodeId, value: Signal<String>) -> Binding {
    Binding {
        effect: effect(move || {
            let text = value.get();
            with_mount_host(|host| host.set_text(node, &text));
        }),
    }
}

/// Keep an element attribute equal to a signal. The current value is
/// pushed immediately.
pub fn bind_attribute(node: NodeId, name: &str, value: Signal<String>) -> Binding {
    let name = name.to_string();
    Binding {
        effect: effect(move || {
            let current = value.get();
            with_mount_host(|host| host.set_attribute(node, &name, &current));
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================
