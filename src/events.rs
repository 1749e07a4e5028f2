//! Event Delegation - Per-event-name listener registry and dispatch.
//!
//! Instead of one host listener per node, the runtime keeps a registry
//! per event name and asks the host to delegate that name exactly once.
//! The embedder then feeds events back through [`dispatch`] with the
//! propagation path it computed (target first, ancestors after).
//!
//! # API
//!
//! - `add_listener(node, name, handler, options)` - Register a handler
//! - `remove_listener(node, name, &handler)` - Remove by identity
//! - `dispatch(name, target, options)` - Walk the path, run handlers
//! - `reset_events()` - Tear down the registry
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use ripple::events::{add_listener, dispatch, DispatchOptions, ListenerOptions};
//!
//! let handler: ripple::events::EventHandler = Rc::new(|event| {
//!     event.prevent_default();
//! });
//! add_listener(button, "click", handler, ListenerOptions::default());
//! let prevented = dispatch("click", button, DispatchOptions {
//!     path: &[button, form, body],
//!     ..Default::default()
//! });
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::host::{with_mount_host, NodeId};

// =============================================================================
// TYPES
// =============================================================================

bitflags::bitflags! {
    /// Synthetic event state as a bitfield.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventFlags: u8 {
        const BUBBLES = 1 << 0;
        const DEFAULT_PREVENTED = 1 << 1;
        const PROPAGATION_STOPPED = 1 << 2;
    }
}

/// The event value handed to listeners, mutably, one node at a time
/// along the propagation path.
pub struct SyntheticEvent {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: NodeId,
    flags: EventFlags,
    /// Embedder payload riding along with the event.
    pub detail: Option<Rc<dyn Any>>,
}

impl SyntheticEvent {
    /// Whether the event propagates past the target.
    pub fn bubbles(&self) -> bool {
        self.flags.contains(EventFlags::BUBBLES)
    }

    /// Ask the embedder to skip the default action.
    pub fn prevent_default(&mut self) {
        self.flags.insert(EventFlags::DEFAULT_PREVENTED);
    }

    pub fn default_prevented(&self) -> bool {
        self.flags.contains(EventFlags::DEFAULT_PREVENTED)
    }

    /// Stop walking the propagation path after the current node.
    pub fn stop_propagation(&mut self) {
        self.flags.insert(EventFlags::PROPAGATION_STOPPED);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.flags.contains(EventFlags::PROPAGATION_STOPPED)
    }

    /// Downcast the detail payload.
    pub fn detail_as<T: 'static>(&self) -> Option<&T> {
        self.detail.as_ref()?.downcast_ref::<T>()
    }
}

/// A registered event handler. Identity (for dedup and removal) is the
/// allocation behind the `Rc`.
pub type EventHandler = Rc<dyn Fn(&mut SyntheticEvent)>;

/// Listener registration options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerOptions {
    /// Remove the listener after its first invocation.
    pub once: bool,
}

/// Dispatch parameters.
#[derive(Default)]
pub struct DispatchOptions<'a> {
    /// Propagation path: the target first, then its ancestors outward.
    pub path: &'a [NodeId],
    /// Whether to walk past the first path entry.
    pub bubbles: bool,
    /// Payload exposed through [`SyntheticEvent::detail_as`].
    pub detail: Option<Rc<dyn Any>>,
}

// =============================================================================
// REGISTRY
// =============================================================================

struct Listener {
    node: NodeId,
    handler: EventHandler,
    once: bool,
}

#[derive(Default)]
struct EventRegistry {
    listeners: Vec<Listener>,
    host_registered: bool,
}

thread_local! {
    static REGISTRY: RefCell<HashMap<String, EventRegistry>> = RefCell::new(HashMap::new());
}

/// Register a handler for `(node, event)`. Re-adding the same handler
/// for the same node updates `once` instead of duplicating the entry.
/// The first listener for an event name registers that name with the
/// host.
pub fn add_listener(node: NodeId, event: &str, handler: EventHandler, options: ListenerOptions) {
    let newly_registered = REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let entry = registry.entry(event.to_string()).or_default();

        if let Some(existing) = entry
            .listeners
            .iter_mut()
            .find(|l| l.node == node && Rc::ptr_eq(&l.handler, &handler))
        {
            existing.once = options.once;
            return false;
        }
        entry.listeners.push(Listener {
            node,
            handler,
            once: options.once,
        });
        if entry.host_registered {
            false
        } else {
            entry.host_registered = true;
            true
        }
    });

    if newly_registered {
        with_mount_host(|host| host.register_event(event));
    }
}

/// Remove a handler by `(node, identity)`.
pub fn remove_listener(node: NodeId, event: &str, handler: &EventHandler) {
    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        if let Some(entry) = registry.get_mut(event) {
            entry
                .listeners
                .retain(|l| l.node != node || !Rc::ptr_eq(&l.handler, handler));
        }
    });
}

/// Tear down every listener and registration record.
pub fn reset_events() {
    REGISTRY.with(|registry| registry.borrow_mut().clear());
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Walk the propagation path and run matching listeners in registration
/// order. Returns whether any handler prevented the default action.
pub fn dispatch(event: &str, target: NodeId, options: DispatchOptions) -> bool {
    let mut synthetic = SyntheticEvent {
        event_type: event.to_string(),
        target,
        current_target: target,
        flags: if options.bubbles {
            EventFlags::BUBBLES
        } else {
            EventFlags::empty()
        },
        detail: options.detail,
    };

    let walked: &[NodeId] = if options.bubbles {
        options.path
    } else {
        &options.path[..options.path.len().min(1)]
    };

    'path: for &node in walked {
        synthetic.current_target = node;

        // Snapshot before invoking: handlers may mutate the registry.
        let matching: Vec<(EventHandler, bool)> = REGISTRY.with(|registry| {
            registry
                .borrow()
                .get(event)
                .map(|entry| {
                    entry
                        .listeners
                        .iter()
                        .filter(|l| l.node == node)
                        .map(|l| (l.handler.clone(), l.once))
                        .collect()
                })
                .unwrap_or_default()
        });

        for (handler, once) in matching {
            handler(&mut synthetic);
            if once {
                remove_listener(node, event, &handler);
            }
            if synthetic.propagation_stopped() {
                break 'path;
            }
        }
    }

    synthetic.default_prevented()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{HostCall, MockHost};
    use std::cell::RefCell as StdRefCell;

    fn teardown() {
        reset_events();
        crate::host::reset_mount_host();
        crate::host::reset_hydration_host();
    }

    fn recording_handler(
        log: &Rc<StdRefCell<Vec<&'static str>>>,
        label: &'static str,
    ) -> EventHandler {
        let log = log.clone();
        Rc::new(move |_event| log.borrow_mut().push(label))
    }

    #[test]
    fn test_same_handler_registers_once() {
        let host = MockHost::new();
        host.install();
        host.clear_calls();

        let log = Rc::new(StdRefCell::new(Vec::new()));
        let handler = recording_handler(&log, "h");

        add_listener(5, "click", handler.clone(), ListenerOptions::default());
        add_listener(5, "click", handler.clone(), ListenerOptions { once: true });

        dispatch("click", 5, DispatchOptions { path: &[5], ..Default::default() });
        assert_eq!(log.borrow().as_slice(), ["h"]);

        // The duplicate add flipped `once`, so the listener is gone now.
        dispatch("click", 5, DispatchOptions { path: &[5], ..Default::default() });
        assert_eq!(log.borrow().as_slice(), ["h"]);

        teardown();
    }

    #[test]
    fn test_event_name_registered_with_host_once() {
        let host = MockHost::new();
        host.install();
        host.clear_calls();

        let log = Rc::new(StdRefCell::new(Vec::new()));
        add_listener(1, "input", recording_handler(&log, "a"), ListenerOptions::default());
        add_listener(2, "input", recording_handler(&log, "b"), ListenerOptions::default());
        add_listener(3, "focus", recording_handler(&log, "c"), ListenerOptions::default());

        let registrations: Vec<HostCall> = host
            .calls()
            .into_iter()
            .filter(|call| matches!(call, HostCall::RegisterEvent { .. }))
            .collect();
        assert_eq!(
            registrations,
            [
                HostCall::RegisterEvent { name: "input".into() },
                HostCall::RegisterEvent { name: "focus".into() },
            ]
        );

        teardown();
    }

    #[test]
    fn test_bubbling_walks_path_in_order() {
        let host = MockHost::new();
        host.install();

        let log = Rc::new(StdRefCell::new(Vec::new()));
        add_listener(10, "click", recording_handler(&log, "target"), ListenerOptions::default());
        add_listener(20, "click", recording_handler(&log, "parent"), ListenerOptions::default());
        add_listener(30, "click", recording_handler(&log, "root"), ListenerOptions::default());

        dispatch(
            "click",
            10,
            DispatchOptions {
                path: &[10, 20, 30],
                bubbles: true,
                ..Default::default()
            },
        );
        assert_eq!(log.borrow().as_slice(), ["target", "parent", "root"]);

        teardown();
    }

    #[test]
    fn test_non_bubbling_visits_target_only() {
        let host = MockHost::new();
        host.install();

        let log = Rc::new(StdRefCell::new(Vec::new()));
        add_listener(10, "click", recording_handler(&log, "target"), ListenerOptions::default());
        add_listener(20, "click", recording_handler(&log, "parent"), ListenerOptions::default());

        dispatch(
            "click",
            10,
            DispatchOptions {
                path: &[10, 20],
                bubbles: false,
                ..Default::default()
            },
        );
        assert_eq!(log.borrow().as_slice(), ["target"]);

        teardown();
    }

    #[test]
    fn test_stop_propagation_breaks_walk() {
        let host = MockHost::new();
        host.install();

        let log = Rc::new(StdRefCell::new(Vec::new()));
        let log_clone = log.clone();
        let stopper: EventHandler = Rc::new(move |event| {
            log_clone.borrow_mut().push("stopper");
            event.stop_propagation();
        });
        add_listener(10, "click", stopper, ListenerOptions::default());
        add_listener(20, "click", recording_handler(&log, "parent"), ListenerOptions::default());

        dispatch(
            "click",
            10,
            DispatchOptions {
                path: &[10, 20],
                bubbles: true,
                ..Default::default()
            },
        );
        assert_eq!(log.borrow().as_slice(), ["stopper"]);

        teardown();
    }

    #[test]
    fn test_prevent_default_is_returned() {
        let host = MockHost::new();
        host.install();

        let preventer: EventHandler = Rc::new(|event| event.prevent_default());
        add_listener(7, "submit", preventer, ListenerOptions::default());

        let prevented = dispatch(
            "submit",
            7,
            DispatchOptions { path: &[7], ..Default::default() },
        );
        assert!(prevented);

        teardown();
    }

    #[test]
    fn test_once_listener_fires_once() {
        let host = MockHost::new();
        host.install();

        let log = Rc::new(StdRefCell::new(Vec::new()));
        add_listener(4, "click", recording_handler(&log, "once"), ListenerOptions { once: true });

        dispatch("click", 4, DispatchOptions { path: &[4], ..Default::default() });
        dispatch("click", 4, DispatchOptions { path: &[4], ..Default::default() });
        assert_eq!(log.borrow().as_slice(), ["once"]);

        teardown();
    }

    #[test]
    fn test_registration_order_on_same_node() {
        let host = MockHost::new();
        host.install();

        let log = Rc::new(StdRefCell::new(Vec::new()));
        add_listener(9, "click", recording_handler(&log, "first"), ListenerOptions::default());
        add_listener(9, "click", recording_handler(&log, "second"), ListenerOptions::default());

        dispatch("click", 9, DispatchOptions { path: &[9], ..Default::default() });
        assert_eq!(log.borrow().as_slice(), ["first", "second"]);

        teardown();
    }

    #[test]
    fn test_detail_payload_downcasts() {
        let host = MockHost::new();
        host.install();

        let seen = Rc::new(StdRefCell::new(None));
        let seen_clone = seen.clone();
        let handler: EventHandler = Rc::new(move |event| {
            *seen_clone.borrow_mut() = event.detail_as::<u32>().copied();
        });
        add_listener(2, "custom", handler, ListenerOptions::default());

        dispatch(
            "custom",
            2,
            DispatchOptions {
                path: &[2],
                detail: Some(Rc::new(99u32)),
                ..Default::default()
            },
        );
        assert_eq!(*seen.borrow(), Some(99));

        teardown();
    }

    #[test]
    fn test_remove_listener_by_identity() {
        let host = MockHost::new();
        host.install();

        let log = Rc::new(StdRefCell::new(Vec::new()));
        let keep = recording_handler(&log, "keep");
        let drop_me = recording_handler(&log, "drop");
        add_listener(3, "click", keep.clone(), ListenerOptions::default());
        add_listener(3, "click", drop_me.clone(), ListenerOptions::default());

        remove_listener(3, "click", &drop_me);
        dispatch("click", 3, DispatchOptions { path: &[3], ..Default::default() });
        assert_eq!(log.borrow().as_slice(), ["keep"]);

        teardown();
    }
}
