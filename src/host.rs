//! Host Interface - The narrow seam between the runtime and its tree.
//!
//! The runtime never touches the host tree directly. Mounting goes
//! through a [`MountHost`] (create, append, set text and attributes,
//! resolve portals, register delegated events); hydration reads an
//! existing tree through a [`HydrationHost`] (child walking, node
//! classification, content readback). Both are installed per thread and
//! swapped whole.
//!
//! On `wasm32` the default tables forward to `ripple_dom_*` imports the
//! embedder provides. Off wasm the default mount host traces operations
//! to stderr and hands out sequential node ids, which is enough to run
//! programs headless; the default hydration host panics, because there
//! is no tree to read.
//!
//! # API
//!
//! - `set_mount_host` / `reset_mount_host` - Swap the mount table
//! - `set_hydration_host` / `reset_hydration_host` - Swap the reader table
//! - `with_mount_host` / `with_hydration_host` - Run against the table

use std::cell::RefCell;

// =============================================================================
// TYPES
// =============================================================================

/// Opaque host node handle. `0` is reserved for "not found".
pub type NodeId = u32;

/// The reserved null node id.
pub const NO_NODE: NodeId = 0;

/// Host node classification, as reported by the hydration reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Comment,
    Other,
}

// =============================================================================
// HOST TABLES
// =============================================================================

/// Operations the runtime needs to build and update the host tree.
pub trait MountHost {
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn set_text(&mut self, node: NodeId, text: &str);
    /// Called once per distinct event name the runtime wants delegated.
    fn register_event(&mut self, name: &str);
    /// Resolve a portal target to a node. Returns [`NO_NODE`] if absent.
    fn resolve_portal(&mut self, target: &str) -> NodeId;
}

/// Read-only operations the runtime needs to attach to a server-rendered
/// tree.
pub trait HydrationHost {
    fn first_child(&mut self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&mut self, node: NodeId) -> Option<NodeId>;
    fn node_type(&mut self, node: NodeId) -> NodeType;
    /// Only valid for element nodes.
    fn tag_name(&mut self, node: NodeId) -> String;
    /// Only valid for text nodes.
    fn text_content(&mut self, node: NodeId) -> String;
    /// Only valid for element nodes.
    fn get_attribute(&mut self, node: NodeId, name: &str) -> Option<String>;
    /// Only valid for comment nodes.
    fn comment_text(&mut self, node: NodeId) -> String;
}

thread_local! {
    static MOUNT_HOST: RefCell<Box<dyn MountHost>> = RefCell::new(default_mount_host());
    static HYDRATION_HOST: RefCell<Box<dyn HydrationHost>> = RefCell::new(default_hydration_host());
}

/// Install a mount host for this thread.
pub fn set_mount_host(host: Box<dyn MountHost>) {
    MOUNT_HOST.with(|cell| *cell.borrow_mut() = host);
}

/// Restore the default mount host.
pub fn reset_mount_host() {
    MOUNT_HOST.with(|cell| *cell.borrow_mut() = default_mount_host());
}

/// Install a hydration host for this thread.
pub fn set_hydration_host(host: Box<dyn HydrationHost>) {
    HYDRATION_HOST.with(|cell| *cell.borrow_mut() = host);
}

/// Restore the default hydration host.
pub fn reset_hydration_host() {
    HYDRATION_HOST.with(|cell| *cell.borrow_mut() = default_hydration_host());
}

/// Run `f` against the installed mount host.
pub fn with_mount_host<R>(f: impl FnOnce(&mut dyn MountHost) -> R) -> R {
    MOUNT_HOST.with(|cell| f(cell.borrow_mut().as_mut()))
}

/// Run `f` against the installed hydration host.
pub fn with_hydration_host<R>(f: impl FnOnce(&mut dyn HydrationHost) -> R) -> R {
    HYDRATION_HOST.with(|cell| f(cell.borrow_mut().as_mut()))
}

// =============================================================================
// DEFAULTS - wasm32
// =============================================================================

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::{MountHost, NodeId, NodeType, HydrationHost};

    // Imports the embedder re-exports to the module instance. Strings
    // cross as (pointer, length) into linear memory, no terminators.
    unsafe extern "C" {
        fn ripple_dom_create_element(tag_ptr: *const u8, tag_len: usize) -> u32;
        fn ripple_dom_create_text(text_ptr: *const u8, text_len: usize) -> u32;
        fn ripple_dom_append_child(parent: u32, child: u32);
        fn ripple_dom_set_attribute(
            node: u32,
            name_ptr: *const u8,
            name_len: usize,
            value_ptr: *const u8,
            value_len: usize,
        );
        fn ripple_dom_set_text(node: u32, text_ptr: *const u8, text_len: usize);
        fn ripple_dom_register_event(name_ptr: *const u8, name_len: usize);
        fn ripple_dom_resolve_portal(target_ptr: *const u8, target_len: usize) -> u32;

        fn ripple_dom_first_child(node: u32) -> u32;
        fn ripple_dom_next_sibling(node: u32) -> u32;
        fn ripple_dom_node_type(node: u32) -> u32;
        fn ripple_dom_tag_name(node: u32, out_ptr: *mut u8, out_cap: usize) -> usize;
        fn ripple_dom_text_content(node: u32, out_ptr: *mut u8, out_cap: usize) -> usize;
        fn ripple_dom_get_attribute(
            node: u32,
            name_ptr: *const u8,
            name_len: usize,
            out_ptr: *mut u8,
            out_cap: usize,
        ) -> isize;
        fn ripple_dom_comment_text(node: u32, out_ptr: *mut u8, out_cap: usize) -> usize;
    }

    const READBACK_CAP: usize = 4096;

    fn read_into(f: impl FnOnce(*mut u8, usize) -> usize) -> String {
        let mut buf = vec![0u8; READBACK_CAP];
        let len = f(buf.as_mut_ptr(), buf.len()).min(buf.len());
        buf.truncate(len);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub(super) struct WasmMountHost;

    impl MountHost for WasmMountHost {
        fn create_element(&mut self, tag: &str) -> NodeId {
            unsafe { ripple_dom_create_element(tag.as_ptr(), tag.len()) }
        }

        fn create_text(&mut self, text: &str) -> NodeId {
            unsafe { ripple_dom_create_text(text.as_ptr(), text.len()) }
        }

        fn append_child(&mut self, parent: NodeId, child: NodeId) {
            unsafe { ripple_dom_append_child(parent, child) }
        }

        fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
            unsafe {
                ripple_dom_set_attribute(
                    node,
                    name.as_ptr(),
                    name.len(),
                    value.as_ptr(),
                    value.len(),
                )
            }
        }

        fn set_text(&mut self, node: NodeId, text: &str) {
            unsafe { ripple_dom_set_text(node, text.as_ptr(), text.len()) }
        }

        fn register_event(&mut self, name: &str) {
            unsafe { ripple_dom_register_event(name.as_ptr(), name.len()) }
        }

        fn resolve_portal(&mut self, target: &str) -> NodeId {
            unsafe { ripple_dom_resolve_portal(target.as_ptr(), target.len()) }
        }
    }

    pub(super) struct WasmHydrationHost;

    impl HydrationHost for WasmHydrationHost {
        fn first_child(&mut self, node: NodeId) -> Option<NodeId> {
            match unsafe { ripple_dom_first_child(node) } {
                0 => None,
                id => Some(id),
            }
        }

        fn next_sibling(&mut self, node: NodeId) -> Option<NodeId> {
            match unsafe { ripple_dom_next_sibling(node) } {
                0 => None,
                id => Some(id),
            }
        }

        fn node_type(&mut self, node: NodeId) -> NodeType {
            match unsafe { ripple_dom_node_type(node) } {
                1 => NodeType::Element,
                3 => NodeType::Text,
                8 => NodeType::Comment,
                _ => NodeType::Other,
            }
        }

        fn tag_name(&mut self, node: NodeId) -> String {
            read_into(|ptr, cap| unsafe { ripple_dom_tag_name(node, ptr, cap) })
        }

        fn text_content(&mut self, node: NodeId) -> String {
            read_into(|ptr, cap| unsafe { ripple_dom_text_content(node, ptr, cap) })
        }

        fn get_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
            let mut buf = vec![0u8; READBACK_CAP];
            let len = unsafe {
                ripple_dom_get_attribute(
                    node,
                    name.as_ptr(),
                    name.len(),
                    buf.as_mut_ptr(),
                    buf.len(),
                )
            };
            if len < 0 {
                return None;
            }
            buf.truncate((len as usize).min(READBACK_CAP));
            Some(String::from_utf8_lossy(&buf).into_owned())
        }

        fn comment_text(&mut self, node: NodeId) -> String {
            read_into(|ptr, cap| unsafe { ripple_dom_comment_text(node, ptr, cap) })
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn default_mount_host() -> Box<dyn MountHost> {
    Box::new(wasm::WasmMountHost)
}

#[cfg(target_arch = "wasm32")]
fn default_hydration_host() -> Box<dyn HydrationHost> {
    Box::new(wasm::WasmHydrationHost)
}

// =============================================================================
// DEFAULTS - native
// =============================================================================

/// Headless mount host: traces operations to stderr and hands out
/// sequential node ids.
#[cfg(not(target_arch = "wasm32"))]
struct StderrMountHost {
    next_id: NodeId,
}

#[cfg(not(target_arch = "wasm32"))]
impl StderrMountHost {
    fn new() -> Self {
        Self { next_id: 1 }
    }

    fn allocate(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl MountHost for StderrMountHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let id = self.allocate();
        eprintln!("[ripple] create_element <{tag}> -> {id}");
        id
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let id = self.allocate();
        eprintln!("[ripple] create_text {text:?} -> {id}");
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        eprintln!("[ripple] append_child {parent} <- {child}");
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        eprintln!("[ripple] set_attribute {node} {name}={value:?}");
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        eprintln!("[ripple] set_text {node} {text:?}");
    }

    fn register_event(&mut self, name: &str) {
        eprintln!("[ripple] register_event {name}");
    }

    fn resolve_portal(&mut self, target: &str) -> NodeId {
        log::warn!("portal target {target:?} has no headless resolution");
        NO_NODE
    }
}

/// There is nothing to read back outside a host tree.
#[cfg(not(target_arch = "wasm32"))]
struct UnsupportedHydrationHost;

#[cfg(not(target_arch = "wasm32"))]
impl HydrationHost for UnsupportedHydrationHost {
    fn first_child(&mut self, _node: NodeId) -> Option<NodeId> {
        panic!("hydration host not installed");
    }

    fn next_sibling(&mut self, _node: NodeId) -> Option<NodeId> {
        panic!("hydration host not installed");
    }

    fn node_type(&mut self, _node: NodeId) -> NodeType {
        panic!("hydration host not installed");
    }

    fn tag_name(&mut self, _node: NodeId) -> String {
        panic!("hydration host not installed");
    }

    fn text_content(&mut self, _node: NodeId) -> String {
        panic!("hydration host not installed");
    }

    fn get_attribute(&mut self, _node: NodeId, _name: &str) -> Option<String> {
        panic!("hydration host not installed");
    }

    fn comment_text(&mut self, _node: NodeId) -> String {
        panic!("hydration host not installed");
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_mount_host() -> Box<dyn MountHost> {
    Box::new(StderrMountHost::new())
}

#[cfg(not(target_arch = "wasm32"))]
fn default_hydration_host() -> Box<dyn HydrationHost> {
    Box::new(UnsupportedHydrationHost)
}
