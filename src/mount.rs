//! Mount Interpreter - Realize a program as fresh host nodes.
//!
//! Executes a render program against the installed mount host, stamping
//! every element with its `data-hid` and collecting the bookkeeping a
//! caller needs afterwards: the dynamic text nodes (for bindings), the
//! hydration-id map, and the island/portal/suspense ranges.

use crate::error::RenderError;
use crate::host::{with_mount_host, MountHost, NodeId, NO_NODE};
use crate::program::{RenderOp, RenderProgram};

// =============================================================================
// Records
// =============================================================================

/// An island's place in the mounted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IslandRecord {
    pub name: String,
    pub parent: NodeId,
    pub start_slot: usize,
    pub end_slot: usize,
}

/// A portal's target and its dynamic slot range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRecord {
    pub target: String,
    pub node: NodeId,
    pub start_slot: usize,
    pub end_slot: usize,
}

/// A suspense boundary's main and fallback slot ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspenseRecord {
    pub name: String,
    pub main_start_slot: usize,
    pub main_end_slot: usize,
    pub fallback_start_slot: usize,
    pub fallback_end_slot: usize,
}

/// Everything a mount (or hydrate) leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MountResult {
    /// Dynamic text nodes, indexed by slot.
    pub dynamic_nodes: Vec<NodeId>,
    /// Element nodes indexed by hydration id; index 0 is unused.
    pub hydration_nodes: Vec<NodeId>,
    pub islands: Vec<IslandRecord>,
    pub portals: Vec<PortalRecord>,
    pub suspense: Vec<SuspenseRecord>,
}

impl MountResult {
    /// The element mounted (or matched) for a hydration id.
    pub fn node_for_hydration_id(&self, hydration_id: u32) -> Option<NodeId> {
        match self.hydration_nodes.get(hydration_id as usize) {
            Some(&node) if node != NO_NODE => Some(node),
            _ => None,
        }
    }
}

// =============================================================================
// Mount
// =============================================================================

/// Execute `program` under `parent`, filling dynamic slots with
/// `values`. The value count must equal the program's slot count.
pub fn mount(
    program: &RenderProgram,
    parent: NodeId,
    values: &[&str],
) -> Result<MountResult, RenderError> {
    with_mount_host(|host| mount_in(host, program, parent, values))
}

struct SuspenseFrame {
    name: String,
    main_start: usize,
    main_end: usize,
    fallback_start: usize,
    has_fallback: bool,
}

fn mount_in(
    host: &mut dyn MountHost,
    program: &RenderProgram,
    parent: NodeId,
    values: &[&str],
) -> Result<MountResult, RenderError> {
    if values.len() != program.dynamic_slot_count() {
        return Err(RenderError::MismatchedValues);
    }

    let mut result = MountResult::default();
    let hid_len = program.max_hydration_id as usize + 1;
    result.hydration_nodes.try_reserve_exact(hid_len)?;
    result.hydration_nodes.resize(hid_len, NO_NODE);

    let mut current = parent;
    let mut parents: Vec<NodeId> = Vec::new();
    let mut islands: Vec<(String, NodeId, usize)> = Vec::new();
    let mut portals: Vec<(String, NodeId, NodeId, usize)> = Vec::new();
    let mut suspense: Vec<SuspenseFrame> = Vec::new();

    for op in &program.ops {
        match op {
            RenderOp::OpenElement { tag, hydration_id } => {
                let node = create_element(host, current, tag, *hydration_id, &mut result);
                parents.push(current);
                current = node;
            }
            RenderOp::SelfElement { tag, hydration_id } => {
                create_element(host, current, tag, *hydration_id, &mut result);
            }
            RenderOp::CloseElement { .. } => {
                current = parents.pop().ok_or(RenderError::StackUnderflow)?;
            }
            RenderOp::Text { literal } => {
                if !literal.is_empty() {
                    let node = host.create_text(literal);
                    host.append_child(current, node);
                }
            }
            RenderOp::DynamicText { slot } => {
                let value = values.get(*slot).copied().unwrap_or("");
                let node = host.create_text(value);
                host.append_child(current, node);
                result.dynamic_nodes.push(node);
            }
            RenderOp::IslandStart { name } => {
                islands.push((name.clone(), current, result.dynamic_nodes.len()));
            }
            RenderOp::IslandEnd => {
                let (name, island_parent, start) = islands
                    .pop()
                    .ok_or_else(|| RenderError::InvalidMarkup("island end without start".into()))?;
                result.islands.push(IslandRecord {
                    name,
                    parent: island_parent,
                    start_slot: start,
                    end_slot: result.dynamic_nodes.len(),
                });
            }
            RenderOp::PortalStart { target } => {
                let node = host.resolve_portal(target);
                if node == NO_NODE {
                    return Err(RenderError::MissingNode(target.clone()));
                }
                portals.push((target.clone(), node, current, result.dynamic_nodes.len()));
                current = node;
            }
            RenderOp::PortalEnd => {
                let (target, node, saved, start) = portals
                    .pop()
                    .ok_or_else(|| RenderError::InvalidMarkup("portal end without start".into()))?;
                current = saved;
                result.portals.push(PortalRecord {
                    target,
                    node,
                    start_slot: start,
                    end_slot: result.dynamic_nodes.len(),
                });
            }
            RenderOp::SuspenseStart { name } => {
                suspense.push(SuspenseFrame {
                    name: name.clone(),
                    main_start: result.dynamic_nodes.len(),
                    main_end: 0,
                    fallback_start: 0,
                    has_fallback: false,
                });
            }
            RenderOp::SuspenseFallback => {
                let frame = suspense.last_mut().ok_or_else(|| {
                    RenderError::InvalidMarkup("suspense fallback without start".into())
                })?;
                frame.main_end = result.dynamic_nodes.len();
                frame.fallback_start = result.dynamic_nodes.len();
                frame.has_fallback = true;
            }
            RenderOp::SuspenseEnd => {
                let frame = suspense.pop().ok_or_else(|| {
                    RenderError::InvalidMarkup("suspense end without start".into())
                })?;
                let end = result.dynamic_nodes.len();
                let (main_end, fallback_start, fallback_end) = if frame.has_fallback {
                    (frame.main_end, frame.fallback_start, end)
                } else {
                    (end, end, end)
                };
                result.suspense.push(SuspenseRecord {
                    name: frame.name,
                    main_start_slot: frame.main_start,
                    main_end_slot: main_end,
                    fallback_start_slot: fallback_start,
                    fallback_end_slot: fallback_end,
                });
            }
        }
    }

    if !parents.is_empty() || !islands.is_empty() || !portals.is_empty() || !suspense.is_empty() {
        return Err(RenderError::InvalidMarkup(
            "unclosed structure at end of program".into(),
        ));
    }
    Ok(result)
}

fn create_element(
    host: &mut dyn MountHost,
    parent: NodeId,
    tag: &str,
    hydration_id: u32,
    result: &mut MountResult,
) -> NodeId {
    let node = host.create_element(tag);
    host.append_child(parent, node);
    host.set_attribute(node, "data-hid", &hydration_id.to_string());
    result.hydration_nodes[hydration_id as usize] = node;
    node
}

// =============================================================================
// Tests
// =============================================================================
