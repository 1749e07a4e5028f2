//! Mock Host - In-memory host tree for tests.
//!
//! Implements both host tables over one recorded tree, so a test can
//! mount against it, assert the exact call sequence, then hydrate
//! against the same tree. `ssr_render` builds the tree a server renderer
//! would emit for a program (elements stamped with `data-hid`, marker
//! comments in the flow), which is what hydration expects to walk.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::host::{HydrationHost, MountHost, NodeId, NodeType, NO_NODE};
use crate::program::{RenderOp, RenderProgram};

// =============================================================================
// Recorded Calls
// =============================================================================

/// One observed mount-host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    CreateElement { tag: String, node: NodeId },
    CreateText { text: String, node: NodeId },
    AppendChild { parent: NodeId, child: NodeId },
    SetAttribute { node: NodeId, name: String, value: String },
    SetText { node: NodeId, text: String },
    RegisterEvent { name: String },
    ResolvePortal { target: String, node: NodeId },
}

// =============================================================================
// Tree Storage
// =============================================================================

#[derive(Debug, Clone)]
enum MockNodeKind {
    Element { tag: String },
    Text,
    Comment,
}

#[derive(Debug, Clone)]
struct MockNode {
    kind: MockNodeKind,
    /// Text or comment content; unused for elements.
    content: String,
    attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

#[derive(Default)]
struct MockDom {
    /// Node `n` lives at index `n - 1`; id 0 stays "not found".
    nodes: Vec<MockNode>,
    calls: Vec<HostCall>,
    portals: HashMap<String, NodeId>,
}

impl MockDom {
    fn insert(&mut self, node: MockNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() as NodeId
    }

    fn node(&self, id: NodeId) -> &MockNode {
        &self.nodes[id as usize - 1]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut MockNode {
        &mut self.nodes[id as usize - 1]
    }
}

// =============================================================================
// MockHost
// =============================================================================

/// A cloneable handle to a recorded host tree. Clones share the tree,
/// so one clone can be installed as the thread host while the original
/// keeps inspecting it.
#[derive(Clone, Default)]
pub struct MockHost {
    inner: Rc<RefCell<MockDom>>,
}

impl MockHost {
    /// Create a host with an empty tree plus a root element.
    /// The root is always node 1.
    pub fn new() -> Self {
        let host = Self::default();
        host.new_element("#root");
        host
    }

    /// The pre-created root element.
    pub fn root(&self) -> NodeId {
        1
    }

    /// Install clones of this host as the thread's mount and hydration
    /// tables.
    pub fn install(&self) {
        crate::host::set_mount_host(Box::new(self.clone()));
        crate::host::set_hydration_host(Box::new(self.clone()));
    }

    // =========================================================================
    // Tree building (for hydration fixtures)
    // =========================================================================

    /// Create an element node without recording a call.
    pub fn new_element(&self, tag: &str) -> NodeId {
        self.inner.borrow_mut().insert(MockNode {
            kind: MockNodeKind::Element {
                tag: tag.to_string(),
            },
            content: String::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    /// Create a text node without recording a call.
    pub fn new_text(&self, text: &str) -> NodeId {
        self.inner.borrow_mut().insert(MockNode {
            kind: MockNodeKind::Text,
            content: text.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    /// Create a comment node without recording a call.
    pub fn new_comment(&self, body: &str) -> NodeId {
        self.inner.borrow_mut().insert(MockNode {
            kind: MockNodeKind::Comment,
            content: body.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    /// Append without recording a call.
    pub fn attach(&self, parent: NodeId, child: NodeId) {
        let mut dom = self.inner.borrow_mut();
        dom.node_mut(parent).children.push(child);
        dom.node_mut(child).parent = Some(parent);
    }

    /// Set an attribute without recording a call.
    pub fn put_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut dom = self.inner.borrow_mut();
        let attrs = &mut dom.node_mut(node).attributes;
        match attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Map a portal target to a node.
    pub fn register_portal(&self, target: &str, node: NodeId) {
        self.inner
            .borrow_mut()
            .portals
            .insert(target.to_string(), node);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every mount-host call observed so far, in order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.inner.borrow().calls.clone()
    }

    /// Forget recorded calls (tree stays).
    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Child ids of a node.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.borrow().node(node).children.clone()
    }

    /// Element tag, if `node` is an element.
    pub fn tag_of(&self, node: NodeId) -> Option<String> {
        match &self.inner.borrow().node(node).kind {
            MockNodeKind::Element { tag } => Some(tag.clone()),
            _ => None,
        }
    }

    /// Text or comment content.
    pub fn content_of(&self, node: NodeId) -> String {
        self.inner.borrow().node(node).content.clone()
    }

    /// Attribute value, if set.
    pub fn attribute_of(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .node(node)
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

impl MountHost for MockHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let node = self.new_element(tag);
        self.inner.borrow_mut().calls.push(HostCall::CreateElement {
            tag: tag.to_string(),
            node,
        });
        node
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let node = self.new_text(text);
        self.inner.borrow_mut().calls.push(HostCall::CreateText {
            text: text.to_string(),
            node,
        });
        node
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.attach(parent, child);
        self.inner
            .borrow_mut()
            .calls
            .push(HostCall::AppendChild { parent, child });
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.put_attribute(node, name, value);
        self.inner.borrow_mut().calls.push(HostCall::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let mut dom = self.inner.borrow_mut();
        dom.node_mut(node).content = text.to_string();
        dom.calls.push(HostCall::SetText {
            node,
            text: text.to_string(),
        });
    }

    fn register_event(&mut self, name: &str) {
        self.inner.borrow_mut().calls.push(HostCall::RegisterEvent {
            name: name.to_string(),
        });
    }

    fn resolve_portal(&mut self, target: &str) -> NodeId {
        let mut dom = self.inner.borrow_mut();
        let node = dom.portals.get(target).copied().unwrap_or(NO_NODE);
        dom.calls.push(HostCall::ResolvePortal {
            target: target.to_string(),
            node,
        });
        node
    }
}

impl HydrationHost for MockHost {
    fn first_child(&mut self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).children.first().copied()
    }

    fn next_sibling(&mut self, node: NodeId) -> Option<NodeId> {
        let dom = self.inner.borrow();
        let parent = dom.node(node).parent?;
        let siblings = &dom.node(parent).children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    fn node_type(&mut self, node: NodeId) -> NodeType {
        match self.inner.borrow().node(node).kind {
            MockNodeKind::Element { .. } => NodeType::Element,
            MockNodeKind::Text => NodeType::Text,
            MockNodeKind::Comment => NodeType::Comment,
        }
    }

    fn tag_name(&mut self, node: NodeId) -> String {
        self.tag_of(node).unwrap_or_default()
    }

    fn text_content(&mut self, node: NodeId) -> String {
        self.content_of(node)
    }

    fn get_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        self.attribute_of(node, name)
    }

    fn comment_text(&mut self, node: NodeId) -> String {
        self.content_of(node)
    }
}

// =============================================================================
// Server Rendering
// =============================================================================

/// Build the tree a server renderer emits for `program`: elements carry
/// `data-hid`, markers appear as comments in the flow, every dynamic
/// slot is its own text node. Portal content lands in the registered
/// target node.
pub fn ssr_render(host: &MockHost, program: &RenderProgram, parent: NodeId, values: &[&str]) {
    let mut current = parent;
    let mut parents: Vec<NodeId> = Vec::new();
    let mut portal_saved: Vec<NodeId> = Vec::new();

    for op in &program.ops {
        match op {
            RenderOp::OpenElement { tag, hydration_id } => {
                let node = host.new_element(tag);
                host.put_attribute(node, "data-hid", &hydration_id.to_string());
                host.attach(current, node);
                parents.push(current);
                current = node;
            }
            RenderOp::CloseElement { .. } => {
                current = parents.pop().unwrap_or(parent);
            }
            RenderOp::SelfElement { tag, hydration_id } => {
                let node = host.new_element(tag);
                host.put_attribute(node, "data-hid", &hydration_id.to_string());
                host.attach(current, node);
            }
            RenderOp::Text { literal } => {
                if !literal.is_empty() {
                    let node = host.new_text(literal);
                    host.attach(current, node);
                }
            }
            RenderOp::DynamicText { slot } => {
                let node = host.new_text(values.get(*slot).copied().unwrap_or(""));
                host.attach(current, node);
            }
            RenderOp::IslandStart { name } => {
                let node = host.new_comment(&format!("island:{name}"));
                host.attach(current, node);
            }
            RenderOp::IslandEnd => {
                let node = host.new_comment("/island");
                host.attach(current, node);
            }
            RenderOp::PortalStart { target } => {
                let node = host.new_comment(&format!("portal:{target}"));
                host.attach(current, node);
                portal_saved.push(current);
                current = host
                    .inner
                    .borrow()
                    .portals
                    .get(target)
                    .copied()
                    .unwrap_or(NO_NODE);
            }
            RenderOp::PortalEnd => {
                current = portal_saved.pop().unwrap_or(parent);
                let node = host.new_comment("/portal");
                host.attach(current, node);
            }
            RenderOp::SuspenseStart { name } => {
                let node = host.new_comment(&format!("suspense:start {name}"));
                host.attach(current, node);
            }
            RenderOp::SuspenseFallback => {
                let node = host.new_comment("suspense:fallback");
                host.attach(current, node);
            }
            RenderOp::SuspenseEnd => {
                let node = host.new_comment("/suspense");
                host.attach(current, node);
            }
        }
    }
}
