//! Hydrate Interpreter - Attach a program to a server-rendered tree.
//!
//! Walks the children of a previously rendered parent through the
//! hydration host, checking each op against what the server emitted:
//! element tags and `data-hid` stamps, static text content, marker
//! comments. Nothing is created; the result references the server's own
//! nodes, so bindings attach to the text nodes already on screen.
//!
//! Comments are skipped when consuming elements and text, but a marker
//! op requires its comment right at the cursor.

use crate::error::RenderError;
use crate::host::{
    with_hydration_host, with_mount_host, HydrationHost, NodeId, NodeType, NO_NODE,
};
use crate::marker::{self, Marker};
use crate::mount::{IslandRecord, MountResult, PortalRecord, SuspenseRecord};
use crate::program::{RenderOp, RenderProgram};

// =============================================================================
// Hydrate
// =============================================================================

/// Attach `program` to the already-rendered children of `parent`.
pub fn hydrate(program: &RenderProgram, parent: NodeId) -> Result<MountResult, RenderError> {
    with_hydration_host(|host| hydrate_in(host, program, parent))
}

/// Cursor over one parent's child list.
struct Frame {
    node: NodeId,
    /// Tag this frame was opened for; empty for the root and portals.
    tag: String,
    cursor: Option<NodeId>,
    is_portal: bool,
}

struct SuspenseFrame {
    name: String,
    main_start: usize,
    main_end: usize,
    fallback_start: usize,
    has_fallback: bool,
}

fn hydrate_in(
    host: &mut dyn HydrationHost,
    program: &RenderProgram,
    parent: NodeId,
) -> Result<MountResult, RenderError> {
    let mut result = MountResult::default();
    let hid_len = program.max_hydration_id as usize + 1;
    result.hydration_nodes.try_reserve_exact(hid_len)?;
    result.hydration_nodes.resize(hid_len, NO_NODE);

    let root_cursor = host.first_child(parent);
    let mut frames = vec![Frame {
        node: parent,
        tag: String::new(),
        cursor: root_cursor,
        is_portal: false,
    }];
    let mut islands: Vec<(String, NodeId, usize)> = Vec::new();
    let mut portals: Vec<(String, NodeId, usize)> = Vec::new();
    let mut suspense: Vec<SuspenseFrame> = Vec::new();

    for op in &program.ops {
        match op {
            RenderOp::OpenElement { tag, hydration_id } => {
                let node = match_element(host, top(&mut frames), tag, *hydration_id)?;
                result.hydration_nodes[*hydration_id as usize] = node;
                let cursor = host.first_child(node);
                frames.push(Frame {
                    node,
                    tag: tag.clone(),
                    cursor,
                    is_portal: false,
                });
            }
            RenderOp::SelfElement { tag, hydration_id } => {
                let node = match_element(host, top(&mut frames), tag, *hydration_id)?;
                result.hydration_nodes[*hydration_id as usize] = node;
            }
            RenderOp::CloseElement { tag } => {
                if frames.len() <= 1 {
                    return Err(RenderError::StackUnderflow);
                }
                let frame = frames.pop().expect("frame stack is non-empty");
                if frame.tag != *tag {
                    return Err(RenderError::HydrationMismatch(format!(
                        "closing </{}> over <{}>",
                        tag, frame.tag
                    )));
                }
            }
            RenderOp::Text { literal } => {
                if literal.is_empty() {
                    continue;
                }
                let node = next_structural(host, top(&mut frames))?;
                if host.node_type(node) != NodeType::Text {
                    return Err(RenderError::UnexpectedNode("expected text".into()));
                }
                let content = host.text_content(node);
                if content != *literal {
                    return Err(RenderError::HydrationMismatch(format!(
                        "static text {content:?} does not match {literal:?}"
                    )));
                }
            }
            RenderOp::DynamicText { .. } => {
                let node = next_structural(host, top(&mut frames))?;
                if host.node_type(node) != NodeType::Text {
                    return Err(RenderError::UnexpectedNode(
                        "expected dynamic text".into(),
                    ));
                }
                // Server-rendered content is taken as-is.
                result.dynamic_nodes.push(node);
            }
            RenderOp::IslandStart { name } => {
                expect_marker(host, top(&mut frames), &Marker::IslandStart(name.clone()))?;
                let parent_node = frames.last().map(|f| f.node).unwrap_or(parent);
                islands.push((name.clone(), parent_node, result.dynamic_nodes.len()));
            }
            RenderOp::IslandEnd => {
                expect_marker(host, top(&mut frames), &Marker::IslandEnd)?;
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
                expect_marker(host, top(&mut frames), &Marker::PortalStart(target.clone()))?;
                let node = with_mount_host(|mount| mount.resolve_portal(target));
                if node == NO_NODE {
                    return Err(RenderError::MissingNode(target.clone()));
                }
                portals.push((target.clone(), node, result.dynamic_nodes.len()));
                let cursor = host.first_child(node);
                frames.push(Frame {
                    node,
                    tag: String::new(),
                    cursor,
                    is_portal: true,
                });
            }
            RenderOp::PortalEnd => {
                if frames.pop().filter(|f| f.is_portal).is_none() {
                    return Err(RenderError::InvalidMarkup(
                        "portal end without start".into(),
                    ));
                }
                // The close marker sits back in the outer flow.
                expect_marker(host, top(&mut frames), &Marker::PortalEnd)?;
                let (target, node, start) = portals
                    .pop()
                    .ok_or_else(|| RenderError::InvalidMarkup("portal end without start".into()))?;
                result.portals.push(PortalRecord {
                    target,
                    node,
                    start_slot: start,
                    end_slot: result.dynamic_nodes.len(),
                });
            }
            RenderOp::SuspenseStart { name } => {
                expect_marker(host, top(&mut frames), &Marker::SuspenseStart(name.clone()))?;
                suspense.push(SuspenseFrame {
                    name: name.clone(),
                    main_start: result.dynamic_nodes.len(),
                    main_end: 0,
                    fallback_start: 0,
                    has_fallback: false,
                });
            }
            RenderOp::SuspenseFallback => {
                expect_marker(host, top(&mut frames), &Marker::SuspenseFallback)?;
                let frame = suspense.last_mut().ok_or_else(|| {
                    RenderError::InvalidMarkup("suspense fallback without start".into())
                })?;
                frame.main_end = result.dynamic_nodes.len();
                frame.fallback_start = result.dynamic_nodes.len();
                frame.has_fallback = true;
            }
            RenderOp::SuspenseEnd => {
                expect_marker(host, top(&mut frames), &Marker::SuspenseEnd)?;
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

    if frames.len() != 1 {
        return Err(RenderError::InvalidMarkup(
            "unclosed structure at end of program".into(),
        ));
    }
    if !islands.is_empty() || !portals.is_empty() || !suspense.is_empty() {
        return Err(RenderError::InvalidMarkup(
            "unclosed structure at end of program".into(),
        ));
    }
    Ok(result)
}

fn top(frames: &mut [Frame]) -> &mut Frame {
    frames.last_mut().expect("frame stack is non-empty")
}

/// Take the next child, whatever it is.
fn take_next(host: &mut dyn HydrationHost, frame: &mut Frame) -> Option<NodeId> {
    let node = frame.cursor?;
    frame.cursor = host.next_sibling(node);
    Some(node)
}

/// Take the next non-comment child.
fn next_structural(
    host: &mut dyn HydrationHost,
    frame: &mut Frame,
) -> Result<NodeId, RenderError> {
    loop {
        let node = take_next(host, frame)
            .ok_or_else(|| RenderError::MissingNode("ran out of children".into()))?;
        if host.node_type(node) != NodeType::Comment {
            return Ok(node);
        }
    }
}

/// The next child must be a comment carrying exactly `expected`.
fn expect_marker(
    host: &mut dyn HydrationHost,
    frame: &mut Frame,
    expected: &Marker,
) -> Result<(), RenderError> {
    let node = take_next(host, frame)
        .ok_or_else(|| RenderError::MissingNode("ran out of children".into()))?;
    if host.node_type(node) != NodeType::Comment {
        return Err(RenderError::UnexpectedNode("expected marker comment".into()));
    }
    let body = host.comment_text(node);
    match marker::parse(&body) {
        Some(found) if found == *expected => Ok(()),
        _ => Err(RenderError::HydrationMismatch(format!(
            "marker {body:?} does not match {expected:?}"
        ))),
    }
}

/// The next structural child must be an element with this tag and
/// hydration id.
fn match_element(
    host: &mut dyn HydrationHost,
    frame: &mut Frame,
    tag: &str,
    hydration_id: u32,
) -> Result<NodeId, RenderError> {
    let node = next_structural(host, frame)?;
    if host.node_type(node) != NodeType::Element {
        return Err(RenderError::UnexpectedNode(format!("expected <{tag}>")));
    }
    let found_tag = host.tag_name(node);
    if found_tag != tag {
        return Err(RenderError::HydrationMismatch(format!(
            "expected <{tag}>, found <{found_tag}>"
        )));
    }
    let expected_hid = hydration_id.to_string();
    match host.get_attribute(node, "data-hid") {
        Some(found) if found == expected_hid => Ok(node),
        Some(found) => Err(RenderError::HydrationMismatch(format!(
            "<{tag}> carries data-hid {found:?}, expected {expected_hid:?}"
        ))),
        None => Err(RenderError::HydrationMismatch(format!(
            "<{tag}> is missing data-hid"
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ssr_render, MockHost};
    use crate::mount::mount;
    use crate::program::build_program;
    use crate::template::compile;
    use pretty_assertions::assert_eq;

    fn program(source: &str) -> RenderProgram {
        build_program(&compile(source).unwrap()).unwrap()
    }

    fn teardown() {
        crate::host::reset_mount_host();
        crate::host::reset_hydration_host();
    }

    #[test]
    fn test_hydrates_server_tree() {
        let host = MockHost::new();
        host.install();

        let p = program("<!--island:hero--><div>Hello {{name}}</div><!--/island-->");
        ssr_render(&host, &p, host.root(), &["Ripple"]);

        let result = hydrate(&p, host.root()).unwrap();

        // The dynamic slot points at the server's own text node.
        assert_eq!(result.dynamic_nodes.len(), 1);
        assert_eq!(host.content_of(result.dynamic_nodes[0]), "Ripple");

        let div = result.node_for_hydration_id(1).unwrap();
        assert_eq!(host.tag_of(div).as_deref(), Some("div"));
        assert_eq!(
            result.islands,
            [IslandRecord {
                name: "hero".into(),
                parent: host.root(),
                start_slot: 0,
                end_slot: 1,
            }]
        );

        teardown();
    }

    #[test]
    fn test_mount_and_hydrate_agree() {
        // Mount into one tree, server-render another, hydrate it, and
        // compare the bookkeeping shape.
        let source = "<!--island:card--><section><h1>{{ title }}</h1>\
                      <!--suspense:start feed--><p>{{ body }}</p>\
                      <!--suspense:fallback--><p>loading</p><!--/suspense-->\
                      </section><!--/island-->";
        let p = program(source);
        let values = ["Hi", "text"];

        let mounted_host = MockHost::new();
        mounted_host.install();
        let mounted = mount(&p, mounted_host.root(), &values).unwrap();

        let ssr_host = MockHost::new();
        ssr_host.install();
        ssr_render(&ssr_host, &p, ssr_host.root(), &values);
        let hydrated = hydrate(&p, ssr_host.root()).unwrap();

        assert_eq!(mounted.dynamic_nodes.len(), hydrated.dynamic_nodes.len());
        assert_eq!(
            mounted.hydration_nodes.len(),
            hydrated.hydration_nodes.len()
        );
        assert_eq!(mounted.suspense, hydrated.suspense);
        assert_eq!(mounted.islands.len(), hydrated.islands.len());
        assert_eq!(mounted.islands[0].name, hydrated.islands[0].name);
        assert_eq!(
            mounted.islands[0].start_slot..mounted.islands[0].end_slot,
            hydrated.islands[0].start_slot..hydrated.islands[0].end_slot
        );

        // Same tag behind every hydration id on both sides.
        for hid in 1..=p.max_hydration_id {
            let mounted_tag = mounted_host.tag_of(mounted.node_for_hydration_id(hid).unwrap());
            let hydrated_tag = ssr_host.tag_of(hydrated.node_for_hydration_id(hid).unwrap());
            assert_eq!(mounted_tag, hydrated_tag);
        }

        teardown();
    }

    #[test]
    fn test_tag_mismatch() {
        let host = MockHost::new();
        host.install();

        let div = host.new_element("div");
        host.put_attribute(div, "data-hid", "1");
        host.attach(host.root(), div);

        let p = program("<span></span>");
        assert!(matches!(
            hydrate(&p, host.root()),
            Err(RenderError::HydrationMismatch(_))
        ));

        teardown();
    }

    #[test]
    fn test_wrong_hydration_id() {
        let host = MockHost::new();
        host.install();

        let div = host.new_element("div");
        host.put_attribute(div, "data-hid", "7");
        host.attach(host.root(), div);

        let p = program("<div></div>");
        assert!(matches!(
            hydrate(&p, host.root()),
            Err(RenderError::HydrationMismatch(_))
        ));

        teardown();
    }

    #[test]
    fn test_missing_child() {
        let host = MockHost::new();
        host.install();

        let p = program("<div></div>");
        assert!(matches!(
            hydrate(&p, host.root()),
            Err(RenderError::MissingNode(_))
        ));

        teardown();
    }

    #[test]
    fn test_static_text_must_match() {
        let host = MockHost::new();
        host.install();

        let div = host.new_element("div");
        host.put_attribute(div, "data-hid", "1");
        host.attach(host.root(), div);
        let text = host.new_text("goodbye");
        host.attach(div, text);

        let p = program("<div>hello</div>");
        assert!(matches!(
            hydrate(&p, host.root()),
            Err(RenderError::HydrationMismatch(_))
        ));

        teardown();
    }

    #[test]
    fn test_element_where_text_expected() {
        let host = MockHost::new();
        host.install();

        let div = host.new_element("div");
        host.put_attribute(div, "data-hid", "1");
        host.attach(host.root(), div);
        let stray = host.new_element("b");
        host.attach(div, stray);

        let p = program("<div>hello</div>");
        assert!(matches!(
            hydrate(&p, host.root()),
            Err(RenderError::UnexpectedNode(_))
        ));

        teardown();
    }

    #[test]
    fn test_marker_content_must_match() {
        let host = MockHost::new();
        host.install();

        let comment = host.new_comment("island:other");
        host.attach(host.root(), comment);

        let p = program("<!--island:hero--><!--/island-->");
        assert!(matches!(
            hydrate(&p, host.root()),
            Err(RenderError::HydrationMismatch(_))
        ));

        teardown();
    }

    #[test]
    fn test_ordinary_comments_are_skipped() {
        let host = MockHost::new();
        host.install();

        let note = host.new_comment("rendered by ripple-ssr");
        host.attach(host.root(), note);
        let div = host.new_element("div");
        host.put_attribute(div, "data-hid", "1");
        host.attach(host.root(), div);

        let p = program("<div></div>");
        let result = hydrate(&p, host.root()).unwrap();
        assert_eq!(result.node_for_hydration_id(1), Some(div));

        teardown();
    }

    #[test]
    fn test_portal_hydrates_target_children() {
        let host = MockHost::new();
        host.install();
        let overlay = host.new_element("aside");
        host.register_portal("overlay", overlay);

        let p = program("<!--portal:overlay--><p>{{ msg }}</p><!--/portal-->");
        ssr_render(&host, &p, host.root(), &["floating"]);

        let result = hydrate(&p, host.root()).unwrap();
        assert_eq!(result.dynamic_nodes.len(), 1);
        assert_eq!(host.content_of(result.dynamic_nodes[0]), "floating");
        assert_eq!(result.portals.len(), 1);
        assert_eq!(result.portals[0].node, overlay);

        teardown();
    }
}
