//! Render Program - Linear op form of a template plan.
//!
//! The builder walks a plan's static parts, lexing tags, comments and
//! text runs into a flat op vector with a `dynamic_text` op wedged
//! between consecutive parts. Both interpreters execute this same
//! program: mount realizes it through host calls, hydrate verifies an
//! existing tree against it. Hydration ids number the elements in
//! document order, starting at 1.

use crate::error::RenderError;
use crate::marker::{self, Marker};
use crate::template::TemplatePlan;

// =============================================================================
// TYPES
// =============================================================================

/// One render instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    OpenElement { tag: String, hydration_id: u32 },
    CloseElement { tag: String },
    SelfElement { tag: String, hydration_id: u32 },
    Text { literal: String },
    DynamicText { slot: usize },
    IslandStart { name: String },
    IslandEnd,
    PortalStart { target: String },
    PortalEnd,
    SuspenseStart { name: String },
    SuspenseFallback,
    SuspenseEnd,
}

/// A built program. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderProgram {
    pub ops: Vec<RenderOp>,
    pub max_hydration_id: u32,
}

impl RenderProgram {
    /// Number of dynamic text slots the program consumes.
    pub fn dynamic_slot_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, RenderOp::DynamicText { .. }))
            .count()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Build the op program for a plan.
pub fn build_program(plan: &TemplatePlan) -> Result<RenderProgram, RenderError> {
    let mut builder = Builder {
        ops: Vec::new(),
        tag_stack: Vec::new(),
        next_hydration_id: 1,
    };

    for (index, part) in plan.static_parts.iter().enumerate() {
        builder.parse_static(part)?;
        if index < plan.placeholders.len() {
            builder.ops.push(RenderOp::DynamicText { slot: index });
        }
    }

    if let Some(open) = builder.tag_stack.last() {
        return Err(RenderError::InvalidMarkup(format!("unclosed <{open}>")));
    }

    Ok(RenderProgram {
        max_hydration_id: builder.next_hydration_id - 1,
        ops: builder.ops,
    })
}

struct Builder {
    ops: Vec<RenderOp>,
    tag_stack: Vec<String>,
    next_hydration_id: u32,
}

impl Builder {
    fn parse_static(&mut self, part: &str) -> Result<(), RenderError> {
        let bytes = part.as_bytes();
        let mut i = 0;
        let mut text_start = 0;

        while i < bytes.len() {
            if bytes[i] != b'<' {
                i += 1;
                continue;
            }
            self.flush_text(&part[text_start..i]);

            if part[i..].starts_with("<!--") {
                i = self.parse_comment(part, i)?;
            } else if bytes.get(i + 1) == Some(&b'/') {
                i = self.parse_close(part, i)?;
            } else {
                i = self.parse_open(part, i)?;
            }
            text_start = i;
        }

        self.flush_text(&part[text_start..]);
        Ok(())
    }

    fn flush_text(&mut self, run: &str) {
        if !run.is_empty() {
            self.ops.push(RenderOp::Text {
                literal: run.to_string(),
            });
        }
    }

    /// Consume `<!-- … -->` starting at `start`. Marker comments emit
    /// their op; anything else is dropped.
    fn parse_comment(&mut self, part: &str, start: usize) -> Result<usize, RenderError> {
        let body_start = start + 4;
        let end = part[body_start..]
            .find("-->")
            .ok_or_else(|| RenderError::InvalidMarkup("unterminated comment".into()))?;
        let body = &part[body_start..body_start + end];

        match marker::parse(body) {
            Some(Marker::IslandStart(name)) => self.ops.push(RenderOp::IslandStart { name }),
            Some(Marker::IslandEnd) => self.ops.push(RenderOp::IslandEnd),
            Some(Marker::PortalStart(target)) => {
                self.ops.push(RenderOp::PortalStart { target })
            }
            Some(Marker::PortalEnd) => self.ops.push(RenderOp::PortalEnd),
            Some(Marker::SuspenseStart(name)) => {
                self.ops.push(RenderOp::SuspenseStart { name })
            }
            Some(Marker::SuspenseFallback) => self.ops.push(RenderOp::SuspenseFallback),
            Some(Marker::SuspenseEnd) => self.ops.push(RenderOp::SuspenseEnd),
            None => {}
        }

        Ok(body_start + end + 3)
    }

    /// Consume `</tag>` starting at `start`.
    fn parse_close(&mut self, part: &str, start: usize) -> Result<usize, RenderError> {
        let (tag, mut i) = read_tag_name(part, start + 2)?;
        let bytes = part.as_bytes();
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        if bytes.get(i) != Some(&b'>') {
            return Err(RenderError::InvalidMarkup(format!(
                "malformed closing tag </{tag}"
            )));
        }

        match self.tag_stack.pop() {
            Some(open) if open == tag => {
                self.ops.push(RenderOp::CloseElement { tag });
                Ok(i + 1)
            }
            Some(open) => Err(RenderError::InvalidMarkup(format!(
                "expected </{open}>, found </{tag}>"
            ))),
            None => Err(RenderError::InvalidMarkup(format!(
                "</{tag}> without an open tag"
            ))),
        }
    }

    /// Consume `<tag …>` or `<tag …/>` starting at `start`. Attribute
    /// text is skipped; quotes only matter for hiding a `>`.
    fn parse_open(&mut self, part: &str, start: usize) -> Result<usize, RenderError> {
        let (tag, mut i) = read_tag_name(part, start + 1)?;
        let bytes = part.as_bytes();
        let mut quote: Option<u8> = None;

        loop {
            let Some(&b) = bytes.get(i) else {
                return Err(RenderError::InvalidMarkup(format!("unterminated <{tag}")));
            };
            match quote {
                Some(q) => {
                    if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'>' => break,
                    _ => {}
                },
            }
            i += 1;
        }

        let self_closing = i > start + 1 && bytes[i - 1] == b'/' && quote.is_none();
        let hydration_id = self.next_hydration_id;
        self.next_hydration_id += 1;

        if self_closing {
            self.ops.push(RenderOp::SelfElement { tag, hydration_id });
        } else {
            self.tag_stack.push(tag.clone());
            self.ops.push(RenderOp::OpenElement { tag, hydration_id });
        }
        Ok(i + 1)
    }
}

/// Read a tag name (alphanumerics, `-`, `:`) at `start`. Empty names
/// mean the `<` did not begin a tag.
fn read_tag_name(part: &str, start: usize) -> Result<(String, usize), RenderError> {
    let bytes = part.as_bytes();
    let mut end = start;
    while bytes
        .get(end)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b':')
    {
        end += 1;
    }
    if end == start {
        return Err(RenderError::InvalidMarkup("unexpected '<'".into()));
    }
    Ok((part[start..end].to_string(), end))
}

// =============================================================================
// Tests
// =============================================================================
