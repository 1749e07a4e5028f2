//! Template Compiler - Static/dynamic segmentation of markup literals.
//!
//! A template is static markup with `{{ name }}` placeholders. Compiling
//! splits it at placeholder boundaries: N placeholders yield N+1 static
//! parts, and the parts interleave with dynamic values at render time.
//! The split is purely lexical; tag structure is checked later by the
//! program builder.
//!
//! # Example
//!
//! ```ignore
//! use ripple::template::compile;
//!
//! let plan = compile("<li>{{ label }}</li>").unwrap();
//! assert_eq!(plan.placeholder_count(), 1);
//! assert_eq!(plan.render(&["Inbox"]).unwrap(), "<li>Inbox</li>");
//! ```

use crate::error::RenderError;

// =============================================================================
// TemplatePlan
// =============================================================================

/// The compiled form of a template literal.
///
/// `static_parts.len() == placeholders.len() + 1` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePlan {
    pub static_parts: Vec<String>,
    pub placeholders: Vec<String>,
}

impl TemplatePlan {
    /// Number of dynamic slots.
    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Concatenate static parts and `values` in order.
    pub fn render(&self, values: &[&str]) -> Result<String, RenderError> {
        if values.len() != self.placeholders.len() {
            return Err(RenderError::MismatchedValues);
        }
        let capacity = self.static_parts.iter().map(String::len).sum::<usize>()
            + values.iter().map(|v| v.len()).sum::<usize>();
        let mut out = String::with_capacity(capacity);
        for (index, part) in self.static_parts.iter().enumerate() {
            out.push_str(part);
            if let Some(value) = values.get(index) {
                out.push_str(value);
            }
        }
        Ok(out)
    }
}

// =============================================================================
// Compile
// =============================================================================

/// Compile a template literal into its plan.
///
/// Placeholders open with `{{` and close at the nearest `}}`; names are
/// trimmed of ASCII whitespace. An unclosed placeholder, a stray `}}`
/// or a lone `{` in static text fails with `InvalidMarkup`.
pub fn compile(source: &str) -> Result<TemplatePlan, RenderError> {
    let mut static_parts = Vec::new();
    let mut placeholders = Vec::new();
    let mut cursor = 0;

    while let Some(open) = source[cursor..].find("{{") {
        let open = cursor + open;
        let part = &source[cursor..open];
        check_static(part)?;
        static_parts.push(part.to_string());

        let body_start = open + 2;
        let close = source[body_start..]
            .find("}}")
            .ok_or_else(|| RenderError::InvalidMarkup("unclosed placeholder".into()))?;
        let name = source[body_start..body_start + close]
            .trim_matches(|c: char| c.is_ascii_whitespace());
        if name.contains('{') || name.contains('}') {
            return Err(RenderError::InvalidMarkup(format!(
                "malformed placeholder {name:?}"
            )));
        }
        placeholders.push(name.to_string());
        cursor = body_start + close + 2;
    }

    let tail = &source[cursor..];
    check_static(tail)?;
    static_parts.push(tail.to_string());

    Ok(TemplatePlan {
        static_parts,
        placeholders,
    })
}

/// Static text may not contain placeholder braces: a `}}` has no opener
/// here, and a `{` is a placeholder that never formed.
fn check_static(part: &str) -> Result<(), RenderError> {
    if part.contains("}}") {
        return Err(RenderError::InvalidMarkup(
            "placeholder close without open".into(),
        ));
    }
    if part.contains('{') {
        return Err(RenderError::InvalidMarkup(
            "stray '{' outside placeholder".into(),
        ));
    }
    Ok(())
}

// =============================================================================
// Call-site cache
// =============================================================================

/// Compile a template once per call site and reuse the plan.
///
/// The literal is parsed on first evaluation and cached in a
/// thread-local cell, so repeated renders of the same template skip the
/// scan. An invalid literal panics on first use.
#[macro_export]
macro_rules! template {
    ($source:expr) => {{
        std::thread_local! {
            static PLAN: std::cell::OnceCell<std::rc::Rc<$crate::template::TemplatePlan>> =
                const { std::cell::OnceCell::new() };
        }
        PLAN.with(|cell| {
            std::rc::Rc::clone(cell.get_or_init(|| {
                std::rc::Rc::new(
                    $crate::template::compile($source).expect("template failed to compile"),
                )
            }))
        })
    }};
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_split_two_placeholders() {
        let plan =
            compile("<div class=\"greeting\">Hello {{ name }}! {{title}}</div>").unwrap();

        assert_eq!(plan.placeholder_count(), 2);
        assert_eq!(
            plan.static_parts,
            ["<div class=\"greeting\">Hello ", "! ", "</div>"]
        );
        assert_eq!(plan.placeholders, ["name", "title"]);
    }

    #[test]
    fn test_no_placeholders() {
        let plan = compile("<br/>").unwrap();
        assert_eq!(plan.static_parts, ["<br/>"]);
        assert!(plan.placeholders.is_empty());
    }

    #[test]
    fn test_unclosed_placeholder() {
        assert!(matches!(
            compile("<p>{{ name </p>"),
            Err(RenderError::InvalidMarkup(_))
        ));
    }

    #[test]
    fn test_stray_close() {
        assert!(matches!(
            compile("<p>oops }} here</p>"),
            Err(RenderError::InvalidMarkup(_))
        ));
    }

    #[test]
    fn test_lone_open_brace() {
        assert!(matches!(
            compile("<p>a { b</p>"),
            Err(RenderError::InvalidMarkup(_))
        ));
    }

    #[test]
    fn test_render_interleaves() {
        let plan = compile("Hello {{ name }}, welcome to {{ place }}.").unwrap();
        assert_eq!(
            plan.render(&["Ada", "the machine room"]).unwrap(),
            "Hello Ada, welcome to the machine room."
        );
    }

    #[test]
    fn test_render_count_mismatch() {
        let plan = compile("{{ a }}-{{ b }}").unwrap();
        assert_eq!(plan.render(&["x"]), Err(RenderError::MismatchedValues));
        assert_eq!(
            plan.render(&["x", "y", "z"]),
            Err(RenderError::MismatchedValues)
        );
    }

    #[test]
    fn test_macro_caches_per_call_site() {
        let first = template!("<b>{{ v }}</b>");
        let second = template!("<b>{{ v }}</b>");
        assert!(std::rc::Rc::ptr_eq(&first, &second));
    }

    proptest! {
        /// Splitting then rendering reproduces the interleaving exactly.
        #[test]
        fn prop_round_trip(
            parts in proptest::collection::vec("[a-zA-Z0-9 <>/=\"-]*", 1..6),
            names in proptest::collection::vec("[a-z][a-z0-9_]{0,8}", 0..5),
            values in proptest::collection::vec("[a-zA-Z0-9 ]*", 0..5),
        ) {
            let n = names.len().min(parts.len() - 1).min(values.len());
            let mut source = String::new();
            for (i, part) in parts.iter().take(n + 1).enumerate() {
                source.push_str(part);
                if i < n {
                    source.push_str("{{ ");
                    source.push_str(&names[i]);
                    source.push_str(" }}");
                }
            }

            let plan = compile(&source).unwrap();
            prop_assert_eq!(plan.placeholder_count(), n);
            prop_assert_eq!(plan.static_parts.len(), n + 1);

            let value_refs: Vec<&str> =
                values.iter().take(n).map(String::as_str).collect();
            let rendered = plan.render(&value_refs).unwrap();

            let mut expected = String::new();
            for (i, part) in plan.static_parts.iter().enumerate() {
                expected.push_str(part);
                if i < n {
                    expected.push_str(value_refs[i]);
                }
            }
            prop_assert_eq!(rendered, expected);
        }
    }
}
