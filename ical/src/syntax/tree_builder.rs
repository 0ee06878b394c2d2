// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Tree builder for constructing component hierarchy from content lines.
//!
//! ```text
//! Content Lines → Tree Builder → Component Tree
//! ```
//!
//! The tree builder uses a stack-based algorithm:
//! 1. On BEGIN:X, push a new component onto the stack
//! 2. On property, add to the current component (top of stack)
//! 3. On END:X, pop from stack and add to parent component

use std::ops::Range;

use crate::component::Component;
use crate::keyword::{KW_BEGIN, KW_END};
use crate::syntax::scanner::ContentLine;

/// Errors raised while nesting content lines into components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// `BEGIN:` or `END:` without a component name
    #[error("missing component name")]
    EmptyComponentName {
        /// Span of the offending line
        span: Range<usize>,
    },

    /// A property outside of any component
    #[error("property '{name}' outside of any component")]
    PropertyOutsideComponent {
        /// Property name
        name: String,
        /// Span of the offending line
        span: Range<usize>,
    },

    /// `END:X` while another component is open
    #[error("expected END:{expected}, found END:{found}")]
    MismatchedEnd {
        /// The open component
        expected: String,
        /// The component being closed
        found: String,
        /// Span of the END line
        span: Range<usize>,
    },

    /// `END:X` with nothing open
    #[error("END:{name} without matching BEGIN")]
    UnexpectedEnd {
        /// The component being closed
        name: String,
        /// Span of the END line
        span: Range<usize>,
    },

    /// Input ended while a component was still open
    #[error("component {name} is never closed")]
    Unclosed {
        /// The open component
        name: String,
        /// Span of its BEGIN line
        span: Range<usize>,
    },
}

impl TreeError {
    /// Byte range of the error in the source.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        match self {
            Self::EmptyComponentName { span }
            | Self::PropertyOutsideComponent { span, .. }
            | Self::MismatchedEnd { span, .. }
            | Self::UnexpectedEnd { span, .. }
            | Self::Unclosed { span, .. } => span.clone(),
        }
    }
}

/// Build top-level components from scanned content lines.
///
/// # Errors
///
/// Returns the first nesting error encountered.
pub fn build_tree(lines: Vec<ContentLine>) -> Result<Vec<Component>, TreeError> {
    let mut roots = Vec::new();
    let mut stack: Vec<(Component, Range<usize>)> = Vec::new();

    for ContentLine { property, span } in lines {
        if property.is(KW_BEGIN) {
            let name = property.value.trim();
            if name.is_empty() {
                return Err(TreeError::EmptyComponentName { span });
            }
            stack.push((Component::new(name), span));
        } else if property.is(KW_END) {
            let name = property.value.trim();
            if name.is_empty() {
                return Err(TreeError::EmptyComponentName { span });
            }
            let Some((component, _)) = stack.pop() else {
                return Err(TreeError::UnexpectedEnd {
                    name: name.to_string(),
                    span,
                });
            };
            if !component.is(name) {
                return Err(TreeError::MismatchedEnd {
                    expected: component.name,
                    found: name.to_string(),
                    span,
                });
            }
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(component),
                None => roots.push(component),
            }
        } else {
            match stack.last_mut() {
                Some((current, _)) => current.properties.push(property),
                None => {
                    return Err(TreeError::PropertyOutsideComponent {
                        name: property.name,
                        span,
                    });
                }
            }
        }
    }

    if let Some((component, span)) = stack.pop() {
        return Err(TreeError::Unclosed {
            name: component.name,
            span,
        });
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::tokenize;
    use crate::syntax::scanner::scan_content_lines;

    fn build(src: &str) -> Result<Vec<Component>, TreeError> {
        build_tree(scan_content_lines(src, tokenize(src)).unwrap())
    }

    #[test]
    fn builds_nested_components() {
        let src = "\
BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:1\r
BEGIN:VALARM\r
ACTION:DISPLAY\r
END:VALARM\r
END:VEVENT\r
BEGIN:VTODO\r
UID:2\r
END:VTODO\r
END:VCALENDAR\r
";
        let roots = build(src).unwrap();
        assert_eq!(roots.len(), 1);
        let cal = &roots[0];
        assert_eq!(cal.name, "VCALENDAR");
        assert_eq!(cal.properties.len(), 1);
        assert_eq!(cal.children.len(), 2);
        assert_eq!(cal.children[0].children[0].name, "VALARM");
        assert_eq!(cal.children[1].name, "VTODO");
    }

    #[test]
    fn end_matches_case_insensitively() {
        let roots = build("BEGIN:vcalendar\r\nend:VCALENDAR\r\n").unwrap();
        assert_eq!(roots[0].name, "vcalendar");
    }

    #[test]
    fn rejects_unbalanced_input() {
        assert!(matches!(
            build("BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nEND:VCALENDAR\r\n"),
            Err(TreeError::MismatchedEnd { .. })
        ));
        assert!(matches!(
            build("END:VEVENT\r\n"),
            Err(TreeError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            build("BEGIN:VCALENDAR\r\n"),
            Err(TreeError::Unclosed { .. })
        ));
        assert!(matches!(
            build("UID:1\r\n"),
            Err(TreeError::PropertyOutsideComponent { .. })
        ));
        assert!(matches!(
            build("BEGIN:\r\n"),
            Err(TreeError::EmptyComponentName { .. })
        ));
    }
}
