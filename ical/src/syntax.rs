// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Syntax analysis for iCalendar text.
//!
//! ```text
//! Source Text → Lexer → Scanner → Tree Builder → Components
//! ```

pub mod lexer;
pub mod scanner;
pub mod tree_builder;

use std::ops::Range;

pub use lexer::{SpannedToken, Token, tokenize};
pub use scanner::{ContentLine, ContentLineError, scan_content_lines};
pub use tree_builder::{TreeError, build_tree};

use crate::component::Component;

/// Runs the full syntax pipeline over the source text.
///
/// # Errors
///
/// Returns a [`SyntaxError`] if a content line is malformed or components are
/// not balanced.
pub fn syntax_analysis(src: &str) -> Result<Vec<Component>, SyntaxError> {
    let lines = scan_content_lines(src, tokenize(src))?;
    Ok(build_tree(lines)?)
}

/// Error from syntax analysis
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// A content line could not be scanned
    #[error(transparent)]
    ContentLine(#[from] ContentLineError),

    /// Components are not properly nested
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl SyntaxError {
    /// Byte range of the error in the source.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        match self {
            Self::ContentLine(e) => e.span(),
            Self::Tree(e) => e.span(),
        }
    }
}
