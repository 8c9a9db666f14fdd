//! The syntax-highlighting seam.
//!
//! The buffer only ferries bytes to a highlighter and spans back to the
//! renderer; what a style means is none of the core's business. Concrete
//! integrations (tree-sitter and friends) implement [`Highlighter`]
//! outside this crate.

use quill_core::position::Position;

/// A styled region over the raw byte stream of a document, in row/column
/// coordinates. The style name is passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
  pub start: Position,
  pub end:   Position,
  pub style: String,
}

/// Produces style spans for a document's bytes.
pub trait Highlighter: Send + Sync {
  fn highlights(&self, source: &[u8]) -> Vec<HighlightSpan>;
}
