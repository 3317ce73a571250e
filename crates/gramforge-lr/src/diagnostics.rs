//! Normalizes error-kind tree nodes into the uniform [Diagnostic] shape
//! (spec.md §4.4b, §7), one diagnostic per error node, with a short message
//! excerpting the skipped text rather than a generic placeholder.

use crate::parser::error_node_ranges;
use gramforge_core::syntax_tree::SyntaxNode;
use gramforge_core::{ByteRange, Diagnostic};

const SNIPPET_MAX: usize = 40;

/// Produces one [Diagnostic] per error-kind node found in `root`, pulling
/// the offending text out of `source` for the message.
pub fn error_diagnostics(root: &SyntaxNode, source: &str) -> Vec<Diagnostic> {
  error_node_ranges(root).into_iter().map(|range| Diagnostic::parse_error(describe(source, range), range.offset, range.len().max(1))).collect()
}

fn describe(source: &str, range: ByteRange) -> String {
  let text = source.get(range.as_range()).unwrap_or("");
  let trimmed = text.trim();
  let snippet = if trimmed.chars().count() > SNIPPET_MAX {
    let truncated: String = trimmed.chars().take(SNIPPET_MAX).collect();
    format!("{truncated}…")
  } else {
    trimmed.to_string()
  };
  if snippet.is_empty() {
    "unexpected input".to_string()
  } else {
    format!("unexpected input: '{snippet}'")
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use gramforge_core::grammar_index::{ERROR_KIND, ROOT_KIND};
  use gramforge_core::syntax_tree::TreeBuilder;

  #[test]
  fn describes_skipped_text() {
    let mut b = TreeBuilder::new();
    b.start_node(ROOT_KIND);
    b.start_node(ERROR_KIND);
    b.token(ERROR_KIND, "@@@");
    b.finish_node();
    b.finish_node();
    let root = SyntaxNode::new_root(b.finish());
    let diags = error_diagnostics(&root, "@@@");
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("@@@"));
  }
}
