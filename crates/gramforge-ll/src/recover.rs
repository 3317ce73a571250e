//! Panic-mode error recovery for the interpreted backend.
//!
//! Recovery is the one thing the interpreted backend does that the
//! compiled backend's generated tables don't need: when a production
//! fails to match, skip tokens until one in the given synchronization set
//! is found, wrapping the skipped span in the reserved error kind so the
//! tree stays well-formed and the rest of the document still parses
//! (spec.md §5, "a single malformed construct must not prevent parsing
//! the remainder of the document").

use crate::lexer::{is_trivia, LexToken};
use gramforge_core::grammar_index::{GfKind, ERROR_KIND};
use gramforge_core::syntax_tree::TreeBuilder;
use gramforge_core::Diagnostic;
use std::collections::HashSet;

/// Skips tokens starting at `pos`, attaching each to `builder` inside a
/// single error node, until a token whose kind is in `sync` is reached or
/// the input is exhausted. Returns the new position and a diagnostic
/// describing the skipped span (or `None` if nothing was skipped).
pub fn recover(tokens: &[LexToken], mut pos: usize, sync: &HashSet<GfKind>, builder: &mut TreeBuilder) -> (usize, Option<Diagnostic>) {
  let start_pos = pos;
  let mut skipped_any = false;
  let mut start_offset = None;
  let mut end_offset = 0u32;

  if pos < tokens.len() && !sync.contains(&tokens[pos].kind) {
    builder.start_node(ERROR_KIND);
    while pos < tokens.len() && !sync.contains(&tokens[pos].kind) {
      let tok = &tokens[pos];
      if start_offset.is_none() && !is_trivia(tok.kind) {
        start_offset = Some(tok.range.offset);
      }
      end_offset = tok.range.end;
      builder.token(tok.kind, &tok.text);
      pos += 1;
      skipped_any = true;
    }
    builder.finish_node();
  }

  if !skipped_any || pos == start_pos {
    return (pos, None);
  }
  let offset = start_offset.unwrap_or(end_offset);
  let diagnostic = Diagnostic::parse_error(format!("unexpected input, skipped {} token(s) during recovery", pos - start_pos), offset, end_offset.saturating_sub(offset).max(1));
  (pos, Some(diagnostic))
}
