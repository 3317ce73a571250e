//! Byte-offset and line/column position types shared by the grammar index,
//! syntax tree and diagnostics.
//!
//! Grounded on the role of `Token` / `TokenRange` referenced throughout
//! `radlr-rust-runtime/deprecate/ast.rs` (`AstSlot<Ast>(pub Ast, pub
//! TokenRange, pub TokenRange)`), reduced here to the plain byte-range +
//! line/column shape the ST contract (spec.md §3/§4.1) requires.

use std::ops::Range;

/// A 0-based line/column coordinate, consistent with the source text's own
/// line breaks (`\n`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct LineCol {
  pub line: u32,
  pub col:  u32,
}

/// Line/column span of a `[offset, end)` byte range.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TokenRange {
  pub start: LineCol,
  pub end:   LineCol,
}

/// Half-open byte range `[offset, end)` into a document's source text.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ByteRange {
  pub offset: u32,
  pub end:    u32,
}

impl ByteRange {
  pub fn new(offset: u32, end: u32) -> Self {
    debug_assert!(offset <= end, "ByteRange requires offset <= end, got {offset}..{end}");
    Self { offset, end }
  }

  pub fn len(&self) -> u32 {
    self.end - self.offset
  }

  pub fn is_empty(&self) -> bool {
    self.offset == self.end
  }

  pub fn contains_range(&self, other: &ByteRange) -> bool {
    self.offset <= other.offset && other.end <= self.end
  }

  pub fn as_range(&self) -> Range<usize> {
    self.offset as usize..self.end as usize
  }
}

impl From<ByteRange> for Range<usize> {
  fn from(r: ByteRange) -> Self {
    r.as_range()
  }
}

/// Computes 0-based line/column positions for a byte range, given the full
/// source text. Lines are split on `\n`; columns count UTF-8 bytes within
/// the line (sufficient for the editor-service consumers this ST feeds,
/// which re-derive UTF-16 columns themselves when needed).
pub fn line_col_range(source: &str, range: ByteRange) -> TokenRange {
  TokenRange { start: line_col_at(source, range.offset), end: line_col_at(source, range.end) }
}

/// Whether `c` can appear in an identifier lexeme — the same maximal-munch
/// predicate `gramforge-ll`/`gramforge-lr`'s lexers use for `ID`. Shared here
/// so the ST's "declaration-friendly offset" lookup (spec.md §4.1) agrees
/// with what the backends actually lexed.
pub fn is_name_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

pub fn line_col_at(source: &str, offset: u32) -> LineCol {
  let offset = offset as usize;
  let mut line = 0u32;
  let mut last_newline = 0usize;
  for (i, b) in source.as_bytes().iter().enumerate() {
    if i >= offset {
      break;
    }
    if *b == b'\n' {
      line += 1;
      last_newline = i + 1;
    }
  }
  let col = offset.saturating_sub(last_newline) as u32;
  LineCol { line, col }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn line_col_tracks_newlines() {
    let src = "ab\ncd\nef";
    assert_eq!(line_col_at(src, 0), LineCol { line: 0, col: 0 });
    assert_eq!(line_col_at(src, 3), LineCol { line: 1, col: 0 });
    assert_eq!(line_col_at(src, 7), LineCol { line: 2, col: 1 });
  }
}
