//! Regex-terminal sub-translation (spec.md §4.5): a grammar can name
//! terminals beyond the workbench's fixed `ID`/`INT`/`FLOAT`/`STRING`
//! vocabulary by supplying a pattern in [gramforge_core::GrammarModel]'s
//! `terminal_patterns` map. Neither backend's hand-rolled lexer consults
//! these patterns at parse time yet (spec.md §1 keeps lexer-generator
//! design out of scope) — this module's job is narrower: convert a
//! pattern to the form the compiled backend's own token syntax expects
//! (anchors dropped, character classes deduplicated) and catch unsupported
//! regex features at translate time, the same "fail before the parser ever
//! runs" posture `ll_translator::validate`/`lr_translator::compile` already
//! take for grammar-shape problems.

use gramforge_core::{Diagnostic, GrammarIndex};
use regex::Regex;

/// Regex constructs the backend's token syntax has no equivalent for.
/// Checked textually ahead of compilation so the diagnostic can name the
/// offending feature rather than surface the `regex` crate's own parse
/// error (which, for lookaround/backreferences, just says "unsupported
/// syntax" without explaining why that's a structural limitation here, not
/// a typo).
const UNSUPPORTED_FEATURES: &[(&str, &str)] = &[
  ("(?=", "lookahead"),
  ("(?!", "negative lookahead"),
  ("(?<=", "lookbehind"),
  ("(?<!", "negative lookbehind"),
  ("(?>", "atomic group"),
  ("(?P=", "backreference"),
  ("(?<", "named group"),
  ("(?P<", "named group"),
];

/// Compiles every `terminal_patterns` entry, returning one translator-error
/// diagnostic per pattern that uses an unsupported feature or otherwise
/// fails to compile. An empty result means every declared pattern is ready
/// to hand to [to_backend_token_syntax].
pub fn validate_patterns(index: &GrammarIndex) -> Vec<Diagnostic> {
  index
    .model()
    .terminal_patterns
    .iter()
    .filter_map(|(name, pattern)| match check_pattern(pattern) {
      Err(message) => Some(Diagnostic::translator_error(format!("terminal '{name}' has an invalid pattern '{pattern}': {message}"))),
      Ok(()) => None,
    })
    .collect()
}

fn check_pattern(pattern: &str) -> Result<(), String> {
  // Longer needles first so `(?<=` doesn't get misreported via the
  // shorter `(?<` named-group check.
  for (needle, feature) in UNSUPPORTED_FEATURES {
    if pattern.contains(needle) {
      return Err(format!("{feature} is not supported by the backend's token syntax"));
    }
  }
  if has_backreference(pattern) {
    return Err("backreferences are not supported by the backend's token syntax".to_string());
  }
  Regex::new(pattern).map(|_| ()).map_err(|err| err.to_string())
}

/// A bare `\1`..`\9` outside a character class is a backreference; the
/// `regex` crate itself rejects these (it only supports regular, not
/// backtracking, matching) but we check first so the diagnostic names the
/// feature instead of relaying the crate's generic parse error.
fn has_backreference(pattern: &str) -> bool {
  let bytes = pattern.as_bytes();
  let mut in_class = false;
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'[' => in_class = true,
      b']' => in_class = false,
      b'\\' if !in_class && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() && bytes[i + 1] != b'0' => return true,
      _ => {}
    }
    i += 1;
  }
  false
}

/// Converts a validated pattern to the compiled backend's own token
/// syntax: anchors are dropped (spec.md §4.5: "anchors are dropped — backend
/// tokens are implicitly anchored") and character classes are deduplicated
/// to compact ranges (spec.md §4.5: "to avoid overlap errors"). Returns the
/// pattern unchanged when it contains no anchors or character classes to
/// simplify.
pub fn to_backend_token_syntax(pattern: &str) -> String {
  let stripped = strip_anchors(pattern);
  dedup_char_classes(&stripped)
}

fn strip_anchors(pattern: &str) -> String {
  let mut s = pattern;
  if let Some(rest) = s.strip_prefix('^') {
    s = rest;
  }
  if let Some(rest) = s.strip_suffix('$') {
    if !rest.ends_with('\\') {
      s = rest;
    }
  }
  s.to_string()
}

/// Merges overlapping/duplicate single-character and range entries inside
/// every `[...]` character class in `pattern`. Multi-class patterns (e.g.
/// `[a-z][0-9]`) are handled independently per class.
fn dedup_char_classes(pattern: &str) -> String {
  let mut out = String::with_capacity(pattern.len());
  let bytes = pattern.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'\\' && i + 1 < bytes.len() {
      out.push(bytes[i] as char);
      out.push(bytes[i + 1] as char);
      i += 2;
      continue;
    }
    if bytes[i] == b'[' {
      let Some(end) = find_class_end(pattern, i) else {
        out.push('[');
        i += 1;
        continue;
      };
      out.push_str(&rebuild_class(&pattern[i..=end]));
      i = end + 1;
      continue;
    }
    out.push(bytes[i] as char);
    i += 1;
  }
  out
}

fn find_class_end(pattern: &str, start: usize) -> Option<usize> {
  let bytes = pattern.as_bytes();
  let mut i = start + 1;
  if bytes.get(i) == Some(&b'^') {
    i += 1;
  }
  if bytes.get(i) == Some(&b']') {
    i += 1;
  }
  while i < bytes.len() {
    if bytes[i] == b'\\' {
      i += 2;
      continue;
    }
    if bytes[i] == b']' {
      return Some(i);
    }
    i += 1;
  }
  None
}

/// One entry inside a character class: either a single character or a
/// `lo-hi` range, tracked as `u32` code points so ranges can be sorted and
/// merged.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct ClassRange {
  lo: u32,
  hi: u32,
}

fn rebuild_class(class: &str) -> String {
  let inner = &class[1..class.len() - 1];
  let (negated, body) = match inner.strip_prefix('^') {
    Some(rest) => (true, rest),
    None => (false, inner),
  };

  let mut ranges = Vec::new();
  let chars: Vec<char> = body.chars().collect();
  let mut i = 0;
  while i < chars.len() {
    if chars[i] == '\\' && i + 1 < chars.len() {
      let c = chars[i + 1] as u32;
      ranges.push(ClassRange { lo: c, hi: c });
      i += 2;
      continue;
    }
    if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i + 2] != ']' {
      ranges.push(ClassRange { lo: chars[i] as u32, hi: chars[i + 2] as u32 });
      i += 3;
      continue;
    }
    ranges.push(ClassRange { lo: chars[i] as u32, hi: chars[i] as u32 });
    i += 1;
  }

  ranges.sort();
  let mut merged: Vec<ClassRange> = Vec::new();
  for r in ranges {
    if let Some(last) = merged.last_mut() {
      if r.lo <= last.hi.saturating_add(1) {
        last.hi = last.hi.max(r.hi);
        continue;
      }
    }
    merged.push(r);
  }

  let mut out = String::from("[");
  if negated {
    out.push('^');
  }
  for r in merged {
    let lo = char::from_u32(r.lo).unwrap_or('\u{FFFD}');
    if r.lo == r.hi {
      out.push(lo);
    } else {
      let hi = char::from_u32(r.hi).unwrap_or('\u{FFFD}');
      out.push(lo);
      out.push('-');
      out.push(hi);
    }
  }
  out.push(']');
  out
}

#[cfg(test)]
mod test {
  use super::*;
  use gramforge_core::grammar_model::*;

  #[test]
  fn accepts_a_valid_pattern() {
    let mut model = GrammarBuilder::new().entry("Model").rule("Model", seq(vec![assign("name", term("ID"))])).build();
    model.terminal_patterns.insert("HEX".to_string(), r"^0x[0-9a-fA-F]+$".to_string());
    let index = GrammarIndex::build(model).unwrap();
    assert!(validate_patterns(&index).is_empty());
  }

  #[test]
  fn flags_an_invalid_pattern() {
    let mut model = GrammarBuilder::new().entry("Model").rule("Model", seq(vec![assign("name", term("ID"))])).build();
    model.terminal_patterns.insert("BROKEN".to_string(), "(unterminated".to_string());
    let index = GrammarIndex::build(model).unwrap();
    let diags = validate_patterns(&index);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].is_error());
  }

  #[test]
  fn flags_lookahead_with_an_actionable_message() {
    let mut model = GrammarBuilder::new().entry("Model").rule("Model", seq(vec![assign("name", term("ID"))])).build();
    model.terminal_patterns.insert("LOOK".to_string(), r"a(?=b)".to_string());
    let index = GrammarIndex::build(model).unwrap();
    let diags = validate_patterns(&index);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("lookahead"));
  }

  #[test]
  fn flags_backreferences() {
    let mut model = GrammarBuilder::new().entry("Model").rule("Model", seq(vec![assign("name", term("ID"))])).build();
    model.terminal_patterns.insert("BACKREF".to_string(), r"(a)\1".to_string());
    let index = GrammarIndex::build(model).unwrap();
    let diags = validate_patterns(&index);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("backreference"));
  }

  #[test]
  fn flags_named_groups() {
    let mut model = GrammarBuilder::new().entry("Model").rule("Model", seq(vec![assign("name", term("ID"))])).build();
    model.terminal_patterns.insert("NAMED".to_string(), r"(?P<year>[0-9]+)".to_string());
    let index = GrammarIndex::build(model).unwrap();
    let diags = validate_patterns(&index);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("named group"));
  }

  #[test]
  fn strips_leading_and_trailing_anchors() {
    assert_eq!(to_backend_token_syntax("^[a-z]+$"), "[a-z]+");
    assert_eq!(to_backend_token_syntax("[a-z]+"), "[a-z]+");
  }

  #[test]
  fn dedups_overlapping_and_adjacent_ranges() {
    assert_eq!(dedup_char_classes("[a-cd-g]"), "[a-g]");
    assert_eq!(dedup_char_classes("[a-zA-Za-z]"), "[A-Za-z]");
  }

  #[test]
  fn dedups_repeated_single_chars() {
    assert_eq!(dedup_char_classes("[aab]"), "[a-b]");
  }

  #[test]
  fn leaves_negated_classes_negated() {
    assert_eq!(dedup_char_classes("[^a-z]"), "[^a-z]");
  }
}
