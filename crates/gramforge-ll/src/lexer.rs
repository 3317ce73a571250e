//! A grammar-driven lexer for the interpreted backend.
//!
//! The interpreted backend never runs a grammar-to-automaton translation
//! step (that's `gramforge-translate`'s job for the compiled backend), so
//! lexing here works directly off [GrammarIndex]'s keyword table plus a
//! small fixed vocabulary of built-in terminal shapes (`ID`, `INT`, `FLOAT`,
//! `STRING`) — enough to drive the scenarios spec.md §8 describes without
//! requiring a user-supplied lexical specification, which is out of scope
//! for this subsystem.

use gramforge_core::grammar_index::{GfKind, GrammarIndex, COMMENT_KIND, ERROR_KIND, WHITESPACE_KIND};
use gramforge_core::{ByteRange, Diagnostic};

#[derive(Clone, Debug)]
pub struct LexToken {
  pub kind:  GfKind,
  pub range: ByteRange,
  pub text:  String,
}

pub fn is_trivia(kind: GfKind) -> bool {
  kind == WHITESPACE_KIND || kind == COMMENT_KIND
}

pub struct Lexer<'a> {
  source: &'a str,
  bytes:  &'a [u8],
  index:  &'a GrammarIndex,
  pos:    usize,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str, index: &'a GrammarIndex) -> Self {
    Self { source, bytes: source.as_bytes(), index, pos: 0 }
  }

  pub fn tokenize(mut self) -> (Vec<LexToken>, Vec<Diagnostic>) {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    while self.pos < self.bytes.len() {
      if let Some(tok) = self.lex_whitespace() {
        tokens.push(tok);
        continue;
      }
      if let Some(tok) = self.lex_line_comment() {
        tokens.push(tok);
        continue;
      }
      if let Some(tok) = self.lex_keyword() {
        tokens.push(tok);
        continue;
      }
      if let Some(tok) = self.lex_string() {
        tokens.push(tok);
        continue;
      }
      if let Some(tok) = self.lex_number() {
        tokens.push(tok);
        continue;
      }
      if let Some(tok) = self.lex_identifier() {
        tokens.push(tok);
        continue;
      }
      let start = self.pos;
      let ch_len = self.current_char_len();
      self.pos += ch_len.max(1);
      diagnostics.push(Diagnostic::lex_error(format!("unrecognized character at byte {start}"), start as u32, ch_len.max(1) as u32));
      tokens.push(LexToken { kind: ERROR_KIND, range: ByteRange::new(start as u32, self.pos as u32), text: self.source[start..self.pos].to_string() });
    }
    (tokens, diagnostics)
  }

  fn current_char_len(&self) -> usize {
    self.source[self.pos..].chars().next().map(|c| c.len_utf8()).unwrap_or(1)
  }

  fn lex_whitespace(&mut self) -> Option<LexToken> {
    let start = self.pos;
    while self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_whitespace() {
      self.pos += 1;
    }
    (self.pos > start).then(|| LexToken { kind: WHITESPACE_KIND, range: ByteRange::new(start as u32, self.pos as u32), text: self.source[start..self.pos].to_string() })
  }

  fn lex_line_comment(&mut self) -> Option<LexToken> {
    let start = self.pos;
    if self.bytes[self.pos..].starts_with(b"//") {
      while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
        self.pos += 1;
      }
      return Some(LexToken { kind: COMMENT_KIND, range: ByteRange::new(start as u32, self.pos as u32), text: self.source[start..self.pos].to_string() });
    }
    None
  }

  /// Tries every keyword value the grammar declares, longest first, so
  /// `'item'` doesn't shadow a longer `'itemize'` keyword sharing a prefix.
  fn lex_keyword(&mut self) -> Option<LexToken> {
    let rest = &self.source[self.pos..];
    let mut candidates: Vec<&str> = self.index.keyword_values().collect();
    candidates.sort_by_key(|k| std::cmp::Reverse(k.len()));
    for kw in candidates {
      if rest.starts_with(kw) {
        let is_word = kw.chars().next().map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false);
        if is_word {
          let next = rest[kw.len()..].chars().next();
          if next.map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false) {
            continue;
          }
        }
        let kind = self.index.keyword_kind(kw)?;
        let start = self.pos;
        self.pos += kw.len();
        return Some(LexToken { kind, range: ByteRange::new(start as u32, self.pos as u32), text: kw.to_string() });
      }
    }
    None
  }

  fn lex_identifier(&mut self) -> Option<LexToken> {
    let kind = self.index.terminal_kind("ID")?;
    let start = self.pos;
    let mut chars = self.source[self.pos..].char_indices();
    let (_, first) = chars.next()?;
    if !(first.is_alphabetic() || first == '_') {
      return None;
    }
    let mut end = self.pos + first.len_utf8();
    for (i, c) in chars {
      if c.is_alphanumeric() || c == '_' {
        end = self.pos + i + c.len_utf8();
      } else {
        break;
      }
    }
    self.pos = end;
    Some(LexToken { kind, range: ByteRange::new(start as u32, end as u32), text: self.source[start..end].to_string() })
  }

  fn lex_number(&mut self) -> Option<LexToken> {
    let start = self.pos;
    if !(self.bytes[self.pos] as char).is_ascii_digit() {
      return None;
    }
    let mut end = self.pos;
    while end < self.bytes.len() && (self.bytes[end] as char).is_ascii_digit() {
      end += 1;
    }
    let mut is_float = false;
    if end < self.bytes.len() && self.bytes[end] == b'.' && end + 1 < self.bytes.len() && (self.bytes[end + 1] as char).is_ascii_digit() {
      is_float = true;
      end += 1;
      while end < self.bytes.len() && (self.bytes[end] as char).is_ascii_digit() {
        end += 1;
      }
    }
    let name = if is_float { "FLOAT" } else { "INT" };
    let kind = self.index.terminal_kind(name).or_else(|| self.index.terminal_kind("INT"))?;
    self.pos = end;
    Some(LexToken { kind, range: ByteRange::new(start as u32, end as u32), text: self.source[start..end].to_string() })
  }

  fn lex_string(&mut self) -> Option<LexToken> {
    if self.bytes[self.pos] != b'"' {
      return None;
    }
    let kind = self.index.terminal_kind("STRING")?;
    let start = self.pos;
    let mut end = self.pos + 1;
    while end < self.bytes.len() && self.bytes[end] != b'"' {
      if self.bytes[end] == b'\\' && end + 1 < self.bytes.len() {
        end += 2;
      } else {
        end += 1;
      }
    }
    end = (end + 1).min(self.bytes.len());
    self.pos = end;
    Some(LexToken { kind, range: ByteRange::new(start as u32, end as u32), text: self.source[start..end].to_string() })
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use gramforge_core::grammar_model::*;
  use gramforge_core::GrammarIndex;

  #[test]
  fn keywords_and_identifiers_are_distinguished() {
    let model = GrammarBuilder::new().entry("Model").rule("Model", seq(vec![kw("model"), assign("name", term("ID"))])).build();
    let index = GrammarIndex::build(model).unwrap();
    let (tokens, diags) = Lexer::new("model widget", &index).tokenize();
    assert!(diags.is_empty());
    let significant: Vec<_> = tokens.iter().filter(|t| !is_trivia(t.kind)).collect();
    assert_eq!(significant.len(), 2);
    assert_eq!(significant[0].kind, index.keyword_kind("model").unwrap());
    assert_eq!(significant[1].kind, index.terminal_kind("ID").unwrap());
  }
}
