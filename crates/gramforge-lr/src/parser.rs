//! The compiled backend's tree-building engine.
//!
//! Two things distinguish it from `gramforge_ll::backend`'s interpreter:
//!
//! 1. Alternative-selection and recovery synchronization are driven by the
//!    [gramforge_core::ParseTables] the translator computed ahead of time
//!    (spec.md §4.4b: "a pre-compiled LR parser"), not re-derived per call.
//! 2. Every grammar assignment is wrapped in its synthetic field
//!    non-terminal as it is produced (spec.md §4.5's "Field wrapper"),
//!    so `childForField` never needs a direct-child fallback for trees
//!    this backend builds.
//!
//! Incremental reparses additionally consult a reuse index built from the
//! previous tree (see [crate::tree_store]): before parsing any rule, the
//! engine checks whether a same-kind subtree from the old parse maps onto
//! the current position outside every edited span, and if so replays that
//! cached green subtree instead of re-lexing and re-deriving it.

use crate::lexer::{is_trivia, LexToken};
use gramforge_core::grammar_index::{GfKind, GrammarIndex, ERROR_KIND, ROOT_KIND};
use gramforge_core::grammar_model::{AssignOp, RuleExpr};
use gramforge_core::parser_adapter::TextChange;
use gramforge_core::syntax_tree::{GramforgeLang, SyntaxNode, TreeBuilder};
use gramforge_core::{ByteRange, CompiledArtifact, Diagnostic};
use rowan::NodeOrToken;
use std::collections::{HashMap, HashSet};

/// `(fromA, toA, fromB, toB)`: an edit's old range and the new range it
/// maps to, per spec.md §4.4b. Computed once per incremental reparse from
/// the raw [TextChange] list (which gives `fromA`/`toA` directly and the
/// inserted text's length).
#[derive(Clone, Copy, Debug)]
struct ChangeSpan {
  from_a: u32,
  to_a:   u32,
  from_b: u32,
  to_b:   u32,
}

fn compute_spans(changes: &[TextChange]) -> Vec<ChangeSpan> {
  let mut sorted: Vec<&TextChange> = changes.iter().collect();
  sorted.sort_by_key(|c| c.range.offset);
  let mut delta: i64 = 0;
  let mut spans = Vec::with_capacity(sorted.len());
  for c in sorted {
    let from_a = c.range.offset;
    let to_a = c.range.end;
    let from_b = (from_a as i64 + delta) as u32;
    let to_b = from_b + c.inserted_text.len() as u32;
    spans.push(ChangeSpan { from_a, to_a, from_b, to_b });
    delta += c.inserted_text.len() as i64 - (to_a as i64 - from_a as i64);
  }
  spans
}

/// Maps a byte offset in the *old* text to the corresponding offset in the
/// *new* text, or `None` if it falls inside an edited span (and therefore
/// has no single corresponding point in the new text).
fn map_old_to_new(offset: u32, spans: &[ChangeSpan]) -> Option<u32> {
  let mut shift: i64 = 0;
  for s in spans {
    if offset < s.from_a {
      break;
    }
    if offset <= s.to_a {
      return None;
    }
    shift += (s.to_b as i64 - s.from_b as i64) - (s.to_a as i64 - s.from_a as i64);
  }
  Some((offset as i64 + shift) as u32)
}

/// `(new_start, kind) -> (new_end, green subtree)`, built once per
/// incremental reparse by walking the previous tree and keeping every
/// composite subtree whose range maps cleanly (both endpoints map, and the
/// mapped length matches the original length — i.e. no edit touches its
/// interior) onto the new text.
pub type ReuseIndex = HashMap<(u32, GfKind), (u32, rowan::GreenNode)>;

pub fn build_reuse_index(old_root: &SyntaxNode, changes: &[TextChange]) -> ReuseIndex {
  let spans = compute_spans(changes);
  let mut map = ReuseIndex::new();
  index_node(old_root, &spans, &mut map);
  map
}

fn index_node(node: &SyntaxNode, spans: &[ChangeSpan], out: &mut ReuseIndex) {
  let r = node.text_range();
  let a: u32 = r.start().into();
  let b: u32 = r.end().into();
  if let (Some(na), Some(nb)) = (map_old_to_new(a, spans), map_old_to_new(b, spans)) {
    if nb >= na && nb - na == b - a {
      out.entry((na, node.kind())).or_insert_with(|| (nb, node.green().into_owned()));
    }
  }
  for child in node.children() {
    index_node(&child, spans, out);
  }
}

/// Re-emits a cached green subtree into `builder` at the current cursor,
/// node by node. `rowan` green nodes carry only relative lengths (no
/// absolute offsets), so the subtree's content is valid at any position —
/// only its *structure* needs replaying into the new tree being built.
fn replay_green(green: &rowan::GreenNode, builder: &mut TreeBuilder) {
  let root = rowan::SyntaxNode::<GramforgeLang>::new_root(green.clone());
  replay_node(&root, builder);
}

fn replay_node(node: &SyntaxNode, builder: &mut TreeBuilder) {
  builder.start_node(node.kind());
  for child in node.children_with_tokens() {
    match child {
      NodeOrToken::Node(n) => replay_node(&n, builder),
      NodeOrToken::Token(t) => builder.token(t.kind(), t.text()),
    }
  }
  builder.finish_node();
}

pub struct Engine<'a> {
  tokens:      &'a [LexToken],
  pos:         usize,
  index:       &'a GrammarIndex,
  artifact:    &'a CompiledArtifact,
  reuse:       Option<&'a ReuseIndex>,
  builder:     TreeBuilder<'static>,
  diagnostics: Vec<Diagnostic>,
  last_expectation: Option<HashSet<GfKind>>,
}

impl<'a> Engine<'a> {
  pub fn new(tokens: &'a [LexToken], index: &'a GrammarIndex, artifact: &'a CompiledArtifact, reuse: Option<&'a ReuseIndex>) -> Self {
    Self { tokens, pos: 0, index, artifact, reuse, builder: TreeBuilder::new(), diagnostics: Vec::new(), last_expectation: None }
  }

  pub fn parse_entry(mut self, entry: &str) -> (rowan::GreenNode, Vec<Diagnostic>) {
    self.builder.start_node(ROOT_KIND);
    self.parse_rule(entry);
    self.skip_trivia();
    if self.pos < self.tokens.len() {
      let sync = HashSet::new();
      self.recover(&sync);
    }
    self.builder.finish_node();
    (self.builder.finish(), self.diagnostics)
  }

  pub fn expected_at_end(&self) -> Vec<GfKind> {
    self.last_expectation.clone().unwrap_or_default().into_iter().collect()
  }

  /// Drives the engine against `entry` purely to populate `last_expectation`
  /// (spec.md §4.4's `getExpectedTokens`), discarding the tree it builds
  /// along the way — a caller wanting both the tree and the expectation set
  /// should use [Self::parse_entry] plus [Self::expected_at_end] instead,
  /// but `parse_entry` takes `self` by value so the two can't share one run.
  pub fn expected_tokens_for(mut self, entry: &str) -> Vec<GfKind> {
    self.builder.start_node(ROOT_KIND);
    self.parse_rule(entry);
    self.builder.finish_node();
    self.expected_at_end()
  }

  /// Offset [Self::try_reuse] forms its lookup key from, without consuming
  /// or emitting the trivia tokens it skips over. On a miss this leaves
  /// `self.pos`/the builder untouched, so the rule's leading trivia still
  /// lands inside the node `parse_rule` is about to `start_node` for,
  /// exactly as the no-reuse path puts it there, instead of leaking out
  /// into whatever ancestor node happens to be open at the point of the
  /// failed lookup.
  fn peek_new_offset(&self) -> u32 {
    let mut p = self.pos;
    while let Some(t) = self.tokens.get(p) {
      if is_trivia(t.kind) {
        p += 1;
      } else {
        break;
      }
    }
    self.tokens.get(p).map(|t| t.range.offset).unwrap_or_else(|| self.end_offset())
  }

  fn end_offset(&self) -> u32 {
    self.tokens.last().map(|t| t.range.end).unwrap_or(0)
  }

  fn skip_trivia(&mut self) {
    while let Some(t) = self.tokens.get(self.pos) {
      if is_trivia(t.kind) {
        self.builder.token(t.kind, &t.text);
        self.pos += 1;
      } else {
        break;
      }
    }
  }

  fn current_kind(&mut self) -> Option<GfKind> {
    self.skip_trivia();
    self.tokens.get(self.pos).map(|t| t.kind)
  }

  fn bump(&mut self) -> Option<LexToken> {
    self.skip_trivia();
    let t = self.tokens.get(self.pos)?.clone();
    self.builder.token(t.kind, &t.text);
    self.pos += 1;
    Some(t)
  }

  fn advance_past(&mut self, new_end: u32) {
    while let Some(t) = self.tokens.get(self.pos) {
      if t.range.end > new_end {
        break;
      }
      self.pos += 1;
    }
  }

  /// Tries to satisfy the upcoming rule `name` from the reuse index instead
  /// of parsing it. Returns `true` (and advances `self.pos`/the builder)
  /// on a hit.
  fn try_reuse(&mut self, name: &str) -> bool {
    let Some(reuse) = self.reuse else { return false };
    let Some(kind) = self.index.kind_id(name) else { return false };
    let offset = self.peek_new_offset();
    let Some((end, green)) = reuse.get(&(offset, kind)) else { return false };
    self.skip_trivia();
    replay_green(green, &mut self.builder);
    self.advance_past(*end);
    true
  }

  fn parse_rule(&mut self, name: &str) -> bool {
    if self.try_reuse(name) {
      return true;
    }
    let Some(rule) = self.index.rule(name) else {
      self.diagnostics.push(Diagnostic::parse_error(format!("reference to unknown rule '{name}'"), 0, 1));
      return false;
    };
    let Some(kind) = self.index.kind_id(name) else { return false };
    self.builder.start_node(kind);
    let ok = self.parse_expr(&rule.body.clone(), name);
    if !ok {
      let sync = self.artifact.tables.follow_kinds(name).into_iter().collect();
      self.recover(&sync);
    }
    self.builder.finish_node();
    true
  }

  /// Parses one assignment target, wrapping the produced element(s) in the
  /// field's synthetic wrapper non-terminal when the grammar index says
  /// this `(rule, property)` uses one (spec.md §4.5's "field wrapper").
  fn parse_assign(&mut self, owner: &str, property: &str, target: &RuleExpr) -> bool {
    let wrapper_kind = self.index.field_selector(owner, property).and_then(|s| s.wrapper_name()).and_then(|w| self.index.kind_id(w));
    let Some(wk) = wrapper_kind else {
      return self.parse_expr(target, owner);
    };
    // Wrap retroactively via a checkpoint: only emit the field wrapper if
    // the target actually matched, so an unmatched `?=` flag sees no
    // wrapper at all rather than an empty one (spec.md §4.6, `?=` is
    // "true iff childForField(property) exists").
    let checkpoint = self.builder.checkpoint();
    let ok = self.parse_expr(target, owner);
    if ok {
      self.builder.start_node_at(checkpoint, wk);
      self.builder.finish_node();
    }
    ok
  }

  fn parse_expr(&mut self, expr: &RuleExpr, owner: &str) -> bool {
    match expr {
      RuleExpr::Keyword(v) => {
        let Some(kind) = self.index.keyword_kind(v) else { return false };
        if self.current_kind() == Some(kind) {
          self.bump();
          true
        } else {
          self.record_expectation([kind].into_iter().collect());
          false
        }
      }
      RuleExpr::Terminal(name) => {
        let Some(kind) = self.index.terminal_kind(name) else { return false };
        if self.current_kind() == Some(kind) {
          self.bump();
          true
        } else {
          self.record_expectation([kind].into_iter().collect());
          false
        }
      }
      RuleExpr::CrossReference { .. } => {
        let Some(kind) = self.index.terminal_kind("ID") else { return false };
        if self.current_kind() == Some(kind) {
          self.bump();
          true
        } else {
          self.record_expectation([kind].into_iter().collect());
          false
        }
      }
      RuleExpr::NonTerminal(name) => {
        let first = self.artifact.tables.first_kinds(name).into_iter().collect::<HashSet<_>>();
        let nullable = self.artifact.tables.is_nullable(name);
        match self.current_kind() {
          Some(k) if first.contains(&k) => self.parse_rule(name),
          _ if nullable => true,
          _ => {
            self.record_expectation(first);
            false
          }
        }
      }
      RuleExpr::Assign { property, op, target } => {
        let ok = self.parse_assign(owner, property, target);
        // `?=` flags are presence-only: not matching is not a parse
        // failure, it just leaves the property false (spec.md §4.6).
        if matches!(op, AssignOp::Flag) {
          true
        } else {
          ok
        }
      }
      RuleExpr::Sequence(items) => {
        let mut all_ok = true;
        for item in items {
          if !self.parse_expr(item, owner) {
            all_ok = false;
          }
        }
        all_ok
      }
      RuleExpr::Alternatives(items) => self.parse_alternatives(items, owner),
      RuleExpr::Group(inner) => self.parse_expr(inner, owner),
      RuleExpr::Optional(inner) => {
        let (first, _) = self.first_of_expr(inner);
        if self.current_kind().map(|k| first.contains(&k)).unwrap_or(false) {
          self.parse_expr(inner, owner);
        }
        true
      }
      RuleExpr::Star(inner) => {
        let (first, _) = self.first_of_expr(inner);
        loop {
          match self.current_kind() {
            Some(k) if first.contains(&k) => {
              if !self.parse_expr(inner, owner) {
                break;
              }
            }
            _ => break,
          }
        }
        true
      }
      RuleExpr::Plus(inner) => {
        if !self.parse_expr(inner, owner) {
          return false;
        }
        let (first, _) = self.first_of_expr(inner);
        loop {
          match self.current_kind() {
            Some(k) if first.contains(&k) => {
              if !self.parse_expr(inner, owner) {
                break;
              }
            }
            _ => break,
          }
        }
        true
      }
      RuleExpr::Unordered(items) => {
        let mut remaining: Vec<&RuleExpr> = items.iter().collect();
        let mut all_ok = true;
        loop {
          let current = self.current_kind();
          let Some(pos) = remaining.iter().position(|item| {
            let (first, _) = self.first_of_expr(item);
            current.map(|k| first.contains(&k)).unwrap_or(false)
          }) else {
            break;
          };
          let item = remaining.remove(pos);
          all_ok &= self.parse_expr(item, owner);
        }
        for item in remaining {
          let (_, nullable) = self.first_of_expr(item);
          all_ok &= nullable;
        }
        all_ok
      }
    }
  }

  fn parse_alternatives(&mut self, items: &[RuleExpr], owner: &str) -> bool {
    let current = self.current_kind();
    for item in items {
      let (first, _) = self.first_of_expr(item);
      if current.map(|k| first.contains(&k)).unwrap_or(false) {
        return self.parse_expr(item, owner);
      }
    }
    if let Some(nullable_item) = items.iter().find(|i| self.first_of_expr(i).1) {
      return self.parse_expr(nullable_item, owner);
    }
    let mut expected = HashSet::new();
    for item in items {
      expected.extend(self.first_of_expr(item).0);
    }
    self.record_expectation(expected);
    false
  }

  /// Computes FIRST/nullable for an arbitrary sub-expression the same way
  /// `gramforge-translate::first_nullable` does, but reading straight from
  /// the precomputed [CompiledArtifact] tables for `NonTerminal` leaves
  /// instead of re-deriving them.
  fn first_of_expr(&self, expr: &RuleExpr) -> (HashSet<GfKind>, bool) {
    match expr {
      RuleExpr::Keyword(v) => (self.index.keyword_kind(v).into_iter().collect(), false),
      RuleExpr::Terminal(name) => (self.index.terminal_kind(name).into_iter().collect(), false),
      RuleExpr::NonTerminal(name) => (self.artifact.tables.first_kinds(name).into_iter().collect(), self.artifact.tables.is_nullable(name)),
      RuleExpr::CrossReference { .. } => (self.index.terminal_kind("ID").into_iter().collect(), false),
      RuleExpr::Assign { target, .. } => self.first_of_expr(target),
      RuleExpr::Sequence(items) => {
        let mut set = HashSet::new();
        for item in items {
          let (f, n) = self.first_of_expr(item);
          set.extend(f);
          if !n {
            return (set, false);
          }
        }
        (set, true)
      }
      RuleExpr::Alternatives(items) => {
        let mut set = HashSet::new();
        let mut any_nullable = false;
        for i in items {
          let (f, n) = self.first_of_expr(i);
          set.extend(f);
          any_nullable |= n;
        }
        (set, any_nullable)
      }
      RuleExpr::Unordered(items) => {
        let mut set = HashSet::new();
        let mut all_nullable = true;
        for i in items {
          let (f, n) = self.first_of_expr(i);
          set.extend(f);
          all_nullable &= n;
        }
        (set, all_nullable)
      }
      RuleExpr::Group(inner) | RuleExpr::Plus(inner) => self.first_of_expr(inner),
      RuleExpr::Optional(inner) | RuleExpr::Star(inner) => (self.first_of_expr(inner).0, true),
    }
  }

  fn record_expectation(&mut self, kinds: HashSet<GfKind>) {
    self.last_expectation = Some(kinds);
  }

  /// Skips tokens until one in `sync` (or end of input), wrapping the
  /// skipped span in the reserved error kind (spec.md §4.4b: "Error nodes
  /// are nodes whose type is marked as error").
  fn recover(&mut self, sync: &HashSet<GfKind>) {
    let start_pos = self.pos;
    let mut start_offset = None;
    let mut end_offset = 0u32;
    let mut skipped_any = false;

    if self.pos < self.tokens.len() && !sync.contains(&self.tokens[self.pos].kind) {
      self.builder.start_node(ERROR_KIND);
      while self.pos < self.tokens.len() && !sync.contains(&self.tokens[self.pos].kind) {
        let tok = self.tokens[self.pos].clone();
        if start_offset.is_none() && !is_trivia(tok.kind) {
          start_offset = Some(tok.range.offset);
        }
        end_offset = tok.range.end;
        self.builder.token(tok.kind, &tok.text);
        self.pos += 1;
        skipped_any = true;
      }
      self.builder.finish_node();
    }

    if skipped_any && self.pos != start_pos {
      let offset = start_offset.unwrap_or(end_offset);
      self.diagnostics.push(Diagnostic::parse_error(
        format!("unexpected input, skipped {} token(s) during recovery", self.pos - start_pos),
        offset,
        end_offset.saturating_sub(offset).max(1),
      ));
    }
  }
}

/// Extracts every error-kind node's byte range from a finished tree, for
/// [crate::diagnostics]'s "one diagnostic per error node" normalization.
pub fn error_node_ranges(root: &SyntaxNode) -> Vec<ByteRange> {
  root
    .descendants()
    .filter(|n| n.kind() == ERROR_KIND)
    .map(|n| {
      let r = n.text_range();
      ByteRange::new(r.start().into(), r.end().into())
    })
    .collect()
}
