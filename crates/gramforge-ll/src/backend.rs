//! The interpreted LL backend: a tree-walking recursive-descent
//! interpreter over [RuleExpr] directly, with no compiled parse table.
//! Error recovery and a best-effort `getExpectedTokens` are implemented
//! here; incremental reparsing is intentionally unsupported (spec.md §4.3:
//! "the interpreted backend always reparses from scratch").

use crate::follow_sets::{first_of_expr, FollowSets};
use crate::lexer::{is_trivia, LexToken, Lexer};
use crate::recover::recover;
use gramforge_core::config::{BackendKind, ParserConfig};
use gramforge_core::error::{GfResult, GramforgeError};
use gramforge_core::grammar_index::{AssignmentInfo, GfKind, GrammarIndex, ROOT_KIND};
use gramforge_core::grammar_model::{AssignOp, RuleExpr};
use gramforge_core::parser_adapter::{ExpectedToken, ParseOutcome, ParserAdapter, TextChange};
use gramforge_core::syntax_tree::{SyntaxTree, TreeBuilder};
use gramforge_core::Diagnostic;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runtime-interpreted LL parser. Configure once per grammar, then call
/// [ParserAdapter::parse] as many times as needed — each call is an
/// independent from-scratch parse.
#[derive(Default)]
pub struct InterpretedBackend {
  index:  Option<Arc<GrammarIndex>>,
  follow: Option<Arc<FollowSets>>,
  config: ParserConfig,
}

impl InterpretedBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn require_index(&self) -> GfResult<(&Arc<GrammarIndex>, &Arc<FollowSets>)> {
    match (&self.index, &self.follow) {
      (Some(i), Some(f)) => Ok((i, f)),
      _ => Err(GramforgeError::NotConfigured("InterpretedBackend::configure was not called")),
    }
  }
}

impl ParserAdapter for InterpretedBackend {
  fn configure(&mut self, index: Arc<GrammarIndex>, config: ParserConfig) -> GfResult<()> {
    if config.backend != BackendKind::Interpreted {
      warn!("InterpretedBackend configured with a non-interpreted ParserConfig; proceeding as interpreted anyway");
    }
    let follow = FollowSets::build(&index);
    self.follow = Some(Arc::new(follow));
    self.index = Some(index);
    self.config = config;
    Ok(())
  }

  fn parse(&mut self, source: &str) -> GfResult<ParseOutcome> {
    let (index, follow) = self.require_index()?;
    let entry = index.entry_rule().ok_or_else(|| GramforgeError::GrammarLookup("grammar has no entry rule".into()))?.to_string();
    let (tokens, mut diagnostics) = Lexer::new(source, index).tokenize();
    debug!(token_count = tokens.len(), %entry, "interpreted backend starting parse");

    let mut parser = RdParser { tokens: &tokens, pos: 0, index, follow, builder: TreeBuilder::new(), diagnostics: Vec::new(), last_expectation: None };
    parser.builder.start_node(ROOT_KIND);
    parser.parse_rule(&entry);
    parser.skip_trailing_trivia();
    if parser.pos < parser.tokens.len() {
      let sync: HashSet<GfKind> = HashSet::new();
      let (_, diag) = recover(parser.tokens, parser.pos, &sync, &mut parser.builder);
      if let Some(d) = diag {
        parser.diagnostics.push(d);
      }
    }
    parser.builder.finish_node();

    diagnostics.extend(parser.diagnostics);
    let tree = SyntaxTree::new(parser.builder.finish(), index.clone());
    Ok(ParseOutcome { tree, diagnostics })
  }

  fn parse_incremental(&mut self, _previous: &SyntaxTree, _new_source: &str, _changes: &[TextChange]) -> GfResult<ParseOutcome> {
    Err(GramforgeError::IncrementalUnsupported("the interpreted backend always reparses from scratch"))
  }

  fn get_expected_tokens(&mut self, source: &str, offset: u32) -> GfResult<Vec<ExpectedToken>> {
    let (index, follow) = self.require_index()?;
    let entry = index.entry_rule().ok_or_else(|| GramforgeError::GrammarLookup("grammar has no entry rule".into()))?.to_string();
    let truncated = &source[..(offset as usize).min(source.len())];
    let (tokens, _) = Lexer::new(truncated, index).tokenize();
    let mut parser = RdParser { tokens: &tokens, pos: 0, index, follow, builder: TreeBuilder::new(), diagnostics: Vec::new(), last_expectation: None };
    parser.builder.start_node(ROOT_KIND);
    parser.parse_rule(&entry);
    parser.builder.finish_node();

    let kinds = parser.last_expectation.unwrap_or_default();
    Ok(kinds
      .into_iter()
      .filter_map(|k| index.kind_name(k).map(|name| ExpectedToken { kind_name: name.to_string(), is_keyword: name.starts_with("kw:") }))
      .collect())
  }

  fn dispose(&mut self) {
    self.index = None;
    self.follow = None;
  }

  fn supports_incremental(&self) -> bool {
    false
  }
}

struct RdParser<'a> {
  tokens:  &'a [LexToken],
  pos:     usize,
  index:   &'a Arc<GrammarIndex>,
  follow:  &'a Arc<FollowSets>,
  builder: TreeBuilder<'static>,
  diagnostics: Vec<Diagnostic>,
  /// The kind set the parser was looking for the last time it ran out of
  /// input or otherwise failed to match — this is what `getExpectedTokens`
  /// reports back (spec.md §4.4).
  last_expectation: Option<HashSet<GfKind>>,
}

impl<'a> RdParser<'a> {
  fn skip_leading_trivia(&mut self) {
    while let Some(t) = self.tokens.get(self.pos) {
      if is_trivia(t.kind) {
        self.builder.token(t.kind, &t.text);
        self.pos += 1;
      } else {
        break;
      }
    }
  }

  fn skip_trailing_trivia(&mut self) {
    self.skip_leading_trivia();
  }

  fn current_kind(&mut self) -> Option<GfKind> {
    self.skip_leading_trivia();
    self.tokens.get(self.pos).map(|t| t.kind)
  }

  fn bump(&mut self) -> Option<LexToken> {
    self.skip_leading_trivia();
    let t = self.tokens.get(self.pos)?.clone();
    self.builder.token(t.kind, &t.text);
    self.pos += 1;
    Some(t)
  }

  fn record_expectation(&mut self, kinds: HashSet<GfKind>) {
    self.last_expectation = Some(kinds);
  }

  fn parse_rule(&mut self, name: &str) -> bool {
    let Some(rule) = self.index.rule(name) else {
      self.diagnostics.push(Diagnostic::parse_error(format!("reference to unknown rule '{name}'"), 0, 1));
      return false;
    };
    let Some(kind) = self.index.kind_id(name) else { return false };
    self.builder.start_node(kind);
    let ok = self.parse_expr(&rule.body.clone(), name);
    if !ok {
      let sync = self.follow.follow_of(name);
      let (new_pos, diag) = recover(self.tokens, self.pos, &sync, &mut self.builder);
      self.pos = new_pos;
      if let Some(d) = diag {
        self.diagnostics.push(d);
      }
    }
    self.builder.finish_node();
    true
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
        let first = self.follow.first_of(name);
        let nullable = self.follow.is_nullable(name);
        match self.current_kind() {
          Some(k) if first.contains(&k) => self.parse_rule(name),
          _ if nullable => true,
          _ => {
            self.record_expectation(first);
            false
          }
        }
      }
      RuleExpr::Assign { target, .. } => self.parse_expr(target, owner),
      RuleExpr::Sequence(items) => {
        let mut all_ok = true;
        for item in items {
          if !self.parse_expr(item, owner) {
            all_ok = false;
          }
        }
        all_ok
      }
      RuleExpr::Alternatives(items) => {
        let current = self.current_kind();
        for item in items {
          let (first, nullable) = first_of_expr(item, &self.follow.first, &self.follow.nullable, self.index);
          if current.map(|k| first.contains(&k)).unwrap_or(false) {
            return self.parse_expr(item, owner);
          }
          if nullable && current.is_none() {
            return self.parse_expr(item, owner);
          }
        }
        if let Some(nullable_item) = items.iter().find(|i| first_of_expr(i, &self.follow.first, &self.follow.nullable, self.index).1) {
          return self.parse_expr(nullable_item, owner);
        }
        let mut expected = HashSet::new();
        for item in items {
          expected.extend(first_of_expr(item, &self.follow.first, &self.follow.nullable, self.index).0);
        }
        self.record_expectation(expected);
        false
      }
      RuleExpr::Group(inner) => self.parse_expr(inner, owner),
      RuleExpr::Optional(inner) => {
        let (first, _) = first_of_expr(inner, &self.follow.first, &self.follow.nullable, self.index);
        if self.current_kind().map(|k| first.contains(&k)).unwrap_or(false) {
          self.parse_expr(inner, owner);
        }
        true
      }
      RuleExpr::Star(inner) => {
        let (first, _) = first_of_expr(inner, &self.follow.first, &self.follow.nullable, self.index);
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
        let (first, _) = first_of_expr(inner, &self.follow.first, &self.follow.nullable, self.index);
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
            let (first, _) = first_of_expr(item, &self.follow.first, &self.follow.nullable, self.index);
            current.map(|k| first.contains(&k)).unwrap_or(false)
          }) else {
            break;
          };
          let item = remaining.remove(pos);
          all_ok &= self.parse_expr(item, owner);
        }
        for item in remaining {
          let (_, nullable) = first_of_expr(item, &self.follow.first, &self.follow.nullable, self.index);
          all_ok &= nullable;
        }
        all_ok
      }
    }
  }
}

/// Exposes the first-declared assignment for a `(rule, property)` pair, for
/// callers (primarily `gramforge-ast`) that need to know the operator an
/// assignment used without re-walking the grammar model themselves.
pub fn assignment_for<'a>(index: &'a GrammarIndex, rule: &str, property: &str) -> Option<&'a AssignmentInfo> {
  index.assignment(rule, property)
}

pub fn is_append(info: &AssignmentInfo) -> bool {
  info.op == AssignOp::Append
}
