//! The compiled (LR-with-reuse) backend: [CompiledBackend] binds a
//! [GrammarIndex] plus the [CompiledArtifact] a `gramforge-translate` run
//! produced, then drives [crate::parser::Engine] off those pre-built tables
//! (spec.md §4.4b).
//!
//! Unlike `gramforge_ll::InterpretedBackend`, `configure()` here additionally
//! loads the artifact and rejects one whose `grammar_fingerprint` doesn't
//! match the index (spec.md §4.5: "a stale compiled artifact must be
//! rejected rather than silently misparse").

use crate::diagnostics::error_diagnostics;
use crate::lexer::Lexer;
use crate::parser::{build_reuse_index, Engine};
use gramforge_core::config::{BackendKind, ParserConfig};
use gramforge_core::error::{GfResult, GramforgeError};
use gramforge_core::grammar_index::GrammarIndex;
use gramforge_core::parser_adapter::{ExpectedToken, ParseOutcome, ParserAdapter, TextChange};
use gramforge_core::syntax_tree::SyntaxTree;
use gramforge_core::CompiledArtifact;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bookkeeping from the most recent [ParserAdapter::parse_incremental] call,
/// kept around for host tooling / tests that want to confirm reuse actually
/// happened rather than a silent full reparse (spec.md §4.4b's performance
/// target only holds when reuse is exercised).
#[derive(Clone, Copy, Debug, Default)]
pub struct IncrementalState {
  /// How many edited-region change spans this reparse was given.
  pub change_count: usize,
  /// How many `(offset, kind)` entries the reuse index built from the prior
  /// tree contained before parsing started.
  pub candidate_fragments: usize,
}

/// Pre-compiled parser backend. Configure once per grammar + artifact pair,
/// then call [ParserAdapter::parse] / [ParserAdapter::parse_incremental] as
/// many times as needed.
#[derive(Default)]
pub struct CompiledBackend {
  index:    Option<Arc<GrammarIndex>>,
  artifact: Option<CompiledArtifact>,
  config:   ParserConfig,
  last_incremental: Option<IncrementalState>,
}

impl CompiledBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Binds the compiled artifact a translator run produced. Distinct from
  /// [ParserAdapter::configure] because the artifact is produced out of
  /// band (spec.md §4.5) rather than derived from the index itself.
  pub fn load_artifact(&mut self, artifact: CompiledArtifact) -> GfResult<()> {
    let index = self.require_index_only()?;
    if artifact.tables.grammar_fingerprint != index.fingerprint() {
      return Err(GramforgeError::MalformedTables("compiled artifact fingerprint does not match the configured grammar".to_string()));
    }
    self.artifact = Some(artifact);
    Ok(())
  }

  pub fn last_incremental_state(&self) -> Option<IncrementalState> {
    self.last_incremental
  }

  fn require_index_only(&self) -> GfResult<&Arc<GrammarIndex>> {
    self.index.as_ref().ok_or(GramforgeError::NotConfigured("CompiledBackend::configure was not called"))
  }

  fn require(&self) -> GfResult<(&Arc<GrammarIndex>, &CompiledArtifact)> {
    match (&self.index, &self.artifact) {
      (Some(i), Some(a)) => Ok((i, a)),
      (Some(_), None) => Err(GramforgeError::NotConfigured("CompiledBackend::load_artifact was not called")),
      _ => Err(GramforgeError::NotConfigured("CompiledBackend::configure was not called")),
    }
  }
}

impl ParserAdapter for CompiledBackend {
  fn configure(&mut self, index: Arc<GrammarIndex>, config: ParserConfig) -> GfResult<()> {
    if config.backend != BackendKind::Compiled {
      warn!("CompiledBackend configured with a non-compiled ParserConfig; proceeding as compiled anyway");
    }
    self.index = Some(index);
    self.artifact = None;
    self.config = config;
    self.last_incremental = None;
    Ok(())
  }

  fn parse(&mut self, source: &str) -> GfResult<ParseOutcome> {
    let (index, artifact) = self.require()?;
    let entry = index.entry_rule().ok_or_else(|| GramforgeError::GrammarLookup("grammar has no entry rule".into()))?.to_string();
    let (tokens, mut diagnostics) = Lexer::new(source, index).tokenize();
    debug!(token_count = tokens.len(), %entry, "compiled backend starting full parse");

    let engine = Engine::new(&tokens, index, artifact, None);
    let (green, parse_diags) = engine.parse_entry(&entry);
    diagnostics.extend(parse_diags);

    let tree = SyntaxTree::new(green, index.clone());
    diagnostics.extend(error_diagnostics(tree.root(), source));
    self.last_incremental = None;
    Ok(ParseOutcome { tree, diagnostics })
  }

  fn parse_incremental(&mut self, previous: &SyntaxTree, new_source: &str, changes: &[TextChange]) -> GfResult<ParseOutcome> {
    let (index, artifact) = self.require()?;
    let entry = index.entry_rule().ok_or_else(|| GramforgeError::GrammarLookup("grammar has no entry rule".into()))?.to_string();
    let (tokens, mut diagnostics) = Lexer::new(new_source, index).tokenize();

    let reuse = build_reuse_index(previous.root(), changes);
    debug!(token_count = tokens.len(), change_count = changes.len(), reuse_candidates = reuse.len(), "compiled backend starting incremental parse");
    self.last_incremental = Some(IncrementalState { change_count: changes.len(), candidate_fragments: reuse.len() });

    let engine = Engine::new(&tokens, index, artifact, Some(&reuse));
    let (green, parse_diags) = engine.parse_entry(&entry);
    diagnostics.extend(parse_diags);

    let tree = SyntaxTree::new(green, index.clone());
    diagnostics.extend(error_diagnostics(tree.root(), new_source));
    Ok(ParseOutcome { tree, diagnostics })
  }

  fn get_expected_tokens(&mut self, source: &str, offset: u32) -> GfResult<Vec<ExpectedToken>> {
    let (index, artifact) = self.require()?;
    let entry = index.entry_rule().ok_or_else(|| GramforgeError::GrammarLookup("grammar has no entry rule".into()))?.to_string();
    let truncated = &source[..(offset as usize).min(source.len())];
    let (tokens, _) = Lexer::new(truncated, index).tokenize();

    let engine = Engine::new(&tokens, index, artifact, None);
    let kinds = engine.expected_tokens_for(&entry);
    Ok(kinds.into_iter().filter_map(|k| index.kind_name(k).map(|name| ExpectedToken { kind_name: name.to_string(), is_keyword: name.starts_with("kw:") })).collect())
  }

  fn dispose(&mut self) {
    self.index = None;
    self.artifact = None;
    self.last_incremental = None;
  }

  fn supports_incremental(&self) -> bool {
    true
  }
}
