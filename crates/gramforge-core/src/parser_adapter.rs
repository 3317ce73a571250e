//! The Parser Adapter (PA) contract: the one trait both backends implement,
//! letting host code swap `gramforge-ll` and `gramforge-lr` without caring
//! which produced a given [SyntaxTree] (spec.md §4.2).
//!
//! Grounded on the adapter/builder seam `radlr-core`'s `build_graph_beta`
//! module exposes around its own graph-construction entry points (a
//! configure-then-drive shape), generalized here to the two-backend,
//! incremental-or-not contract spec.md §4 requires.

use crate::config::ParserConfig;
use crate::diagnostic::Diagnostic;
use crate::error::GfResult;
use crate::grammar_index::GrammarIndex;
use crate::syntax_tree::SyntaxTree;
use crate::token::ByteRange;
use std::sync::Arc;

/// A single edit to previously parsed text, in the shape both backends
/// accept for incremental reparsing (spec.md §4.3's "text change" input).
#[derive(Clone, Debug)]
pub struct TextChange {
  /// The byte range in the *old* text this edit replaces.
  pub range:        ByteRange,
  /// The text that now occupies that range.
  pub inserted_text: String,
}

/// The result of a parse: the tree plus every diagnostic raised while
/// building it, normalized to the uniform shape (spec.md §7) regardless of
/// backend.
#[derive(Clone)]
pub struct ParseOutcome {
  pub tree:        SyntaxTree,
  pub diagnostics: Vec<Diagnostic>,
}

/// A token the parser would accept at a given position, used by editor
/// tooling for completion (spec.md §4.4's `getExpectedTokens`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedToken {
  pub kind_name: String,
  /// True if this token is a keyword rather than an open-ended terminal
  /// class (e.g. `ID`, `INT`).
  pub is_keyword: bool,
}

/// Implemented by both `gramforge-ll::InterpretedBackend` and
/// `gramforge-lr::CompiledBackend`. Host code programs against this trait
/// object and never needs to know which backend it holds (spec.md §4.2,
/// invariant "the PA surface carries no backend-specific types").
pub trait ParserAdapter {
  /// Binds this adapter to a grammar. Must be called before any other
  /// method; implementations return [crate::error::GramforgeError::NotConfigured]
  /// otherwise.
  fn configure(&mut self, index: Arc<GrammarIndex>, config: ParserConfig) -> GfResult<()>;

  /// Parses `source` from scratch.
  fn parse(&mut self, source: &str) -> GfResult<ParseOutcome>;

  /// Reparses, reusing as much of `previous` as the backend's strategy
  /// allows. The interpreted backend always returns
  /// [crate::error::GramforgeError::IncrementalUnsupported]; the compiled
  /// backend performs subtree reuse (spec.md §4.3, §4.5).
  fn parse_incremental(&mut self, previous: &SyntaxTree, new_source: &str, changes: &[TextChange]) -> GfResult<ParseOutcome>;

  /// Lists the tokens that would be syntactically valid at `offset` in
  /// `source`, without committing to a full reparse.
  fn get_expected_tokens(&mut self, source: &str, offset: u32) -> GfResult<Vec<ExpectedToken>>;

  /// Releases any backend-held resources (compiled table caches, incremental
  /// parse state). Idempotent.
  fn dispose(&mut self);

  /// True for backends that implement [ParserAdapter::parse_incremental]
  /// rather than erroring out of it.
  fn supports_incremental(&self) -> bool;
}
