//! Parser configuration and classification.
//!
//! Carried over in spirit from `radlr-core/types/parser_config.rs`
//! (`ParserConfig`, `ParserClassification`, the `llk`/`lrk`/`ll1`/`set_k`
//! builder methods and the `"LL(k)"`/`"LR(k)"`/`"GLR"` classification
//! string), generalized with a `backend` field since this workbench picks
//! between two concrete adapters rather than emitting one bytecode target.

#![allow(non_snake_case)]

/// Which parser backend produced (or should produce) a parse.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BackendKind {
  /// The runtime LL backend (`gramforge-ll`); no build step, no incremental
  /// reuse.
  Interpreted,
  /// The pre-compiled LR backend (`gramforge-lr`); requires translator
  /// artifacts, supports incremental reuse.
  Compiled,
}

/// Settings for configuring the kind of parser gramforge will run.
#[derive(Clone, Copy, Debug)]
pub struct ParserConfig {
  /// Which backend this configuration targets.
  pub backend: BackendKind,
  /// When enabled, the compiled backend may produce LR-style goto actions.
  /// Disabled, grammars requiring them are rejected with a diagnostic.
  pub ALLOW_LR: bool,
  /// When enabled, unrestricted lookahead states may be generated.
  /// Disabled, grammars that require `k>1` lookahead are rejected.
  pub ALLOW_PEEKING: bool,
  /// The maximum number of lookahead symbols allowed before parser
  /// construction is aborted or a different disambiguating strategy is used.
  pub max_k: u32,
}

impl Default for ParserConfig {
  fn default() -> Self {
    Self { backend: BackendKind::Interpreted, ALLOW_LR: false, ALLOW_PEEKING: true, max_k: 8 }
  }
}

impl ParserConfig {
  pub fn new() -> Self {
    Self::default().set_k(8)
  }

  pub fn to_classification(&self) -> ParserClassification {
    ParserClassification { max_k: self.max_k as u16, bottom_up: self.ALLOW_LR, backend: self.backend }
  }

  /// LL(k): runtime interpreted backend, no goto actions.
  pub fn llk(mut self, k: u32) -> Self {
    self.backend = BackendKind::Interpreted;
    self.ALLOW_LR = false;
    self.set_k(k)
  }

  /// LR(k): pre-compiled backend with goto actions and subtree reuse.
  pub fn lrk(mut self, k: u32) -> Self {
    self.backend = BackendKind::Compiled;
    self.ALLOW_LR = true;
    self.set_k(k)
  }

  pub fn ll1(self) -> Self {
    self.llk(1)
  }

  pub fn set_k(mut self, k: u32) -> Self {
    self.ALLOW_PEEKING = k > 1;
    self.max_k = k;
    self
  }
}

/// Tracks the kind of parser that was produced, for host tooling / tests
/// that assert on the classification string (spec.md §8's cross-backend
/// sanity checks).
#[derive(Clone, Copy, Debug)]
pub struct ParserClassification {
  pub max_k:     u16,
  pub bottom_up: bool,
  pub backend:   BackendKind,
}

impl ParserClassification {
  /// Returns the classification as an algorithm acronym string, one of
  /// `LL(k)` or `LR(k)`.
  pub fn to_string(&self) -> String {
    let base = if self.bottom_up { "LR" } else { "LL" };
    if self.max_k > 64 {
      format!("{base}(*)")
    } else {
      format!("{base}({})", self.max_k)
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn classification_strings() {
    assert_eq!(ParserConfig::new().llk(1).to_classification().to_string(), "LL(1)");
    assert_eq!(ParserConfig::new().lrk(2).to_classification().to_string(), "LR(2)");
  }
}
