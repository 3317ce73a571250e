//! Internal/fatal error type for conditions that are programmer errors
//! rather than user-facing syntax problems (spec.md §7: "Internal errors...
//! raised to the host as fatal; these never appear in a user-visible
//! diagnostic stream").
//!
//! `radlr-core` threads its own `RadlrResult<T>` / `RadlrError` through the
//! whole compilation pipeline (see `parser_db.rs`'s use of `RadlrResult` and
//! the `o_to_r` helper); `thiserror` stands in for that hand-rolled enum
//! here, following the pattern already used by `plotnik-core` /
//! `plotnik-bytecode` in this pack.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GramforgeError {
  #[error("adapter used before configure(): {0}")]
  NotConfigured(&'static str),

  #[error("backend does not support incremental parsing: {0}")]
  IncrementalUnsupported(&'static str),

  #[error("grammar index lookup failed: {0}")]
  GrammarLookup(String),

  #[error("malformed parse tables: {0}")]
  MalformedTables(String),

  #[error("translation failed: {0}")]
  TranslationFailed(String),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

pub type GfResult<T> = Result<T, GramforgeError>;

/// Lifts an `Option` into a [GfResult], mirroring `radlr-core`'s `o_to_r`
/// helper used throughout `parser_db.rs` lookups.
pub fn o_to_r<T>(opt: Option<T>, msg: &str) -> GfResult<T> {
  opt.ok_or_else(|| GramforgeError::GrammarLookup(msg.to_string()))
}
