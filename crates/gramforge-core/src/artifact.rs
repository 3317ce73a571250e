//! Serializable artifact shapes the grammar translator emits for the
//! compiled backend (spec.md §4.5, §6): pre-built parse tables, the field
//! map and the keyword set. The interpreted backend never sees these —
//! it derives everything it needs from the [crate::GrammarIndex] itself at
//! `configure()` time, since running a translation step is precisely what
//! distinguishes "interpreted" from "compiled" in this workbench.
//!
//! Kept in `gramforge-core` (rather than `gramforge-translate` or
//! `gramforge-lr`) because both the producer and the consumer need the
//! same shape without creating a dependency cycle between those crates.

use crate::grammar_index::GfKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Pre-built FIRST/FOLLOW/nullability tables for every rule in a grammar,
/// computed once by `gramforge-translate` and loaded as-is by
/// `gramforge-lr` at parse time — no table derivation happens in the
/// compiled backend itself.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParseTables {
  /// Identifies which [crate::GrammarIndex] these tables were built
  /// against; the compiled backend refuses to load tables whose
  /// fingerprint doesn't match the index it was configured with
  /// (spec.md §4.5, "a stale compiled artifact must be rejected rather
  /// than silently misparse").
  pub grammar_fingerprint: u64,
  pub first:    HashMap<String, Vec<u16>>,
  pub nullable: HashSet<String>,
  pub follow:   HashMap<String, Vec<u16>>,
}

impl ParseTables {
  pub fn first_kinds(&self, rule: &str) -> Vec<GfKind> {
    self.first.get(rule).map(|v| v.iter().map(|k| GfKind(*k)).collect()).unwrap_or_default()
  }

  pub fn follow_kinds(&self, rule: &str) -> Vec<GfKind> {
    self.follow.get(rule).map(|v| v.iter().map(|k| GfKind(*k)).collect()).unwrap_or_default()
  }

  pub fn is_nullable(&self, rule: &str) -> bool {
    self.nullable.contains(rule)
  }
}

/// A serializable mirror of [crate::grammar_index::FieldSelector], since the
/// latter borrows grammar-owned strings and isn't itself meant to cross a
/// serialization boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FieldSelectorArtifact {
  WrapperKind(String),
  ByCalleeKinds(Vec<String>),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldMapArtifact {
  pub fields: HashMap<String, FieldSelectorArtifact>,
}

impl FieldMapArtifact {
  pub fn key(rule: &str, property: &str) -> String {
    format!("{rule}::{property}")
  }

  pub fn insert(&mut self, rule: &str, property: &str, selector: FieldSelectorArtifact) {
    self.fields.insert(Self::key(rule, property), selector);
  }

  pub fn get(&self, rule: &str, property: &str) -> Option<&FieldSelectorArtifact> {
    self.fields.get(&Self::key(rule, property))
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KeywordSetArtifact {
  pub values: Vec<String>,
}

/// The full bundle the compiled translator produces for one grammar: the
/// generated grammar-table program plus the two auxiliary JSON-shaped
/// artifacts (spec.md §4.5).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompiledArtifact {
  pub tables:     ParseTables,
  pub field_map:  FieldMapArtifact,
  pub keywords:   KeywordSetArtifact,
}
