//! FIRST/FOLLOW set computation driving the interpreted backend's
//! alternative-selection and error-recovery synchronization decisions.
//!
//! There is no precompiled parse table here (that's what distinguishes this
//! backend from `gramforge-lr`): these sets are derived once per
//! [GrammarIndex] at `configure()` time and then consulted by the
//! tree-walking interpreter in `backend.rs`, which still re-derives its
//! parse decisions from the grammar's own `RuleExpr` shape on every call.

use gramforge_core::grammar_index::{keyword_kind_name, GfKind, GrammarIndex};
use gramforge_core::grammar_model::RuleExpr;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct FollowSets {
  pub first:    HashMap<String, HashSet<GfKind>>,
  pub nullable: HashSet<String>,
  pub follow:   HashMap<String, HashSet<GfKind>>,
}

impl FollowSets {
  pub fn build(index: &GrammarIndex) -> Self {
    let mut sets = FollowSets::default();
    sets.compute_first(index);
    sets.compute_follow(index);
    sets
  }

  fn compute_first(&mut self, index: &GrammarIndex) {
    loop {
      let mut changed = false;
      for (name, rule) in &index.model().rules {
        let (f, n) = first_of_expr(&rule.body, &self.first, &self.nullable, index);
        let entry = self.first.entry(name.clone()).or_default();
        let before = entry.len();
        entry.extend(f);
        if entry.len() != before {
          changed = true;
        }
        if n && self.nullable.insert(name.clone()) {
          changed = true;
        }
      }
      if !changed {
        break;
      }
    }
  }

  fn compute_follow(&mut self, index: &GrammarIndex) {
    loop {
      let mut changed = false;
      for (name, rule) in &index.model().rules {
        let next_first = self.follow.get(name).cloned().unwrap_or_default();
        collect_follow(&rule.body, index, &self.first, &self.nullable, &next_first, true, &mut self.follow, &mut changed);
      }
      if !changed {
        break;
      }
    }
  }

  pub fn first_of(&self, rule: &str) -> HashSet<GfKind> {
    self.first.get(rule).cloned().unwrap_or_default()
  }

  pub fn is_nullable(&self, rule: &str) -> bool {
    self.nullable.contains(rule)
  }

  pub fn follow_of(&self, rule: &str) -> HashSet<GfKind> {
    self.follow.get(rule).cloned().unwrap_or_default()
  }
}

pub fn first_of_expr(expr: &RuleExpr, first: &HashMap<String, HashSet<GfKind>>, nullable: &HashSet<String>, index: &GrammarIndex) -> (HashSet<GfKind>, bool) {
  match expr {
    RuleExpr::Keyword(v) => (index.keyword_kind(v).into_iter().collect(), false),
    RuleExpr::Terminal(name) => (index.terminal_kind(name).into_iter().collect(), false),
    RuleExpr::NonTerminal(name) => (first.get(name).cloned().unwrap_or_default(), nullable.contains(name)),
    // A cross-reference consumes a single identifier-shaped token in this
    // workbench's fixed lexical vocabulary (see `lexer.rs`).
    RuleExpr::CrossReference { .. } => (index.terminal_kind("ID").into_iter().collect(), false),
    RuleExpr::Assign { target, .. } => first_of_expr(target, first, nullable, index),
    RuleExpr::Sequence(items) => first_of_sequence(items, first, nullable, index),
    RuleExpr::Alternatives(items) => {
      let mut set = HashSet::new();
      let mut any_nullable = false;
      for i in items {
        let (f, n) = first_of_expr(i, first, nullable, index);
        set.extend(f);
        any_nullable |= n;
      }
      (set, any_nullable)
    }
    RuleExpr::Unordered(items) => {
      let mut set = HashSet::new();
      let mut all_nullable = true;
      for i in items {
        let (f, n) = first_of_expr(i, first, nullable, index);
        set.extend(f);
        all_nullable &= n;
      }
      (set, all_nullable)
    }
    RuleExpr::Group(inner) => first_of_expr(inner, first, nullable, index),
    RuleExpr::Optional(inner) => {
      let (f, _) = first_of_expr(inner, first, nullable, index);
      (f, true)
    }
    RuleExpr::Star(inner) => {
      let (f, _) = first_of_expr(inner, first, nullable, index);
      (f, true)
    }
    RuleExpr::Plus(inner) => first_of_expr(inner, first, nullable, index),
  }
}

fn first_of_sequence(items: &[RuleExpr], first: &HashMap<String, HashSet<GfKind>>, nullable: &HashSet<String>, index: &GrammarIndex) -> (HashSet<GfKind>, bool) {
  let mut set = HashSet::new();
  for item in items {
    let (f, n) = first_of_expr(item, first, nullable, index);
    set.extend(f);
    if !n {
      return (set, false);
    }
  }
  (set, true)
}

#[allow(clippy::too_many_arguments)]
fn collect_follow(
  expr: &RuleExpr,
  index: &GrammarIndex,
  first: &HashMap<String, HashSet<GfKind>>,
  nullable: &HashSet<String>,
  next_first: &HashSet<GfKind>,
  next_nullable: bool,
  follow: &mut HashMap<String, HashSet<GfKind>>,
  changed: &mut bool,
) {
  match expr {
    RuleExpr::Keyword(_) | RuleExpr::Terminal(_) | RuleExpr::CrossReference { .. } => {}
    RuleExpr::NonTerminal(name) => {
      // `next_first`/`next_nullable` already folds in the owning rule's own
      // follow set when nothing but nullable symbols remain after this
      // point (see the per-rule seed in `compute_follow`), so there is
      // nothing further to propagate here.
      let entry = follow.entry(name.clone()).or_default();
      let before = entry.len();
      entry.extend(next_first.iter().copied());
      if entry.len() != before {
        *changed = true;
      }
    }
    RuleExpr::Assign { target, .. } => collect_follow(target, index, first, nullable, next_first, next_nullable, follow, changed),
    RuleExpr::Sequence(items) => {
      for i in 0..items.len() {
        let (suffix_first, suffix_nullable) = first_of_sequence(&items[i + 1..], first, nullable, index);
        let (eff_first, eff_nullable) = if suffix_nullable {
          let mut combined = suffix_first;
          combined.extend(next_first.iter().copied());
          (combined, next_nullable)
        } else {
          (suffix_first, false)
        };
        collect_follow(&items[i], index, first, nullable, &eff_first, eff_nullable, follow, changed);
      }
    }
    RuleExpr::Alternatives(items) | RuleExpr::Unordered(items) => {
      for i in items {
        collect_follow(i, index, first, nullable, next_first, next_nullable, follow, changed);
      }
    }
    RuleExpr::Group(inner) => collect_follow(inner, index, first, nullable, next_first, next_nullable, follow, changed),
    RuleExpr::Optional(inner) => collect_follow(inner, index, first, nullable, next_first, next_nullable, follow, changed),
    RuleExpr::Star(inner) | RuleExpr::Plus(inner) => {
      let (self_first, _) = first_of_expr(inner, first, nullable, index);
      let mut combined = self_first;
      combined.extend(next_first.iter().copied());
      collect_follow(inner, index, first, nullable, &combined, true, follow, changed);
    }
  }
}

/// The keyword kind for a literal value, for callers outside this module
/// that only have the raw string.
pub fn keyword_kind(index: &GrammarIndex, value: &str) -> Option<GfKind> {
  index.kind_id(&keyword_kind_name(value))
}

#[cfg(test)]
mod test {
  use super::*;
  use gramforge_core::grammar_model::*;
  use gramforge_core::GrammarIndex;

  #[test]
  fn first_set_includes_leading_keyword() {
    let model = GrammarBuilder::new()
      .entry("Model")
      .rule("Model", seq(vec![kw("model"), assign("name", term("ID"))]))
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let sets = FollowSets::build(&index);
    let first = sets.first_of("Model");
    assert!(first.contains(&index.keyword_kind("model").unwrap()));
  }

  #[test]
  fn optional_rule_is_nullable() {
    let model = GrammarBuilder::new().entry("Model").rule("Model", opt(kw("model"))).build();
    let index = GrammarIndex::build(model).unwrap();
    let sets = FollowSets::build(&index);
    assert!(sets.is_nullable("Model"));
  }
}
