//! FIRST/FOLLOW/nullable computation used by both translators.
//!
//! This mirrors the algorithm `gramforge-ll::follow_sets` runs at
//! `configure()` time, but the translator needs its own copy: the whole
//! point of a *compiled* backend is that this analysis runs once, ahead of
//! time, and its result is serialized into [gramforge_core::ParseTables]
//! rather than recomputed on every parse. Keeping the two copies separate
//! also keeps `gramforge-translate` from depending on `gramforge-ll`, which
//! would be a backwards dependency (the translator feeds the compiled
//! backend, not the interpreted one).

use gramforge_core::grammar_index::GfKind;
use gramforge_core::grammar_model::RuleExpr;
use gramforge_core::GrammarIndex;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct Analysis {
  pub first:    HashMap<String, HashSet<GfKind>>,
  pub nullable: HashSet<String>,
  pub follow:   HashMap<String, HashSet<GfKind>>,
}

impl Analysis {
  pub fn compute(index: &GrammarIndex) -> Self {
    let mut a = Analysis::default();
    a.compute_first(index);
    a.compute_follow(index);
    a
  }

  fn compute_first(&mut self, index: &GrammarIndex) {
    loop {
      let mut changed = false;
      for (name, rule) in &index.model().rules {
        let (f, n) = first_of(&rule.body, &self.first, &self.nullable, index);
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
        let seed = self.follow.get(name).cloned().unwrap_or_default();
        follow_contrib(&rule.body, index, &self.first, &self.nullable, &seed, true, &mut self.follow, &mut changed);
      }
      if !changed {
        break;
      }
    }
  }
}

pub fn first_of(expr: &RuleExpr, first: &HashMap<String, HashSet<GfKind>>, nullable: &HashSet<String>, index: &GrammarIndex) -> (HashSet<GfKind>, bool) {
  match expr {
    RuleExpr::Keyword(v) => (index.keyword_kind(v).into_iter().collect(), false),
    RuleExpr::Terminal(name) => (index.terminal_kind(name).into_iter().collect(), false),
    RuleExpr::NonTerminal(name) => (first.get(name).cloned().unwrap_or_default(), nullable.contains(name)),
    RuleExpr::CrossReference { .. } => (index.terminal_kind("ID").into_iter().collect(), false),
    RuleExpr::Assign { target, .. } => first_of(target, first, nullable, index),
    RuleExpr::Sequence(items) => first_of_seq(items, first, nullable, index),
    RuleExpr::Alternatives(items) => {
      let mut set = HashSet::new();
      let mut any_nullable = false;
      for i in items {
        let (f, n) = first_of(i, first, nullable, index);
        set.extend(f);
        any_nullable |= n;
      }
      (set, any_nullable)
    }
    RuleExpr::Unordered(items) => {
      let mut set = HashSet::new();
      let mut all_nullable = true;
      for i in items {
        let (f, n) = first_of(i, first, nullable, index);
        set.extend(f);
        all_nullable &= n;
      }
      (set, all_nullable)
    }
    RuleExpr::Group(inner) => first_of(inner, first, nullable, index),
    RuleExpr::Optional(inner) => (first_of(inner, first, nullable, index).0, true),
    RuleExpr::Star(inner) => (first_of(inner, first, nullable, index).0, true),
    RuleExpr::Plus(inner) => first_of(inner, first, nullable, index),
  }
}

pub fn first_of_seq(items: &[RuleExpr], first: &HashMap<String, HashSet<GfKind>>, nullable: &HashSet<String>, index: &GrammarIndex) -> (HashSet<GfKind>, bool) {
  let mut set = HashSet::new();
  for item in items {
    let (f, n) = first_of(item, first, nullable, index);
    set.extend(f);
    if !n {
      return (set, false);
    }
  }
  (set, true)
}

#[allow(clippy::too_many_arguments)]
fn follow_contrib(
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
      let entry = follow.entry(name.clone()).or_default();
      let before = entry.len();
      entry.extend(next_first.iter().copied());
      if entry.len() != before {
        *changed = true;
      }
    }
    RuleExpr::Assign { target, .. } => follow_contrib(target, index, first, nullable, next_first, next_nullable, follow, changed),
    RuleExpr::Sequence(items) => {
      for i in 0..items.len() {
        let (suffix_first, suffix_nullable) = first_of_seq(&items[i + 1..], first, nullable, index);
        let (eff_first, eff_nullable) = if suffix_nullable {
          let mut combined = suffix_first;
          combined.extend(next_first.iter().copied());
          (combined, next_nullable)
        } else {
          (suffix_first, false)
        };
        follow_contrib(&items[i], index, first, nullable, &eff_first, eff_nullable, follow, changed);
      }
    }
    RuleExpr::Alternatives(items) | RuleExpr::Unordered(items) => {
      for i in items {
        follow_contrib(i, index, first, nullable, next_first, next_nullable, follow, changed);
      }
    }
    RuleExpr::Group(inner) | RuleExpr::Optional(inner) => follow_contrib(inner, index, first, nullable, next_first, next_nullable, follow, changed),
    RuleExpr::Star(inner) | RuleExpr::Plus(inner) => {
      let (self_first, _) = first_of(inner, first, nullable, index);
      let mut combined = self_first;
      combined.extend(next_first.iter().copied());
      follow_contrib(inner, index, first, nullable, &combined, true, follow, changed);
    }
  }
}

/// Rule names that can appear as the leftmost call in `expr`, used by the
/// LL translator's left-recursion check.
pub fn leftmost_calls(expr: &RuleExpr, nullable: &HashSet<String>) -> Vec<String> {
  match expr {
    RuleExpr::NonTerminal(name) => vec![name.clone()],
    RuleExpr::Assign { target, .. } => leftmost_calls(target, nullable),
    RuleExpr::Sequence(items) => {
      let mut out = Vec::new();
      for item in items {
        out.extend(leftmost_calls(item, nullable));
        if !is_nullable_expr(item, nullable) {
          break;
        }
      }
      out
    }
    RuleExpr::Alternatives(items) | RuleExpr::Unordered(items) => items.iter().flat_map(|i| leftmost_calls(i, nullable)).collect(),
    RuleExpr::Group(inner) | RuleExpr::Optional(inner) | RuleExpr::Star(inner) | RuleExpr::Plus(inner) => leftmost_calls(inner, nullable),
    RuleExpr::Keyword(_) | RuleExpr::Terminal(_) | RuleExpr::CrossReference { .. } => Vec::new(),
  }
}

fn is_nullable_expr(expr: &RuleExpr, nullable: &HashSet<String>) -> bool {
  match expr {
    RuleExpr::NonTerminal(name) => nullable.contains(name),
    RuleExpr::Optional(_) | RuleExpr::Star(_) => true,
    RuleExpr::Assign { target, .. } | RuleExpr::Group(target) | RuleExpr::Plus(target) => is_nullable_expr(target, nullable),
    RuleExpr::Sequence(items) => items.iter().all(|i| is_nullable_expr(i, nullable)),
    RuleExpr::Alternatives(items) => items.iter().any(|i| is_nullable_expr(i, nullable)),
    RuleExpr::Unordered(items) => items.iter().all(|i| is_nullable_expr(i, nullable)),
    RuleExpr::Keyword(_) | RuleExpr::Terminal(_) | RuleExpr::CrossReference { .. } => false,
  }
}
