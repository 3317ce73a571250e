//! LL translation: validate-only. Unlike the compiled path, nothing is
//! emitted for the interpreted backend to load — `gramforge-ll` derives its
//! FIRST/FOLLOW tables itself, at `configure()` time, straight from the
//! [GrammarIndex]. This module exists purely to catch grammar shapes the
//! interpreted backend's recursive-descent strategy cannot handle before a
//! host wastes time parsing against it (spec.md §4.2's "the LL path of the
//! translator performs validation only").

use crate::first_nullable::{leftmost_calls, Analysis};
use gramforge_core::{Diagnostic, GrammarIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Runs every LL-readiness check and returns the diagnostics found. An
/// empty result means the grammar is safe to hand directly to
/// `gramforge-ll::InterpretedBackend`.
pub fn validate(index: &GrammarIndex) -> Vec<Diagnostic> {
  let mut diagnostics = Vec::new();
  diagnostics.extend(check_dangling_references(index));
  diagnostics.extend(check_left_recursion(index));
  diagnostics.extend(check_first_first_conflicts(index));
  diagnostics.extend(check_precedence_features(index));
  diagnostics.extend(crate::regex_translate::validate_patterns(index));
  debug!(rule_count = index.rule_names().count(), diagnostic_count = diagnostics.len(), "ll_translator::validate finished");
  diagnostics
}

fn check_dangling_references(index: &GrammarIndex) -> Vec<Diagnostic> {
  let mut out = Vec::new();
  for name in index.rule_names() {
    let Some(rule) = index.rule(name) else { continue };
    walk_nonterminals(&rule.body, &mut |called| {
      if !index.rule_exists(called) {
        out.push(Diagnostic::translator_error(format!("rule '{name}' references undefined rule '{called}'")));
      }
    });
  }
  out
}

fn walk_nonterminals(expr: &gramforge_core::grammar_model::RuleExpr, visit: &mut impl FnMut(&str)) {
  use gramforge_core::grammar_model::RuleExpr::*;
  match expr {
    NonTerminal(name) => visit(name),
    Assign { target, .. } => walk_nonterminals(target, visit),
    Sequence(items) | Alternatives(items) | Unordered(items) => {
      for i in items {
        walk_nonterminals(i, visit);
      }
    }
    Group(inner) | Optional(inner) | Star(inner) | Plus(inner) => walk_nonterminals(inner, visit),
    Keyword(_) | Terminal(_) | CrossReference { .. } => {}
  }
}

/// Detects rules whose leftmost call graph cycles back to themselves — a
/// recursive-descent interpreter would recurse on such a rule without ever
/// consuming a token (spec.md §5's "infinite-loop" edge case).
fn check_left_recursion(index: &GrammarIndex) -> Vec<Diagnostic> {
  let analysis = Analysis::compute(index);
  let mut graph: HashMap<String, HashSet<String>> = HashMap::new();
  for name in index.rule_names() {
    let Some(rule) = index.rule(name) else { continue };
    let calls: HashSet<String> = leftmost_calls(&rule.body, &analysis.nullable).into_iter().collect();
    graph.insert(name.to_string(), calls);
  }

  let mut out = Vec::new();
  for start in index.rule_names() {
    if reaches_itself(start, start, &graph, &mut HashSet::new()) {
      out.push(Diagnostic::translator_error(format!("rule '{start}' is left-recursive; the interpreted backend cannot parse it")));
    }
  }
  out
}

fn reaches_itself(start: &str, current: &str, graph: &HashMap<String, HashSet<String>>, visited: &mut HashSet<String>) -> bool {
  let Some(calls) = graph.get(current) else { return false };
  for next in calls {
    if next == start {
      return true;
    }
    if visited.insert(next.clone()) && reaches_itself(start, next, graph, visited) {
      return true;
    }
  }
  false
}

/// Warns when two branches of an `Alternatives` node share a FIRST kind:
/// the interpreted backend's predictive choice picks whichever branch is
/// declared first, silently shadowing the other (spec.md §5's ambiguity
/// edge case).
fn check_first_first_conflicts(index: &GrammarIndex) -> Vec<Diagnostic> {
  let analysis = Analysis::compute(index);
  let mut out = Vec::new();
  for name in index.rule_names() {
    let Some(rule) = index.rule(name) else { continue };
    find_alternatives(&rule.body, &mut |items| {
      for i in 0..items.len() {
        for j in (i + 1)..items.len() {
          let (fi, _) = crate::first_nullable::first_of(&items[i], &analysis.first, &analysis.nullable, index);
          let (fj, _) = crate::first_nullable::first_of(&items[j], &analysis.first, &analysis.nullable, index);
          if fi.intersection(&fj).next().is_some() {
            out.push(Diagnostic::translator_warning(format!(
              "rule '{name}' has ambiguous alternatives (branches {i} and {j} share a leading token)"
            )));
          }
        }
      }
    });
  }
  out
}

/// Spec.md §5 splits unsupported grammar features into two severities:
/// some "require the compiled backend" outright (`@dynamicPrecedence` is
/// named explicitly), while infix/precedence declarations are only
/// "partially supported" — the interpreted backend still parses the rule
/// via its executable (left-recursion-eliminated) body, it just ignores
/// precedence and associativity, so a host that cares about operator
/// binding should translate for the compiled backend instead.
fn check_precedence_features(index: &GrammarIndex) -> Vec<Diagnostic> {
  let mut out = Vec::new();
  for name in index.rule_names() {
    let Some(rule) = index.rule(name) else { continue };
    if rule.dynamic_precedence.is_some() {
      out.push(Diagnostic::translator_error(format!(
        "rule '{name}' declares @dynamicPrecedence, which requires the compiled backend"
      )));
    }
    if rule.infix.is_some() {
      out.push(Diagnostic::translator_warning(format!(
        "rule '{name}' is an infix rule; the interpreted backend ignores its precedence/associativity and parses left-associatively"
      )));
    }
  }
  out
}

fn find_alternatives(expr: &gramforge_core::grammar_model::RuleExpr, visit: &mut impl FnMut(&[gramforge_core::grammar_model::RuleExpr])) {
  use gramforge_core::grammar_model::RuleExpr::*;
  match expr {
    Alternatives(items) => {
      visit(items);
      for i in items {
        find_alternatives(i, visit);
      }
    }
    Assign { target, .. } | Group(target) | Optional(target) | Star(target) | Plus(target) => find_alternatives(target, visit),
    Sequence(items) | Unordered(items) => {
      for i in items {
        find_alternatives(i, visit);
      }
    }
    Keyword(_) | Terminal(_) | NonTerminal(_) | CrossReference { .. } => {}
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use gramforge_core::grammar_model::*;

  #[test]
  fn flags_left_recursion() {
    let model = GrammarBuilder::new().entry("Expr").rule("Expr", seq(vec![call("Expr"), kw("+"), term("INT")])).build();
    let index = GrammarIndex::build(model).unwrap();
    let diags = validate(&index);
    assert!(diags.iter().any(|d| d.is_error()));
  }

  #[test]
  fn infix_rules_are_flagged_as_only_partially_supported() {
    // The interpreted backend can still execute an infix rule's body —
    // `infix_rule` builds it as a left-recursion-eliminated iteration, not
    // a genuinely left-recursive call chain — but it has no notion of
    // precedence or associativity, so it gets a warning rather than an
    // error (spec.md §5's "partially supported" bucket), unlike
    // `@dynamicPrecedence`, which is a hard compiled-backend requirement.
    let model = GrammarBuilder::new()
      .entry("Additive")
      .infix_rule("Additive", "Primary", vec![left(&["+", "-"])])
      .rule("Primary", term("INT"))
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let diags = validate(&index);
    assert!(diags.iter().any(|d| !d.is_error() && d.message.contains("Additive") && d.message.contains("infix")));
    assert!(diags.iter().all(|d| !d.is_error()));
  }

  #[test]
  fn dynamic_precedence_is_flagged_as_requiring_the_compiled_backend() {
    let model = GrammarBuilder::new()
      .entry("Expr")
      .rule("Expr", term("INT"))
      .dynamic_precedence("Expr", 1)
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let diags = validate(&index);
    assert!(diags.iter().any(|d| d.is_error() && d.message.contains("dynamicPrecedence")));
  }

  #[test]
  fn accepts_a_clean_grammar() {
    let model = GrammarBuilder::new().entry("Model").rule("Model", seq(vec![kw("model"), assign("name", term("ID"))])).build();
    let index = GrammarIndex::build(model).unwrap();
    let diags = validate(&index);
    assert!(diags.iter().all(|d| !d.is_error()));
  }
}
