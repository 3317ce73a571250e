//! LR translation: full artifact emission. Where [crate::ll_translator]
//! only validates, this module actually compiles the grammar — FIRST/
//! FOLLOW/nullable tables, the field map, the keyword set and a textual
//! grammar dump — into a [CompiledArtifact] the compiled backend loads
//! wholesale at `configure()` time (spec.md §4.5, §6).

use crate::first_nullable::Analysis;
use gramforge_core::artifact::{CompiledArtifact, FieldMapArtifact, FieldSelectorArtifact, KeywordSetArtifact, ParseTables};
use gramforge_core::error::{GfResult, GramforgeError};
use gramforge_core::grammar_index::FieldSelector;
use gramforge_core::grammar_model::{AssignOp, Associativity, Directive, RuleExpr, RuleKind};
use gramforge_core::{Diagnostic, GrammarIndex};
use std::collections::HashSet;
use tracing::debug;

/// Compiles `index` into the bundle `gramforge-lr::CompiledBackend` loads,
/// plus any advisory diagnostics the translation rules of spec.md §4.5
/// produced along the way (e.g. an unordered group too large to enumerate).
/// Fails if the grammar has no entry rule — there is nothing to generate a
/// start state for — or if a translator error (rather than a warning) was
/// found.
pub fn compile(index: &GrammarIndex) -> GfResult<(CompiledArtifact, Vec<Diagnostic>)> {
  index.entry_rule().ok_or_else(|| GramforgeError::TranslationFailed("grammar has no entry rule".into()))?;

  let mut diagnostics = crate::regex_translate::validate_patterns(index);
  diagnostics.extend(check_unordered_group_sizes(index));
  if let Some(bad) = diagnostics.iter().find(|d| d.is_error()) {
    return Err(GramforgeError::TranslationFailed(bad.message.clone()));
  }

  let analysis = Analysis::compute(index);
  let tables = ParseTables {
    grammar_fingerprint: index.fingerprint(),
    first: analysis.first.iter().map(|(k, v)| (k.clone(), v.iter().map(|g| g.0).collect())).collect(),
    nullable: analysis.nullable.clone(),
    follow: analysis.follow.iter().map(|(k, v)| (k.clone(), v.iter().map(|g| g.0).collect())).collect(),
  };

  let field_map = build_field_map(index);
  let keywords = KeywordSetArtifact { values: index.keyword_values().map(|s| s.to_string()).collect() };

  debug!(fingerprint = tables.grammar_fingerprint, field_count = field_map.fields.len(), keyword_count = keywords.values.len(), warning_count = diagnostics.len(), "lr_translator::compile emitted artifact");
  Ok((CompiledArtifact { tables, field_map, keywords }, diagnostics))
}

fn build_field_map(index: &GrammarIndex) -> FieldMapArtifact {
  let mut map = FieldMapArtifact::default();
  let mut seen: HashSet<(String, String)> = HashSet::new();
  for rule in index.rule_names() {
    for info in index.assignments_for_rule(rule) {
      let key = (info.rule.clone(), info.property.clone());
      if !seen.insert(key.clone()) {
        continue;
      }
      if let Some(selector) = index.field_selector(&info.rule, &info.property) {
        let artifact = match selector {
          FieldSelector::WrapperKind(name) => FieldSelectorArtifact::WrapperKind(name.clone()),
          FieldSelector::ByCalleeKinds(kinds) => FieldSelectorArtifact::ByCalleeKinds(kinds.clone()),
        };
        map.insert(&info.rule, &info.property, artifact);
      }
    }
  }
  map
}

/// Walks every rule body looking for an [RuleExpr::Unordered] group with
/// more than 4 elements. Spec.md §4.5: "for n ≤ 4 elements, enumerated as
/// all n! permutations; for larger n, emitted as a sequence with a warning
/// diagnostic" — this is the half of that rule responsible for the
/// diagnostic; `render_expr` below is responsible for the enumeration
/// itself.
fn check_unordered_group_sizes(index: &GrammarIndex) -> Vec<Diagnostic> {
  let mut out = Vec::new();
  for name in index.rule_names() {
    let Some(rule) = index.rule(name) else { continue };
    walk_unordered(&rule.body, &mut |items| {
      if items.len() > 4 {
        out.push(Diagnostic::translator_warning(format!(
          "rule '{name}' has an unordered group of {} elements; only groups of 4 or fewer are permutation-enumerated, falling back to a plain sequence",
          items.len()
        )));
      }
    });
  }
  out
}

fn walk_unordered(expr: &RuleExpr, visit: &mut impl FnMut(&[RuleExpr])) {
  match expr {
    RuleExpr::Unordered(items) => {
      visit(items);
      for i in items {
        walk_unordered(i, visit);
      }
    }
    RuleExpr::Assign { target, .. } | RuleExpr::Group(target) | RuleExpr::Optional(target) | RuleExpr::Star(target) | RuleExpr::Plus(target) => {
      walk_unordered(target, visit)
    }
    RuleExpr::Sequence(items) | RuleExpr::Alternatives(items) => {
      for i in items {
        walk_unordered(i, visit);
      }
    }
    RuleExpr::Keyword(_) | RuleExpr::Terminal(_) | RuleExpr::NonTerminal(_) | RuleExpr::CrossReference { .. } => {}
  }
}

/// True for keywords shaped like an identifier (`model`, `extends`) rather
/// than an operator/punctuation keyword (`+`, `;`, `::`). Spec.md §4.5:
/// "identifier-shaped keywords are wrapped so they appear as named tokens
/// in the tree (`kw<"word">`); operator/punctuation keywords use inline
/// string literals."
fn is_identifier_shaped(value: &str) -> bool {
  let mut chars = value.chars();
  match chars.next() {
    Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
    _ => false,
  }
}

fn render_keyword(value: &str) -> String {
  if is_identifier_shaped(value) {
    format!("kw<\"{value}\">")
  } else {
    format!("'{value}'")
  }
}

/// Renders a plain-text dump of the grammar's rule bodies — the "grammar
/// file" artifact spec.md §4.5 lists alongside the field map and keyword
/// set, useful for diffing what the translator actually saw against a
/// golden file in tests.
pub fn emit_grammar_text(index: &GrammarIndex) -> String {
  let mut out = String::new();
  emit_directives(index, &mut out);
  for (name, pattern) in &index.model().terminal_patterns {
    out.push_str(&format!("token {name} /{}/\n", crate::regex_translate::to_backend_token_syntax(pattern)));
  }
  if !index.model().terminal_patterns.is_empty() {
    out.push('\n');
  }
  for name in index.rule_names() {
    let Some(rule) = index.rule(name) else { continue };
    if let Some(infix) = &rule.infix {
      emit_precedence_levels(infix, &mut out);
    }
    if let Some(n) = rule.dynamic_precedence {
      out.push_str(&format!("@dynamicPrecedence({n})\n"));
    }
    let rendered_name = if rule.kind == RuleKind::Fragment { name.to_lowercase() } else { name.to_string() };
    let rendered_body = match &rule.infix {
      Some(infix) => render_infix_body(&rendered_name, infix),
      None => render_expr(&rule.body),
    };
    out.push_str(&format!("{rendered_name} := {}\n", rendered_body));
  }
  out
}

fn emit_precedence_levels(infix: &gramforge_core::grammar_model::InfixSpec, out: &mut String) {
  for level in &infix.levels {
    let directive = match level.associativity {
      Associativity::Left => "@left",
      Associativity::Right => "@right",
    };
    let ops: Vec<String> = level.operators.iter().map(|o| format!("'{o}'")).collect();
    out.push_str(&format!("{directive}({})\n", ops.join(", ")));
  }
}

/// Emits every pass-through directive (spec.md §4.5: "conflicts, external
/// tokens, external contexts, local token groups, specialize / extend
/// blocks — emitted 1:1") in declaration order, ahead of the rule bodies.
fn emit_directives(index: &GrammarIndex, out: &mut String) {
  for directive in &index.model().directives {
    match directive {
      Directive::Conflict { rule, text } => out.push_str(&format!("@conflict({rule}) {{ {text} }}\n")),
      Directive::ExternalToken { name, text } => out.push_str(&format!("@externalToken({name}) {{ {text} }}\n")),
      Directive::ExternalContext { name, text } => out.push_str(&format!("@externalContext({name}) {{ {text} }}\n")),
      Directive::LocalTokenGroup { rule, text } => out.push_str(&format!("@localTokens({rule}) {{ {text} }}\n")),
      Directive::Specialize { text } => out.push_str(&format!("@specialize {{ {text} }}\n")),
      Directive::Extend { rule, text } => out.push_str(&format!("@extend({rule}) {{ {text} }}\n")),
    }
  }
  if !index.model().directives.is_empty() {
    out.push('\n');
  }
}

/// Renders an infix rule's textual form the way an external LR generator
/// expects it (spec.md §4.5, GLOSSARY "Infix rule"): a left-recursive
/// alternation, one alternative per operator across every level plus a
/// fallback call to the operand rule. This is purely a textual-emission
/// concern — `gramforge-lr::CompiledBackend` never re-parses this dump, it
/// executes `rule.body` directly, which `GrammarBuilder::infix_rule`
/// instead builds as the left-recursion-eliminated iterative equivalent so
/// this workbench's own recursive-descent engines can run it.
fn render_infix_body(name: &str, infix: &gramforge_core::grammar_model::InfixSpec) -> String {
  let mut alts = Vec::new();
  for level in &infix.levels {
    for op in &level.operators {
      alts.push(format!("left={name} {} right={}", render_keyword(op), infix.operand_rule));
    }
  }
  alts.push(infix.operand_rule.clone());
  alts.join(" | ")
}

fn render_expr(expr: &RuleExpr) -> String {
  use RuleExpr::*;
  match expr {
    Keyword(v) => render_keyword(v),
    Terminal(name) => name.clone(),
    NonTerminal(name) => name.clone(),
    Assign { property, op, target } => {
      let op_str = op_str(*op);
      format!("{property}{op_str}{}", render_expr(target))
    }
    CrossReference { property, op, target_rule } => {
      let op_str = op_str(*op);
      format!("{property}{op_str}[{target_rule}]")
    }
    Sequence(items) => items.iter().map(render_expr).collect::<Vec<_>>().join(" "),
    Alternatives(items) => items.iter().map(render_expr).collect::<Vec<_>>().join(" | "),
    Group(inner) => format!("({})", render_expr(inner)),
    Optional(inner) => format!("{}?", render_one(inner)),
    Star(inner) => format!("{}*", render_one(inner)),
    Plus(inner) => format!("{}+", render_one(inner)),
    Unordered(items) => render_unordered(items),
  }
}

/// Wraps `expr` in parentheses before applying cardinality when its
/// rendering is itself a composite body, per spec.md §4.5: "cardinality
/// `? * +` is applied after the inner translation, wrapping composite
/// bodies in parentheses where needed."
fn render_one(expr: &RuleExpr) -> String {
  match expr {
    RuleExpr::Sequence(items) if items.len() > 1 => format!("({})", render_expr(expr)),
    RuleExpr::Alternatives(_) => format!("({})", render_expr(expr)),
    _ => render_expr(expr),
  }
}

fn op_str(op: AssignOp) -> &'static str {
  match op {
    AssignOp::Assign => "=",
    AssignOp::Append => "+=",
    AssignOp::Flag => "?=",
  }
}

/// Spec.md §4.5: "for n ≤ 4 elements, enumerated as all n! permutations;
/// for larger n, emitted as a sequence with a warning diagnostic" (the
/// diagnostic half lives in [check_unordered_group_sizes]).
fn render_unordered(items: &[RuleExpr]) -> String {
  if items.is_empty() {
    return String::new();
  }
  if items.len() > 4 {
    return items.iter().map(render_expr).collect::<Vec<_>>().join(" ");
  }
  let perms = permutations(items);
  let alts: Vec<String> = perms.iter().map(|perm| perm.iter().map(render_expr).collect::<Vec<_>>().join(" ")).collect();
  format!("({})", alts.join(" | "))
}

fn permutations(items: &[RuleExpr]) -> Vec<Vec<RuleExpr>> {
  if items.is_empty() {
    return vec![Vec::new()];
  }
  let mut out = Vec::new();
  for i in 0..items.len() {
    let mut rest: Vec<RuleExpr> = items.to_vec();
    let picked = rest.remove(i);
    for mut perm in permutations(&rest) {
      perm.insert(0, picked.clone());
      out.push(perm);
    }
  }
  out
}

#[cfg(test)]
mod test {
  use super::*;
  use gramforge_core::grammar_model::*;

  #[test]
  fn compiles_a_simple_grammar() {
    let model = GrammarBuilder::new()
      .entry("Model")
      .rule("Model", seq(vec![kw("model"), assign_many("items", call("Item"))]))
      .rule("Item", seq(vec![kw("item"), assign("name", term("ID"))]))
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let (artifact, warnings) = compile(&index).unwrap();
    assert_eq!(artifact.tables.grammar_fingerprint, index.fingerprint());
    assert!(artifact.field_map.get("Item", "name").is_some());
    assert!(artifact.keywords.values.contains(&"model".to_string()));
    assert!(warnings.is_empty());
  }

  #[test]
  fn grammar_text_is_stable_and_readable() {
    let model = GrammarBuilder::new().entry("Model").rule("Model", seq(vec![kw("model"), assign("name", term("ID"))])).build();
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    assert!(text.contains("Model := kw<\"model\"> name=ID"));
  }

  #[test]
  fn punctuation_keywords_stay_inline_while_identifiers_wrap() {
    let model = GrammarBuilder::new()
      .entry("Expr")
      .rule("Expr", seq(vec![assign("left", term("INT")), kw("+"), assign("right", term("INT")), kw("semi")]))
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    assert!(text.contains("'+'"));
    assert!(text.contains("kw<\"semi\">"));
  }

  #[test]
  fn fragment_rules_render_lowercase() {
    let model = GrammarBuilder::new()
      .entry("Model")
      .rule("Model", seq(vec![assign("name", call("NameFragment"))]))
      .fragment_rule("NameFragment", term("ID"))
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    assert!(text.contains("namefragment := ID"));
  }

  #[test]
  fn small_unordered_groups_enumerate_all_permutations() {
    let model = GrammarBuilder::new().entry("Flags").rule("Flags", RuleExpr::Unordered(vec![kw("a"), kw("b"), kw("c")])).build();
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    // 3 elements -> 3! = 6 permutations joined by " | ", each separator is one '|'.
    assert_eq!(text.matches('|').count(), 5);
    let (_, warnings) = compile(&index).unwrap();
    assert!(warnings.is_empty());
  }

  #[test]
  fn large_unordered_groups_fall_back_to_a_sequence_with_a_warning() {
    let model = GrammarBuilder::new()
      .entry("Flags")
      .rule("Flags", RuleExpr::Unordered(vec![kw("a"), kw("b"), kw("c"), kw("d"), kw("e")]))
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    assert!(!text.contains('|'));
    let (_, warnings) = compile(&index).unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(!warnings[0].is_error());
  }

  #[test]
  fn infix_rule_emits_precedence_directives() {
    let model = GrammarBuilder::new()
      .entry("Additive")
      .infix_rule("Additive", "Multiplicative", vec![left(&["+", "-"])])
      .rule("Multiplicative", term("INT"))
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    assert!(text.contains("@left('+', '-')"));
    // The emitted grammar text uses the spec's left-recursive alternation
    // form, distinct from the iterative body the engines actually execute.
    assert!(text.contains("Additive := left=Additive '+' right=Multiplicative | left=Additive '-' right=Multiplicative | Multiplicative"));
  }

  #[test]
  fn dynamic_precedence_is_lifted_to_the_rule_declaration() {
    let model = GrammarBuilder::new()
      .entry("Stmt")
      .rule("Stmt", term("ID"))
      .dynamic_precedence("Stmt", 2)
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    assert!(text.contains("@dynamicPrecedence(2)\nStmt := ID"));
  }

  #[test]
  fn terminal_patterns_are_emitted_with_anchors_stripped() {
    let mut model = GrammarBuilder::new().entry("Model").rule("Model", term("ID")).build();
    model.terminal_patterns.insert("HEX".to_string(), r"^0x[0-9a-fA-F]+$".to_string());
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    assert!(text.contains("token HEX /0x[0-9a-fA-F]+/"));
    assert!(!text.contains("/^0x"));
  }

  #[test]
  fn directives_are_emitted_ahead_of_rule_bodies() {
    let model = GrammarBuilder::new()
      .entry("Model")
      .rule("Model", term("ID"))
      .directive(Directive::ExternalToken { name: "Indent".into(), text: "emit on column change".into() })
      .build();
    let index = GrammarIndex::build(model).unwrap();
    let text = emit_grammar_text(&index);
    let directive_pos = text.find("@externalToken(Indent)").unwrap();
    let rule_pos = text.find("Model := ID").unwrap();
    assert!(directive_pos < rule_pos);
  }
}
