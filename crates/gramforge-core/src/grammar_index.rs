//! The Grammar Index (GR): O(1) lookups both parser backends and the AST
//! builder consult at run time instead of re-walking a [GrammarModel].
//!
//! Grounded on `radlr-core/types/parser_db.rs`'s `ParserDatabase`, which
//! plays the identical role for radlr — a build-once, query-many summary of
//! the grammar (`nonterm_names`, `nonterm_by_id`, token classification
//! tables) threaded through every later compile stage. `GrammarIndex::build`
//! is the `ParserDatabase::new`-equivalent entry point here.

use crate::error::{o_to_r, GfResult};
use crate::grammar_model::{AssignOp, GrammarModel, RuleDef, RuleExpr, RuleKind};
use indexmap::IndexSet;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A backend-neutral syntax kind id. Both the interpreted and compiled
/// backends number their tree nodes through the same [GrammarIndex], so a
/// given rule, terminal or keyword value always maps to the same id
/// regardless of which backend produced the tree — the precondition for the
/// cross-backend leaf-equivalence invariant (spec.md §4.1, invariant 4).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GfKind(pub u16);

pub const ROOT_KIND: GfKind = GfKind(0);
pub const ERROR_KIND: GfKind = GfKind(1);
pub const COMMENT_KIND: GfKind = GfKind(2);
pub const WHITESPACE_KIND: GfKind = GfKind(3);

/// One resolved assignment: a `property (op) target` occurrence inside a
/// rule body, flattened out of the expression tree for O(1) lookup.
#[derive(Clone, Debug)]
pub struct AssignmentInfo {
  pub rule:     String,
  pub property: String,
  pub op:       AssignOp,
  /// Set when the assigned target is a direct terminal call — the AST
  /// builder uses this to pick a value converter (spec.md §6).
  pub terminal_rule_name: Option<String>,
  /// Set when this assignment is a cross-reference (`[Type]` target); the
  /// string names the referent rule.
  pub cross_reference_rule: Option<String>,
}

impl AssignmentInfo {
  pub fn is_cross_reference(&self) -> bool {
    self.cross_reference_rule.is_some()
  }

  /// A cross-reference assignment using `+=` is a multi-reference: the
  /// property collects more than one referent (spec.md §6, GLOSSARY
  /// "MultiReference").
  pub fn is_multi_reference(&self) -> bool {
    self.is_cross_reference() && self.op == AssignOp::Append
  }
}

/// Tells the syntax tree's `childForField` how to locate the node(s) that
/// back a given `(rule, property)` pair, independent of which backend
/// produced the tree (spec.md §4.1's wrapper-identity requirement).
#[derive(Clone, Debug)]
pub enum FieldSelector {
  /// The compiled backend synthesizes a dedicated wrapper non-terminal for
  /// this field (spec.md §4.5); its kind name is `{Rule}_{property}`. The
  /// interpreted backend never produces this node, so callers fall back to
  /// [FieldSelector::direct_kinds] when a wrapper of this name isn't found.
  WrapperKind(String),
  /// Neither backend wraps this field; the assigned value is one of the
  /// listed child kinds directly.
  ByCalleeKinds(Vec<String>),
}

impl FieldSelector {
  pub fn wrapper_name(&self) -> Option<&str> {
    match self {
      FieldSelector::WrapperKind(name) => Some(name.as_str()),
      FieldSelector::ByCalleeKinds(_) => None,
    }
  }

  pub fn direct_kinds(&self) -> &[String] {
    match self {
      FieldSelector::WrapperKind(_) => &[],
      FieldSelector::ByCalleeKinds(kinds) => kinds,
    }
  }
}

/// The build-once grammar summary both backends and the AST builder query.
pub struct GrammarIndex {
  model: GrammarModel,
  /// First assignment wins per `(rule, property)` (spec.md §6: "when a
  /// property is assigned more than once in alternative branches, the
  /// grammar index records the first occurrence encountered in declaration
  /// order").
  first_assignment:  HashMap<(String, String), AssignmentInfo>,
  assignments_by_rule: HashMap<String, Vec<AssignmentInfo>>,
  keyword_values:     HashMap<String, Vec<(String, String)>>,
  keyword_set:        HashSet<String>,
  data_type_rules:    HashSet<String>,
  /// Keyed through a `BTreeMap`, not a `HashMap`: the synthetic wrapper
  /// kind names derived from this map (see `GrammarIndex::build`) are fed
  /// into `kind_names` in iteration order, and `HashMap` iteration order is
  /// randomized per process — that would make `fingerprint()` (and the
  /// wrapper kind ids themselves) disagree across two processes compiling
  /// the identical grammar, spuriously failing `CompiledBackend`'s
  /// persisted-artifact fingerprint check (spec.md §4.5/§6).
  field_selectors:    BTreeMap<(String, String), FieldSelector>,
  kind_names:         IndexSet<String>,
}

/// Reserved, always-present kind names occupying ids 0..4.
const ROOT_KIND_NAME: &str = "$Root";
const ERROR_KIND_NAME: &str = "$Error";
const COMMENT_KIND_NAME: &str = "$Comment";
const WHITESPACE_KIND_NAME: &str = "$Whitespace";

impl GrammarIndex {
  /// Builds a [GrammarIndex] from a [GrammarModel], failing only if the
  /// model names an `entry` rule that doesn't exist.
  pub fn build(model: GrammarModel) -> GfResult<Self> {
    if let Some(entry) = &model.entry {
      o_to_r(model.rules.get(entry), &format!("entry rule '{entry}' not found"))?;
    }

    let mut first_assignment = HashMap::new();
    let mut assignments_by_rule: HashMap<String, Vec<AssignmentInfo>> = HashMap::new();
    let mut field_selectors = BTreeMap::new();

    for rule in model.rules.values() {
      let mut flat = Vec::new();
      flatten_assignments(rule, &rule.body, &mut flat);
      for info in flat {
        let key = (info.rule.clone(), info.property.clone());
        first_assignment.entry(key.clone()).or_insert_with(|| info.clone());
        assignments_by_rule.entry(info.rule.clone()).or_default().push(info);
      }
    }

    for ((rule, property), info) in &first_assignment {
      let selector = if info.is_cross_reference() {
        // Cross-reference assignments consume a plain identifier leaf, not
        // a node shaped like the referent rule (`target_rule` names what
        // the identifier resolves *to*, not what token it *is* — both
        // backends lex the reference itself as a bare `ID`, mirroring
        // `RuleExpr::CrossReference`'s handling in `gramforge-ll::backend`
        // and below in this crate's parser).
        FieldSelector::ByCalleeKinds(vec!["ID".to_string()])
      } else if let Some(term) = &info.terminal_rule_name {
        FieldSelector::ByCalleeKinds(vec![term.clone()])
      } else {
        // An assignment whose target resolves through non-terminal calls:
        // the compiled backend wraps it in a synthetic `{Rule}_{property}`
        // field node; direct-child kinds serve as the interpreted-backend
        // fallback.
        FieldSelector::WrapperKind(format!("{rule}_{property}"))
      };
      field_selectors.insert((rule.clone(), property.clone()), selector);
    }

    let mut keyword_values: HashMap<String, Vec<(String, String)>> = HashMap::new();
    let mut keyword_set = HashSet::new();
    for kw in &model.keywords {
      keyword_set.insert(kw.value.clone());
      keyword_values.entry(kw.value.clone()).or_default().push((kw.value.clone(), kw.rule.clone()));
    }

    let data_type_rules = compute_data_type_rules(&model.rules);

    let mut kind_names = IndexSet::new();
    kind_names.insert(ROOT_KIND_NAME.to_string());
    kind_names.insert(ERROR_KIND_NAME.to_string());
    kind_names.insert(COMMENT_KIND_NAME.to_string());
    kind_names.insert(WHITESPACE_KIND_NAME.to_string());
    for rule in model.rules.values() {
      kind_names.insert(rule.name.clone());
      collect_kind_names(&rule.body, &mut kind_names);
    }
    for selector in field_selectors.values() {
      if let FieldSelector::WrapperKind(name) = selector {
        kind_names.insert(name.clone());
      }
    }

    Ok(Self { model, first_assignment, assignments_by_rule, keyword_values, keyword_set, data_type_rules, field_selectors, kind_names })
  }

  /// Stable id for a rule, terminal, `kw:`-namespaced keyword value or
  /// synthetic field-wrapper name. Identical grammars always number these
  /// identically: `kind_names` is populated in the order rules appear in
  /// the [GrammarModel]'s `BTreeMap`, and wrapper names afterwards in
  /// sorted `(rule, property)` order via `field_selectors`'s own
  /// `BTreeMap` — never by iterating a `HashMap`, whose order is
  /// randomized per process and would make `fingerprint()` disagree across
  /// two processes compiling the same grammar.
  pub fn kind_id(&self, name: &str) -> Option<GfKind> {
    self.kind_names.get_index_of(name).map(|i| GfKind(i as u16))
  }

  pub fn kind_name(&self, kind: GfKind) -> Option<&str> {
    self.kind_names.get_index(kind.0 as usize).map(|s| s.as_str())
  }

  pub fn terminal_kind(&self, terminal_name: &str) -> Option<GfKind> {
    self.kind_id(terminal_name)
  }

  pub fn keyword_kind(&self, value: &str) -> Option<GfKind> {
    self.kind_id(&keyword_kind_name(value))
  }

  pub fn wrapper_kind(&self, rule: &str, property: &str) -> Option<GfKind> {
    self.kind_id(&format!("{rule}_{property}"))
  }

  pub fn rule(&self, name: &str) -> Option<&RuleDef> {
    self.model.rules.get(name)
  }

  pub fn rule_exists(&self, name: &str) -> bool {
    self.model.rules.contains_key(name)
  }

  pub fn rule_names(&self) -> impl Iterator<Item = &str> {
    self.model.rules.keys().map(|s| s.as_str())
  }

  pub fn entry_rule(&self) -> Option<&str> {
    self.model.entry.as_deref()
  }

  /// First-declared assignment of `property` within `rule`, per spec.md §6.
  pub fn assignment(&self, rule: &str, property: &str) -> Option<&AssignmentInfo> {
    self.first_assignment.get(&(rule.to_string(), property.to_string()))
  }

  pub fn assignments_for_rule(&self, rule: &str) -> &[AssignmentInfo] {
    self.assignments_by_rule.get(rule).map(|v| v.as_slice()).unwrap_or(&[])
  }

  pub fn field_selector(&self, rule: &str, property: &str) -> Option<&FieldSelector> {
    self.field_selectors.get(&(rule.to_string(), property.to_string()))
  }

  /// True if `value` occurs as a keyword element anywhere in the grammar.
  pub fn is_keyword(&self, value: &str) -> bool {
    self.keyword_set.contains(value)
  }

  /// All `(value, rule)` occurrences of a keyword value, across every rule
  /// that uses it.
  pub fn keyword_occurrences(&self, value: &str) -> &[(String, String)] {
    self.keyword_values.get(value).map(|v| v.as_slice()).unwrap_or(&[])
  }

  pub fn keyword_values(&self) -> impl Iterator<Item = &str> {
    self.keyword_values.keys().map(|s| s.as_str())
  }

  /// True if `rule` is classified as a data-type rule: explicitly declared
  /// as one, or every alternative resolves transitively to terminals,
  /// keywords and other data-type rules with no field assignments
  /// (spec.md §6's "data-type rule" classification).
  pub fn is_data_type_rule(&self, rule: &str) -> bool {
    self.data_type_rules.contains(rule)
  }

  pub fn model(&self) -> &GrammarModel {
    &self.model
  }

  /// A cheap structural fingerprint used to reject a compiled artifact
  /// built against a different grammar shape (spec.md §4.5). Not
  /// cryptographic — collisions are acceptable to be astronomically rare,
  /// not impossible.
  pub fn fingerprint(&self) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    for name in &self.kind_names {
      name.hash(&mut hasher);
    }
    self.model.entry.hash(&mut hasher);
    hasher.finish()
  }
}

pub fn keyword_kind_name(value: &str) -> String {
  format!("kw:{value}")
}

fn collect_kind_names(expr: &RuleExpr, out: &mut IndexSet<String>) {
  match expr {
    RuleExpr::Keyword(v) => {
      out.insert(keyword_kind_name(v));
    }
    RuleExpr::Terminal(name) => {
      out.insert(name.clone());
    }
    RuleExpr::NonTerminal(_) | RuleExpr::CrossReference { .. } => {}
    RuleExpr::Assign { target, .. } => collect_kind_names(target, out),
    RuleExpr::Sequence(items) | RuleExpr::Alternatives(items) | RuleExpr::Unordered(items) => {
      for i in items {
        collect_kind_names(i, out);
      }
    }
    RuleExpr::Group(inner) | RuleExpr::Optional(inner) | RuleExpr::Star(inner) | RuleExpr::Plus(inner) => collect_kind_names(inner, out),
  }
}

fn flatten_assignments(rule: &RuleDef, expr: &RuleExpr, out: &mut Vec<AssignmentInfo>) {
  match expr {
    RuleExpr::Assign { property, op, target } => {
      let (terminal_rule_name, cross_reference_rule) = match target.as_ref() {
        RuleExpr::Terminal(name) => (Some(name.clone()), None),
        _ => (None, None),
      };
      out.push(AssignmentInfo { rule: rule.name.clone(), property: property.clone(), op: *op, terminal_rule_name, cross_reference_rule });
      flatten_assignments(rule, target, out);
    }
    RuleExpr::CrossReference { property, op, target_rule } => {
      out.push(AssignmentInfo {
        rule: rule.name.clone(),
        property: property.clone(),
        op: *op,
        terminal_rule_name: None,
        cross_reference_rule: Some(target_rule.clone()),
      });
    }
    RuleExpr::Keyword(_) | RuleExpr::Terminal(_) | RuleExpr::NonTerminal(_) => {}
    RuleExpr::Sequence(items) | RuleExpr::Alternatives(items) | RuleExpr::Unordered(items) => {
      for i in items {
        flatten_assignments(rule, i, out);
      }
    }
    RuleExpr::Group(inner) | RuleExpr::Optional(inner) | RuleExpr::Star(inner) | RuleExpr::Plus(inner) => {
      flatten_assignments(rule, inner, out);
    }
  }
}

fn compute_data_type_rules(rules: &std::collections::BTreeMap<String, RuleDef>) -> HashSet<String> {
  let mut known: HashSet<String> = rules.values().filter(|r| r.kind == RuleKind::DataType).map(|r| r.name.clone()).collect();
  loop {
    let mut changed = false;
    for rule in rules.values() {
      if known.contains(&rule.name) {
        continue;
      }
      if is_data_type_shaped(&rule.body, &known) {
        known.insert(rule.name.clone());
        changed = true;
      }
    }
    if !changed {
      break;
    }
  }
  known
}

/// An expression is data-type-shaped if it never assigns a field (which
/// would make its rule AST-producing) and every non-terminal it calls is
/// itself already known to be data-type-shaped.
fn is_data_type_shaped(expr: &RuleExpr, known: &HashSet<String>) -> bool {
  match expr {
    RuleExpr::Keyword(_) | RuleExpr::Terminal(_) => true,
    RuleExpr::NonTerminal(name) => known.contains(name),
    RuleExpr::Assign { .. } | RuleExpr::CrossReference { .. } => false,
    RuleExpr::Sequence(items) | RuleExpr::Alternatives(items) | RuleExpr::Unordered(items) => items.iter().all(|i| is_data_type_shaped(i, known)),
    RuleExpr::Group(inner) | RuleExpr::Optional(inner) | RuleExpr::Star(inner) | RuleExpr::Plus(inner) => is_data_type_shaped(inner, known),
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::grammar_model::*;

  fn sample_model() -> GrammarModel {
    GrammarBuilder::new()
      .entry("Model")
      .rule("Model", seq(vec![assign_many("items", call("Item"))]))
      .rule("Item", alt(vec![seq(vec![kw("item"), assign("name", term("ID"))]), call("Name")]))
      .data_type_rule("Name", term("ID"))
      .build()
  }

  #[test]
  fn first_assignment_wins() {
    let idx = GrammarIndex::build(sample_model()).unwrap();
    let info = idx.assignment("Item", "name").unwrap();
    assert_eq!(info.terminal_rule_name.as_deref(), Some("ID"));
  }

  #[test]
  fn keyword_tracked() {
    let idx = GrammarIndex::build(sample_model()).unwrap();
    assert!(idx.is_keyword("item"));
    assert!(!idx.is_keyword("model"));
  }

  #[test]
  fn data_type_classification_is_transitive() {
    let idx = GrammarIndex::build(sample_model()).unwrap();
    assert!(idx.is_data_type_rule("Name"));
    // Item has a field assignment in one branch, so it is AST-producing.
    assert!(!idx.is_data_type_rule("Item"));
  }

  #[test]
  fn unknown_entry_rule_errors() {
    let model = GrammarBuilder::new().entry("Missing").build();
    assert!(GrammarIndex::build(model).is_err());
  }

  /// Wrapper-kind ids must fall out of `(rule, property)` sort order alone,
  /// never the order the grammar happened to declare rules in — otherwise
  /// `fingerprint()` could disagree across two processes that both built the
  /// identical grammar (spec.md §4.5/§6's persisted-artifact check).
  #[test]
  fn wrapper_kind_ids_follow_sorted_field_order_not_declaration_order() {
    let forward = GrammarBuilder::new()
      .entry("Model")
      .rule("Model", seq(vec![assign("alpha", call("Name")), assign("omega", call("Name"))]))
      .data_type_rule("Name", term("ID"))
      .build();
    let backward = GrammarBuilder::new()
      .entry("Model")
      .rule("Model", seq(vec![assign("omega", call("Name")), assign("alpha", call("Name"))]))
      .data_type_rule("Name", term("ID"))
      .build();

    let forward_idx = GrammarIndex::build(forward).unwrap();
    let backward_idx = GrammarIndex::build(backward).unwrap();

    assert_eq!(forward_idx.kind_id("Model_alpha"), backward_idx.kind_id("Model_alpha"));
    assert_eq!(forward_idx.kind_id("Model_omega"), backward_idx.kind_id("Model_omega"));
    assert!(forward_idx.kind_id("Model_alpha") < forward_idx.kind_id("Model_omega"));
  }
}
