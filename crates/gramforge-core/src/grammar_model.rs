//! In-memory grammar model and the [GrammarBuilder] front end used to
//! construct it.
//!
//! Designing a textual grammar language is an explicit non-goal of this
//! subsystem (spec.md §1), so `GrammarModel` is populated programmatically
//! rather than parsed from source — the moral equivalent of the
//! `GrammarStore` / `ParserDatabase` inputs `radlr-core` builds from its own
//! (out-of-scope-here) grammar front end. Shape (rules, assignments with
//! `=`/`+=`/`?=` operators, keyword elements, data-type classification) is
//! grounded directly on `radlr-core/types/parser_db.rs`.

use crate::string_store::{CachedString, IString, StringStore};
use std::collections::BTreeMap;

/// The three assignment operators a grammar rule can use to bind a property.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssignOp {
  /// `property = target` — single value.
  Assign,
  /// `property += target` — append to a list.
  Append,
  /// `property ?= target` — boolean presence flag.
  Flag,
}

/// One node of a rule's body expression tree.
#[derive(Clone, Debug)]
pub enum RuleExpr {
  /// A literal keyword element, e.g. `'model'` or `'+'`.
  Keyword(String),
  /// A call to a terminal (token) rule, e.g. `ID`, `INT`.
  Terminal(String),
  /// A call to another parser rule.
  NonTerminal(String),
  /// `property (op) target`
  Assign { property: String, op: AssignOp, target: Box<RuleExpr> },
  /// `property (op) [TargetRule]` — a cross-reference assignment. The
  /// bracketed rule name is the referent type, resolved later by the
  /// external linker (spec.md §6).
  CrossReference { property: String, op: AssignOp, target_rule: String },
  /// `a b c` in sequence.
  Sequence(Vec<RuleExpr>),
  /// `a | b | c`
  Alternatives(Vec<RuleExpr>),
  /// `( ... )` — a parenthesized group, distinguished from a bare sequence
  /// so the translator knows to wrap it when applying cardinality.
  Group(Box<RuleExpr>),
  /// `expr?`
  Optional(Box<RuleExpr>),
  /// `expr*`
  Star(Box<RuleExpr>),
  /// `expr+`
  Plus(Box<RuleExpr>),
  /// An unordered group: all orderings of the listed elements are valid.
  Unordered(Vec<RuleExpr>),
}

/// What kind of value a rule produces.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RuleKind {
  /// An ordinary parser rule that (absent the type-override pattern)
  /// produces an AST node.
  Parser,
  /// A `fragment` rule: inlined/hidden in the tree, translated to a
  /// lowercase rule name by the compiled backend (spec.md §4.5).
  Fragment,
  /// A rule explicitly declared to produce a flat string (spec.md's
  /// "data-type rule").
  DataType,
}

/// One associativity/precedence level synthesized from an infix rule
/// (spec.md §4.5, GLOSSARY "Infix rule").
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Associativity {
  Left,
  Right,
}

#[derive(Clone, Debug)]
pub struct PrecedenceLevel {
  pub operators:     Vec<String>,
  pub associativity: Associativity,
}

#[derive(Clone, Debug, Default)]
pub struct InfixSpec {
  pub levels:      Vec<PrecedenceLevel>,
  pub operand_rule: String,
}

#[derive(Clone, Debug)]
pub struct RuleDef {
  pub name: String,
  pub kind: RuleKind,
  pub body: RuleExpr,
  /// `@dynamicPrecedence(n)` annotation, if present.
  pub dynamic_precedence: Option<i32>,
  /// Present when this rule was declared via the compact infix syntax.
  pub infix: Option<InfixSpec>,
}

/// A keyword element as it occurs in a specific rule body.
#[derive(Clone, Debug)]
pub struct KeywordElement {
  pub value: String,
  pub rule:  String,
}

/// Grammar-level constructs the compiled-backend translator emits 1:1 into
/// its textual grammar rather than reinterpreting (spec.md §4.5: "conflicts,
/// external tokens, external contexts, local token groups, specialize /
/// extend blocks — emitted 1:1 as directives consumed by the compiled
/// backend"). Each variant's `text` field is the directive body verbatim as
/// the compiled backend expects it; this workbench never parses or
/// validates that text itself, since doing so would mean designing the
/// compiled backend's own directive grammar, which is out of scope
/// (spec.md §1).
#[derive(Clone, Debug)]
pub enum Directive {
  /// Declares that two or more rules conflict and must be disambiguated by
  /// the compiled backend's GLR-style conflict resolution.
  Conflict { rule: String, text: String },
  /// Declares a token whose recognition is delegated to host code rather
  /// than the backend's own lexer.
  ExternalToken { name: String, text: String },
  /// Declares a context tracker implemented outside the grammar (e.g. for
  /// indentation-sensitive or otherwise non-context-free constructs).
  ExternalContext { name: String, text: String },
  /// A token group scoped to a single rule rather than the whole grammar.
  LocalTokenGroup { rule: String, text: String },
  /// A `specialize` block: narrows a general token to a more specific one
  /// in a given syntactic position.
  Specialize { text: String },
  /// An `extend` block: widens an existing rule with more alternatives.
  Extend { rule: String, text: String },
}

/// The full, backend-agnostic grammar description. Built once (typically via
/// [GrammarBuilder]) and then handed to `GrammarIndex::build` and to a
/// grammar translator.
#[derive(Clone, Debug, Default)]
pub struct GrammarModel {
  pub rules:    BTreeMap<String, RuleDef>,
  pub keywords: Vec<KeywordElement>,
  pub entry:    Option<String>,
  pub string_store: StringStore,
  /// User-supplied lexical patterns for terminals beyond the workbench's
  /// fixed `ID`/`INT`/`FLOAT`/`STRING` vocabulary, keyed by terminal name.
  /// Validated (not lexed against) by `gramforge-translate::regex_translate`;
  /// neither backend's lexer consults these yet.
  pub terminal_patterns: BTreeMap<String, String>,
  /// Directives the compiled-backend translator passes through unchanged
  /// (spec.md §4.5). Declaration order is preserved since the compiled
  /// backend's own grammar syntax is order-sensitive for some of these
  /// (e.g. `extend` blocks applying in sequence).
  pub directives: Vec<Directive>,
}

impl GrammarModel {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn intern(&self, s: &str) -> IString {
    s.intern(&self.string_store)
  }

  /// Walks `body` recording every [RuleExpr::Keyword] into `self.keywords`.
  fn collect_keywords(&mut self, rule: &str, expr: &RuleExpr) {
    match expr {
      RuleExpr::Keyword(v) => self.keywords.push(KeywordElement { value: v.clone(), rule: rule.to_string() }),
      RuleExpr::Terminal(_) | RuleExpr::NonTerminal(_) | RuleExpr::CrossReference { .. } => {}
      RuleExpr::Assign { target, .. } => self.collect_keywords(rule, target),
      RuleExpr::Sequence(items) | RuleExpr::Alternatives(items) | RuleExpr::Unordered(items) => {
        for i in items {
          self.collect_keywords(rule, i)
        }
      }
      RuleExpr::Group(inner) | RuleExpr::Optional(inner) | RuleExpr::Star(inner) | RuleExpr::Plus(inner) => {
        self.collect_keywords(rule, inner)
      }
    }
  }

  pub fn add_rule(&mut self, def: RuleDef) {
    self.collect_keywords(&def.name, &def.body);
    self.rules.insert(def.name.clone(), def);
  }
}

/// Fluent front end for building a [GrammarModel] in Rust, used by tests and
/// by the seed scenarios S1–S6 from spec.md §8. See SPEC_FULL.md §3.2.
#[derive(Default)]
pub struct GrammarBuilder {
  model: GrammarModel,
}

impl GrammarBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn entry(mut self, rule: &str) -> Self {
    self.model.entry = Some(rule.to_string());
    self
  }

  pub fn rule(mut self, name: &str, body: RuleExpr) -> Self {
    self.model.add_rule(RuleDef { name: name.to_string(), kind: RuleKind::Parser, body, dynamic_precedence: None, infix: None });
    self
  }

  pub fn fragment_rule(mut self, name: &str, body: RuleExpr) -> Self {
    self.model.add_rule(RuleDef { name: name.to_string(), kind: RuleKind::Fragment, body, dynamic_precedence: None, infix: None });
    self
  }

  pub fn data_type_rule(mut self, name: &str, body: RuleExpr) -> Self {
    self.model.add_rule(RuleDef { name: name.to_string(), kind: RuleKind::DataType, body, dynamic_precedence: None, infix: None });
    self
  }

  /// Registers `name` with a `@dynamicPrecedence(n)` annotation, lifted to
  /// the rule's declaration by the compiled-backend translator (spec.md
  /// §4.5). Must be called after the rule it annotates has already been
  /// added via [GrammarBuilder::rule] or a sibling constructor.
  pub fn dynamic_precedence(mut self, name: &str, n: i32) -> Self {
    if let Some(rule) = self.model.rules.get_mut(name) {
      rule.dynamic_precedence = Some(n);
    }
    self
  }

  /// Declares `name` as an infix rule over `operand_rule` with the given
  /// precedence levels (GLOSSARY "Infix rule"; spec.md §4.5). `levels` runs
  /// from lowest to highest precedence, mirroring how a binary-operator
  /// precedence table is conventionally written top to bottom.
  ///
  /// Spec.md §4.5 describes the compiled backend's *textual* translation
  /// of an infix rule as "a left-recursive alternation with one
  /// alternative per operator ... plus a fallback call to the operand
  /// rule" — that is what `gramforge-translate::lr_translator` emits into
  /// its grammar dump for an external LR tool to consume. This crate's own
  /// two backends are recursive-descent engines (see SPEC_FULL.md's note
  /// on the compiled backend's simplification), so the *executable* body
  /// built here is the standard left-recursion-elimination of that same
  /// shape — `left=Operand (op right+=Operand)*` — which both backends can
  /// actually run without the left-recursive call chain recursing forever.
  /// The two representations parse the identical language; only the one
  /// a real LR generator would see differs from the one this workbench's
  /// own engines execute.
  pub fn infix_rule(mut self, name: &str, operand_rule: &str, levels: Vec<PrecedenceLevel>) -> Self {
    let all_ops: Vec<RuleExpr> = levels.iter().flat_map(|l| l.operators.iter()).map(|o| kw(o)).collect();
    let op_choice = if all_ops.len() == 1 { all_ops.into_iter().next().unwrap() } else { alt(all_ops) };
    let body = seq(vec![
      assign("left", call(operand_rule)),
      star(group(seq(vec![assign("op", op_choice), assign_many("right", call(operand_rule))]))),
    ]);
    let def = RuleDef {
      name: name.to_string(),
      kind: RuleKind::Parser,
      body,
      dynamic_precedence: None,
      infix: Some(InfixSpec { levels, operand_rule: operand_rule.to_string() }),
    };
    self.model.add_rule(def);
    self
  }

  /// Records a directive the compiled-backend translator will emit 1:1
  /// (spec.md §4.5). No-op for the interpreted backend, which never reads
  /// `GrammarModel::directives`.
  pub fn directive(mut self, directive: Directive) -> Self {
    self.model.directives.push(directive);
    self
  }

  /// Declares a lexical pattern for a terminal beyond the fixed
  /// `ID`/`INT`/`FLOAT`/`STRING` vocabulary (SPEC_FULL.md §3.2,
  /// spec.md §4.5's regex-terminal translation).
  pub fn terminal_pattern(mut self, terminal_name: &str, pattern: &str) -> Self {
    self.model.terminal_patterns.insert(terminal_name.to_string(), pattern.to_string());
    self
  }

  pub fn build(self) -> GrammarModel {
    self.model
  }
}

// Ergonomic free functions mirroring the grammar's own operator shapes.
pub fn kw(v: &str) -> RuleExpr {
  RuleExpr::Keyword(v.to_string())
}
pub fn term(name: &str) -> RuleExpr {
  RuleExpr::Terminal(name.to_string())
}
pub fn call(name: &str) -> RuleExpr {
  RuleExpr::NonTerminal(name.to_string())
}
pub fn assign(property: &str, target: RuleExpr) -> RuleExpr {
  RuleExpr::Assign { property: property.to_string(), op: AssignOp::Assign, target: Box::new(target) }
}
pub fn assign_many(property: &str, target: RuleExpr) -> RuleExpr {
  RuleExpr::Assign { property: property.to_string(), op: AssignOp::Append, target: Box::new(target) }
}
pub fn assign_flag(property: &str, target: RuleExpr) -> RuleExpr {
  RuleExpr::Assign { property: property.to_string(), op: AssignOp::Flag, target: Box::new(target) }
}
pub fn cross_ref(property: &str, target_rule: &str) -> RuleExpr {
  RuleExpr::CrossReference { property: property.to_string(), op: AssignOp::Assign, target_rule: target_rule.to_string() }
}
pub fn cross_ref_many(property: &str, target_rule: &str) -> RuleExpr {
  RuleExpr::CrossReference { property: property.to_string(), op: AssignOp::Append, target_rule: target_rule.to_string() }
}
pub fn seq(items: Vec<RuleExpr>) -> RuleExpr {
  RuleExpr::Sequence(items)
}
pub fn alt(items: Vec<RuleExpr>) -> RuleExpr {
  RuleExpr::Alternatives(items)
}
pub fn group(inner: RuleExpr) -> RuleExpr {
  RuleExpr::Group(Box::new(inner))
}
pub fn opt(inner: RuleExpr) -> RuleExpr {
  RuleExpr::Optional(Box::new(inner))
}
pub fn star(inner: RuleExpr) -> RuleExpr {
  RuleExpr::Star(Box::new(inner))
}
pub fn plus(inner: RuleExpr) -> RuleExpr {
  RuleExpr::Plus(Box::new(inner))
}
/// A left-associative precedence level for [GrammarBuilder::infix_rule].
pub fn left(operators: &[&str]) -> PrecedenceLevel {
  PrecedenceLevel { operators: operators.iter().map(|s| s.to_string()).collect(), associativity: Associativity::Left }
}
/// A right-associative precedence level for [GrammarBuilder::infix_rule].
pub fn right(operators: &[&str]) -> PrecedenceLevel {
  PrecedenceLevel { operators: operators.iter().map(|s| s.to_string()).collect(), associativity: Associativity::Right }
}
