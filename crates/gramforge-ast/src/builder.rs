//! The generic AST builder (C6, spec.md §4.6): a single walk of the ST,
//! consulting the [GrammarIndex] to decide what each node contributes.
//!
//! Grounded on the same "drive everything off one precomputed index" shape
//! `gramforge-core::grammar_index` itself borrows from `radlr-core`'s
//! `ParserDatabase`-centric pipeline: nothing here re-derives grammar shape
//! from [RuleExpr] beyond what [GrammarIndex::assignments_for_rule] and
//! [GrammarIndex::field_selector] already expose.

use crate::ast_node::{assign_mandatory_properties, AstNode, Value};
use crate::reference::Linker;
use crate::value_converter::ValueConverterRegistry;
use gramforge_core::diagnostic::{Diagnostic, DiagnosticSource};
use gramforge_core::grammar_index::{GfKind, GrammarIndex};
use gramforge_core::grammar_model::AssignOp;
use gramforge_core::syntax_tree::{SyntaxElement, SyntaxNode, SyntaxNodeExt};
use gramforge_core::SyntaxTree;
use std::collections::{HashMap, HashSet};

/// The result of [SyntaxNodeAstBuilder::build_ast]: the top-level AST node
/// (absent only if the root has no non-trivia child, e.g. an empty
/// document) plus the diagnostics split by source, per spec.md §6's
/// external-interface shape `{ ast, parserErrors, lexerErrors }`.
pub struct BuildResult {
  pub ast: Option<AstNode>,
  pub parser_errors: Vec<Diagnostic>,
  pub lexer_errors: Vec<Diagnostic>,
  index: AstIndex,
}

impl BuildResult {
  pub fn find_ast_node(&self, node: &SyntaxNode) -> Option<AstNode> {
    self.index.find_ast_node(node)
  }
}

/// The per-build ST→AST mapping (spec.md §5: "per-build-result"). Kept
/// distinct from [gramforge_core::GrammarIndex] (which is immutable and
/// long-lived) since this map is rebuilt wholesale on every reparse.
#[derive(Default)]
struct AstIndex {
  map: HashMap<SyntaxNode, AstNode>,
}

impl AstIndex {
  fn insert(&mut self, node: SyntaxNode, ast: AstNode) {
    self.map.insert(node, ast);
  }

  /// `findAstNode(ST)`: climbs the ST parent chain and returns the nearest
  /// ST for which a mapping exists (spec.md §4.6's closing paragraph) — the
  /// type-override pattern maps an inlined child's ST to its parent's AST
  /// node rather than leaving it unmapped, so this never needs to climb
  /// past the node's own rule boundary in practice.
  fn find_ast_node(&self, node: &SyntaxNode) -> Option<AstNode> {
    let mut current = Some(node.clone());
    while let Some(n) = current {
      if let Some(ast) = self.map.get(&n) {
        return Some(ast.clone());
      }
      current = n.parent();
    }
    None
  }
}

pub struct SyntaxNodeAstBuilder<'a, L: Linker> {
  index:      &'a GrammarIndex,
  linker:     &'a L,
  converters: &'a ValueConverterRegistry,
  ast_index:  AstIndex,
}

impl<'a, L: Linker> SyntaxNodeAstBuilder<'a, L> {
  pub fn new(index: &'a GrammarIndex, linker: &'a L, converters: &'a ValueConverterRegistry) -> Self {
    Self { index, linker, converters, ast_index: AstIndex::default() }
  }

  /// Builds the AST for a document whose `ParseOutcome` diagnostics aren't
  /// at hand (e.g. ad-hoc tooling walking an already-stored tree). Parser
  /// and lexer diagnostics are both empty here; use
  /// [Self::build_ast_with_diagnostics] when they're available.
  pub fn build_ast(self, tree: &SyntaxTree) -> BuildResult {
    self.build_ast_with_diagnostics(tree, Vec::new())
  }

  /// Same as [Self::build_ast] but takes the diagnostics explicitly — used
  /// by callers (e.g. a host document builder) that already have the
  /// `ParseOutcome` and want its diagnostics folded into the result rather
  /// than re-deriving them from the tree.
  pub fn build_ast_with_diagnostics(mut self, tree: &SyntaxTree, diagnostics: Vec<Diagnostic>) -> BuildResult {
    let (lexer_errors, parser_errors) = diagnostics.into_iter().partition(|d| d.source == DiagnosticSource::Lexer);

    let entry = tree.root().children().find(|n| !n.is_error());
    let ast = entry.map(|node| self.build_node(&node));

    BuildResult { ast, parser_errors, lexer_errors, index: self.ast_index }
  }

  /// Builds the AST node for composite ST node `node`, whose rule is
  /// expected to be AST-producing (spec.md §4.6 step 1's "otherwise"
  /// branch). Data-type rule concatenation is handled one level up, in
  /// [Self::build_value], since a data-type rule never itself owns a
  /// `$syntaxNode` mapping.
  fn build_node(&mut self, node: &SyntaxNode) -> AstNode {
    let rule_name = node.rule_name(self.index).unwrap_or("").to_string();
    let ast = AstNode::new(&rule_name);

    let assignments = self.index.assignments_for_rule(&rule_name).to_vec();
    let mut declared: Vec<(String, AssignOp)> = Vec::new();
    let mut claimed_kinds: HashSet<GfKind> = HashSet::new();

    for info in &assignments {
      declared.push((info.property.clone(), info.op));
      if let Some(selector) = self.index.field_selector(&rule_name, &info.property) {
        if let Some(wrapper) = selector.wrapper_name() {
          if let Some(k) = self.index.kind_id(wrapper) {
            claimed_kinds.insert(k);
          }
        } else {
          for kind_name in selector.direct_kinds() {
            if let Some(k) = self.index.kind_id(kind_name) {
              claimed_kinds.insert(k);
            }
          }
        }
      }

      match info.op {
        AssignOp::Append => {
          let children = node.children_for_field(self.index, &info.property);
          if info.is_cross_reference() {
            let identifiers: Vec<_> = children.iter().filter_map(|e| e.as_token().cloned()).collect();
            let multi = self.linker.build_multi_reference(&ast, &info.property, &identifiers);
            ast.set_property(info.property.clone(), Value::MultiReference(multi));
          } else {
            let values: Vec<Value> = children.into_iter().map(|c| self.build_value(c, info)).collect();
            ast.set_property(info.property.clone(), Value::List(values));
          }
        }
        AssignOp::Flag => {
          let present = node.child_for_field(self.index, &info.property).is_some();
          ast.set_property(info.property.clone(), Value::Bool(present));
        }
        AssignOp::Assign => {
          if let Some(child) = node.child_for_field(self.index, &info.property) {
            if info.is_cross_reference() {
              if let Some(tok) = child.as_token() {
                let reference = self.linker.build_reference(&ast, &info.property, tok, tok.text());
                ast.set_property(info.property.clone(), Value::Reference(reference));
              }
            } else {
              let value = self.build_value(child, info);
              ast.set_property(info.property.clone(), value);
            }
          }
        }
      }
    }

    self.inline_unassigned_children(node, &ast, &claimed_kinds);
    assign_mandatory_properties(&ast, &declared);
    ast.link_children();
    ast.set_syntax_node(node.clone());
    self.ast_index.insert(node.clone(), ast.clone());
    ast
  }

  /// spec.md §4.6 step 4: the "type-override" pattern. An alternative rule
  /// that calls a sub-rule with no assignment around it (`Element: Person |
  /// Greeting;`) must not produce an orphan child node — the parent takes on
  /// the child's own `$type` and properties, recursively.
  fn inline_unassigned_children(&mut self, node: &SyntaxNode, ast: &AstNode, claimed_kinds: &HashSet<GfKind>) {
    for child in node.children() {
      if claimed_kinds.contains(&child.kind()) || child.is_error() {
        continue;
      }
      let Some(child_rule) = child.rule_name(self.index) else { continue };
      if self.index.is_data_type_rule(child_rule) {
        continue;
      }
      let inlined = self.build_node(&child);
      ast.set_type_name(inlined.type_name());
      for name in inlined.property_names() {
        if let Some(value) = inlined.property(&name) {
          ast.set_property(name, value);
        }
      }
      // Re-point the child's ST mapping at the parent, not the discarded
      // inlined node, so `findAstNode` returns the owner the spec requires.
      self.ast_index.insert(child.clone(), ast.clone());
    }
  }

  /// Computes the value contributed by one assigned child, per spec.md §4.6
  /// step 3's three cases: data-type composite → concatenated text, plain
  /// composite → recurse, leaf → convert via the terminal's value converter
  /// (a keyword leaf's verbatim text if it carries no terminal rule name).
  fn build_value(&mut self, element: SyntaxElement, info: &gramforge_core::grammar_index::AssignmentInfo) -> Value {
    match element {
      rowan::NodeOrToken::Node(n) => {
        let rule = n.rule_name(self.index).unwrap_or("");
        if self.index.is_data_type_rule(rule) {
          Value::String(n.leaves().into_iter().map(|t| t.text().to_string()).collect::<Vec<_>>().join(""))
        } else {
          Value::Node(self.build_node(&n))
        }
      }
      rowan::NodeOrToken::Token(t) => match &info.terminal_rule_name {
        Some(rule_name) => self.converters.convert(t.text(), rule_name),
        None => Value::String(t.text().to_string()),
      },
    }
  }
}
