//! The backend-neutral Syntax Tree (ST) representation both parser
//! backends build into and every downstream consumer (the AST builder,
//! editor-service callers) walks.
//!
//! Built on `rowan`'s red/green tree — structural sharing, cheap clone,
//! lazy parent pointers and offset tracking come from the library rather
//! than hand-rolled here, the same bet `apollo-parser` and `rust-analyzer`
//! make for this exact shape of problem (see
//! `other_examples/8d5814c7_apollographql-apollo-rs__crates-apollo-parser-src-cst-mod.rs.rs`).
//! Kind numbering is delegated entirely to [GrammarIndex] so a rule,
//! terminal or keyword value maps to the identical id under either backend
//! — the precondition for spec.md §4.1's invariant 4 (cross-backend leaf
//! equivalence).

use crate::grammar_index::{GfKind, GrammarIndex, COMMENT_KIND, ERROR_KIND, ROOT_KIND, WHITESPACE_KIND};
use crate::token::{line_col_range, ByteRange, LineCol, TokenRange};
use std::collections::HashSet;
use std::sync::Arc;

/// Language marker tying `rowan`'s generic tree types to gramforge's own
/// kind space.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GramforgeLang;

impl rowan::Language for GramforgeLang {
  type Kind = GfKind;

  fn kind_from_raw(raw: rowan::SyntaxKind) -> GfKind {
    GfKind(raw.0)
  }

  fn kind_to_raw(kind: GfKind) -> rowan::SyntaxKind {
    rowan::SyntaxKind(kind.0)
  }
}

pub type SyntaxNode = rowan::SyntaxNode<GramforgeLang>;
pub type SyntaxToken = rowan::SyntaxToken<GramforgeLang>;
pub type SyntaxElement = rowan::SyntaxElement<GramforgeLang>;
pub type GreenNode = rowan::GreenNode;
pub type GreenNodeBuilder<'a> = rowan::GreenNodeBuilder<'a>;
pub type Checkpoint = rowan::Checkpoint;

/// A fully parsed document: the tree root plus the [GrammarIndex] it was
/// built against, needed to resolve kind ids back to rule/property names.
///
/// Two `SyntaxTree`s produced from the same source by different backends
/// are structurally indistinguishable via this API — neither backend is
/// reachable from `SyntaxTree` itself (spec.md §4.1, invariant "the ST
/// contract exposes no backend-identifying member").
#[derive(Clone)]
pub struct SyntaxTree {
  root:  SyntaxNode,
  index: Arc<GrammarIndex>,
}

impl SyntaxTree {
  pub fn new(green: GreenNode, index: Arc<GrammarIndex>) -> Self {
    Self { root: SyntaxNode::new_root(green), index }
  }

  pub fn root(&self) -> &SyntaxNode {
    &self.root
  }

  pub fn index(&self) -> &GrammarIndex {
    &self.index
  }

  /// True if any descendant carries the reserved error kind — spec.md §5's
  /// recovered-parse signal, checkable without walking the diagnostic list.
  pub fn has_errors(&self) -> bool {
    self.root.descendants().any(|n| n.kind() == ERROR_KIND)
  }

  pub fn find_leaf_at_offset(&self, offset: u32) -> Option<SyntaxToken> {
    find_leaf_at_offset(&self.root, offset)
  }

  pub fn text_range(&self, node: &SyntaxNode) -> ByteRange {
    let r = node.text_range();
    ByteRange::new(r.start().into(), r.end().into())
  }

  pub fn line_col_range(&self, source: &str, node: &SyntaxNode) -> TokenRange {
    line_col_range(source, self.text_range(node))
  }

  /// spec.md §3's `RootST.fullText`: derived from the tree itself rather
  /// than stored redundantly — hidden tokens (whitespace, comments) are
  /// materialized as ordinary trivia leaves by both backends, so the
  /// root's reconstructed text is always exactly the source it was parsed
  /// from (spec.md §8 invariant 2, `N.text == source[N.offset..N.end]`,
  /// applied to the root node itself).
  pub fn full_text(&self) -> String {
    self.root.text().to_string()
  }

  /// The leaf whose range ends at or before `offset`, skipping `offset`
  /// itself — spec.md §4.1's "locate leaf strictly before offset".
  pub fn find_leaf_before(&self, offset: u32) -> Option<SyntaxToken> {
    find_leaf_before(&self.root, offset)
  }

  /// spec.md §4.1's "declaration-friendly" offset lookup: if the byte at
  /// `offset` doesn't continue a name lexeme, look one byte earlier
  /// instead, so a query sitting just past the end of an identifier (the
  /// common cursor position after typing one) still resolves to it.
  pub fn find_leaf_at_declaration_offset(&self, source: &str, offset: u32) -> Option<SyntaxToken> {
    let at_offset_continues_name = source[offset as usize..].chars().next().map(crate::token::is_name_char).unwrap_or(false);
    let effective = if at_offset_continues_name || offset == 0 { offset } else { offset - 1 };
    find_leaf_at_offset(&self.root, effective)
  }
}

/// Identity-stable wrapper-node cache key: two calls to `childForField` for
/// the same `(node, property)` must return `SyntaxElement`s that compare
/// equal under `PartialEq`, which `rowan`'s green-tree sharing already
/// guarantees since the same green subtree produces `==` red nodes
/// (spec.md §4.1, invariant 3). No extra cache is needed here; this type
/// only documents the guarantee for callers relying on it.
pub struct WrapperIdentity;

/// Domain-specific navigation on top of `rowan`'s generic [SyntaxNode],
/// grammar-index-aware so it can resolve fields, wrappers and comments
/// without the caller needing to know which backend produced the tree.
pub trait SyntaxNodeExt {
  fn rule_name<'a>(&self, index: &'a GrammarIndex) -> Option<&'a str>;
  fn is_error(&self) -> bool;
  fn child_for_field(&self, index: &GrammarIndex, property: &str) -> Option<SyntaxElement>;
  fn children_for_field(&self, index: &GrammarIndex, property: &str) -> Vec<SyntaxElement>;
  fn leaves(&self) -> Vec<SyntaxToken>;
  fn comments(&self) -> Vec<SyntaxToken>;
  fn previous_sibling_or_token(&self) -> Option<SyntaxElement>;
  fn next_sibling_or_token(&self) -> Option<SyntaxElement>;
  /// Previous sibling element, optionally skipping hidden (trivia) ones —
  /// spec.md §4.1's "previous/next sibling with a flag to include or skip
  /// hidden tokens".
  fn previous_sibling(&self, include_hidden: bool) -> Option<SyntaxElement>;
  /// As [SyntaxNodeExt::previous_sibling], looking forward instead.
  fn next_sibling(&self, include_hidden: bool) -> Option<SyntaxElement>;
  /// The nearest preceding sibling (hidden or not) whose token kind is a
  /// member of `comment_kinds` — spec.md §4.1's comment finder, generalized
  /// over a caller-supplied comment-token set rather than gramforge's own
  /// fixed `COMMENT_KIND` so a host grammar with several comment terminals
  /// (block vs. line) can ask for either.
  fn find_comment(&self, comment_kinds: &HashSet<GfKind>) -> Option<SyntaxToken>;
  /// The children of the shared parent strictly between `self` and
  /// `other`, in document order — spec.md §4.1's "interior nodes between
  /// two ST nodes sharing a parent".
  fn interior_nodes(&self, other: &SyntaxNode) -> Vec<SyntaxElement>;
}

impl SyntaxNodeExt for SyntaxNode {
  fn rule_name<'a>(&self, index: &'a GrammarIndex) -> Option<&'a str> {
    index.kind_name(self.kind())
  }

  fn is_error(&self) -> bool {
    self.kind() == ERROR_KIND
  }

  /// Resolves a field access the way spec.md §4.1 describes: try the
  /// compiled backend's synthetic wrapper kind first (if the grammar
  /// produces one for this `(rule, property)` pair and this node's
  /// children contain it), then fall back to the interpreted backend's
  /// direct-child-by-kind shape. Both paths converge on the same
  /// `SyntaxElement` identity for equivalent source text.
  fn child_for_field(&self, index: &GrammarIndex, property: &str) -> Option<SyntaxElement> {
    let rule = self.rule_name(index)?;
    let selector = index.field_selector(rule, property)?;
    if let Some(wrapper_name) = selector.wrapper_name() {
      if let Some(wrapper_kind) = index.kind_id(wrapper_name) {
        if let Some(wrapper) = self.children().find(|c| c.kind() == wrapper_kind) {
          return wrapper.first_child_or_token();
        }
      }
    }
    let kinds: Vec<GfKind> = selector.direct_kinds().iter().filter_map(|k| index.kind_id(k)).collect();
    self.children_with_tokens().find(|e| kinds.contains(&e.kind()))
  }

  /// As [SyntaxNodeExt::child_for_field], but collects every matching
  /// element for `+=`-style repeated fields.
  fn children_for_field(&self, index: &GrammarIndex, property: &str) -> Vec<SyntaxElement> {
    let Some(rule) = self.rule_name(index) else { return Vec::new() };
    let Some(selector) = index.field_selector(rule, property) else { return Vec::new() };
    if let Some(wrapper_name) = selector.wrapper_name() {
      if let Some(wrapper_kind) = index.kind_id(wrapper_name) {
        let wrappers: Vec<SyntaxElement> = self.children().filter(|c| c.kind() == wrapper_kind).filter_map(|w| w.first_child_or_token()).collect();
        if !wrappers.is_empty() {
          return wrappers;
        }
      }
    }
    let kinds: Vec<GfKind> = selector.direct_kinds().iter().filter_map(|k| index.kind_id(k)).collect();
    self.children_with_tokens().filter(|e| kinds.contains(&e.kind())).collect()
  }

  fn leaves(&self) -> Vec<SyntaxToken> {
    self.descendants_with_tokens().filter_map(|e| e.into_token()).filter(|t| t.kind() != WHITESPACE_KIND && t.kind() != COMMENT_KIND).collect()
  }

  fn comments(&self) -> Vec<SyntaxToken> {
    self.descendants_with_tokens().filter_map(|e| e.into_token()).filter(|t| t.kind() == COMMENT_KIND).collect()
  }

  fn previous_sibling_or_token(&self) -> Option<SyntaxElement> {
    rowan::SyntaxNode::prev_sibling_or_token(self)
  }

  fn next_sibling_or_token(&self) -> Option<SyntaxElement> {
    rowan::SyntaxNode::next_sibling_or_token(self)
  }

  fn previous_sibling(&self, include_hidden: bool) -> Option<SyntaxElement> {
    let mut cur = rowan::SyntaxNode::prev_sibling_or_token(self);
    while let Some(e) = &cur {
      if include_hidden || !is_hidden_element(e) {
        return cur;
      }
      cur = prev_sibling_or_token_of(e);
    }
    None
  }

  fn next_sibling(&self, include_hidden: bool) -> Option<SyntaxElement> {
    let mut cur = rowan::SyntaxNode::next_sibling_or_token(self);
    while let Some(e) = &cur {
      if include_hidden || !is_hidden_element(e) {
        return cur;
      }
      cur = next_sibling_or_token_of(e);
    }
    None
  }

  fn find_comment(&self, comment_kinds: &HashSet<GfKind>) -> Option<SyntaxToken> {
    let mut cur = rowan::SyntaxNode::prev_sibling_or_token(self);
    while let Some(e) = &cur {
      if let Some(t) = e.as_token() {
        if comment_kinds.contains(&t.kind()) {
          return Some(t.clone());
        }
        if t.kind() != WHITESPACE_KIND {
          return None;
        }
      } else {
        return None;
      }
      cur = prev_sibling_or_token_of(e);
    }
    None
  }

  fn interior_nodes(&self, other: &SyntaxNode) -> Vec<SyntaxElement> {
    let Some(parent) = self.parent() else { return Vec::new() };
    if other.parent().as_ref() != Some(&parent) {
      return Vec::new();
    }
    let self_end = self.text_range().end();
    let other_start = other.text_range().start();
    let (lo, hi) = if self_end <= other_start { (self_end, other_start) } else { (other.text_range().end(), self.text_range().start()) };
    parent.children_with_tokens().filter(|c| c.text_range().start() >= lo && c.text_range().end() <= hi).collect()
  }
}

fn is_hidden_element(e: &SyntaxElement) -> bool {
  matches!(e.as_token(), Some(t) if t.kind() == WHITESPACE_KIND || t.kind() == COMMENT_KIND)
}

fn prev_sibling_or_token_of(e: &SyntaxElement) -> Option<SyntaxElement> {
  match e {
    rowan::NodeOrToken::Node(n) => n.prev_sibling_or_token(),
    rowan::NodeOrToken::Token(t) => t.prev_sibling_or_token(),
  }
}

fn next_sibling_or_token_of(e: &SyntaxElement) -> Option<SyntaxElement> {
  match e {
    rowan::NodeOrToken::Node(n) => n.next_sibling_or_token(),
    rowan::NodeOrToken::Token(t) => t.next_sibling_or_token(),
  }
}

fn find_leaf_before(node: &SyntaxNode, offset: u32) -> Option<SyntaxToken> {
  let offset = rowan::TextSize::from(offset);
  node.descendants_with_tokens().filter_map(|e| e.into_token()).take_while(|t| t.text_range().end() <= offset).last()
}

fn find_leaf_at_offset(node: &SyntaxNode, offset: u32) -> Option<SyntaxToken> {
  let offset = rowan::TextSize::from(offset);
  let mut element: SyntaxElement = node.clone().into();
  loop {
    match element {
      rowan::NodeOrToken::Token(t) => return Some(t),
      rowan::NodeOrToken::Node(n) => {
        let child = n.children_with_tokens().find(|c| {
          let r = c.text_range();
          r.start() <= offset && offset < r.end() || (r.start() == offset && r.end() == offset)
        })?;
        element = child;
      }
    }
  }
}

/// Convenience builder used by both backends to assemble a green tree; a
/// thin, differently-named wrapper over `rowan::GreenNodeBuilder` so
/// backend code reads in terms of gramforge's own kind space.
pub struct TreeBuilder<'a> {
  inner: GreenNodeBuilder<'a>,
}

impl<'a> TreeBuilder<'a> {
  pub fn new() -> Self {
    Self { inner: GreenNodeBuilder::new() }
  }

  pub fn start_node(&mut self, kind: GfKind) {
    self.inner.start_node(rowan::SyntaxKind(kind.0));
  }

  pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: GfKind) {
    self.inner.start_node_at(checkpoint, rowan::SyntaxKind(kind.0));
  }

  pub fn checkpoint(&self) -> Checkpoint {
    self.inner.checkpoint()
  }

  pub fn token(&mut self, kind: GfKind, text: &str) {
    self.inner.token(rowan::SyntaxKind(kind.0), text);
  }

  pub fn finish_node(&mut self) {
    self.inner.finish_node();
  }

  pub fn finish(self) -> GreenNode {
    self.inner.finish()
  }
}

impl<'a> Default for TreeBuilder<'a> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::grammar_model::*;

  fn build_index() -> Arc<GrammarIndex> {
    let model = GrammarBuilder::new()
      .entry("Model")
      .rule("Model", seq(vec![assign("name", term("ID"))]))
      .build();
    Arc::new(GrammarIndex::build(model).unwrap())
  }

  fn build_tree(index: &Arc<GrammarIndex>, text: &str) -> SyntaxTree {
    let model_kind = index.kind_id("Model").unwrap();
    let id_kind = index.kind_id("ID").unwrap();
    let mut b = TreeBuilder::new();
    b.start_node(ROOT_KIND);
    b.start_node(model_kind);
    b.token(id_kind, text);
    b.finish_node();
    b.finish_node();
    SyntaxTree::new(b.finish(), index.clone())
  }

  #[test]
  fn child_for_field_resolves_direct_terminal() {
    let index = build_index();
    let tree = build_tree(&index, "widget");
    let model_node = tree.root().first_child().unwrap();
    let field = model_node.child_for_field(&index, "name").unwrap();
    assert_eq!(field.as_token().unwrap().text(), "widget");
  }

  #[test]
  fn wrapper_identity_is_stable_across_lookups() {
    let index = build_index();
    let tree = build_tree(&index, "widget");
    let model_node = tree.root().first_child().unwrap();
    let a = model_node.child_for_field(&index, "name").unwrap();
    let b = model_node.child_for_field(&index, "name").unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn find_leaf_at_offset_locates_token() {
    let index = build_index();
    let tree = build_tree(&index, "widget");
    let leaf = tree.find_leaf_at_offset(2).unwrap();
    assert_eq!(leaf.text(), "widget");
  }

  fn items_index() -> Arc<GrammarIndex> {
    let model = GrammarBuilder::new()
      .entry("Model")
      .rule("Model", seq(vec![star(assign_many("items", call("Item")))]))
      .rule("Item", assign("name", term("ID")))
      .build();
    Arc::new(GrammarIndex::build(model).unwrap())
  }

  /// `Model[ Item("foo") WS COMMENT WS Item("bar") ]` — two composite
  /// `Item` children either side of a line comment, for exercising
  /// hidden-aware sibling navigation, the comment finder and interior-node
  /// lookup.
  fn build_tree_with_trivia(index: &Arc<GrammarIndex>) -> SyntaxTree {
    let model_kind = index.kind_id("Model").unwrap();
    let item_kind = index.kind_id("Item").unwrap();
    let id_kind = index.kind_id("ID").unwrap();
    let mut b = TreeBuilder::new();
    b.start_node(ROOT_KIND);
    b.start_node(model_kind);
    b.start_node(item_kind);
    b.token(id_kind, "foo");
    b.finish_node();
    b.token(WHITESPACE_KIND, " ");
    b.token(COMMENT_KIND, "// note");
    b.token(WHITESPACE_KIND, "\n");
    b.start_node(item_kind);
    b.token(id_kind, "bar");
    b.finish_node();
    b.finish_node();
    b.finish_node();
    SyntaxTree::new(b.finish(), index.clone())
  }

  #[test]
  fn full_text_reconstructs_source_including_trivia() {
    let index = items_index();
    let tree = build_tree_with_trivia(&index);
    assert_eq!(tree.full_text(), "foo // note\nbar");
  }

  #[test]
  fn find_leaf_before_locates_the_preceding_leaf() {
    let index = items_index();
    let tree = build_tree_with_trivia(&index);
    // offset 12 sits right at the start of "bar" (after "foo // note\n").
    let leaf = tree.find_leaf_before(12).unwrap();
    assert_eq!(leaf.text(), "\n");
    // strictly before "foo" itself: nothing precedes it.
    assert!(tree.find_leaf_before(0).is_none());
  }

  #[test]
  fn declaration_offset_steps_back_at_a_name_boundary() {
    let index = items_index();
    let tree = build_tree_with_trivia(&index);
    let source = tree.full_text();
    // offset 3 sits just past "foo", where a completion request would land
    // after typing the identifier; the char there (' ') isn't a name char,
    // so the lookup steps back to offset 2 and still finds "foo".
    let leaf = tree.find_leaf_at_declaration_offset(&source, 3).unwrap();
    assert_eq!(leaf.text(), "foo");
  }

  #[test]
  fn sibling_navigation_can_skip_or_include_hidden_tokens() {
    let index = items_index();
    let tree = build_tree_with_trivia(&index);
    let model_node = tree.root().first_child().unwrap();
    let second_item = model_node.children().nth(1).unwrap();

    let immediate_prev = second_item.previous_sibling(true).unwrap();
    assert_eq!(immediate_prev.as_token().unwrap().kind(), WHITESPACE_KIND);

    let visible_prev = second_item.previous_sibling(false).unwrap();
    assert_eq!(visible_prev.as_node().unwrap().text().to_string(), "foo");
  }

  #[test]
  fn find_comment_locates_the_preceding_comment_across_whitespace() {
    let index = items_index();
    let tree = build_tree_with_trivia(&index);
    let model_node = tree.root().first_child().unwrap();
    let second_item = model_node.children().nth(1).unwrap();

    let mut comment_kinds = HashSet::new();
    comment_kinds.insert(COMMENT_KIND);
    let comment = second_item.find_comment(&comment_kinds).unwrap();
    assert_eq!(comment.text(), "// note");

    // the first item has nothing preceding it at all.
    let first_item = model_node.children().next().unwrap();
    assert!(first_item.find_comment(&comment_kinds).is_none());
  }

  #[test]
  fn interior_nodes_returns_children_strictly_between_two_siblings() {
    let index = items_index();
    let tree = build_tree_with_trivia(&index);
    let model_node = tree.root().first_child().unwrap();
    let first_item = model_node.children().next().unwrap();
    let second_item = model_node.children().nth(1).unwrap();

    let between = first_item.interior_nodes(&second_item);
    let texts: Vec<String> = between.iter().map(|e| e.as_token().map(|t| t.text().to_string()).unwrap_or_default()).collect();
    assert_eq!(texts, vec![" ".to_string(), "// note".to_string(), "\n".to_string()]);
  }
}
