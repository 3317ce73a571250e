//! Cross-reference values and the external linker seam.
//!
//! spec.md §1 explicitly keeps scope/linker policy out of this subsystem:
//! "The generic linker is referenced by contract (`buildReference`,
//! `findDeclarations`), not designed here." [Linker] is that contract; the
//! builder calls it and stores whatever it returns, but never resolves a
//! reference itself (spec.md §7: "Reference resolution errors are stored on
//! the Reference, not raised").

use crate::ast_node::AstNode;
use gramforge_core::diagnostic::Diagnostic;
use gramforge_core::syntax_tree::SyntaxToken;
use std::cell::RefCell;

/// The outcome of attempting to resolve a [Reference]'s target, deferred to
/// whatever external linker the host wires in.
#[derive(Clone)]
pub enum ResolutionState {
  Unresolved,
  Resolved(AstNode),
  Error(Diagnostic),
}

/// One cross-reference value (spec.md §3, GLOSSARY "Cross-reference"): the
/// raw identifier text plus a back-link to the identifier leaf it was built
/// from, and a resolution slot the linker fills in later.
#[derive(Clone)]
pub struct Reference {
  pub ref_text:        String,
  pub ref_syntax_node: Option<SyntaxToken>,
  state: RefCell<ResolutionState>,
}

impl Reference {
  pub fn new(ref_text: impl Into<String>, ref_syntax_node: Option<SyntaxToken>) -> Self {
    Self { ref_text: ref_text.into(), ref_syntax_node, state: RefCell::new(ResolutionState::Unresolved) }
  }

  pub fn resolve(&self, node: AstNode) {
    *self.state.borrow_mut() = ResolutionState::Resolved(node);
  }

  pub fn fail(&self, diagnostic: Diagnostic) {
    *self.state.borrow_mut() = ResolutionState::Error(diagnostic);
  }

  pub fn resolved(&self) -> Option<AstNode> {
    match &*self.state.borrow() {
      ResolutionState::Resolved(n) => Some(n.clone()),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<Diagnostic> {
    match &*self.state.borrow() {
      ResolutionState::Error(d) => Some(d.clone()),
      _ => None,
    }
  }

  pub fn is_resolved(&self) -> bool {
    matches!(&*self.state.borrow(), ResolutionState::Resolved(_))
  }
}

/// `+=`-collected cross-references (spec.md GLOSSARY "MultiReference").
#[derive(Clone)]
pub struct MultiReference {
  pub items: Vec<Reference>,
}

/// The builder's contract onto the external linker (spec.md §6). A host
/// implements this against its own scope-computation policy; this crate
/// only ever calls through it.
pub trait Linker {
  fn build_reference(&self, container: &AstNode, property: &str, identifier: &SyntaxToken, text: &str) -> Reference;

  fn build_multi_reference(&self, container: &AstNode, property: &str, identifiers: &[SyntaxToken]) -> MultiReference {
    let items = identifiers.iter().map(|tok| self.build_reference(container, property, tok, tok.text())).collect();
    MultiReference { items }
  }

  /// `findDeclarations(identifier) -> [AstNode]` (spec.md §6). Not used by
  /// the builder itself; exposed so host tooling can drive it through the
  /// same object it passed in.
  fn find_declarations(&self, _identifier: &str) -> Vec<AstNode> {
    Vec::new()
  }
}

/// A linker that defers every reference without resolving it — the
/// resolution-free default for hosts that haven't wired in scope policy yet
/// (spec.md §1: resolution itself is out of scope for this subsystem).
pub struct DeferredLinker;

impl Linker for DeferredLinker {
  fn build_reference(&self, _container: &AstNode, _property: &str, identifier: &SyntaxToken, text: &str) -> Reference {
    Reference::new(text, Some(identifier.clone()))
  }
}
