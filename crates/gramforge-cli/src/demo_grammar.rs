//! A small built-in grammar the CLI parses/validates/compiles against.
//!
//! Designing the workbench's own textual grammar syntax is an explicit
//! non-goal (spec.md §1/§3.2), so there is no grammar *file* for this CLI to
//! load — it demonstrates the pipeline against a [GrammarBuilder]-built
//! model instead, the same way `gramforge-ast`'s seed scenarios do.
//!
//! ```text
//! Model: 'model' name=ID items+=Item* ;
//! Item:  'item' name=ID count=INT? ;
//! ```
//!
//! `Item` deliberately has only one `ID`-typed field: `gramforge-ll`'s
//! interpreted backend resolves an unwrapped field by scanning direct
//! children for the first one of the expected kind (see
//! `gramforge_core::syntax_tree::SyntaxNodeExt::child_for_field`), so two
//! `ID`-shaped fields on the same rule (e.g. a plain `name=ID` alongside a
//! `[Type]` cross-reference, which always lexes as a bare `ID` too) would
//! alias onto whichever token comes first. The compiled backend doesn't
//! share this limitation — it wraps every field in its own synthetic node
//! — so this is a demo-grammar restriction, not a `GrammarIndex` one.

use gramforge_core::grammar_model::*;

pub fn build() -> GrammarModel {
  GrammarBuilder::new()
    .entry("Model")
    .rule("Model", seq(vec![kw("model"), assign("name", term("ID")), star(assign_many("items", call("Item")))]))
    .rule("Item", seq(vec![kw("item"), assign("name", term("ID")), opt(assign("count", term("INT")))]))
    .build()
}

pub const SAMPLE_SOURCE: &str = "model fleet item chassis count 4 item wheel count 16";
