//! The generic AST builder (C6): walks a [gramforge_core::SyntaxTree],
//! consults a [gramforge_core::GrammarIndex] to classify each node, and
//! produces the reference-resolved application-level AST that editor
//! services (completion, hover, go-to-definition, rename, symbols,
//! call/type hierarchy — driven elsewhere, not in this crate) consume.
//!
//! See `SPEC_FULL.md` §1/§4.6 for the full contract this crate implements.

pub mod ast_node;
pub mod builder;
pub mod reference;
pub mod value_converter;

pub use ast_node::{assign_mandatory_properties, AstNode, Value};
pub use builder::{BuildResult, SyntaxNodeAstBuilder};
pub use reference::{DeferredLinker, Linker, MultiReference, Reference, ResolutionState};
pub use value_converter::ValueConverterRegistry;
