//! Backend-neutral core of the gramforge language workbench: the syntax
//! tree representation, the grammar index both backends and the AST
//! builder query, the parser-adapter contract that lets host code swap
//! backends, and the shared diagnostic/error/config types everything else
//! in the workspace builds on.
//!
//! See `SPEC_FULL.md` at the repository root for the full component map.

pub mod artifact;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod grammar_index;
pub mod grammar_model;
pub mod parser_adapter;
pub mod string_store;
pub mod syntax_tree;
pub mod token;

pub use artifact::{CompiledArtifact, FieldMapArtifact, FieldSelectorArtifact, KeywordSetArtifact, ParseTables};
pub use config::{BackendKind, ParserClassification, ParserConfig};
pub use diagnostic::{Diagnostic, DiagnosticSource, Severity};
pub use error::{GfResult, GramforgeError};
pub use grammar_index::{AssignmentInfo, FieldSelector, GfKind, GrammarIndex};
pub use grammar_model::{GrammarBuilder, GrammarModel, RuleDef, RuleExpr, RuleKind};
pub use parser_adapter::{ExpectedToken, ParseOutcome, ParserAdapter, TextChange};
pub use string_store::{CachedString, IString, StringStore};
pub use syntax_tree::{GramforgeLang, SyntaxElement, SyntaxNode, SyntaxNodeExt, SyntaxToken, SyntaxTree, TreeBuilder};
pub use token::{line_col_at, line_col_range, ByteRange, LineCol, TokenRange};
