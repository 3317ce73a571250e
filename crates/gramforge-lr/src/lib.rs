//! Pre-compiled parser backend: loads the [gramforge_core::CompiledArtifact]
//! a `gramforge-translate` run produced and drives parsing off its tables
//! rather than deriving FIRST/FOLLOW sets at run time (contrast
//! `gramforge-ll`, which always derives them). Wraps every grammar
//! assignment in a synthetic field non-terminal so `childForField` is a
//! plain child-kind lookup for any consumer (spec.md §4.4b), and supports
//! incremental reparsing by reusing subtrees whose byte range falls outside
//! the edited regions (spec.md §4.4b's tree/fragment store).

pub mod backend;
pub mod diagnostics;
pub mod lexer;
pub mod parser;

pub use backend::{CompiledBackend, IncrementalState};
