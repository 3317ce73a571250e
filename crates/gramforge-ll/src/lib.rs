//! Runtime-interpreted LL parser backend: no build step, straightforward
//! panic-mode error recovery, and no incremental reparsing support
//! (spec.md §4.3). See `gramforge-lr` for the compiled alternative.

pub mod backend;
pub mod follow_sets;
pub mod lexer;
pub mod recover;

pub use backend::InterpretedBackend;
pub use follow_sets::FollowSets;
pub use lexer::{LexToken, Lexer};
