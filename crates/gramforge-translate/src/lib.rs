//! Grammar translator (spec.md §4.2/§4.5): two independent passes over a
//! [gramforge_core::GrammarIndex], one per backend.
//!
//! [ll_translator] only validates a grammar against the interpreted
//! backend's recursive-descent assumptions (left recursion, dangling
//! references, FIRST/FIRST conflicts) — `gramforge-ll` derives its own
//! FIRST/FOLLOW tables at `configure()` time, so nothing is emitted here for
//! it to load. [lr_translator] does the opposite: it compiles the grammar
//! ahead of time into the [gramforge_core::CompiledArtifact] bundle
//! `gramforge-lr::CompiledBackend::load_artifact` consumes wholesale.

pub mod first_nullable;
pub mod ll_translator;
pub mod lr_translator;
pub mod regex_translate;
