//! A simple interned-string store, shared by the grammar index and both
//! parser backends so that rule names, keyword values and field names can be
//! compared as cheap integer ids instead of strings.
//!
//! Grounded on the role `IStringStore` / `CachedString` play in
//! `radlr-core/types/parser_db.rs` (e.g. `nonterm_names: Array<(IString,
//! IString)>`), reimplemented here with a plain `indexmap` since the pack
//! does not retain radlr's own interner source.

use indexmap::IndexSet;
use std::sync::{Arc, RwLock};

/// An interned string id. Cheap to copy, compare and hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct IString(u32);

impl IString {
  pub fn to_string(self, store: &StringStore) -> String {
    store.resolve(self).to_string()
  }
}

/// Trait for values that can be interned into a [StringStore].
pub trait CachedString {
  fn intern(&self, store: &StringStore) -> IString;
}

impl CachedString for str {
  fn intern(&self, store: &StringStore) -> IString {
    store.intern(self)
  }
}

impl CachedString for String {
  fn intern(&self, store: &StringStore) -> IString {
    store.intern(self.as_str())
  }
}

#[derive(Debug, Default)]
struct Inner {
  strings: IndexSet<Box<str>>,
}

/// Thread-safe global string table. Shared (via `Arc`) by the [GrammarModel],
/// [GrammarIndex](crate::grammar_index::GrammarIndex) and every
/// [SyntaxNode](crate::syntax_tree::SyntaxNode) derived from it.
#[derive(Clone, Debug, Default)]
pub struct StringStore(Arc<RwLock<Inner>>);

impl StringStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn intern(&self, s: &str) -> IString {
    // Fast path: already interned.
    if let Some(idx) = self.0.read().unwrap().strings.get_index_of(s) {
      return IString(idx as u32);
    }
    let mut inner = self.0.write().unwrap();
    let (idx, _) = inner.strings.insert_full(s.into());
    IString(idx as u32)
  }

  pub fn resolve(&self, id: IString) -> String {
    self.0.read().unwrap().strings.get_index(id.0 as usize).map(|s| s.to_string()).unwrap_or_default()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn interning_is_idempotent() {
    let store = StringStore::new();
    let a = store.intern("Model");
    let b = store.intern("Model");
    let c = store.intern("Item");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(store.resolve(a), "Model");
  }
}
