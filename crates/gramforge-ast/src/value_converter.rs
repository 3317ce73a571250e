//! The value-converter registry (spec.md §6's `convertByRuleName`, §9's
//! redesign note: "Treat as a registry of `name -> (text -> primitive)`
//! functions; failure returns the original text").
//!
//! A handful of terminal names (`INT`, `FLOAT`, `STRING`, `ID`) are
//! registered by default, matching `gramforge-ll`/`gramforge-lr`'s fixed
//! built-in lexical vocabulary; a host grammar with its own terminal names
//! registers additional converters before building an AST.

use crate::ast_node::Value;
use std::collections::HashMap;

type Converter = Box<dyn Fn(&str) -> Value + Send + Sync>;

pub struct ValueConverterRegistry {
  converters: HashMap<String, Converter>,
}

impl Default for ValueConverterRegistry {
  fn default() -> Self {
    let mut reg = Self { converters: HashMap::new() };
    reg.register("INT", |text| text.parse::<i64>().map(Value::Int).unwrap_or_else(|_| Value::String(text.to_string())));
    reg.register("FLOAT", |text| text.parse::<f64>().map(Value::Float).unwrap_or_else(|_| Value::String(text.to_string())));
    reg.register("STRING", |text| Value::String(unquote(text)));
    reg.register("ID", |text| Value::String(text.to_string()));
    reg.register("BOOL", |text| match text {
      "true" => Value::Bool(true),
      "false" => Value::Bool(false),
      _ => Value::String(text.to_string()),
    });
    reg
  }
}

impl ValueConverterRegistry {
  pub fn new() -> Self {
    Self { converters: HashMap::new() }
  }

  pub fn register(&mut self, rule_name: &str, f: impl Fn(&str) -> Value + Send + Sync + 'static) {
    self.converters.insert(rule_name.to_string(), Box::new(f));
  }

  /// Converts `text` using the registered converter for `rule_name`,
  /// falling back to the verbatim text when no converter is registered
  /// (spec.md §9: "failure returns the original text").
  pub fn convert(&self, text: &str, rule_name: &str) -> Value {
    match self.converters.get(rule_name) {
      Some(f) => f(text),
      None => Value::String(text.to_string()),
    }
  }
}

/// Strips one layer of surrounding double quotes and resolves the lexer's
/// fixed set of backslash escapes, mirroring `gramforge-ll::lexer`'s/
/// `gramforge-lr::lexer`'s own `STRING` lexing.
fn unquote(text: &str) -> String {
  let inner = text.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(text);
  let mut out = String::with_capacity(inner.len());
  let mut chars = inner.chars();
  while let Some(c) = chars.next() {
    if c == '\\' {
      match chars.next() {
        Some('n') => out.push('\n'),
        Some('t') => out.push('\t'),
        Some(other) => out.push(other),
        None => {}
      }
    } else {
      out.push(c);
    }
  }
  out
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn converts_known_terminals() {
    let reg = ValueConverterRegistry::default();
    assert_eq!(reg.convert("30", "INT").as_int(), Some(30));
    assert_eq!(reg.convert("\"hi\\nthere\"", "STRING").as_str(), Some("hi\nthere"));
  }

  #[test]
  fn unknown_rule_falls_back_to_verbatim_text() {
    let reg = ValueConverterRegistry::default();
    assert_eq!(reg.convert("widget", "CUSTOM").as_str(), Some("widget"));
  }
}
