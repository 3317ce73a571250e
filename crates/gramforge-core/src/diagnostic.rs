//! The uniform diagnostic shape every backend normalizes into (spec.md §3,
//! §7). Grounded on `radlr-core`'s error-reporting posture (errors surface
//! through data, not exceptions) but flattened to the single record shape
//! spec.md §3 mandates: `{ message, offset, length, severity, source }`.

use crate::token::ByteRange;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
  Error,
  Warning,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DiagnosticSource {
  Lexer,
  Parser,
  Translator,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
  pub message:  String,
  pub range:    ByteRange,
  pub severity: Severity,
  pub source:   DiagnosticSource,
}

impl Diagnostic {
  /// Constructs a diagnostic, clamping `length` to at least 1 byte per the
  /// spec.md §3 invariant `length ≥ 1`.
  pub fn new(message: impl Into<String>, offset: u32, length: u32, severity: Severity, source: DiagnosticSource) -> Self {
    let length = length.max(1);
    Self { message: message.into(), range: ByteRange::new(offset, offset + length), severity, source }
  }

  pub fn lex_error(message: impl Into<String>, offset: u32, length: u32) -> Self {
    Self::new(message, offset, length, Severity::Error, DiagnosticSource::Lexer)
  }

  pub fn parse_error(message: impl Into<String>, offset: u32, length: u32) -> Self {
    Self::new(message, offset, length, Severity::Error, DiagnosticSource::Parser)
  }

  pub fn translator_error(message: impl Into<String>) -> Self {
    Self::new(message, 0, 1, Severity::Error, DiagnosticSource::Translator)
  }

  pub fn translator_warning(message: impl Into<String>) -> Self {
    Self::new(message, 0, 1, Severity::Warning, DiagnosticSource::Translator)
  }

  pub fn is_error(&self) -> bool {
    self.severity == Severity::Error
  }
}
