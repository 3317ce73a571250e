use gramforge_core::config::ParserConfig;
use gramforge_core::grammar_model::*;
use gramforge_core::parser_adapter::ParserAdapter;
use gramforge_core::syntax_tree::SyntaxNodeExt;
use gramforge_core::GrammarIndex;
use gramforge_ll::InterpretedBackend;
use std::sync::Arc;

fn widget_grammar() -> GrammarIndex {
  let model = GrammarBuilder::new()
    .entry("Model")
    .rule("Model", seq(vec![kw("model"), star(assign_many("items", call("Item"))), kw("end")]))
    .rule("Item", seq(vec![kw("item"), assign("name", term("ID"))]))
    .build();
  GrammarIndex::build(model).unwrap()
}

#[test]
fn parses_a_well_formed_document() {
  let index = Arc::new(widget_grammar());
  let mut backend = InterpretedBackend::new();
  backend.configure(index.clone(), ParserConfig::new().ll1()).unwrap();

  let outcome = backend.parse("model item widget item gadget end").unwrap();
  assert!(outcome.diagnostics.iter().all(|d| !d.is_error()));
  assert!(!outcome.tree.has_errors());

  let model_node = outcome.tree.root().first_child().unwrap();
  assert_eq!(model_node.rule_name(&index), Some("Model"));
  let items = model_node.children_for_field(&index, "items");
  assert_eq!(items.len(), 2);
}

#[test]
fn recovers_from_a_malformed_item_without_losing_the_rest() {
  let index = Arc::new(widget_grammar());
  let mut backend = InterpretedBackend::new();
  backend.configure(index.clone(), ParserConfig::new().ll1()).unwrap();

  let outcome = backend.parse("model item 123 item gadget end").unwrap();
  assert!(outcome.diagnostics.iter().any(|d| d.is_error()));
  let model_node = outcome.tree.root().first_child().unwrap();
  let items = model_node.children_for_field(&index, "items");
  assert!(!items.is_empty(), "recovery should still expose the well-formed item");
}

#[test]
fn get_expected_tokens_reports_what_would_extend_the_parse() {
  let index = Arc::new(widget_grammar());
  let mut backend = InterpretedBackend::new();
  backend.configure(index, ParserConfig::new().ll1()).unwrap();

  let source = "model item widget ";
  let expected = backend.get_expected_tokens(source, source.len() as u32).unwrap();
  assert!(!expected.is_empty(), "expecting either another 'item' or 'end' after a complete Item");
  assert!(expected.iter().any(|t| t.is_keyword));
}

#[test]
fn incremental_parsing_is_rejected() {
  let index = Arc::new(widget_grammar());
  let mut backend = InterpretedBackend::new();
  backend.configure(index.clone(), ParserConfig::new().ll1()).unwrap();
  let outcome = backend.parse("model end").unwrap();
  let err = backend.parse_incremental(&outcome.tree, "model end", &[]).unwrap_err();
  assert!(matches!(err, gramforge_core::GramforgeError::IncrementalUnsupported(_)));
}
