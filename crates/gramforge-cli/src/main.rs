//! Command-line front door for the gramforge workbench.
//!
//! Grounded on `radlr-cli`'s `clap::Command`/`arg!` builder shape
//! (`examples/acweathersby-radlr/src/app/cli/main.rs`): a top-level command
//! with one subcommand per pipeline stage, `tracing-subscriber` installed
//! before any work happens so every backend's `tracing::debug!`/`warn!`
//! calls have somewhere to go.

mod ast_dump;
mod demo_grammar;

use clap::{arg, value_parser, ArgMatches, Command};
use gramforge_ast::{DeferredLinker, SyntaxNodeAstBuilder, ValueConverterRegistry};
use gramforge_core::config::ParserConfig;
use gramforge_core::parser_adapter::ParserAdapter;
use gramforge_core::{Diagnostic, GrammarIndex};
use gramforge_ll::InterpretedBackend;
use gramforge_lr::CompiledBackend;
use gramforge_translate::{ll_translator, lr_translator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

fn command() -> ArgMatches {
  Command::new("gramforge")
    .version(env!("CARGO_PKG_VERSION"))
    .about("Parse, validate and compile the language-workbench demo grammar")
    .subcommand(
      Command::new("parse")
        .about("Parses source text and prints the resulting AST")
        .arg(arg!(-b --backend <BACKEND> "Which backend to parse with").required(false).value_parser(["ll", "lr"]).default_value("ll"))
        .arg(arg!([INPUT] "Path to a source file; defaults to the built-in sample").required(false).value_parser(value_parser!(PathBuf))),
    )
    .subcommand(Command::new("check").about("Runs LL-readiness validation on the demo grammar and reports diagnostics"))
    .subcommand(
      Command::new("compile")
        .about("Compiles the demo grammar into a CompiledArtifact and prints it")
        .arg(arg!(-o --out <OUTPUT_PATH> "Write the artifact as JSON to this path instead of stdout").required(false).value_parser(value_parser!(PathBuf))),
    )
    .subcommand_required(true)
    .get_matches()
}

fn main() -> ExitCode {
  tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

  let matches = command();
  let result = match matches.subcommand() {
    Some(("parse", sub)) => run_parse(sub),
    Some(("check", _)) => run_check(),
    Some(("compile", sub)) => run_compile(sub),
    _ => unreachable!("clap enforces subcommand_required"),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(message) => {
      eprintln!("error: {message}");
      ExitCode::FAILURE
    }
  }
}

fn build_index() -> Arc<GrammarIndex> {
  Arc::new(GrammarIndex::build(demo_grammar::build()).expect("demo grammar is well-formed by construction"))
}

fn run_check() -> Result<(), String> {
  let index = build_index();
  let diagnostics = ll_translator::validate(&index);
  if diagnostics.is_empty() {
    println!("grammar is LL-ready: no diagnostics");
    return Ok(());
  }
  for d in &diagnostics {
    print_diagnostic(d);
  }
  if diagnostics.iter().any(Diagnostic::is_error) {
    Err("grammar failed LL-readiness validation".to_string())
  } else {
    Ok(())
  }
}

fn run_compile(sub: &ArgMatches) -> Result<(), String> {
  let index = build_index();
  let (artifact, warnings) = lr_translator::compile(&index).map_err(|e| e.to_string())?;
  for d in &warnings {
    print_diagnostic(d);
  }
  let json = serde_json::to_string_pretty(&artifact).map_err(|e| e.to_string())?;

  if let Some(path) = sub.get_one::<PathBuf>("out") {
    std::fs::write(path, &json).map_err(|e| format!("writing {}: {e}", path.display()))?;
    println!("wrote compiled artifact to {}", path.display());
  } else {
    println!("{json}");
  }

  println!("\n--- grammar dump ---\n{}", lr_translator::emit_grammar_text(&index));
  Ok(())
}

fn run_parse(sub: &ArgMatches) -> Result<(), String> {
  let source = match sub.get_one::<PathBuf>("INPUT") {
    Some(path) => std::fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?,
    None => demo_grammar::SAMPLE_SOURCE.to_string(),
  };

  let index = build_index();
  let backend_name = sub.get_one::<String>("backend").map(String::as_str).unwrap_or("ll");

  let (tree, diagnostics) = if backend_name == "lr" {
    let (artifact, _warnings) = lr_translator::compile(&index).map_err(|e| e.to_string())?;
    let mut backend = CompiledBackend::new();
    backend.configure(index.clone(), ParserConfig::new().lrk(1)).map_err(|e| e.to_string())?;
    backend.load_artifact(artifact).map_err(|e| e.to_string())?;
    let outcome = backend.parse(&source).map_err(|e| e.to_string())?;
    (outcome.tree, outcome.diagnostics)
  } else {
    let mut backend = InterpretedBackend::new();
    backend.configure(index.clone(), ParserConfig::new().ll1()).map_err(|e| e.to_string())?;
    let outcome = backend.parse(&source).map_err(|e| e.to_string())?;
    (outcome.tree, outcome.diagnostics)
  };

  for d in &diagnostics {
    print_diagnostic(d);
  }

  let linker = DeferredLinker;
  let converters = ValueConverterRegistry::default();
  let build = SyntaxNodeAstBuilder::new(&index, &linker, &converters).build_ast_with_diagnostics(&tree, diagnostics);

  match build.ast {
    Some(ast) => ast_dump::print(&ast, 0),
    None => println!("(no AST: empty document)"),
  }
  Ok(())
}

fn print_diagnostic(d: &Diagnostic) {
  eprintln!("{:?} [{:?}] {}..{}: {}", d.severity, d.source, d.range.offset, d.range.end, d.message);
}
