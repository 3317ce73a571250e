//! A plain indented dump of an [AstNode] tree, for `gramforge parse` to print
//! without pulling in a full pretty-printing dependency.

use gramforge_ast::{AstNode, Value};

pub fn print(node: &AstNode, depth: usize) {
  println!("{}{}", indent(depth), node.type_name());
  for name in node.property_names() {
    let Some(value) = node.property(&name) else { continue };
    print_property(&name, &value, depth + 1);
  }
}

fn print_property(name: &str, value: &Value, depth: usize) {
  match value {
    Value::Node(child) => {
      println!("{}{name}:", indent(depth));
      print(child, depth + 1);
    }
    Value::List(items) => {
      println!("{}{name}: [{}]", indent(depth), items.len());
      for item in items {
        print_property(name, item, depth + 1);
      }
    }
    Value::Reference(r) => println!("{}{name}: ->{} (resolved: {})", indent(depth), r.ref_text, r.is_resolved()),
    Value::MultiReference(m) => println!("{}{name}: [{} references]", indent(depth), m.items.len()),
    Value::String(s) => println!("{}{name}: {s:?}", indent(depth)),
    Value::Int(i) => println!("{}{name}: {i}", indent(depth)),
    Value::Float(f) => println!("{}{name}: {f}", indent(depth)),
    Value::Bool(b) => println!("{}{name}: {b}", indent(depth)),
  }
}

fn indent(depth: usize) -> String {
  "  ".repeat(depth)
}
