//! The AST node: a dynamic "record" keyed by grammar property names
//! (spec.md §3's `$type` / `$container` / `$containerProperty` shape),
//! reimplemented here per SPEC_FULL.md's redesign note as a reflection
//! record keyed by `(ruleName, propertyName)` rather than an open JS
//! dictionary — [gramforge_core::GrammarIndex] supplies the schema that
//! would otherwise come from the source's dynamic property bag.
//!
//! Container back-links are non-owning (`Weak`) per spec.md §9 ("Cyclic
//! container back-links... represent as non-owning handles"): the AST's
//! property tree is what keeps a node alive, never its container pointer.

use crate::reference::{MultiReference, Reference};
use gramforge_core::syntax_tree::SyntaxNode;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// One property value. A flat sum type standing in for the source's dynamic
/// JS values — every shape an assignment (`=`, `+=`, `?=`) or a type-override
/// inlining can produce.
#[derive(Clone)]
pub enum Value {
  Node(AstNode),
  List(Vec<Value>),
  Reference(Reference),
  MultiReference(MultiReference),
  String(String),
  Int(i64),
  Float(f64),
  Bool(bool),
}

impl Value {
  pub fn as_node(&self) -> Option<&AstNode> {
    match self {
      Value::Node(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s.as_str()),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_reference(&self) -> Option<&Reference> {
    match self {
      Value::Reference(r) => Some(r),
      _ => None,
    }
  }
}

struct AstNodeData {
  type_name: String,
  properties: IndexMap<String, Value>,
  /// `$syntaxNode`: the ST node this AST node was built from.
  syntax_node: Option<SyntaxNode>,
  /// `$container`: non-owning per spec.md §9.
  container: Option<Weak<RefCell<AstNodeData>>>,
  container_property: Option<String>,
  /// Set only when this node occupies a list-valued property slot.
  container_index: Option<usize>,
}

/// A reference-counted handle to one AST node. Cloning an [AstNode] clones
/// the handle, not the data — the same sharing model the teacher's tree
/// types use for cheap structural reuse.
#[derive(Clone)]
pub struct AstNode(Rc<RefCell<AstNodeData>>);

impl AstNode {
  pub fn new(type_name: impl Into<String>) -> Self {
    Self(Rc::new(RefCell::new(AstNodeData {
      type_name: type_name.into(),
      properties: IndexMap::new(),
      syntax_node: None,
      container: None,
      container_property: None,
      container_index: None,
    })))
  }

  pub fn type_name(&self) -> String {
    self.0.borrow().type_name.clone()
  }

  pub fn set_type_name(&self, name: impl Into<String>) {
    self.0.borrow_mut().type_name = name.into();
  }

  pub fn set_property(&self, name: impl Into<String>, value: Value) {
    self.0.borrow_mut().properties.insert(name.into(), value);
  }

  pub fn has_property(&self, name: &str) -> bool {
    self.0.borrow().properties.contains_key(name)
  }

  pub fn property(&self, name: &str) -> Option<Value> {
    self.0.borrow().properties.get(name).cloned()
  }

  pub fn property_names(&self) -> Vec<String> {
    self.0.borrow().properties.keys().cloned().collect()
  }

  pub fn syntax_node(&self) -> Option<SyntaxNode> {
    self.0.borrow().syntax_node.clone()
  }

  pub fn set_syntax_node(&self, node: SyntaxNode) {
    self.0.borrow_mut().syntax_node = Some(node);
  }

  /// `$container`: the node that holds this one as a property value, if any
  /// (absent only for the root AST node — spec.md §8 invariant 7).
  pub fn container(&self) -> Option<AstNode> {
    self.0.borrow().container.as_ref().and_then(|w| w.upgrade()).map(AstNode)
  }

  pub fn container_property(&self) -> Option<String> {
    self.0.borrow().container_property.clone()
  }

  pub fn container_index(&self) -> Option<usize> {
    self.0.borrow().container_index
  }

  fn set_container(&self, container: &AstNode, property: &str, index: Option<usize>) {
    let mut data = self.0.borrow_mut();
    data.container = Some(Rc::downgrade(&container.0));
    data.container_property = Some(property.to_string());
    data.container_index = index;
  }

  /// Identity check used by the builder's ST→AST map bookkeeping and by
  /// tests asserting spec.md §8 invariant 7.
  pub fn ptr_eq(&self, other: &AstNode) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  /// Sets `$container`/`$containerProperty`/`$containerIndex` on every
  /// direct `Node`-valued property of `self` (spec.md §4.6 step 7). Called
  /// once per node as the builder finishes it, so by the time a parent
  /// claims a child's properties (the type-override inlining of §4.6 step
  /// 4) the child's own grandchildren are already correctly linked.
  pub(crate) fn link_children(&self) {
    let snapshot: Vec<(String, Value)> = self.0.borrow().properties.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    for (property, value) in snapshot {
      match value {
        Value::Node(child) => child.set_container(self, &property, None),
        Value::List(items) => {
          for (i, item) in items.iter().enumerate() {
            if let Value::Node(child) = item {
              child.set_container(self, &property, Some(i));
            }
          }
        }
        _ => {}
      }
    }
  }
}

/// spec.md §4.6 step 5: "set empty arrays and default booleans for declared
/// properties that were not otherwise assigned". `declared` is every
/// property name the grammar index knows for this rule, paired with whether
/// its operator is list-shaped (`+=`) or flag-shaped (`?=`).
pub fn assign_mandatory_properties(ast: &AstNode, declared: &[(String, gramforge_core::grammar_model::AssignOp)]) {
  use gramforge_core::grammar_model::AssignOp;
  for (name, op) in declared {
    if ast.has_property(name) {
      continue;
    }
    match op {
      AssignOp::Append => ast.set_property(name.clone(), Value::List(Vec::new())),
      AssignOp::Flag => ast.set_property(name.clone(), Value::Bool(false)),
      AssignOp::Assign => {}
    }
  }
}
