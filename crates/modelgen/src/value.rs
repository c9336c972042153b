//! The runtime value model (§3.3).
//!
//! The original keeps an arena of heap cells with manual `reference`/
//! `destroy` calls; Rust's `Rc`/`RefCell` give the same strong-reference-
//! count semantics for free; there is no separate "destroy" entry point —
//! a container's children drop when the container's `Rc` reaches zero.
//! This mirrors the teacher's own move away from a hand-rolled arena for
//! values that don't need cycle collection.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::ProcDef;
use crate::error::RuntimeError;
use crate::module::{ModuleRef, ModuleWeakRef};

pub type CFunction = fn(&mut crate::instance::Instance, &[Value]) -> Result<Value, RuntimeError>;

pub type List = Rc<RefCell<Vec<Value>>>;
pub type Map = Rc<RefCell<IndexMap<String, Value>>>;

/// A `proc`/`function` value: captured locals plus the AST it closes
/// over. "Procedure" and "function" are the same representation —
/// §4.4 draws the distinction only at call sites, not in the value
/// model, so there is exactly one callable variant here.
#[derive(Debug, Clone)]
pub struct Callable {
    pub def: Rc<ProcDef>,
    pub captured: Rc<IndexMap<String, Value>>,
    pub module: ModuleWeakRef,
}

impl Callable {
    /// Upgrades the weak back-reference to the defining module. Only
    /// panics if the module has already been dropped, which cannot
    /// happen while the instance that owns it is still running.
    pub fn module(&self) -> ModuleRef {
        self.module.upgrade().expect("a callable outlived its defining module")
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.def, &other.def)
    }
}

#[derive(Clone)]
pub struct BoundCFunction {
    pub func: CFunction,
    pub receiver: Box<Value>,
}

impl fmt::Debug for BoundCFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCFunction")
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

impl PartialEq for BoundCFunction {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.func as *const (), other.func as *const ()) && self.receiver == other.receiver
    }
}

/// A value of the scripting language, reference-counted via `Rc`
/// everywhere a container or closure is shared.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i32),
    Float(f32),
    /// Owned, immutable string content. The original distinguishes
    /// owned/static/keep storage for its arena's benefit (static strings
    /// are never freed); under `Rc<str>` that distinction collapses to
    /// "shared, immutable, freed when the last reference drops," so it
    /// is not modeled as a separate tag here.
    Str(Rc<str>),
    Tuple(Rc<[Value]>),
    List(List),
    Map(Map),
    CFunction(CFunction),
    BoundCFunction(BoundCFunction),
    Callable(Callable),
    Module(ModuleRef),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(items.into())
    }

    pub fn map(entries: IndexMap<String, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// §4.3 truth value: null, zero, and empty containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Map(entries) => !entries.borrow().is_empty(),
            Value::CFunction(_)
            | Value::BoundCFunction(_)
            | Value::Callable(_)
            | Value::Module(_) => true,
        }
    }

    /// The type name `type()` reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::CFunction(_) => "cfunction",
            Value::BoundCFunction(_) => "bound-cfunction",
            Value::Callable(_) => "procedure",
            Value::Module(_) => "module",
        }
    }

    /// Shallow copy: duplicates the outer container, shares children
    /// (§3.3, "shallow copy duplicates the outer container and
    /// references children").
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::List(items) => Value::list(items.borrow().clone()),
            Value::Map(entries) => Value::map(entries.borrow().clone()),
            other => other.clone(),
        }
    }

    /// Deep copy: recursively duplicates every nested container.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Tuple(items) => Value::tuple(items.iter().map(Value::deep_copy).collect()),
            Value::List(items) => {
                Value::list(items.borrow().iter().map(Value::deep_copy).collect())
            }
            Value::Map(entries) => {
                let copied: IndexMap<String, Value> = entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_copy()))
                    .collect();
                Value::map(copied)
            }
            other => other.clone(),
        }
    }

    /// §4.3's `to-string` slot: the representation `print` and string
    /// conversion use.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.to_string(),
            Value::Tuple(items) => format_sequence('(', ')', items),
            Value::List(items) => format_sequence('[', ']', &items.borrow()),
            Value::Map(entries) => format_map(&entries.borrow()),
            Value::CFunction(_) => "<cfunction>".to_string(),
            Value::BoundCFunction(_) => "<bound-cfunction>".to_string(),
            Value::Callable(c) => format!("<procedure {}>", c.def.name),
            Value::Module(m) => format!("<module {}>", m.borrow().name),
        }
    }
}

fn format_float(f: f32) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

fn format_sequence(open: char, close: char, items: &[Value]) -> String {
    let mut out = String::new();
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&item.to_display_string());
    }
    out.push(close);
    out
}

fn format_map(entries: &IndexMap<String, Value>) -> String {
    let mut out = String::new();
    out.push('{');
    for (i, (k, v)) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("{k:?}: {}", v.to_display_string()));
    }
    out.push('}');
    out
}

/// §3.3 equality: numeric comparisons cross int/float, float uses an
/// epsilon, composites compare structurally, callables compare by
/// identity.
impl Value {
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        const EPSILON: f64 = 1e-6;

        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => ((*x as f64) - (*y as f64)).abs() < EPSILON,
            (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
                ((*x as f64) - (*y as f64)).abs() < EPSILON
            }
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Tuple(x), Value::Tuple(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| Value::values_equal(a, b))
            }
            (Value::List(x), Value::List(y)) => {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| Value::values_equal(a, b))
            }
            (Value::Map(x), Value::Map(y)) => {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len()
                    && x.iter()
                        .all(|(k, v)| y.get(k).is_some_and(|v2| Value::values_equal(v, v2)))
            }
            (Value::CFunction(x), Value::CFunction(y)) => {
                std::ptr::eq(*x as *const (), *y as *const ())
            }
            (Value::BoundCFunction(x), Value::BoundCFunction(y)) => x == y,
            (Value::Callable(x), Value::Callable(y)) => Rc::ptr_eq(&x.def, &y.def),
            (Value::Module(x), Value::Module(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truth_value_matches_table() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
        assert!(Value::list(vec![Value::Int(1)]).is_truthy());
    }

    #[test]
    fn int_and_float_compare_numerically() {
        assert!(Value::values_equal(&Value::Int(2), &Value::Float(2.0)));
        assert!(!Value::values_equal(&Value::Int(2), &Value::Float(2.1)));
    }

    #[test]
    fn lists_compare_structurally() {
        let a = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert!(Value::values_equal(&a, &b));
    }

    #[test]
    fn deep_copy_does_not_alias_nested_containers() {
        let inner = Value::list(vec![Value::Int(1)]);
        let outer = Value::list(vec![inner.clone()]);
        let copy = outer.deep_copy();
        if let (Value::List(outer_items), Value::List(copy_items)) = (&outer, &copy) {
            let Value::List(a) = &outer_items.borrow()[0] else {
                unreachable!()
            };
            let Value::List(b) = &copy_items.borrow()[0] else {
                unreachable!()
            };
            assert!(!Rc::ptr_eq(a, b));
        }
    }

    #[test]
    fn shallow_copy_shares_nested_containers() {
        let inner = Value::list(vec![Value::Int(1)]);
        let outer = Value::list(vec![inner.clone()]);
        let copy = outer.shallow_copy();
        if let (Value::List(outer_items), Value::List(copy_items)) = (&outer, &copy) {
            let Value::List(a) = &outer_items.borrow()[0] else {
                unreachable!()
            };
            let Value::List(b) = &copy_items.borrow()[0] else {
                unreachable!()
            };
            assert!(Rc::ptr_eq(a, b));
        }
    }
}
