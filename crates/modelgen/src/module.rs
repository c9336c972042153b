//! Modules and the dotted-name ↔ filename conversion (§3.4, §4.5).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::ast::Ast;
use crate::value::Value;

pub type ModuleRef = Rc<RefCell<Module>>;

/// A non-owning reference to a module, used wherever a value stored
/// *inside* a module's own globals needs to point back to its defining
/// module (§9: "function → defining module is a weak reference, since
/// the module outlives every function it defined"). A strong
/// `ModuleRef` there would make every module that defines a procedure
/// self-referential and therefore unreclaimable.
pub type ModuleWeakRef = Weak<RefCell<Module>>;

/// A loaded module: its parsed body, its globals, and whether it has
/// been executed yet. Static (built-in) modules are constructed
/// directly with their globals already populated and `executed` set —
/// they have no source body to run.
///
/// `PartialEq` compares by name only, so `Value`'s derived equality
/// works; real module identity is a `Rc::ptr_eq` on the `ModuleRef`.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub filename: Option<String>,
    pub ast: Option<Ast>,
    pub globals: IndexMap<String, Value>,
    pub is_static: bool,
    pub executed: bool,
}

impl Module {
    pub fn new_source(name: String, filename: String, ast: Ast) -> ModuleRef {
        Rc::new(RefCell::new(Module {
            name,
            filename: Some(filename),
            ast: Some(ast),
            globals: IndexMap::new(),
            is_static: false,
            executed: false,
        }))
    }

    pub fn new_static(name: String, globals: IndexMap<String, Value>) -> ModuleRef {
        Rc::new(RefCell::new(Module {
            name,
            filename: None,
            ast: None,
            globals,
            is_static: true,
            executed: true,
        }))
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Converts a dotted module name (`pkg.sub.mod`) to a `.mg` filename
/// relative to a search-path root (`pkg/sub/mod.mg`).
pub fn import_name_to_filename(name: &str) -> String {
    let mut path = name.replace('.', std::path::MAIN_SEPARATOR_STR);
    path.push_str(".mg");
    path
}

/// Converts a `.mg` filename back to its dotted module name, stripping
/// the extension and turning path separators into dots.
pub fn filename_to_import_name(filename: &str) -> String {
    let without_ext = filename.strip_suffix(".mg").unwrap_or(filename);
    without_ext
        .replace(['/', '\\'], ".")
        .trim_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dotted_name_round_trips_through_filename() {
        let name = "pkg.sub.mod";
        let filename = import_name_to_filename(name);
        assert_eq!(filename_to_import_name(&filename), name);
    }

    #[test]
    fn single_segment_module() {
        assert_eq!(import_name_to_filename("math"), "math.mg");
        assert_eq!(filename_to_import_name("math.mg"), "math");
    }
}
