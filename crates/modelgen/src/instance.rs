//! The embedding API (§6): instance lifecycle, search path, uniforms,
//! running source, importing modules, and reading back emitted geometry.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::FatalError;
use crate::frame::Frame;
use crate::io::{PrintSink, StdPrint};
use crate::module::{self, Module, ModuleRef};
use crate::parser;
use crate::stdlib;
use crate::value::{CFunction, Value};
use crate::vertex::{VertexBuffer, VertexStride};

/// A running ModelGen environment: loaded modules, the import search
/// path, injected uniforms, the active call stack, and the geometry
/// sink every `emit` writes into.
pub struct Instance {
    pub(crate) dynamic_modules: IndexMap<String, ModuleRef>,
    pub(crate) static_modules: IndexMap<String, ModuleRef>,
    pub(crate) search_path: Vec<PathBuf>,
    pub(crate) uniforms: IndexMap<String, Value>,
    pub(crate) call_stack: Vec<Frame>,
    pub(crate) current_module: Option<ModuleRef>,
    pub(crate) vertices: VertexBuffer,
    pub(crate) print_sink: Box<dyn PrintSink>,
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl Instance {
    /// Creates an instance with the default search path (§4.5: current
    /// working directory, the executable's directory, and a sibling
    /// `modules/` directory) and the `base`/`math` static modules
    /// registered.
    pub fn new() -> Self {
        let mut static_modules = IndexMap::new();
        for (name, globals) in stdlib::static_modules() {
            static_modules.insert(name.to_string(), Module::new_static(name.to_string(), globals));
        }

        let mut search_path = Vec::new();
        if let Ok(cwd) = env::current_dir() {
            search_path.push(cwd);
        }
        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                search_path.push(dir.to_path_buf());
                search_path.push(dir.join("modules"));
            }
        }

        Instance {
            dynamic_modules: IndexMap::new(),
            static_modules,
            search_path,
            uniforms: IndexMap::new(),
            call_stack: Vec::new(),
            current_module: None,
            vertices: VertexBuffer::new(VertexStride::new(3, 0, 0, 0)),
            print_sink: Box::new(StdPrint),
        }
    }

    /// Redirects `print` output (§6: embedding may want to capture or
    /// silence a program's output instead of writing to process stdout).
    pub fn set_print_sink(&mut self, sink: impl PrintSink + 'static) {
        self.print_sink = Box::new(sink);
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_path.push(path.into());
    }

    pub fn remove_search_path(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.search_path.retain(|p| p != path);
    }

    /// Merged into every subsequently loaded module's globals at load
    /// time (§6).
    pub fn set_uniform(&mut self, name: impl Into<String>, value: Value) {
        self.uniforms.insert(name.into(), value);
    }

    pub fn set_vertex_stride(&mut self, stride: VertexStride) {
        self.vertices.set_stride(stride);
    }

    pub fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertices
    }

    /// Registers a host function into the `base` module, making it
    /// available to every scope's prelude tier.
    pub fn register_cfunction(&mut self, name: impl Into<String>, func: CFunction) {
        if let Some(base) = self.static_modules.get("base") {
            base.borrow_mut().globals.insert(name.into(), Value::CFunction(func));
        }
    }

    /// Registers an arbitrary host value into the `base` module.
    pub fn register_value(&mut self, name: impl Into<String>, value: Value) {
        if let Some(base) = self.static_modules.get("base") {
            base.borrow_mut().globals.insert(name.into(), value);
        }
    }

    pub(crate) fn base_module(&self) -> ModuleRef {
        self.static_modules
            .get("base")
            .cloned()
            .expect("the base module is always registered")
    }

    /// Runs a source string as a module named `module_name`: parses it,
    /// registers it as a dynamic module, executes its top level, then
    /// invokes `main` if the module defines it (§4.5).
    pub fn run_string(&mut self, source: &str, module_name: &str) -> Result<Value, FatalError> {
        let filename = format!("{module_name}.mg");
        self.run_source(source, module_name, &filename)
    }

    /// Runs a `.mg` file from disk under its filename-derived module
    /// name, reporting diagnostics (§6) against the file's actual path
    /// rather than the synthesized module-name filename `run_string`
    /// uses for in-memory sources.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<Value, FatalError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|e| FatalError::Io(format!("{}: {e}", path.display())))?;
        let name = module::filename_to_import_name(&path.to_string_lossy());
        self.run_source(&source, &name, &path.to_string_lossy())
    }

    fn run_source(&mut self, source: &str, module_name: &str, filename: &str) -> Result<Value, FatalError> {
        let ast = parser::parse(source).map_err(|e| e.with_filename(filename))?;
        let module = Module::new_source(module_name.to_string(), filename.to_string(), ast);
        self.seed_uniforms(&module);
        self.dynamic_modules.insert(module_name.to_string(), module.clone());
        self.execute_module(module, filename)
    }

    /// `import "name"` (§4.5): dynamic cache, then search path, then
    /// static modules; first match wins. Executes the module on first
    /// load only.
    pub fn import_module(&mut self, name: &str) -> Result<Value, FatalError> {
        if let Some(m) = self.dynamic_modules.get(name) {
            return Ok(Value::Module(m.clone()));
        }

        if let Some(source_path) = self.find_on_search_path(name) {
            let source = fs::read_to_string(&source_path)
                .map_err(|e| FatalError::Io(format!("{}: {e}", source_path.display())))?;
            let filename = source_path.to_string_lossy().into_owned();
            let ast = parser::parse(&source).map_err(|e| e.with_filename(filename.clone()))?;
            let module = Module::new_source(name.to_string(), filename.clone(), ast);
            self.seed_uniforms(&module);
            self.dynamic_modules.insert(name.to_string(), module.clone());
            self.execute_module(module.clone(), &filename)?;
            return Ok(Value::Module(module));
        }

        if let Some(m) = self.static_modules.get(name) {
            return Ok(Value::Module(m.clone()));
        }

        Err(FatalError::Io(format!("no module named '{name}'")))
    }

    fn find_on_search_path(&self, name: &str) -> Option<PathBuf> {
        let rel = module::import_name_to_filename(name);
        self.search_path.iter().map(|dir| dir.join(&rel)).find(|p| p.is_file())
    }

    fn seed_uniforms(&self, module: &ModuleRef) {
        let mut module = module.borrow_mut();
        for (k, v) in &self.uniforms {
            module.globals.insert(k.clone(), v.clone());
        }
    }

    fn execute_module(&mut self, module: ModuleRef, filename: &str) -> Result<Value, FatalError> {
        if module.borrow().executed {
            return Ok(Value::Module(module));
        }
        module.borrow_mut().executed = true;

        let result = self.run_module_body(module.clone(), filename)?;

        let main = module.borrow().globals.get("main").cloned();
        if let Some(main_fn) = main {
            if matches!(main_fn, Value::Callable(_)) {
                self.call_value(&main_fn, &[], crate::token::Pos::START)
                    .map_err(|e| self.flow_into_fatal(e, filename))?;
            }
        }

        Ok(result.unwrap_or(Value::Module(module)))
    }

    fn flow_into_fatal(&self, flow: crate::frame::Flow, filename: &str) -> FatalError {
        match flow {
            crate::frame::Flow::Error(e) => FatalError::Runtime(e.with_filename(filename)),
            crate::frame::Flow::Return(_) | crate::frame::Flow::Break | crate::frame::Flow::Continue => {
                FatalError::Runtime(
                    crate::error::RuntimeError::type_error(
                        crate::token::Pos::START,
                        "break/continue/return used outside of a loop or procedure",
                    )
                    .with_filename(filename),
                )
            }
        }
    }

    /// Executes a module's top-level expressions in its own globals
    /// scope, restoring whatever module was previously "current" on
    /// return (supports one module's top level importing another).
    fn run_module_body(&mut self, module: ModuleRef, filename: &str) -> Result<Option<Value>, FatalError> {
        let ast = module.borrow().ast.clone();
        let Some(ast) = ast else {
            return Ok(None);
        };

        let previous = self.current_module.replace(module.clone());
        let mut last = Value::Null;
        for expr in &ast.body {
            match self.eval_expr(expr) {
                Ok(v) => last = v,
                Err(flow) => {
                    let fatal = self.flow_into_fatal(flow, filename);
                    self.current_module = previous;
                    return Err(fatal);
                }
            }
        }
        self.current_module = previous;
        Ok(Some(last))
    }

    pub(crate) fn module_for_current_scope(&self) -> ModuleRef {
        if let Some(frame) = self.call_stack.last() {
            frame.module.clone()
        } else {
            self.current_module.clone().unwrap_or_else(|| self.base_module())
        }
    }
}
