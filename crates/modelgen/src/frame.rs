//! Call frames and non-local control transfer (§3.5, §4.4).
//!
//! The original models a frame's state (inactive/active/return/break/
//! continue) as a field on a doubly-linked frame list, inspected between
//! statements. Rust's `Result`/`?` is the transparent translation the
//! spec invites for this: `Flow` is the evaluator's error type, with
//! `Break`/`Continue`/`Return` standing in for the three non-error
//! states and `Error` carrying an actual fatal failure. A `Vec<Frame>`
//! stands in for the doubly-linked call stack; the top frame is always
//! the last element.

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::module::ModuleRef;
use crate::value::Value;

/// A single call-stack entry. The module-top-level frame (pushed once
/// per `Instance::run_module`) has `caller_name: None`.
#[derive(Debug)]
pub struct Frame {
    pub locals: IndexMap<String, Value>,
    pub caller_name: Option<String>,
    pub module: ModuleRef,
}

impl Frame {
    pub fn new(module: ModuleRef, locals: IndexMap<String, Value>, caller_name: Option<String>) -> Self {
        Frame {
            locals,
            caller_name,
            module,
        }
    }
}

/// Non-local control transfer, threaded as the `Err` side of every
/// evaluator result. `Break`/`Continue` are caught by the nearest
/// enclosing `for`; `Return` unwinds to the nearest function frame.
#[derive(Debug)]
pub enum Flow {
    Break,
    Continue,
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Flow {
    fn from(e: RuntimeError) -> Self {
        Flow::Error(e)
    }
}

pub type EvalResult = Result<Value, Flow>;
