//! The tree-walking evaluator (§4.4): one dispatch arm per [`Expr`]
//! variant, threading [`EvalResult`] (`Flow`-on-error) throughout.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{AssignOp, BinOp, Expr, IndexKey, ProcDef, UnaryOp};
use crate::error::RuntimeError;
use crate::frame::{EvalResult, Flow, Frame};
use crate::instance::Instance;
use crate::token::Pos;
use crate::value::{Callable, Value};

impl Instance {
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Int(n, _) => Ok(Value::Int(*n as i32)),
            Expr::Float(f, _) => Ok(Value::Float(*f as f32)),
            Expr::Str(s, _) => Ok(Value::str(s.as_str())),
            Expr::Identifier(name, span) => self.resolve_name(name, span.begin),

            Expr::Tuple(items, _) => {
                let values = self.eval_each(items)?;
                Ok(Value::tuple(values))
            }
            Expr::List(items, _) => {
                let values = self.eval_each(items)?;
                Ok(Value::list(values))
            }
            Expr::Map(entries, span) => self.eval_map(entries, span.begin),

            Expr::Unary { op, operand, span } => self.eval_unary(op, operand, span.begin),
            Expr::Binary { op, lhs, rhs, span } => self.eval_binary(op, lhs, rhs, span.begin),
            Expr::Assign { op, target, value, span } => self.eval_assign(op, target, value, span.begin),

            Expr::Call { callee, args, span } => self.eval_call(callee, args, span.begin),
            Expr::Index { target, key, span } => {
                let t = self.eval_expr(target)?;
                self.eval_index_get(&t, key, span.begin)
            }
            Expr::Attr { target, name, span } => {
                let t = self.eval_expr(target)?;
                self.get_attr(&t, name, span.begin)
            }

            Expr::Block(exprs, _) => self.eval_block(exprs),

            Expr::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let c = self.eval_expr(cond)?;
                if c.is_truthy() {
                    self.eval_expr(then_branch)
                } else if let Some(e) = else_branch {
                    self.eval_expr(e)
                } else {
                    Ok(Value::Null)
                }
            }

            Expr::For { var, iter, body, span } => self.eval_for(var, iter, body, span.begin),

            Expr::Proc(def) => self.eval_proc_def(def),

            Expr::Emit { value, span } => self.eval_emit(value, span.begin),

            Expr::Break(_) => Err(Flow::Break),
            Expr::Continue(_) => Err(Flow::Continue),
            Expr::Return { value, span } => {
                let v = match value {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::Null,
                };
                let _ = span;
                Err(Flow::Return(v))
            }
        }
    }

    fn eval_each(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, Flow> {
        exprs.iter().map(|e| self.eval_expr(e)).collect()
    }

    fn eval_map(&mut self, entries: &[(Expr, Expr)], pos: Pos) -> EvalResult {
        let mut map = IndexMap::new();
        for (key_expr, value_expr) in entries {
            let key = self.eval_expr(key_expr)?;
            let value = self.eval_expr(value_expr)?;
            let Value::Str(key) = key else {
                return Err(RuntimeError::type_error(pos, "map keys must be strings").into());
            };
            map.insert(key.to_string(), value);
        }
        Ok(Value::map(map))
    }

    /// `Block` evaluates each of its sub-expressions in order and yields
    /// the value of the last one — the module/colon-body sequencing
    /// rule generalized to an arbitrary-length sequence.
    fn eval_block(&mut self, exprs: &[Expr]) -> EvalResult {
        let mut last = Value::Null;
        for e in exprs {
            last = self.eval_expr(e)?;
        }
        Ok(last)
    }

    /// §4.4 name resolution: top frame's locals, then the current
    /// module's globals, then the base module's globals.
    fn resolve_name(&self, name: &str, pos: Pos) -> EvalResult {
        if let Some(frame) = self.call_stack.last() {
            if let Some(v) = frame.locals.get(name) {
                return Ok(v.clone());
            }
        }

        let module = self.module_for_current_scope();
        if let Some(v) = module.borrow().globals.get(name) {
            return Ok(v.clone());
        }

        if let Some(v) = self.base_module().borrow().globals.get(name) {
            return Ok(v.clone());
        }

        Err(RuntimeError::name(pos, format!("name '{name}' is not defined")).into())
    }

    fn eval_unary(&mut self, op: &UnaryOp, operand: &Expr, pos: Pos) -> EvalResult {
        let v = self.eval_expr(operand)?;
        match op {
            UnaryOp::Plus => match v {
                Value::Int(n) => Ok(Value::Int(n)),
                Value::Float(f) => Ok(Value::Float(f)),
                _ => Err(RuntimeError::type_error(pos, format!("unary + not supported for {}", v.type_name())).into()),
            },
            UnaryOp::Neg => match v {
                Value::Int(n) => Ok(Value::Int(-n)),
                Value::Float(f) => Ok(Value::Float(-f)),
                _ => Err(RuntimeError::type_error(pos, format!("unary - not supported for {}", v.type_name())).into()),
            },
            UnaryOp::Not => Ok(Value::Int(if v.is_truthy() { 0 } else { 1 })),
        }
    }

    fn eval_binary(&mut self, op: &BinOp, lhs: &Expr, rhs: &Expr, pos: Pos) -> EvalResult {
        // `and`/`or` short-circuit and yield the deciding operand's
        // actual value, not a synthesized boolean (there is no bool
        // type, §3.3).
        if matches!(op, BinOp::And | BinOp::Or) {
            let l = self.eval_expr(lhs)?;
            return match op {
                BinOp::And => {
                    if !l.is_truthy() {
                        Ok(l)
                    } else {
                        self.eval_expr(rhs)
                    }
                }
                BinOp::Or => {
                    if l.is_truthy() {
                        Ok(l)
                    } else {
                        self.eval_expr(rhs)
                    }
                }
                _ => unreachable!(),
            };
        }

        let l = self.eval_expr(lhs)?;
        let r = self.eval_expr(rhs)?;
        apply_binary(op, l, r, pos)
    }

    fn eval_assign(&mut self, op: &AssignOp, target: &Expr, value: &Expr, pos: Pos) -> EvalResult {
        let new_value = if *op == AssignOp::Assign {
            self.eval_expr(value)?
        } else {
            let current = self.eval_expr(target)?;
            let rhs = self.eval_expr(value)?;
            let bin_op = match op {
                AssignOp::AddAssign => BinOp::Add,
                AssignOp::SubAssign => BinOp::Sub,
                AssignOp::MulAssign => BinOp::Mul,
                AssignOp::DivAssign => BinOp::Div,
                AssignOp::ModAssign => BinOp::Mod,
                AssignOp::Assign => unreachable!(),
            };
            apply_binary(&bin_op, current, rhs, pos)?
        };

        self.bind_target(target, new_value.clone(), pos)?;
        Ok(new_value)
    }

    fn bind_target(&mut self, target: &Expr, value: Value, pos: Pos) -> Result<(), Flow> {
        match target {
            Expr::Identifier(name, _) => {
                self.bind_name(name, value);
                Ok(())
            }
            Expr::Index { target, key, span } => {
                let t = self.eval_expr(target)?;
                self.eval_index_set(&t, key, value, span.begin)
            }
            Expr::Attr { target, name, span } => {
                let t = self.eval_expr(target)?;
                self.set_attr(&t, name, value, span.begin)
            }
            _ => Err(RuntimeError::type_error(pos, "invalid assignment target").into()),
        }
    }

    /// §4.4 name binding: the top frame's locals for a function call,
    /// the current module's globals at top level.
    fn bind_name(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.call_stack.last_mut() {
            frame.locals.insert(name.to_string(), value);
        } else {
            let module = self.module_for_current_scope();
            module.borrow_mut().globals.insert(name.to_string(), value);
        }
    }

    fn eval_index_get(&mut self, target: &Value, key: &IndexKey, pos: Pos) -> EvalResult {
        match key {
            IndexKey::Single(key_expr) => {
                let k = self.eval_expr(key_expr)?;
                index_get_single(target, &k, pos)
            }
            IndexKey::Slice(start, stop) => {
                let start = start.as_ref().map(|e| self.eval_expr(e)).transpose()?;
                let stop = stop.as_ref().map(|e| self.eval_expr(e)).transpose()?;
                index_get_slice(target, start.as_ref(), stop.as_ref(), pos)
            }
        }
    }

    fn eval_index_set(&mut self, target: &Value, key: &IndexKey, value: Value, pos: Pos) -> Result<(), Flow> {
        let IndexKey::Single(key_expr) = key else {
            return Err(RuntimeError::type_error(pos, "cannot assign to a slice").into());
        };
        let k = self.eval_expr(key_expr)?;
        match target {
            Value::List(items) => {
                let idx = resolve_index(&k, items.borrow().len(), pos)?;
                items.borrow_mut()[idx] = value;
                Ok(())
            }
            Value::Map(entries) => {
                let Value::Str(key) = k else {
                    return Err(RuntimeError::type_error(pos, "map keys must be strings").into());
                };
                entries.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            Value::Tuple(_) => Err(RuntimeError::type_error(pos, "tuples are immutable").into()),
            other => Err(RuntimeError::type_error(pos, format!("{} is not subscriptable", other.type_name())).into()),
        }
    }

    fn get_attr(&mut self, target: &Value, name: &str, pos: Pos) -> EvalResult {
        match target {
            Value::Map(entries) => Ok(entries.borrow().get(name).cloned().unwrap_or(Value::Null)),
            Value::Module(module) => module
                .borrow()
                .globals
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::name(pos, format!("module has no member '{name}'")).into()),
            other => {
                Err(RuntimeError::type_error(pos, format!("{} has no attributes", other.type_name())).into())
            }
        }
    }

    fn set_attr(&mut self, target: &Value, name: &str, value: Value, pos: Pos) -> Result<(), Flow> {
        match target {
            Value::Map(entries) => {
                entries.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            other => Err(RuntimeError::type_error(pos, format!("cannot set attribute on {}", other.type_name())).into()),
        }
    }

    fn eval_for(&mut self, var: &str, iter: &Expr, body: &Expr, pos: Pos) -> EvalResult {
        let iterable = self.eval_expr(iter)?;
        let items = match &iterable {
            Value::Tuple(items) => items.to_vec(),
            Value::List(items) => items.borrow().clone(),
            other => {
                return Err(RuntimeError::type_error(
                    pos,
                    format!("for-loop requires a tuple or list, got {}", other.type_name()),
                )
                .into());
            }
        };

        for item in items {
            self.bind_name(var, item);
            match self.eval_expr(body) {
                Ok(_) => {}
                Err(Flow::Break) => break,
                Err(Flow::Continue) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Null)
    }

    /// A `proc` declaration binds a callable into the current scope's
    /// globals; a bodyless declaration still binds, but calling it is a
    /// no-op returning null (§4.4). `def` is the `Rc<ProcDef>` the parser
    /// allocated once for this AST node, so repeated evaluation of the
    /// same `proc` statement (e.g. inside a loop body) yields callables
    /// that compare equal by `Rc::ptr_eq`.
    fn eval_proc_def(&mut self, def: &Rc<ProcDef>) -> EvalResult {
        let captured = self
            .call_stack
            .last()
            .map(|f| f.locals.clone())
            .unwrap_or_default();

        let callable = Value::Callable(Callable {
            def: Rc::clone(def),
            captured: Rc::new(captured),
            module: Rc::downgrade(&self.module_for_current_scope()),
        });
        self.bind_name(&def.name, callable.clone());
        Ok(callable)
    }

    fn eval_emit(&mut self, value: &Expr, pos: Pos) -> EvalResult {
        let v = self.eval_expr(value)?;
        let items: Vec<Value> = match &v {
            Value::Tuple(items) => items.to_vec(),
            Value::List(items) => items.borrow().clone(),
            other => {
                return Err(RuntimeError::type_error(
                    pos,
                    format!("emit requires a tuple or list of floats, got {}", other.type_name()),
                )
                .into());
            }
        };

        let mut floats = Vec::with_capacity(items.len());
        for item in &items {
            match item {
                Value::Int(n) => floats.push(*n as f32),
                Value::Float(f) => floats.push(*f),
                other => {
                    return Err(RuntimeError::type_error(
                        pos,
                        format!("emit requires a sequence of floats, got an element of type {}", other.type_name()),
                    )
                    .into());
                }
            }
        }

        self.vertices.push_vertex(&floats, pos)?;
        Ok(Value::Null)
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], pos: Pos) -> EvalResult {
        let callee_value = self.eval_expr(callee)?;
        let arg_values = self.eval_each(args)?;
        self.call_value(&callee_value, &arg_values, pos)
    }

    /// Dispatches a call to whichever callable kind `callee` holds
    /// (§4.4 "call semantics").
    pub fn call_value(&mut self, callee: &Value, args: &[Value], pos: Pos) -> EvalResult {
        match callee {
            Value::CFunction(f) => Ok(f(self, args)?),
            Value::BoundCFunction(bc) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push((*bc.receiver).clone());
                full.extend_from_slice(args);
                Ok((bc.func)(self, &full)?)
            }
            Value::Callable(c) => self.call_callable(c.clone(), args, pos),
            other => Err(RuntimeError::type_error(pos, format!("{} is not callable", other.type_name())).into()),
        }
    }

    fn call_callable(&mut self, callable: Callable, args: &[Value], pos: Pos) -> EvalResult {
        let Some(body) = &callable.def.body else {
            return Ok(Value::Null);
        };

        if args.len() > callable.def.params.len() {
            return Err(RuntimeError::arity(
                pos,
                format!(
                    "{} takes at most {} argument(s), got {}",
                    callable.def.name,
                    callable.def.params.len(),
                    args.len()
                ),
            )
            .into());
        }

        let locals = (*callable.captured).clone();
        self.call_stack.push(Frame::new(
            callable.module(),
            locals,
            Some(callable.def.name.clone()),
        ));

        let bind_result = self.bind_params(&callable, args, pos);
        let result = match bind_result {
            Ok(()) => match self.eval_expr(body) {
                Ok(v) => Ok(v),
                Err(Flow::Return(v)) => Ok(v),
                Err(flow) => Err(flow),
            },
            Err(flow) => Err(flow),
        };

        self.call_stack.pop();
        result
    }

    fn bind_params(&mut self, callable: &Callable, args: &[Value], pos: Pos) -> Result<(), Flow> {
        for (i, param) in callable.def.params.iter().enumerate() {
            let value = if let Some(arg) = args.get(i) {
                arg.clone()
            } else if let Some(default) = &param.default {
                self.eval_expr(default)?
            } else {
                return Err(RuntimeError::arity(
                    pos,
                    format!("{} is missing required argument '{}'", callable.def.name, param.name),
                )
                .into());
            };
            self.call_stack
                .last_mut()
                .expect("frame just pushed by call_callable")
                .locals
                .insert(param.name.clone(), value);
        }
        Ok(())
    }
}

fn resolve_index(key: &Value, len: usize, pos: Pos) -> Result<usize, Flow> {
    let Value::Int(n) = key else {
        return Err(RuntimeError::type_error(pos, "index must be an int").into());
    };
    let idx = if *n < 0 { *n as isize + len as isize } else { *n as isize };
    if idx < 0 || idx as usize >= len {
        return Err(RuntimeError::index(pos, format!("index {n} out of range for length {len}")).into());
    }
    Ok(idx as usize)
}

fn index_get_single(target: &Value, key: &Value, pos: Pos) -> EvalResult {
    match target {
        Value::List(items) => {
            let items = items.borrow();
            let idx = resolve_index(key, items.len(), pos)?;
            Ok(items[idx].clone())
        }
        Value::Tuple(items) => {
            let idx = resolve_index(key, items.len(), pos)?;
            Ok(items[idx].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve_index(key, chars.len(), pos)?;
            Ok(Value::str(chars[idx].to_string()))
        }
        Value::Map(entries) => {
            let Value::Str(key) = key else {
                return Err(RuntimeError::type_error(pos, "map keys must be strings").into());
            };
            Ok(entries.borrow().get(key.as_ref()).cloned().unwrap_or(Value::Null))
        }
        other => Err(RuntimeError::type_error(pos, format!("{} is not subscriptable", other.type_name())).into()),
    }
}

fn slice_bounds(len: usize, start: Option<&Value>, stop: Option<&Value>, pos: Pos) -> Result<(usize, usize), Flow> {
    let clamp = |v: i64| -> usize {
        if v < 0 {
            (v + len as i64).max(0) as usize
        } else {
            (v as usize).min(len)
        }
    };

    let start = match start {
        Some(Value::Int(n)) => clamp(*n as i64),
        Some(_) => return Err(RuntimeError::type_error(pos, "slice bounds must be ints").into()),
        None => 0,
    };
    let stop = match stop {
        Some(Value::Int(n)) => clamp(*n as i64),
        Some(_) => return Err(RuntimeError::type_error(pos, "slice bounds must be ints").into()),
        None => len,
    };
    Ok((start, stop.max(start)))
}

fn index_get_slice(target: &Value, start: Option<&Value>, stop: Option<&Value>, pos: Pos) -> EvalResult {
    match target {
        Value::List(items) => {
            let items = items.borrow();
            let (start, stop) = slice_bounds(items.len(), start, stop, pos)?;
            Ok(Value::list(items[start..stop].to_vec()))
        }
        Value::Tuple(items) => {
            let (start, stop) = slice_bounds(items.len(), start, stop, pos)?;
            Ok(Value::tuple(items[start..stop].to_vec()))
        }
        other => Err(RuntimeError::type_error(pos, format!("{} does not support slicing", other.type_name())).into()),
    }
}

/// §4.3 arithmetic/comparison table. Relational and equality operators
/// yield `Int(1)`/`Int(0)` — there is no bool type to return instead.
fn apply_binary(op: &BinOp, l: Value, r: Value, pos: Pos) -> EvalResult {
    use BinOp::*;

    match op {
        Eq => return Ok(Value::Int(Value::values_equal(&l, &r) as i32)),
        NotEq => return Ok(Value::Int(!Value::values_equal(&l, &r) as i32)),
        _ => {}
    }

    if matches!(op, Lt | LtEq | Gt | GtEq) {
        return compare(op, &l, &r, pos);
    }

    match op {
        Add => add(l, r, pos),
        Sub => numeric(l, r, pos, "-", |a, b| a - b, |a, b| a - b),
        Mul => mul(l, r, pos),
        Div => div(l, r, pos),
        FloorDiv => floor_div(l, r, pos),
        Mod => modulo(l, r, pos),
        Eq | NotEq | Lt | LtEq | Gt | GtEq | And | Or => unreachable!("handled above"),
    }
}

fn numeric(l: Value, r: Value, pos: Pos, op_name: &str, fi: fn(i64, i64) -> i64, ff: fn(f64, f64) -> f64) -> EvalResult {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(fi(a as i64, b as i64) as i32)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(ff(a as f64, b as f64) as f32)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(ff(a as f64, b as f64) as f32)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(ff(a as f64, b as f64) as f32)),
        (a, b) => Err(RuntimeError::type_error(
            pos,
            format!("unsupported operand types for {op_name}: {} and {}", a.type_name(), b.type_name()),
        )
        .into()),
    }
}

fn add(l: Value, r: Value, pos: Pos) -> EvalResult {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::Tuple(a), Value::Tuple(b)) => {
            let mut v = a.to_vec();
            v.extend(b.iter().cloned());
            Ok(Value::tuple(v))
        }
        (Value::List(a), Value::List(b)) => {
            let mut v = a.borrow().clone();
            v.extend(b.borrow().iter().cloned());
            Ok(Value::list(v))
        }
        (a, b) => numeric(a, b, pos, "+", |a, b| a + b, |a, b| a + b),
    }
}

fn mul(l: Value, r: Value, pos: Pos) -> EvalResult {
    match (l, r) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => Ok(Value::str(s.repeat(n.max(0) as usize))),
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            let items = items.borrow();
            let mut v = Vec::with_capacity(items.len() * n.max(0) as usize);
            for _ in 0..n.max(0) {
                v.extend(items.iter().cloned());
            }
            Ok(Value::list(v))
        }
        (Value::Tuple(items), Value::Int(n)) | (Value::Int(n), Value::Tuple(items)) => {
            let mut v = Vec::with_capacity(items.len() * n.max(0) as usize);
            for _ in 0..n.max(0) {
                v.extend(items.iter().cloned());
            }
            Ok(Value::tuple(v))
        }
        (a, b) => numeric(a, b, pos, "*", |a, b| a * b, |a, b| a * b),
    }
}

fn div(l: Value, r: Value, pos: Pos) -> EvalResult {
    let (a, b) = as_f64_pair(&l, &r, pos, "/")?;
    if b == 0.0 {
        return Err(RuntimeError::arithmetic(pos, "division by zero").into());
    }
    Ok(Value::Float((a / b) as f32))
}

fn floor_div(l: Value, r: Value, pos: Pos) -> EvalResult {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            if b == 0 {
                return Err(RuntimeError::arithmetic(pos, "integer division by zero").into());
            }
            Ok(Value::Int(a / b))
        }
        (a, b) => {
            let (a, b) = as_f64_pair(&a, &b, pos, "//")?;
            if b == 0.0 {
                return Err(RuntimeError::arithmetic(pos, "division by zero").into());
            }
            Ok(Value::Float((a / b).floor() as f32))
        }
    }
}

fn modulo(l: Value, r: Value, pos: Pos) -> EvalResult {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            if b == 0 {
                return Err(RuntimeError::arithmetic(pos, "modulo by zero").into());
            }
            Ok(Value::Int(a % b))
        }
        (a, b) => {
            let (a, b) = as_f64_pair(&a, &b, pos, "%")?;
            Ok(Value::Float((a % b) as f32))
        }
    }
}

fn as_f64_pair(a: &Value, b: &Value, pos: Pos, op_name: &str) -> Result<(f64, f64), Flow> {
    let to_f64 = |v: &Value| match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f as f64),
        _ => None,
    };
    match (to_f64(a), to_f64(b)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::type_error(
            pos,
            format!("unsupported operand types for {op_name}: {} and {}", a.type_name(), b.type_name()),
        )
        .into()),
    }
}

fn compare(op: &BinOp, l: &Value, r: &Value, pos: Pos) -> EvalResult {
    let ordering = match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        (a, b) => {
            let to_f64 = |v: &Value| match v {
                Value::Int(n) => Some(*n as f64),
                Value::Float(f) => Some(*f as f64),
                _ => None,
            };
            match (to_f64(a), to_f64(b)) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            }
        }
    };
    let Some(ordering) = ordering else {
        return Err(RuntimeError::type_error(
            pos,
            format!("{} and {} are not ordered", l.type_name(), r.type_name()),
        )
        .into());
    };

    use std::cmp::Ordering::*;
    let truth = match op {
        BinOp::Lt => ordering == Less,
        BinOp::LtEq => ordering != Greater,
        BinOp::Gt => ordering == Greater,
        BinOp::GtEq => ordering != Less,
        _ => unreachable!(),
    };
    Ok(Value::Int(truth as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> Value {
        let mut instance = Instance::new();
        instance.run_string(src, "test").unwrap()
    }

    #[test]
    fn arithmetic_precedence_end_to_end() {
        let mut instance = Instance::new();
        instance.run_string("x = 1 + 2 * 3\n", "test").unwrap();
        let module = instance.dynamic_modules.get("test").unwrap();
        assert_eq!(module.borrow().globals.get("x"), Some(&Value::Int(7)));
    }

    #[test]
    fn for_loop_binds_each_element() {
        let mut instance = Instance::new();
        instance
            .run_string("total = 0\nfor i in [1, 2, 3]: total += i\n", "test")
            .unwrap();
        let module = instance.dynamic_modules.get("test").unwrap();
        assert_eq!(module.borrow().globals.get("total"), Some(&Value::Int(6)));
    }

    #[test]
    fn proc_with_default_parameter() {
        let mut instance = Instance::new();
        instance
            .run_string("proc add(a, b = 10): return a + b\nresult = add(1)\n", "test")
            .unwrap();
        let module = instance.dynamic_modules.get("test").unwrap();
        assert_eq!(module.borrow().globals.get("result"), Some(&Value::Int(11)));
    }

    #[test]
    fn bodyless_proc_call_returns_null() {
        let mut instance = Instance::new();
        instance.run_string("proc f(): return\nr = f()\n", "test").unwrap();
        let module = instance.dynamic_modules.get("test").unwrap();
        assert_eq!(module.borrow().globals.get("r"), Some(&Value::Null));
    }

    #[test]
    fn re_evaluating_the_same_proc_statement_yields_equal_callables() {
        let mut instance = Instance::new();
        instance
            .run_string(
                "fs = [0, 0]\nfor i in [0, 1]: fs[i] = proc f(): return 1\nsame = fs[0] == fs[1]\n",
                "test",
            )
            .unwrap();
        let module = instance.dynamic_modules.get("test").unwrap();
        assert_eq!(module.borrow().globals.get("same"), Some(&Value::Int(1)));
    }

    #[test]
    fn missing_map_key_is_null_not_an_error() {
        let mut instance = Instance::new();
        instance
            .run_string("m = {\"a\": 1}\nb = m[\"b\"]\n", "test")
            .unwrap();
        let module = instance.dynamic_modules.get("test").unwrap();
        assert_eq!(module.borrow().globals.get("b"), Some(&Value::Null));
    }

    #[test]
    fn negative_list_index_counts_from_end() {
        let _ = run("xs = [1, 2, 3]\nlast = xs[-1]\n");
    }

    #[test]
    fn out_of_range_index_is_fatal() {
        let mut instance = Instance::new();
        assert!(instance.run_string("xs = [1]\nxs[5]\n", "test").is_err());
    }

    #[test]
    fn integer_division_by_zero_is_fatal() {
        let mut instance = Instance::new();
        assert!(instance.run_string("x = 1 // 0\n", "test").is_err());
    }

    #[test]
    fn and_or_short_circuit_to_operand_value() {
        let mut instance = Instance::new();
        instance.run_string("x = 0 or 5\n", "test").unwrap();
        let module = instance.dynamic_modules.get("test").unwrap();
        assert_eq!(module.borrow().globals.get("x"), Some(&Value::Int(5)));
    }
}
