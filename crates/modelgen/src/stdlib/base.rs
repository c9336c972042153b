//! The `base` static module: the prelude available to every scope
//! (§4.5). `print`/`range`/`len`/`type`/`__import` are the illustrative
//! core the spec calls out explicitly; the rest of the list
//! (`int`/`float`/`string`/`bool` converters, `copy`/`deep_copy`,
//! `globals`/`locals`, the `enumerate`/`zip`/`map`/`filter`/`reduce`/
//! `any`/`all` family, `traceback`, `__eval`) is restored from the
//! original's `baselib.c` registration list.

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::frame::Flow;
use crate::instance::Instance;
use crate::token::Pos;
use crate::value::Value;

fn flow_to_runtime_error(flow: Flow) -> RuntimeError {
    match flow {
        Flow::Error(e) => e,
        Flow::Return(_) | Flow::Break | Flow::Continue => {
            RuntimeError::type_error(Pos::START, "break/continue/return used outside of a loop or procedure")
        }
    }
}

fn print(instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let rendered: Vec<String> = args.iter().map(Value::to_display_string).collect();
    instance.print_sink.write_line(&rendered.join(" "));
    Ok(Value::Null)
}

enum RangeArg {
    Int(i64),
    Float(f64),
}

impl RangeArg {
    fn from_value(v: &Value, pos: Pos) -> Result<Self, RuntimeError> {
        match v {
            Value::Int(n) => Ok(RangeArg::Int(*n as i64)),
            Value::Float(f) => Ok(RangeArg::Float(*f as f64)),
            other => Err(RuntimeError::type_error(
                pos,
                format!("range expects int or float arguments, got {}", other.type_name()),
            )),
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            RangeArg::Int(n) => *n as f64,
            RangeArg::Float(f) => *f,
        }
    }

    fn is_float(&self) -> bool {
        matches!(self, RangeArg::Float(_))
    }
}

/// §4.4 "range node": argument-shape rules restored from the
/// original's `mg_range`/`_mg_rangei`, with one deliberate deviation —
/// the spec text is explicit that step 0 is a fatal error, where the
/// original silently normalized the sign instead.
fn range(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    let (start, stop, step) = match args.len() {
        1 => (RangeArg::Int(0), RangeArg::from_value(&args[0], pos)?, RangeArg::Int(1)),
        2 => (
            RangeArg::from_value(&args[0], pos)?,
            RangeArg::from_value(&args[1], pos)?,
            RangeArg::Int(1),
        ),
        3 => (
            RangeArg::from_value(&args[0], pos)?,
            RangeArg::from_value(&args[1], pos)?,
            RangeArg::from_value(&args[2], pos)?,
        ),
        _ => return Err(RuntimeError::arity(pos, "range takes 1 to 3 arguments")),
    };

    let is_float = start.is_float() || stop.is_float() || step.is_float();
    let (start, stop, step) = (start.as_f64(), stop.as_f64(), step.as_f64());

    if step == 0.0 {
        return Err(RuntimeError::arithmetic(pos, "range step must not be zero"));
    }
    if (step > 0.0) != (stop - start > 0.0) {
        return Ok(Value::list(Vec::new()));
    }

    let mut items = Vec::new();
    let mut x = start;
    while (step > 0.0 && x < stop) || (step < 0.0 && x > stop) {
        items.push(if is_float { Value::Float(x as f32) } else { Value::Int(x as i32) });
        x += step;
    }
    Ok(Value::list(items))
}

fn len(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    let v = args.first().ok_or_else(|| RuntimeError::arity(pos, "len takes exactly one argument"))?;
    let n = match v {
        Value::Str(s) => s.chars().count(),
        Value::Tuple(items) => items.len(),
        Value::List(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        other => return Err(RuntimeError::type_error(pos, format!("{} has no length", other.type_name()))),
    };
    Ok(Value::Int(n as i32))
}

fn type_of(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let v = args
        .first()
        .ok_or_else(|| RuntimeError::arity(Pos::START, "type takes exactly one argument"))?;
    Ok(Value::str(v.type_name()))
}

fn bool_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let v = args
        .first()
        .ok_or_else(|| RuntimeError::arity(Pos::START, "bool takes exactly one argument"))?;
    Ok(Value::Int(v.is_truthy() as i32))
}

fn int_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    match args.first() {
        Some(Value::Int(n)) => Ok(Value::Int(*n)),
        Some(Value::Float(f)) => Ok(Value::Int(*f as i32)),
        Some(Value::Str(s)) => s
            .trim()
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|_| RuntimeError::type_error(pos, format!("cannot convert '{s}' to int"))),
        _ => Err(RuntimeError::arity(pos, "int takes exactly one argument")),
    }
}

fn float_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    match args.first() {
        Some(Value::Int(n)) => Ok(Value::Float(*n as f32)),
        Some(Value::Float(f)) => Ok(Value::Float(*f)),
        Some(Value::Str(s)) => s
            .trim()
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| RuntimeError::type_error(pos, format!("cannot convert '{s}' to float"))),
        _ => Err(RuntimeError::arity(pos, "float takes exactly one argument")),
    }
}

fn string_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let v = args
        .first()
        .ok_or_else(|| RuntimeError::arity(Pos::START, "string takes exactly one argument"))?;
    Ok(Value::str(v.to_display_string()))
}

fn copy_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let v = args
        .first()
        .ok_or_else(|| RuntimeError::arity(Pos::START, "copy takes exactly one argument"))?;
    Ok(v.shallow_copy())
}

fn deep_copy_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let v = args
        .first()
        .ok_or_else(|| RuntimeError::arity(Pos::START, "deep_copy takes exactly one argument"))?;
    Ok(v.deep_copy())
}

/// Pulls a `Vec<Value>` out of a tuple or list argument, the shape
/// every sequence-consuming builtin below accepts.
fn sequence_items(v: &Value, fn_name: &str, pos: Pos) -> Result<Vec<Value>, RuntimeError> {
    match v {
        Value::Tuple(items) => Ok(items.to_vec()),
        Value::List(items) => Ok(items.borrow().clone()),
        other => Err(RuntimeError::type_error(
            pos,
            format!("{fn_name} expects a tuple or list, got {}", other.type_name()),
        )),
    }
}

fn enumerate_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    let v = args
        .first()
        .ok_or_else(|| RuntimeError::arity(pos, "enumerate takes exactly one argument"))?;
    let items = sequence_items(v, "enumerate", pos)?;
    let pairs = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| Value::tuple(vec![Value::Int(i as i32), item]))
        .collect();
    Ok(Value::list(pairs))
}

fn zip_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    let sequences: Vec<Vec<Value>> = args
        .iter()
        .map(|v| sequence_items(v, "zip", pos))
        .collect::<Result<_, _>>()?;
    let min_len = sequences.iter().map(Vec::len).min().unwrap_or(0);
    let mut rows = Vec::with_capacity(min_len);
    for i in 0..min_len {
        let row: Vec<Value> = sequences.iter().map(|seq| seq[i].clone()).collect();
        rows.push(Value::tuple(row));
    }
    Ok(Value::list(rows))
}

fn map_fn(instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    if args.len() != 2 {
        return Err(RuntimeError::arity(pos, "map takes exactly two arguments"));
    }
    let items = sequence_items(&args[1], "map", pos)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(
            instance
                .call_value(&args[0], &[item], pos)
                .map_err(flow_to_runtime_error)?,
        );
    }
    Ok(Value::list(out))
}

fn filter_fn(instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    if args.len() != 2 {
        return Err(RuntimeError::arity(pos, "filter takes exactly two arguments"));
    }
    let items = sequence_items(&args[1], "filter", pos)?;
    let mut out = Vec::new();
    for item in items {
        let keep = instance
            .call_value(&args[0], &[item.clone()], pos)
            .map_err(flow_to_runtime_error)?;
        if keep.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

fn reduce_fn(instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    if args.len() != 2 && args.len() != 3 {
        return Err(RuntimeError::arity(pos, "reduce takes two or three arguments"));
    }
    let items = sequence_items(&args[1], "reduce", pos)?;
    let mut iter = items.into_iter();
    let mut acc = if let Some(initial) = args.get(2) {
        initial.clone()
    } else {
        iter.next()
            .ok_or_else(|| RuntimeError::type_error(pos, "reduce of an empty sequence with no initial value"))?
    };
    for item in iter {
        acc = instance
            .call_value(&args[0], &[acc, item], pos)
            .map_err(flow_to_runtime_error)?;
    }
    Ok(acc)
}

fn any_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    let v = args.first().ok_or_else(|| RuntimeError::arity(pos, "any takes exactly one argument"))?;
    let items = sequence_items(v, "any", pos)?;
    Ok(Value::Int(items.iter().any(Value::is_truthy) as i32))
}

fn all_fn(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    let v = args.first().ok_or_else(|| RuntimeError::arity(pos, "all takes exactly one argument"))?;
    let items = sequence_items(v, "all", pos)?;
    Ok(Value::Int(items.iter().all(Value::is_truthy) as i32))
}

fn globals_fn(instance: &mut Instance, _args: &[Value]) -> Result<Value, RuntimeError> {
    let module = instance.module_for_current_scope();
    Ok(Value::map(module.borrow().globals.clone()))
}

fn locals_fn(instance: &mut Instance, _args: &[Value]) -> Result<Value, RuntimeError> {
    match instance.call_stack.last() {
        Some(frame) => Ok(Value::map(frame.locals.clone())),
        None => Ok(Value::map(IndexMap::new())),
    }
}

fn traceback_fn(instance: &mut Instance, _args: &[Value]) -> Result<Value, RuntimeError> {
    let frames = instance
        .call_stack
        .iter()
        .map(|f| Value::str(f.caller_name.clone().unwrap_or_else(|| "<module>".to_string())))
        .collect();
    Ok(Value::list(frames))
}

fn import_fn(instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    let Some(Value::Str(name)) = args.first() else {
        return Err(RuntimeError::type_error(pos, "__import expects a string module name"));
    };
    instance.import_module(name).map_err(|e| match e {
        crate::error::FatalError::Runtime(e) => e,
        crate::error::FatalError::Parse(e) => RuntimeError::type_error(pos, e.to_string()),
        crate::error::FatalError::Io(msg) => RuntimeError::io(pos, msg),
    })
}

fn eval_fn(instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let pos = Pos::START;
    let Some(Value::Str(source)) = args.first() else {
        return Err(RuntimeError::type_error(pos, "__eval expects a string of source"));
    };
    let current_filename = instance.module_for_current_scope().borrow().filename.clone().unwrap_or_default();
    let ast = crate::parser::parse(source)
        .map_err(|e| RuntimeError::type_error(pos, e.with_filename(current_filename).to_string()))?;
    let mut last = Value::Null;
    for expr in &ast.body {
        last = instance.eval_expr(expr).map_err(flow_to_runtime_error)?;
    }
    Ok(last)
}

pub fn globals() -> IndexMap<String, Value> {
    let mut g = IndexMap::new();
    g.insert("print".to_string(), Value::CFunction(print));
    g.insert("range".to_string(), Value::CFunction(range));
    g.insert("len".to_string(), Value::CFunction(len));
    g.insert("type".to_string(), Value::CFunction(type_of));
    g.insert("bool".to_string(), Value::CFunction(bool_fn));
    g.insert("int".to_string(), Value::CFunction(int_fn));
    g.insert("float".to_string(), Value::CFunction(float_fn));
    g.insert("string".to_string(), Value::CFunction(string_fn));
    g.insert("copy".to_string(), Value::CFunction(copy_fn));
    g.insert("deep_copy".to_string(), Value::CFunction(deep_copy_fn));
    g.insert("enumerate".to_string(), Value::CFunction(enumerate_fn));
    g.insert("zip".to_string(), Value::CFunction(zip_fn));
    g.insert("map".to_string(), Value::CFunction(map_fn));
    g.insert("filter".to_string(), Value::CFunction(filter_fn));
    g.insert("reduce".to_string(), Value::CFunction(reduce_fn));
    g.insert("any".to_string(), Value::CFunction(any_fn));
    g.insert("all".to_string(), Value::CFunction(all_fn));
    g.insert("globals".to_string(), Value::CFunction(globals_fn));
    g.insert("locals".to_string(), Value::CFunction(locals_fn));
    g.insert("traceback".to_string(), Value::CFunction(traceback_fn));
    g.insert("__import".to_string(), Value::CFunction(import_fn));
    g.insert("__eval".to_string(), Value::CFunction(eval_fn));
    g.insert("true".to_string(), Value::Int(1));
    g.insert("false".to_string(), Value::Int(0));
    g.insert(
        "version".to_string(),
        Value::tuple(vec![Value::Int(0), Value::Int(1), Value::Int(0)]),
    );
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn range_one_arg_is_zero_to_stop() {
        let mut instance = Instance::new();
        let result = range(&mut instance, &[Value::Int(3)]).unwrap();
        assert_eq!(result, Value::list(vec![Value::Int(0), Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn range_step_zero_is_fatal() {
        let mut instance = Instance::new();
        assert!(range(&mut instance, &[Value::Int(0), Value::Int(5), Value::Int(0)]).is_err());
    }

    #[test]
    fn range_sign_mismatch_is_empty() {
        let mut instance = Instance::new();
        let result = range(&mut instance, &[Value::Int(0), Value::Int(5), Value::Int(-1)]).unwrap();
        assert_eq!(result, Value::list(Vec::new()));
    }

    #[test]
    fn enumerate_pairs_index_with_value() {
        let mut instance = Instance::new();
        let result = enumerate_fn(&mut instance, &[Value::list(vec![Value::str("a"), Value::str("b")])]).unwrap();
        assert_eq!(
            result,
            Value::list(vec![
                Value::tuple(vec![Value::Int(0), Value::str("a")]),
                Value::tuple(vec![Value::Int(1), Value::str("b")]),
            ])
        );
    }

    #[test]
    fn zip_truncates_to_shortest() {
        let mut instance = Instance::new();
        let a = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let b = Value::list(vec![Value::str("x"), Value::str("y")]);
        let result = zip_fn(&mut instance, &[a, b]).unwrap();
        assert_eq!(
            result,
            Value::list(vec![
                Value::tuple(vec![Value::Int(1), Value::str("x")]),
                Value::tuple(vec![Value::Int(2), Value::str("y")]),
            ])
        );
    }
}
