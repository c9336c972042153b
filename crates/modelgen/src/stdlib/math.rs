//! The `math` static module: a small illustrative set of numeric
//! helpers, restored from the original's `mgCreateMathLib` (the spec
//! names `math` without enumerating its members).

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::instance::Instance;
use crate::token::Pos;
use crate::value::Value;

fn as_f64(v: &Value, pos: Pos, fn_name: &str) -> Result<f64, RuntimeError> {
    match v {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f as f64),
        other => Err(RuntimeError::type_error(
            pos,
            format!("{fn_name} expects a number, got {}", other.type_name()),
        )),
    }
}

fn one_arg<'a>(args: &'a [Value], fn_name: &str) -> Result<&'a Value, RuntimeError> {
    args.first()
        .ok_or_else(|| RuntimeError::arity(Pos::START, format!("{fn_name} takes exactly one argument")))
}

fn sqrt(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let x = as_f64(one_arg(args, "sqrt")?, Pos::START, "sqrt")?;
    Ok(Value::Float(x.sqrt() as f32))
}

fn sin(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let x = as_f64(one_arg(args, "sin")?, Pos::START, "sin")?;
    Ok(Value::Float(x.sin() as f32))
}

fn cos(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let x = as_f64(one_arg(args, "cos")?, Pos::START, "cos")?;
    Ok(Value::Float(x.cos() as f32))
}

fn tan(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let x = as_f64(one_arg(args, "tan")?, Pos::START, "tan")?;
    Ok(Value::Float(x.tan() as f32))
}

fn floor(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let x = as_f64(one_arg(args, "floor")?, Pos::START, "floor")?;
    Ok(Value::Int(x.floor() as i32))
}

fn ceil(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    let x = as_f64(one_arg(args, "ceil")?, Pos::START, "ceil")?;
    Ok(Value::Int(x.ceil() as i32))
}

fn abs(_instance: &mut Instance, args: &[Value]) -> Result<Value, RuntimeError> {
    match one_arg(args, "abs")? {
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(RuntimeError::type_error(
            Pos::START,
            format!("abs expects a number, got {}", other.type_name()),
        )),
    }
}

pub fn globals() -> IndexMap<String, Value> {
    let mut g = IndexMap::new();
    g.insert("pi".to_string(), Value::Float(std::f32::consts::PI));
    g.insert("sqrt".to_string(), Value::CFunction(sqrt));
    g.insert("sin".to_string(), Value::CFunction(sin));
    g.insert("cos".to_string(), Value::CFunction(cos));
    g.insert("tan".to_string(), Value::CFunction(tan));
    g.insert("floor".to_string(), Value::CFunction(floor));
    g.insert("ceil".to_string(), Value::CFunction(ceil));
    g.insert("abs".to_string(), Value::CFunction(abs));
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sqrt_of_four_is_two() {
        let mut instance = Instance::new();
        let result = sqrt(&mut instance, &[Value::Int(4)]).unwrap();
        assert_eq!(result, Value::Float(2.0));
    }
}
