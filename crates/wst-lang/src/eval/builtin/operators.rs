use std::cmp::Ordering;

use super::{C, V, as_closure, fixed, into_values, invalid_types, variadic};
use crate::ast::constants::{AND, DIV, EQ, GT, GT_EQ, IS_NOT_NIL, LT, LT_EQ, MUL, NEQ, NOT, OR, SUB, SUM};
use crate::eval::Evaluator;
use crate::eval::closure::RuntimeValue;
use crate::eval::error::EvalError;
use crate::eval::registry::Callable;
use crate::number::Number;
use crate::value::{Primitive, Value};

const IS_NIL: &str = "isNil";
const FLOOR: &str = "floor";

pub(super) fn functions() -> Vec<Callable> {
    vec![
        variadic(SUM, &[V], sum),
        fixed(SUB, &[V, V], sub),
        fixed(MUL, &[V, V], mul),
        fixed(DIV, &[V, V], div),
        fixed(EQ, &[V, V], eq),
        fixed(NEQ, &[V, V], neq),
        fixed(GT, &[V, V], gt),
        fixed(GT_EQ, &[V, V], gt_eq),
        fixed(LT, &[V, V], lt),
        fixed(LT_EQ, &[V, V], lt_eq),
        fixed(NOT, &[V], not),
        variadic(AND, &[C], and),
        variadic(OR, &[C], or),
        fixed(IS_NIL, &[V], is_nil),
        fixed(IS_NOT_NIL, &[V], is_not_nil),
        fixed(FLOOR, &[V], floor),
    ]
}

/// Adds numbers, or concatenates once any operand is a string. Null
/// concatenates as the empty string.
fn sum(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let values = into_values(SUM, args)?;

    if values.iter().any(|v| v.as_str().is_some()) {
        let concatenated = values
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                Value::Primitive(p) => p.to_string(),
                other => other.to_string(),
            })
            .collect::<String>();
        return Ok(concatenated.into());
    }

    values
        .iter()
        .try_fold(Number::ZERO, |total, v| match v {
            Value::Primitive(Primitive::Num(n)) => Ok(total + *n),
            _ => Err(invalid_types(SUM, &values)),
        })
        .map(Value::from)
}

fn numbers(name: &str, args: Vec<RuntimeValue>) -> Result<(Number, Number), EvalError> {
    let values = into_values(name, args)?;
    match values.as_slice() {
        [Value::Primitive(Primitive::Num(a)), Value::Primitive(Primitive::Num(b))] => Ok((*a, *b)),
        _ => Err(invalid_types(name, &values)),
    }
}

fn sub(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let (a, b) = numbers(SUB, args)?;
    Ok((a - b).into())
}

fn mul(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let (a, b) = numbers(MUL, args)?;
    Ok((a * b).into())
}

fn div(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let (a, b) = numbers(DIV, args)?;
    if b.is_zero() {
        return Err(EvalError::ZeroDivision);
    }
    Ok((a / b).into())
}

fn pair(name: &str, args: Vec<RuntimeValue>) -> Result<(Value, Value), EvalError> {
    let mut values = into_values(name, args)?.into_iter();
    match (values.next(), values.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EvalError::Internal(format!("\"{}\" expects two operands", name))),
    }
}

fn eq(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let (a, b) = pair(EQ, args)?;
    Ok((a == b).into())
}

fn neq(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let (a, b) = pair(NEQ, args)?;
    Ok((a != b).into())
}

/// Orders two numbers or two strings.
fn compare(name: &str, args: Vec<RuntimeValue>) -> Result<Ordering, EvalError> {
    let (a, b) = pair(name, args)?;
    match (&a, &b) {
        (Value::Primitive(Primitive::Num(x)), Value::Primitive(Primitive::Num(y))) => Ok(x.cmp(y)),
        (Value::Primitive(Primitive::Str(x)), Value::Primitive(Primitive::Str(y))) => Ok(x.cmp(y)),
        _ => Err(EvalError::invalid_types(name, &[&a, &b])),
    }
}

fn gt(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok(compare(GT, args)?.is_gt().into())
}

fn gt_eq(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok(compare(GT_EQ, args)?.is_ge().into())
}

fn lt(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok(compare(LT, args)?.is_lt().into())
}

fn lt_eq(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok(compare(LT_EQ, args)?.is_le().into())
}

fn single(name: &str, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    into_values(name, args)?
        .pop()
        .ok_or_else(|| EvalError::Internal(format!("\"{}\" expects one operand", name)))
}

fn not(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok((!single(NOT, args)?.is_truthy()).into())
}

// Operands arrive as closures so that evaluation stops at the first one that
// decides the result.
fn and(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    for i in 0..args.len() {
        let operand = as_closure(AND, &args, i)?;
        if !evaluator.call_closure(operand, Vec::new())?.is_truthy() {
            return Ok(false.into());
        }
    }
    Ok(true.into())
}

fn or(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    for i in 0..args.len() {
        let operand = as_closure(OR, &args, i)?;
        if evaluator.call_closure(operand, Vec::new())?.is_truthy() {
            return Ok(true.into());
        }
    }
    Ok(false.into())
}

fn is_nil(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok(single(IS_NIL, args)?.is_null().into())
}

fn is_not_nil(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok((!single(IS_NOT_NIL, args)?.is_null()).into())
}

fn floor(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    match single(FLOOR, args)? {
        Value::Primitive(Primitive::Num(n)) => Ok(n.floor().into()),
        Value::Null => Ok(Value::Null),
        other => Err(EvalError::invalid_types(FLOOR, &[&other])),
    }
}
