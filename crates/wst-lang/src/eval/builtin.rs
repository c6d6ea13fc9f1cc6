//! Functions registered in the `builtins` package.
//!
//! Each submodule contributes a list of [`Callable`]s. Overload selection has
//! already checked arity and argument shapes when a builtin runs, so the
//! helpers here only re-assert them.
mod control;
mod general;
mod iteration;
mod operators;

use itertools::Itertools;

use super::closure::{Closure, RuntimeValue};
use super::error::EvalError;
use super::registry::{BuiltinFn, Callable};
use super::signature::{ParamKind, Signature};
use crate::value::Value;

const V: ParamKind = ParamKind::Value;
const C: ParamKind = ParamKind::Closure;

pub(crate) fn functions() -> Vec<Callable> {
    [
        operators::functions(),
        control::functions(),
        general::functions(),
        iteration::functions(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn fixed(name: &str, params: &[ParamKind], func: BuiltinFn) -> Callable {
    Callable::builtin(name, Signature::new(params), func)
}

fn variadic(name: &str, params: &[ParamKind], func: BuiltinFn) -> Callable {
    Callable::builtin(name, Signature::variadic(params), func)
}

fn shape_error(name: &str, args: &[RuntimeValue]) -> EvalError {
    EvalError::Internal(format!(
        "\"{}\" called with ({})",
        name,
        args.iter().map(RuntimeValue::type_name).join(", ")
    ))
}

fn into_values(name: &str, args: Vec<RuntimeValue>) -> Result<Vec<Value>, EvalError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in &args {
        match arg {
            RuntimeValue::Value(value) => values.push(value.clone()),
            RuntimeValue::Closure(_) => return Err(shape_error(name, &args)),
        }
    }
    Ok(values)
}

fn as_closure<'a>(name: &str, args: &'a [RuntimeValue], index: usize) -> Result<&'a Closure, EvalError> {
    match args.get(index) {
        Some(RuntimeValue::Closure(closure)) => Ok(closure),
        _ => Err(shape_error(name, args)),
    }
}

fn as_value<'a>(name: &str, args: &'a [RuntimeValue], index: usize) -> Result<&'a Value, EvalError> {
    match args.get(index) {
        Some(RuntimeValue::Value(value)) => Ok(value),
        _ => Err(shape_error(name, args)),
    }
}

fn invalid_types(name: &str, values: &[Value]) -> EvalError {
    EvalError::invalid_types(name, &values.iter().collect_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shared;
    use crate::compiler::{SequentialIdGenerator, compile};
    use crate::eval::Evaluator;
    use crate::eval::registry::Registry;

    /// Compiles and runs `code` against `input` with a fresh registry.
    pub(super) fn eval(code: &str, input: Value) -> Result<Value, EvalError> {
        let ast = crate::parse(code).unwrap();
        let program = compile(code, &ast, "main", &mut SequentialIdGenerator::new()).unwrap();
        let mut registry = Registry::with_builtins();
        registry.register_program(&program);

        Evaluator::new(Shared::new(registry), "main").run(&program.root, input)
    }

    pub(super) fn json(text: &str) -> Value {
        crate::json::parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_no_duplicate_signatures() {
        let functions = functions();
        let duplicates = functions
            .iter()
            .duplicates_by(|c| (c.name().clone(), c.signature().clone()))
            .count();
        assert_eq!(duplicates, 0);
    }
}
