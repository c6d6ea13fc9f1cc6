use super::{V, fixed, into_values, invalid_types, variadic};
use crate::ast::constants::GET;
use crate::eval::Evaluator;
use crate::eval::closure::RuntimeValue;
use crate::eval::error::EvalError;
use crate::eval::registry::Callable;
use crate::ir::FunctionReference;
use crate::value::{Path, Primitive, Value};

const UNSET: &str = "unset";
const TYPES: &str = "types";
const IS: &str = "is";
const DEEP_COPY: &str = "deepCopy";
const HASH: &str = "hash";
const CALL_FN: &str = "callFn";

pub(super) fn functions() -> Vec<Callable> {
    vec![
        fixed(GET, &[V, V], get),
        fixed(UNSET, &[V, V], unset),
        fixed(TYPES, &[V], types),
        fixed(IS, &[V, V], is),
        fixed(DEEP_COPY, &[V], deep_copy),
        fixed(HASH, &[V], hash),
        variadic(CALL_FN, &[V, V], call_fn),
    ]
}

fn two(name: &str, args: Vec<RuntimeValue>) -> Result<[Value; 2], EvalError> {
    let values = into_values(name, args)?;
    <[Value; 2]>::try_from(values).map_err(|values| invalid_types(name, &values))
}

fn one(name: &str, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let values = into_values(name, args)?;
    match <[Value; 1]>::try_from(values) {
        Ok([value]) => Ok(value),
        Err(values) => Err(invalid_types(name, &values)),
    }
}

/// Reads a path given as a string, such as `get($root, "a.b[0]")`.
fn get(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let [value, path] = two(GET, args)?;
    let Some(path) = path.as_str() else {
        return Err(EvalError::invalid_types(GET, &[&value, &path]));
    };
    Ok(Path::parse(path)?.get(&value)?)
}

fn unset(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    match two(UNSET, args)? {
        [Value::Container(container), Value::Primitive(Primitive::Str(field))] => {
            Ok(container.unset(&field).into())
        }
        [Value::Null, _] => Ok(Value::Null),
        values => Err(invalid_types(UNSET, &values)),
    }
}

fn types(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let value = one(TYPES, args)?;
    Ok(value.types().into_iter().map(Value::from).collect())
}

fn is(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let [value, type_name] = two(IS, args)?;
    match type_name.as_str() {
        Some(type_name) => Ok(value.types().iter().any(|t| *t == type_name).into()),
        None => Err(EvalError::invalid_types(IS, &[&value, &type_name])),
    }
}

fn deep_copy(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok(one(DEEP_COPY, args)?.deep_copy())
}

fn hash(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok(format!("{:016x}", one(HASH, args)?.structural_hash()).into())
}

/// Calls a function named at runtime. `pkg::name` selects a package; a bare
/// name is resolved like an unqualified call.
fn call_fn(evaluator: &mut Evaluator, mut args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let name = match args.first() {
        Some(RuntimeValue::Value(value)) => value.clone(),
        _ => return Err(super::shape_error(CALL_FN, &args)),
    };
    let Some(name) = name.as_str() else {
        return Err(EvalError::invalid_types(CALL_FN, &[&name]));
    };

    let reference = match name.split_once("::") {
        Some((package, name)) => FunctionReference::new(package, name),
        None => FunctionReference::unqualified(name),
    };
    args.remove(0);

    tracing::trace!(function = %reference, "callFn");
    evaluator.call_function(&reference, args)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{eval, json};
    use super::*;
    use crate::eval::overload::OverloadError;
    use rstest::rstest;

    #[rstest]
    #[case::get_nested("get($root, \"a.b[1]\")", Value::from(3))]
    #[case::get_missing("get($root, \"a.c\")", Value::Null)]
    #[case::unset("unset($root.a, \"b\")", json("{}"))]
    #[case::unset_null("unset($root.missing, \"b\")", Value::Null)]
    #[case::types_number("types(1)", json(r#"["primitive", "number"]"#))]
    #[case::types_container("types($root)", json(r#"["container"]"#))]
    #[case::is_primitive("is(\"x\", \"primitive\")", Value::from(true))]
    #[case::is_not("is(\"x\", \"array\")", Value::from(false))]
    #[case::deep_copy("deepCopy($root.a.b)", json("[2, 3]"))]
    #[case::call_builtin("callFn(\"sum\", 1, 2)", Value::from(3))]
    #[case::call_qualified("callFn(\"builtins::arrayOf\", 1)", json("[1]"))]
    #[case::call_defined("def twice(x) x * 2\ncallFn(\"main::twice\", 4)", Value::from(8))]
    fn test_general(#[case] code: &str, #[case] expected: Value) {
        let input = json(r#"{"a": {"b": [2, 3]}}"#);
        assert_eq!(eval(code, input).unwrap(), expected);
    }

    #[test]
    fn test_hash_ignores_field_order() {
        let first = eval("hash({ a: 1, b: 2 })", Value::Null).unwrap();
        let second = eval("hash({ b: 2, a: 1 })", Value::Null).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_str().map(str::len), Some(16));
    }

    #[test]
    fn test_call_fn_unknown() {
        assert!(matches!(
            eval("callFn(\"nothing\", 1)", Value::Null),
            Err(EvalError::Overload(OverloadError::NotFound(_)))
        ));
    }

    #[test]
    fn test_get_type_mismatch() {
        let error = eval("get($root, \"a.b.c\")", json(r#"{"a": {"b": [1]}}"#)).unwrap_err();
        assert!(matches!(error, EvalError::Path(ref e) if e.is_type_mismatch()));
    }
}
