//! Collection builtins.
//!
//! Arrays, streams and container values are accepted wherever a sequence is
//! expected, and Null stands for "nothing to iterate". Mapping over an array
//! drops the positions whose mapper returned Null or an empty value;
//! containers keep every key.
use std::cmp::Ordering;

use itertools::{Either, Itertools};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{C, V, as_closure, as_value, fixed, into_values, invalid_types, variadic};
use crate::ast::constants::{
    ARRAY_OF, GROUP_BY, ITERATE, JOIN, REDUCE, SORT_BY, SORT_BY_DESCENDING, UNIQUE_BY, WHERE,
};
use crate::eval::Evaluator;
use crate::eval::closure::{Closure, RuntimeValue};
use crate::eval::error::EvalError;
use crate::eval::registry::Callable;
use crate::value::{Container, Primitive, Stream, Value};

const UNIQUE: &str = "unique";
const LAST: &str = "last";
const LIST_LEN: &str = "listLen";
const RANGE: &str = "range";
const FLATTEN: &str = "flatten";

pub(super) fn functions() -> Vec<Callable> {
    vec![
        variadic(ITERATE, &[C, V], iterate),
        fixed(WHERE, &[V, C], where_),
        fixed(GROUP_BY, &[V, C], group_by),
        fixed(SORT_BY, &[V, C], sort_by),
        fixed(SORT_BY_DESCENDING, &[V, C], sort_by_descending),
        fixed(UNIQUE, &[V], unique),
        fixed(UNIQUE_BY, &[V, C], unique_by),
        fixed(REDUCE, &[V, C], reduce),
        fixed(REDUCE, &[V, V, C], reduce),
        fixed(JOIN, &[V, V, C], join),
        fixed(LAST, &[V], last),
        fixed(LIST_LEN, &[V], list_len),
        variadic(ARRAY_OF, &[V], array_of),
        fixed(RANGE, &[V], range),
        fixed(RANGE, &[V, V], range),
        fixed(FLATTEN, &[V], flatten),
    ]
}

/// Elements of a sequence argument, `None` for Null.
fn elements(name: &str, value: &Value) -> Result<Option<Vec<Value>>, EvalError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(array) => Ok(Some(array.to_vec())),
        Value::Stream(stream) => Ok(Some(stream.to_vec())),
        Value::Container(container) => Ok(Some(container.values().cloned().collect())),
        Value::Primitive(_) => Err(EvalError::invalid_types(name, &[value])),
    }
}

/// Splits `(sequence, closure)` arguments.
fn sequence_and_closure<'a>(
    name: &str,
    args: &'a [RuntimeValue],
) -> Result<(Option<Vec<Value>>, &'a Closure), EvalError> {
    let sequence = elements(name, as_value(name, args, 0)?)?;
    let closure = as_closure(name, args, 1)?;
    Ok((sequence, closure))
}

fn iterate(evaluator: &mut Evaluator, mut args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let collections = into_values(ITERATE, args.split_off(1))?;
    let mapper = as_closure(ITERATE, &args, 0)?;

    match collections.as_slice() {
        [] => evaluator.call_closure(mapper, Vec::new()),
        [Value::Null] => Ok(Value::Null),
        [Value::Array(array)] => map_dropping_empty(evaluator, mapper, array.iter().map(|v| vec![v.clone()])),
        [Value::Stream(stream)] => {
            let mapped = stream
                .to_vec()
                .into_iter()
                .map(|v| evaluator.call_closure(mapper, vec![v]))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Stream::from_values(mapped).into())
        }
        [Value::Container(container)] => container
            .iter()
            .map(|(key, v)| Ok((key.clone(), evaluator.call_closure(mapper, vec![v.clone()])?)))
            .collect::<Result<Container, EvalError>>()
            .map(Value::from),
        [other] => Err(EvalError::invalid_types(ITERATE, &[other])),
        many if many.iter().all(Value::is_null) => Ok(Value::Null),
        many if many.iter().all(|c| matches!(c, Value::Container(_) | Value::Null)) => {
            zip_containers(evaluator, mapper, many)
        }
        many => {
            let lists = many
                .iter()
                .map(|c| match c {
                    Value::Array(_) | Value::Stream(_) | Value::Null => {
                        elements(ITERATE, c).map(Option::unwrap_or_default)
                    }
                    _ => Err(invalid_types(ITERATE, many)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let len = lists.iter().map(Vec::len).max().unwrap_or_default();
            let rows = (0..len).map(|i| {
                lists
                    .iter()
                    .map(|list| list.get(i).cloned().unwrap_or_default())
                    .collect_vec()
            });
            map_dropping_empty(evaluator, mapper, rows)
        }
    }
}

fn map_dropping_empty(
    evaluator: &mut Evaluator,
    mapper: &Closure,
    rows: impl Iterator<Item = Vec<Value>>,
) -> Result<Value, EvalError> {
    let mut mapped = Vec::new();
    for row in rows {
        let value = evaluator.call_closure(mapper, row)?;
        if !value.is_null_or_empty() {
            mapped.push(value);
        }
    }
    Ok(mapped.into())
}

/// Zips containers by the union of their keys, in first-seen order. Missing
/// fields are passed as Null.
fn zip_containers(evaluator: &mut Evaluator, mapper: &Closure, containers: &[Value]) -> Result<Value, EvalError> {
    let containers = containers.iter().filter_map(Value::as_container).collect_vec();
    let keys = containers
        .iter()
        .flat_map(|c| c.keys().cloned())
        .unique()
        .collect_vec();

    let mut zipped = Container::new();
    for key in keys {
        let row = containers.iter().map(|c| c.get_field(&key).clone()).collect();
        zipped = zipped.set_field(key, evaluator.call_closure(mapper, row)?);
    }
    Ok(zipped.into())
}

fn where_(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let predicate = as_closure(WHERE, &args, 1)?;

    match as_value(WHERE, &args, 0)? {
        Value::Null => Ok(Value::Null),
        Value::Container(container) => {
            let mut kept = Container::new();
            for (key, value) in container.iter() {
                if evaluator.call_closure(predicate, vec![value.clone()])?.is_truthy() {
                    kept = kept.set_field(key.clone(), value.clone());
                }
            }
            Ok(kept.into())
        }
        value => {
            let is_stream = matches!(value, Value::Stream(_));
            let mut kept = Vec::new();
            for element in elements(WHERE, value)?.unwrap_or_default() {
                if evaluator.call_closure(predicate, vec![element.clone()])?.is_truthy() {
                    kept.push(element);
                }
            }
            Ok(if is_stream {
                Stream::from_values(kept).into()
            } else {
                kept.into()
            })
        }
    }
}

fn group_by(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let (sequence, key_of) = sequence_and_closure(GROUP_BY, &args)?;
    let Some(sequence) = sequence else {
        return Ok(Value::Null);
    };

    let mut index: FxHashMap<Value, usize> = FxHashMap::default();
    let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
    for element in sequence {
        let key = evaluator.call_closure(key_of, vec![element.clone()])?;
        match index.get(&key) {
            Some(&i) => groups[i].1.push(element),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![element]));
            }
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, elements)| {
            Value::from(Container::from_iter([
                ("key", key),
                ("elements", Value::from(elements)),
            ]))
        })
        .collect())
}

/// Null keys sort before everything else. Other keys must all be numbers,
/// all strings or all booleans.
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Primitive(Primitive::Num(x)), Value::Primitive(Primitive::Num(y))) => x.cmp(y),
        (Value::Primitive(Primitive::Str(x)), Value::Primitive(Primitive::Str(y))) => x.cmp(y),
        (Value::Primitive(Primitive::Bool(x)), Value::Primitive(Primitive::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn sort(evaluator: &mut Evaluator, name: &str, args: Vec<RuntimeValue>, descending: bool) -> Result<Value, EvalError> {
    let (sequence, key_of) = sequence_and_closure(name, &args)?;
    let Some(sequence) = sequence else {
        return Ok(Value::Null);
    };

    let mut keyed = Vec::with_capacity(sequence.len());
    for element in sequence {
        let key = evaluator.call_closure(key_of, vec![element.clone()])?;
        keyed.push((key, element));
    }

    let kinds = keyed
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !key.is_null())
        .unique_by(|key| key.type_name())
        .collect_vec();
    match kinds.as_slice() {
        [] | [Value::Primitive(_)] => {}
        _ => return Err(EvalError::invalid_types(name, &kinds)),
    }

    // `sort_by` is stable, so equal keys keep their input order either way.
    keyed.sort_by(|(a, _), (b, _)| {
        let ordering = compare_keys(a, b);
        if descending { ordering.reverse() } else { ordering }
    });
    Ok(keyed.into_iter().map(|(_, element)| element).collect())
}

fn sort_by(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    sort(evaluator, SORT_BY, args, false)
}

fn sort_by_descending(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    sort(evaluator, SORT_BY_DESCENDING, args, true)
}

fn unique(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let value = as_value(UNIQUE, &args, 0)?;
    Ok(match elements(UNIQUE, value)? {
        Some(sequence) => sequence.into_iter().unique().collect(),
        None => Value::Null,
    })
}

/// Keeps the first element for every distinct key.
fn unique_by(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let (sequence, key_of) = sequence_and_closure(UNIQUE_BY, &args)?;
    let Some(sequence) = sequence else {
        return Ok(Value::Null);
    };

    let mut seen = FxHashSet::default();
    let mut kept = Vec::new();
    for element in sequence {
        let key = evaluator.call_closure(key_of, vec![element.clone()])?;
        if seen.insert(key) {
            kept.push(element);
        }
    }
    Ok(kept.into())
}

/// `reduce(xs, f)` folds from the first element; `reduce(xs, init, f)` from
/// `init`.
fn reduce(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let reducer = as_closure(REDUCE, &args, args.len() - 1)?;
    let mut sequence = elements(REDUCE, as_value(REDUCE, &args, 0)?)?
        .unwrap_or_default()
        .into_iter();

    let initial = if args.len() == 3 {
        Some(as_value(REDUCE, &args, 1)?.clone())
    } else {
        sequence.next()
    };
    let Some(mut accumulator) = initial else {
        return Ok(Value::Null);
    };

    for current in sequence {
        accumulator = evaluator.call_closure(reducer, vec![accumulator, current])?;
    }
    Ok(accumulator)
}

/// Pairs every left element with the right elements the predicate accepts.
/// Unmatched left elements pair with Null, and unmatched right elements are
/// appended afterwards with a Null left side.
fn join(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let left = elements(JOIN, as_value(JOIN, &args, 0)?)?.unwrap_or_default();
    let right = elements(JOIN, as_value(JOIN, &args, 1)?)?.unwrap_or_default();
    let matches = as_closure(JOIN, &args, 2)?;

    let pair = |left: Value, right: Value| -> Value {
        Container::from_iter([("left", left), ("right", right)]).into()
    };

    let mut matched_right = vec![false; right.len()];
    let mut pairs = Vec::new();
    for l in left {
        let mut matched = false;
        for (i, r) in right.iter().enumerate() {
            if evaluator.call_closure(matches, vec![l.clone(), r.clone()])?.is_truthy() {
                matched = true;
                matched_right[i] = true;
                pairs.push(pair(l.clone(), r.clone()));
            }
        }
        if !matched {
            pairs.push(pair(l, Value::Null));
        }
    }

    pairs.extend(
        right
            .into_iter()
            .zip(matched_right)
            .filter(|(_, matched)| !matched)
            .map(|(r, _)| pair(Value::Null, r)),
    );
    Ok(pairs.into())
}

fn last(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let value = as_value(LAST, &args, 0)?;
    Ok(elements(LAST, value)?
        .and_then(|mut sequence| sequence.pop())
        .unwrap_or_default())
}

fn list_len(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let value = as_value(LIST_LEN, &args, 0)?;
    Ok(elements(LIST_LEN, value)?.map_or(0, |sequence| sequence.len()).into())
}

fn array_of(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    Ok(into_values(ARRAY_OF, args)?.into())
}

/// `range(end)` counts from zero; `range(start, end)` counts down when
/// `start > end`. The end is exclusive and elements are produced lazily.
fn range(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let values = into_values(RANGE, args)?;
    let bounds = values
        .iter()
        .map(|v| v.as_number().map(|n| n.to_int()))
        .collect::<Option<Vec<_>>>();

    let (start, end) = match bounds.as_deref() {
        Some([end]) => (0, *end),
        Some([start, end]) => (*start, *end),
        _ => return Err(invalid_types(RANGE, &values)),
    };

    let numbers = if start <= end {
        Either::Left(start..end)
    } else {
        Either::Right(((end + 1)..=start).rev())
    };
    Ok(Stream::new(numbers.map(Value::from)).into())
}

/// Flattens nested arrays at every depth.
fn flatten(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    fn flatten_into(values: &[Value], flat: &mut Vec<Value>) {
        for value in values {
            match value {
                Value::Array(inner) => flatten_into(inner.as_slice(), flat),
                value => flat.push(value.clone()),
            }
        }
    }

    match as_value(FLATTEN, &args, 0)? {
        Value::Null => Ok(Value::Null),
        Value::Array(array) => {
            let mut flat = Vec::with_capacity(array.len());
            flatten_into(array.as_slice(), &mut flat);
            Ok(flat.into())
        }
        Value::Stream(stream) => {
            let mut flat = Vec::new();
            flatten_into(&stream.to_vec(), &mut flat);
            Ok(flat.into())
        }
        other => Err(EvalError::invalid_types(FLATTEN, &[other])),
    }
}
