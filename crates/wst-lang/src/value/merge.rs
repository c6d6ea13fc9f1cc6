use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use thiserror::Error;

use super::{Container, Path, PathError, Value};

/// How a mapping combines its value with what the target already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeMode {
    /// Containers merge recursively, anything else replaces.
    #[default]
    Merge,
    Replace,
    /// Pushes the value as the last element of the target array.
    Append,
    /// Concatenates arrays, or adds the container fields the target lacks.
    Extend,
}

impl MergeMode {
    pub fn from_keyword(word: &str) -> Option<MergeMode> {
        match word {
            "merge" => Some(MergeMode::Merge),
            "replace" => Some(MergeMode::Replace),
            "append" => Some(MergeMode::Append),
            "extend" => Some(MergeMode::Extend),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Merge => "merge",
            MergeMode::Replace => "replace",
            MergeMode::Append => "append",
            MergeMode::Extend => "extend",
        }
    }
}

impl Display for MergeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Cannot append to {found}")]
    CannotAppend { found: &'static str },
    #[error("{target} cannot be extended with {inbound}")]
    CannotExtend {
        target: &'static str,
        inbound: &'static str,
    },
}

/// Writes `value` at `path` inside `target`, combining it with the current
/// value there according to `mode`.
pub fn write(mode: MergeMode, path: &Path, target: &Value, value: Value) -> Result<Value, MergeError> {
    let current = path.get(target)?;
    let combined = match mode {
        MergeMode::Merge => match (current, value) {
            (Value::Container(existing), Value::Container(update)) => existing.merge(&update).into(),
            (_, value) => value,
        },
        MergeMode::Replace => value,
        MergeMode::Append => append(current, value)?,
        MergeMode::Extend => extend(current, value)?,
    };
    Ok(path.set(target, combined)?)
}

fn append(current: Value, value: Value) -> Result<Value, MergeError> {
    match current {
        Value::Array(array) => Ok(array.push(value).into()),
        Value::Stream(stream) => {
            let mut elements = stream.to_vec();
            elements.push(value);
            Ok(elements.into())
        }
        current if current.is_null_or_empty() => Ok(vec![value].into()),
        current => Err(MergeError::CannotAppend {
            found: current.type_name(),
        }),
    }
}

fn extend(current: Value, inbound: Value) -> Result<Value, MergeError> {
    match (current, inbound) {
        (Value::Array(array), Value::Array(more)) => Ok(array.extend(more.iter().cloned()).into()),
        (Value::Container(existing), Value::Container(more)) => Ok(missing_fields(existing, &more).into()),
        (current, inbound) if current.is_null_or_empty() => Ok(inbound),
        (current @ (Value::Array(_) | Value::Container(_) | Value::Stream(_)), inbound) => {
            Err(MergeError::CannotExtend {
                target: current.type_name(),
                inbound: inbound.type_name(),
            })
        }
        (_, inbound) => Ok(inbound),
    }
}

fn missing_fields(existing: Container, more: &Container) -> Container {
    more.iter()
        .filter(|(key, _)| existing.get_field(key).is_null())
        .fold(existing.clone(), |acc, (key, value)| acc.set_field(key.clone(), value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json;
    use rstest::rstest;

    fn value(text: &str) -> Value {
        json::parse(text.as_bytes()).unwrap()
    }

    fn to_json(value: &Value) -> String {
        String::from_utf8(json::serialize(value).unwrap()).unwrap()
    }

    #[rstest]
    #[case::merge_containers(MergeMode::Merge, r#"{"a":{"x":1}}"#, "a", r#"{"y":2}"#, r#"{"a":{"x":1,"y":2}}"#)]
    #[case::merge_replaces_arrays(MergeMode::Merge, r#"{"a":[1]}"#, "a", "[2]", r#"{"a":[2]}"#)]
    #[case::replace_container(MergeMode::Replace, r#"{"a":{"x":1}}"#, "a", r#"{"y":2}"#, r#"{"a":{"y":2}}"#)]
    #[case::append_array(MergeMode::Append, r#"{"a":[1]}"#, "a", "[2,3]", r#"{"a":[1,[2,3]]}"#)]
    #[case::append_to_missing(MergeMode::Append, "{}", "a", "1", r#"{"a":[1]}"#)]
    #[case::extend_arrays(MergeMode::Extend, r#"{"a":[1]}"#, "a", "[2,3]", r#"{"a":[1,2,3]}"#)]
    #[case::extend_keeps_fields(
        MergeMode::Extend,
        r#"{"a":{"x":1}}"#,
        "a",
        r#"{"x":9,"y":2}"#,
        r#"{"a":{"x":1,"y":2}}"#
    )]
    #[case::extend_missing(MergeMode::Extend, "{}", "a", "[1]", r#"{"a":[1]}"#)]
    #[case::extend_primitive(MergeMode::Extend, r#"{"a":1}"#, "a", "2", r#"{"a":2}"#)]
    fn test_write(
        #[case] mode: MergeMode,
        #[case] target: &str,
        #[case] path: &str,
        #[case] inbound: &str,
        #[case] expected: &str,
    ) {
        let path = Path::parse(path).unwrap();
        let written = write(mode, &path, &value(target), value(inbound)).unwrap();
        assert_eq!(to_json(&written), expected);
    }

    #[rstest]
    #[case::append_to_number(
        MergeMode::Append,
        r#"{"a":1}"#,
        "[2]",
        MergeError::CannotAppend { found: "number" }
    )]
    #[case::extend_array_with_container(
        MergeMode::Extend,
        r#"{"a":[1]}"#,
        r#"{"b":2}"#,
        MergeError::CannotExtend { target: "array", inbound: "container" }
    )]
    fn test_write_error(
        #[case] mode: MergeMode,
        #[case] target: &str,
        #[case] inbound: &str,
        #[case] expected: MergeError,
    ) {
        let path = Path::parse("a").unwrap();
        assert_eq!(write(mode, &path, &value(target), value(inbound)), Err(expected));
    }

    #[rstest]
    #[case::merge("merge", Some(MergeMode::Merge))]
    #[case::extend("extend", Some(MergeMode::Extend))]
    #[case::other("side", None)]
    fn test_from_keyword(#[case] word: &str, #[case] expected: Option<MergeMode>) {
        assert_eq!(MergeMode::from_keyword(word), expected);
    }
}
