pub mod container;
pub mod merge;
pub mod path;
pub mod stream;

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use rustc_hash::FxHasher;
use smol_str::SmolStr;

use crate::Shared;
use crate::number::Number;

pub use container::Container;
pub use merge::{MergeError, MergeMode};
pub use path::{Path, PathError, Segment};
pub use stream::Stream;

pub(crate) static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    Num(Number),
    Str(SmolStr),
    Bool(bool),
}

impl Primitive {
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Num(_) => "number",
            Primitive::Str(_) => "string",
            Primitive::Bool(_) => "boolean",
        }
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Num(n) => write!(f, "{}", n),
            Primitive::Str(s) => write!(f, "{}", s),
            Primitive::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Ordered, index-addressable sequence. Writing past the end pads with Null.
#[derive(Debug, Clone, Default)]
pub struct Array(Shared<Vec<Value>>);

impl Array {
    pub fn new(values: Vec<Value>) -> Self {
        Array(Shared::new(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Out-of-range reads yield Null.
    pub fn get(&self, index: usize) -> &Value {
        self.0.get(index).unwrap_or(&NULL)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        self.0.as_slice()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.as_ref().clone()
    }

    pub fn set_element(&self, index: usize, value: Value) -> Self {
        let mut array = self.clone();
        let values = Shared::make_mut(&mut array.0);
        if index >= values.len() {
            values.resize(index + 1, Value::Null);
        }
        values[index] = value;
        array
    }

    pub fn push(&self, value: Value) -> Self {
        let mut array = self.clone();
        Shared::make_mut(&mut array.0).push(value);
        array
    }

    pub fn extend(&self, values: impl IntoIterator<Item = Value>) -> Self {
        let mut array = self.clone();
        Shared::make_mut(&mut array.0).extend(values);
        array
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Shared::ptr_eq(&self.0, &other.0)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Array::new(iter.into_iter().collect())
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

/// The immutable data tree every program reads and writes.
///
/// Mutating operations (`set_field`, `set_element`, `unset`, path `set`) return a
/// new value that shares the untouched substructure with the original.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Primitive(Primitive),
    Array(Array),
    Container(Container),
    Stream(Stream),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, the empty string, and empty arrays or containers.
    pub fn is_null_or_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Primitive(Primitive::Str(s)) => s.is_empty(),
            Value::Primitive(_) => false,
            Value::Array(array) => array.is_empty(),
            Value::Container(container) => container.is_empty(),
            Value::Stream(_) => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Primitive(Primitive::Bool(b)) => *b,
            Value::Primitive(Primitive::Num(n)) => !n.is_zero() && !n.value().is_nan(),
            _ => !self.is_null_or_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Primitive(p) => p.type_name(),
            Value::Array(_) => "array",
            Value::Container(_) => "container",
            Value::Stream(_) => "stream",
        }
    }

    /// Every type name the value answers to, most general first.
    pub fn types(&self) -> Vec<&'static str> {
        match self {
            Value::Primitive(p) => vec!["primitive", p.type_name()],
            _ => vec![self.type_name()],
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Primitive(Primitive::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Primitive(Primitive::Num(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Value::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Rebuilds the tree so that no allocation is shared with `self`. Streams are
    /// evaluated and copied into a new stream.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Primitive(p) => Value::Primitive(p.clone()),
            Value::Array(array) => Value::Array(array.iter().map(Value::deep_copy).collect()),
            Value::Container(container) => Value::Container(
                container
                    .iter()
                    .map(|(key, value)| (key.clone(), value.deep_copy()))
                    .collect(),
            ),
            Value::Stream(stream) => Value::Stream(stream.deep_copy()),
        }
    }

    pub fn structural_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Container(a), Value::Container(b)) => a == b,
            (Value::Stream(a), Value::Stream(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Primitive(p) => p.hash(state),
            Value::Array(array) => {
                array.len().hash(state);
                array.iter().for_each(|v| v.hash(state));
            }
            Value::Container(container) => container.hash(state),
            Value::Stream(stream) => stream.id().hash(state),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Primitive(Primitive::Str(s)) => write!(f, "{:?}", s.as_str()),
            Value::Primitive(p) => write!(f, "{}", p),
            Value::Array(array) => write!(f, "[{}]", array.iter().join(", ")),
            Value::Container(container) => write!(
                f,
                "{{{}}}",
                container
                    .iter()
                    .map(|(key, value)| format!("{:?}: {}", key.as_str(), value))
                    .join(", ")
            ),
            Value::Stream(_) => write!(f, "<stream>"),
        }
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        Value::Primitive(value)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Primitive(Primitive::Num(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Primitive(Primitive::Num(value.into()))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Primitive(Primitive::Num(value.into()))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Primitive(Primitive::Num(value.into()))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Primitive(Primitive::Num(value.into()))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Primitive(Primitive::Bool(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Primitive(Primitive::Str(SmolStr::new(value)))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Primitive(Primitive::Str(SmolStr::from(value)))
    }
}

impl From<SmolStr> for Value {
    fn from(value: SmolStr) -> Self {
        Value::Primitive(Primitive::Str(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(Array::new(value))
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl From<Container> for Value {
    fn from(value: Container) -> Self {
        Value::Container(value)
    }
}

impl From<Stream> for Value {
    fn from(value: Stream) -> Self {
        Value::Stream(value)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn container(entries: Vec<(&str, Value)>) -> Value {
        Value::Container(entries.into_iter().collect())
    }

    #[test]
    fn test_container_equality_ignores_order() {
        let ab = container(vec![("a", 1.into()), ("b", 2.into())]);
        let ba = container(vec![("b", 2.into()), ("a", 1.into())]);

        assert_eq!(ab, ba);
        assert_eq!(ab.structural_hash(), ba.structural_hash());
    }

    #[test]
    fn test_array_equality_respects_order() {
        let a: Value = vec![1.into(), 2.into()].into();
        let b: Value = vec![2.into(), 1.into()].into();

        assert_ne!(a, b);
    }

    #[test]
    fn test_string_and_number_never_equal() {
        let s: Value = "1".into();
        let n: Value = 1.into();

        assert_ne!(s, n);
        assert_ne!(s.structural_hash(), n.structural_hash());
    }

    #[rstest]
    #[case::null(Value::Null, false)]
    #[case::empty_string("".into(), false)]
    #[case::string("a".into(), true)]
    #[case::zero(0.into(), false)]
    #[case::one(1.into(), true)]
    #[case::tiny(Value::from(1e-16_f64), true)]
    #[case::false_(false.into(), false)]
    #[case::true_(true.into(), true)]
    #[case::empty_array(Value::Array(Array::default()), false)]
    #[case::array(vec![Value::Null].into(), true)]
    #[case::empty_container(Value::Container(Container::default()), false)]
    #[case::container(container(vec![("a", 1.into())]), true)]
    fn test_is_truthy(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(value.is_truthy(), expected);
    }

    #[test]
    fn test_set_element_pads_with_null() {
        let array = Array::new(vec![1.into()]);
        let updated = array.set_element(3, 4.into());

        assert_eq!(array.len(), 1);
        assert_eq!(
            updated.to_vec(),
            vec![1.into(), Value::Null, Value::Null, 4.into()]
        );
    }

    #[test]
    fn test_deep_copy_shares_nothing() {
        let inner = Array::new(vec![1.into()]);
        let value = container(vec![("a", Value::Array(inner.clone()))]);
        let copy = value.deep_copy();

        assert_eq!(value, copy);
        let copied_inner = copy
            .as_container()
            .and_then(|c| c.get_field("a").as_array())
            .cloned()
            .unwrap_or_default();
        assert!(!copied_inner.ptr_eq(&inner));
    }

    #[test]
    fn test_display() {
        let value = container(vec![
            ("name", "wst".into()),
            ("tags", vec![1.into(), true.into(), Value::Null].into()),
        ]);
        assert_eq!(value.to_string(), r#"{"name": "wst", "tags": [1, true, null]}"#);
    }
}
