use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use smol_str::SmolStr;
use thiserror::Error;

use super::{Array, Container, Value};

const ESCAPE: char = '\\';
const INDEX_OPEN: char = '[';
const INDEX_CLOSE: char = ']';
const DELIMITER: char = '.';
const WILDCARD: char = '*';

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Expected ']' after \"{content}\" in \"{path}\", found the end of the path")]
    UnclosedBracket { path: String, content: String },
    #[error("Field had a trailing '\\' in \"{0}\"")]
    TrailingEscape(String),
    #[error("Index [{0}] is too large")]
    InvalidIndex(String),
    #[error("Attempted to key into non-container {found} with field {field}")]
    NotAContainer { found: &'static str, field: SmolStr },
    #[error("Attempted to index into non-array {found} with index {index}")]
    NotAnArray { found: &'static str, index: String },
    #[error("Wildcard can only be applied to arrays (but was applied to {0})")]
    WildcardOnNonArray(&'static str),
    #[error("Setting through wildcards is not supported")]
    WildcardSet,
    #[error("Expected ']' after '[*' in \"{0}\"")]
    UnclosedWildcard(String),
}

impl PathError {
    /// Traversal failures caused by a value of the wrong variant, as opposed to
    /// malformed path strings.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(
            self,
            PathError::NotAContainer { .. }
                | PathError::NotAnArray { .. }
                | PathError::WildcardOnNonArray(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(SmolStr),
    /// `None` is the append segment `[]`.
    Index(Option<usize>),
    /// Only wildcards followed by another wildcard flatten their results.
    Wildcard { flatten: bool },
}

impl Segment {
    fn get(&self, data: &Value) -> Result<Value, PathError> {
        match (self, data) {
            (_, Value::Null) => Ok(Value::Null),
            (Segment::Field(field), Value::Container(container)) => {
                Ok(container.get_field(field).clone())
            }
            (Segment::Field(field), _) => Err(PathError::NotAContainer {
                found: data.type_name(),
                field: field.clone(),
            }),
            (Segment::Index(Some(index)), Value::Array(array)) => Ok(array.get(*index).clone()),
            (Segment::Index(None), Value::Array(_)) => Ok(Value::Null),
            (Segment::Index(_), _) => Err(PathError::NotAnArray {
                found: data.type_name(),
                index: self.to_string(),
            }),
            (Segment::Wildcard { .. }, _) => Self::wildcard_get(data, &Path::empty(), false),
        }
    }

    fn get_through(&self, data: &Value, rest: &Path) -> Result<Value, PathError> {
        match self {
            Segment::Wildcard { flatten } => Self::wildcard_get(data, rest, *flatten),
            _ => rest.get(&self.get(data)?),
        }
    }

    fn wildcard_get(data: &Value, rest: &Path, flatten: bool) -> Result<Value, PathError> {
        if data.is_null_or_empty() {
            return Ok(Value::Null);
        }

        let Value::Array(array) = data else {
            return Err(PathError::WildcardOnNonArray(data.type_name()));
        };

        let mut values = Vec::with_capacity(array.len());
        for element in array.iter() {
            match rest.get(element)? {
                Value::Null => {}
                Value::Array(inner) if flatten => values.extend(inner.iter().cloned()),
                value => values.push(value),
            }
        }

        Ok(Value::Array(Array::new(values)))
    }

    fn set(&self, data: &Value, value: Value) -> Result<Value, PathError> {
        match (self, data) {
            (Segment::Field(field), Value::Container(container)) => {
                Ok(Value::Container(container.set_field(field.clone(), value)))
            }
            (Segment::Field(field), _) => Err(PathError::NotAContainer {
                found: data.type_name(),
                field: field.clone(),
            }),
            (Segment::Index(Some(index)), Value::Array(array)) => {
                Ok(Value::Array(array.set_element(*index, value)))
            }
            (Segment::Index(None), Value::Array(array)) => match value {
                Value::Array(items) => Ok(Value::Array(array.extend(items.iter().cloned()))),
                value => Ok(Value::Array(array.push(value))),
            },
            (Segment::Index(_), _) => Err(PathError::NotAnArray {
                found: data.type_name(),
                index: self.to_string(),
            }),
            (Segment::Wildcard { .. }, _) => Err(PathError::WildcardSet),
        }
    }

    fn create(&self) -> Value {
        match self {
            Segment::Field(_) => Value::Container(Container::new()),
            Segment::Index(_) | Segment::Wildcard { .. } => Value::Array(Array::default()),
        }
    }

    fn accepts(&self, data: &Value) -> bool {
        match self {
            Segment::Field(_) => matches!(data, Value::Container(_)),
            Segment::Index(_) | Segment::Wildcard { .. } => matches!(data, Value::Array(_)),
        }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(field) => {
                write!(f, "{}", DELIMITER)?;
                field.chars().try_for_each(|c| {
                    if matches!(c, ESCAPE | DELIMITER | INDEX_OPEN | INDEX_CLOSE) {
                        write!(f, "{}{}", ESCAPE, c)
                    } else {
                        write!(f, "{}", c)
                    }
                })
            }
            Segment::Index(Some(index)) => write!(f, "[{}]", index),
            Segment::Index(None) => write!(f, "[]"),
            Segment::Wildcard { .. } => write!(f, "[*]"),
        }
    }
}

/// Parsed address into a [`Value`].
///
/// The canonical text form prefixes every field with `.` and escapes `\`, `.`,
/// `[` and `]` inside field names, so `Path::parse(&p.to_string())` yields `p`
/// again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: SmallVec<[Segment; 4]>,
}

impl Path {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a path from segments, resetting wildcard flattening so that only
    /// the last wildcard keeps its results nested.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut segments: SmallVec<[Segment; 4]> = segments.into_iter().collect();
        let last = segments
            .iter()
            .rposition(|s| matches!(s, Segment::Wildcard { .. }));
        for (i, segment) in segments.iter_mut().enumerate() {
            if let Segment::Wildcard { flatten } = segment {
                *flatten = Some(i) != last;
            }
        }
        Path { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn parse(path: &str) -> Result<Self, PathError> {
        let chars: Vec<char> = path.chars().collect();
        let mut segments: SmallVec<[Segment; 4]> = SmallVec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                DELIMITER => {
                    i += 1;
                    continue;
                }
                INDEX_OPEN if chars.get(i + 1) == Some(&WILDCARD) => {
                    if chars.get(i + 2) != Some(&INDEX_CLOSE) {
                        return Err(PathError::UnclosedWildcard(path.to_string()));
                    }
                    segments.push(Segment::Wildcard { flatten: true });
                    i += 3;
                }
                INDEX_OPEN => {
                    let (segment, next) = Self::consume_bracketed(path, &chars, i)?;
                    segments.push(segment);
                    i = next;
                }
                _ => {
                    let (segment, next) = Self::consume_field(path, &chars, i)?;
                    segments.push(segment);
                    i = next;
                }
            }
        }

        Ok(Path::from_segments(segments))
    }

    fn consume_field(path: &str, chars: &[char], start: usize) -> Result<(Segment, usize), PathError> {
        let mut field = String::new();
        let mut escaped = false;
        let mut end = start;

        while end < chars.len() {
            let c = chars[end];
            if escaped {
                field.push(c);
                escaped = false;
            } else if c == ESCAPE {
                escaped = true;
            } else if c == DELIMITER || c == INDEX_OPEN {
                break;
            } else {
                field.push(c);
            }
            end += 1;
        }

        if escaped {
            return Err(PathError::TrailingEscape(path.to_string()));
        }

        Ok((Segment::Field(field.into()), end))
    }

    fn consume_bracketed(
        path: &str,
        chars: &[char],
        open: usize,
    ) -> Result<(Segment, usize), PathError> {
        let start = open + 1;
        let close = chars[start..]
            .iter()
            .position(|&c| c == INDEX_CLOSE)
            .map(|offset| start + offset);
        let content: String = chars[start..close.unwrap_or(chars.len())].iter().collect();

        let Some(close) = close else {
            return Err(PathError::UnclosedBracket {
                path: path.to_string(),
                content,
            });
        };

        let segment = if content.is_empty() {
            Segment::Index(None)
        } else if content.chars().all(|c| c.is_ascii_digit()) {
            let index = content
                .parse::<usize>()
                .map_err(|_| PathError::InvalidIndex(content.clone()))?;
            Segment::Index(Some(index))
        } else {
            Segment::Field(content.into())
        };

        Ok((segment, close + 1))
    }

    /// Reads the value at this path. Missing fields and out-of-range indices
    /// read as Null; stepping into a value of the wrong variant is an error.
    pub fn get(&self, root: &Value) -> Result<Value, PathError> {
        match self.segments.split_first() {
            None => Ok(root.clone()),
            Some((head, rest)) => head.get_through(root, &Path::from_segments(rest.iter().cloned())),
        }
    }

    /// Returns a copy of `root` with `value` written at this path. Missing or
    /// empty intermediates are created from the segment kind.
    pub fn set(&self, root: &Value, value: Value) -> Result<Value, PathError> {
        self.set_at(root, value, 0)
    }

    fn set_at(&self, data: &Value, value: Value, position: usize) -> Result<Value, PathError> {
        let Some(segment) = self.segments.get(position) else {
            return Ok(value);
        };

        let created;
        let data = if data.is_null() || (data.is_null_or_empty() && !segment.accepts(data)) {
            created = segment.create();
            &created
        } else {
            data
        };

        let next = segment.get(data)?;
        let value = self.set_at(&next, value, position + 1)?;
        segment.set(data, value)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.segments.iter().try_for_each(|s| write!(f, "{}", s))
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn obj(entries: Vec<(&str, Value)>) -> Value {
        Value::Container(entries.into_iter().collect())
    }

    fn arr(values: Vec<Value>) -> Value {
        Value::Array(Array::new(values))
    }

    #[rstest]
    #[case::fields(".a.b", vec![Segment::Field("a".into()), Segment::Field("b".into())])]
    #[case::no_leading_dot("a.b", vec![Segment::Field("a".into()), Segment::Field("b".into())])]
    #[case::index(".a[2]", vec![Segment::Field("a".into()), Segment::Index(Some(2))])]
    #[case::append(".a[]", vec![Segment::Field("a".into()), Segment::Index(None)])]
    #[case::bracketed_field("[a.b]", vec![Segment::Field("a.b".into())])]
    #[case::escaped(r".a\.b", vec![Segment::Field("a.b".into())])]
    #[case::wildcards(".a[*].b[*]", vec![
        Segment::Field("a".into()),
        Segment::Wildcard { flatten: true },
        Segment::Field("b".into()),
        Segment::Wildcard { flatten: false },
    ])]
    #[case::empty("", vec![])]
    fn test_parse(#[case] input: &str, #[case] expected: Vec<Segment>) {
        assert_eq!(Path::parse(input), Ok(Path::from_segments(expected)));
    }

    #[rstest]
    #[case::unclosed(".a[1", PathError::UnclosedBracket { path: ".a[1".to_string(), content: "1".to_string() })]
    #[case::trailing_escape(r".a\", PathError::TrailingEscape(r".a\".to_string()))]
    #[case::wildcard_without_close("[*x.y", PathError::UnclosedWildcard("[*x.y".to_string()))]
    #[case::wildcard_at_end(".a[*", PathError::UnclosedWildcard(".a[*".to_string()))]
    fn test_parse_error(#[case] input: &str, #[case] expected: PathError) {
        assert_eq!(Path::parse(input), Err(expected));
    }

    #[rstest]
    #[case(".a.b[0][*].c")]
    #[case(".a[]")]
    #[case(r".we\.ird\[\]\\name")]
    #[case(".0.1")]
    fn test_round_trip(#[case] input: &str) {
        assert_eq!(Path::parse(input).map(|p| p.to_string()), Ok(input.to_string()));
    }

    #[test]
    fn test_get_missing_is_null() {
        let root = obj(vec![("a", arr(vec![1.into()]))]);

        assert_eq!(Path::parse(".b.c").and_then(|p| p.get(&root)), Ok(Value::Null));
        assert_eq!(Path::parse(".a[5]").and_then(|p| p.get(&root)), Ok(Value::Null));
    }

    #[test]
    fn test_get_wrong_variant_is_type_mismatch() {
        let root = obj(vec![("a", 1.into())]);
        let err = Path::parse(".a[0]").and_then(|p| p.get(&root)).unwrap_err();

        assert!(err.is_type_mismatch());
        assert_eq!(
            err,
            PathError::NotAnArray {
                found: "number",
                index: "[0]".to_string()
            }
        );
    }

    #[test]
    fn test_get_wildcard_flattens_all_but_last() {
        let root = obj(vec![(
            "a",
            arr(vec![
                obj(vec![("b", arr(vec![obj(vec![("c", 1.into())]), obj(vec![("c", 2.into())])]))]),
                obj(vec![("b", arr(vec![obj(vec![("c", 3.into())])]))]),
                obj(vec![]),
            ]),
        )]);

        assert_eq!(
            Path::parse(".a[*].b[*].c").and_then(|p| p.get(&root)),
            Ok(arr(vec![1.into(), 2.into(), 3.into()]))
        );
        assert_eq!(
            Path::parse(".a[*].b").and_then(|p| p.get(&root)).map(|v| v.as_array().map(Array::len)),
            Ok(Some(2))
        );
    }

    #[test]
    fn test_set_creates_intermediates() {
        let updated = Path::parse(".a[2].b").and_then(|p| p.set(&Value::Null, "x".into()));

        assert_eq!(
            updated,
            Ok(obj(vec![(
                "a",
                arr(vec![Value::Null, Value::Null, obj(vec![("b", "x".into())])])
            )]))
        );
    }

    #[test]
    fn test_set_never_mutates_input() {
        let root = obj(vec![("a", 1.into())]);
        let updated = Path::parse(".a").and_then(|p| p.set(&root, 2.into()));

        assert_eq!(root, obj(vec![("a", 1.into())]));
        assert_eq!(updated, Ok(obj(vec![("a", 2.into())])));
    }

    #[test]
    fn test_set_append_extends_with_array_elements() {
        let root = obj(vec![("a", arr(vec![1.into()]))]);
        let path = Path::parse(".a[]");

        assert_eq!(
            path.clone().and_then(|p| p.set(&root, arr(vec![2.into(), 3.into()]))),
            Ok(obj(vec![("a", arr(vec![1.into(), 2.into(), 3.into()]))]))
        );
        assert_eq!(
            path.and_then(|p| p.set(&root, 2.into())),
            Ok(obj(vec![("a", arr(vec![1.into(), 2.into()]))]))
        );
    }

    #[test]
    fn test_set_replaces_empty_value_of_wrong_variant() {
        let root = obj(vec![("a", "".into())]);

        assert_eq!(
            Path::parse(".a.b").and_then(|p| p.set(&root, 1.into())),
            Ok(obj(vec![("a", obj(vec![("b", 1.into())]))]))
        );
    }

    #[test]
    fn test_set_through_primitive_fails() {
        let root = obj(vec![("a", 1.into())]);

        assert!(matches!(
            Path::parse(".a.b").and_then(|p| p.set(&root, 1.into())),
            Err(PathError::NotAContainer { found: "number", .. })
        ));
    }

    #[test]
    fn test_set_through_wildcard_fails() {
        assert_eq!(
            Path::parse(".a[*]").and_then(|p| p.set(&Value::Null, 1.into())),
            Err(PathError::WildcardSet)
        );
    }
}
