use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use smol_str::SmolStr;

use super::{NULL, Value};
use crate::Shared;

#[derive(Debug, Clone, Default)]
struct Fields {
    entries: Vec<(SmolStr, Value)>,
    index: FxHashMap<SmolStr, usize>,
}

/// Keyed record with insertion-ordered keys.
///
/// Fields holding Null are treated as absent by equality and hashing, and the
/// order of keys never affects either.
#[derive(Clone, Default)]
pub struct Container(Shared<Fields>);

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.entries.len()
    }

    /// True when no field holds a non-null value.
    pub fn is_empty(&self) -> bool {
        self.0.entries.iter().all(|(_, v)| v.is_null())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.index.contains_key(key)
    }

    /// Missing fields read as Null.
    pub fn get_field(&self, key: &str) -> &Value {
        self.0
            .index
            .get(key)
            .map(|&i| &self.0.entries[i].1)
            .unwrap_or(&NULL)
    }

    pub fn set_field(&self, key: impl Into<SmolStr>, value: Value) -> Self {
        let mut container = self.clone();
        container.insert(key.into(), value);
        container
    }

    pub fn unset(&self, key: &str) -> Self {
        if !self.contains_key(key) {
            return self.clone();
        }

        self.iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Value)> {
        self.0.entries.iter().map(|(k, v)| (k, v))
    }

    /// Recursively merges `other` into `self`. Container fields on both sides are
    /// merged, anything else in `other` replaces the field.
    pub fn merge(&self, other: &Container) -> Self {
        other.iter().fold(self.clone(), |acc, (key, value)| {
            let merged = match (acc.get_field(key), value) {
                (Value::Container(a), Value::Container(b)) => Value::Container(a.merge(b)),
                _ => value.clone(),
            };
            acc.set_field(key.clone(), merged)
        })
    }

    fn insert(&mut self, key: SmolStr, value: Value) {
        let fields = Shared::make_mut(&mut self.0);
        match fields.index.get(&key) {
            Some(&i) => fields.entries[i].1 = value,
            None => {
                fields.index.insert(key.clone(), fields.entries.len());
                fields.entries.push((key, value));
            }
        }
    }

    fn present(&self) -> impl Iterator<Item = (&SmolStr, &Value)> {
        self.iter().filter(|(_, v)| !v.is_null())
    }
}

impl<K: Into<SmolStr>> FromIterator<(K, Value)> for Container {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut container = Container::new();
        for (key, value) in iter {
            container.insert(key.into(), value);
        }
        container
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        if Shared::ptr_eq(&self.0, &other.0) {
            return true;
        }

        self.present().count() == other.present().count()
            && self.present().all(|(key, value)| other.get_field(key) == value)
    }
}

impl Eq for Container {}

impl Hash for Container {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (count, sum) = self.present().fold((0usize, 0u64), |(count, sum), (key, value)| {
            let mut hasher = FxHasher::default();
            key.hash(&mut hasher);
            value.hash(&mut hasher);
            (count + 1, sum.wrapping_add(hasher.finish()))
        });
        count.hash(state);
        sum.hash(state);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
