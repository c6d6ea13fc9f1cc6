use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::Value;
use crate::Shared;

type Source = Box<dyn Iterator<Item = Value> + Send>;

struct State {
    produced: Vec<Value>,
    source: Option<Source>,
}

/// Lazy sequence of values. The source is pulled at most once; what it yields
/// is kept, so every handle and every read sees the same elements.
#[derive(Clone)]
pub struct Stream(Shared<Mutex<State>>);

impl Stream {
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Value> + Send + 'static,
    {
        Stream(Shared::new(Mutex::new(State {
            produced: Vec::new(),
            source: Some(Box::new(iter)),
        })))
    }

    /// An already evaluated stream.
    pub fn from_values(values: Vec<Value>) -> Self {
        Stream(Shared::new(Mutex::new(State {
            produced: values,
            source: None,
        })))
    }

    /// All elements, evaluating the source on first use.
    pub fn to_vec(&self) -> Vec<Value> {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(source) = state.source.take() {
            state.produced.extend(source);
        }
        state.produced.clone()
    }

    /// A stream over deep copies of the elements that shares nothing with
    /// `self`.
    pub fn deep_copy(&self) -> Stream {
        Stream::from_values(self.to_vec().iter().map(Value::deep_copy).collect())
    }

    pub fn ptr_eq(&self, other: &Stream) -> bool {
        Shared::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn id(&self) -> usize {
        Shared::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream({:#x})", self.id())
    }
}
