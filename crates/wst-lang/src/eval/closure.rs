use std::fmt;

use smol_str::SmolStr;

use super::Evaluator;
use super::error::EvalError;
use super::frame::{self, FrameRef, Link};
use super::registry::Callable;
use super::signature::ParamKind;
use crate::Shared;
use crate::value::Value;

/// Argument passed to a registered function: data, or a closure for
/// closure-typed parameters.
#[derive(Debug, Clone)]
pub enum RuntimeValue {
    Value(Value),
    Closure(Closure),
}

impl RuntimeValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            RuntimeValue::Value(_) => ParamKind::Value,
            RuntimeValue::Closure(_) => ParamKind::Closure,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Value(value) => value.type_name(),
            RuntimeValue::Closure(_) => "closure",
        }
    }

    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            RuntimeValue::Value(value) => Ok(value),
            RuntimeValue::Closure(closure) => Err(EvalError::Internal(format!(
                "closure `{}` used where a value was expected",
                closure.name()
            ))),
        }
    }
}

impl From<Value> for RuntimeValue {
    fn from(value: Value) -> Self {
        RuntimeValue::Value(value)
    }
}

impl From<Closure> for RuntimeValue {
    fn from(closure: Closure) -> Self {
        RuntimeValue::Closure(closure)
    }
}

/// Partially applied function. `None` slots are free parameters, filled in
/// order by [`Closure::bind_next_free_parameter`] or at execution time.
#[derive(Clone)]
pub struct Closure {
    callable: Shared<Callable>,
    args: Vec<Option<RuntimeValue>>,
    captured: Option<FrameRef>,
}

impl Closure {
    pub fn new(callable: Shared<Callable>, args: Vec<Option<RuntimeValue>>, captured: Option<FrameRef>) -> Self {
        Closure {
            callable,
            args,
            captured,
        }
    }

    pub fn name(&self) -> &SmolStr {
        self.callable.name()
    }

    pub fn free_parameters(&self) -> usize {
        self.args.iter().filter(|arg| arg.is_none()).count()
    }

    pub fn is_fully_bound(&self) -> bool {
        self.free_parameters() == 0
    }

    pub fn bind_next_free_parameter(&self, value: impl Into<RuntimeValue>) -> Result<Closure, EvalError> {
        let slot = self
            .args
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| self.arity_error(self.free_parameters() + 1))?;

        let mut bound = self.clone();
        bound.args[slot] = Some(value.into());
        Ok(bound)
    }

    fn arity_error(&self, given: usize) -> EvalError {
        EvalError::InvalidNumberOfArguments {
            function: self.name().clone(),
            expected: self.free_parameters(),
            given,
        }
    }

    /// Binds `args` to the remaining free parameters and runs the function.
    /// The new frame is chained to the frame captured when the closure was
    /// built, never to the caller's.
    pub fn execute(&self, evaluator: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
        if args.len() != self.free_parameters() {
            return Err(self.arity_error(args.len()));
        }

        let mut supplied = args.into_iter();
        let args = self
            .args
            .iter()
            .map(|slot| match slot {
                Some(arg) => Some(arg.clone()),
                None => supplied.next().map(RuntimeValue::Value),
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.arity_error(0))?;

        evaluator.invoke(&self.callable, args, self.captured.clone().map(Link::Captured))
    }

    /// A copy whose captured frames are detached from the originals.
    pub fn snapshot(&self) -> Closure {
        Closure {
            callable: self.callable.clone(),
            args: self.args.clone(),
            captured: self.captured.as_ref().map(frame::snapshot),
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("function", self.name())
            .field("free", &self.free_parameters())
            .field("bound", &(self.args.len() - self.free_parameters()))
            .finish()
    }
}
