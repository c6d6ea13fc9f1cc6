//! Tree-walking evaluator for compiled programs.
//!
//! Every function activation gets a [`frame::Frame`]. A call site's frame
//! becomes the parent of the callee's frame, which only matters when the
//! callee was compiled to inherit parent variables. Closures chain their
//! frame to the frame they were built in instead.
pub(crate) mod builtin;
pub mod cancel;
pub mod closure;
pub mod error;
pub mod frame;
pub mod overload;
pub mod registry;
pub mod signature;

use smol_str::SmolStr;

use crate::Shared;
use crate::ast::constants;
use crate::ir::{FieldMapping, FunctionCall, FunctionDefinition, FunctionReference, MappingTarget, ValueSource};
use crate::range::Range;
use crate::value::merge::{self, MergeMode};
use crate::value::{Path, Value};
use cancel::CancellationToken;
use closure::{Closure, RuntimeValue};
use error::EvalError;
use frame::{Frame, FrameRef, Link};
use registry::{Callable, ProgramFunctions, Registry};

pub const DEFAULT_FRAME_LIMIT: usize = 480;

#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Shared<Registry>,
    program: Shared<ProgramFunctions>,
    package: SmolStr,
    frame_limit: usize,
    depth: usize,
    token: CancellationToken,
    error_range: Option<Range>,
    /// Outputs collecting `side` writes, innermost last.
    sides: Vec<Value>,
    /// Receives `side` writes when no `withSides` is active.
    root_frame: Option<FrameRef>,
}

impl Evaluator {
    pub fn new(registry: Shared<Registry>, package: impl Into<SmolStr>) -> Self {
        Self {
            registry,
            program: Shared::default(),
            package: package.into(),
            frame_limit: DEFAULT_FRAME_LIMIT,
            depth: 0,
            token: CancellationToken::new(),
            error_range: None,
            sides: Vec::new(),
            root_frame: None,
        }
    }

    pub fn with_frame_limit(mut self, frame_limit: usize) -> Self {
        self.frame_limit = frame_limit;
        self
    }

    /// Resolves the program's own functions ahead of the registry.
    pub fn with_program(mut self, program: &crate::ir::Program) -> Self {
        self.package = program.package.clone();
        self.program = Shared::new(ProgramFunctions::new(program));
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Source range of the innermost call that failed during the last run.
    pub fn error_range(&self) -> Option<Range> {
        self.error_range
    }

    pub(crate) fn clear_error_range(&mut self) {
        self.error_range = None;
    }

    pub(crate) fn set_error_range(&mut self, range: Range) {
        self.error_range = Some(range);
    }

    /// An evaluator for a worker thread. Its token can be cancelled on its own
    /// and also follows this evaluator's token. It has no root output, so side
    /// writes must be caught with [`Evaluator::catch_sides`].
    pub(crate) fn fork(&self) -> Evaluator {
        Evaluator {
            token: self.token.child(),
            error_range: None,
            sides: Vec::new(),
            root_frame: None,
            ..self.clone()
        }
    }

    pub fn run(&mut self, root: &FunctionDefinition, input: Value) -> Result<Value, EvalError> {
        self.error_range = None;
        self.depth = 0;
        self.sides.clear();

        let frame = self.enter(root, vec![input], None)?;
        self.root_frame = Some(frame.clone());
        let result = self.execute_frame(root, &frame);
        self.root_frame = None;
        result
    }

    /// Runs `f` with a fresh output for `side` writes and returns what it
    /// collected alongside the result.
    pub(crate) fn catch_sides<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<(T, Value), EvalError> {
        self.sides.push(Value::Null);
        let result = f(self);
        let caught = self.sides.pop().unwrap_or_default();
        result.map(|value| (value, caught))
    }

    pub(crate) fn write_side(&mut self, path: &Path, mode: MergeMode, value: Value) -> Result<(), EvalError> {
        if let Some(caught) = self.sides.last_mut() {
            *caught = merge::write(mode, path, caught, value)?;
        } else if let Some(root) = &self.root_frame {
            let merged = merge::write(mode, path, &frame::this(root), value)?;
            frame::define(root, constants::THIS, merged);
        } else {
            tracing::debug!(%path, "side write outside of a run dropped");
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), EvalError> {
        if self.token.is_cancelled() {
            tracing::debug!("evaluation cancelled");
            Err(EvalError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn resolve(
        &self,
        reference: &FunctionReference,
        arity: usize,
        arg_kind: impl Fn(usize) -> Option<signature::ParamKind>,
    ) -> Result<Shared<Callable>, EvalError> {
        let groups = self.registry.candidates(reference, &self.package, &self.program);
        Ok(overload::select(reference, &groups, arity, arg_kind)?)
    }

    pub(crate) fn invoke(
        &mut self,
        callable: &Callable,
        args: Vec<RuntimeValue>,
        parent: Option<Link>,
    ) -> Result<Value, EvalError> {
        match callable {
            Callable::Defined { def, .. } => {
                let args = args
                    .into_iter()
                    .map(RuntimeValue::into_value)
                    .collect::<Result<Vec<_>, _>>()?;
                self.execute_function(def, args, parent)
            }
            Callable::Builtin { func, .. } => func(self, args),
        }
    }

    /// Runs a closure with values for its free parameters.
    pub fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Result<Value, EvalError> {
        self.check_cancelled()?;
        closure.execute(self, args)
    }

    /// Calls a registered function by name, as `callFn` does.
    pub fn call_function(
        &mut self,
        reference: &FunctionReference,
        args: Vec<RuntimeValue>,
    ) -> Result<Value, EvalError> {
        self.check_cancelled()?;
        let callable = self.resolve(reference, args.len(), |i| Some(args[i].kind()))?;
        self.invoke(&callable, args, None)
    }

    fn execute_function(
        &mut self,
        def: &FunctionDefinition,
        args: Vec<Value>,
        parent: Option<Link>,
    ) -> Result<Value, EvalError> {
        let frame = self.enter(def, args, parent)?;
        self.execute_frame(def, &frame)
    }

    fn enter(&self, def: &FunctionDefinition, args: Vec<Value>, parent: Option<Link>) -> Result<FrameRef, EvalError> {
        if args.len() != def.args.len() {
            return Err(EvalError::InvalidNumberOfArguments {
                function: def.name.clone(),
                expected: def.args.len(),
                given: args.len(),
            });
        }
        if self.depth >= self.frame_limit {
            return Err(EvalError::StackOverflow(self.frame_limit));
        }

        let frame = Frame::new(def.name.clone(), def.inherit_parent_vars, parent);
        for (arg, value) in def.args.iter().zip(args) {
            frame::define(&frame, arg.name.clone(), value);
        }
        Ok(frame)
    }

    fn execute_frame(&mut self, def: &FunctionDefinition, frame: &FrameRef) -> Result<Value, EvalError> {
        tracing::trace!(function = %def.name, depth = self.depth, "enter frame");
        self.depth += 1;
        let result = def
            .mappings
            .iter()
            .try_for_each(|mapping| self.execute_mapping(frame, mapping));
        self.depth -= 1;

        result.map(|_| frame::this(frame))
    }

    fn execute_mapping(&mut self, frame: &FrameRef, mapping: &FieldMapping) -> Result<(), EvalError> {
        let value = self.eval_source(frame, &mapping.value)?.into_value()?;
        if !mapping.iterate_source {
            return self.write(frame, mapping, value);
        }

        let elements = match &value {
            Value::Null => Vec::new(),
            Value::Array(array) => array.to_vec(),
            Value::Stream(stream) => stream.to_vec(),
            Value::Container(container) => container.values().cloned().collect(),
            Value::Primitive(_) => return Err(EvalError::invalid_types(constants::ITERATE, &[&value])),
        };
        elements
            .into_iter()
            .try_for_each(|element| self.write(frame, mapping, element))
    }

    fn write(&mut self, frame: &FrameRef, mapping: &FieldMapping, value: Value) -> Result<(), EvalError> {
        let mode = mapping.mode.unwrap_or_default();

        match &mapping.target {
            MappingTarget::Field { path } => {
                if value.is_null_or_empty() {
                    return Ok(());
                }
                let merged = merge::write(mode, path, &frame::this(frame), value)?;
                frame::define(frame, constants::THIS, merged);
            }
            MappingTarget::Variable { name, path }
                if path.is_empty() && matches!(mapping.mode, None | Some(MergeMode::Replace)) =>
            {
                frame::write(frame, name, value);
            }
            MappingTarget::Variable { name, path } => {
                let current = frame::read(frame, name).unwrap_or_default();
                let updated = if value.is_null_or_empty() {
                    current
                } else {
                    merge::write(mode, path, &current, value)?
                };
                frame::write(frame, name, updated);
            }
            MappingTarget::Side { path } => {
                if !value.is_null_or_empty() {
                    self.write_side(path, mode, value)?;
                }
            }
            MappingTarget::CustomSink { call } => {
                let mut args = self.eval_args(frame, &call.args)?;
                args.push(RuntimeValue::Value(value));
                self.dispatch(frame, &call.reference, args, call.range)?;
            }
        }

        Ok(())
    }

    fn eval_source(&mut self, frame: &FrameRef, source: &ValueSource) -> Result<RuntimeValue, EvalError> {
        match source {
            ValueSource::ConstInt(i) => Ok(Value::from(*i).into()),
            ValueSource::ConstFloat(f) => Ok(Value::from(*f).into()),
            ValueSource::ConstString(s) => Ok(Value::from(s.clone()).into()),
            ValueSource::ConstBool(b) => Ok(Value::from(*b).into()),
            ValueSource::FromLocal(name) => frame::read(frame, name)
                .map(RuntimeValue::Value)
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            ValueSource::FreeParameter(name) => Err(EvalError::UnboundFreeParameter(name.clone())),
            ValueSource::FunctionCall(call) => self.eval_call(frame, call),
        }
    }

    fn eval_args(&mut self, frame: &FrameRef, args: &[ValueSource]) -> Result<Vec<RuntimeValue>, EvalError> {
        args.iter().map(|arg| self.eval_source(frame, arg)).collect()
    }

    fn eval_call(&mut self, frame: &FrameRef, call: &FunctionCall) -> Result<RuntimeValue, EvalError> {
        let result = if call.build_closure {
            self.build_closure(frame, call).map(RuntimeValue::Closure)
        } else {
            self.eval_args(frame, &call.args)
                .and_then(|args| self.dispatch(frame, &call.reference, args, call.range))
                .map(RuntimeValue::Value)
        };

        if result.is_err() && self.error_range.is_none() {
            self.error_range = Some(call.range);
        }
        result
    }

    fn dispatch(
        &mut self,
        frame: &FrameRef,
        reference: &FunctionReference,
        args: Vec<RuntimeValue>,
        range: Range,
    ) -> Result<Value, EvalError> {
        self.check_cancelled()?;
        let callable = self.resolve(reference, args.len(), |i| Some(args[i].kind()))?;
        let result = self.invoke(&callable, args, Some(Link::Caller(frame.clone())));

        if result.is_err() && self.error_range.is_none() {
            self.error_range = Some(range);
        }
        result
    }

    fn build_closure(&mut self, frame: &FrameRef, call: &FunctionCall) -> Result<Closure, EvalError> {
        let args = call
            .args
            .iter()
            .map(|arg| match arg {
                ValueSource::FreeParameter(_) => Ok(None),
                arg => self.eval_source(frame, arg).map(Some),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let callable = self.resolve(&call.reference, args.len(), |i| {
            args[i].as_ref().map(RuntimeValue::kind)
        })?;
        Ok(Closure::new(callable, args, Some(frame.clone())))
    }
}
