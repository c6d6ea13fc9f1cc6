use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use super::{C, V, as_closure, as_value, fixed, into_values};
use crate::ast::constants::{RETHROW_ERROR, TERNARY, TIMED, WITH_ERROR, WITH_SIDES, WITH_TIMEOUT};
use crate::eval::Evaluator;
use crate::eval::closure::RuntimeValue;
use crate::eval::error::EvalError;
use crate::eval::registry::Callable;
use crate::number::Number;
use crate::value::merge::{self, MergeMode};
use crate::value::{Container, Path, Value};

const SLEEP: &str = "sleep";
const FAIL: &str = "fail";

const SLEEP_SLICE: Duration = Duration::from_millis(10);
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

pub(super) fn functions() -> Vec<Callable> {
    vec![
        fixed(TERNARY, &[V, C], ternary),
        fixed(TERNARY, &[V, C, C], ternary),
        fixed(WITH_ERROR, &[C, C], with_error),
        fixed(RETHROW_ERROR, &[C, C], rethrow_error),
        fixed(TIMED, &[C, C], timed),
        fixed(WITH_TIMEOUT, &[C, V, C], with_timeout),
        fixed(WITH_SIDES, &[C], with_sides),
        fixed(SLEEP, &[V], sleep),
        fixed(FAIL, &[V], fail),
    ]
}

/// Evaluates only the selected branch. Without an else branch a false
/// condition yields Null.
fn ternary(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let condition = as_value(TERNARY, &args, 0)?.is_truthy();
    let branch = if condition { Some(1) } else { (args.len() > 2).then_some(2) };

    match branch {
        Some(i) => {
            let branch = as_closure(TERNARY, &args, i)?;
            evaluator.call_closure(branch, Vec::new())
        }
        None => Ok(Value::Null),
    }
}

/// The `$error` value handed to error handlers.
fn error_value(error: &EvalError) -> Value {
    Container::from_iter([
        ("cause", Value::from(error.to_string())),
        ("kind", Value::from(error.kind().as_str())),
    ])
    .into()
}

fn with_error(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let body = as_closure(WITH_ERROR, &args, 0)?;
    let handler = as_closure(WITH_ERROR, &args, 1)?;

    match evaluator.call_closure(body, Vec::new()) {
        Err(error) if !error.is_cancellation() => {
            tracing::debug!(%error, "handling error");
            evaluator.clear_error_range();
            evaluator.call_closure(handler, vec![error_value(&error)])
        }
        result => result,
    }
}

fn rethrow_error(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let body = as_closure(RETHROW_ERROR, &args, 0)?;
    let handler = as_closure(RETHROW_ERROR, &args, 1)?;

    match evaluator.call_closure(body, Vec::new()) {
        Err(error) if !error.is_cancellation() => {
            let range = evaluator.error_range();
            evaluator.clear_error_range();
            evaluator.call_closure(handler, vec![error_value(&error)])?;
            if let Some(range) = range {
                evaluator.set_error_range(range);
            }
            Err(error)
        }
        result => result,
    }
}

fn timed(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let body = as_closure(TIMED, &args, 0)?;
    let handler = as_closure(TIMED, &args, 1)?;

    let start = Instant::now();
    let result = evaluator.call_closure(body, Vec::new())?;
    let elapsed = Number::new(start.elapsed().as_secs_f64() * 1000.0);

    evaluator.call_closure(handler, vec![elapsed.into()])?;
    Ok(result)
}

fn millis(name: &str, value: &Value) -> Result<Duration, EvalError> {
    match value.as_number() {
        Some(n) if n.value() >= 0.0 && n.value().is_finite() => Ok(Duration::from_secs_f64(n.value() / 1000.0)),
        _ => Err(EvalError::invalid_types(name, &[value])),
    }
}

/// Runs the body on a worker thread with a child cancellation token, waiting
/// in short slices so that cancelling the caller stops the wait. The worker
/// sees a snapshot of the captured frames, so an abandoned body cannot
/// write into frames the caller keeps using. Its side writes are replayed
/// only when it finishes in time.
fn with_timeout(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let body = as_closure(WITH_TIMEOUT, &args, 0)?.snapshot();
    let deadline = millis(WITH_TIMEOUT, as_value(WITH_TIMEOUT, &args, 1)?)?;
    let fallback = as_closure(WITH_TIMEOUT, &args, 2)?;

    let mut worker = evaluator.fork();
    let token = worker.cancellation_token().clone();
    let (sender, receiver) = mpsc::channel();

    thread::Builder::new()
        .name(format!("wst-{}", body.name()))
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || {
            // The receiver is gone once the deadline has passed.
            let _ = sender.send(worker.catch_sides(|w| w.call_closure(&body, Vec::new())));
        })
        .map_err(|e| EvalError::Internal(format!("failed to spawn worker: {}", e)))?;

    let until = Instant::now() + deadline;
    loop {
        if evaluator.cancellation_token().is_cancelled() {
            token.cancel();
            return Err(EvalError::Cancelled);
        }

        let remaining = until.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining.min(SLEEP_SLICE)) {
            Ok(Ok((value, sides))) => {
                if !sides.is_null_or_empty() {
                    evaluator.write_side(&Path::empty(), MergeMode::Merge, sides)?;
                }
                return Ok(value);
            }
            Ok(Err(error)) if error.is_cancellation() => return Err(error),
            Ok(Err(error)) => {
                tracing::debug!(%error, "timed body failed, running fallback");
                return evaluator.call_closure(fallback, Vec::new());
            }
            Err(RecvTimeoutError::Timeout) if !remaining.is_zero() => continue,
            Err(_) => {
                tracing::debug!(deadline_ms = deadline.as_millis() as u64, "deadline passed, running fallback");
                token.cancel();
                return evaluator.call_closure(fallback, Vec::new());
            }
        }
    }
}

/// Merges the `side` writes made while running the body into its output.
fn with_sides(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let body = as_closure(WITH_SIDES, &args, 0)?;
    let (output, sides) = evaluator.catch_sides(|e| e.call_closure(body, Vec::new()))?;

    if sides.is_null_or_empty() {
        Ok(output)
    } else {
        Ok(merge::write(MergeMode::Merge, &Path::empty(), &output, sides)?)
    }
}

/// Sleeps in short slices so that cancellation is noticed promptly.
fn sleep(evaluator: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let duration = millis(SLEEP, as_value(SLEEP, &args, 0)?)?;
    let until = Instant::now() + duration;

    loop {
        if evaluator.cancellation_token().is_cancelled() {
            return Err(EvalError::Cancelled);
        }
        let remaining = until.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(Value::Null);
        }
        thread::sleep(remaining.min(SLEEP_SLICE));
    }
}

fn fail(_: &mut Evaluator, args: Vec<RuntimeValue>) -> Result<Value, EvalError> {
    let message = match into_values(FAIL, args)?.pop() {
        Some(Value::Primitive(p)) => p.to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Err(EvalError::UserDefined(message))
}
