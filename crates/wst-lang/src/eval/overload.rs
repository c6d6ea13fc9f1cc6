//! Overload selection.
//!
//! Candidates come in groups ordered by package search priority. Within a
//! group a candidate must accept the arity and the shape of every argument;
//! survivors are ranked so that a fixed arity beats a variadic match. The
//! first group with a unique best candidate wins.
use itertools::Itertools;
use thiserror::Error;

use super::registry::Callable;
use super::signature::ParamKind;
use crate::Shared;
use crate::ir::FunctionReference;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverloadError {
    #[error("Function `{0}` is not defined")]
    NotFound(FunctionReference),
    #[error(
        "No overload of `{reference}` accepts {given} argument(s); {count} candidate(s): {}",
        signatures.join(", ")
    )]
    NoMatch {
        reference: FunctionReference,
        given: usize,
        count: usize,
        signatures: Vec<String>,
    },
    #[error(
        "Call to `{reference}` is ambiguous; {count} candidates: {}",
        signatures.join(", ")
    )]
    Ambiguous {
        reference: FunctionReference,
        count: usize,
        signatures: Vec<String>,
    },
}

fn specificity(callable: &Callable) -> u8 {
    if callable.signature().is_variadic() { 0 } else { 1 }
}

fn describe<'a>(callables: impl Iterator<Item = &'a Shared<Callable>>) -> Vec<String> {
    callables
        .map(|c| format!("{}{}", c.name(), c.signature()))
        .collect()
}

pub fn select(
    reference: &FunctionReference,
    groups: &[&[Shared<Callable>]],
    arity: usize,
    arg_kind: impl Fn(usize) -> Option<ParamKind>,
) -> Result<Shared<Callable>, OverloadError> {
    for group in groups {
        let matching = group
            .iter()
            .filter(|c| c.signature().accepts(arity, &arg_kind))
            .max_set_by_key(|c| specificity(c));

        match matching.as_slice() {
            [] => continue,
            [callable] => {
                tracing::trace!(function = %reference, signature = %callable.signature(), "resolved overload");
                return Ok(Shared::clone(callable));
            }
            tied => {
                return Err(OverloadError::Ambiguous {
                    reference: reference.clone(),
                    count: tied.len(),
                    signatures: describe(tied.iter().copied()),
                });
            }
        }
    }

    let candidates = groups.iter().flat_map(|group| group.iter()).collect_vec();
    if candidates.is_empty() {
        return Err(OverloadError::NotFound(reference.clone()));
    }

    Err(OverloadError::NoMatch {
        reference: reference.clone(),
        given: arity,
        count: candidates.len(),
        signatures: describe(candidates.into_iter()),
    })
}
