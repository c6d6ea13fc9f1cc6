use smol_str::SmolStr;
use thiserror::Error;

use crate::range::Range;
use crate::value::{MergeMode, PathError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Undeclared variable `{name}`")]
    UndeclaredVariable { name: SmolStr, range: Range },
    #[error("`{function}` accepts {accepted} argument(s) but {given} were given in `{snippet}`")]
    Arity {
        function: SmolStr,
        accepted: String,
        given: usize,
        snippet: String,
        range: Range,
    },
    #[error("Malformed path `{path}`: {cause}")]
    MalformedPath {
        path: String,
        cause: PathError,
        range: Range,
    },
    #[error("`{mode}` cannot be used with {target}")]
    MergeModeNotApplicable {
        mode: MergeMode,
        target: &'static str,
        range: Range,
    },
    #[error("`[]` iterates only a function argument or a mapping value")]
    MisplacedIteration { range: Range },
}

impl CompileError {
    pub fn range(&self) -> Range {
        match self {
            CompileError::UndeclaredVariable { range, .. }
            | CompileError::Arity { range, .. }
            | CompileError::MalformedPath { range, .. }
            | CompileError::MergeModeNotApplicable { range, .. }
            | CompileError::MisplacedIteration { range } => *range,
        }
    }
}
