use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;
use thiserror::Error;

use super::overload::OverloadError;
use crate::value::{MergeError, PathError};

/// Reported category of an evaluation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Compile,
    Type,
    Overload,
    User,
    Cancellation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Compile => "compile",
            ErrorKind::Type => "type",
            ErrorKind::Overload => "overload",
            ErrorKind::User => "user",
            ErrorKind::Cancellation => "cancellation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(r#"Invalid types for "{name}", got {}"#, args.join(", "))]
    InvalidTypes {
        name: SmolStr,
        args: Vec<&'static str>,
    },
    #[error(transparent)]
    Merge(MergeError),
    #[error(transparent)]
    Overload(#[from] OverloadError),
    #[error("{0}")]
    UserDefined(String),
    #[error("Evaluation was cancelled")]
    Cancelled,
    #[error("Maximum call depth {0} exceeded")]
    StackOverflow(usize),
    #[error("Divided by 0")]
    ZeroDivision,
    #[error("Undefined variable \"{0}\"")]
    UndefinedVariable(SmolStr),
    #[error("\"{function}\" expects {expected} argument(s), got {given}")]
    InvalidNumberOfArguments {
        function: SmolStr,
        expected: usize,
        given: usize,
    },
    #[error("Unbound free parameter \"{0}\" outside of a closure")]
    UnboundFreeParameter(SmolStr),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EvalError {
    pub fn invalid_types(name: impl Into<SmolStr>, args: &[&crate::value::Value]) -> Self {
        EvalError::InvalidTypes {
            name: name.into(),
            args: args.iter().map(|v| v.type_name()).collect(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Path(e) if e.is_type_mismatch() => ErrorKind::Type,
            EvalError::Path(_) => ErrorKind::Compile,
            EvalError::InvalidTypes { .. } | EvalError::Merge(_) | EvalError::ZeroDivision => ErrorKind::Type,
            EvalError::Overload(_) => ErrorKind::Overload,
            EvalError::UserDefined(_) => ErrorKind::User,
            EvalError::Cancelled => ErrorKind::Cancellation,
            EvalError::StackOverflow(_)
            | EvalError::UndefinedVariable(_)
            | EvalError::InvalidNumberOfArguments { .. }
            | EvalError::UnboundFreeParameter(_)
            | EvalError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }
}

impl From<MergeError> for EvalError {
    fn from(error: MergeError) -> Self {
        match error {
            MergeError::Path(e) => EvalError::Path(e),
            other => EvalError::Merge(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::type_mismatch(
        EvalError::Path(PathError::NotAContainer { found: "number", field: "a".into() }),
        ErrorKind::Type
    )]
    #[case::malformed_path(EvalError::Path(PathError::WildcardSet), ErrorKind::Compile)]
    #[case::merge(
        EvalError::from(MergeError::CannotAppend { found: "number" }),
        ErrorKind::Type
    )]
    #[case::merge_path(EvalError::from(MergeError::Path(PathError::WildcardSet)), ErrorKind::Compile)]
    #[case::user(EvalError::UserDefined("boom".into()), ErrorKind::User)]
    #[case::cancelled(EvalError::Cancelled, ErrorKind::Cancellation)]
    #[case::overflow(EvalError::StackOverflow(480), ErrorKind::Internal)]
    fn test_kind(#[case] error: EvalError, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_invalid_types_message() {
        let error = EvalError::invalid_types("sub", &[&"a".into(), &1.into()]);
        assert_eq!(error.to_string(), r#"Invalid types for "sub", got string, number"#);
    }
}
