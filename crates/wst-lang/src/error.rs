use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::ast::error::ParseError;
use crate::compiler::CompileError;
use crate::eval::error::{ErrorKind, EvalError};
use crate::eval::registry::LoaderError;
use crate::json::JsonError;
use crate::lexer::error::LexerError;
use crate::range::Range;

#[derive(Debug, thiserror::Error)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Json(#[from] JsonError),
}

impl InnerError {
    fn range(&self) -> Option<Range> {
        match self {
            InnerError::Lexer(err) => err.range(),
            InnerError::Parse(err) => err.token().map(|token| token.range),
            InnerError::Compile(err) => Some(err.range()),
            InnerError::Eval(_) | InnerError::Loader(_) | InnerError::Json(_) => None,
        }
    }

    fn is_eof(&self) -> bool {
        match self {
            InnerError::Parse(ParseError::UnexpectedEOFDetected) => true,
            InnerError::Parse(err) => err.token().is_some_and(|token| token.is_eof()),
            _ => false,
        }
    }
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The source code related to the error.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: impl Into<InnerError>) -> Self {
        let cause = cause.into();
        let source_code = source_code.into();
        let location = match cause.range() {
            _ if cause.is_eof() => eof_span(&source_code),
            Some(range) => span_of(&source_code, range),
            None => SourceSpan::new(SourceOffset::from(0), 1),
        };

        Self {
            cause,
            source_code,
            location,
        }
    }

    /// Attaches the range recorded by the evaluator, if any, to an
    /// evaluation error.
    pub fn with_range(source_code: impl Into<String>, cause: impl Into<InnerError>, range: Option<Range>) -> Self {
        let mut error = Error::from_error(source_code, cause);
        if let Some(range) = range {
            error.location = span_of(&error.source_code, range);
        }
        error
    }

    /// Category of an evaluation failure; `None` for errors raised before
    /// evaluation started.
    pub fn kind(&self) -> Option<ErrorKind> {
        match &self.cause {
            InnerError::Eval(err) => Some(err.kind()),
            InnerError::Compile(_) => Some(ErrorKind::Compile),
            _ => None,
        }
    }
}

fn offset(source_code: &str, line: u32, column: usize) -> SourceOffset {
    SourceOffset::from_location(source_code, line as usize, column)
}

fn span_of(source_code: &str, range: Range) -> SourceSpan {
    let start = offset(source_code, range.start.line, range.start.column);
    let end = offset(source_code, range.end.line, range.end.column);
    SourceSpan::new(start, std::cmp::max(end.offset().saturating_sub(start.offset()), 1))
}

fn eof_span(source_code: &str) -> SourceSpan {
    let lines = source_code.lines();
    let line = lines.clone().count().max(1);
    let column = lines.last().map(|l| l.chars().count()).unwrap_or(0) + 1;
    SourceSpan::new(offset(source_code, line as u32, column), 1)
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedCharacter(..)) => "LexerError::UnexpectedCharacter",
            InnerError::Parse(ParseError::UnexpectedToken(_)) => "ParseError::UnexpectedToken",
            InnerError::Parse(ParseError::UnexpectedEOFDetected) => "ParseError::UnexpectedEOFDetected",
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => "ParseError::ExpectedClosingParen",
            InnerError::Parse(ParseError::ExpectedClosingBrace(_)) => "ParseError::ExpectedClosingBrace",
            InnerError::Parse(ParseError::ExpectedClosingBracket(_)) => "ParseError::ExpectedClosingBracket",
            InnerError::Parse(ParseError::UnknownSelector(_)) => "ParseError::UnknownSelector",
            InnerError::Compile(CompileError::UndeclaredVariable { .. }) => "CompileError::UndeclaredVariable",
            InnerError::Compile(CompileError::Arity { .. }) => "CompileError::Arity",
            InnerError::Compile(CompileError::MalformedPath { .. }) => "CompileError::MalformedPath",
            InnerError::Compile(CompileError::MergeModeNotApplicable { .. }) => "CompileError::MergeModeNotApplicable",
            InnerError::Compile(CompileError::MisplacedIteration { .. }) => "CompileError::MisplacedIteration",
            InnerError::Eval(EvalError::Path(_)) => "EvalError::Path",
            InnerError::Eval(EvalError::InvalidTypes { .. }) => "EvalError::InvalidTypes",
            InnerError::Eval(EvalError::Merge(_)) => "EvalError::Merge",
            InnerError::Eval(EvalError::Overload(_)) => "EvalError::Overload",
            InnerError::Eval(EvalError::UserDefined(_)) => "EvalError::UserDefined",
            InnerError::Eval(EvalError::Cancelled) => "EvalError::Cancelled",
            InnerError::Eval(EvalError::StackOverflow(_)) => "EvalError::StackOverflow",
            InnerError::Eval(EvalError::ZeroDivision) => "EvalError::ZeroDivision",
            InnerError::Eval(EvalError::UndefinedVariable(_)) => "EvalError::UndefinedVariable",
            InnerError::Eval(EvalError::InvalidNumberOfArguments { .. }) => "EvalError::InvalidNumberOfArguments",
            InnerError::Eval(EvalError::UnboundFreeParameter(_)) => "EvalError::UnboundFreeParameter",
            InnerError::Eval(EvalError::Internal(_)) => "EvalError::Internal",
            InnerError::Loader(LoaderError::UnknownScheme(_)) => "LoaderError::UnknownScheme",
            InnerError::Loader(LoaderError::NotFound(_)) => "LoaderError::NotFound",
            InnerError::Loader(LoaderError::Io { .. }) => "LoaderError::Io",
            InnerError::Json(JsonError::Parse(_)) => "JsonError::Parse",
            InnerError::Json(JsonError::Serialize(_)) => "JsonError::Serialize",
        };

        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(_) => Some("Check for characters that are not part of the language.".to_string()),
            InnerError::Parse(ParseError::UnexpectedEOFDetected) => {
                Some("Input ended unexpectedly. Check for missing closing brackets or incomplete expressions.".to_string())
            }
            InnerError::Parse(ParseError::UnknownSelector(_)) => Some(
                "Selectors are `where`, `sortBy`, `sortByDescending`, `groupBy` and `uniqueBy`.".to_string(),
            ),
            InnerError::Parse(_) => Some("Check for syntax errors or misplaced tokens.".to_string()),
            InnerError::Compile(CompileError::UndeclaredVariable { name, .. }) => {
                Some(format!("Declare `{name}` with `var {name}: ...` before reading it."))
            }
            InnerError::Compile(CompileError::Arity { function, accepted, .. }) => {
                Some(format!("`{function}` accepts {accepted} argument(s)."))
            }
            InnerError::Eval(EvalError::StackOverflow(_)) => {
                Some("Check for unbounded recursion, or raise the frame limit.".to_string())
            }
            InnerError::Eval(EvalError::Overload(_)) => {
                Some("Check the number and kind of the arguments passed to the function.".to_string())
            }
            InnerError::Eval(EvalError::ZeroDivision) => Some("Check the divisor before dividing.".to_string()),
            InnerError::Loader(LoaderError::UnknownScheme(_)) => {
                Some("Register a loader for the scheme, or use `file://`.".to_string())
            }
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(miette::LabeledSpan::new_with_span(
            Some(self.cause.to_string()),
            self.location,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Position;
    use rstest::rstest;

    #[rstest]
    #[case::first_line("a: 1", Range::new(Position::new(1, 4), Position::new(1, 5)), 3, 1)]
    #[case::second_line("a: 1\nb: x", Range::new(Position::new(2, 4), Position::new(2, 5)), 8, 1)]
    #[case::empty_range("abc", Range::new(Position::new(1, 2), Position::new(1, 2)), 1, 1)]
    fn test_span_of(#[case] source: &str, #[case] range: Range, #[case] offset: usize, #[case] len: usize) {
        let span = span_of(source, range);
        assert_eq!(span.offset(), offset);
        assert_eq!(span.len(), len);
    }

    #[test]
    fn test_compile_error_location() {
        let source = "a: 1\nb: y";
        let cause = CompileError::UndeclaredVariable {
            name: "y".into(),
            range: Range::new(Position::new(2, 4), Position::new(2, 5)),
        };
        let error = Error::from_error(source, cause);

        assert_eq!(error.location.offset(), 8);
        assert_eq!(error.kind(), Some(ErrorKind::Compile));
        assert_eq!(
            error.code().map(|c| c.to_string()),
            Some("CompileError::UndeclaredVariable".to_string())
        );
    }

    #[test]
    fn test_eval_error_uses_recorded_range() {
        let source = "a: 1\nb: 1 / 0";
        let range = Range::new(Position::new(2, 4), Position::new(2, 9));
        let error = Error::with_range(source, EvalError::ZeroDivision, Some(range));

        assert_eq!(error.location.offset(), 8);
        assert_eq!(error.location.len(), 5);
        assert_eq!(error.kind(), Some(ErrorKind::Type));
    }

    #[test]
    fn test_eof_location() {
        let error = Error::from_error("f(1", ParseError::UnexpectedEOFDetected);
        assert_eq!(error.location.offset(), 3);
    }
}
