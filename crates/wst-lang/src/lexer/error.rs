use thiserror::Error;

use crate::range::Range;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character `{0}`")]
    UnexpectedCharacter(char, Range),
}

impl LexerError {
    pub fn range(&self) -> Option<Range> {
        match self {
            LexerError::UnexpectedCharacter(_, range) => Some(*range),
        }
    }
}
