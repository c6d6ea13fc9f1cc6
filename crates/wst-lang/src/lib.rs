//! `wst-lang` compiles and evaluates wst, a mapping language that reshapes
//! JSON-like data.
//!
//! A program is lexed and parsed into an AST, then the scope compiler turns
//! every block, branch and selector into a named function (see [`compiler`]).
//! The resulting [`ir::Program`] is registered with the [`Engine`] and run by
//! a tree-walking evaluator that gives each call its own frame.
//!
//! ## Examples
//!
//! ```rust
//! use wst_lang::{Engine, Value};
//!
//! let mut engine = Engine::default();
//! let input = wst_lang::json::parse(br#"{"items": [{"n": 3}, {"n": 1}, {"n": 0}]}"#).unwrap();
//! let code = r#"
//! var kept: $root.items[where $.n > 0]
//! sorted: kept[sortBy $.n]
//! count: listLen(kept)
//! "#;
//!
//! let output = engine.eval(code, input).unwrap();
//! let json = String::from_utf8(wst_lang::json::serialize(&output).unwrap()).unwrap();
//! assert_eq!(json, r#"{"sorted":[{"n":1},{"n":3}],"count":2}"#);
//!
//! // The same program can run against many inputs.
//! let program = engine.compile("$root * 2").unwrap();
//! assert_eq!(engine.run(&program, Value::from(21)).unwrap(), Value::from(42));
//! ```
mod arena;
mod ast;
pub mod compiler;
mod engine;
mod error;
pub mod eval;
pub mod ir;
pub mod json;
mod lexer;
mod number;
mod range;
mod value;

use std::sync::{Arc, RwLock};

pub use ast::Program as AstProgram;
pub use ast::error::ParseError;
pub use engine::{Engine, Options};
pub use error::{Error, InnerError};
pub use eval::cancel::CancellationToken;
pub use eval::error::{ErrorKind, EvalError};
pub use lexer::error::LexerError;
pub use lexer::token::{Token, TokenKind};
pub use number::Number;
pub use range::{Position, Range};
pub use value::{Array, Container, Path, PathError, Primitive, Segment, Stream, Value};

/// Reference-counted handle for data shared across frames and threads.
pub type Shared<T> = Arc<T>;
/// Interior mutability for frames, which are shared between threads.
pub type SharedCell<T> = RwLock<T>;

pub type WstResult = Result<Value, Error>;

#[allow(clippy::result_large_err)]
pub fn tokenize(code: &str) -> Result<Vec<Token>, Error> {
    lexer::tokenize(code).map_err(|e| Error::from_error(code, e))
}

#[allow(clippy::result_large_err)]
pub fn parse(code: &str) -> Result<ast::Program, Error> {
    let tokens = tokenize(code)?;
    ast::parser::Parser::new(&tokens)
        .parse()
        .map_err(|e| Error::from_error(code, e))
}
