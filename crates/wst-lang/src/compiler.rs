//! Scope compiler and closure synthesis.
//!
//! Transforms a parsed [`ast::Program`] into the flat [`ir::Program`] the
//! evaluator runs. Every block, conditional branch and selector lambda becomes
//! a named function whose trailing arguments are the variables it reads from
//! enclosing scopes.
//!
//! ## Example
//!
//! ```rust
//! use wst_lang::compiler::{SequentialIdGenerator, compile};
//!
//! let program = wst_lang::parse("if true then 1 else 2").unwrap();
//! let ir = compile("if true then 1 else 2", &program, "main", &mut SequentialIdGenerator::new()).unwrap();
//! assert_eq!(ir.functions[0].name, "ternary-then_0");
//! ```

mod error;
mod id_generator;
mod scope;
mod signature;
mod transpile;

pub use error::CompileError;
pub use id_generator::{IdGenerator, SeededIdGenerator, SequentialIdGenerator};
pub use scope::{Scope, ScopeId, Scopes};
pub use signature::{ArgType, LambdaKind, Signature};

use crate::{ast, ir};

pub fn compile(
    source: &str,
    program: &ast::Program,
    package: &str,
    ids: &mut dyn IdGenerator,
) -> Result<ir::Program, CompileError> {
    let program = transpile::Transpiler::new(source, package, ids).transpile(program)?;
    tracing::debug!(
        package,
        functions = program.functions.len(),
        "compiled program"
    );
    Ok(program)
}
