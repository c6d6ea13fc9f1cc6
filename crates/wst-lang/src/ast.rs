pub mod constants;
pub mod error;
pub mod node;
pub mod parser;

pub use node::{Call, Expr, FunctionDef, Literal, Mapping, Node, Program, Target};
