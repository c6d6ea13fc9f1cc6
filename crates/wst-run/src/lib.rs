//! Command-line front end for wst: compiles one program and runs it against
//! each JSON input independently.
mod cli;
mod config;

pub use cli::Cli;
pub use config::Config;
