//! CLI layer for rlm-assemble.
//!
//! Exposes the command-line interface using clap: `index`, `search`,
//! `assemble`, `verify`, `bridge`, and an interactive `repl` (the default
//! when no subcommand is given).

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
