//! Clap derive CLI definition.
//!
//! Grounded on `examples/zircote-rlm-rs/src/cli/parser.rs`'s `Cli`/`Commands`
//! shape: a top-level struct carrying global flags, dispatching to a
//! `Commands` enum.

use clap::{Parser, Subcommand};

/// Retrieval-augmented code assembler.
#[derive(Parser, Debug)]
#[command(name = "rlm-assemble", version, about, long_about = None)]
pub struct Cli {
    /// Output format: `text` or `json`.
    #[arg(long, global = true, default_value = "text", env = "RLM_ASSEMBLE_FORMAT")]
    pub format: String,

    /// Path to the on-disk index file.
    #[arg(
        long,
        global = true,
        default_value = "inverted_index.json",
        env = "RLM_ASSEMBLE_INDEX_PATH"
    )]
    pub index_path: String,

    /// Model identifier used when the `agent` feature is enabled.
    #[arg(long, global = true, env = "RLM_ASSEMBLE_MODEL")]
    pub model: Option<String>,

    /// Subcommand to run. Defaults to the interactive REPL.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands exposed by the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Indexes every `.py` file under a path, writing the index to disk.
    Index {
        /// Root directory to walk.
        path: String,
    },
    /// Runs the intersection retriever for a query against the saved index.
    Search {
        /// Natural-language query.
        query: String,
    },
    /// Assembles glue code for a query (constrained, falling back to
    /// deterministic).
    Assemble {
        /// Natural-language query.
        query: String,
    },
    /// Assembles, writes, and compile-checks glue code for a query,
    /// re-prompting once on failure.
    Verify {
        /// Natural-language query.
        query: String,
    },
    /// Reads one `{"chunks": [...], "query": "..."}` JSON request from
    /// stdin and writes one `AssemblyResult` JSON response to stdout.
    Bridge,
    /// Interactive REPL: search, assemble, and verify per line.
    Repl,
}
