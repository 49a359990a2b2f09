//! CLI command implementations.
//!
//! Wires the five components together: `index` drives C1, `search` drives
//! C2, `assemble` drives {C3, C4}, `verify` drives all of it through C5, and
//! `repl` loops the same sequence interactively. Grounded on
//! `examples/zircote-rlm-rs/src/cli/commands.rs`'s `execute(&Cli) ->
//! Result<String>` dispatch shape and on `original_source/src/main.py`'s REPL
//! loop (exit literals, empty-input no-op).

use crate::assembler::model::{MockModel, ModelClient};
use crate::assembler::{self, AssemblyResult};
use crate::chunk::Index;
use crate::cli::output::{format_assembly_result, format_error, format_search_result, OutputFormat};
use crate::cli::parser::{Cli, Commands};
use crate::error::{Error, Result};
use crate::indexer::Indexer;
use crate::retriever;
use crate::verifier::{self, PyCompileChecker};
use std::io::{self, BufRead, Read, Write as IoWrite};
use std::path::Path;

/// Executes the CLI command, returning the text to print to stdout.
///
/// # Errors
///
/// Returns an `Error` on genuine infrastructure failure (grammar load,
/// malformed index, I/O). Retrieval "insufficient data" and assembler
/// fallbacks are not errors — see the `retriever` and `assembler` modules.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let model = resolve_model(cli);

    match &cli.command {
        Some(Commands::Index { path }) => run_index(path, &cli.index_path),
        Some(Commands::Search { query }) => run_search(query, &cli.index_path, format),
        Some(Commands::Assemble { query }) => {
            run_assemble(query, &cli.index_path, model.as_ref(), format)
        }
        Some(Commands::Verify { query }) => {
            run_verify(query, &cli.index_path, model.as_ref(), format)
        }
        Some(Commands::Bridge) => run_bridge(model.as_ref()),
        Some(Commands::Repl) | None => run_repl(&cli.index_path, model.as_ref(), format),
    }
}

fn resolve_model(cli: &Cli) -> Box<dyn ModelClient> {
    #[cfg(feature = "agent")]
    if let Some(model_id) = &cli.model
        && let Ok(client) = assembler::model::OpenAiClient::new(model_id.clone())
    {
        return Box::new(client);
    }
    let _ = cli;
    Box::new(MockModel)
}

fn run_index(path: &str, index_path: &str) -> Result<String> {
    let mut indexer = Indexer::new()?;
    let mut index = Index::new();
    indexer.index_directory(Path::new(path), &mut index)?;
    let count = index.len();
    let written = indexer.export_index(&index, Path::new(index_path))?;
    Ok(format!(
        "indexed {count} definition(s) from {path} -> {}\n",
        written.display()
    ))
}

fn run_search(query: &str, index_path: &str, format: OutputFormat) -> Result<String> {
    let index = retriever::load_index(Path::new(index_path))?;
    let chunks = retriever::search(&index, query);
    Ok(format_search_result(chunks.as_deref(), format))
}

fn run_assemble(
    query: &str,
    index_path: &str,
    model: &dyn ModelClient,
    format: OutputFormat,
) -> Result<String> {
    let result = assemble(query, index_path, model)?;
    Ok(format_assembly_result(&result, format))
}

fn assemble(query: &str, index_path: &str, model: &dyn ModelClient) -> Result<AssemblyResult> {
    let index = retriever::load_index(Path::new(index_path))?;
    let chunks = retriever::search(&index, query).unwrap_or_default();
    Ok(assembler::generate(&chunks, query, None, model))
}

fn run_verify(
    query: &str,
    index_path: &str,
    model: &dyn ModelClient,
    format: OutputFormat,
) -> Result<String> {
    let index = retriever::load_index(Path::new(index_path))?;
    let chunks = retriever::search(&index, query).unwrap_or_default();
    let result = assembler::generate(&chunks, query, None, model);
    let verified = verifier::compile_and_fix(&result, &chunks, query, model, &PyCompileChecker)?;
    Ok(format_assembly_result(&verified, format))
}

#[derive(serde::Deserialize)]
struct BridgeRequest {
    chunks: Vec<crate::chunk::Chunk>,
    query: String,
}

/// Implements the stdin/stdout wire protocol: one JSON request in, one
/// `AssemblyResult` JSON response out. Matches
/// `original_source/src/assembler_bridge.py`'s `__main__` block, including
/// its malformed-input response shape.
fn run_bridge(model: &dyn ModelClient) -> Result<String> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;

    let result = match serde_json::from_str::<BridgeRequest>(&input) {
        Ok(request) => assembler::generate(&request.chunks, &request.query, None, model),
        Err(e) => AssemblyResult {
            reasoning: format!("JSON Parse Error: {e}"),
            code: "# Error parsing input".to_string(),
            filename: assembler::DEFAULT_OUTPUT_FILENAME.to_string(),
        },
    };

    Ok(format!("{}\n", serde_json::to_string(&result)?))
}

/// Interactive REPL: search, assemble, and verify per line. Exits on
/// `exit`/`quit`/`q` (case-insensitive); empty input is a no-op. Matches
/// `original_source/src/main.py`'s `main()` loop.
fn run_repl(index_path: &str, model: &dyn ModelClient, format: OutputFormat) -> Result<String> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut output = String::new();

    loop {
        let _ = write!(stdout, "> ");
        let _ = stdout.flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed.to_lowercase().as_str(), "exit" | "quit" | "q") {
            break;
        }

        let line_result = (|| -> Result<String> {
            let index = retriever::load_index(Path::new(index_path))?;
            let chunks = retriever::search(&index, trimmed).unwrap_or_default();
            let result = assembler::generate(&chunks, trimmed, None, model);
            let verified = verifier::compile_and_fix(&result, &chunks, trimmed, model, &PyCompileChecker)
                .unwrap_or(result);
            Ok(format_assembly_result(&verified, format))
        })();

        match line_result {
            Ok(text) => {
                let _ = writeln!(stdout, "{text}");
                output.push_str(&text);
            }
            Err(e) => {
                let _ = writeln!(stdout, "{}", format_error(&e, format));
            }
        }
    }

    Ok(output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn resolve_model_defaults_to_mock_without_agent_feature() {
        let cli = Cli {
            format: "text".to_string(),
            index_path: "inverted_index.json".to_string(),
            model: None,
            command: None,
        };
        let model = resolve_model(&cli);
        assert!(model.complete("prompt", 10).is_err());
    }
}
