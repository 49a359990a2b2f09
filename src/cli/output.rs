//! Output formatting for CLI commands.
//!
//! Grounded on `examples/zircote-rlm-rs/src/cli/output.rs`'s
//! `OutputFormat`/`format_error` pattern: text output is human-oriented,
//! JSON output wraps the payload for programmatic consumption.

use crate::assembler::AssemblyResult;
use crate::chunk::Chunk;
use std::fmt::Write as _;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string; anything unrecognized falls back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats a retrieval outcome (`None` is "insufficient data").
#[must_use]
pub fn format_search_result(chunks: Option<&[Chunk]>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_search_result_text(chunks),
        OutputFormat::Json => format_json(&chunks),
    }
}

fn format_search_result_text(chunks: Option<&[Chunk]>) -> String {
    match chunks {
        None => "insufficient data: no chunk matched every salient token\n".to_string(),
        Some(chunks) => {
            let mut out = String::new();
            let _ = writeln!(out, "{} chunk(s) matched:", chunks.len());
            for chunk in chunks {
                let _ = writeln!(
                    out,
                    "  {} ({}), {} param(s)",
                    chunk.func_name,
                    chunk.filename,
                    chunk.signature.arity()
                );
            }
            out
        }
    }
}

/// Formats an [`AssemblyResult`].
#[must_use]
pub fn format_assembly_result(result: &AssemblyResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "# {}\n# -> {}\n{}\n",
            result.reasoning, result.filename, result.code
        ),
        OutputFormat::Json => format_json(result),
    }
}

fn format_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats a top-level error.
#[must_use]
pub fn format_error(error: &crate::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "success": false,
                "error": { "message": error.to_string() }
            });
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_text() {
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
    }

    #[test]
    fn none_search_result_reports_insufficient_data() {
        let text = format_search_result_text(None);
        assert!(text.contains("insufficient data"));
    }
}
