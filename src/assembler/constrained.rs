//! C4: the constrained assembler and its five-layer validator chain.
//!
//! Grounded on `original_source/src/assembler_bridge.py`'s `generate_glue_code`:
//! build a schema-constrained prompt, call the model, extract a brace-balanced
//! JSON object from the response, clean the code, then run the validator
//! chain in order. Any failure at any stage — model unavailable, malformed
//! response, or a validator rejection — degrades silently to the
//! deterministic assembler (C3); the model is untrusted, so nothing here
//! propagates an `Error`.

use super::imports::build_import_block;
use super::model::ModelClient;
use super::prompt::build_prompt;
use super::{deterministic, AssemblyResult, DEFAULT_OUTPUT_FILENAME};
use crate::chunk::Chunk;
use std::collections::HashSet;
use tracing::debug;
use tree_sitter::{Language, Parser};

/// Soft token budget for the single-shot completion, matching the source's
/// `max_tokens=400`.
const MAX_TOKENS: u32 = 400;

const USE_BEFORE_DEFINE_SENTINELS: [&str; 4] = ["result", "output", "value", "total"];

/// Runs the constrained assembly pipeline. Never fails: on any deviation
/// from the grounding contract, returns the deterministic assembler's output
/// for the same `chunks`/`query` instead.
#[must_use]
pub fn generate(
    chunks: &[Chunk],
    query: &str,
    error_context: Option<&str>,
    model: &dyn ModelClient,
) -> AssemblyResult {
    if chunks.is_empty() {
        return AssemblyResult {
            reasoning: "ERROR: Set intersection returned empty. No matching code chunks."
                .to_string(),
            code: "raise RuntimeError('Insufficient data: No matching chunks found')".to_string(),
            filename: DEFAULT_OUTPUT_FILENAME.to_string(),
        };
    }

    let import_block = build_import_block(chunks);
    let prompt = build_prompt(chunks, query, &import_block, error_context);

    let raw = match model.complete(&prompt, MAX_TOKENS) {
        Ok(text) => text,
        Err(err) => {
            debug!(%err, "model unavailable, falling back to deterministic assembler");
            return deterministic::build(chunks, query);
        }
    };

    let Some(parsed) = parse_response(&raw) else {
        debug!("model response malformed, falling back to deterministic assembler");
        return deterministic::build(chunks, query);
    };

    let cleaned = clean_code(&parsed.code, &parsed.filename);

    match validate(&cleaned, chunks, &import_block) {
        Some(code) => AssemblyResult {
            reasoning: parsed.reasoning,
            code,
            filename: parsed.filename,
        },
        None => {
            debug!("validator chain rejected model output, falling back to deterministic assembler");
            deterministic::build(chunks, query)
        }
    }
}

struct ParsedResponse {
    reasoning: String,
    code: String,
    filename: String,
}

/// Searches `raw` for the first brace-balanced region containing both
/// `"reasoning"` and `"code"`, and parses it as a JSON object.
fn parse_response(raw: &str) -> Option<ParsedResponse> {
    let region = find_brace_balanced_region(raw)?;
    let value: serde_json::Value = serde_json::from_str(region).ok()?;
    let reasoning = value.get("reasoning")?.as_str()?.to_string();
    let code = value.get("code")?.as_str()?.to_string();
    let filename = value
        .get("filename")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(DEFAULT_OUTPUT_FILENAME)
        .to_string();
    Some(ParsedResponse {
        reasoning,
        code,
        filename,
    })
}

fn find_brace_balanced_region(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    for start in 0..bytes.len() {
        if bytes[start] != b'{' {
            continue;
        }
        let mut depth = 0i32;
        for end in start..bytes.len() {
            match bytes[end] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &raw[start..=end];
                        if candidate.contains("reasoning") && candidate.contains("code") {
                            return Some(candidate);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Strips markdown code fences and a self-referential import of the output
/// module, per `spec.md` §4.4 "code cleaning".
fn clean_code(code: &str, output_filename: &str) -> String {
    let unfenced = strip_code_fence(code);
    strip_self_import(&unfenced, output_filename)
        .trim()
        .to_string()
}

fn strip_code_fence(code: &str) -> String {
    let trimmed = code.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim().to_string()
}

fn strip_self_import(code: &str, output_filename: &str) -> String {
    let stem = std::path::Path::new(output_filename)
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().to_string());
    if stem.is_empty() {
        return code.to_string();
    }
    let needle = format!("from {stem} import");
    code.lines()
        .filter(|line| !line.trim_start().starts_with(&needle))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs the five-stage validator chain. `Some(code)` on success (possibly
/// transformed by import-injection or the completeness auto-append);
/// `None` signals fallback to C3.
fn validate(code: &str, chunks: &[Chunk], import_block: &str) -> Option<String> {
    let code = inject_imports(code, import_block);
    if !mentions_any_func(&code, chunks) {
        return None;
    }
    if !parses_as_python(&code) {
        return None;
    }
    if !use_before_define_ok(&code) {
        return None;
    }
    ensure_completeness(&code)
}

/// Stage 1: import injection.
fn inject_imports(code: &str, import_block: &str) -> String {
    if import_block.is_empty() || code.contains(import_block) {
        code.to_string()
    } else {
        format!("{import_block}\n\n{code}")
    }
}

/// Stage 2: function-usage. `code` must reference at least one retrieved
/// `func_name`.
fn mentions_any_func(code: &str, chunks: &[Chunk]) -> bool {
    chunks.iter().any(|chunk| code.contains(&chunk.func_name))
}

/// Stage 3: syntax. `code` must parse under the target grammar without error
/// nodes.
fn parses_as_python(code: &str) -> bool {
    let language: Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    if parser.set_language(&language).is_err() {
        return false;
    }
    match parser.parse(code, None) {
        Some(tree) => !tree.root_node().has_error(),
        None => false,
    }
}

/// Stage 4: use-before-define. Line-scans for assignments (skipping comments,
/// `def` lines, and comparison operators), splits once on the first `=`, and
/// rejects if a sentinel name appears on the right-hand side before it has
/// appeared on a left-hand side.
fn use_before_define_ok(code: &str) -> bool {
    let mut defined: HashSet<String> = HashSet::new();

    for line in code.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with("def ") {
            continue;
        }
        if trimmed.contains("==")
            || trimmed.contains("!=")
            || trimmed.contains("<=")
            || trimmed.contains(">=")
        {
            continue;
        }
        let Some((lhs, rhs)) = trimmed.split_once('=') else {
            continue;
        };

        for sentinel in USE_BEFORE_DEFINE_SENTINELS {
            if identifiers_in(rhs).iter().any(|id| id == sentinel) && !defined.contains(sentinel) {
                return false;
            }
        }

        let lhs = lhs.trim();
        if is_identifier(lhs) {
            defined.insert(lhs.to_string());
        }
    }
    true
}

/// Stage 5: completeness. `code` must print or bind the conventional result
/// variable; if it only binds, a print of that variable is appended.
fn ensure_completeness(code: &str) -> Option<String> {
    let has_print = code.contains("print(");
    let has_result_assignment = code.contains("result =") || code.contains("result=");

    if !has_print && !has_result_assignment {
        return None;
    }
    if has_result_assignment && !has_print {
        let mut code = code.trim_end().to_string();
        code.push_str("\nprint(f'Result: {result}')");
        Some(code)
    } else {
        Some(code.to_string())
    }
}

fn identifiers_in(text: &str) -> Vec<String> {
    let mut idents = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            current.push(ch);
        } else if !current.is_empty() {
            idents.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        idents.push(current);
    }
    idents
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::assembler::model::MockModel;
    use crate::chunk::Signature;

    fn one_chunk() -> Vec<Chunk> {
        vec![Chunk::new(
            "foo",
            "utils",
            "def foo():\n    return 'foo'",
            Signature::default(),
        )]
    }

    #[test]
    fn empty_chunks_raises_at_runtime() {
        let result = generate(&[], "anything", None, &MockModel);
        assert!(result.code.starts_with("raise RuntimeError"));
        assert!(result.reasoning.starts_with("ERROR: Set intersection"));
    }

    #[test]
    fn model_unavailable_falls_back_to_deterministic() {
        let chunks = one_chunk();
        let result = generate(&chunks, "invoke foo function", None, &MockModel);
        let expected = deterministic::build(&chunks, "invoke foo function");
        assert_eq!(result.code, expected.code);
    }

    #[test]
    fn use_before_define_rejects_unseen_sentinel() {
        assert!(!use_before_define_ok("result = double(result)\nprint(result)"));
    }

    #[test]
    fn use_before_define_accepts_seen_sentinel() {
        assert!(use_before_define_ok("result = double(7)\nresult = triple(result)\nprint(result)"));
    }

    #[test]
    fn completeness_appends_print_when_only_bound() {
        let code = "result = foo(7)";
        let fixed = ensure_completeness(code).expect("should append print");
        assert!(fixed.ends_with("print(f'Result: {result}')"));
    }

    #[test]
    fn completeness_rejects_neither_print_nor_result() {
        assert!(ensure_completeness("x = foo(7)").is_none());
    }

    #[test]
    fn import_injection_prepends_when_missing() {
        let code = inject_imports("foo()", "from utils import foo");
        assert!(code.starts_with("from utils import foo"));
    }

    #[test]
    fn clean_code_strips_markdown_fence_and_self_import() {
        let raw = "```python\nfrom output import foo\nfoo()\n```";
        let cleaned = clean_code(raw, "output.py");
        assert_eq!(cleaned, "foo()");
    }

    #[test]
    fn parse_response_extracts_brace_balanced_json() {
        let raw = "Sure, here you go:\n{\"reasoning\": \"ok\", \"code\": \"foo()\", \"filename\": \"output.py\"}\nThanks!";
        let parsed = parse_response(raw).expect("should parse");
        assert_eq!(parsed.code, "foo()");
        assert_eq!(parsed.filename, "output.py");
    }

    #[test]
    fn parse_response_rejects_json_without_required_keys() {
        let raw = "{\"foo\": \"bar\"}";
        assert!(parse_response(raw).is_none());
    }
}
