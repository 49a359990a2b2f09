//! C3: the deterministic assembler.
//!
//! Grounded on `original_source/src/assembler_bridge.py`'s
//! `build_deterministic_code`: a pure function over retrieved chunks and the
//! query string, using only each chunk's arity to synthesise a call-sequence
//! script. No model involved — this is the floor the constrained assembler
//! (C4) escapes to on any validation failure.

use super::imports::build_import_block;
use super::{AssemblyResult, DEFAULT_OUTPUT_FILENAME};
use crate::chunk::Chunk;
use std::fmt::Write;

const RESULT_VAR: &str = "result";

/// Builds a call-sequence script from `chunks` in order, filling call
/// arguments from integer literals found in `query` (falling back to `10 + j`
/// for positional index `j` within a call once the pool is exhausted).
///
/// Empty `chunks` is a structured error result whose `code` raises at
/// execution time, per the component contract ("if chunks is empty, return a
/// structured error result with code raising a runtime error").
#[must_use]
pub fn build(chunks: &[Chunk], query: &str) -> AssemblyResult {
    if chunks.is_empty() {
        return AssemblyResult {
            reasoning: "ERROR: No matching chunks found. Cannot proceed.".to_string(),
            code: "raise RuntimeError('Insufficient data: No matching chunks found')".to_string(),
            filename: DEFAULT_OUTPUT_FILENAME.to_string(),
        };
    }

    let import_block = build_import_block(chunks);
    let numbers = integer_pool(query);
    let mut number_idx = 0usize;
    let mut result_var: Option<&str> = None;

    let mut body = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let arity = chunk.signature.arity();
        let _ = write!(
            body,
            "\n# Step {}: Call {} ({arity} params)\n",
            i + 1,
            chunk.func_name
        );

        if arity == 0 {
            let _ = writeln!(body, "{}()", chunk.func_name);
            continue;
        }

        let mut args: Vec<String> = Vec::with_capacity(arity);
        for j in 0..arity {
            let arg = if j == 0 {
                if let Some(prev) = result_var {
                    prev.to_string()
                } else {
                    next_arg(&numbers, &mut number_idx, j)
                }
            } else {
                next_arg(&numbers, &mut number_idx, j)
            };
            args.push(arg);
        }

        let _ = writeln!(
            body,
            "{RESULT_VAR} = {}({})",
            chunk.func_name,
            args.join(", ")
        );
        result_var = Some(RESULT_VAR);
    }

    if result_var.is_some() {
        let _ = write!(body, "\nprint(f'Result: {{{RESULT_VAR}}}')");
    }

    let code = format!("{import_block}\n{body}").trim().to_string();

    AssemblyResult {
        reasoning: "Deterministically assembled from retrieved chunk signatures.".to_string(),
        code,
        filename: DEFAULT_OUTPUT_FILENAME.to_string(),
    }
}

fn next_arg(numbers: &[i64], number_idx: &mut usize, positional_index: usize) -> String {
    if *number_idx < numbers.len() {
        let value = numbers[*number_idx];
        *number_idx += 1;
        value.to_string()
    } else {
        (10 + positional_index).to_string()
    }
}

fn integer_pool(query: &str) -> Vec<i64> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    for ch in query.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else if !current.is_empty() {
            if let Ok(value) = current.parse::<i64>() {
                numbers.push(value);
            }
            current.clear();
        }
    }
    numbers
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::chunk::Signature;
    use test_case::test_case;

    #[test_case(0, "10"; "zero arity falls back to the bare 10 + j literal at j=0")]
    #[test_case(1, "10"; "arity one with no prior result and no query integers")]
    #[test_case(2, "10, 11"; "arity two fills both positional fallbacks")]
    #[test_case(3, "10, 11, 12"; "arity three fills all three positional fallbacks")]
    fn fallback_args_scale_with_arity(arity: usize, expected_args: &str) {
        let params = (0..arity).map(|i| format!("p{i}")).collect();
        let chunk = Chunk::new(
            "call",
            "utils",
            "def call(): pass",
            Signature { params, returns: None },
        );
        let result = build(&[chunk], "no integers in this query");
        if arity == 0 {
            assert!(result.code.contains("call()"));
        } else {
            assert!(result.code.contains(&format!("call({expected_args})")));
        }
    }

    #[test]
    fn empty_chunks_raises_at_runtime() {
        let result = build(&[], "anything");
        assert!(result.code.starts_with("raise RuntimeError"));
        assert_eq!(result.filename, "output.py");
    }

    #[test]
    fn zero_arity_single_call() {
        let chunks = vec![Chunk::new(
            "foo",
            "utils",
            "def foo():\n    return 'foo'",
            Signature::default(),
        )];
        let result = build(&chunks, "invoke foo function");
        assert_eq!(
            result.code,
            "from utils import foo\n\n# Step 1: Call foo (0 params)\nfoo()"
        );
    }

    #[test]
    fn arity_one_chain_reuses_result() {
        let chunks = vec![
            Chunk::new(
                "foo",
                "utils",
                "def foo(x):\n    return 'foo'",
                Signature {
                    params: vec!["x".to_string()],
                    returns: None,
                },
            ),
            Chunk::new(
                "bar",
                "utils",
                "def bar(y):\n    return 'bar'",
                Signature {
                    params: vec!["y".to_string()],
                    returns: None,
                },
            ),
        ];
        let result = build(&chunks, "run foo then bar with 7");
        assert!(result.code.starts_with("from utils import foo, bar"));
        assert!(result.code.contains("result = foo(7)"));
        assert!(result.code.contains("result = bar(result)"));
        assert!(result.code.ends_with("print(f'Result: {result}')"));
    }

    #[test]
    fn exhausted_pool_falls_back_to_ten_plus_j() {
        let chunks = vec![Chunk::new(
            "add",
            "utils",
            "def add(x, y):\n    return x + y",
            Signature {
                params: vec!["x".to_string(), "y".to_string()],
                returns: None,
            },
        )];
        let result = build(&chunks, "call add with no numbers here");
        // j=0 has no prior result and no numbers -> 10 + 0; j=1 -> 10 + 1
        assert!(result.code.contains("result = add(10, 11)"));
    }

    #[test]
    fn no_binding_means_no_print() {
        // An empty signature list (no chunks) is covered above; a chunk with
        // arity zero never binds `result`, so no print is appended unless a
        // later k-arity call binds one.
        let chunks = vec![Chunk::new(
            "ping",
            "utils",
            "def ping():\n    pass",
            Signature::default(),
        )];
        let result = build(&chunks, "ping");
        assert!(!result.code.contains("print("));
    }
}
