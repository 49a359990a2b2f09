//! Shared import-block construction, used by both the deterministic
//! assembler (C3) and as the "required import block" the constrained
//! assembler's validator chain injects (C4).

use crate::chunk::Chunk;

/// Groups `chunks` by `filename`, emitting one `from <filename> import
/// <func, ...>` line per file, functions listed in first-seen order and
/// deduplicated. File order is also first-seen.
#[must_use]
pub fn build_import_block(chunks: &[Chunk]) -> String {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();

    for chunk in chunks {
        match groups.iter_mut().find(|(filename, _)| *filename == chunk.filename) {
            Some((_, funcs)) => {
                if !funcs.contains(&chunk.func_name) {
                    funcs.push(chunk.func_name.clone());
                }
            }
            None => groups.push((chunk.filename.clone(), vec![chunk.func_name.clone()])),
        }
    }

    groups
        .into_iter()
        .map(|(filename, funcs)| format!("from {filename} import {}", funcs.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::chunk::Signature;

    #[test]
    fn groups_and_dedupes_by_filename() {
        let chunks = vec![
            Chunk::new("foo", "utils", "def foo(): pass", Signature::default()),
            Chunk::new("bar", "utils", "def bar(): pass", Signature::default()),
            Chunk::new("baz", "helpers", "def baz(): pass", Signature::default()),
            Chunk::new("foo", "utils", "def foo(): pass", Signature::default()),
        ];
        let block = build_import_block(&chunks);
        assert_eq!(block, "from utils import foo, bar\nfrom helpers import baz");
    }

    #[test]
    fn single_function_single_file() {
        let chunks = vec![Chunk::new(
            "foo",
            "utils",
            "def foo():\n    return 'foo'",
            Signature::default(),
        )];
        assert_eq!(build_import_block(&chunks), "from utils import foo");
    }
}
