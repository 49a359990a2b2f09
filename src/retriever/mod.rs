//! C2: the strict intersection retriever.
//!
//! Grounded on `original_source/src/retriever.py`'s `IntersectionEngine`:
//! tokenise the query, drop short tokens, and accept a chunk only if *every*
//! surviving token appears in its `func_name` or `source`. "Insufficient
//! data" — an empty salient-token-set, or a match-set that ends up empty —
//! is a first-class `None`, never an error.

use crate::chunk::{Chunk, Index, RawChunk};
use crate::error::RetrieverError;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Minimum token length to survive the noise filter. Tokens of length `<=`
/// this are dropped before intersection. Named per Design Notes §9: "the
/// noise-filter threshold is empirical ... treat it as a tunable constant."
pub const MIN_SALIENT_TOKEN_LEN: usize = 3;

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"\w+").unwrap()
    })
}

/// The derived set of salient tokens from a query: lowercase word-character
/// runs longer than [`MIN_SALIENT_TOKEN_LEN`].
#[must_use]
pub fn salient_tokens(query: &str) -> Vec<String> {
    word_pattern()
        .find_iter(query)
        .map(|m| m.as_str().to_lowercase())
        .filter(|token| token.len() > MIN_SALIENT_TOKEN_LEN)
        .collect()
}

/// Loads the on-disk index. A missing file degrades to an empty index (all
/// subsequent searches then return `None`), matching the `IndexMissing`
/// policy. A present-but-malformed file is a real error.
pub fn load_index(path: &Path) -> Result<Index, RetrieverError> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Ok(Index::new());
    };
    let raw: HashMap<String, RawChunk> =
        serde_json::from_str(&text).map_err(|source| RetrieverError::IndexMalformed {
            path: path.display().to_string(),
            source,
        })?;
    Ok(raw
        .into_iter()
        .map(|(name, raw_chunk)| {
            let chunk = raw_chunk.normalize(&name);
            (name, chunk)
        })
        .collect())
}

/// Runs the strict conjunctive search: `query` -> every chunk whose
/// `func_name` or `source` contains *all* salient tokens, case-insensitively.
/// Returns `None` if the salient-token-set is empty or if no chunk survives.
#[must_use]
pub fn search(index: &Index, query: &str) -> Option<Vec<Chunk>> {
    let tokens = salient_tokens(query);
    if tokens.is_empty() {
        return None;
    }

    let matches: Vec<Chunk> = index
        .values()
        .filter(|chunk| {
            let haystack_name = chunk.func_name.to_lowercase();
            let haystack_source = chunk.source.to_lowercase();
            tokens
                .iter()
                .all(|token| haystack_name.contains(token) || haystack_source.contains(token))
        })
        .cloned()
        .collect();

    if matches.is_empty() {
        None
    } else {
        Some(matches)
    }
}
