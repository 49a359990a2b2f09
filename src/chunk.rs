//! The central domain entity: a [`Chunk`] of indexed source, and the [`Index`]
//! that maps function names onto chunks.
//!
//! Grounded on `original_source/src/indexer.py`'s `Index[func_name] = {source,
//! filename, signature}` shape and the Design Notes' "dynamic chunk shape"
//! normalisation ([`RawChunk`]).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A function's parameter list and (currently unused) return annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Signature {
    /// Ordered parameter names, in declaration order, with a leading `self`
    /// stripped if present.
    pub params: Vec<String>,
    /// Return type annotation, if the grammar carries one. Not populated by
    /// the indexer today; carried for forward compatibility with typed
    /// grammars.
    pub returns: Option<String>,
}

impl Signature {
    /// Number of parameters, used by the deterministic assembler to decide
    /// how many call arguments to synthesise.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// An AST-extracted callable unit: its source, origin file, and signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The definition's name, taken from its `name` child-field.
    pub func_name: String,
    /// Module stem (path basename without extension) the definition came from.
    pub filename: String,
    /// Verbatim source text of the definition.
    pub source: String,
    /// Parameter signature.
    pub signature: Signature,
    /// Content-addressed id: `SHA256(source)`, hex-encoded.
    pub chunk_id: String,
}

impl Chunk {
    /// Builds a chunk, computing `chunk_id` from `source`.
    #[must_use]
    pub fn new(
        func_name: impl Into<String>,
        filename: impl Into<String>,
        source: impl Into<String>,
        signature: Signature,
    ) -> Self {
        let source = source.into();
        let chunk_id = compute_chunk_id(&source);
        Self {
            func_name: func_name.into(),
            filename: filename.into(),
            source,
            signature,
            chunk_id,
        }
    }
}

/// `SHA256(source)`, hex-encoded. Two chunks with identical source share an id.
#[must_use]
pub fn compute_chunk_id(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Mapping `func_name -> Chunk`. A later definition with the same name
/// overwrites, matching the indexer's "idempotent re-index" contract.
///
/// Backed by a `HashMap`: the spec requires only that iteration order be
/// stable *within a run*, which `HashMap` satisfies without imposing the
/// ordering/allocation cost of an insertion-order-preserving map the rest of
/// the pipeline does not need.
pub type Index = HashMap<String, Chunk>;

/// On-disk shape of a structured index entry: `{source, filename, signature}`.
/// `func_name` is the enclosing map key and `chunk_id` is derived, so neither
/// is serialized here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkValue {
    /// Verbatim source text.
    pub source: String,
    /// Module stem.
    pub filename: String,
    /// Parameter signature.
    #[serde(default)]
    pub signature: Signature,
}

/// The on-disk index may hold either the structured form or a bare source
/// string (legacy form). See Design Notes §9 "Dynamic chunk shape".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawChunk {
    /// `{source, filename, signature}`.
    Structured(ChunkValue),
    /// A bare source string, with no recorded filename or signature.
    Legacy(String),
}

impl RawChunk {
    /// Normalises into a full [`Chunk`], lifting the legacy form with
    /// `filename = "unknown"` and an empty signature.
    #[must_use]
    pub fn normalize(self, func_name: &str) -> Chunk {
        match self {
            Self::Structured(value) => {
                Chunk::new(func_name, value.filename, value.source, value.signature)
            }
            Self::Legacy(source) => Chunk::new(func_name, "unknown", source, Signature::default()),
        }
    }
}
