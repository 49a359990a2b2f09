//! # rlm-assemble
//!
//! A retrieval-augmented code assembler: given a natural-language request and
//! a workspace of Python source, produces a new script that composes
//! pre-existing functions — never inventing new business logic.
//!
//! The pipeline, in dependency order:
//!
//! - [`indexer`] (C1) — AST-based extraction of function/class definitions
//!   with their signatures, persisted as a content-addressed [`chunk::Index`].
//! - [`retriever`] (C2) — strict conjunctive keyword retrieval; "insufficient
//!   data" is a first-class `None`, not an error.
//! - [`assembler`] (C3/C4) — a deterministic, model-free call-sequence
//!   synthesiser and an LLM-backed constrained assembler with a five-stage
//!   validator chain that falls back to the deterministic path on any
//!   deviation from the grounding contract.
//! - [`verifier`] (C5) — writes assembled code to disk, runs an external
//!   compile-only check, and re-prompts the constrained assembler once with
//!   the failure's stderr as context.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod assembler;
pub mod chunk;
pub mod cli;
pub mod error;
pub mod indexer;
pub mod retriever;
pub mod verifier;

pub use chunk::{Chunk, Index, RawChunk, Signature};
pub use cli::{Cli, Commands, OutputFormat};
pub use error::{Error, Result};
