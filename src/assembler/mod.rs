//! C3/C4: code assembly.
//!
//! [`deterministic::build`] is the model-free fallback (C3); [`constrained::generate`]
//! is the LLM-backed path with its five-stage validator chain (C4), falling
//! back to C3 on any deviation from the grounding contract.

pub mod constrained;
pub mod deterministic;
pub mod imports;
pub mod model;
pub mod prompt;

use serde::{Deserialize, Serialize};

/// Default output filename, matching `original_source`'s `output.py`.
pub const DEFAULT_OUTPUT_FILENAME: &str = "output.py";

/// The result of an assembly attempt: a rationale, the assembled code, and
/// the filename it should be written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyResult {
    /// Human-readable rationale (or, on the error paths, a diagnostic).
    pub reasoning: String,
    /// The assembled script body.
    pub code: String,
    /// Target filename for the assembled script.
    pub filename: String,
}

pub use constrained::generate;
pub use deterministic::build;
pub use model::{MockModel, ModelClient};
