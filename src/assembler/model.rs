//! The model boundary: `spec.md` §1 treats the statistical language model as
//! an external collaborator ("a black-box text generator with a `max_tokens`
//! bound and a token vocabulary"). [`ModelClient`] is that boundary; the
//! constrained assembler (C4) never talks to a concrete backend directly.

use crate::error::AssemblerError;

/// A single-shot text completion backend. Implementations must be
/// synchronous from the caller's perspective (§5: "a resolved value before
/// control returns"), even if the underlying transport is async.
pub trait ModelClient: Send + Sync {
    /// Generates a completion for `prompt`, bounded by `max_tokens`.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for transport-level failure. A model that merely
    /// produces unusable output (unparseable JSON, code that fails
    /// validation) is not an error here — that is handled by the constrained
    /// assembler's fallback logic, matching the `ModelOutputMalformed` policy.
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AssemblerError>;
}

/// A model client that is always unavailable. Used as the default when no
/// backend is configured (no `agent` feature, no API key), and by tests —
/// matching `original_source/src/assembler_bridge.py`'s "fall back to
/// `build_deterministic_code` if the model singleton is unset" behavior.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockModel;

impl ModelClient for MockModel {
    fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, AssemblerError> {
        Err(AssemblerError::ModelCallFailed(
            "no model configured".to_string(),
        ))
    }
}

/// An `async-openai`-backed client, reusing the teacher crate's existing
/// optional `agent` dependency rather than introducing a new HTTP stack.
#[cfg(feature = "agent")]
pub struct OpenAiClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    runtime: tokio::runtime::Runtime,
}

#[cfg(feature = "agent")]
impl OpenAiClient {
    /// Builds a client targeting `model`, owning a dedicated single-threaded
    /// runtime so [`ModelClient::complete`] can stay synchronous.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the async runtime cannot be started.
    pub fn new(model: impl Into<String>) -> Result<Self, AssemblerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AssemblerError::ModelCallFailed(format!("runtime init failed: {e}")))?;
        Ok(Self {
            client: async_openai::Client::new(),
            model: model.into(),
            runtime,
        })
    }
}

#[cfg(feature = "agent")]
impl ModelClient for OpenAiClient {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AssemblerError> {
        use async_openai::types::{
            ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        };

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AssemblerError::ModelCallFailed(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(max_tokens)
            .messages([message.into()])
            .build()
            .map_err(|e| AssemblerError::ModelCallFailed(e.to_string()))?;

        let response = self
            .runtime
            .block_on(self.client.chat().create(request))
            .map_err(|e| AssemblerError::ModelCallFailed(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AssemblerError::ModelCallFailed("empty completion".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mock_model_always_reports_unavailable() {
        let err = MockModel.complete("prompt", 400).unwrap_err();
        assert!(matches!(err, AssemblerError::ModelCallFailed(_)));
    }
}
