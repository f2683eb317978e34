//! Content generation client.
//!
//! `ContentGenerator` is the seam the order processor depends on. The
//! production backend is `LlmContentGenerator`; tests use `CannedGenerator`,
//! which feeds a fixed raw reply through the same schema validation.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::generation::prompts::{optimization_prompt, system_prompt};
use crate::generation::schema::{validate_generation, GenerationResult, SchemaError};
use crate::llm_client::{LlmClient, LlmError};

#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub resume_text: &'a str,
    pub job_description: &'a str,
}

/// Transport and schema failures collapse into one kind for the processor.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM call failed: {0}")]
    Transport(#[from] LlmError),

    #[error("LLM reply rejected: {0}")]
    Schema(#[from] SchemaError),
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GenerationResult, GenerationError>;
}

pub struct LlmContentGenerator {
    llm: LlmClient,
}

impl LlmContentGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GenerationResult, GenerationError> {
        let prompt = optimization_prompt(request.resume_text, request.job_description);
        let raw = self.llm.call_text(&prompt, &system_prompt()).await?;
        let result = validate_generation(&raw)?;
        info!(
            match_score = result.match_score,
            key_changes = result.key_changes.len(),
            "Generation reply validated"
        );
        Ok(result)
    }
}

#[cfg(test)]
pub use fake::CannedGenerator;
