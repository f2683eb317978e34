// Resume rewrite generation.
// Prompt -> single LLM call -> schema validation -> typed GenerationResult.
// All LLM calls go through llm_client.

pub mod client;
pub mod prompts;
pub mod schema;

pub use client::{ContentGenerator, GenerationRequest, LlmContentGenerator};
