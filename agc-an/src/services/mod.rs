//! Analysis services
//!
//! - `prompt`: fixed instruction prompt and message assembly
//! - `llm_client`: OpenAI-compatible chat completion client
//! - `analyzer`: one-shot compliance analysis of an app idea

pub mod analyzer;
pub mod llm_client;
pub mod prompt;

pub use analyzer::{AnalyzeError, Analyzer};
pub use llm_client::{ChatMessage, LlmClient, LlmError, Role};
