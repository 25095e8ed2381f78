//! Compliance analysis of an app idea
//!
//! One stateless model call per idea: build the prompt, request a JSON
//! completion, parse and normalize the reply into a `ComplianceReport`.

use agc_common::config::TomlConfig;
use agc_common::{AppIdea, ComplianceReport, ReportPolicy};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::llm_client::{LlmClient, LlmError};
use super::prompt;

/// Analysis failures (input validation happens before the analyzer)
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Unusable model reply: {0}")]
    Report(#[from] agc_common::Error),
}

/// App idea analyzer
pub struct Analyzer {
    client: LlmClient,
    policy: ReportPolicy,
}

impl Analyzer {
    pub fn new(client: LlmClient, policy: ReportPolicy) -> Self {
        Self { client, policy }
    }

    /// Build an analyzer from bootstrap configuration and a resolved API key
    pub fn from_config(config: &TomlConfig, api_key: String) -> Result<Self, LlmError> {
        let client = LlmClient::new(&config.openai, api_key)?;
        Ok(Self::new(client, config.analysis.report_policy()))
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Analyze one validated idea
    pub async fn analyze(&self, idea: &AppIdea) -> Result<ComplianceReport, AnalyzeError> {
        let analysis_id = Uuid::new_v4();
        let span = info_span!("analysis", id = %analysis_id, model = %self.client.model());

        async move {
            let started = Instant::now();
            info!(idea_chars = idea.char_len(), "Analyzing app idea");

            let messages = prompt::build_messages(idea);
            let content = self.client.complete_json(&messages).await?;

            let report = ComplianceReport::from_model_output(&content, &self.policy).map_err(|e| {
                warn!(error = %e, "Model reply could not be parsed");
                e
            })?;

            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                violations = report.violations.len(),
                high_probability = report.high_probability_count(&self.policy),
                is_compliant = report.is_compliant,
                "Analysis complete"
            );

            Ok::<_, AnalyzeError>(report)
        }
        .instrument(span)
        .await
    }
}
