//! Narrative fleet report from a text-generation model
//!
//! The admin asks for a short executive report over every stored session.
//! Failures never reach session state; they turn into a placeholder string.

use crate::llm::{LlmError, LlmRequest, LlmService};
use crate::session::Session;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

const REPORT_PROMPT: &str = r"Analyze the following trip data from an intercity bus cooperative in Quindío, Colombia.
Sessions (open and closed), as JSON:";

const REPORT_INSTRUCTIONS: &str = r"Write a brief executive report for the fleet administrator that includes:
1. A summary of total fare revenue.
2. The routes with the highest ridership.
3. Recommendations to improve dispatching.
4. Warnings about possible anomalies in the passenger counts.

Answer in clean Markdown.";

pub const INSIGHT_PLACEHOLDER: &str = "Could not generate insights. Please check the connection.";

const MAX_REPORT_TOKENS: u32 = 2048;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No text-generation model is configured")]
    NotConfigured,
    #[error("Failed to serialize session snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("Model returned an empty report")]
    EmptyResponse,
}

/// Turns a session list into free-form prose
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, sessions: &[Session]) -> Result<String, ServiceError>;
}

/// Summarizer backed by an [`LlmService`]
pub struct LlmSummarizer {
    llm: Option<Arc<dyn LlmService>>,
}

impl LlmSummarizer {
    pub fn new(llm: Option<Arc<dyn LlmService>>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, sessions: &[Session]) -> Result<String, ServiceError> {
        let llm = self.llm.as_ref().ok_or(ServiceError::NotConfigured)?;
        let request = LlmRequest::prompt(build_prompt(sessions)?).with_max_tokens(MAX_REPORT_TOKENS);

        let response = llm.complete(&request).await?;
        if !response.end_turn {
            tracing::warn!(model = %llm.model_id(), "Report stopped before the model finished");
        }
        let report = response.text();
        let report = report.trim();
        if report.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(report.to_string())
    }
}

/// Embed the JSON snapshot of the sessions in the report prompt
pub fn build_prompt(sessions: &[Session]) -> Result<String, serde_json::Error> {
    let snapshot = serde_json::to_string(sessions)?;
    Ok(format!("{REPORT_PROMPT}\n{snapshot}\n\n{REPORT_INSTRUCTIONS}"))
}

/// Report text as shown to the admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub text: String,
    /// False when `text` is the placeholder
    pub generated: bool,
}

/// Ask for a report, converting any failure into the placeholder
pub async fn generate_insight(summarizer: &dyn Summarizer, sessions: &[Session]) -> Insight {
    match summarizer.summarize(sessions).await {
        Ok(text) => Insight {
            text,
            generated: true,
        },
        Err(e) => {
            tracing::warn!(error = %e, sessions = sessions.len(), "Insight generation failed");
            Insight {
                text: INSIGHT_PLACEHOLDER.to_string(),
                generated: false,
            }
        }
    }
}
