//! Contract with the generative backend behind `ai` columns.
//!
//! The pipeline only needs "give me `count` string values for this rule"; the
//! vendor request/response bodies live behind the configured endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by an [`AiBackend`].
#[derive(Debug, Error)]
pub enum AiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Backend(String),
}

/// One chunk request for a column.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRequest<'a> {
    pub table: &'a str,
    pub column: &'a str,
    pub rule: &'a str,
    pub count: usize,
}

/// Source of AI-generated values, shared by every `ai` column of a run.
pub trait AiBackend: Send + Sync {
    /// Return up to `request.count` values.
    fn generate(&self, request: &AiRequest<'_>) -> Result<Vec<String>, AiError>;
}

#[derive(Debug, Deserialize)]
struct AiResponse {
    values: Vec<String>,
}

/// Backend that POSTs each [`AiRequest`] as JSON and expects `{"values": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpAiBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpAiBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AiBackend for HttpAiBackend {
    fn generate(&self, request: &AiRequest<'_>) -> Result<Vec<String>, AiError> {
        debug!(
            endpoint = %self.endpoint,
            column = request.column,
            rule = request.rule,
            count = request.count,
            "requesting ai values"
        );
        let response = self.client.post(&self.endpoint).json(request).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let payload: AiResponse = response.json()?;
        Ok(payload.values)
    }
}
