use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::AskError;
use crate::state::{AskRequest, AskResponse};

/// Error bodies are cut to this many characters before being logged.
const ERROR_BODY_LIMIT: usize = 200;

/// Anything that can answer a question. The session only talks to this trait.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, question: &str) -> Result<AskResponse, AskError>;
}

/// HTTP client for the backend's `POST /ask` endpoint.
#[derive(Clone)]
pub struct AskClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl AskClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AskError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_transport(&self, err: reqwest::Error) -> AskError {
        if err.is_timeout() {
            AskError::Timeout(self.timeout)
        } else {
            AskError::Transport(err)
        }
    }
}

#[async_trait]
impl AnswerService for AskClient {
    async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
        debug!(endpoint = %self.endpoint, chars = question.chars().count(), "posting question");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { question })
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AskError::Server {
                status,
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let body = response.text().await.map_err(|e| self.map_transport(e))?;
        let answer: AskResponse = serde_json::from_str(&body)
            .map_err(|e| AskError::MalformedResponse(e.to_string()))?;

        debug!(
            %status,
            citations = answer.citations.as_ref().map_or(0, Vec::len),
            has_agent = answer.agent.is_some(),
            "answer received"
        );
        Ok(answer)
    }
}
