//! UI-agnostic conversation types
//!
//! These are shared by every front end and don't depend on any UI framework.
//! `AskRequest` and `AskResponse` are the wire shapes of the `/ask` endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Greeting seeded into every new session.
pub const WELCOME_TEXT: &str = "Hello! I'm your UET Department Information Assistant. \
I can answer questions about departments, programs, faculty, and admission requirements \
based on the UET Prospectus. How can I help you today?";

/// Shown in place of an answer whenever the answer service fails.
pub const APOLOGY_TEXT: &str = "I apologize, but I'm having trouble processing your request \
right now. Please try again in a moment.";

/// Composer limit, enforced by front ends before text reaches the session.
pub const MAX_QUESTION_CHARS: usize = 500;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A prospectus page backing an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub page: u32,
}

/// Which backend tool produced an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTrace {
    pub tool: String,
    pub action: String,
}

/// An entry in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentTrace>,
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content.into())
    }

    pub fn welcome() -> Self {
        Self::new(ChatRole::Assistant, WELCOME_TEXT.to_string())
    }

    /// The synthetic notice appended when a request fails.
    pub fn failure() -> Self {
        Self {
            is_error: true,
            ..Self::new(ChatRole::Assistant, APOLOGY_TEXT.to_string())
        }
    }

    pub fn from_answer(response: AskResponse) -> Self {
        Self {
            citations: response.citations,
            agent: response.agent,
            ..Self::new(ChatRole::Assistant, response.answer)
        }
    }

    fn new(role: ChatRole, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
            citations: None,
            agent: None,
            is_error: false,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }

    /// Citations, or an empty slice when the answer carried none.
    pub fn citations(&self) -> &[Citation] {
        self.citations.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub citations: Option<Vec<Citation>>,
    #[serde(default)]
    pub agent: Option<AgentTrace>,
}

impl AskResponse {
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            citations: None,
            agent: None,
        }
    }
}
