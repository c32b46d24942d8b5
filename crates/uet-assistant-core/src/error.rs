use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a question went unanswered. Front ends never show these; the session
/// collapses every variant into the apology message and logs the detail.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("could not reach answer service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("answer service returned {status}: {body}")]
    Server { status: StatusCode, body: String },
    #[error("answer service returned an unexpected body: {0}")]
    MalformedResponse(String),
    #[error("answer service did not reply within {0:?}")]
    Timeout(Duration),
    #[error("request task ended early: {0}")]
    Interrupted(String),
}

impl AskError {
    /// Whether asking again later might succeed. Only used to grade log output.
    pub fn is_transient(&self) -> bool {
        match self {
            AskError::Transport(_) | AskError::Timeout(_) => true,
            AskError::Server { status, .. } => status.is_server_error(),
            AskError::MalformedResponse(_) | AskError::Interrupted(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AskError::Transport(_) => "transport",
            AskError::Server { .. } => "server",
            AskError::MalformedResponse(_) => "malformed_response",
            AskError::Timeout(_) => "timeout",
            AskError::Interrupted(_) => "interrupted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let unavailable = AskError::Server {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        let bad_request = AskError::Server {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: "question: field required".to_string(),
        };

        assert!(unavailable.is_transient());
        assert!(!bad_request.is_transient());
        assert!(AskError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!AskError::MalformedResponse("eof".into()).is_transient());
    }

    #[test]
    fn display_includes_status() {
        let err = AskError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "answer service returned 500 Internal Server Error: boom");
        assert_eq!(err.kind(), "server");
    }
}
