//! Chat session controller
//!
//! `ChatSession` owns the transcript, the composer draft and the single
//! in-flight request. The outbound call runs on a spawned tokio task; its
//! result is folded back into the transcript only when the owner calls
//! [`ChatSession::poll_response`] or [`ChatSession::wait_for_response`], so
//! every mutation happens on the owner's execution context.

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::client::AnswerService;
use crate::error::AskError;
use crate::state::{AskResponse, Message};

/// Identifies one outbound question in the logs.
pub type RequestId = u64;

type Reply = Result<AskResponse, AskError>;

/// Snapshot published to subscribers on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub pending: bool,
    pub message_count: usize,
}

struct InFlight {
    id: RequestId,
    task: JoinHandle<Reply>,
}

pub struct ChatSession {
    service: Arc<dyn AnswerService>,
    timeout: Duration,
    messages: Vec<Message>,
    draft: String,
    in_flight: Option<InFlight>,
    next_request_id: RequestId,
    status_tx: watch::Sender<SessionStatus>,
}

impl ChatSession {
    /// Start a session seeded with the welcome message.
    pub fn new(service: Arc<dyn AnswerService>, timeout: Duration) -> Self {
        let messages = vec![Message::welcome()];
        let (status_tx, _) = watch::channel(SessionStatus {
            pending: false,
            message_count: messages.len(),
        });

        Self {
            service,
            timeout,
            messages,
            draft: String::new(),
            in_flight: None,
            next_request_id: 1,
            status_tx,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            pending: self.is_pending(),
            message_count: self.messages.len(),
        }
    }

    /// Receiver that changes whenever the transcript or pending flag does.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Commit the draft as a question.
    ///
    /// Does nothing and returns `None` when the trimmed draft is empty or a
    /// request is already pending. Otherwise appends the user message, clears
    /// the draft and spawns the call, returning without waiting for it.
    /// Must be called from within a tokio runtime.
    pub fn send(&mut self) -> Option<RequestId> {
        let question = self.draft.trim();
        if question.is_empty() {
            debug!("ignoring send with empty draft");
            return None;
        }
        if let Some(in_flight) = &self.in_flight {
            debug!(request = in_flight.id, "ignoring send while a request is pending");
            return None;
        }

        let question = question.to_string();
        self.messages.push(Message::user(question.clone()));
        self.draft.clear();

        let id = self.next_request_id;
        self.next_request_id += 1;
        info!(request = id, chars = question.chars().count(), "sending question");

        let service = Arc::clone(&self.service);
        let timeout = self.timeout;
        let task = tokio::spawn(async move {
            match tokio::time::timeout(timeout, service.ask(&question)).await {
                Ok(reply) => reply,
                Err(_) => Err(AskError::Timeout(timeout)),
            }
        });

        self.in_flight = Some(InFlight { id, task });
        self.publish();
        Some(id)
    }

    /// Apply the pending reply if it has arrived. Never blocks.
    ///
    /// Returns `true` when a message was appended.
    pub fn poll_response(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return false;
        };
        let Some(joined) = (&mut in_flight.task).now_or_never() else {
            return false;
        };
        let id = in_flight.id;
        self.in_flight = None;
        self.complete(id, joined);
        true
    }

    /// Wait for the pending reply and apply it, returning the appended message.
    pub async fn wait_for_response(&mut self) -> Option<&Message> {
        let in_flight = self.in_flight.as_mut()?;
        let joined = (&mut in_flight.task).await;
        let id = in_flight.id;
        self.in_flight = None;
        self.complete(id, joined);
        self.messages.last()
    }

    /// Back to a fresh transcript. A pending request is aborted and its reply
    /// is never appended.
    pub fn reset(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            info!(request = in_flight.id, "aborting pending request on reset");
            in_flight.task.abort();
        }
        self.messages = vec![Message::welcome()];
        self.draft.clear();
        self.publish();
    }

    fn complete(&mut self, id: RequestId, joined: Result<Reply, JoinError>) {
        let reply = joined.unwrap_or_else(|e| Err(AskError::Interrupted(e.to_string())));

        let message = match reply {
            Ok(response) => {
                info!(request = id, chars = response.answer.chars().count(), "answer appended");
                Message::from_answer(response)
            }
            Err(err) => {
                warn!(
                    request = id,
                    kind = err.kind(),
                    transient = err.is_transient(),
                    error = %err,
                    "question failed"
                );
                Message::failure()
            }
        };

        self.messages.push(message);
        self.publish();
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
    }
}
