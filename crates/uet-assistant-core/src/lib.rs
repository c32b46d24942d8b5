pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use client::{AnswerService, AskClient};
pub use config::Config;
pub use error::AskError;
pub use session::{ChatSession, RequestId, SessionStatus};
pub use state::{
    AgentTrace, AskResponse, ChatRole, Citation, Message, APOLOGY_TEXT, MAX_QUESTION_CHARS,
    WELCOME_TEXT,
};
