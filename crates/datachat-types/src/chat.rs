//! Chat summaries and transcript messages.
//!
//! A chat is a titled conversation bound to one database. Its transcript is an
//! ordered list of prompt/response turns, oldest first.

use serde::{Deserialize, Serialize};

/// Response text shown while a turn is waiting on the query service.
pub const PLACEHOLDER_RESPONSE: &str = "Thinking...";

/// Fallback detail used when a failed turn carries no server error.
pub const GENERIC_ERROR_DETAIL: &str = "Unexpected error";

/// Server-assigned chat identifier.
pub type ChatId = String;

/// Summary view of a chat for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: ChatId,
    #[serde(default)]
    pub title: String,
    /// Database the chat's questions are run against.
    #[serde(default)]
    pub database_id: Option<String>,
}

impl ChatSummary {
    pub fn new(chat_id: impl Into<String>, title: impl Into<String>, database_id: Option<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            title: title.into(),
            database_id,
        }
    }

    /// Title for display, falling back to a short id when the chat is untitled.
    pub fn display_title(&self) -> String {
        if self.title.trim().is_empty() {
            let short: String = self.chat_id.chars().take(6).collect();
            format!("Chat {}", short)
        } else {
            self.title.clone()
        }
    }
}

/// One prompt/response turn.
///
/// `response` is either literal text or a JSON document describing a
/// structured answer; see `datachat_core::interpret`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub prompt: String,
    #[serde(default)]
    pub response: String,
}

impl Message {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
        }
    }

    /// Optimistic placeholder inserted as soon as a prompt is sent.
    pub fn placeholder(prompt: impl Into<String>) -> Self {
        Self::new(prompt, PLACEHOLDER_RESPONSE)
    }

    /// Inline error bubble replacing a failed turn's placeholder.
    pub fn error(prompt: impl Into<String>, detail: Option<&str>) -> Self {
        let detail = detail
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(GENERIC_ERROR_DETAIL);
        Self::new(prompt, format!("Error: {}", detail))
    }

    /// Whether this message is still waiting on the query service.
    pub fn is_placeholder(&self) -> bool {
        self.response == PLACEHOLDER_RESPONSE
    }
}
