//! Request and response bodies exchanged with the query service.

use crate::Message;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    pub database_id: String,
    pub chat_id: String,
    /// Recent turns preceding this prompt, oldest first.
    #[serde(default)]
    pub history: Vec<Message>,
}

/// Successful reply to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub message: Message,
}

/// Body of `POST /api/chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChatRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
}

/// Error payload returned by the service on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
