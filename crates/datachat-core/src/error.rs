//! Error types for datachat.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataChatError {
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    #[error("Database not selectable: {0}")]
    DatabaseNotSelectable(String),

    #[error("Corrupted transcript blob: {0}")]
    Corruption(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Service error: {0}")]
    Service(#[from] crate::service::ServiceError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
