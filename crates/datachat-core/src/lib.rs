//! Client-side chat state for the natural-language database query service.

mod cache;
mod codec;
mod error;
mod interpreter;
mod registry;
mod service;
mod store;
mod turn;
mod workspace;

#[cfg(test)]
mod testutil;

pub use cache::SessionCache;
pub use codec::{TranscriptCodec, DEFAULT_COMPRESSION_LEVEL};
pub use error::DataChatError;
pub use interpreter::{cell_text, interpret, JsonSniffInterpreter, ResponseInterpreter};
pub use registry::{ChatRegistry, Removal};
pub use service::{ChatService, HttpChatService, HttpServiceConfig, ServiceError};
pub use store::{MemoryTranscriptStore, SqliteTranscriptStore, StoreStats, TranscriptStore};
pub use turn::{
    history_window, DropReason, QuerySession, TurnOutcome, TurnState, DEFAULT_HISTORY_WINDOW,
};
pub use workspace::{ChatWorkspace, WorkspaceConfig};

/// Result type for datachat operations.
pub type Result<T> = std::result::Result<T, DataChatError>;
