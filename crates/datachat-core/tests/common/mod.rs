//! Common test utilities for integration tests.

use async_trait::async_trait;
use datachat_core::{ChatService, ServiceError};
use datachat_types::{
    ChatSummary, CreateChatRequest, DatabaseRef, DatabaseStatus, Message, QueryRequest,
    QueryResponse,
};
use std::collections::HashMap;
use std::sync::Mutex;

pub fn database(id: &str, status: &str) -> DatabaseRef {
    DatabaseRef {
        database_id: id.to_string(),
        database_name: format!("{} db", id),
        database_status: DatabaseStatus::from(status.to_string()),
    }
}

/// In-process service that behaves like the HTTP backend.
///
/// Prompts starting with `fail:` produce a 500 with the rest of the prompt
/// as the error detail.
#[derive(Default)]
pub struct ScriptedService {
    pub chats: Mutex<Vec<ChatSummary>>,
    pub databases: Mutex<Vec<DatabaseRef>>,
    pub messages: Mutex<HashMap<String, Vec<Message>>>,
    pub queries: Mutex<Vec<QueryRequest>>,
}

impl ScriptedService {
    pub fn new(databases: Vec<DatabaseRef>) -> Self {
        Self {
            databases: Mutex::new(databases),
            ..Self::default()
        }
    }

    pub fn with_chat(self, chat: ChatSummary, messages: Vec<Message>) -> Self {
        self.messages
            .lock()
            .unwrap()
            .insert(chat.chat_id.clone(), messages);
        self.chats.lock().unwrap().push(chat);
        self
    }
}

#[async_trait]
impl ChatService for ScriptedService {
    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ServiceError> {
        Ok(self.chats.lock().unwrap().clone())
    }

    async fn create_chat(&self, request: &CreateChatRequest) -> Result<ChatSummary, ServiceError> {
        let mut chats = self.chats.lock().unwrap();
        let chat = ChatSummary::new(
            format!("srv-{}", chats.len() + 1),
            request.title.clone(),
            None,
        );
        chats.insert(0, chat.clone());
        Ok(chat)
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<(), ServiceError> {
        let mut chats = self.chats.lock().unwrap();
        let before = chats.len();
        chats.retain(|c| c.chat_id != chat_id);
        if chats.len() == before {
            return Err(ServiceError::from_body(
                404,
                r#"{"error":"Chat not found or unauthorized"}"#,
            ));
        }
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>, ServiceError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResponse, ServiceError> {
        self.queries.lock().unwrap().push(request.clone());
        // Let the other tasks run before answering
        tokio::task::yield_now().await;

        if let Some(detail) = request.prompt.strip_prefix("fail:") {
            return Err(ServiceError::from_body(
                500,
                &serde_json::json!({ "error": detail }).to_string(),
            ));
        }

        let response = serde_json::json!({
            "query": format!("SELECT * FROM {}", request.database_id),
            "explanation": request.prompt,
            "results": [{"n": 1}],
        })
        .to_string();
        let message = Message::new(request.prompt.clone(), response);
        self.messages
            .lock()
            .unwrap()
            .entry(request.chat_id.clone())
            .or_default()
            .push(message.clone());
        Ok(QueryResponse { message })
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseRef>, ServiceError> {
        Ok(self.databases.lock().unwrap().clone())
    }
}
