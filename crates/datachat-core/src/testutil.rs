//! In-process fakes shared by unit tests.

use crate::service::{ChatService, ServiceError};
use crate::store::{MemoryTranscriptStore, TranscriptStore};
use crate::{DataChatError, Result};
use async_trait::async_trait;
use datachat_types::{
    ChatSummary, CreateChatRequest, DatabaseRef, DatabaseStatus, Message, QueryRequest,
    QueryResponse,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub fn active_db(id: &str) -> DatabaseRef {
    DatabaseRef {
        database_id: id.to_string(),
        database_name: format!("{}-name", id),
        database_status: DatabaseStatus::Active,
    }
}

pub fn inactive_db(id: &str) -> DatabaseRef {
    DatabaseRef {
        database_status: DatabaseStatus::Other("Inactive".into()),
        ..active_db(id)
    }
}

/// Memory store that counts reads.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryTranscriptStore,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl TranscriptStore for CountingStore {
    fn write(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        self.inner.write(chat_id, messages)
    }

    fn read(&self, chat_id: &str) -> Result<Option<Vec<Message>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(chat_id)
    }

    fn erase(&self, chat_id: &str) -> Result<()> {
        self.inner.erase(chat_id)
    }
}

/// Memory store whose writes take `delay`, like a slow disk.
pub struct SlowStore {
    inner: MemoryTranscriptStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryTranscriptStore::default(),
            delay,
        }
    }
}

impl TranscriptStore for SlowStore {
    fn write(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        std::thread::sleep(self.delay);
        self.inner.write(chat_id, messages)
    }

    fn read(&self, chat_id: &str) -> Result<Option<Vec<Message>>> {
        self.inner.read(chat_id)
    }

    fn erase(&self, chat_id: &str) -> Result<()> {
        self.inner.erase(chat_id)
    }
}

/// Store whose writes always fail, like a full browser quota.
pub struct FailingStore;

impl TranscriptStore for FailingStore {
    fn write(&self, _chat_id: &str, _messages: &[Message]) -> Result<()> {
        Err(DataChatError::IoError(std::io::Error::other("quota exceeded")))
    }

    fn read(&self, _chat_id: &str) -> Result<Option<Vec<Message>>> {
        Ok(None)
    }

    fn erase(&self, _chat_id: &str) -> Result<()> {
        Ok(())
    }
}

/// How the fake answers queries.
#[derive(Debug, Clone)]
pub enum QueryBehavior {
    /// Reply with `"answer: <prompt>"`.
    Echo,
    /// Fail with an API error carrying the given detail.
    Fail(Option<String>),
}

/// Lets a test observe a query mid-flight.
#[derive(Default)]
pub struct Gate {
    pub started: Notify,
    pub release: Notify,
}

pub struct FakeChatService {
    chats: Mutex<Vec<ChatSummary>>,
    databases: Mutex<Vec<DatabaseRef>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    behavior: Mutex<QueryBehavior>,
    queries: Mutex<Vec<QueryRequest>>,
    gate: Mutex<Option<Arc<Gate>>>,
    next_id: AtomicUsize,
    fail_deletes: AtomicBool,
    message_fetches: AtomicUsize,
}

impl Default for FakeChatService {
    fn default() -> Self {
        Self {
            chats: Mutex::new(Vec::new()),
            databases: Mutex::new(Vec::new()),
            messages: Mutex::new(HashMap::new()),
            behavior: Mutex::new(QueryBehavior::Echo),
            queries: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            next_id: AtomicUsize::new(1),
            fail_deletes: AtomicBool::new(false),
            message_fetches: AtomicUsize::new(0),
        }
    }
}

impl FakeChatService {
    pub fn with_chats(self, chats: Vec<ChatSummary>) -> Self {
        *self.chats.lock().unwrap() = chats;
        self
    }

    pub fn with_databases(self, databases: Vec<DatabaseRef>) -> Self {
        *self.databases.lock().unwrap() = databases;
        self
    }

    pub fn with_messages(self, chat_id: &str, messages: Vec<Message>) -> Self {
        self.messages
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), messages);
        self
    }

    pub fn set_query_behavior(&self, behavior: QueryBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    /// Install a gate that pauses every query until released.
    pub fn gate(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().unwrap().clone()
    }

    pub fn message_fetches(&self) -> usize {
        self.message_fetches.load(Ordering::SeqCst)
    }

    pub fn server_chats(&self) -> Vec<ChatSummary> {
        self.chats.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatService for FakeChatService {
    async fn list_chats(&self) -> std::result::Result<Vec<ChatSummary>, ServiceError> {
        Ok(self.chats.lock().unwrap().clone())
    }

    async fn create_chat(
        &self,
        request: &CreateChatRequest,
    ) -> std::result::Result<ChatSummary, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let chat = ChatSummary::new(
            format!("chat-{}", id),
            request.title.clone(),
            request.database_id.clone(),
        );
        self.chats.lock().unwrap().insert(0, chat.clone());
        Ok(chat)
    }

    async fn delete_chat(&self, chat_id: &str) -> std::result::Result<(), ServiceError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ServiceError::Api {
                status: 404,
                message: Some("Chat not found or unauthorized".into()),
            });
        }
        self.chats.lock().unwrap().retain(|c| c.chat_id != chat_id);
        self.messages.lock().unwrap().remove(chat_id);
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str) -> std::result::Result<Vec<Message>, ServiceError> {
        self.message_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_query(
        &self,
        request: &QueryRequest,
    ) -> std::result::Result<QueryResponse, ServiceError> {
        self.queries.lock().unwrap().push(request.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            QueryBehavior::Echo => Ok(QueryResponse {
                message: Message::new(
                    request.prompt.clone(),
                    format!("answer: {}", request.prompt),
                ),
            }),
            QueryBehavior::Fail(message) => Err(ServiceError::Api {
                status: 500,
                message,
            }),
        }
    }

    async fn list_databases(&self) -> std::result::Result<Vec<DatabaseRef>, ServiceError> {
        Ok(self.databases.lock().unwrap().clone())
    }
}
