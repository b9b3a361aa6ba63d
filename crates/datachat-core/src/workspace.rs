//! Per-user chat state: registry, transcript cache, databases and turns.
//!
//! A `ChatWorkspace` is created once the user is signed in and handed to
//! every front-end component by reference. `teardown` drops all in-memory
//! state on sign-out.

use crate::cache::SessionCache;
use crate::interpreter::{JsonSniffInterpreter, ResponseInterpreter};
use crate::registry::{ChatRegistry, Removal};
use crate::service::ChatService;
use crate::store::TranscriptStore;
use crate::turn::{QuerySession, TurnOutcome, DEFAULT_HISTORY_WINDOW};
use crate::{DataChatError, Result};
use datachat_types::{ChatSummary, CreateChatRequest, DatabaseRef, Interpretation, Message};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Tunables for a workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Messages of context sent with each query.
    pub history_window: usize,
    /// Transcripts kept in memory. `None` is unbounded.
    pub cache_capacity: Option<usize>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            cache_capacity: None,
        }
    }
}

#[derive(Default)]
struct DatabaseSelection {
    /// Active databases only.
    databases: Vec<DatabaseRef>,
    selected: Option<DatabaseRef>,
}

pub struct ChatWorkspace {
    service: Arc<dyn ChatService>,
    registry: ChatRegistry,
    cache: Arc<SessionCache>,
    session: QuerySession,
    selection: RwLock<DatabaseSelection>,
    interpreter: Box<dyn ResponseInterpreter>,
}

impl ChatWorkspace {
    pub fn new(
        service: Arc<dyn ChatService>,
        store: Arc<dyn TranscriptStore>,
        config: WorkspaceConfig,
    ) -> Self {
        let cache = Arc::new(SessionCache::with_capacity(store, config.cache_capacity));
        let session = QuerySession::new(cache.clone(), service.clone(), config.history_window);
        Self {
            service,
            registry: ChatRegistry::new(),
            cache,
            session,
            selection: RwLock::new(DatabaseSelection::default()),
            interpreter: Box::new(JsonSniffInterpreter),
        }
    }

    /// Replace the response classifier.
    pub fn with_interpreter(mut self, interpreter: impl ResponseInterpreter + 'static) -> Self {
        self.interpreter = Box::new(interpreter);
        self
    }

    pub fn registry(&self) -> &ChatRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Fetch chats and databases, then hydrate the active chat.
    pub async fn load(&self) -> Result<()> {
        let chats = self.service.list_chats().await?;
        info!(target: "datachat::workspace", "Loaded {} chats", chats.len());
        self.registry.replace_all(chats);

        let databases = self.service.list_databases().await?;
        self.set_databases(databases);

        if let Some(active) = self.registry.active() {
            self.bind_database(&active, false);
            self.ensure_messages(&active.chat_id).await;
        }
        Ok(())
    }

    // =========================================================================
    // Databases
    // =========================================================================

    /// Replace the database list, keeping only active ones.
    ///
    /// The current selection survives if still listed; otherwise the first
    /// database is selected.
    pub fn set_databases(&self, databases: Vec<DatabaseRef>) {
        let mut selection = self.selection.write().unwrap_or_else(PoisonError::into_inner);
        selection.databases = databases.into_iter().filter(DatabaseRef::is_active).collect();

        let still_listed = selection.selected.as_ref().and_then(|current| {
            selection
                .databases
                .iter()
                .find(|d| d.database_id == current.database_id)
                .cloned()
        });
        selection.selected = still_listed.or_else(|| selection.databases.first().cloned());
        debug!(
            target: "datachat::workspace",
            "{} active databases, selected {:?}",
            selection.databases.len(),
            selection.selected.as_ref().map(|d| &d.database_id)
        );
    }

    pub fn databases(&self) -> Vec<DatabaseRef> {
        self.selection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .databases
            .clone()
    }

    pub fn selected_database(&self) -> Option<DatabaseRef> {
        self.selection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .selected
            .clone()
    }

    /// Select an active database by id.
    pub fn select_database(&self, database_id: &str) -> Result<DatabaseRef> {
        let mut selection = self.selection.write().unwrap_or_else(PoisonError::into_inner);
        let db = selection
            .databases
            .iter()
            .find(|d| d.database_id == database_id)
            .cloned()
            .ok_or_else(|| DataChatError::DatabaseNotSelectable(database_id.to_string()))?;
        selection.selected = Some(db.clone());
        Ok(db)
    }

    /// Point the selection at the chat's database when it is active.
    /// With `fallback_first`, unbound chats fall back to the first database.
    fn bind_database(&self, chat: &ChatSummary, fallback_first: bool) {
        let mut selection = self.selection.write().unwrap_or_else(PoisonError::into_inner);
        let bound = chat.database_id.as_deref().and_then(|id| {
            selection
                .databases
                .iter()
                .find(|d| d.database_id == id)
                .cloned()
        });
        match bound {
            Some(db) => selection.selected = Some(db),
            None if fallback_first => selection.selected = selection.databases.first().cloned(),
            None => {}
        }
    }

    // =========================================================================
    // Chats
    // =========================================================================

    /// Create a chat bound to the selected database and make it active.
    ///
    /// A blank title is ignored and yields `Ok(None)`.
    pub async fn create_chat(&self, title: &str) -> Result<Option<ChatSummary>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }

        let database_id = self.selected_database().map(|d| d.database_id);
        let request = CreateChatRequest {
            title: title.to_string(),
            database_id: database_id.clone(),
        };
        let mut chat = self.service.create_chat(&request).await?;
        if chat.database_id.is_none() {
            chat.database_id = database_id;
        }

        self.registry.add(chat.clone());
        self.registry.select(&chat.chat_id);
        info!(target: "datachat::workspace", "Created chat {} ({})", chat.chat_id, chat.title);
        Ok(Some(chat))
    }

    /// Make a chat active and return its transcript.
    pub async fn select_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        if !self.registry.select(chat_id) {
            return Err(DataChatError::ChatNotFound(chat_id.to_string()));
        }
        if let Some(chat) = self.registry.get(chat_id) {
            self.bind_database(&chat, false);
        }
        Ok(self.ensure_messages(chat_id).await)
    }

    /// Delete a chat on the server, then drop it from the registry, the cache
    /// and durable storage.
    ///
    /// If the server refuses, nothing changes locally.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<Removal> {
        self.service.delete_chat(chat_id).await?;

        let removal = self.registry.remove(chat_id);
        self.cache.evict(chat_id);
        if removal.was_active {
            match &removal.active {
                Some(next) => {
                    self.bind_database(next, true);
                    self.ensure_messages(&next.chat_id).await;
                }
                None => {
                    let mut selection = self.selection.write().unwrap_or_else(PoisonError::into_inner);
                    selection.selected = selection.databases.first().cloned();
                }
            }
        }
        info!(target: "datachat::workspace", "Deleted chat {}", chat_id);
        Ok(removal)
    }

    // =========================================================================
    // Transcripts
    // =========================================================================

    pub fn messages(&self, chat_id: &str) -> Vec<Message> {
        self.cache.get_messages(chat_id)
    }

    /// Transcript of the active chat, empty when no chat is active.
    pub fn active_messages(&self) -> Vec<Message> {
        match self.registry.active_id() {
            Some(id) => self.cache.get_messages(&id),
            None => Vec::new(),
        }
    }

    /// Pull the server transcript into the cache.
    ///
    /// Returns `false` without touching the cache while a turn for the chat
    /// is in flight, so the optimistic placeholder is not overwritten.
    pub async fn sync_messages(&self, chat_id: &str) -> Result<bool> {
        if self.session.is_in_flight(chat_id) {
            return Ok(false);
        }
        let messages = self.service.list_messages(chat_id).await?;
        if self.session.is_in_flight(chat_id) {
            return Ok(false);
        }
        debug!(target: "datachat::workspace", "Synced {} messages for chat {}", messages.len(), chat_id);
        self.cache.set_messages(chat_id, messages);
        Ok(true)
    }

    /// Cached transcript, falling back to the server when nothing is cached
    /// or stored locally.
    async fn ensure_messages(&self, chat_id: &str) -> Vec<Message> {
        let cached = self.cache.get_messages(chat_id);
        if !cached.is_empty() {
            return cached;
        }
        match self.sync_messages(chat_id).await {
            Ok(_) => self.cache.get_messages(chat_id),
            Err(e) => {
                warn!(target: "datachat::workspace", "Failed to fetch messages for chat {}: {}", chat_id, e);
                cached
            }
        }
    }

    /// Forget a chat's transcript locally (memory and storage).
    pub fn clear_messages(&self, chat_id: &str) {
        self.cache.clear(chat_id);
    }

    /// Send a prompt in the active chat against the selected database.
    pub async fn handle_send(&self, prompt: &str) -> TurnOutcome {
        let chat_id = self.registry.active_id();
        let database = self.selected_database();
        self.session
            .send(chat_id.as_deref(), database.as_ref(), prompt)
            .await
    }

    /// Classify a stored response for rendering.
    pub fn interpret(&self, response: &str) -> Interpretation {
        self.interpreter.interpret(response)
    }

    /// Drop all in-memory state. Durable transcripts are kept.
    pub fn teardown(&self) {
        self.registry.clear();
        self.cache.clear_memory();
        *self.selection.write().unwrap_or_else(PoisonError::into_inner) = DatabaseSelection::default();
        info!(target: "datachat::workspace", "Workspace torn down");
    }
}
