//! Ordered chat summaries with an active-chat cursor.

use datachat_types::ChatSummary;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Default)]
struct RegistryInner {
    /// Newest first.
    chats: Vec<ChatSummary>,
    active_id: Option<String>,
}

impl RegistryInner {
    fn position(&self, chat_id: &str) -> Option<usize> {
        self.chats.iter().position(|c| c.chat_id == chat_id)
    }
}

/// Result of removing a chat from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// The removed summary, if the id was known.
    pub removed: Option<ChatSummary>,
    /// Whether the removed chat was the active one.
    pub was_active: bool,
    /// Active chat after removal.
    pub active: Option<ChatSummary>,
}

/// Chat summaries, newest first, plus the active chat.
///
/// `active_id` always names a chat present in the list, or is `None`.
#[derive(Default)]
pub struct ChatRegistry {
    inner: RwLock<RegistryInner>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// All chats, newest first.
    pub fn list(&self) -> Vec<ChatSummary> {
        self.read().chats.clone()
    }

    pub fn len(&self) -> usize {
        self.read().chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().chats.is_empty()
    }

    pub fn get(&self, chat_id: &str) -> Option<ChatSummary> {
        let inner = self.read();
        inner.position(chat_id).map(|i| inner.chats[i].clone())
    }

    pub fn active_id(&self) -> Option<String> {
        self.read().active_id.clone()
    }

    pub fn active(&self) -> Option<ChatSummary> {
        let inner = self.read();
        inner
            .active_id
            .as_deref()
            .and_then(|id| inner.position(id))
            .map(|i| inner.chats[i].clone())
    }

    /// Insert a chat at the front. A chat with the same id is replaced.
    pub fn add(&self, summary: ChatSummary) {
        let mut inner = self.write();
        if let Some(i) = inner.position(&summary.chat_id) {
            inner.chats.remove(i);
        }
        debug!(target: "datachat::registry", "Added chat {}", summary.chat_id);
        inner.chats.insert(0, summary);
    }

    /// Replace the whole listing (e.g. from the server).
    ///
    /// The active chat is kept when it is still listed; otherwise the first
    /// chat becomes active.
    pub fn replace_all(&self, chats: Vec<ChatSummary>) {
        let mut inner = self.write();
        inner.chats = chats;
        let keep = inner
            .active_id
            .as_deref()
            .is_some_and(|id| inner.position(id).is_some());
        if !keep {
            inner.active_id = inner.chats.first().map(|c| c.chat_id.clone());
        }
    }

    /// Make `chat_id` active. Returns `false` (and changes nothing) for unknown ids.
    pub fn select(&self, chat_id: &str) -> bool {
        let mut inner = self.write();
        if inner.position(chat_id).is_none() {
            return false;
        }
        inner.active_id = Some(chat_id.to_string());
        true
    }

    /// Remove a chat. Removing the active chat moves the cursor to the new
    /// first chat, or clears it when the registry is empty.
    pub fn remove(&self, chat_id: &str) -> Removal {
        let mut inner = self.write();
        let removed = inner.position(chat_id).map(|i| inner.chats.remove(i));
        let was_active = inner.active_id.as_deref() == Some(chat_id);
        if was_active {
            inner.active_id = inner.chats.first().map(|c| c.chat_id.clone());
        }
        let active = inner
            .active_id
            .as_deref()
            .and_then(|id| inner.position(id))
            .map(|i| inner.chats[i].clone());

        if removed.is_some() {
            debug!(
                target: "datachat::registry",
                "Removed chat {} (active now {:?})",
                chat_id,
                inner.active_id
            );
        }

        Removal {
            removed,
            was_active,
            active,
        }
    }

    /// Forget every chat.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.chats.clear();
        inner.active_id = None;
    }
}
