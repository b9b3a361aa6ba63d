//! In-memory transcript cache with read-through hydration.
//!
//! The cache is the authoritative copy of every transcript it holds. The
//! durable store mirrors it and is only consulted the first time a chat is
//! read after startup (or after the entry was dropped by the capacity bound).

use crate::store::TranscriptStore;
use datachat_types::Message;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Vec<Message>>,
    /// Least recently used first.
    access_order: VecDeque<String>,
    /// Sequence of the latest mutation per chat.
    versions: HashMap<String, u64>,
    next_seq: u64,
}

impl CacheInner {
    fn touch(&mut self, chat_id: &str) {
        self.access_order.retain(|k| k != chat_id);
        self.access_order.push_back(chat_id.to_string());
    }

    fn remove(&mut self, chat_id: &str) -> Option<Vec<Message>> {
        self.access_order.retain(|k| k != chat_id);
        self.entries.remove(chat_id)
    }

    fn bump(&mut self, chat_id: &str) -> u64 {
        self.next_seq += 1;
        self.versions.insert(chat_id.to_string(), self.next_seq);
        self.next_seq
    }
}

/// Durable side effect of a cache mutation.
enum Persist {
    Write(Vec<Message>),
    Erase,
}

/// Chat id to transcript mapping backed by a [`TranscriptStore`].
///
/// Memory is updated under the cache lock; the store is written after the
/// lock is released, so readers never wait on durable I/O. Store operations
/// carry the sequence of the mutation that produced them and stale ones are
/// skipped, keeping the durable copy in mutation order per chat.
pub struct SessionCache {
    store: Arc<dyn TranscriptStore>,
    inner: Mutex<CacheInner>,
    /// Sequence last applied to the store, per chat.
    persisted: Mutex<HashMap<String, u64>>,
    /// Maximum transcripts held in memory. `None` is unbounded.
    capacity: Option<usize>,
}

impl SessionCache {
    /// Create an unbounded cache.
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self::with_capacity(store, None)
    }

    /// Create a cache holding at most `capacity` transcripts in memory.
    ///
    /// Entries over the bound are dropped from memory only; the store keeps
    /// them and the next read hydrates them again.
    pub fn with_capacity(store: Arc<dyn TranscriptStore>, capacity: Option<usize>) -> Self {
        Self {
            store,
            inner: Mutex::new(CacheInner::default()),
            persisted: Mutex::new(HashMap::new()),
            capacity: capacity.map(|c| c.max(1)),
        }
    }

    fn inner(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transcript for `chat_id`, oldest first. Unknown chats yield an empty list.
    pub fn get_messages(&self, chat_id: &str) -> Vec<Message> {
        let inner = self.hydrated(chat_id);
        match inner.entries.get(chat_id) {
            Some(messages) => messages.clone(),
            None => Vec::new(),
        }
    }

    /// Replace the transcript in memory, then mirror it to the store.
    ///
    /// A failed store write is logged and otherwise ignored; the in-memory
    /// copy stays authoritative.
    pub fn set_messages(&self, chat_id: &str, messages: Vec<Message>) {
        let (seq, snapshot) = {
            let mut inner = self.inner();
            self.stage(&mut inner, chat_id, messages)
        };
        self.persist(chat_id, seq, Persist::Write(snapshot));
    }

    /// Read-modify-write a transcript under one lock.
    pub fn update<R>(&self, chat_id: &str, f: impl FnOnce(&mut Vec<Message>) -> R) -> R {
        let (result, seq, snapshot) = {
            let mut inner = self.hydrated(chat_id);
            let mut messages = inner.entries.get(chat_id).cloned().unwrap_or_default();
            let result = f(&mut messages);
            let (seq, snapshot) = self.stage(&mut inner, chat_id, messages);
            (result, seq, snapshot)
        };
        self.persist(chat_id, seq, Persist::Write(snapshot));
        result
    }

    /// Like [`update`](Self::update), but leaves chats that are neither cached
    /// nor stored untouched and returns `None`.
    pub fn update_existing<R>(
        &self,
        chat_id: &str,
        f: impl FnOnce(&mut Vec<Message>) -> Option<R>,
    ) -> Option<R> {
        let (result, seq, snapshot) = {
            let mut inner = self.hydrated(chat_id);
            let mut messages = inner.entries.get(chat_id)?.clone();
            let result = f(&mut messages)?;
            let (seq, snapshot) = self.stage(&mut inner, chat_id, messages);
            (result, seq, snapshot)
        };
        self.persist(chat_id, seq, Persist::Write(snapshot));
        Some(result)
    }

    /// Drop the transcript from memory and erase its durable record.
    pub fn evict(&self, chat_id: &str) {
        let seq = {
            let mut inner = self.inner();
            inner.remove(chat_id);
            inner.bump(chat_id)
        };
        self.persist(chat_id, seq, Persist::Erase);
        debug!(target: "datachat::cache", "Evicted chat {}", chat_id);
    }

    /// Forget a chat's messages everywhere. Same as [`evict`](Self::evict).
    pub fn clear(&self, chat_id: &str) {
        self.evict(chat_id);
    }

    /// Whether `chat_id` is currently held in memory.
    pub fn contains(&self, chat_id: &str) -> bool {
        self.inner().entries.contains_key(chat_id)
    }

    /// Number of transcripts held in memory.
    pub fn len(&self) -> usize {
        self.inner().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner().entries.is_empty()
    }

    /// Forget every in-memory transcript. Durable records are kept.
    pub fn clear_memory(&self) {
        let mut inner = self.inner();
        inner.entries.clear();
        inner.access_order.clear();
    }

    /// Lock the cache with `chat_id` loaded from the store if it was absent.
    ///
    /// The store read happens without the lock. The result is discarded if the
    /// chat was mutated meanwhile.
    fn hydrated(&self, chat_id: &str) -> MutexGuard<'_, CacheInner> {
        let mut inner = self.inner();
        if inner.entries.contains_key(chat_id) {
            inner.touch(chat_id);
            return inner;
        }
        let version = inner.versions.get(chat_id).copied();
        drop(inner);

        let loaded = match self.store.read(chat_id) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(target: "datachat::cache", "Failed to read stored transcript for chat {}: {}", chat_id, e);
                None
            }
        };

        let mut inner = self.inner();
        let unchanged = inner.versions.get(chat_id).copied() == version;
        if let Some(messages) = loaded {
            if unchanged && !inner.entries.contains_key(chat_id) {
                debug!(
                    target: "datachat::cache",
                    "Hydrated {} messages for chat {} from store",
                    messages.len(),
                    chat_id
                );
                inner.entries.insert(chat_id.to_string(), messages);
                inner.touch(chat_id);
                self.enforce_capacity(&mut inner, chat_id);
            }
        }
        inner
    }

    /// Apply a new transcript in memory and return the snapshot to persist.
    fn stage(
        &self,
        inner: &mut CacheInner,
        chat_id: &str,
        messages: Vec<Message>,
    ) -> (u64, Vec<Message>) {
        let seq = inner.bump(chat_id);
        inner.entries.insert(chat_id.to_string(), messages.clone());
        inner.touch(chat_id);
        self.enforce_capacity(inner, chat_id);
        (seq, messages)
    }

    fn persist(&self, chat_id: &str, seq: u64, op: Persist) {
        let mut persisted = self.persisted.lock().unwrap_or_else(PoisonError::into_inner);
        if persisted.get(chat_id).is_some_and(|&applied| applied >= seq) {
            debug!(target: "datachat::cache", "Skipping stale store update for chat {} (seq {})", chat_id, seq);
            return;
        }
        persisted.insert(chat_id.to_string(), seq);

        let result = match op {
            Persist::Write(messages) => self.store.write(chat_id, &messages),
            Persist::Erase => self.store.erase(chat_id),
        };
        if let Err(e) = result {
            warn!(
                target: "datachat::cache",
                "Failed to persist transcript for chat {}, keeping in-memory copy: {}",
                chat_id,
                e
            );
        }
    }

    fn enforce_capacity(&self, inner: &mut CacheInner, keep: &str) {
        let Some(capacity) = self.capacity else {
            return;
        };

        let mut remaining = inner.access_order.len();
        while inner.entries.len() > capacity && remaining > 0 {
            remaining -= 1;
            let Some(oldest) = inner.access_order.pop_front() else {
                break;
            };
            if oldest == keep {
                inner.access_order.push_back(oldest);
                continue;
            }
            inner.entries.remove(&oldest);
            debug!(target: "datachat::cache", "Dropped chat {} from memory (capacity {})", oldest, capacity);
        }
    }
}
