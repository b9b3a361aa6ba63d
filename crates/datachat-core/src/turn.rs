//! One user turn: optimistic placeholder, query, reconciliation.
//!
//! ```text
//! Idle ──send──▶ Sent (placeholder visible) ──ok──▶ Resolved
//!                                            └─err─▶ Failed (inline error)
//! ```
//!
//! The placeholder is always replaced in place, so a finished turn grows the
//! transcript by exactly one message whatever the outcome.

use crate::cache::SessionCache;
use crate::service::ChatService;
use dashmap::DashSet;
use datachat_types::{DatabaseRef, Message, QueryRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of preceding messages sent as conversational context.
pub const DEFAULT_HISTORY_WINDOW: usize = 4;

/// Lifecycle of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sent,
    Resolved,
    Failed,
}

/// Why a send was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NoActiveChat,
    NoDatabase,
    InactiveDatabase,
    EmptyPrompt,
}

/// Result of [`QuerySession::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Preconditions not met; nothing changed.
    Dropped(DropReason),
    /// A turn for this chat is already waiting on the service; nothing changed.
    Busy,
    /// The service answered; holds the message now in the transcript.
    Resolved(Message),
    /// The service failed; holds the inline error message now in the transcript.
    Failed(Message),
}

impl TurnOutcome {
    pub fn state(&self) -> TurnState {
        match self {
            TurnOutcome::Dropped(_) | TurnOutcome::Busy => TurnState::Idle,
            TurnOutcome::Resolved(_) => TurnState::Resolved,
            TurnOutcome::Failed(_) => TurnState::Failed,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            TurnOutcome::Resolved(m) | TurnOutcome::Failed(m) => Some(m),
            TurnOutcome::Dropped(_) | TurnOutcome::Busy => None,
        }
    }
}

/// The last `window` messages of `messages`, oldest first.
pub fn history_window(messages: &[Message], window: usize) -> Vec<Message> {
    let start = messages.len().saturating_sub(window);
    messages[start..].to_vec()
}

/// Marks a chat as having a turn in flight until dropped.
struct InFlight<'a> {
    chats: &'a DashSet<String>,
    chat_id: String,
}

impl<'a> InFlight<'a> {
    fn acquire(chats: &'a DashSet<String>, chat_id: &str) -> Option<Self> {
        if !chats.insert(chat_id.to_string()) {
            return None;
        }
        Some(Self {
            chats,
            chat_id: chat_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.chats.remove(&self.chat_id);
    }
}

/// Runs turns against the query service and reconciles them into the cache.
pub struct QuerySession {
    cache: Arc<SessionCache>,
    service: Arc<dyn ChatService>,
    in_flight: DashSet<String>,
    history_window: usize,
}

impl QuerySession {
    pub fn new(cache: Arc<SessionCache>, service: Arc<dyn ChatService>, history_window: usize) -> Self {
        Self {
            cache,
            service,
            in_flight: DashSet::new(),
            history_window,
        }
    }

    /// Whether a turn for `chat_id` is waiting on the service.
    pub fn is_in_flight(&self, chat_id: &str) -> bool {
        self.in_flight.contains(chat_id)
    }

    /// Run one turn for `chat_id` against `database`.
    pub async fn send(
        &self,
        chat_id: Option<&str>,
        database: Option<&DatabaseRef>,
        prompt: &str,
    ) -> TurnOutcome {
        let Some(chat_id) = chat_id else {
            return TurnOutcome::Dropped(DropReason::NoActiveChat);
        };
        let Some(database) = database else {
            return TurnOutcome::Dropped(DropReason::NoDatabase);
        };
        if !database.is_active() {
            return TurnOutcome::Dropped(DropReason::InactiveDatabase);
        }
        if prompt.trim().is_empty() {
            return TurnOutcome::Dropped(DropReason::EmptyPrompt);
        }

        let Some(_in_flight) = InFlight::acquire(&self.in_flight, chat_id) else {
            debug!(target: "datachat::turn", "Chat {} already has a turn in flight, ignoring send", chat_id);
            return TurnOutcome::Busy;
        };

        let window = self.history_window;
        let (slot, history) = self.cache.update(chat_id, |messages| {
            let history = history_window(messages, window);
            messages.push(Message::placeholder(prompt));
            (messages.len() - 1, history)
        });
        info!(
            target: "datachat::turn",
            "Turn sent for chat {} on database {} ({} history messages)",
            chat_id,
            database.database_id,
            history.len()
        );

        let request = QueryRequest {
            prompt: prompt.to_string(),
            database_id: database.database_id.clone(),
            chat_id: chat_id.to_string(),
            history,
        };

        let outcome = match self.service.submit_query(&request).await {
            Ok(response) => {
                info!(target: "datachat::turn", "Turn resolved for chat {}", chat_id);
                TurnOutcome::Resolved(response.message)
            }
            Err(e) => {
                warn!(target: "datachat::turn", "Turn failed for chat {}: {}", chat_id, e);
                TurnOutcome::Failed(Message::error(prompt, e.detail()))
            }
        };

        if let Some(message) = outcome.message() {
            self.reconcile(chat_id, slot, message.clone());
        }
        outcome
    }

    /// Swap the placeholder at `slot` for the final message.
    fn reconcile(&self, chat_id: &str, slot: usize, message: Message) {
        let replaced = self.cache.update_existing(chat_id, |messages| match messages.get_mut(slot) {
            Some(current) if current.is_placeholder() => {
                *current = message;
                Some(())
            }
            _ => None,
        });

        if replaced.is_none() {
            debug!(
                target: "datachat::turn",
                "Placeholder for chat {} is gone (chat cleared or deleted), dropping response",
                chat_id
            );
        }
    }
}
