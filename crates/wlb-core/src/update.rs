//! Inbound update model shared by every update source.

use chrono::{DateTime, Utc};

use crate::domain::{ChatId, UpdateId, UserId};

/// Who sent an update and where replies should go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    /// Inline button press. `data` is routed exactly like message text.
    Callback { id: String, data: String },
    /// Update kinds the bot does not handle (edited messages, polls, ...).
    Unsupported(String),
}

/// One inbound event. Immutable once built by an adapter.
#[derive(Clone, Debug)]
pub struct Update {
    pub id: UpdateId,
    /// `None` for updates that have no user/chat to reply to. Those are still
    /// sequenced (so polling moves past them) but never reach a handler.
    pub sender: Option<Sender>,
    pub payload: Payload,
    pub received_at: DateTime<Utc>,
}

impl Update {
    pub fn new(id: UpdateId, sender: Option<Sender>, payload: Payload) -> Self {
        Self {
            id,
            sender,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Routable text: message text or callback data.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(t) => Some(t),
            Payload::Callback { data, .. } => Some(data),
            Payload::Unsupported(_) => None,
        }
    }

    pub fn callback_id(&self) -> Option<&str> {
        match &self.payload {
            Payload::Callback { id, .. } => Some(id),
            _ => None,
        }
    }
}
