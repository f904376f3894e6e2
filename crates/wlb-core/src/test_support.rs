//! In-crate fakes for the ports.

use std::sync::{
    atomic::{AtomicI32, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef, UpdateId, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{MessagingCapabilities, OutboundMessage},
    },
    update::{Payload, Sender, Update},
    Result,
};

pub(crate) fn text_update(id: i64, user: i64, text: &str) -> Update {
    Update::new(
        UpdateId(id),
        Some(Sender {
            user_id: UserId(user),
            chat_id: ChatId(user),
            first_name: format!("user{user}"),
            username: None,
        }),
        Payload::Text(text.to_string()),
    )
}

#[derive(Default)]
pub(crate) struct RecordingMessenger {
    next_id: AtomicI32,
    fail_first: AtomicUsize,
    sent: Mutex<Vec<OutboundMessage>>,
    answered: Mutex<Vec<String>>,
}

impl RecordingMessenger {
    pub(crate) fn failing_first(n: usize) -> Self {
        Self {
            fail_first: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_texts(&self) -> Vec<(ChatId, String)> {
        self.sent()
            .into_iter()
            .map(|m| (m.recipient, m.text))
            .collect()
    }

    pub(crate) fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_inline_keyboards: true,
            supports_web_apps: true,
            max_message_len: 4096,
        }
    }

    async fn send_reply(&self, msg: &OutboundMessage) -> Result<MessageRef> {
        let should_fail = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Error::Transient("simulated send failure".to_string()));
        }
        self.sent.lock().unwrap().push(msg.clone());
        Ok(MessageRef {
            chat_id: msg.recipient,
            message_id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
        })
    }

    async fn answer_callback_query(&self, callback_id: &str, _text: Option<&str>) -> Result<()> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}
