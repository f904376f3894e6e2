//! Telegram update schema → core [`Update`].

use teloxide::types::{CallbackQuery, Message, UpdateKind, User};

use wlb_core::{
    domain::{ChatId, UpdateId, UserId},
    ports::UpdateDecoder,
    update::{Payload, Sender, Update},
    Result,
};

pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

pub fn to_core(update: teloxide::types::Update) -> Update {
    let id = UpdateId(i64::from(update.id));
    match update.kind {
        UpdateKind::Message(msg) => from_message(id, &msg),
        UpdateKind::CallbackQuery(q) => from_callback(id, q),
        other => Update::new(id, None, Payload::Unsupported(kind_name(&other).to_string())),
    }
}

fn from_message(id: UpdateId, msg: &Message) -> Update {
    let sender = msg.from().map(|u| sender(u, ChatId(msg.chat.id.0)));
    let payload = match msg.text() {
        Some(text) => Payload::Text(text.to_string()),
        None => Payload::Unsupported("message".to_string()),
    };
    Update::new(id, sender, payload)
}

fn from_callback(id: UpdateId, q: CallbackQuery) -> Update {
    // Private chats share the user's id; use it when the origin message is gone.
    let chat_id = q
        .message
        .as_ref()
        .map(|m| ChatId(m.chat.id.0))
        .unwrap_or(ChatId(q.from.id.0 as i64));
    let sender = sender(&q.from, chat_id);
    let payload = match q.data {
        Some(data) => Payload::Callback { id: q.id, data },
        None => Payload::Unsupported("callback_query".to_string()),
    };
    Update::new(id, Some(sender), payload)
}

fn sender(user: &User, chat_id: ChatId) -> Sender {
    Sender {
        user_id: UserId(user.id.0 as i64),
        chat_id,
        first_name: user.first_name.clone(),
        username: user.username.clone(),
    }
}

fn kind_name(kind: &UpdateKind) -> &'static str {
    match kind {
        UpdateKind::Message(_) => "message",
        UpdateKind::EditedMessage(_) => "edited_message",
        UpdateKind::ChannelPost(_) => "channel_post",
        UpdateKind::EditedChannelPost(_) => "edited_channel_post",
        UpdateKind::InlineQuery(_) => "inline_query",
        UpdateKind::ChosenInlineResult(_) => "chosen_inline_result",
        UpdateKind::CallbackQuery(_) => "callback_query",
        UpdateKind::Poll(_) => "poll",
        UpdateKind::PollAnswer(_) => "poll_answer",
        _ => "other",
    }
}

/// Decodes webhook request bodies (one JSON `Update` each).
#[derive(Clone, Copy, Debug, Default)]
pub struct TelegramDecoder;

impl UpdateDecoder for TelegramDecoder {
    fn decode(&self, body: &[u8]) -> Result<Update> {
        let update: teloxide::types::Update = serde_json::from_slice(body)?;
        Ok(to_core(update))
    }

    fn secret_header(&self) -> &'static str {
        SECRET_TOKEN_HEADER
    }
}
