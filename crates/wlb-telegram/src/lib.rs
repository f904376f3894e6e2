//! Telegram adapter (teloxide).
//!
//! Implements the `wlb-core` ports over the Telegram Bot API: outbound
//! messaging, long-poll fetch, webhook registration and push decoding.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo},
};

use tokio::time::sleep;
use tracing::warn;

pub mod api;
pub mod convert;
pub mod handlers;
pub mod router;

use wlb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{Control, MessagingCapabilities, OutboundMessage},
    },
    reply::split_text,
    Result,
};

pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    max_message_len: usize,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, max_message_len: usize) -> Self {
        Self {
            bot,
            max_message_len: max_message_len.clamp(1, TELEGRAM_MESSAGE_LIMIT),
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }
}

/// Map a Bot API failure into the core error type.
///
/// Anything that may succeed when simply tried again is transient.
pub fn map_err(e: teloxide::RequestError) -> Error {
    match e {
        teloxide::RequestError::Network(_)
        | teloxide::RequestError::Io(_)
        | teloxide::RequestError::RetryAfter(_) => Error::Transient(format!("telegram: {e}")),
        other => Error::External(format!("telegram error: {other}")),
    }
}

/// Honour one `RetryAfter` from the Bot API before giving up.
pub(crate) async fn with_retry<T, Fut>(mut op: impl FnMut() -> Fut) -> Result<T>
where
    Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
    Fut::IntoFuture: Send,
{
    const MAX_RETRIES: usize = 1;
    let mut attempts = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match e {
                teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(d).await;
                    continue;
                }
                other => return Err(map_err(other)),
            },
        }
    }
}

/// One control per row, in reply order. `None` when there is nothing to attach.
pub fn keyboard(controls: &[Control]) -> Result<Option<InlineKeyboardMarkup>> {
    if controls.is_empty() {
        return Ok(None);
    }

    let mut rows = Vec::with_capacity(controls.len());
    for control in controls {
        let button = match control {
            Control::Callback { label, data } => {
                InlineKeyboardButton::callback(label.clone(), data.clone())
            }
            Control::Url { label, url } => {
                InlineKeyboardButton::url(label.clone(), parse_url(url)?)
            }
            Control::WebApp { label, url } => InlineKeyboardButton::web_app(
                label.clone(),
                WebAppInfo {
                    url: parse_url(url)?,
                },
            ),
        };
        rows.push(vec![button]);
    }

    Ok(Some(InlineKeyboardMarkup::new(rows)))
}

/// Send `parts` in order with `markup` on the last one; returns the last message id.
///
/// Stops at the first failed part. Parts after it, including the one carrying
/// the keyboard, are not sent.
async fn send_parts<F, Fut>(
    recipient: ChatId,
    parts: Vec<String>,
    markup: Option<InlineKeyboardMarkup>,
    mut send: F,
) -> Result<i32>
where
    F: FnMut(String, Option<InlineKeyboardMarkup>) -> Fut,
    Fut: std::future::Future<Output = Result<i32>>,
{
    let total = parts.len();
    let mut last_id = None;
    for (i, part) in parts.into_iter().enumerate() {
        let markup = if i + 1 == total { markup.clone() } else { None };
        match send(part, markup).await {
            Ok(id) => last_id = Some(id),
            Err(e) => {
                warn!(chat_id = recipient.0, sent = i, total, "reply cut short: {e}");
                return Err(e);
            }
        }
    }
    last_id.ok_or_else(|| Error::External("nothing to send".to_string()))
}

fn parse_url(raw: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse(raw.trim())
        .map_err(|e| Error::MalformedControl(format!("invalid url {raw:?}: {e}")))
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_inline_keyboards: true,
            supports_web_apps: true,
            max_message_len: self.max_message_len,
        }
    }

    async fn send_reply(&self, msg: &OutboundMessage) -> Result<MessageRef> {
        let chat = Self::tg_chat(msg.recipient);
        let markup = keyboard(&msg.controls)?;
        let parts = split_text(&msg.text, self.max_message_len);

        let message_id = send_parts(msg.recipient, parts, markup, |part, markup| async move {
            let m = with_retry(|| {
                let mut req = self.bot.send_message(chat, part.clone());
                if let Some(kb) = &markup {
                    req = req.reply_markup(kb.clone());
                }
                req
            })
            .await?;
            Ok(m.id.0)
        })
        .await?;

        Ok(MessageRef {
            chat_id: msg.recipient,
            message_id: MessageId(message_id),
        })
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn keyboard_keeps_order_one_per_row() {
        let kb = keyboard(&[
            Control::web_app("📋 Open wishlist", "https://app.example.com"),
            Control::callback("More", "more"),
            Control::url("Site", "https://example.com/about"),
        ])
        .unwrap()
        .unwrap();

        assert_eq!(kb.inline_keyboard.len(), 3);
        assert!(kb.inline_keyboard.iter().all(|row| row.len() == 1));
        assert!(matches!(
            &kb.inline_keyboard[0][0].kind,
            InlineKeyboardButtonKind::WebApp(info)
                if info.url.as_str() == "https://app.example.com/"
        ));
        assert!(matches!(
            &kb.inline_keyboard[1][0].kind,
            InlineKeyboardButtonKind::CallbackData(d) if d == "more"
        ));
        assert_eq!(kb.inline_keyboard[2][0].text, "Site");
    }

    #[tokio::test]
    async fn keyboard_rides_on_the_last_part() {
        let kb = keyboard(&[Control::callback("More", "more")]).unwrap();
        let mut calls = Vec::new();
        let id = send_parts(ChatId(1), vec!["a".into(), "b".into()], kb, |part, markup| {
            calls.push((part, markup.is_some()));
            let id = calls.len() as i32;
            async move { Ok(id) }
        })
        .await
        .unwrap();

        assert_eq!(id, 2);
        assert_eq!(calls, vec![("a".to_string(), false), ("b".to_string(), true)]);
    }

    #[tokio::test]
    async fn failed_middle_part_stops_the_send() {
        let kb = keyboard(&[Control::callback("More", "more")]).unwrap();
        let mut calls = Vec::new();
        let parts = vec!["a".into(), "b".into(), "c".into()];
        let res = send_parts(ChatId(1), parts, kb, |part, markup| {
            let fail = part == "b";
            calls.push((part, markup.is_some()));
            async move {
                if fail {
                    Err(Error::Transient("timeout".to_string()))
                } else {
                    Ok(1)
                }
            }
        })
        .await;

        assert!(res.unwrap_err().is_transient());
        assert_eq!(calls, vec![("a".to_string(), false), ("b".to_string(), false)]);
    }

    #[test]
    fn no_controls_no_keyboard() {
        assert!(keyboard(&[]).unwrap().is_none());
    }

    #[test]
    fn network_trouble_is_transient() {
        let retry = map_err(teloxide::RequestError::RetryAfter(Duration::from_secs(1)));
        assert!(retry.is_transient());

        let api = map_err(teloxide::RequestError::Api(
            teloxide::ApiError::BotBlocked,
        ));
        assert!(!api.is_transient());
    }

    #[test]
    fn messenger_limit_never_exceeds_telegram() {
        let m = TelegramMessenger::new(Bot::new("1:test"), 10_000);
        assert_eq!(m.capabilities().max_message_len, TELEGRAM_MESSAGE_LIMIT);
        assert!(m.capabilities().supports_web_apps);
    }
}
