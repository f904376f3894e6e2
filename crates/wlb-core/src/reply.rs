//! Reply model and the builder that turns it into a wire-ready message.

use reqwest::Url;
use tracing::warn;

use crate::{
    domain::ChatId,
    errors::Error,
    messaging::types::{Control, MessagingCapabilities, OutboundMessage},
    Result,
};

/// Telegram caps `callback_data` at 64 bytes.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

const EMPTY_REPLY_PLACEHOLDER: &str = "…";

/// Semantic output of a handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub controls: Vec<Control>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            controls: Vec::new(),
        }
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }
}

/// Build the outbound message for `reply`.
///
/// Controls that fail validation are dropped one by one; the text always goes
/// out, so a bad control degrades the reply instead of failing it.
pub fn build_outbound(
    reply: Reply,
    recipient: ChatId,
    caps: &MessagingCapabilities,
) -> OutboundMessage {
    let text = if reply.text.trim().is_empty() {
        EMPTY_REPLY_PLACEHOLDER.to_string()
    } else {
        reply.text
    };

    let controls = reply
        .controls
        .into_iter()
        .filter(|control| match validate_control(control, caps) {
            Ok(()) => true,
            Err(e) => {
                warn!(chat_id = recipient.0, "dropping control: {e}");
                false
            }
        })
        .collect();

    OutboundMessage {
        recipient,
        text,
        controls,
    }
}

pub fn validate_control(control: &Control, caps: &MessagingCapabilities) -> Result<()> {
    if !caps.supports_inline_keyboards {
        return Err(Error::MalformedControl(
            "transport does not support inline controls".to_string(),
        ));
    }
    if control.label().trim().is_empty() {
        return Err(Error::MalformedControl("blank label".to_string()));
    }

    match control {
        Control::Callback { data, .. } => {
            if data.is_empty() || data.len() > MAX_CALLBACK_DATA_LEN {
                return Err(Error::MalformedControl(format!(
                    "callback data must be 1..={MAX_CALLBACK_DATA_LEN} bytes, got {}",
                    data.len()
                )));
            }
        }
        Control::Url { url, .. } => {
            let parsed = parse_absolute(url)?;
            if parsed.scheme() != "https" {
                return Err(Error::MalformedControl(format!(
                    "url must use https, got {}",
                    parsed.scheme()
                )));
            }
        }
        Control::WebApp { url, .. } => {
            if !caps.supports_web_apps {
                return Err(Error::MalformedControl(
                    "transport cannot open web apps".to_string(),
                ));
            }
            let parsed = parse_absolute(url)?;
            if parsed.scheme() != "https" {
                return Err(Error::MalformedControl(format!(
                    "web app url must use https, got {}",
                    parsed.scheme()
                )));
            }
        }
    }

    Ok(())
}

fn parse_absolute(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::MalformedControl(format!("invalid url {raw:?}: {e}")))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::MalformedControl(format!("url has no host: {raw:?}")));
    }
    Ok(url)
}

/// Split long messages for the transport's size limit.
///
/// Prefers a newline, then a space, and never cuts inside a UTF-8 character.
pub fn split_text(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // max_len is smaller than this character; take it whole.
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .filter(|pos| *pos > 0)
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}
