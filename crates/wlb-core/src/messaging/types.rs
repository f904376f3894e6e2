use crate::domain::ChatId;

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_inline_keyboards: bool,
    /// Can a control open an embedded web view (Telegram Mini Apps).
    pub supports_web_apps: bool,
    pub max_message_len: usize,
}

/// An interactive control attached to a reply. Carries no handler logic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    /// Button that comes back as a callback update carrying `data`.
    Callback { label: String, data: String },
    /// Button that opens `url` in the user's browser.
    Url { label: String, url: String },
    /// Button that opens `url` as an embedded web app.
    WebApp { label: String, url: String },
}

impl Control {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Control::Callback {
            label: label.into(),
            data: data.into(),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Control::Url {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn web_app(label: impl Into<String>, url: impl Into<String>) -> Self {
        Control::WebApp {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Control::Callback { label, .. }
            | Control::Url { label, .. }
            | Control::WebApp { label, .. } => label,
        }
    }
}

/// Wire-ready message. Every control in here has passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: ChatId,
    pub text: String,
    pub controls: Vec<Control>,
}
