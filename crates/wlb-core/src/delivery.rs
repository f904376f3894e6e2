//! Process-wide delivery mode state.
//!
//! Exactly two writers exist: the [`Sequencer`](crate::sequencer::Sequencer)
//! advances the offset and the
//! [`WebhookRegistration`](crate::registration::WebhookRegistration) records the
//! registered endpoint. Both setters are crate-private; everything else reads.

use std::sync::Mutex;

use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::{domain::UpdateId, errors::Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    Polling,
    Webhook,
}

impl std::str::FromStr for DeliveryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" | "poll" => Ok(DeliveryMode::Polling),
            "webhook" => Ok(DeliveryMode::Webhook),
            other => Err(Error::Config(format!(
                "DELIVERY_MODE must be `polling` or `webhook`, got {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Polling => write!(f, "polling"),
            DeliveryMode::Webhook => write!(f, "webhook"),
        }
    }
}

/// Externally reachable push endpoint, derived from the public domain and the bot token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookEndpoint {
    /// Full callback URL registered with the platform.
    pub url: Url,
    /// Route path on the local listener, with leading slash.
    pub path: String,
    /// Shared secret the platform echoes back on every callback.
    pub secret_token: String,
}

impl WebhookEndpoint {
    /// The path is a hash of the token so the credential itself never shows up
    /// in URLs, access logs or the platform's webhook info.
    pub fn derive(domain: &str, bot_token: &str) -> Result<Self> {
        let domain = domain.trim().trim_end_matches('/');
        if domain.is_empty() {
            return Err(Error::Config("webhook domain is empty".to_string()));
        }
        let base = if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };

        let path = format!("/{}", hex_sha256(bot_token));
        let url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| Error::Config(format!("invalid webhook domain {domain:?}: {e}")))?;
        if url.scheme() != "https" || url.host_str().map_or(true, str::is_empty) {
            return Err(Error::Config(format!(
                "webhook domain must be an https origin, got {domain:?}"
            )));
        }

        Ok(Self {
            url,
            path,
            secret_token: hex_sha256(&format!("{bot_token}:secret-token")),
        })
    }
}

fn hex_sha256(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

#[derive(Debug)]
pub struct DeliveryState {
    mode: DeliveryMode,
    /// Next update id the engine expects (highest dispatched + 1).
    offset: Mutex<Option<UpdateId>>,
    webhook: Mutex<Option<WebhookEndpoint>>,
}

impl DeliveryState {
    pub fn new(mode: DeliveryMode) -> Self {
        Self {
            mode,
            offset: Mutex::new(None),
            webhook: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn offset(&self) -> Option<UpdateId> {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn webhook(&self) -> Option<WebhookEndpoint> {
        self.webhook
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Atomically admit `id` if it is at or beyond the current offset.
    ///
    /// Returns true when admitted; the offset then becomes `id + 1`.
    pub(crate) fn try_advance(&self, id: UpdateId) -> bool {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        match *offset {
            Some(next) if id < next => false,
            _ => {
                *offset = Some(id.next());
                true
            }
        }
    }

    pub(crate) fn set_webhook(&self, endpoint: Option<WebhookEndpoint>) {
        *self.webhook.lock().unwrap_or_else(|e| e.into_inner()) = endpoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_hides_token_and_defaults_to_https() {
        let ep = WebhookEndpoint::derive("bot.example.com/", "123:ABC").unwrap();
        assert_eq!(ep.url.scheme(), "https");
        assert_eq!(ep.url.host_str(), Some("bot.example.com"));
        assert!(!ep.url.as_str().contains("123:ABC"));
        assert_eq!(ep.url.path(), ep.path);
        assert_eq!(ep.path.len(), 1 + 64);
        assert_ne!(ep.secret_token, ep.path.trim_start_matches('/'));
        assert!(ep
            .secret_token
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn endpoint_is_stable_for_same_token() {
        let a = WebhookEndpoint::derive("https://bot.example.com", "t").unwrap();
        let b = WebhookEndpoint::derive("https://bot.example.com", "t").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn endpoint_rejects_plain_http_and_empty() {
        assert!(WebhookEndpoint::derive("http://bot.example.com", "t").is_err());
        assert!(WebhookEndpoint::derive("  ", "t").is_err());
    }

    #[test]
    fn mode_parses() {
        assert_eq!("Polling".parse::<DeliveryMode>().unwrap(), DeliveryMode::Polling);
        assert_eq!("webhook".parse::<DeliveryMode>().unwrap(), DeliveryMode::Webhook);
        assert!("both".parse::<DeliveryMode>().is_err());
    }
}
