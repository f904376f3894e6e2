use std::{
    env, fs,
    net::{IpAddr, SocketAddr},
    path::Path,
    time::Duration,
};

use crate::{
    delivery::{DeliveryMode, WebhookEndpoint},
    errors::Error,
    retry::BackoffPolicy,
    Result,
};

pub const DEFAULT_WEBAPP_URL: &str = "https://wishlistme-tg.onrender.com";

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub bot_username: Option<String>,
    pub webapp_url: String,

    // Delivery
    pub delivery_mode: DeliveryMode,
    /// Set in webhook mode only.
    pub webhook: Option<WebhookConfig>,
    pub poll_timeout: Duration,
    pub backoff: BackoffPolicy,
    pub registration_attempts: u32,

    // Execution
    pub max_concurrent_handlers: usize,
    pub shutdown_grace: Duration,

    // Telegram limits
    pub telegram_message_limit: usize,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub listen: SocketAddr,
    pub endpoint: WebhookEndpoint,
}

impl Config {
    /// Load from the process environment, honouring a `.env` file in the
    /// working directory (existing variables win).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required env vars
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;

        let delivery_mode = match get("DELIVERY_MODE") {
            Some(raw) => raw.parse::<DeliveryMode>()?,
            None => DeliveryMode::Webhook,
        };

        let webhook = match delivery_mode {
            DeliveryMode::Polling => None,
            DeliveryMode::Webhook => {
                let domain = get("WEBHOOK_DOMAIN").ok_or_else(|| {
                    Error::Config(
                        "WEBHOOK_DOMAIN environment variable is required in webhook mode"
                            .to_string(),
                    )
                })?;
                let host: IpAddr = parse_or(&get, "WEBHOOK_LISTEN", IpAddr::from([0, 0, 0, 0]))?;
                let port: u16 = parse_or(&get, "WEBHOOK_PORT", 8443)?;
                Some(WebhookConfig {
                    listen: SocketAddr::new(host, port),
                    endpoint: WebhookEndpoint::derive(&domain, &telegram_bot_token)?,
                })
            }
        };

        let webapp_url = get("WEBAPP_URL")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_WEBAPP_URL.to_string());
        let bot_username = get("BOT_USERNAME")
            .map(|s| s.trim().trim_start_matches('@').to_string());

        let poll_timeout = Duration::from_secs(parse_or(&get, "POLL_TIMEOUT_SECS", 10u64)?);
        let backoff = BackoffPolicy {
            initial: Duration::from_millis(parse_or(&get, "BACKOFF_INITIAL_MS", 500u64)?),
            max: Duration::from_millis(parse_or(&get, "BACKOFF_MAX_MS", 30_000u64)?),
        };
        let registration_attempts = at_least_one(
            "REGISTRATION_ATTEMPTS",
            parse_or(&get, "REGISTRATION_ATTEMPTS", 3u32)?,
        )?;

        let max_concurrent_handlers = at_least_one(
            "MAX_CONCURRENT_HANDLERS",
            parse_or(&get, "MAX_CONCURRENT_HANDLERS", 16usize)?,
        )?;
        let shutdown_grace =
            Duration::from_millis(parse_or(&get, "SHUTDOWN_GRACE_MS", 10_000u64)?);

        let telegram_message_limit = parse_or(&get, "TELEGRAM_MESSAGE_LIMIT", 4096usize)?;

        Ok(Self {
            telegram_bot_token,
            bot_username,
            webapp_url,
            delivery_mode,
            webhook,
            poll_timeout,
            backoff,
            registration_attempts,
            max_concurrent_handlers,
            shutdown_grace,
            telegram_message_limit,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("{key}: invalid value {s:?}: {e}"))),
    }
}

fn at_least_one<T: PartialOrd + From<u8>>(key: &str, v: T) -> Result<T> {
    if v < T::from(1) {
        return Err(Error::Config(format!("{key} must be at least 1")));
    }
    Ok(v)
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
