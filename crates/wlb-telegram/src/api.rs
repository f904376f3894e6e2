//! Bot API calls behind the ingress ports.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::{prelude::*, types::AllowedUpdate};
use tracing::debug;

use wlb_core::{
    delivery::WebhookEndpoint,
    domain::UpdateId,
    errors::Error,
    ports::{UpdateFetcher, WebhookRegistrar},
    update::Update,
    Result,
};

use crate::{convert::to_core, with_retry};

/// Headroom on top of the long-poll timeout before the HTTP client gives up.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

fn allowed_updates() -> Vec<AllowedUpdate> {
    vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]
}

/// Build a bot whose HTTP timeout outlasts a long poll of `poll_timeout`.
pub fn bot(token: &str, poll_timeout: Duration) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(poll_timeout + CLIENT_TIMEOUT_SLACK)
        .build()
        .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
    Ok(Bot::with_client(token, client))
}

#[derive(Clone)]
pub struct TelegramApi {
    bot: Bot,
}

impl TelegramApi {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl UpdateFetcher for TelegramApi {
    async fn fetch_updates(
        &self,
        offset: Option<UpdateId>,
        timeout: Duration,
    ) -> Result<Vec<Update>> {
        let offset = offset
            .map(|o| i32::try_from(o.0))
            .transpose()
            .map_err(|_| Error::External("update offset out of range".to_string()))?;
        let secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);

        let updates = with_retry(|| {
            let mut req = self
                .bot
                .get_updates()
                .timeout(secs)
                .allowed_updates(allowed_updates());
            if let Some(o) = offset {
                req = req.offset(o);
            }
            req
        })
        .await?;

        debug!(count = updates.len(), ?offset, "fetched updates");
        Ok(updates.into_iter().map(to_core).collect())
    }
}

#[async_trait]
impl WebhookRegistrar for TelegramApi {
    async fn set_webhook(&self, endpoint: &WebhookEndpoint) -> Result<()> {
        with_retry(|| {
            self.bot
                .set_webhook(endpoint.url.clone())
                .secret_token(endpoint.secret_token.clone())
                .allowed_updates(allowed_updates())
        })
        .await?;
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<()> {
        with_retry(|| self.bot.delete_webhook()).await?;
        Ok(())
    }
}
