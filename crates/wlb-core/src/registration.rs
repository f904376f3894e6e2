use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    delivery::{DeliveryState, WebhookEndpoint},
    errors::Error,
    ports::WebhookRegistrar,
    retry::{sleep_or_cancel, Backoff, BackoffPolicy},
    Result,
};

/// Registers the push endpoint at startup and removes it at shutdown.
///
/// Sole writer of the webhook field in [`DeliveryState`].
pub struct WebhookRegistration {
    registrar: Arc<dyn WebhookRegistrar>,
    state: Arc<DeliveryState>,
    attempts: u32,
    backoff: BackoffPolicy,
}

impl WebhookRegistration {
    pub fn new(
        registrar: Arc<dyn WebhookRegistrar>,
        state: Arc<DeliveryState>,
        attempts: u32,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            registrar,
            state,
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Register `endpoint`, retrying up to the configured attempt count.
    ///
    /// Re-registering the same URL is a no-op on the platform side, so retries
    /// after an ambiguous failure are safe. Cancelling during a backoff returns
    /// `Ok` with nothing registered.
    pub async fn register(
        &self,
        endpoint: &WebhookEndpoint,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut backoff = Backoff::new(self.backoff);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.registrar.set_webhook(endpoint).await {
                Ok(()) => {
                    let origin = endpoint.url.origin().ascii_serialization();
                    info!(url = %origin, attempt, "webhook registered");
                    self.state.set_webhook(Some(endpoint.clone()));
                    return Ok(());
                }
                Err(e) if attempt < self.attempts => {
                    let delay = backoff.next_delay();
                    warn!(
                        attempt,
                        max_attempts = self.attempts,
                        "webhook registration failed, retrying in {delay:?}: {e}"
                    );
                    if !sleep_or_cancel(delay, cancel).await {
                        info!(attempt, "webhook registration cancelled");
                        return Ok(());
                    }
                }
                Err(e) => {
                    return Err(Error::Registration {
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Best-effort removal. A stale registration only makes the platform retry
    /// into a dead endpoint, so failures are logged and swallowed.
    pub async fn deregister(&self) {
        if self.state.webhook().is_none() {
            return;
        }
        match self.registrar.delete_webhook().await {
            Ok(()) => info!("webhook removed"),
            Err(e) => warn!("failed to remove webhook: {e}"),
        }
        self.state.set_webhook(None);
    }
}
