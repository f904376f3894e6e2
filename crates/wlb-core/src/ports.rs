//! Ingress-side ports: how updates reach the engine and how the push endpoint
//! gets registered. Egress lives in [`crate::messaging::port`].

use std::time::Duration;

use async_trait::async_trait;

use crate::{delivery::WebhookEndpoint, domain::UpdateId, update::Update, Result};

/// Long-poll fetch of pending updates.
#[async_trait]
pub trait UpdateFetcher: Send + Sync {
    /// Return updates with id >= `offset` (all pending when `None`), blocking
    /// server-side for up to `timeout` when there are none.
    ///
    /// Network trouble must surface as [`crate::Error::Transient`].
    async fn fetch_updates(&self, offset: Option<UpdateId>, timeout: Duration)
        -> Result<Vec<Update>>;
}

/// Registration of the push endpoint with the platform. Both calls are idempotent.
#[async_trait]
pub trait WebhookRegistrar: Send + Sync {
    async fn set_webhook(&self, endpoint: &WebhookEndpoint) -> Result<()>;
    async fn delete_webhook(&self) -> Result<()>;
}

/// Decodes one push request body in the platform's event schema.
pub trait UpdateDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<Update>;

    /// Header carrying the shared secret on every push request.
    fn secret_header(&self) -> &'static str;
}
