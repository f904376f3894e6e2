//! Update sources. Exactly one runs per process, chosen at startup.

pub mod polling;
pub mod webhook;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{delivery::DeliveryMode, pipeline::Pipeline, Result};

pub use polling::PollingSource;
pub use webhook::WebhookSource;

pub enum UpdateSource {
    Polling(PollingSource),
    Webhook(WebhookSource),
}

impl UpdateSource {
    pub fn mode(&self) -> DeliveryMode {
        match self {
            UpdateSource::Polling(_) => DeliveryMode::Polling,
            UpdateSource::Webhook(_) => DeliveryMode::Webhook,
        }
    }

    /// Feed updates into `pipeline` until `cancel` fires or a fatal error occurs.
    pub async fn run(&self, pipeline: Arc<Pipeline>, cancel: &CancellationToken) -> Result<()> {
        match self {
            UpdateSource::Polling(source) => source.run(&pipeline, cancel).await,
            UpdateSource::Webhook(source) => source.run(pipeline, cancel).await,
        }
    }
}
