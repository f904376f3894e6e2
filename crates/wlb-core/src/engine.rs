//! Top-level assembly: one update source feeding the sequencer and executor.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::Config,
    delivery::{DeliveryMode, DeliveryState},
    errors::Error,
    executor::HandlerExecutor,
    messaging::port::MessagingPort,
    pipeline::Pipeline,
    ports::{UpdateDecoder, UpdateFetcher, WebhookRegistrar},
    registration::WebhookRegistration,
    router::CommandRouter,
    source::{PollingSource, UpdateSource, WebhookSource},
    Result,
};

/// Platform-side implementations of every port the engine needs.
#[derive(Clone)]
pub struct Adapters {
    pub messenger: Arc<dyn MessagingPort>,
    pub fetcher: Arc<dyn UpdateFetcher>,
    pub registrar: Arc<dyn WebhookRegistrar>,
    pub decoder: Arc<dyn UpdateDecoder>,
}

pub struct Engine {
    pipeline: Arc<Pipeline>,
    source: UpdateSource,
    shutdown_grace: Duration,
}

impl Engine {
    pub fn new(cfg: &Config, router: CommandRouter, adapters: Adapters) -> Result<Self> {
        let state = Arc::new(DeliveryState::new(cfg.delivery_mode));
        let executor = HandlerExecutor::new(
            Arc::new(router),
            adapters.messenger,
            cfg.max_concurrent_handlers,
        );
        let pipeline = Arc::new(Pipeline::new(state.clone(), executor));

        let source = match cfg.delivery_mode {
            DeliveryMode::Polling => UpdateSource::Polling(PollingSource::new(
                adapters.fetcher,
                cfg.poll_timeout,
                cfg.backoff,
            )),
            DeliveryMode::Webhook => {
                let hook = cfg.webhook.clone().ok_or_else(|| {
                    Error::Config("webhook mode selected without webhook settings".to_string())
                })?;
                let registration = WebhookRegistration::new(
                    adapters.registrar,
                    state,
                    cfg.registration_attempts,
                    cfg.backoff,
                );
                UpdateSource::Webhook(WebhookSource::new(
                    hook.listen,
                    hook.endpoint,
                    adapters.decoder,
                    registration,
                ))
            }
        };

        Ok(Self {
            pipeline,
            source,
            shutdown_grace: cfg.shutdown_grace,
        })
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Run until `cancel` fires or the source fails, then drain in-flight handlers.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!(mode = %self.source.mode(), "engine starting");

        let outcome = self.source.run(self.pipeline.clone(), &cancel).await;
        if let Err(e) = &outcome {
            warn!("update source stopped with error: {e}");
        }

        let abandoned = self.pipeline.shutdown(self.shutdown_grace).await;
        if abandoned > 0 {
            warn!(abandoned, "handlers still running after shutdown grace period");
        }
        info!(last_dispatched = ?self.pipeline.sequencer().last_dispatched(), "engine stopped");
        outcome
    }
}
