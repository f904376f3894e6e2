use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    delivery::WebhookEndpoint,
    pipeline::Pipeline,
    ports::UpdateDecoder,
    registration::WebhookRegistration,
    Result,
};

#[derive(Clone)]
struct WebhookApp {
    pipeline: Arc<Pipeline>,
    decoder: Arc<dyn UpdateDecoder>,
    /// SHA-256 of the expected secret token.
    secret_digest: Arc<[u8]>,
}

/// Routes for the push endpoint: a single `POST` on the secret path.
pub fn webhook_routes(
    endpoint: &WebhookEndpoint,
    decoder: Arc<dyn UpdateDecoder>,
    pipeline: Arc<Pipeline>,
) -> Router {
    let app = WebhookApp {
        pipeline,
        decoder,
        secret_digest: Arc::from(Sha256::digest(endpoint.secret_token.as_bytes()).as_slice()),
    };
    Router::new()
        .route(&endpoint.path, post(receive_update))
        .with_state(app)
}

/// Acknowledge as soon as the update is sequenced; handlers run afterwards.
///
/// Undecodable bodies are acknowledged too, otherwise the platform would keep
/// redelivering the same poison update.
async fn receive_update(
    State(app): State<WebhookApp>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let presented = headers
        .get(app.decoder.secret_header())
        .map(|v| v.as_bytes());
    if !presented.is_some_and(|p| secret_matches(p, &app.secret_digest)) {
        warn!("rejecting webhook call with missing or wrong secret token");
        return StatusCode::UNAUTHORIZED;
    }

    match app.decoder.decode(&body) {
        Ok(update) => {
            let id = update.id;
            let outcome = app.pipeline.ingest(update);
            debug!(update_id = id.0, ?outcome, "webhook update ingested");
        }
        Err(e) => warn!(bytes = body.len(), "undecodable webhook body: {e}"),
    }

    StatusCode::OK
}

/// Compares digests in constant time, so response timing says nothing about
/// how much of the secret was right.
fn secret_matches(presented: &[u8], expected_digest: &[u8]) -> bool {
    let digest = Sha256::digest(presented);
    digest.len() == expected_digest.len()
        && digest
            .iter()
            .zip(expected_digest)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// HTTP listener plus the registration it depends on.
pub struct WebhookSource {
    listen: SocketAddr,
    endpoint: WebhookEndpoint,
    decoder: Arc<dyn UpdateDecoder>,
    registration: WebhookRegistration,
}

impl WebhookSource {
    pub fn new(
        listen: SocketAddr,
        endpoint: WebhookEndpoint,
        decoder: Arc<dyn UpdateDecoder>,
        registration: WebhookRegistration,
    ) -> Self {
        Self {
            listen,
            endpoint,
            decoder,
            registration,
        }
    }

    /// Bind, register, serve until cancelled, then deregister (best-effort).
    ///
    /// The socket is bound before registering so the platform's first callback
    /// finds a live listener.
    pub async fn run(&self, pipeline: Arc<Pipeline>, cancel: &CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(self.listen).await?;
        info!(addr = %self.listen, "webhook listener bound");

        self.registration.register(&self.endpoint, cancel).await?;
        if cancel.is_cancelled() {
            info!("cancelled during startup, not serving");
            self.registration.deregister().await;
            return Ok(());
        }

        let app = webhook_routes(&self.endpoint, self.decoder.clone(), pipeline);
        let shutdown = cancel.clone();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

        info!("webhook listener stopped");
        self.registration.deregister().await;
        served.map_err(Into::into)
    }
}
