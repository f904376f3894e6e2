use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    pipeline::{Ingest, Pipeline},
    ports::UpdateFetcher,
    retry::{sleep_or_cancel, Backoff, BackoffPolicy},
    Result,
};

/// Long-poll loop.
///
/// The next fetch is issued as soon as the previous batch has been sequenced,
/// not when its handlers finish, so a slow handler never stalls ingestion.
pub struct PollingSource {
    fetcher: Arc<dyn UpdateFetcher>,
    timeout: Duration,
    backoff: BackoffPolicy,
}

impl PollingSource {
    pub fn new(fetcher: Arc<dyn UpdateFetcher>, timeout: Duration, backoff: BackoffPolicy) -> Self {
        Self {
            fetcher,
            timeout,
            backoff,
        }
    }

    pub async fn run(&self, pipeline: &Pipeline, cancel: &CancellationToken) -> Result<()> {
        let mut backoff = Backoff::new(self.backoff);
        info!(timeout = ?self.timeout, "polling for updates");

        loop {
            let offset = pipeline.state().offset();
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                r = self.fetcher.fetch_updates(offset, self.timeout) => r,
            };

            match fetched {
                Ok(mut batch) => {
                    backoff.reset();
                    if batch.is_empty() {
                        continue;
                    }
                    // Transport order is not trusted; the sequencer drops anything stale.
                    batch.sort_by_key(|u| u.id);
                    let total = batch.len();
                    let dispatched = batch
                        .into_iter()
                        .map(|u| pipeline.ingest(u))
                        .filter(|outcome| *outcome == Ingest::Dispatched)
                        .count();
                    let next_offset = pipeline.state().offset();
                    debug!(total, dispatched, ?next_offset, "batch sequenced");
                }
                Err(e) if e.is_transient() => {
                    let delay = backoff.next_delay();
                    warn!("fetching updates failed, retrying in {delay:?}: {e}");
                    if !sleep_or_cancel(delay, cancel).await {
                        break;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        info!("polling stopped");
        Ok(())
    }
}
