use std::{sync::Arc, time::Duration};

use crate::{
    delivery::DeliveryState,
    executor::HandlerExecutor,
    sequencer::{Admission, Sequencer},
    update::Update,
};

/// What happened to an ingested update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ingest {
    Dispatched,
    Duplicate,
    /// Sequenced, but nothing to handle (no sender, or executor draining).
    Skipped,
}

/// Sequencer in front of the handler executor.
///
/// `ingest` never waits on a handler: the id is recorded and the handler is
/// scheduled before it returns, so update sources can ack or fetch again.
pub struct Pipeline {
    sequencer: Sequencer,
    executor: HandlerExecutor,
}

impl Pipeline {
    pub fn new(state: Arc<DeliveryState>, executor: HandlerExecutor) -> Self {
        Self {
            sequencer: Sequencer::new(state),
            executor,
        }
    }

    pub fn ingest(&self, update: Update) -> Ingest {
        match self.sequencer.admit(update.id) {
            Admission::Duplicate => Ingest::Duplicate,
            Admission::Dispatch => {
                if self.executor.dispatch(update) {
                    Ingest::Dispatched
                } else {
                    Ingest::Skipped
                }
            }
        }
    }

    pub fn state(&self) -> &Arc<DeliveryState> {
        self.sequencer.state()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.executor.shutdown(grace).await
    }
}
