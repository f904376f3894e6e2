use std::sync::Arc;

use tracing::debug;

use crate::{delivery::DeliveryState, domain::UpdateId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Dispatch,
    /// Already dispatched (or older than something that was). Drop silently.
    Duplicate,
}

/// Enforces at-most-once dispatch per update id.
///
/// The highest dispatched id lives in [`DeliveryState`] as the polling offset,
/// so admitting an update and advancing the offset are the same step.
#[derive(Clone, Debug)]
pub struct Sequencer {
    state: Arc<DeliveryState>,
}

impl Sequencer {
    pub fn new(state: Arc<DeliveryState>) -> Self {
        Self { state }
    }

    pub fn admit(&self, id: UpdateId) -> Admission {
        if self.state.try_advance(id) {
            Admission::Dispatch
        } else {
            debug!(update_id = id.0, "dropping duplicate or stale update");
            Admission::Duplicate
        }
    }

    /// Highest dispatched id, if any.
    pub fn last_dispatched(&self) -> Option<UpdateId> {
        self.state.offset().map(|next| UpdateId(next.0 - 1))
    }

    pub fn state(&self) -> &Arc<DeliveryState> {
        &self.state
    }
}
