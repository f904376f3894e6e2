use async_trait::async_trait;

use crate::{
    domain::MessageRef,
    messaging::types::{MessagingCapabilities, OutboundMessage},
    Result,
};

/// Cross-messenger egress port.
///
/// Implementations translate an already validated [`OutboundMessage`] into the
/// platform's send call. Validation happens in the reply builder, not here.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Send one reply. Long text is split by the adapter; controls ride on the last part.
    ///
    /// Parts go out in order and sending stops at the first failed part, so an
    /// error may follow a partial delivery without the controls.
    async fn send_reply(&self, msg: &OutboundMessage) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
