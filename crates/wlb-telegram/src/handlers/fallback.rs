use async_trait::async_trait;

use wlb_core::{
    handler::{Handler, Invocation},
    reply::Reply,
    update::Payload,
    Result,
};

pub const UNKNOWN_COMMAND_HINT: &str = "Unknown command. Send /help to see what I can do.";
pub const UNSUPPORTED_HINT: &str =
    "I only understand text for now. Send /help to see what I can do.";

/// Anything no command claimed: unknown commands get a hint, plain text is echoed.
pub struct FallbackHandler;

#[async_trait]
impl Handler for FallbackHandler {
    async fn handle(&self, call: &Invocation) -> Result<Reply> {
        if call.command.is_some() {
            return Ok(Reply::text(UNKNOWN_COMMAND_HINT));
        }
        let reply = match &call.update.payload {
            Payload::Text(t) if !t.trim().is_empty() => Reply::text(t.clone()),
            _ => Reply::text(UNSUPPORTED_HINT),
        };
        Ok(reply)
    }
}
