//! Bot handlers: `/start`, `/help` and the fallback.
//!
//! Handlers only compute a [`wlb_core::reply::Reply`]; the engine validates and
//! sends it, so none of them touch the Bot API.

use std::sync::Arc;

use wlb_core::{config::Config, router::CommandRouter};

mod fallback;
mod help;
mod start;

pub use fallback::FallbackHandler;
pub use help::HelpHandler;
pub use start::StartHandler;

/// Commands shown by `/help`, in display order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/start", "open the wishlist mini app"),
    ("/help", "show this message"),
];

pub fn command_router(cfg: &Config) -> CommandRouter {
    CommandRouter::builder(Arc::new(FallbackHandler))
        .bot_username(cfg.bot_username.clone())
        .command("/start", Arc::new(StartHandler::new(cfg.webapp_url.clone())))
        .command("/help", Arc::new(HelpHandler))
        .build()
}

#[cfg(test)]
pub(crate) mod test_support {
    use wlb_core::{
        command::parse_command,
        domain::{ChatId, UpdateId, UserId},
        handler::Invocation,
        router::DEFAULT_COMMAND_PREFIX,
        update::{Payload, Sender, Update},
    };

    pub(crate) fn invocation(payload: Payload) -> Invocation {
        let command = match &payload {
            Payload::Text(t) => parse_command(t, DEFAULT_COMMAND_PREFIX, None),
            _ => None,
        };
        let update = Update::new(
            UpdateId(1),
            Some(Sender {
                user_id: UserId(42),
                chat_id: ChatId(42),
                first_name: "Ann".to_string(),
                username: None,
            }),
            payload,
        );
        Invocation { update, command }
    }

    pub(crate) fn text(t: &str) -> Invocation {
        invocation(Payload::Text(t.to_string()))
    }
}
