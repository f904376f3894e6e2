//! Command router: maps a command token to its registered handler.

use std::{collections::HashMap, sync::Arc};

use crate::{
    command::{parse_command, Command},
    handler::Handler,
    update::Update,
};

pub const DEFAULT_COMMAND_PREFIX: char = '/';

/// Result of routing one update.
#[derive(Clone)]
pub enum Route {
    Command {
        command: Command,
        handler: Arc<dyn Handler>,
    },
    /// Plain text, unknown command or non-text payload.
    Fallback {
        command: Option<Command>,
        handler: Arc<dyn Handler>,
    },
}

impl Route {
    pub fn handler(&self) -> &Arc<dyn Handler> {
        match self {
            Route::Command { handler, .. } | Route::Fallback { handler, .. } => handler,
        }
    }

    pub fn command(&self) -> Option<&Command> {
        match self {
            Route::Command { command, .. } => Some(command),
            Route::Fallback { command, .. } => command.as_ref(),
        }
    }

    pub fn into_parts(self) -> (Arc<dyn Handler>, Option<Command>) {
        match self {
            Route::Command { command, handler } => (handler, Some(command)),
            Route::Fallback { command, handler } => (handler, command),
        }
    }

    /// Label for logs: the command token, or `fallback`.
    pub fn label(&self) -> &str {
        match self {
            Route::Command { command, .. } => &command.token,
            Route::Fallback { .. } => "fallback",
        }
    }
}

/// Static registration table, built once at startup.
pub struct CommandRouter {
    prefix: char,
    bot_username: Option<String>,
    handlers: HashMap<String, Arc<dyn Handler>>,
    fallback: Arc<dyn Handler>,
}

pub struct CommandRouterBuilder {
    prefix: char,
    bot_username: Option<String>,
    handlers: HashMap<String, Arc<dyn Handler>>,
    fallback: Arc<dyn Handler>,
}

impl CommandRouterBuilder {
    pub fn prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username.filter(|u| !u.trim().is_empty());
        self
    }

    /// Register `token` (prefix included, e.g. `/start`). A later registration
    /// of the same token replaces the earlier one.
    pub fn command(mut self, token: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.handlers.insert(token.into(), handler);
        self
    }

    pub fn build(self) -> CommandRouter {
        CommandRouter {
            prefix: self.prefix,
            bot_username: self.bot_username,
            handlers: self.handlers,
            fallback: self.fallback,
        }
    }
}

impl CommandRouter {
    pub fn builder(fallback: Arc<dyn Handler>) -> CommandRouterBuilder {
        CommandRouterBuilder {
            prefix: DEFAULT_COMMAND_PREFIX,
            bot_username: None,
            handlers: HashMap::new(),
            fallback,
        }
    }

    pub fn route(&self, update: &Update) -> Route {
        let command = update
            .text()
            .and_then(|text| parse_command(text, self.prefix, self.bot_username.as_deref()));

        match command {
            Some(command) => match self.handlers.get(&command.token) {
                Some(handler) => Route::Command {
                    handler: handler.clone(),
                    command,
                },
                None => Route::Fallback {
                    command: Some(command),
                    handler: self.fallback.clone(),
                },
            },
            None => Route::Fallback {
                command: None,
                handler: self.fallback.clone(),
            },
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, UpdateId, UserId},
        handler::{handler_fn, Invocation},
        reply::Reply,
        update::{Payload, Sender},
    };

    fn named(name: &'static str) -> Arc<dyn Handler> {
        handler_fn(move |_call: Invocation| async move { Ok(Reply::text(name)) })
    }

    fn text_update(text: &str) -> Update {
        Update::new(
            UpdateId(1),
            Some(Sender {
                user_id: UserId(1),
                chat_id: ChatId(1),
                first_name: "Ann".to_string(),
                username: None,
            }),
            Payload::Text(text.to_string()),
        )
    }

    fn router() -> CommandRouter {
        CommandRouter::builder(named("HE"))
            .command("/start", named("H1"))
            .command("/help", named("H2"))
            .bot_username(Some("WishBot".to_string()))
            .build()
    }

    async fn routed_to(router: &CommandRouter, update: &Update) -> String {
        let route = router.route(update);
        let (handler, command) = route.into_parts();
        let call = Invocation {
            update: update.clone(),
            command,
        };
        handler.handle(&call).await.unwrap().text
    }

    #[tokio::test]
    async fn routes_registered_commands_and_falls_back() {
        let r = router();
        assert_eq!(routed_to(&r, &text_update("/start")).await, "H1");
        assert_eq!(routed_to(&r, &text_update("/help me")).await, "H2");
        assert_eq!(routed_to(&r, &text_update("/unknown arg")).await, "HE");
        assert_eq!(routed_to(&r, &text_update("hello")).await, "HE");
        assert_eq!(routed_to(&r, &text_update("/START")).await, "HE");
        assert_eq!(routed_to(&r, &text_update("/start@wishbot")).await, "H1");
    }

    #[test]
    fn unknown_command_keeps_its_parse_for_the_fallback() {
        let route = router().route(&text_update("/unknown arg"));
        assert!(matches!(route, Route::Fallback { .. }));
        let cmd = route.command().unwrap();
        assert_eq!(cmd.token, "/unknown");
        assert_eq!(cmd.args, "arg");

        let plain = router().route(&text_update("hello"));
        assert!(plain.command().is_none());
        assert_eq!(plain.label(), "fallback");
    }

    #[test]
    fn routing_is_deterministic() {
        let r = router();
        let u = text_update("/start now");
        for _ in 0..10 {
            let route = r.route(&u);
            assert_eq!(route.label(), "/start");
            assert_eq!(route.command().unwrap().args, "now");
        }
    }

    #[test]
    fn callback_data_and_unsupported_payloads() {
        let r = router();
        let mut u = text_update("");
        u.payload = Payload::Callback {
            id: "cb1".to_string(),
            data: "/help".to_string(),
        };
        assert_eq!(r.route(&u).label(), "/help");

        u.payload = Payload::Unsupported("poll".to_string());
        assert_eq!(r.route(&u).label(), "fallback");
    }
}
