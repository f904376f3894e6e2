use std::{future::Future, sync::Arc};

use async_trait::async_trait;

use crate::{command::Command, reply::Reply, update::{Sender, Update}, Result};

/// Everything a handler gets to see: the update and, if it was a command, its parse.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub update: Update,
    pub command: Option<Command>,
}

impl Invocation {
    pub fn sender(&self) -> Option<&Sender> {
        self.update.sender.as_ref()
    }

    /// First name of the sender, or an empty string.
    pub fn first_name(&self) -> &str {
        self.sender().map(|s| s.first_name.as_str()).unwrap_or("")
    }

    pub fn args(&self) -> &str {
        self.command.as_ref().map(|c| c.args.as_str()).unwrap_or("")
    }

    pub fn text(&self) -> Option<&str> {
        self.update.text()
    }
}

/// A command handler.
///
/// Handlers only compute a [`Reply`]; sending it is the engine's job.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, call: &Invocation) -> Result<Reply>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Reply>> + Send,
{
    async fn handle(&self, call: &Invocation) -> Result<Reply> {
        (self.0)(call.clone()).await
    }
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
