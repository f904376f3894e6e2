use std::sync::Arc;

use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use wlb_core::{
    config::Config,
    engine::{Adapters, Engine},
};

use crate::{api::TelegramApi, convert::TelegramDecoder, handlers, TelegramMessenger};

/// Run the bot until Ctrl-C or a fatal source error.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = crate::api::bot(&cfg.telegram_bot_token, cfg.poll_timeout)?;

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), mode = %cfg.delivery_mode, "bot started"),
        Err(e) => warn!("get_me failed: {e}"),
    }

    let api = Arc::new(TelegramApi::new(bot.clone()));
    let adapters = Adapters {
        messenger: Arc::new(TelegramMessenger::new(bot, cfg.telegram_message_limit)),
        fetcher: api.clone(),
        registrar: api,
        decoder: Arc::new(TelegramDecoder),
    };
    let engine = Engine::new(&cfg, handlers::command_router(&cfg), adapters)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl-C: {e}");
                return;
            }
            info!("Ctrl-C received, shutting down");
            cancel.cancel();
        });
    }

    engine.run(cancel).await.map_err(|e| {
        error!("bot stopped: {e}");
        e.into()
    })
}
