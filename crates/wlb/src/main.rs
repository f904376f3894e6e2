use std::sync::Arc;

use wlb_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), wlb_core::Error> {
    wlb_core::logging::init("wlb")?;

    let cfg = Arc::new(Config::load().map_err(|e| {
        tracing::error!("invalid configuration: {e}");
        e
    })?);

    wlb_telegram::router::run(cfg)
        .await
        .map_err(|e| wlb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
