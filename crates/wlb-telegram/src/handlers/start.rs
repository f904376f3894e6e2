use async_trait::async_trait;

use wlb_core::{
    handler::{Handler, Invocation},
    messaging::types::Control,
    reply::Reply,
    Result,
};

pub const OPEN_WISHLIST_LABEL: &str = "📋 Open wishlist";

/// Greets the sender and offers the wishlist mini app.
pub struct StartHandler {
    webapp_url: String,
}

impl StartHandler {
    pub fn new(webapp_url: String) -> Self {
        Self { webapp_url }
    }
}

#[async_trait]
impl Handler for StartHandler {
    async fn handle(&self, call: &Invocation) -> Result<Reply> {
        let greeting = format!(
            "Hi, {}! 👋\n\n\
             This is your Wishlist mini app. Tap the button below to open your wishlist.",
            call.first_name()
        );
        Ok(Reply::text(greeting).with_control(Control::web_app(
            OPEN_WISHLIST_LABEL,
            self.webapp_url.clone(),
        )))
    }
}
