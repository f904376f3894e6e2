use async_trait::async_trait;

use wlb_core::{
    handler::{Handler, Invocation},
    reply::Reply,
    Result,
};

use super::COMMANDS;

pub struct HelpHandler;

pub fn help_text() -> String {
    let mut out = String::from("Available commands:");
    for (cmd, what) in COMMANDS {
        out.push_str(&format!("\n{cmd} — {what}"));
    }
    out
}

#[async_trait]
impl Handler for HelpHandler {
    async fn handle(&self, _call: &Invocation) -> Result<Reply> {
        Ok(Reply::text(help_text()))
    }
}
