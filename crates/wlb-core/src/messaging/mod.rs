//! Outbound messaging abstractions (Telegram today, others behind the same port).

pub mod port;
pub mod types;
