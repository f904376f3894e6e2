//! Update ingestion and command dispatch engine for the wishlist bot.
//!
//! This crate is framework-agnostic. The chat platform lives behind ports
//! (traits) implemented in adapter crates.

pub mod command;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod handler;
pub mod logging;
pub mod messaging;
pub mod pipeline;
pub mod ports;
pub mod registration;
pub mod reply;
pub mod retry;
pub mod router;
pub mod sequencer;
pub mod source;
pub mod update;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
