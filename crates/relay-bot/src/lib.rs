//! Bot orchestration: guards, the throttled responder, the per-message
//! conversation handler, admin commands, and the update loop.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod guards;
pub mod handler;
pub mod locks;
pub mod notices;
pub mod responder;

#[cfg(test)]
mod testing;

pub use handler::{InboundText, Relay, RelayError};
