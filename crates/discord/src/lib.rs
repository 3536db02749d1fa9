//! Discord side of hushwatch: gateway events feed the tracker registry,
//! slash commands drive it, and [`DiscordOutbound`] delivers reminders.

pub mod commands;
pub mod error;
pub mod format;
pub mod handler;
pub mod outbound;
pub mod respond;

pub use {
    error::{Error, Result},
    handler::DiscordHandler,
    outbound::DiscordOutbound,
};
