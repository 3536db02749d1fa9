//! Chat-platform contract consumed by the tracker engine.
//!
//! A platform adapter (Discord today) implements [`ChannelOutbound`] so the
//! engine can resolve persisted channel ids back into live channels and post
//! reminder messages into them without knowing anything about the SDK.

pub mod error;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::{ChannelHandle, ChannelId, ChannelKind, ChannelOutbound},
};
