//! Configuration for deckflow: model, discovery, builder and validation.

mod config;

pub use config::*;
pub use deckflow_utils::error::ConfigError;
