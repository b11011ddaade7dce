//! Configuration management for deckflow
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. TOML files carry `[service]`,
//! `[limits]`, `[generation]` and `[logging]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
pub use deckflow_utils::types::ConfigSource;
