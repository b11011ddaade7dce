//! CLI command implementations (facade).
//!
//! This module re-exports the command surface used by `run.rs`.
//! Implementations live in `commands/*`.

mod common;
mod config;
mod inspect;
mod workflow;

pub use config::execute_config_command;
pub use inspect::{execute_defaults_command, execute_session_command};
pub use workflow::execute_run_command;
