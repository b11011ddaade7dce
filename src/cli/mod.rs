//! Command-line interface for deckflow
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions and parsing structures (clap)
//! - `run`: Main entry point and command dispatch
//! - `commands`: Command implementations and helpers
//! - `tests`: Test module (cfg(test) only)

pub mod args;
mod commands;
mod run;

#[cfg(test)]
mod tests;

pub use args::{Cli, Commands, PageFile, PageText, RunArgs, parse_page_file, parse_page_text};
pub use run::run;
