//! Config command implementation
//!
//! Handles `deckflow config` and `deckflow config --json`.

use anyhow::Result;
use serde_json::json;

use deckflow_config::Config;
use deckflow_utils::exit_codes::ExitCode;

/// Print the effective configuration with source attribution.
pub fn execute_config_command(json: bool, config: &Config) -> Result<ExitCode> {
    let effective = config.effective_config();

    if json {
        let map: serde_json::Map<String, serde_json::Value> = effective
            .into_iter()
            .map(|(key, (value, source))| (key, json!({ "value": value, "source": source })))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Effective configuration:");
    let width = effective.keys().map(String::len).max().unwrap_or(0);
    for (key, (value, source)) in &effective {
        println!("  {key:<width$} = {value}  ({source})");
    }
    Ok(ExitCode::SUCCESS)
}
