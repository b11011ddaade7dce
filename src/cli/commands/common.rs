//! Shared helpers for command implementations

use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::Path;
use tokio::io::AsyncReadExt;

use deckflow_client::FileUpload;
use deckflow_orchestrator::RawInput;

use crate::cli::args::RunArgs;

/// Read a file to upload, keeping its file name.
pub(crate) async fn load_upload(path: &Path) -> Result<FileUpload> {
    FileUpload::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Read a UTF-8 text file named on the command line.
pub(crate) async fn read_text_file(path: &Path, what: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {what} {}", path.display()))
}

/// Assemble the raw input from `--input` (or piped stdin) and `--transcript-file`.
///
/// Blank input is returned as-is; the orchestrator decides whether it is
/// acceptable.
pub(crate) async fn read_raw_input(args: &RunArgs) -> Result<RawInput> {
    let text = match &args.input {
        Some(path) => read_text_file(path, "input file").await?,
        None if !std::io::stdin().is_terminal() => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read input from stdin")?;
            buffer
        }
        None => String::new(),
    };

    let transcript = match &args.transcript_file {
        Some(path) => Some(read_text_file(path, "transcript file").await?),
        None => None,
    };

    Ok(RawInput { text, transcript })
}
