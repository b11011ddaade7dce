//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct, the subcommand enum and the value
//! parsers for `N:...` page arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// deckflow - staged slide-deck generation against a remote service
#[derive(Parser, Debug)]
#[command(name = "deckflow")]
#[command(about = "Drive an outline → style → image generation session from the command line")]
#[command(long_about = r#"
deckflow runs one generation session end to end: it sends your material to the
generation service, lets you refine the outline and the style plan, renders
every page in order and regenerates individual pages on request.

EXAMPLES:
  # Five-page deck from a text file
  deckflow run --input notes.md --pages 5

  # Pipe the brief, adjust the outline, then fix page 2 after rendering
  cat brief.txt | deckflow run --outline-feedback "add a risks page" \
      --edit-title 3:"Regional growth" --regenerate 2:"use a bar chart"

  # Include a recorded meeting and a spreadsheet for page 4
  deckflow run --input notes.md --audio standup.m4a --speakers 3 \
      --page-material 4:sales.xlsx:"Q4 by region"

  # Show where every configuration value comes from
  deckflow config

CONFIGURATION:
  Precedence: CLI flags > environment > config file > defaults
  The config file is --config, $DECKFLOW_HOME/config.toml, the nearest
  .deckflow/config.toml above the working directory, or the user config dir.

STAGES:
  Input → OutlineRefine → StyleRefine → Generate → Complete
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Generation service base URL (overrides profile)
    #[arg(long, global = true)]
    pub service_url: Option<String>,

    /// Service profile: development or production
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub request_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full generation session non-interactively
    Run(RunArgs),

    /// Show the effective configuration and where each value came from
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the service's default design principles
    Defaults,

    /// Inspect a session stored by the service
    Session {
        /// Session identifier (session_<millis>_<suffix>)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// A 1-based page argument paired with text, e.g. `3:Regional growth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Zero-based page index
    pub index: usize,
    pub text: String,
}

/// A 1-based page argument paired with a file and optional description,
/// e.g. `4:sales.xlsx:Q4 by region`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFile {
    /// Zero-based page index
    pub index: usize,
    pub path: PathBuf,
    pub description: String,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Read the raw material from this file (default: stdin when piped)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Transcript text appended to the input
    #[arg(long)]
    pub transcript_file: Option<PathBuf>,

    /// Audio recording to transcribe and append to the input
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Number of speakers in the recording
    #[arg(long, requires = "audio")]
    pub speakers: Option<u32>,

    /// Document whose text supports the outline (repeatable)
    #[arg(long = "support-doc")]
    pub support_docs: Vec<PathBuf>,

    /// Image or spreadsheet for a page: N:FILE[:DESCRIPTION] (repeatable)
    #[arg(long = "page-material", value_parser = parse_page_file)]
    pub page_materials: Vec<PageFile>,

    /// Table text for a page read from a file: N:FILE[:DESCRIPTION] (repeatable)
    #[arg(long = "page-table", value_parser = parse_page_file)]
    pub page_tables: Vec<PageFile>,

    /// Requested number of pages
    #[arg(long)]
    pub pages: Option<u32>,

    /// Instruction for one page: N:TEXT (repeatable)
    #[arg(long = "page-instruction", value_parser = parse_page_text)]
    pub page_instructions: Vec<PageText>,

    /// Design principles sent with outline generation
    #[arg(long)]
    pub design_principles: Option<String>,

    /// Outline refinement feedback, applied in order (repeatable)
    #[arg(long = "outline-feedback")]
    pub outline_feedback: Vec<String>,

    /// Replace a page title before confirming: N:TEXT (repeatable)
    #[arg(long = "edit-title", value_parser = parse_page_text)]
    pub edit_titles: Vec<PageText>,

    /// Replace a page's content before confirming: N:TEXT (repeatable)
    #[arg(long = "edit-content", value_parser = parse_page_text)]
    pub edit_contents: Vec<PageText>,

    /// Style refinement feedback, applied in order (repeatable)
    #[arg(long = "style-feedback")]
    pub style_feedback: Vec<String>,

    /// Regenerate a page after generation: N:FEEDBACK (repeatable)
    #[arg(long = "regenerate", value_parser = parse_page_text)]
    pub regenerate: Vec<PageText>,

    /// Logo image placed on every page
    #[arg(long)]
    pub logo: Option<PathBuf>,

    /// Loose visual reference image
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Master template image analysed by the service
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Output the session result as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_page_number(raw: &str) -> Result<usize, String> {
    let page: usize = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a page number"))?;
    if page == 0 {
        return Err("page numbers start at 1".to_string());
    }
    Ok(page - 1)
}

/// Parse `N:TEXT`.
pub fn parse_page_text(raw: &str) -> Result<PageText, String> {
    let (page, text) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected N:TEXT, got '{raw}'"))?;
    Ok(PageText {
        index: parse_page_number(page)?,
        text: text.to_string(),
    })
}

/// Parse `N:FILE[:DESCRIPTION]`.
pub fn parse_page_file(raw: &str) -> Result<PageFile, String> {
    let mut parts = raw.splitn(3, ':');
    let page = parts.next().unwrap_or_default();
    let path = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| format!("expected N:FILE[:DESCRIPTION], got '{raw}'"))?;
    Ok(PageFile {
        index: parse_page_number(page)?,
        path: PathBuf::from(path),
        description: parts.next().unwrap_or_default().to_string(),
    })
}
