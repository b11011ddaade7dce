//! deckflow - staged slide-deck generation against a remote service
//!
//! A session moves through `Input → OutlineRefine → StyleRefine → Generate →
//! Complete`. The remote service owns the content; this crate owns the stage
//! machine, local edits, materials and the page-by-page generation loop.
//!
//! deckflow can be used in two ways:
//! - **CLI**: `deckflow run --input notes.md --pages 5`
//! - **Library**: drive a [`SessionOrchestrator`] from your own code
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use deckflow::{Config, GenerationOptions, HttpGenerationService, RawInput, SessionOrchestrator};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder().base_url("http://localhost:8004/api").build()?;
//! let service = Arc::new(HttpGenerationService::new_from_config(&config)?);
//! let session = SessionOrchestrator::new(service, &config);
//!
//! session
//!     .generate_outline(&RawInput::text("Q4 sales report"), &GenerationOptions::from_config(&config))
//!     .await?;
//! session.confirm_outline().await?;
//! let summary = session.confirm_style().await?;
//! println!("{}/{} pages", summary.succeeded, summary.total);
//! # Ok(())
//! # }
//! ```
//!
//! # Stable Public API
//!
//! - [`SessionOrchestrator`] and its value types
//! - [`Config`], [`ConfigBuilder`] and [`CliArgs`]
//! - [`DeckflowError`] and [`ExitCode`]
//! - [`GenerationService`] for plugging in another transport

/// Session workflow facade.
pub use deckflow_orchestrator::{
    EditableOutlineEntry, GeneratedPage, GenerationOptions, Material, MaterialStore, PageState,
    PipelineEvent, PipelineSummary, RawInput, SessionOrchestrator, TranscriptEntry, UploadState,
    UploadTarget,
};

/// Service boundary and its HTTP implementation.
pub use deckflow_client::{
    FileUpload, GenerationService, HttpGenerationService, OutlinePage, SessionSnapshot, StylePage,
};

/// Configuration for deckflow operations.
///
/// Use [`Config::discover()`] for CLI-like behavior or [`Config::builder()`]
/// for programmatic configuration.
pub use deckflow_config::{CliArgs, Config, ConfigBuilder};

/// Library-level error type.
///
/// [`DeckflowError::display_for_user`] renders the terminal report and
/// [`DeckflowError::to_exit_code`] picks the process exit code. Library code
/// never calls `std::process::exit()`.
pub use deckflow_utils::error::{
    ConfigError, DeckflowError, ErrorCategory, ServiceError, UserFriendlyError, WorkflowError,
};

/// Exit codes matching the documented exit code table.
pub use deckflow_utils::exit_codes::ExitCode;

pub use deckflow_utils::types::{MaterialKind, ReferenceKind, SessionId, Stage};

// CLI module - exported with #[doc(hidden)] so argument parsing can be
// tested from the outside
#[doc(hidden)]
pub mod cli;
