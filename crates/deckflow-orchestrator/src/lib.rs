//! Session workflow orchestrator for deckflow
//!
//! One [`SessionOrchestrator`] drives one session through
//! `Input → OutlineRefine → StyleRefine → Generate → Complete`, talking to
//! the generation service only through [`deckflow_client::GenerationService`].
//!
//! # Module Organization
//!
//! - `stage.rs`: the pure stage machine owning outline, style plan and page slots
//! - `outline_buffer.rs`: locally editable shadow copy of the outline
//! - `materials.rs`: support documents and per-page materials
//! - `pipeline.rs`: sequential page generation
//! - `regeneration.rs`: single-page regeneration in `Complete`
//! - `uploads.rs`: per-target upload tickets
//! - `transcript.rs`: conversation log
//! - `orchestrator.rs`: the facade tying the above together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use deckflow_client::HttpGenerationService;
//! use deckflow_config::Config;
//! use deckflow_orchestrator::{GenerationOptions, RawInput, SessionOrchestrator};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder().base_url("http://localhost:8004/api").build()?;
//! let service = Arc::new(HttpGenerationService::new_from_config(&config)?);
//! let session = SessionOrchestrator::new(service, &config);
//!
//! session
//!     .generate_outline(&RawInput::text("Q4 sales report"), &GenerationOptions::from_config(&config))
//!     .await?;
//! session.edit_title(2, "Regional growth")?;
//! session.confirm_outline().await?;
//! let summary = session.confirm_style().await?;
//! println!("{}/{} pages", summary.succeeded, summary.total);
//! # Ok(())
//! # }
//! ```

mod input;
mod materials;
mod orchestrator;
mod outline_buffer;
mod pipeline;
mod regeneration;
mod stage;
mod transcript;
mod uploads;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use input::{GenerationOptions, RawInput, TRANSCRIPT_MARKER};
pub use materials::{Material, MaterialStore, SupportDocumentRecord};
pub use orchestrator::SessionOrchestrator;
pub use outline_buffer::{EditableOutlineEntry, OutlineEditBuffer};
pub use pipeline::{GeneratedPage, GenerationPipeline, PageState, PipelineEvent, PipelineSummary};
pub use regeneration::RegenerationController;
pub use stage::{Epoch, StageMachine};
pub use transcript::{Transcript, TranscriptEntry, render_outline, render_style};
pub use uploads::{UploadState, UploadTarget, UploadTicket, UploadTracker};
