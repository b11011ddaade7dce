//! Generation service boundary for deckflow
//!
//! The orchestrator only ever sees the [`GenerationService`] trait.
//! [`HttpGenerationService`] implements it against the remote HTTP API:
//! JSON in/out for workflow calls, multipart for uploads, all addressed
//! relative to one base URL.
//!
//! # Example
//!
//! ```rust,no_run
//! use deckflow_client::{GenerationService, HttpGenerationService};
//! use deckflow_config::Config;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder().base_url("http://localhost:8004/api").build()?;
//! let service = HttpGenerationService::new_from_config(&config)?;
//! let defaults = service.defaults().await?;
//! println!("{}", defaults.design_principles);
//! # Ok(())
//! # }
//! ```

mod http_client;
mod http_service;
mod types;
mod wire;

pub use deckflow_utils::error::ServiceError;
pub use http_client::redact_error_message_for_testing;
pub use http_service::HttpGenerationService;
pub use types::{
    FileUpload, GenerationService, OutlinePage, OutlineRequest, PageMaterialListing,
    ReferenceUpload, RemoteMaterial, ServiceDefaults, SessionSnapshot, StylePage,
    SupportDocument, SupportDocumentEntry, SupportDocumentListing,
};
