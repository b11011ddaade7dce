use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::Stage;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `DeckflowError` is the primary error type returned by deckflow operations.
/// It provides:
/// - Detailed error information for programmatic handling
/// - User-friendly messages with context and suggestions
/// - Mapping to CLI exit codes for consistent error reporting
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Configuration file or CLI argument errors |
/// | `Service` | Remote generation service failures |
/// | `Workflow` | Validation and stage-contract violations |
/// | `Io` | Local file access (reading uploads, config) |
///
/// # Example
///
/// ```rust
/// use deckflow_utils::error::{DeckflowError, WorkflowError};
/// use deckflow_utils::exit_codes::ExitCode;
///
/// let err = DeckflowError::from(WorkflowError::EmptyFeedback);
/// assert_eq!(err.to_exit_code(), ExitCode::VALIDATION);
/// assert!(err.display_for_user().starts_with("Error: "));
/// ```
///
/// Library code returns `DeckflowError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum DeckflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    ServiceRejected,
    Transport,
    Workflow,
    FileSystem,
    Concurrency,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Validation => write!(f, "Validation"),
            Self::ServiceRejected => write!(f, "Service Rejected"),
            Self::Transport => write!(f, "Transport"),
            Self::Workflow => write!(f, "Workflow"),
            Self::FileSystem => write!(f, "File System"),
            Self::Concurrency => write!(f, "Concurrency"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with optional [service], [limits], [generation] and [logging] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } => {
                Some("An explicit --config path must point at an existing file.".to_string())
            }
            Self::DiscoveryFailed { .. } => Some(
                "deckflow searches DECKFLOW_HOME, then .deckflow/config.toml upward from the current directory."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .deckflow/config.toml".to_string(),
                "Run 'deckflow config' to see the effective configuration".to_string(),
            ],
            Self::InvalidValue { key, .. } => vec![
                format!("Fix or remove '{key}' in the configuration file or CLI flags"),
                "Run 'deckflow config' to see where each value comes from".to_string(),
            ],
            Self::NotFound { path } => vec![format!("Create {path} or drop the --config flag")],
            Self::DiscoveryFailed { .. } => vec![
                "Pass --config explicitly".to_string(),
                "Check that the current directory is readable".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Failures talking to the remote generation service.
///
/// `Rejected` is a well-formed answer with `success: false`; its message is
/// shown verbatim. Everything else means the request did not complete.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Service answered with `success: false` (or an HTTP error carrying a detail).
    #[error("{operation} rejected: {message}")]
    Rejected { operation: String, message: String },

    /// Connection, DNS or body-read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request did not finish in time
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Non-success HTTP status without a usable body
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Response body was not the expected JSON
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Client could not be constructed or the base URL is unusable
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl ServiceError {
    /// True when the service itself reported the failure.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl UserFriendlyError for ServiceError {
    fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Transport(msg) => format!("Request failed: {msg}"),
            Self::Timeout { duration } => {
                format!("Request timed out after {}s", duration.as_secs())
            }
            Self::Status { status, detail } => {
                format!("Request failed with HTTP {status}: {detail}")
            }
            Self::Decode(msg) => format!("Could not understand the service response: {msg}"),
            Self::Misconfiguration(msg) => format!("Service client configuration error: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Rejected { operation, .. } => {
                Some(format!("The generation service declined '{operation}'."))
            }
            Self::Transport(_) | Self::Status { .. } => Some(
                "The request could not complete; session state was left untouched.".to_string(),
            ),
            Self::Timeout { .. } => Some(
                "Image and outline generation can take minutes per request.".to_string(),
            ),
            Self::Decode(_) => None,
            Self::Misconfiguration(_) => {
                Some("The service base URL comes from [service] in config.toml.".to_string())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Rejected { .. } => vec!["Adjust the input or feedback and retry".to_string()],
            Self::Transport(_) | Self::Status { .. } => vec![
                "Check that the generation service is running".to_string(),
                "Verify the service URL with 'deckflow config'".to_string(),
                "Retry the same operation".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase [service] request_timeout_secs".to_string(),
                "Retry the same operation".to_string(),
            ],
            Self::Decode(_) => vec!["Check that the service version matches this client".to_string()],
            Self::Misconfiguration(_) => vec![
                "Set --service-url or [service] base_url to an absolute http(s) URL".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Rejected { .. } => ErrorCategory::ServiceRejected,
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Transport,
        }
    }
}

/// Validation and state-contract errors raised by the orchestrator before or
/// after a remote call. None of these mutate session state.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("input is empty")]
    EmptyInput,

    #[error("feedback is empty")]
    EmptyFeedback,

    #[error("table text is empty")]
    EmptyTableText,

    #[error("outline has no pages")]
    EmptyOutline,

    #[error("{operation} is not allowed in stage {stage}")]
    InvalidStage { operation: &'static str, stage: Stage },

    #[error("page {index} is out of range (page count {page_count})")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("material {material_index} does not exist on page {page_index}")]
    MaterialOutOfRange {
        page_index: usize,
        material_index: usize,
    },

    #[error("file is {actual} bytes, limit is {limit}")]
    FileTooLarge { limit: u64, actual: u64 },

    #[error("unsupported file type: {extension}")]
    UnsupportedFileType { extension: String },

    #[error("{operation} refused: another request is in flight")]
    Busy { operation: &'static str },

    #[error("{operation} requires explicit confirmation")]
    ConfirmationRequired { operation: &'static str },

    #[error("response for {operation} arrived after the session moved on")]
    StaleResponse { operation: &'static str },

    #[error("style plan has {style} pages but the outline has {outline}")]
    StyleLengthMismatch { outline: usize, style: usize },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl UserFriendlyError for WorkflowError {
    fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => "Provide some text or an audio transcript first".to_string(),
            Self::EmptyFeedback => "Feedback cannot be empty".to_string(),
            Self::EmptyTableText => "Table content cannot be empty".to_string(),
            Self::EmptyOutline => "The service returned an outline without any pages".to_string(),
            Self::InvalidStage { operation, stage } => {
                format!("Cannot {operation} while the session is in the {stage} stage")
            }
            Self::PageOutOfRange { index, page_count } => format!(
                "Page {} does not exist; the deck has {page_count} pages",
                index + 1
            ),
            Self::MaterialOutOfRange {
                page_index,
                material_index,
            } => format!(
                "Material #{} does not exist on page {}",
                material_index + 1,
                page_index + 1
            ),
            Self::FileTooLarge { limit, actual } => format!(
                "File is too large ({} KB); the limit is {} MB",
                actual / 1024,
                limit / (1024 * 1024)
            ),
            Self::UnsupportedFileType { extension } => {
                format!("Files of type '{extension}' are not accepted here")
            }
            Self::Busy { operation } => {
                format!("Cannot {operation} while another request is still running")
            }
            Self::ConfirmationRequired { operation } => {
                format!("{operation} removes data permanently and must be confirmed")
            }
            Self::StaleResponse { operation } => {
                format!("The result of {operation} was discarded because the session moved on")
            }
            Self::StyleLengthMismatch { outline, style } => format!(
                "The style plan covers {style} pages but the outline has {outline}"
            ),
            Self::Service(err) => err.user_message(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidStage { .. } => Some(
                "The workflow moves Input → OutlineRefine → StyleRefine → Generate → Complete."
                    .to_string(),
            ),
            Self::Busy { .. } => Some(
                "Only one outline, style, generation or regeneration request runs at a time."
                    .to_string(),
            ),
            Self::Service(err) => err.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::EmptyInput => vec![
                "Pass --input FILE, pipe text on stdin, or add --audio".to_string(),
            ],
            Self::FileTooLarge { .. } => vec!["Compress or split the file".to_string()],
            Self::EmptyOutline => vec!["Add more material or request a page count".to_string()],
            Self::Busy { .. } => vec!["Wait for the running request to finish".to_string()],
            Self::ConfirmationRequired { .. } => vec!["Re-run with confirmation".to_string()],
            Self::StyleLengthMismatch { .. } => {
                vec!["Refine the style plan so it covers every page".to_string()]
            }
            Self::Service(err) => err.suggestions(),
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyInput
            | Self::EmptyFeedback
            | Self::EmptyTableText
            | Self::PageOutOfRange { .. }
            | Self::MaterialOutOfRange { .. }
            | Self::FileTooLarge { .. }
            | Self::UnsupportedFileType { .. }
            | Self::ConfirmationRequired { .. } => ErrorCategory::Validation,
            Self::Busy { .. } | Self::StaleResponse { .. } => ErrorCategory::Concurrency,
            Self::InvalidStage { .. }
            | Self::EmptyOutline
            | Self::StyleLengthMismatch { .. } => ErrorCategory::Workflow,
            Self::Service(err) => err.category(),
        }
    }
}

impl UserFriendlyError for DeckflowError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Service(err) => err.user_message(),
            Self::Workflow(err) => err.user_message(),
            Self::Io(err) => format!("File system operation failed: {err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Service(err) => err.context(),
            Self::Workflow(err) => err.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Service(err) => err.suggestions(),
            Self::Workflow(err) => err.suggestions(),
            Self::Io(_) => vec!["Check that the file exists and is readable".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Service(err) => err.category(),
            Self::Workflow(err) => err.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl DeckflowError {
    /// Get a user-friendly error message with context and actionable suggestions.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error: {}\n", self.user_message()));

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {}\n", ctx));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {}\n", suggestion));
            }
        }

        output
    }

    /// Map this error to the appropriate CLI exit code.
    ///
    /// | Exit Code | Name | Description |
    /// |-----------|------|-------------|
    /// | 1 | INTERNAL | I/O and other failures |
    /// | 2 | CLI_ARGS | Configuration errors |
    /// | 3 | VALIDATION | Input rejected before any request |
    /// | 4 | SERVICE_REJECTED | Service answered `success: false` |
    /// | 5 | TRANSPORT | Request could not complete |
    /// | 10 | TIMEOUT | Request timed out |
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        fn service_code(err: &ServiceError) -> ExitCode {
            match err {
                ServiceError::Rejected { .. } => ExitCode::SERVICE_REJECTED,
                ServiceError::Timeout { .. } => ExitCode::TIMEOUT,
                ServiceError::Misconfiguration(_) => ExitCode::CLI_ARGS,
                _ => ExitCode::TRANSPORT,
            }
        }

        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Service(err) => service_code(err),
            Self::Workflow(WorkflowError::Service(err)) => service_code(err),
            Self::Workflow(err) => match err.category() {
                ErrorCategory::Validation => ExitCode::VALIDATION,
                _ => ExitCode::INTERNAL,
            },
            Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}
