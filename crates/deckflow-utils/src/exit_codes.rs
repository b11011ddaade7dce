//! Exit code constants for the deckflow CLI.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `VALIDATION` | Input rejected before any request was sent |
//! | 4 | `SERVICE_REJECTED` | Service answered `success: false` |
//! | 5 | `TRANSPORT` | Request could not complete |
//! | 6 | `PARTIAL_GENERATION` | Pipeline finished but some pages failed |
//! | 10 | `TIMEOUT` | Request timed out |

/// Exit codes matching the documented exit code table.
///
/// The numeric values are part of the public API.
///
/// # Example
///
/// ```rust
/// use deckflow_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::PARTIAL_GENERATION, ExitCode::from_i32(6));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid flags or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Validation - blank input, blank feedback, oversize file, bad index
    pub const VALIDATION: ExitCode = ExitCode(3);

    /// Service rejected the request with a message
    pub const SERVICE_REJECTED: ExitCode = ExitCode(4);

    /// Transport failure talking to the service
    pub const TRANSPORT: ExitCode = ExitCode(5);

    /// Generation completed but at least one page failed
    pub const PARTIAL_GENERATION: ExitCode = ExitCode(6);

    /// Request timed out
    pub const TIMEOUT: ExitCode = ExitCode(10);

    /// Get the numeric exit code value.
    ///
    /// Use this with `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}
