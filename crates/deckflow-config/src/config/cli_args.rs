use std::path::PathBuf;

/// CLI overrides fed into configuration discovery.
///
/// Every field is optional; `None` leaves the lower-precedence value alone.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub service_url: Option<String>,
    pub profile: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub verbose: Option<bool>,
}
