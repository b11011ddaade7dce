use std::collections::HashMap;
use std::time::Duration;

use deckflow_utils::error::ConfigError;

use super::{
    Config, ConfigSource, GenerationConfig, LimitsConfig, LoggingConfig, ServiceConfig,
    ServiceProfile, TemplateConfig,
};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding deckflow and the environment or config files
    /// must not influence behaviour.
    ///
    /// # Example
    ///
    /// ```rust
    /// use deckflow_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .base_url("http://localhost:8004/api")
    ///     .request_timeout(Duration::from_secs(120))
    ///     .page_count(6)
    ///     .build()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.service_base_url(), "http://localhost:8004/api");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration of deckflow.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    profile: Option<ServiceProfile>,
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_retries: Option<u32>,
    support_document_max_bytes: Option<u64>,
    page_material_max_bytes: Option<u64>,
    page_count: Option<u32>,
    design_principles: Option<String>,
    template: Option<TemplateConfig>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    /// Create a new `ConfigBuilder` with no values set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn profile(mut self, profile: ServiceProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Absolute base URL of the generation service, e.g. `http://host:8004/api`.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request timeout. Whole seconds are kept.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Retry budget for idempotent reads (0..=5).
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn support_document_max_bytes(mut self, bytes: u64) -> Self {
        self.support_document_max_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn page_material_max_bytes(mut self, bytes: u64) -> Self {
        self.page_material_max_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn page_count(mut self, pages: u32) -> Self {
        self.page_count = Some(pages);
        self
    }

    #[must_use]
    pub fn design_principles(mut self, principles: impl Into<String>) -> Self {
        self.design_principles = Some(principles.into());
        self
    }

    #[must_use]
    pub fn template(mut self, template: TemplateConfig) -> Self {
        self.template = Some(template);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a value is out of range.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut mark = |key: &str, set: bool| {
            let source = if set {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Default
            };
            source_attribution.insert(key.to_string(), source);
        };

        mark("service_profile", self.profile.is_some());
        mark("service_base_url", self.base_url.is_some());
        mark("request_timeout_secs", self.request_timeout.is_some());
        mark("connect_timeout_secs", self.connect_timeout.is_some());
        mark("max_retries", self.max_retries.is_some());
        mark(
            "support_document_max_bytes",
            self.support_document_max_bytes.is_some(),
        );
        mark("page_material_max_bytes", self.page_material_max_bytes.is_some());
        mark("verbose", self.verbose.is_some());
        if self.page_count.is_some() {
            mark("page_count", true);
        }
        if self.design_principles.is_some() {
            mark("design_principles", true);
        }
        if self.template.is_some() {
            mark("template", true);
        }

        let config = Config {
            service: ServiceConfig {
                profile: self.profile,
                base_url: self.base_url,
                request_timeout_secs: self.request_timeout.map(|d| d.as_secs()),
                connect_timeout_secs: self.connect_timeout.map(|d| d.as_secs()),
                max_retries: self.max_retries,
                ..ServiceConfig::default()
            },
            limits: LimitsConfig {
                support_document_max_bytes: self.support_document_max_bytes,
                page_material_max_bytes: self.page_material_max_bytes,
                text_preview_chars: None,
            },
            generation: GenerationConfig {
                page_count: self.page_count,
                design_principles: self.design_principles,
                template: self.template,
            },
            logging: LoggingConfig {
                verbose: self.verbose,
            },
            source_attribution,
        };

        config.validate()?;
        Ok(config)
    }
}
