use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use deckflow_utils::types::{ConfigSource, PageNumberPosition, TemplateSettings};

/// Default development endpoint of the generation service.
pub const DEFAULT_DEVELOPMENT_URL: &str = "http://localhost:8004/api";

/// Default production path, resolved against `public_origin`.
pub const DEFAULT_PRODUCTION_URL: &str = "/api";

/// Default origin used when the production URL is a bare path.
pub const DEFAULT_PUBLIC_ORIGIN: &str = "http://localhost:8004";

/// Default per-request timeout. Image generation regularly takes minutes.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Retries apply to idempotent reads only.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Support documents above this size are refused before upload (10 MiB).
pub const DEFAULT_SUPPORT_DOCUMENT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Page materials above this size are refused before upload (5 MiB).
pub const DEFAULT_PAGE_MATERIAL_MAX_BYTES: u64 = 5 * 1024 * 1024;

pub const DEFAULT_TEXT_PREVIEW_CHARS: usize = 500;

/// Which deployment of the generation service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceProfile {
    Development,
    #[default]
    Production,
}

impl ServiceProfile {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for ServiceProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!(
                "unknown profile '{other}' (expected development or production)"
            )),
        }
    }
}

/// Configuration for deckflow operations.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > environment > config file > built-in defaults.
///
/// # Discovery
///
/// Use [`Config::discover()`] for CLI-like behavior that:
/// - Honours an explicit `--config` path
/// - Respects the `DECKFLOW_HOME` environment variable
/// - Searches for `.deckflow/config.toml` upward from the current directory
/// - Falls back to the user config directory (`<config_dir>/deckflow/config.toml`)
///
/// # Programmatic Configuration
///
/// For embedding, use [`Config::builder()`], which ignores the environment.
///
/// # Example
///
/// ```toml
/// [service]
/// profile = "development"
/// request_timeout_secs = 600
///
/// [limits]
/// page_material_max_bytes = 4194304
///
/// [generation]
/// page_count = 8
///
/// [generation.template]
/// page_number_position = "bottom-right"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub limits: LimitsConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
    /// Where each effective value came from
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[service]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub profile: Option<ServiceProfile>,
    /// Absolute base URL; overrides the profile when set
    pub base_url: Option<String>,
    pub development_url: Option<String>,
    pub production_url: Option<String>,
    pub public_origin: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// `[limits]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LimitsConfig {
    pub support_document_max_bytes: Option<u64>,
    pub page_material_max_bytes: Option<u64>,
    pub text_preview_chars: Option<usize>,
}

/// `[generation]` section: defaults for outline generation requests
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationConfig {
    pub page_count: Option<u32>,
    pub design_principles: Option<String>,
    pub template: Option<TemplateConfig>,
}

/// `[generation.template]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TemplateConfig {
    pub color_scheme: Option<serde_json::Value>,
    pub font_scheme: Option<serde_json::Value>,
    pub logo_position: Option<String>,
    pub page_number_position: Option<String>,
    pub quality: Option<String>,
    pub content_richness: Option<String>,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
}

impl Config {
    /// Active service profile (production unless configured otherwise).
    #[must_use]
    pub fn profile(&self) -> ServiceProfile {
        self.service.profile.unwrap_or_default()
    }

    /// Resolve the absolute base URL every endpoint is addressed relative to.
    ///
    /// An explicit `base_url` wins. Otherwise the profile picks the
    /// development or production URL; a production URL that is a bare path
    /// (`/api`) is joined onto `public_origin`.
    #[must_use]
    pub fn service_base_url(&self) -> String {
        if let Some(url) = &self.service.base_url {
            return url.trim_end_matches('/').to_string();
        }

        let raw = match self.profile() {
            ServiceProfile::Development => self
                .service
                .development_url
                .as_deref()
                .unwrap_or(DEFAULT_DEVELOPMENT_URL),
            ServiceProfile::Production => self
                .service
                .production_url
                .as_deref()
                .unwrap_or(DEFAULT_PRODUCTION_URL),
        };

        if raw.starts_with('/') {
            let origin = self
                .service
                .public_origin
                .as_deref()
                .unwrap_or(DEFAULT_PUBLIC_ORIGIN)
                .trim_end_matches('/');
            format!("{origin}{}", raw.trim_end_matches('/'))
        } else {
            raw.trim_end_matches('/').to_string()
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.service
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.service
                .connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.service.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    #[must_use]
    pub fn support_document_max_bytes(&self) -> u64 {
        self.limits
            .support_document_max_bytes
            .unwrap_or(DEFAULT_SUPPORT_DOCUMENT_MAX_BYTES)
    }

    #[must_use]
    pub fn page_material_max_bytes(&self) -> u64 {
        self.limits
            .page_material_max_bytes
            .unwrap_or(DEFAULT_PAGE_MATERIAL_MAX_BYTES)
    }

    #[must_use]
    pub fn text_preview_chars(&self) -> usize {
        self.limits
            .text_preview_chars
            .unwrap_or(DEFAULT_TEXT_PREVIEW_CHARS)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }

    /// Template settings seeded from `[generation.template]`.
    ///
    /// Unknown page-number positions were rejected by validation, so a parse
    /// failure here falls back to the default position.
    #[must_use]
    pub fn template_settings(&self) -> TemplateSettings {
        let mut settings = TemplateSettings::default();
        let Some(template) = &self.generation.template else {
            return settings;
        };

        settings.color_scheme = template.color_scheme.clone();
        settings.font_scheme = template.font_scheme.clone();
        if let Some(position) = &template.logo_position {
            settings.logo_position = position.clone();
        }
        if let Some(position) = &template.page_number_position {
            settings.page_number_position =
                PageNumberPosition::from_str(position).unwrap_or_default();
        }
        settings.quality = template.quality.clone();
        settings.content_richness = template.content_richness.clone();
        settings
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Create a minimal Config for testing purposes
    ///
    /// Points at a development URL and uses built-in defaults everywhere else.
    pub fn minimal_for_testing() -> Self {
        Config {
            service: ServiceConfig {
                profile: Some(ServiceProfile::Development),
                ..ServiceConfig::default()
            },
            limits: LimitsConfig::default(),
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
            source_attribution: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_path_joined_to_origin() {
        let config = Config {
            service: ServiceConfig::default(),
            ..Config::minimal_for_testing()
        };
        assert_eq!(config.service_base_url(), "http://localhost:8004/api");

        let config = Config {
            service: ServiceConfig {
                public_origin: Some("https://slides.example.com/".to_string()),
                ..ServiceConfig::default()
            },
            ..Config::minimal_for_testing()
        };
        assert_eq!(config.service_base_url(), "https://slides.example.com/api");
    }

    #[test]
    fn test_explicit_base_url_wins_over_profile() {
        let config = Config {
            service: ServiceConfig {
                profile: Some(ServiceProfile::Development),
                base_url: Some("http://10.0.0.5:9000/api/".to_string()),
                ..ServiceConfig::default()
            },
            ..Config::minimal_for_testing()
        };
        assert_eq!(config.service_base_url(), "http://10.0.0.5:9000/api");
    }

    #[test]
    fn test_development_profile_default_url() {
        let config = Config::minimal_for_testing();
        assert_eq!(config.service_base_url(), DEFAULT_DEVELOPMENT_URL);
    }

    #[test]
    fn test_limit_defaults() {
        let config = Config::minimal_for_testing();
        assert_eq!(config.support_document_max_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.page_material_max_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.text_preview_chars(), 500);
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert_eq!(config.max_retries(), 2);
    }

    #[test]
    fn test_template_settings_from_config() {
        let mut config = Config::minimal_for_testing();
        config.generation.template = Some(TemplateConfig {
            page_number_position: Some("none".to_string()),
            logo_position: Some("top-left".to_string()),
            quality: Some("high".to_string()),
            ..TemplateConfig::default()
        });

        let settings = config.template_settings();
        assert_eq!(settings.page_number_position, PageNumberPosition::None);
        assert_eq!(settings.logo_position, "top-left");
        assert_eq!(settings.quality.as_deref(), Some("high"));
        assert!(!settings.has_logo, "logo flag is set by uploads, not config");
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!(
            "dev".parse::<ServiceProfile>().unwrap(),
            ServiceProfile::Development
        );
        assert_eq!(
            "Production".parse::<ServiceProfile>().unwrap(),
            ServiceProfile::Production
        );
        assert!("staging".parse::<ServiceProfile>().is_err());
    }
}
