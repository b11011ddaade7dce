use std::str::FromStr;

use deckflow_utils::error::ConfigError;
use deckflow_utils::types::PageNumberPosition;

use super::Config;

/// Upper bound for any size limit (100 MiB)
const MAX_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (key, secs) in [
            ("request_timeout_secs", self.service.request_timeout_secs),
            ("connect_timeout_secs", self.service.connect_timeout_secs),
        ] {
            if let Some(secs) = secs {
                if secs == 0 {
                    return Err(invalid(key, "must be greater than 0"));
                }
                if secs > 3600 {
                    return Err(invalid(key, "exceeds maximum limit of 3600 seconds"));
                }
            }
        }

        if let Some(retries) = self.service.max_retries
            && retries > 5
        {
            return Err(invalid("max_retries", "exceeds maximum limit of 5"));
        }

        if let Some(url) = &self.service.base_url
            && !is_http_url(url)
        {
            return Err(invalid(
                "service_base_url",
                format!("'{url}' is not an absolute http(s) URL"),
            ));
        }

        if let Some(url) = &self.service.development_url
            && !is_http_url(url)
        {
            return Err(invalid(
                "development_url",
                format!("'{url}' is not an absolute http(s) URL"),
            ));
        }

        if let Some(url) = &self.service.production_url
            && !url.starts_with('/')
            && !is_http_url(url)
        {
            return Err(invalid(
                "production_url",
                format!("'{url}' must be an absolute URL or a path starting with '/'"),
            ));
        }

        if let Some(origin) = &self.service.public_origin
            && !is_http_url(origin)
        {
            return Err(invalid(
                "public_origin",
                format!("'{origin}' is not an absolute http(s) URL"),
            ));
        }

        for (key, bytes) in [
            (
                "support_document_max_bytes",
                self.limits.support_document_max_bytes,
            ),
            ("page_material_max_bytes", self.limits.page_material_max_bytes),
        ] {
            if let Some(bytes) = bytes {
                if bytes == 0 {
                    return Err(invalid(key, "must be greater than 0"));
                }
                if bytes > MAX_LIMIT_BYTES {
                    return Err(invalid(key, "exceeds maximum limit of 100MB"));
                }
            }
        }

        if let Some(chars) = self.limits.text_preview_chars
            && chars == 0
        {
            return Err(invalid("text_preview_chars", "must be greater than 0"));
        }

        if let Some(pages) = self.generation.page_count
            && !(1..=100).contains(&pages)
        {
            return Err(invalid("page_count", "must be between 1 and 100"));
        }

        if let Some(template) = &self.generation.template
            && let Some(position) = &template.page_number_position
            && PageNumberPosition::from_str(position).is_err()
        {
            return Err(invalid(
                "page_number_position",
                format!(
                    "'{position}' (expected bottom-center, bottom-left, bottom-right or none)"
                ),
            ));
        }

        Ok(())
    }
}
