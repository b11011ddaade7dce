use std::collections::BTreeMap;

use crate::ConfigSource;

use super::Config;

fn source_label(source: Option<&ConfigSource>) -> String {
    source.unwrap_or(&ConfigSource::Default).as_str().to_string()
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        add("service_profile", self.profile().as_str().to_string());
        add("service_base_url", self.service_base_url());
        add(
            "request_timeout_secs",
            self.request_timeout().as_secs().to_string(),
        );
        add(
            "connect_timeout_secs",
            self.connect_timeout().as_secs().to_string(),
        );
        add("max_retries", self.max_retries().to_string());
        add(
            "support_document_max_bytes",
            self.support_document_max_bytes().to_string(),
        );
        add(
            "page_material_max_bytes",
            self.page_material_max_bytes().to_string(),
        );
        add("text_preview_chars", self.text_preview_chars().to_string());
        add("verbose", self.verbose().to_string());

        if let Some(pages) = self.generation.page_count {
            add("page_count", pages.to_string());
        }
        if let Some(principles) = &self.generation.design_principles {
            add("design_principles", principles.clone());
        }
        if self.generation.template.is_some() {
            let settings = self.template_settings();
            add(
                "template",
                format!(
                    "logo={}, page_number={}",
                    settings.logo_position, settings.page_number_position
                ),
            );
        }

        config
    }
}
