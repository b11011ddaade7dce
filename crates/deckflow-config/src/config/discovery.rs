use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use deckflow_utils::error::ConfigError;
use tracing::debug;

use super::{
    CliArgs, Config, ConfigSource, GenerationConfig, LimitsConfig, LoggingConfig, ServiceConfig,
    ServiceProfile,
};

/// Environment variable naming a directory that holds `config.toml`
pub const HOME_ENV: &str = "DECKFLOW_HOME";

/// Environment override for the service base URL
pub const SERVICE_URL_ENV: &str = "DECKFLOW_SERVICE_URL";

/// Environment override for the service profile
pub const PROFILE_ENV: &str = "DECKFLOW_PROFILE";

/// Keys reported with `default` attribution unless something overrides them
const DEFAULT_KEYS: &[&str] = &[
    "service_profile",
    "request_timeout_secs",
    "connect_timeout_secs",
    "max_retries",
    "support_document_max_bytes",
    "page_material_max_bytes",
    "text_preview_chars",
    "verbose",
];

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    service: Option<ServiceConfig>,
    limits: Option<LimitsConfig>,
    generation: Option<GenerationConfig>,
    logging: Option<LoggingConfig>,
}

/// Move `value` into `target` when present and record where it came from.
fn apply<T>(
    target: &mut Option<T>,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if value.is_some() {
        *target = value;
        attribution.insert(key.to_string(), source.clone());
    }
}

fn parse_profile(raw: &str) -> Result<ServiceProfile, ConfigError> {
    raw.parse::<ServiceProfile>()
        .map_err(|reason| ConfigError::InvalidValue {
            key: "service_profile".to_string(),
            value: reason,
        })
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("Failed to get current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// Reads the process environment and the user config directory.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let user_config = dirs::config_dir().map(|dir| dir.join("deckflow").join("config.toml"));
        Self::discover_with_env(
            start_dir,
            cli_args,
            |key| env::var(key).ok().filter(|v| !v.is_empty()),
            user_config.as_deref(),
        )
    }

    /// Path-driven discovery with an injected environment.
    ///
    /// This variant touches no process-global state, so tests use it directly.
    pub fn discover_with_env<F>(
        start_dir: &Path,
        cli_args: &CliArgs,
        env_lookup: F,
        user_config: Option<&Path>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut source_attribution = HashMap::new();
        for key in DEFAULT_KEYS {
            source_attribution.insert((*key).to_string(), ConfigSource::Default);
        }

        let mut service = ServiceConfig::default();
        let mut limits = LimitsConfig::default();
        let mut generation = GenerationConfig::default();
        let mut logging = LoggingConfig::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::locate_config_file(start_dir, &env_lookup, user_config),
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading configuration file");
            let file_config = Self::load_config_file(path)?;
            let src = ConfigSource::Config;
            let attr = &mut source_attribution;

            if let Some(file) = file_config.service {
                apply(&mut service.profile, file.profile, "service_profile", &src, attr);
                apply(&mut service.base_url, file.base_url, "service_base_url", &src, attr);
                apply(&mut service.development_url, file.development_url, "development_url", &src, attr);
                apply(&mut service.production_url, file.production_url, "production_url", &src, attr);
                apply(&mut service.public_origin, file.public_origin, "public_origin", &src, attr);
                apply(&mut service.request_timeout_secs, file.request_timeout_secs, "request_timeout_secs", &src, attr);
                apply(&mut service.connect_timeout_secs, file.connect_timeout_secs, "connect_timeout_secs", &src, attr);
                apply(&mut service.max_retries, file.max_retries, "max_retries", &src, attr);
            }

            if let Some(file) = file_config.limits {
                apply(&mut limits.support_document_max_bytes, file.support_document_max_bytes, "support_document_max_bytes", &src, attr);
                apply(&mut limits.page_material_max_bytes, file.page_material_max_bytes, "page_material_max_bytes", &src, attr);
                apply(&mut limits.text_preview_chars, file.text_preview_chars, "text_preview_chars", &src, attr);
            }

            if let Some(file) = file_config.generation {
                apply(&mut generation.page_count, file.page_count, "page_count", &src, attr);
                apply(&mut generation.design_principles, file.design_principles, "design_principles", &src, attr);
                apply(&mut generation.template, file.template, "template", &src, attr);
            }

            if let Some(file) = file_config.logging {
                apply(&mut logging.verbose, file.verbose, "verbose", &src, attr);
            }
        }

        // Environment overrides the file
        if let Some(url) = env_lookup(SERVICE_URL_ENV) {
            service.base_url = Some(url);
            source_attribution.insert("service_base_url".to_string(), ConfigSource::Env);
        }
        if let Some(profile) = env_lookup(PROFILE_ENV) {
            service.profile = Some(parse_profile(&profile)?);
            source_attribution.insert("service_profile".to_string(), ConfigSource::Env);
        }

        // CLI overrides everything
        if let Some(url) = &cli_args.service_url {
            service.base_url = Some(url.clone());
            source_attribution.insert("service_base_url".to_string(), ConfigSource::Cli);
        }
        if let Some(profile) = &cli_args.profile {
            service.profile = Some(parse_profile(profile)?);
            source_attribution.insert("service_profile".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout) = cli_args.request_timeout_secs {
            service.request_timeout_secs = Some(timeout);
            source_attribution.insert("request_timeout_secs".to_string(), ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            logging.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            service,
            limits,
            generation,
            logging,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Find the config file: `$DECKFLOW_HOME/config.toml`, then an upward
    /// search for `.deckflow/config.toml`, then the user config directory.
    fn locate_config_file<F>(
        start_dir: &Path,
        env_lookup: &F,
        user_config: Option<&Path>,
    ) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(home) = env_lookup(HOME_ENV) {
            let candidate = PathBuf::from(home).join("config.toml");
            if candidate.exists() {
                return Some(candidate);
            }
        }

        if let Some(found) = Self::discover_config_file_from(start_dir) {
            return Some(found);
        }

        user_config.filter(|p| p.exists()).map(Path::to_path_buf)
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.deckflow/config.toml`,
    /// stopping at repository root markers (.git, .hg, .svn) or the
    /// filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let config_path = dir.join(".deckflow").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }

            current = dir.parent();
        }

        None
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("Failed to read config file {}: {e}", path.display()),
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let config_dir = dir.join(".deckflow");
        fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_any_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let config =
            Config::discover_with_env(temp.path(), &CliArgs::default(), no_env, None).unwrap();

        assert_eq!(config.profile(), ServiceProfile::Production);
        assert_eq!(
            config.source_attribution.get("max_retries"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    fn test_upward_discovery_from_nested_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[service]\nprofile = \"development\"\nrequest_timeout_secs = 120\n",
        );
        let nested = temp.path().join("decks").join("q4");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_with_env(&nested, &CliArgs::default(), no_env, None).unwrap();

        assert_eq!(config.profile(), ServiceProfile::Development);
        assert_eq!(config.request_timeout().as_secs(), 120);
        assert_eq!(
            config.source_attribution.get("request_timeout_secs"),
            Some(&ConfigSource::Config)
        );
    }

    #[test]
    fn test_discovery_stops_at_repository_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[service]\nmax_retries = 4\n");
        let repo = temp.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert!(Config::discover_config_file_from(&repo).is_none());
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[service]\nbase_url = \"http://file.example/api\"\nprofile = \"production\"\n",
        );

        let env = |key: &str| match key {
            SERVICE_URL_ENV => Some("http://env.example/api".to_string()),
            PROFILE_ENV => Some("development".to_string()),
            _ => None,
        };

        let config =
            Config::discover_with_env(temp.path(), &CliArgs::default(), env, None).unwrap();
        assert_eq!(config.service_base_url(), "http://env.example/api");
        assert_eq!(config.profile(), ServiceProfile::Development);
        assert_eq!(
            config.source_attribution.get("service_base_url"),
            Some(&ConfigSource::Env)
        );

        let cli = CliArgs {
            service_url: Some("http://cli.example/api".to_string()),
            ..CliArgs::default()
        };
        let config = Config::discover_with_env(temp.path(), &cli, env, None).unwrap();
        assert_eq!(config.service_base_url(), "http://cli.example/api");
        assert_eq!(
            config.source_attribution.get("service_base_url"),
            Some(&ConfigSource::Cli)
        );
    }

    #[test]
    fn test_home_env_wins_over_upward_search() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[limits]\ntext_preview_chars = 100\n");

        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("config.toml"),
            "[limits]\ntext_preview_chars = 200\n",
        )
        .unwrap();
        let home_path = home.path().display().to_string();
        let env = move |key: &str| (key == HOME_ENV).then(|| home_path.clone());

        let config =
            Config::discover_with_env(temp.path(), &CliArgs::default(), env, None).unwrap();
        assert_eq!(config.text_preview_chars(), 200);
    }

    #[test]
    fn test_user_config_dir_fallback() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let user = TempDir::new().unwrap();
        let user_config = user.path().join("config.toml");
        fs::write(&user_config, "[logging]\nverbose = true\n").unwrap();

        let config = Config::discover_with_env(
            temp.path(),
            &CliArgs::default(),
            no_env,
            Some(&user_config),
        )
        .unwrap();
        assert!(config.verbose());
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(temp.path().join("missing.toml")),
            ..CliArgs::default()
        };

        let err = Config::discover_with_env(temp.path(), &cli, no_env, None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn test_invalid_toml_reports_invalid_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[service\nprofile = ");

        let err =
            Config::discover_with_env(temp.path(), &CliArgs::default(), no_env, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)), "got {err:?}");
    }

    #[test]
    fn test_unknown_section_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[runner]\nmode = \"wsl\"\n");

        let err =
            Config::discover_with_env(temp.path(), &CliArgs::default(), no_env, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)), "got {err:?}");
    }

    #[test]
    fn test_bad_profile_in_env_is_invalid_value() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let env = |key: &str| (key == PROFILE_ENV).then(|| "staging".to_string());

        let err =
            Config::discover_with_env(temp.path(), &CliArgs::default(), env, None).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "service_profile"),
            "got {err:?}"
        );
    }

    #[test]
    fn test_generation_template_section_parses() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            r##"
[generation]
page_count = 6

[generation.template]
page_number_position = "bottom-left"
color_scheme = { name = "ink", primary = "#112233" }
"##,
        );

        let config =
            Config::discover_with_env(temp.path(), &CliArgs::default(), no_env, None).unwrap();
        let settings = config.template_settings();
        assert_eq!(config.generation.page_count, Some(6));
        assert_eq!(
            settings.color_scheme.as_ref().and_then(|v| v.get("primary")),
            Some(&serde_json::json!("#112233"))
        );
    }
}
