//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and merging
//! configurations with proper precedence rules, plus the `DI_*` environment
//! variables that sit between config files and command-line flags.

use crate::client::parse_endpoint;
use crate::error::DnsIntelError;
use crate::types::{parse_int_prefix, RecordType};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Analysis API location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,

    /// Default lookup options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// History storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiConfig {
    /// Endpoint lookups are POSTed to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Public page URL used to build shareable links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
}

/// Default values for lookup options.
///
/// Numeric values are kept as text and go through the same lenient parsing
/// as command-line input; both `timeout = 5000` and `timeout = "5000"` work.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_types: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_propagation: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_dns: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_inspection: Option<bool>,

    /// Per-attempt timeout in milliseconds
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<String>,

    /// Pause between attempts in milliseconds
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HistoryConfig {
    /// History file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

fn de_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(t) => t,
    }))
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which config files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if parsing fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DnsIntelError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DnsIntelError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DnsIntelError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| DnsIntelError::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", e),
        })?;

        self.validate_config(&config)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, DnsIntelError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        // Lowest precedence first
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping config file"),
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            eprintln!("⚠️  Multiple config files found. Later files override earlier ones:");
            for path in &loaded_files {
                eprintln!("   {}", path.display());
            }
        }

        Ok(merged_config)
    }

    /// Local configuration in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./dns-intel.toml", "./.dns-intel.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Global configuration in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".dns-intel.toml", "dns-intel.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("dns-intel").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            api: match (lower.api, higher.api) {
                (Some(mut lower_api), Some(higher_api)) => {
                    if higher_api.endpoint.is_some() {
                        lower_api.endpoint = higher_api.endpoint;
                    }
                    if higher_api.site_url.is_some() {
                        lower_api.site_url = higher_api.site_url;
                    }
                    Some(lower_api)
                }
                (lower_api, higher_api) => higher_api.or(lower_api),
            },
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.record_types.is_some() {
                        lower_defaults.record_types = higher_defaults.record_types;
                    }
                    if higher_defaults.check_propagation.is_some() {
                        lower_defaults.check_propagation = higher_defaults.check_propagation;
                    }
                    if higher_defaults.reverse_dns.is_some() {
                        lower_defaults.reverse_dns = higher_defaults.reverse_dns;
                    }
                    if higher_defaults.enrichment.is_some() {
                        lower_defaults.enrichment = higher_defaults.enrichment;
                    }
                    if higher_defaults.ssl_inspection.is_some() {
                        lower_defaults.ssl_inspection = higher_defaults.ssl_inspection;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.max_retries.is_some() {
                        lower_defaults.max_retries = higher_defaults.max_retries;
                    }
                    if higher_defaults.retry_delay.is_some() {
                        lower_defaults.retry_delay = higher_defaults.retry_delay;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            history: match (lower.history, higher.history) {
                (Some(lower_history), Some(higher_history)) => Some(HistoryConfig {
                    path: higher_history.path.or(lower_history.path),
                }),
                (lower_history, higher_history) => higher_history.or(lower_history),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), DnsIntelError> {
        if let Some(api) = &config.api {
            if let Some(endpoint) = &api.endpoint {
                parse_endpoint(endpoint)?;
            }
            if let Some(site_url) = &api.site_url {
                url::Url::parse(site_url).map_err(|e| {
                    DnsIntelError::config(format!("Invalid site_url '{}': {}", site_url, e))
                })?;
            }
        }

        if let Some(defaults) = &config.defaults {
            if let Some(types) = &defaults.record_types {
                parse_record_types(types.iter().map(String::as_str))?;
            }

            for (name, value) in [
                ("timeout", &defaults.timeout),
                ("max_retries", &defaults.max_retries),
                ("retry_delay", &defaults.retry_delay),
            ] {
                if let Some(value) = value {
                    if parse_int_prefix(value).is_none() {
                        tracing::warn!(
                            setting = name,
                            value = %value,
                            "not a number, the built-in default will be used"
                        );
                    }
                }
            }
        }

        if let Some(history) = &config.history {
            if history.path.as_deref().is_some_and(|p| p.trim().is_empty()) {
                return Err(DnsIntelError::config("History path cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Parse a list of record type names, rejecting unknown ones.
pub fn parse_record_types<'a, I>(names: I) -> Result<Vec<RecordType>, DnsIntelError>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<RecordType>().map_err(DnsIntelError::config))
        .collect()
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via DI_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub endpoint: Option<String>,
    pub site_url: Option<String>,
    pub token: Option<String>,
    pub record_types: Option<Vec<RecordType>>,
    pub timeout: Option<String>,
    pub max_retries: Option<String>,
    pub retry_delay: Option<String>,
    pub history_file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an [`EnvConfig`] from an arbitrary variable source.
pub fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let text = |key: &str| {
        lookup(key).filter(|v| !v.trim().is_empty()).inspect(|value| {
            if key == "DI_TOKEN" {
                tracing::debug!("using DI_TOKEN");
            } else {
                tracing::debug!("using {}={}", key, value);
            }
        })
    };

    let mut env_config = EnvConfig {
        endpoint: text("DI_ENDPOINT").or_else(|| text("DNS_API_ENDPOINT")),
        site_url: text("DI_SITE_URL"),
        token: text("DI_TOKEN"),
        timeout: text("DI_TIMEOUT"),
        max_retries: text("DI_MAX_RETRIES"),
        retry_delay: text("DI_RETRY_DELAY"),
        history_file: text("DI_HISTORY_FILE"),
        config: text("DI_CONFIG"),
        ..Default::default()
    };

    // DI_RECORD_TYPES - comma-separated record types
    if let Some(types) = text("DI_RECORD_TYPES") {
        match parse_record_types(types.split(',')) {
            Ok(parsed) if !parsed.is_empty() => env_config.record_types = Some(parsed),
            Ok(_) => {}
            Err(e) => tracing::warn!(value = %types, error = %e, "ignoring invalid DI_RECORD_TYPES"),
        }
    }

    env_config
}
