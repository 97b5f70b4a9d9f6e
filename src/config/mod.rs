//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (applied by the `cml` binary)
//!
//! The CLI resolves one [`Config`] per invocation and hands explicit values
//! to the exchange engine; nothing below the CLI reads the environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, Result};
use crate::protocol::{REQUEST_TIMEOUT_SECS, USER_AGENT};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Exchange endpoint and credentials
    #[serde(default)]
    pub endpoint: ExchangeEndpoint,

    /// File locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Exchange tuning
    #[serde(default)]
    pub exchange: ExchangeSettings,

    /// Catalog generator sizes
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ExchangeError::Config(format!("Failed to read config file: {e}")))?;

        Ok(toml::from_str(&content)?)
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExchangeError::Config(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ExchangeError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ExchangeError::Config(format!("Failed to write config file: {e}")))
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("cml2-emulator"))
            .unwrap_or_else(|| PathBuf::from("temp"))
            .join("config.toml")
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CML_URL") {
            config.endpoint.url = url;
        }
        if let Ok(user) = std::env::var("CML_USER") {
            config.endpoint.user = user;
        }
        if let Ok(pass) = std::env::var("CML_PASS") {
            config.endpoint.pass = pass;
        }

        if let Ok(dir) = std::env::var("CML_TEMPLATES_DIR") {
            config.paths.images_dir = PathBuf::from(&dir).join("images");
            config.paths.dictionaries_dir = PathBuf::from(&dir);
            config.paths.templates_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CML_STAGING_DIR") {
            config.paths.staging_dir = PathBuf::from(dir);
        }

        if let Ok(val) = std::env::var("CML_TIMEOUT_SECS") {
            if let Ok(val) = val.parse() {
                config.exchange.timeout_secs = val;
            }
        }

        config
    }

    /// Merge with another config (other takes precedence where it differs from defaults)
    pub fn merge(self, other: Self) -> Self {
        let endpoint_default = ExchangeEndpoint::default();
        let paths_default = PathsConfig::default();
        let exchange_default = ExchangeSettings::default();
        let generator_default = GeneratorConfig::default();

        Self {
            endpoint: ExchangeEndpoint {
                url: pick(self.endpoint.url, other.endpoint.url, &endpoint_default.url),
                user: pick(self.endpoint.user, other.endpoint.user, &endpoint_default.user),
                pass: pick(self.endpoint.pass, other.endpoint.pass, &endpoint_default.pass),
            },
            paths: PathsConfig {
                templates_dir: pick(
                    self.paths.templates_dir,
                    other.paths.templates_dir,
                    &paths_default.templates_dir,
                ),
                images_dir: pick(
                    self.paths.images_dir,
                    other.paths.images_dir,
                    &paths_default.images_dir,
                ),
                staging_dir: pick(
                    self.paths.staging_dir,
                    other.paths.staging_dir,
                    &paths_default.staging_dir,
                ),
                dictionaries_dir: pick(
                    self.paths.dictionaries_dir,
                    other.paths.dictionaries_dir,
                    &paths_default.dictionaries_dir,
                ),
            },
            exchange: ExchangeSettings {
                timeout_secs: pick(
                    self.exchange.timeout_secs,
                    other.exchange.timeout_secs,
                    &exchange_default.timeout_secs,
                ),
                accept_invalid_certs: pick(
                    self.exchange.accept_invalid_certs,
                    other.exchange.accept_invalid_certs,
                    &exchange_default.accept_invalid_certs,
                ),
                no_copy: self.exchange.no_copy || other.exchange.no_copy,
                max_polls: other.exchange.max_polls.or(self.exchange.max_polls),
                user_agent: pick(
                    self.exchange.user_agent,
                    other.exchange.user_agent,
                    &exchange_default.user_agent,
                ),
            },
            generator: GeneratorConfig {
                categories_count: pick(
                    self.generator.categories_count,
                    other.generator.categories_count,
                    &generator_default.categories_count,
                ),
                categories_level: pick(
                    self.generator.categories_level,
                    other.generator.categories_level,
                    &generator_default.categories_level,
                ),
                products_count: pick(
                    self.generator.products_count,
                    other.generator.products_count,
                    &generator_default.products_count,
                ),
                units_count: pick(
                    self.generator.units_count,
                    other.generator.units_count,
                    &generator_default.units_count,
                ),
            },
        }
    }
}

fn pick<T: PartialEq>(base: T, over: T, default: &T) -> T {
    if &over != default {
        over
    } else {
        base
    }
}

/// Exchange endpoint and credentials, immutable for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeEndpoint {
    /// Exchange URL, e.g. `https://shop.example/bitrix/admin/1c_exchange.php`
    #[serde(default)]
    pub url: String,

    /// Basic auth user
    #[serde(default)]
    pub user: String,

    /// Basic auth password
    #[serde(default)]
    pub pass: String,
}

impl ExchangeEndpoint {
    /// Create an endpoint
    pub fn new(url: impl Into<String>, user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// `user:pass@host/path` summary, scheme stripped
    pub fn summary(&self) -> String {
        let location = self
            .url
            .strip_prefix("https://")
            .or_else(|| self.url.strip_prefix("http://"))
            .unwrap_or(&self.url);
        format!("{}:{}@{}", self.user, self.pass, location)
    }
}

/// File locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Canonical documents (`import.xml`, `offers.xml`, `rests.xml`)
    pub templates_dir: PathBuf,

    /// Image assets (`<N>.jpg`)
    pub images_dir: PathBuf,

    /// Staging directory for copies and archives
    pub staging_dir: PathBuf,

    /// Generator word lists
    pub dictionaries_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            images_dir: PathBuf::from("templates/images"),
            staging_dir: PathBuf::from("temp"),
            dictionaries_dir: PathBuf::from("templates"),
        }
    }
}

/// Exchange tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    /// Per-request timeout in seconds, never retried
    pub timeout_secs: u64,

    /// Accept self-signed or otherwise invalid TLS certificates
    pub accept_invalid_certs: bool,

    /// Reuse previously staged documents instead of copying fresh ones
    pub no_copy: bool,

    /// Upper bound on import polls per document (unbounded when unset)
    pub max_polls: Option<u32>,

    /// User agent header
    pub user_agent: String,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: REQUEST_TIMEOUT_SECS,
            accept_invalid_certs: true,
            no_copy: false,
            max_polls: None,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Catalog generator sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Approximate number of leaf categories
    pub categories_count: u32,

    /// Depth of the category tree
    pub categories_level: u32,

    /// Number of products
    pub products_count: u32,

    /// Number of units of measure
    pub units_count: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            categories_count: 50,
            categories_level: 3,
            products_count: 450,
            units_count: 20,
        }
    }
}
