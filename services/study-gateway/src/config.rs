//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API keys are read from the API_KEY env var (comma-separated) or from
//! `gemini.api_keys_file`, never from the TOML itself.

use common::{Secret, SecretString};
use generative::gemini::DEFAULT_BASE_URL;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "study-gateway.toml";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Per-call timeout for backend requests
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Generative backend settings
#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub text_model: String,
    #[serde(default = "default_model")]
    pub quiz_model: String,
    #[serde(default = "default_model")]
    pub sheet_model: String,
    #[serde(default = "default_overload_delay_ms")]
    pub overload_delay_ms: u64,
    /// File holding the key list (alternative to the API_KEY env var)
    #[serde(default)]
    pub api_keys_file: Option<PathBuf>,
    /// Raw delimited key list, resolved at load time
    #[serde(skip)]
    pub api_keys: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            timeout_secs: default_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            text_model: default_model(),
            quiz_model: default_model(),
            sheet_model: default_model(),
            overload_delay_ms: default_overload_delay_ms(),
            api_keys_file: None,
            api_keys: None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_timeout() -> u64 {
    60
}

fn default_max_connections() -> usize {
    256
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_overload_delay_ms() -> u64 {
    2000
}

impl GeminiConfig {
    pub fn overload_delay(&self) -> Duration {
        Duration::from_millis(self.overload_delay_ms)
    }

    /// The delimited key list, or "" when none is configured.
    pub fn api_keys_raw(&self) -> &str {
        self.api_keys.as_ref().map(|k| k.expose().as_str()).unwrap_or("")
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Load from `path` if it exists; otherwise run on defaults.
    ///
    /// A path the operator named explicitly must exist.
    pub fn load_or_default(path: &Path, explicit: bool) -> common::Result<Self> {
        if explicit || path.exists() {
            Self::load(path)
        } else {
            Config::default().finish()
        }
    }

    /// Validate, then resolve API keys: API_KEY env var first, then
    /// `api_keys_file`.
    fn finish(mut self) -> common::Result<Self> {
        if !self.gemini.base_url.starts_with("http://")
            && !self.gemini.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.gemini.base_url
            )));
        }

        if self.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        for (name, model) in [
            ("text_model", &self.gemini.text_model),
            ("quiz_model", &self.gemini.quiz_model),
            ("sheet_model", &self.gemini.sheet_model),
        ] {
            if model.trim().is_empty() {
                return Err(common::Error::Config(format!("{name} must not be empty")));
            }
        }

        if let Ok(keys) = std::env::var("API_KEY") {
            self.gemini.api_keys = Some(Secret::new(keys));
        } else if let Some(ref keys_file) = self.gemini.api_keys_file {
            let keys = std::fs::read_to_string(keys_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read api_keys_file {}: {e}",
                    keys_file.display()
                ))
            })?;
            let keys = keys.trim().to_owned();
            if !keys.is_empty() {
                self.gemini.api_keys = Some(Secret::new(keys));
            }
        }

        Ok(self)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    ///
    /// The flag is true when the path was named explicitly.
    pub fn resolve_path(cli_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (PathBuf::from(p), true);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_PATH), false)
    }
}
