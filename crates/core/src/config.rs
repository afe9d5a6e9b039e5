use std::env;
use std::fs;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Resolved application configuration: defaults, then optional TOML file,
/// then `DRAFTSMITH_*` environment overrides, in that order.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                model: "gpt-4.1-mini".to_string(),
                base_url: None,
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    llm: FileLlm,
    #[serde(default)]
    server: FileServer,
    #[serde(default)]
    logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLlm {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileServer {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLogging {
    level: Option<String>,
    format: Option<String>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = resolve_config_path(&options) {
            if path.exists() {
                config.apply_file(&path)?;
            } else if options.require_file {
                return Err(ConfigError::MissingConfigFile(path));
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Presence of a model credential. The single dispatch flag: its absence
    /// routes every request through the fallback generator.
    pub fn provider_configured(&self) -> bool {
        self.llm
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty())
    }

    fn apply_file(&mut self, path: &PathBuf) -> Result<(), ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
        let file: FileConfig = toml::from_str(&raw)
            .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;

        if let Some(api_key) = file.llm.api_key {
            self.llm.api_key = Some(api_key.into());
        }
        if let Some(model) = file.llm.model {
            self.llm.model = model;
        }
        if let Some(base_url) = file.llm.base_url {
            self.llm.base_url = Some(base_url);
        }
        if let Some(timeout_secs) = file.llm.timeout_secs {
            self.llm.timeout_secs = timeout_secs;
        }
        if let Some(bind_address) = file.server.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = file.server.port {
            self.server.port = port;
        }
        if let Some(level) = file.logging.level {
            self.logging.level = level;
        }
        if let Some(format) = file.logging.format {
            self.logging.format = LogFormat::parse(&format).ok_or_else(|| {
                ConfigError::Validation(format!("unknown logging format `{format}`"))
            })?;
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DRAFTSMITH_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("DRAFTSMITH_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("DRAFTSMITH_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("DRAFTSMITH_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("DRAFTSMITH_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DRAFTSMITH_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DRAFTSMITH_SERVER_PORT") {
            self.server.port = parse_env("DRAFTSMITH_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("DRAFTSMITH_LOGGING_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("DRAFTSMITH_LOGGING_FORMAT") {
            self.logging.format = match LogFormat::parse(&value) {
                Some(format) => format,
                None => {
                    return Err(ConfigError::InvalidEnvOverride {
                        key: "DRAFTSMITH_LOGGING_FORMAT".to_string(),
                        value,
                    })
                }
            };
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown logging level `{}`",
                self.logging.level
            )));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server port must be non-zero".to_string()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Validation("llm timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

fn resolve_config_path(options: &LoadOptions) -> Option<PathBuf> {
    options
        .config_path
        .clone()
        .or_else(|| read_env("DRAFTSMITH_CONFIG_PATH").map(PathBuf::from))
        .or_else(|| Some(PathBuf::from("draftsmith.toml")))
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
