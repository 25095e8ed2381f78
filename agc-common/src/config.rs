//! Configuration loading and API key resolution
//!
//! Bootstrap configuration comes from a single TOML file. The file is
//! located in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `AGC_CONFIG` environment variable
//! 3. User config directory (`~/.config/agc/agc-an.toml` on Linux)
//! 4. System config (`/etc/agc/agc-an.toml`, Linux only)
//!
//! When no file exists at the default locations, built-in defaults are used.
//! A file named by the CLI or `AGC_CONFIG` must exist, and a file that
//! cannot be parsed is a configuration error.

use crate::idea::{IdeaLimits, DEFAULT_MAX_IDEA_CHARS, DEFAULT_MIN_IDEA_CHARS};
use crate::report::{ReportPolicy, DEFAULT_HIGH_PROBABILITY, DEFAULT_MIN_PROBABILITY};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "AGC_CONFIG";

/// Environment variable holding the LLM provider API key
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Config file name shared by all lookup locations
pub const CONFIG_FILE_NAME: &str = "agc-an.toml";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5780;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Largest accepted HTTP request body
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Worst-case JSON encoding of one character (`\u001f` style escapes)
const MAX_JSON_BYTES_PER_CHAR: usize = 6;

/// Room for `{"appIdea":""}` and surrounding whitespace
const REQUEST_ENVELOPE_BYTES: usize = 64;

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; omitted values take built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Interface to bind the HTTP server to
    pub host: String,

    /// HTTP server port
    pub port: u16,

    /// LLM provider settings
    pub openai: OpenAiConfig,

    /// Input validation and report thresholds
    pub analysis: AnalysisConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            openai: OpenAiConfig::default(),
            analysis: AnalysisConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (the `OPENAI_API_KEY` environment variable takes precedence)
    pub api_key: Option<String>,

    /// Base URL; `/chat/completions` is appended
    pub base_url: String,

    pub model: String,

    pub temperature: f32,

    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Analysis thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_idea_chars: usize,
    pub max_idea_chars: usize,
    /// Violations at or below this probability are dropped
    pub min_probability: f64,
    /// Threshold used when the model omits `isCompliant`
    pub high_probability: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_idea_chars: DEFAULT_MIN_IDEA_CHARS,
            max_idea_chars: DEFAULT_MAX_IDEA_CHARS,
            min_probability: DEFAULT_MIN_PROBABILITY,
            high_probability: DEFAULT_HIGH_PROBABILITY,
        }
    }
}

impl AnalysisConfig {
    pub fn idea_limits(&self) -> IdeaLimits {
        IdeaLimits {
            min_chars: self.min_idea_chars,
            max_chars: self.max_idea_chars,
        }
    }

    pub fn report_policy(&self) -> ReportPolicy {
        ReportPolicy {
            min_probability: self.min_probability,
            high_probability: self.high_probability,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Locate and load the configuration file
    ///
    /// Returns the path that was read, or `None` when no file was found and
    /// built-in defaults are in effect. Nothing is logged here so callers can
    /// load configuration before the tracing subscriber exists.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);

        match locate_config_file(cli_path, env_path.as_deref())? {
            Some(path) => {
                let config = load_toml_config(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if a.min_idea_chars == 0 || a.min_idea_chars > a.max_idea_chars {
            return Err(Error::Config(format!(
                "analysis.min_idea_chars ({}) must be between 1 and analysis.max_idea_chars ({})",
                a.min_idea_chars, a.max_idea_chars
            )));
        }
        let worst_case_body = a
            .max_idea_chars
            .saturating_mul(MAX_JSON_BYTES_PER_CHAR)
            .saturating_add(REQUEST_ENVELOPE_BYTES);
        if worst_case_body > MAX_REQUEST_BODY_BYTES {
            return Err(Error::Config(format!(
                "analysis.max_idea_chars ({}) does not fit the {} byte request body limit (at most {})",
                a.max_idea_chars,
                MAX_REQUEST_BODY_BYTES,
                (MAX_REQUEST_BODY_BYTES - REQUEST_ENVELOPE_BYTES) / MAX_JSON_BYTES_PER_CHAR
            )));
        }
        if !(0.0..1.0).contains(&a.min_probability) {
            return Err(Error::Config(format!(
                "analysis.min_probability ({}) must be in [0, 1)",
                a.min_probability
            )));
        }
        if !(a.high_probability > 0.0 && a.high_probability <= 1.0) {
            return Err(Error::Config(format!(
                "analysis.high_probability ({}) must be in (0, 1]",
                a.high_probability
            )));
        }
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(Error::Config(format!(
                "openai.temperature ({}) must be in [0, 2]",
                self.openai.temperature
            )));
        }
        if self.openai.timeout_secs == 0 {
            return Err(Error::Config("openai.timeout_secs must be positive".to_string()));
        }
        if self.openai.base_url.trim().is_empty() {
            return Err(Error::Config("openai.base_url must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Find the config file to use
///
/// An explicitly named file (CLI or environment) must exist. Default
/// locations are probed silently.
pub fn locate_config_file(
    cli_path: Option<&Path>,
    env_path: Option<&Path>,
) -> Result<Option<PathBuf>> {
    // Priority 1 and 2: explicit paths
    if let Some(path) = cli_path.or(env_path) {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    // Priority 3 and 4: platform locations
    Ok(default_config_paths().into_iter().find(|p| p.exists()))
}

/// Platform config file locations, highest priority first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("agc").join(CONFIG_FILE_NAME));
    }

    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/agc").join(CONFIG_FILE_NAME));
    }

    paths
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve the LLM API key
///
/// **Priority:** ENV → TOML
///
/// Returns `None` when no usable key is configured; the service still
/// starts and reports itself as degraded.
pub fn resolve_api_key(config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR).ok();
    choose_api_key(env_key.as_deref(), config.openai.api_key.as_deref())
}

/// Pick between the environment and TOML key
pub fn choose_api_key(env_key: Option<&str>, toml_key: Option<&str>) -> Option<String> {
    let env_key = env_key.filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "API key found in both environment and TOML config. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("API key loaded from environment variable");
        return Some(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("API key loaded from TOML config");
        return Some(key.trim().to_string());
    }

    warn!(
        "No API key configured. Set {} or openai.api_key in {}",
        API_KEY_ENV_VAR, CONFIG_FILE_NAME
    );
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
