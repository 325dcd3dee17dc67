use std::{fs, io, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use tracing::warn;

use crate::workflow::{ContractRevision, UnknownContractRevision};

pub const DEFAULT_CONFIG_FILE: &str = "opinionflow.toml";
pub const DEFAULT_API_BASE: &str = "http://localhost:8081/api/v1";
pub const DEFAULT_MAX_PER_STORE: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_base: String,
    pub contract: ContractRevision,
    pub max_per_store: u32,
    pub follow_redirects: bool,
    pub discover_timeout: Duration,
    pub analysis_timeout: Duration,
    pub question_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            contract: ContractRevision::default(),
            max_per_store: DEFAULT_MAX_PER_STORE,
            follow_redirects: false,
            discover_timeout: Duration::from_secs(60),
            analysis_timeout: Duration::from_secs(120),
            question_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid contract in {origin}: {source}")]
    Contract {
        origin: String,
        source: UnknownContractRevision,
    },
    #[error("invalid api base url '{value}': {source}")]
    InvalidApiBase {
        value: String,
        source: url::ParseError,
    },
    #[error("api base url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Keys accepted in `opinionflow.toml`.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base: Option<String>,
    contract: Option<String>,
    max_per_store: Option<u32>,
    follow_redirects: Option<bool>,
    discover_timeout_secs: Option<u64>,
    analysis_timeout_secs: Option<u64>,
    question_timeout_secs: Option<u64>,
}

/// Defaults, then the config file (if present), then environment overrides.
///
/// An explicitly named file must exist; the default file is optional.
pub fn load_settings(config_path: Option<&Path>) -> Result<ClientSettings, ConfigError> {
    let mut settings = ClientSettings::default();

    let (path, required) = match config_path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw, &path.display().to_string())?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {}
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    validate_api_base(&settings.api_base)?;
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, raw: &str, path: &str) -> Result<(), ConfigError> {
    let file: FileSettings = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;

    if let Some(v) = file.api_base {
        settings.api_base = v;
    }
    if let Some(v) = file.contract {
        settings.contract = parse_contract(&v, path)?;
    }
    if let Some(v) = file.max_per_store {
        settings.max_per_store = v;
    }
    if let Some(v) = file.follow_redirects {
        settings.follow_redirects = v;
    }
    if let Some(v) = file.discover_timeout_secs {
        settings.discover_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file.analysis_timeout_secs {
        settings.analysis_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file.question_timeout_secs {
        settings.question_timeout = Duration::from_secs(v);
    }
    Ok(())
}

/// Unparseable numeric or flag values are logged and skipped. An unknown
/// contract is an error since it changes every request body.
fn apply_env(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("APP__API_BASE") {
        settings.api_base = v;
    }
    if let Some(v) = lookup("OPINIONFLOW_API_BASE") {
        settings.api_base = v;
    }

    if let Some(v) = lookup("OPINIONFLOW_CONTRACT") {
        settings.contract = parse_contract(&v, "OPINIONFLOW_CONTRACT")?;
    }
    if let Some(v) = parse_env(&lookup, "OPINIONFLOW_MAX_PER_STORE", |v| v.parse().ok()) {
        settings.max_per_store = v;
    }
    if let Some(v) = parse_env(&lookup, "OPINIONFLOW_FOLLOW_REDIRECTS", parse_flag) {
        settings.follow_redirects = v;
    }

    if let Some(v) = parse_env(&lookup, "OPINIONFLOW_DISCOVER_TIMEOUT_SECS", |v| v.parse().ok()) {
        settings.discover_timeout = Duration::from_secs(v);
    }
    if let Some(v) = parse_env(&lookup, "OPINIONFLOW_ANALYSIS_TIMEOUT_SECS", |v| v.parse().ok()) {
        settings.analysis_timeout = Duration::from_secs(v);
    }
    if let Some(v) = parse_env(&lookup, "OPINIONFLOW_QUESTION_TIMEOUT_SECS", |v| v.parse().ok()) {
        settings.question_timeout = Duration::from_secs(v);
    }
    Ok(())
}

fn parse_env<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(key, value = %raw, "config: ignoring unparseable environment value");
    }
    parsed
}

fn parse_contract(raw: &str, origin: &str) -> Result<ContractRevision, ConfigError> {
    raw.parse().map_err(|source| ConfigError::Contract {
        origin: origin.to_string(),
        source,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn validate_api_base(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidApiBase {
        value: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme(raw.to_string())),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
