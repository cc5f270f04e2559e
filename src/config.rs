use serde::Deserialize;
use thiserror::Error;
use time::macros::format_description;
use time::{Time, UtcOffset};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_SWEEP_AT: Time = time::macros::time!(18:00);
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {field}: '{value}'")]
    Invalid { field: &'static str, value: String },
    #[error("{0}")]
    Missing(&'static str),
}

#[derive(Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub data_dir: Option<PathBuf>,
    pub auth: AuthConfig,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub sweep: SweepConfig,
    pub admin: Option<AdminConfig>,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Wall-clock time of the daily sweep, in `utc_offset`.
    pub at: Time,
    pub utc_offset: UtcOffset,
    pub delivery_timeout: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            at: DEFAULT_SWEEP_AT,
            utc_offset: UtcOffset::UTC,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

/// Optional TOML file; every key mirrors a command line flag.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listen: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub auth_key: Option<String>,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub sweep_at: Option<String>,
    pub utc_offset: Option<String>,
    pub delivery_timeout_secs: Option<u64>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

pub fn parse_listen(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        field: "listen",
        value: raw.to_string(),
    })
}

pub fn parse_sweep_at(raw: &str) -> Result<Time, ConfigError> {
    let format = format_description!("[hour]:[minute]");
    Time::parse(raw.trim(), format).map_err(|_| ConfigError::Invalid {
        field: "sweep-at",
        value: raw.to_string(),
    })
}

pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("utc") || value.eq_ignore_ascii_case("z") {
        return Ok(UtcOffset::UTC);
    }
    let format = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(value, format).map_err(|_| ConfigError::Invalid {
        field: "utc-offset",
        value: raw.to_string(),
    })
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.parse().expect("default listen address"),
            data_dir: None,
            auth: AuthConfig {
                key: "dGVzdC1zaWduaW5nLWtleQ".to_string(),
            },
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            sweep: SweepConfig::default(),
            admin: None,
        }
    }
}
