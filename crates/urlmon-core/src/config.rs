use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration for a check run, loaded from `~/.config/urlmon/config.toml`
/// (all keys optional) and overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlmonConfig {
    /// Per-probe deadline in seconds.
    pub timeout_secs: u64,
    /// Maximum number of probes in flight at once.
    pub concurrency: usize,
    /// Optional limit for the connect phase; must not exceed `timeout_secs`.
    pub connect_timeout_secs: Option<u64>,
    /// Follow HTTP redirects and report the final response.
    pub follow_redirects: bool,
    /// Redirect limit when `follow_redirects` is set.
    pub max_redirects: u32,
    /// Optional User-Agent header (libcurl sends none by default).
    pub user_agent: Option<String>,
}

impl Default for UrlmonConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            concurrency: 10,
            connect_timeout_secs: None,
            follow_redirects: true,
            max_redirects: 10,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("timeout_secs must be at least 1")]
    ZeroTimeout,
    #[error("connect_timeout_secs ({connect}) exceeds timeout_secs ({total})")]
    ConnectTimeoutTooLong { connect: u64, total: u64 },
}

impl UrlmonConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(connect) = self.connect_timeout_secs {
            if connect > self.timeout_secs {
                return Err(ConfigError::ConnectTimeoutTooLong {
                    connect,
                    total: self.timeout_secs,
                });
            }
        }
        Ok(())
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }
}

/// The XDG config file, if one exists.
pub fn config_path() -> Result<Option<PathBuf>> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("urlmon")?;
    Ok(xdg_dirs.find_config_file("config.toml"))
}

/// Load configuration from an explicit file (which must exist).
pub fn load_from_path(path: &Path) -> Result<UrlmonConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    UrlmonConfig::from_toml_str(&data).with_context(|| format!("parse config {}", path.display()))
}

/// Load `explicit` when given, else the XDG config file when present, else defaults.
/// Never writes a file.
pub fn load(explicit: Option<&Path>) -> Result<UrlmonConfig> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }
    match config_path()? {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            load_from_path(&path)
        }
        None => Ok(UrlmonConfig::default()),
    }
}
