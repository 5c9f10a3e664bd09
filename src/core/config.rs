//! Configuration loading and validation.
//!
//! Settings come from a TOML file (default location under the platform config
//! directory) with CLI/env overrides applied by the binary. Only the Share
//! credentials are mandatory; everything else has the upstream defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{DexpollError, Result};

/// US Share endpoint host.
pub const US_SERVER: &str = "share1.dexcom.com";
/// Outside-US Share endpoint host.
pub const EU_SERVER: &str = "shareous1.dexcom.com";

/// Default poll interval in seconds.
pub const DEFAULT_UPDATE_SECS: u64 = 300;

/// Minimum accepted poll interval. The Share service produces one reading
/// every five minutes; polling much faster than this only burns quota.
pub const MIN_UPDATE_SECS: u64 = 30;

/// Regional Share endpoint selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    /// Host for this region's Share endpoint.
    #[must_use]
    pub const fn host(self) -> &'static str {
        match self {
            Self::Us => US_SERVER,
            Self::Eu => EU_SERVER,
        }
    }

    /// Parse from CLI argument (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "us" => Some(Self::Us),
            "eu" | "ous" => Some(Self::Eu),
            _ => None,
        }
    }
}

/// Display units preferred by the downstream widget. Carried through config so
/// a dashboard host can read one file; the client itself always reports both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Mg,
    Mmol,
}

/// dexpoll configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Share account name. May be omitted in the file and supplied via
    /// CLI flag or environment; validation requires it either way.
    #[serde(default)]
    pub username: String,

    /// Share account password. Same sourcing rules as `username`.
    #[serde(default)]
    pub password: String,

    /// Regional endpoint; ignored when `server_url` is set.
    #[serde(default)]
    pub region: Region,

    /// Explicit Share host override (no scheme).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Poll interval in seconds.
    #[serde(default = "default_update_secs")]
    pub update_secs: u64,

    /// Low-glucose display threshold, mg/dL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_limit: Option<i32>,

    /// High-glucose display threshold, mg/dL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_limit: Option<i32>,

    /// Preferred display units.
    #[serde(default)]
    pub units: Units,
}

const fn default_update_secs() -> u64 {
    DEFAULT_UPDATE_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            region: Region::default(),
            server_url: None,
            update_secs: DEFAULT_UPDATE_SECS,
            low_limit: None,
            high_limit: None,
            units: Units::default(),
        }
    }
}

impl Config {
    /// Default config file location (`<platform config dir>/dexpoll/config.toml`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dexpoll").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parse a config file without validating, so CLI/env overrides can fill
    /// in missing fields before [`Config::validate`] runs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` or `ConfigParse`.
    pub fn parse_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|_| DexpollError::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&text).map_err(|e| DexpollError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound`, `ConfigParse`, or `ConfigInvalid`.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(DexpollError::ConfigInvalid {
                key: "username".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.password.is_empty() {
            return Err(DexpollError::ConfigInvalid {
                key: "password".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.update_secs < MIN_UPDATE_SECS {
            return Err(DexpollError::ConfigInvalid {
                key: "update_secs".to_string(),
                message: format!("must be at least {MIN_UPDATE_SECS}"),
            });
        }
        if let (Some(low), Some(high)) = (self.low_limit, self.high_limit)
            && low >= high
        {
            return Err(DexpollError::ConfigInvalid {
                key: "low_limit".to_string(),
                message: "must be below high_limit".to_string(),
            });
        }
        Ok(())
    }

    /// The Share host to call: explicit override, else the regional default.
    #[must_use]
    pub fn server_host(&self) -> &str {
        self.server_url.as_deref().unwrap_or(self.region.host())
    }
}
