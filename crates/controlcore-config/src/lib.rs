//! Shared configuration for ControlCore tools.
//!
//! TOML profiles naming a broker and topic root, layered with environment
//! overrides, and translation to `controlcore_core::ClientConfig`. The CLI
//! adds flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use controlcore_api::BrokerEndpoint;
use controlcore_core::ClientConfig;
use controlcore_core::config::DEFAULT_BROKER;

/// Prefix for environment overrides. Nested keys use `__`
/// (`CONTROLCORE_DEFAULTS__OUTPUT=json`).
pub const ENV_PREFIX: &str = "CONTROLCORE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named broker profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Freshness threshold for display, in minutes.
    #[serde(default = "default_stale_after")]
    pub stale_after_minutes: f64,

    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_secs: u64,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            stale_after_minutes: default_stale_after(),
            reconnect_interval_secs: default_reconnect_interval(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_stale_after() -> f64 {
    controlcore_core::DEFAULT_MAX_AGE_MINUTES
}
fn default_reconnect_interval() -> u64 {
    1
}
fn default_keep_alive() -> u64 {
    30
}

/// A named broker profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Broker URL (e.g., "mqtt://192.168.100.60:1883" or "ws://host:9001").
    pub broker: String,

    /// Topic root shared by telemetry and commands.
    #[serde(default = "default_root")]
    pub root: String,

    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,

    /// Override `defaults.keep_alive_secs`.
    pub keep_alive_secs: Option<u64>,

    /// Override `defaults.reconnect_interval_secs`.
    pub reconnect_interval_secs: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            broker: DEFAULT_BROKER.into(),
            root: default_root(),
            client_id_prefix: default_client_id_prefix(),
            keep_alive_secs: None,
            reconnect_interval_secs: None,
        }
    }
}

fn default_root() -> String {
    controlcore_api::topic::DEFAULT_ROOT.into()
}
fn default_client_id_prefix() -> String {
    "controlcore".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "controlcore", "controlcore").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("controlcore");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

impl Config {
    /// Name of the profile to use: explicit choice, then `default_profile`,
    /// then `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Look up a profile. The implicit `"default"` profile falls back to
    /// [`Profile::default`] when not defined.
    pub fn profile(&self, name: &str) -> Result<Profile, ConfigError> {
        match self.profiles.get(name) {
            Some(p) => Ok(p.clone()),
            None if name == "default" => Ok(Profile::default()),
            None => Err(ConfigError::ProfileNotFound { name: name.into() }),
        }
    }
}

/// Build a `ClientConfig` from a profile and the global defaults.
///
/// The broker URL is checked here so a typo fails before any connection
/// attempt.
pub fn profile_to_client_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    validate_broker(&profile.broker)?;

    if profile.root.trim_matches('/').is_empty() {
        return Err(ConfigError::Validation {
            field: "root".into(),
            reason: "topic root must not be empty".into(),
        });
    }

    let reconnect = profile
        .reconnect_interval_secs
        .unwrap_or(defaults.reconnect_interval_secs);
    if reconnect == 0 {
        return Err(ConfigError::Validation {
            field: "reconnect_interval_secs".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(ClientConfig {
        broker: profile.broker.clone(),
        root: profile.root.clone(),
        client_id_prefix: profile.client_id_prefix.clone(),
        keep_alive: Duration::from_secs(profile.keep_alive_secs.unwrap_or(defaults.keep_alive_secs)),
        reconnect_interval: Duration::from_secs(reconnect),
    })
}

/// Check that `broker` is a URL the transport can use.
pub fn validate_broker(broker: &str) -> Result<(), ConfigError> {
    BrokerEndpoint::parse(broker)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation {
            field: "broker".into(),
            reason: e.to_string(),
        })
}
