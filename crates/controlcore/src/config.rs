//! CLI configuration: thin wrapper around `controlcore_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (`--config`, `--profile`, `--broker`, `--root`).

use std::path::PathBuf;

use controlcore_config::{Config, Profile, profile_to_client_config};
use controlcore_core::ClientConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file in effect: `--config` if given, else the platform path.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(controlcore_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(controlcore_config::load_config_from(&config_file(global))?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Translate the active profile + global flags into a `ClientConfig`.
///
/// Flag overrides take priority over profile values. With `--broker` an
/// undefined profile is not an error: the flags alone are enough.
pub fn resolve_client_config(global: &GlobalOpts, config: &Config) -> Result<ClientConfig, CliError> {
    let name = active_profile_name(global, config);

    let mut profile = match config.profile(&name) {
        Ok(profile) => profile,
        Err(_) if global.broker.is_some() => Profile::default(),
        Err(_) => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
    };

    if let Some(ref broker) = global.broker {
        profile.broker.clone_from(broker);
    }
    if let Some(ref root) = global.root {
        profile.root.clone_from(root);
    }

    tracing::debug!(profile = %name, broker = %profile.broker, root = %profile.root, "resolved profile");
    Ok(profile_to_client_config(&profile, &config.defaults)?)
}

/// Freshness threshold: explicit flag, else the configured default.
pub fn stale_after(flag: Option<f64>, config: &Config) -> Result<f64, CliError> {
    let minutes = flag.unwrap_or(config.defaults.stale_after_minutes);
    if !minutes.is_finite() || minutes < 0.0 {
        return Err(CliError::Validation {
            field: "stale-after".into(),
            reason: format!("expected a non-negative number of minutes, got {minutes}"),
        });
    }
    Ok(minutes)
}
