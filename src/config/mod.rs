// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variables with this prefix override file settings,
/// e.g. `HEALTH__DISK__THRESHOLD_PERCENT=95`.
pub const ENV_PREFIX: &str = "HEALTH";

/// Load configuration from an optional file (YAML or JSON) layered under the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!("Config file {} not found, using defaults", path.display());
    }

    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path).required(false))
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read configuration sources")?;

    let config: Config = settings
        .try_deserialize()
        .context("Failed to parse configuration")?;

    config.validate()?;
    Ok(config)
}
