//! Layered configuration loading
//!
//! Sources, later ones overriding earlier ones:
//! 1. `config/default.toml`
//! 2. `config/{environment}.toml`
//! 3. `SG__`-prefixed environment variables, `__` separating nested keys
//!    (`SG__AUTH__SESSION__ACCESS_TTL_SECS=600`)
//!
//! Every file is optional; anything left unset falls back to the serde defaults
//! of [`AppConfig`].

use std::path::Path;

use config::{Config, Environment as EnvSource, File};
use tracing::debug;

use sg_shared::config::{AppConfig, Environment};

use crate::InfrastructureError;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "SG";

/// Separator between the prefix and nested keys
pub const ENV_SEPARATOR: &str = "__";

/// Load settings from `./config` and the process environment
///
/// Reads a `.env` file first when one is present.
pub fn load_settings() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env();
    load_settings_with(Path::new("config"), environment, env_overrides())
}

/// Load settings from an explicit directory and override source
pub fn load_settings_with(
    dir: &Path,
    environment: Environment,
    overrides: EnvSource,
) -> Result<AppConfig, InfrastructureError> {
    debug!(dir = %dir.display(), environment = %environment, "Loading settings");

    let default_file = dir.join("default");
    let env_file = dir.join(environment.to_string());

    let mut config: AppConfig = Config::builder()
        .set_default("environment", environment.to_string())?
        .add_source(File::from(default_file).required(false))
        .add_source(File::from(env_file).required(false))
        .add_source(overrides)
        .build()?
        .try_deserialize()?;

    // The selected environment wins over whatever the files declare
    config.environment = environment;
    Ok(config)
}

/// Environment variable source with the standard prefix and separator
pub fn env_overrides() -> EnvSource {
    EnvSource::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
