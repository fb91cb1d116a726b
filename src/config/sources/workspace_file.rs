//! Project config file source: typegen.toml and typegen.{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

pub const PROJECT_CONFIG_FILE: &str = "typegen.toml";

/// Active environment name, `development` unless TYPEGEN_ENV is set
pub fn environment_name() -> String {
    std::env::var("TYPEGEN_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Add project config files to builder.
/// Precedence: typegen.toml (base) then typegen.{TYPEGEN_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder;

    let base_config_path = project_root.join(PROJECT_CONFIG_FILE);
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path.as_path()).required(false));
    }

    let env_config_path = project_root.join(format!("typegen.{}.toml", environment_name()));
    if env_config_path.exists() {
        builder = builder.add_source(File::from(env_config_path.as_path()).required(false));
    }

    Ok(builder)
}
