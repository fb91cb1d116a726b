//! Loader facade: assembles the configuration sources in precedence order.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::TypegenConfig;
use crate::error::TypegenError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a project.
    ///
    /// Precedence (lowest to highest): defaults, global file, `typegen.toml`,
    /// `typegen.{TYPEGEN_ENV}.toml`, `TYPEGEN__*` environment variables.
    pub fn load(project_root: &Path) -> Result<TypegenConfig, TypegenError> {
        Self::load_with(project_root, None)
    }

    /// Like [`ConfigLoader::load`], with an explicit file replacing the project files
    pub fn load_with(
        project_root: &Path,
        explicit_file: Option<&Path>,
    ) -> Result<TypegenConfig, TypegenError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = match explicit_file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => workspace_file::add_to_builder(builder, project_root)?,
        };
        let builder = environment::add_to_builder(builder);

        let config: TypegenConfig = builder.build()?.try_deserialize()?;
        debug!(
            project_root = %project_root.display(),
            additional_schemas = config.additional_schemas.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load defaults plus a single file, without global or environment sources
    pub fn load_from_file(path: &Path) -> Result<TypegenConfig, TypegenError> {
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    pub fn default() -> TypegenConfig {
        TypegenConfig::default()
    }
}
