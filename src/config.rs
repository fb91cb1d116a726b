//! Configuration System
//!
//! Layered configuration for the generator: built-in defaults, the global
//! user file, project files and `TYPEGEN__*` environment variables, merged with
//! the `config` crate. [`TypegenConfig::schema_configs`] resolves the merged
//! settings into one [`SchemaConfig`] per artifact.

use crate::codegen::{plugin_chain, CodegenConfig, CodegenPluginSpec, PluginInvocation};
use crate::documents::PluckConfig;
use crate::error::TypegenError;
use crate::logging::LoggingConfig;
use crate::scheduler::FailurePolicy;
use crate::schema::SchemaLocator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Key of the configuration backed by the host schema
pub const DEFAULT_SCHEMA_KEY: &str = "default-gatsby-schema";

/// Directory that may not receive generated artifacts
const PROTECTED_DIR: &str = "src";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypegenConfig {
    /// Output path of the default artifact, relative to the project root
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Document search patterns, relative to the project root
    #[serde(default = "default_document_paths")]
    pub document_paths: Vec<String>,

    /// Generation is skipped entirely when false
    #[serde(default = "default_true")]
    pub codegen: bool,

    /// Quiescence window in milliseconds
    #[serde(default = "default_codegen_delay")]
    pub codegen_delay: u64,

    #[serde(default = "default_fail_on_error")]
    pub fail_on_error: bool,

    /// Host schema used by the standalone binary
    #[serde(default = "default_schema")]
    pub schema: SchemaLocator,

    #[serde(default)]
    pub additional_schemas: Vec<AdditionalSchemaConfig>,

    #[serde(default)]
    pub pluck_config: PluckConfig,

    #[serde(default)]
    pub codegen_plugins: Vec<CodegenPluginSpec>,

    #[serde(default)]
    pub codegen_config: CodegenConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// An independently loaded schema with its own artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalSchemaConfig {
    pub key: String,

    /// Defaults to `graphql-types-<key>.ts`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    pub schema: SchemaLocator,

    /// Inherits the top-level patterns when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_paths: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pluck_config: Option<PluckConfig>,

    #[serde(default)]
    pub codegen_plugins: Vec<CodegenPluginSpec>,

    #[serde(default)]
    pub codegen_config: CodegenConfig,
}

pub(crate) fn default_file_name() -> String {
    "graphql-types.ts".to_string()
}

pub(crate) fn default_document_paths() -> Vec<String> {
    vec![
        "./src/**/*.{ts,tsx}".to_string(),
        "./node_modules/gatsby-*/**/*.js".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_codegen_delay() -> u64 {
    200
}

/// `true` only for production builds
pub(crate) fn default_fail_on_error() -> bool {
    ["TYPEGEN_ENV", "NODE_ENV"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .next()
        .map(|env| env == "production")
        .unwrap_or(false)
}

pub(crate) fn default_schema_pointer() -> String {
    "schema.graphql".to_string()
}

fn default_schema() -> SchemaLocator {
    SchemaLocator::Pointer(default_schema_pointer())
}

impl Default for TypegenConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            document_paths: default_document_paths(),
            codegen: default_true(),
            codegen_delay: default_codegen_delay(),
            fail_on_error: default_fail_on_error(),
            schema: default_schema(),
            additional_schemas: Vec::new(),
            pluck_config: PluckConfig::default(),
            codegen_plugins: Vec::new(),
            codegen_config: CodegenConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where a configuration's schema comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// The snapshot delivered by the event source
    Host,
    /// Loaded through the schema loader on first use
    Locator(SchemaLocator),
}

/// Everything needed to produce one artifact
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    pub key: String,
    /// Absolute output path
    pub output_path: PathBuf,
    pub document_paths: Vec<String>,
    pub pluck_config: PluckConfig,
    pub plugins: Vec<PluginInvocation>,
    pub source: SchemaSource,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    ProtectedOutput(String, PathBuf),
    EmptyKey(usize),
    DuplicateKey(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::ProtectedOutput(key, path) => write!(
                f,
                "Schema '{}': output {} is inside the protected {}/ directory",
                key,
                path.display(),
                PROTECTED_DIR
            ),
            ValidationError::EmptyKey(index) => {
                write!(f, "additional_schemas[{}]: key cannot be empty", index)
            }
            ValidationError::DuplicateKey(key) => {
                write!(f, "Schema '{}': key is used more than once", key)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl TypegenConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.codegen_delay)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::from_fail_on_error(self.fail_on_error)
    }

    /// Validate the entire configuration against a project root
    pub fn validate(&self, root: &Path) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let protected = normalize(&root.join(PROTECTED_DIR));

        let mut check_output = |key: &str, file_name: &str| {
            let output = normalize(&root.join(file_name));
            if output.starts_with(&protected) {
                errors.push(ValidationError::ProtectedOutput(key.to_string(), output));
            }
        };

        check_output(DEFAULT_SCHEMA_KEY, &self.file_name);
        for additional in &self.additional_schemas {
            check_output(&additional.key, &additional_file_name(additional));
        }

        let mut keys = HashSet::from([DEFAULT_SCHEMA_KEY]);
        for (index, additional) in self.additional_schemas.iter().enumerate() {
            if additional.key.trim().is_empty() {
                errors.push(ValidationError::EmptyKey(index));
            } else if !keys.insert(additional.key.as_str()) {
                errors.push(ValidationError::DuplicateKey(additional.key.clone()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and resolve one [`SchemaConfig`] per artifact, default first
    pub fn schema_configs(&self, root: &Path) -> Result<Vec<SchemaConfig>, TypegenError> {
        self.validate(root).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            TypegenError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let mut configs = vec![SchemaConfig {
            key: DEFAULT_SCHEMA_KEY.to_string(),
            output_path: normalize(&root.join(&self.file_name)),
            document_paths: self.document_paths.clone(),
            pluck_config: self.pluck_config.clone(),
            plugins: plugin_chain(&self.codegen_plugins, &self.codegen_config),
            source: SchemaSource::Host,
        }];

        for additional in &self.additional_schemas {
            configs.push(SchemaConfig {
                key: additional.key.clone(),
                output_path: normalize(&root.join(additional_file_name(additional))),
                document_paths: additional
                    .document_paths
                    .clone()
                    .unwrap_or_else(|| self.document_paths.clone()),
                pluck_config: additional
                    .pluck_config
                    .clone()
                    .unwrap_or_else(|| self.pluck_config.clone()),
                plugins: plugin_chain(&additional.codegen_plugins, &additional.codegen_config),
                source: SchemaSource::Locator(additional.schema.clone()),
            });
        }

        Ok(configs)
    }
}

fn additional_file_name(additional: &AdditionalSchemaConfig) -> String {
    additional
        .file_name
        .clone()
        .unwrap_or_else(|| format!("graphql-types-{}.ts", additional.key))
}

/// Lexically resolve `.` and `..` components
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::CodegenPluginKind;
    use tempfile::TempDir;

    fn additional(key: &str) -> AdditionalSchemaConfig {
        AdditionalSchemaConfig {
            key: key.to_string(),
            file_name: None,
            schema: SchemaLocator::Pointer("https://example.com/graphql".to_string()),
            document_paths: None,
            pluck_config: None,
            codegen_plugins: Vec::new(),
            codegen_config: CodegenConfig::default(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = TypegenConfig::default();
        assert_eq!(config.file_name, "graphql-types.ts");
        assert_eq!(config.codegen_delay, 200);
        assert!(config.codegen);
        assert_eq!(config.delay(), Duration::from_millis(200));
        assert_eq!(config.document_paths.len(), 2);
        assert!(config.additional_schemas.is_empty());
    }

    #[test]
    fn test_schema_configs_default_first() {
        let root = Path::new("/project");
        let mut config = TypegenConfig::default();
        config.additional_schemas.push(additional("pokemon"));

        let configs = config.schema_configs(root).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].key, DEFAULT_SCHEMA_KEY);
        assert_eq!(configs[0].source, SchemaSource::Host);
        assert_eq!(configs[0].output_path, PathBuf::from("/project/graphql-types.ts"));

        assert_eq!(configs[1].key, "pokemon");
        assert_eq!(
            configs[1].output_path,
            PathBuf::from("/project/graphql-types-pokemon.ts")
        );
        assert_eq!(configs[1].document_paths, config.document_paths);
        assert_eq!(configs[1].plugins[0].kind, CodegenPluginKind::Typescript);
        assert!(matches!(configs[1].source, SchemaSource::Locator(_)));
    }

    #[test]
    fn test_output_inside_src_is_rejected() {
        let root = Path::new("/project");
        let config = TypegenConfig {
            file_name: "./lib/../src/types.ts".to_string(),
            ..TypegenConfig::default()
        };
        let errors = config.validate(root).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ProtectedOutput(
                DEFAULT_SCHEMA_KEY.to_string(),
                PathBuf::from("/project/src/types.ts")
            )]
        );

        let allowed = TypegenConfig {
            file_name: "types/src-graphql.ts".to_string(),
            ..TypegenConfig::default()
        };
        assert!(allowed.validate(root).is_ok());
    }

    #[test]
    fn test_duplicate_and_reserved_keys_are_rejected() {
        let mut config = TypegenConfig::default();
        config.additional_schemas = vec![
            additional("pokemon"),
            additional("pokemon"),
            additional(DEFAULT_SCHEMA_KEY),
            additional(" "),
        ];
        let errors = config.validate(Path::new("/project")).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateKey("pokemon".to_string())));
        assert!(errors.contains(&ValidationError::DuplicateKey(DEFAULT_SCHEMA_KEY.to_string())));
        assert!(errors.contains(&ValidationError::EmptyKey(3)));

        let err = config.schema_configs(Path::new("/project")).unwrap_err();
        assert!(matches!(err, TypegenError::Config(_)));
    }

    #[test]
    fn test_additional_schema_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("typegen.toml");
        std::fs::write(
            &config_file,
            r#"
file_name = "types/graphql.ts"
codegen_delay = 50
fail_on_error = true

[codegen_config]
skip_typename = false

[[additional_schemas]]
key = "github"
file_name = "types/github.ts"
document_paths = ["./queries/github/*.graphql"]

[additional_schemas.schema]
url = "https://api.github.com/graphql"
headers = { authorization = "bearer token" }

[[additional_schemas.codegen_plugins]]
resolve = "typescript"
options = { enums_as_types = false }
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&config_file).unwrap();
        assert_eq!(config.codegen_delay, 50);
        assert_eq!(config.failure_policy(), FailurePolicy::Fail);
        assert_eq!(config.codegen_config.skip_typename, Some(false));

        let configs = config.schema_configs(temp_dir.path()).unwrap();
        let github = &configs[1];
        assert_eq!(github.output_path, temp_dir.path().join("types/github.ts"));
        assert_eq!(github.document_paths, vec!["./queries/github/*.graphql".to_string()]);
        assert!(!github.plugins[0].options.enums_as_types);
        // codegen_config of the default schema is not inherited
        assert!(github.plugins[0].options.skip_typename);
        match &github.source {
            SchemaSource::Locator(SchemaLocator::Endpoint { url, headers }) => {
                assert_eq!(url, "https://api.github.com/graphql");
                assert_eq!(headers.get("authorization").unwrap(), "bearer token");
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_unknown_plugin_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("typegen.toml");
        std::fs::write(
            &config_file,
            "[[codegen_plugins]]\nresolve = \"typescript-react-apollo\"\n",
        )
        .unwrap();

        let err = ConfigLoader::load_from_file(&config_file).unwrap_err();
        assert!(matches!(err, TypegenError::Config(_)));
    }

    #[test]
    fn test_effective_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&TypegenConfig::default()).unwrap();
        assert!(rendered.contains("file_name = \"graphql-types.ts\""));
        assert!(rendered.contains("codegen_delay = 200"));
    }
}
