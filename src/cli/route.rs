//! CLI route: single route table and run context. Dispatches to the library services.

use crate::cli::parse::Commands;
use crate::codegen::TypeScriptGenerator;
use crate::config::{ConfigLoader, TypegenConfig};
use crate::documents::FsDocumentLoader;
use crate::error::TypegenError;
use crate::event::StateStore;
use crate::pipeline::{GenerationPipeline, Regenerator};
use crate::reporter::{Reporter, TracingReporter};
use crate::scheduler::{FailurePolicy, RegenerationScheduler};
use crate::schema::{DefaultSchemaLoader, SchemaLoader, SchemaSnapshot};
use crate::watch::SourceWatcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runtime context for CLI execution: project root and the loaded configuration.
pub struct RunContext {
    root: PathBuf,
    config: TypegenConfig,
}

/// Services shared by `generate` and `watch`
struct Services {
    schemas: Arc<dyn SchemaLoader>,
    regenerator: Arc<Regenerator>,
    reporter: Arc<dyn Reporter>,
}

impl RunContext {
    /// Create run context from project root and optional config path. Uses ConfigLoader only.
    pub fn new(root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, TypegenError> {
        let root = dunce::canonicalize(&root).map_err(|e| {
            TypegenError::Config(format!(
                "Project root {} is not accessible: {}",
                root.display(),
                e
            ))
        })?;
        let config = ConfigLoader::load_with(&root, config_path.as_deref())?;
        Ok(Self::with_config(root, config))
    }

    /// Create run context from an already loaded configuration
    pub fn with_config(root: PathBuf, config: TypegenConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &TypegenConfig {
        &self.config
    }

    /// Execute a command and return its text output
    pub fn execute(&self, command: &Commands) -> Result<String, TypegenError> {
        match command {
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| TypegenError::Config(format!("Failed to render configuration: {}", e))),
            Commands::Generate => self.block_on(self.generate()),
            Commands::Watch {
                delay,
                fail_on_error,
            } => {
                let mut config = self.config.clone();
                if let Some(delay) = delay {
                    config.codegen_delay = *delay;
                }
                if let Some(fail_on_error) = fail_on_error {
                    config.fail_on_error = *fail_on_error;
                }
                self.block_on(self.watch(&config))
            }
        }
    }

    fn block_on<F>(&self, future: F) -> Result<String, TypegenError>
    where
        F: std::future::Future<Output = Result<String, TypegenError>>,
    {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| TypegenError::Fatal(format!("Failed to create runtime: {}", e)))?;
        rt.block_on(future)
    }

    fn services(&self, config: &TypegenConfig) -> Result<Services, TypegenError> {
        let configs = config.schema_configs(&self.root)?;
        let schemas: Arc<dyn SchemaLoader> = Arc::new(DefaultSchemaLoader::new(&self.root));
        let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter::new());
        let pipeline = GenerationPipeline::new(
            Arc::new(FsDocumentLoader::new(&self.root)),
            Arc::new(TypeScriptGenerator::new()),
            Arc::clone(&reporter),
        );
        let regenerator = Arc::new(Regenerator::new(
            pipeline,
            Arc::clone(&schemas),
            configs,
        ));
        Ok(Services {
            schemas,
            regenerator,
            reporter,
        })
    }

    async fn host_schema(
        &self,
        config: &TypegenConfig,
        schemas: &dyn SchemaLoader,
    ) -> Result<SchemaSnapshot, TypegenError> {
        let snapshot = schemas.load(&config.schema).await?;
        debug!(schema = snapshot.source(), "Host schema loaded");
        Ok(snapshot)
    }

    async fn generate(&self) -> Result<String, TypegenError> {
        if !self.config.codegen {
            return Ok("Code generation is disabled (codegen = false).".to_string());
        }

        let started = Instant::now();
        let services = self.services(&self.config)?;
        let host = self.host_schema(&self.config, services.schemas.as_ref()).await?;
        let scheduler = RegenerationScheduler::new(
            services.regenerator.clone(),
            Arc::clone(&services.reporter),
            self.config.delay(),
            FailurePolicy::Fail,
        );
        let updated = scheduler.run_once(host).await?;

        info!(
            artifacts = updated.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation complete"
        );
        let lines: Vec<String> = services
            .regenerator
            .configs()
            .iter()
            .filter(|config| updated.contains(&config.key))
            .map(|config| format!("  {} -> {}", config.key, config.output_path.display()))
            .collect();
        Ok(format!(
            "Generated {} artifact(s):\n{}",
            lines.len(),
            lines.join("\n")
        ))
    }

    async fn watch(&self, config: &TypegenConfig) -> Result<String, TypegenError> {
        if !config.codegen {
            return Ok("Code generation is disabled (codegen = false).".to_string());
        }

        let services = self.services(config)?;
        let host = self.host_schema(config, services.schemas.as_ref()).await?;
        let store = StateStore::new(host);
        let watcher = SourceWatcher::new(
            &self.root,
            store.clone(),
            Arc::clone(&services.schemas),
            Arc::clone(&services.regenerator),
            config.schema.clone(),
        )?;

        let watcher_store = store.clone();
        let watcher_task = tokio::spawn(async move {
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            };
            let result = watcher.run(shutdown).await;
            if result.is_err() {
                watcher_store.close();
            }
            result
        });

        let scheduler = RegenerationScheduler::new(
            services.regenerator.clone(),
            Arc::clone(&services.reporter),
            config.delay(),
            config.failure_policy(),
        );
        let outcome = scheduler.run(&store).await;

        if outcome.is_err() {
            watcher_task.abort();
            outcome?;
        }
        match watcher_task.await {
            Ok(result) => result?,
            Err(e) if e.is_cancelled() => {}
            Err(e) => return Err(TypegenError::Fatal(format!("watcher task failed: {}", e))),
        }
        Ok("Watch stopped.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("schema.graphql"),
            "type Query { site: Site }\ntype Site { title: String }\n",
        )
        .unwrap();
        fs::create_dir_all(temp_dir.path().join("src/pages")).unwrap();
        fs::write(
            temp_dir.path().join("src/pages/index.tsx"),
            "export const query = graphql`\n  query Home { site { title } }\n`;\n",
        )
        .unwrap();
        temp_dir
    }

    fn context(root: &Path, config: TypegenConfig) -> RunContext {
        RunContext::with_config(root.to_path_buf(), config)
    }

    #[test]
    fn test_generate_writes_default_artifact() {
        let temp_dir = project();
        let mut config = TypegenConfig::default();
        config.document_paths = vec!["./src/**/*.{ts,tsx}".to_string()];
        let ctx = context(temp_dir.path(), config);

        let output = ctx.execute(&Commands::Generate).unwrap();
        assert!(output.contains("Generated 1 artifact(s)"));
        assert!(output.contains("default-gatsby-schema"));

        let generated = fs::read_to_string(temp_dir.path().join("graphql-types.ts")).unwrap();
        assert!(generated.contains("HomeQuery"));
    }

    #[test]
    fn test_generate_disabled() {
        let temp_dir = project();
        let mut config = TypegenConfig::default();
        config.codegen = false;
        let ctx = context(temp_dir.path(), config);

        let output = ctx.execute(&Commands::Generate).unwrap();
        assert!(output.contains("disabled"));
        assert!(!temp_dir.path().join("graphql-types.ts").exists());
    }

    #[test]
    fn test_generate_skips_unmatched_pattern() {
        let temp_dir = project();
        let mut config = TypegenConfig::default();
        config.document_paths = vec!["./missing/**/*.tsx".to_string()];
        let ctx = context(temp_dir.path(), config);

        ctx.execute(&Commands::Generate).unwrap();
        let generated = fs::read_to_string(temp_dir.path().join("graphql-types.ts")).unwrap();
        assert!(generated.contains("export type Site"));
        assert!(!generated.contains("HomeQuery"));
    }

    #[test]
    fn test_generate_fails_without_schema() {
        let temp_dir = project();
        fs::remove_file(temp_dir.path().join("schema.graphql")).unwrap();
        let ctx = context(temp_dir.path(), TypegenConfig::default());

        assert!(matches!(
            ctx.execute(&Commands::Generate),
            Err(TypegenError::SchemaLoad { .. })
        ));
    }

    #[test]
    fn test_config_command_renders_toml() {
        let temp_dir = project();
        let ctx = context(temp_dir.path(), TypegenConfig::default());
        let output = ctx.execute(&Commands::Config).unwrap();
        assert!(output.contains("file_name = \"graphql-types.ts\""));
        assert!(output.contains("codegen_delay = 200"));
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(matches!(
            RunContext::new(missing, None),
            Err(TypegenError::Config(_))
        ));
    }
}
