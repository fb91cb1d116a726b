//! Generation pipeline
//!
//! [`GenerationPipeline`] produces one artifact for one [`SchemaConfig`]:
//! documents are loaded per search pattern, the schema is round-tripped through
//! SDL, the generator runs and the output replaces the previous artifact
//! atomically. [`Regenerator`] fans a run out over every configuration.

use crate::codegen::{CodeGenerator, GenerationInput};
use crate::config::{SchemaConfig, SchemaSource};
use crate::documents::{DocumentLoader, SourceDocument};
use crate::error::TypegenError;
use crate::reporter::Reporter;
use crate::scheduler::{ArtifactFailure, RunReport, RunTarget};
use crate::schema::{SchemaLoader, SchemaLocator, SchemaSnapshot};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A written artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub key: String,
    pub path: PathBuf,
    pub documents: usize,
    pub bytes: usize,
}

pub struct GenerationPipeline {
    documents: Arc<dyn DocumentLoader>,
    generator: Arc<dyn CodeGenerator>,
    reporter: Arc<dyn Reporter>,
}

impl GenerationPipeline {
    pub fn new(
        documents: Arc<dyn DocumentLoader>,
        generator: Arc<dyn CodeGenerator>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            documents,
            generator,
            reporter,
        }
    }

    /// Generate and write the artifact for `config` against `schema`
    pub async fn generate(
        &self,
        config: &SchemaConfig,
        schema: &SchemaSnapshot,
    ) -> Result<GeneratedArtifact, TypegenError> {
        let started = Instant::now();

        if let Some(parent) = config.output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| TypegenError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let documents = self.load_documents(config).await;

        // The generator gets its own parse of the printed schema
        let schema = SchemaSnapshot::from_sdl(schema.source(), &schema.print())?;

        let output = self.generator.generate(&GenerationInput {
            filename: &config.output_path,
            schema: schema.document(),
            documents: &documents,
            plugins: &config.plugins,
        })?;

        write_atomic(&config.output_path, &output).await?;

        debug!(
            key = %config.key,
            path = %config.output_path.display(),
            documents = documents.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Artifact written"
        );

        Ok(GeneratedArtifact {
            key: config.key.clone(),
            path: config.output_path.clone(),
            documents: documents.len(),
            bytes: output.len(),
        })
    }

    /// Load every pattern concurrently; failing patterns are reported and skipped
    async fn load_documents(&self, config: &SchemaConfig) -> Vec<SourceDocument> {
        let loads = config
            .document_paths
            .iter()
            .map(|pattern| self.documents.load(pattern, &config.pluck_config));
        let results = join_all(loads).await;

        let mut documents = Vec::new();
        for (pattern, result) in config.document_paths.iter().zip(results) {
            match result {
                Ok(mut loaded) => documents.append(&mut loaded),
                Err(err) => {
                    warn!(key = %config.key, pattern = %pattern, error = %err, "Excluding document pattern");
                    self.reporter.warn(&format!("[{}] {}", config.key, err));
                }
            }
        }
        documents
    }
}

/// Write through a sibling temporary file renamed over the target
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), TypegenError> {
    let write_error = |source: std::io::Error| TypegenError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            write_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "output path has no file name",
            ))
        })?;
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    tokio::fs::write(&temp_path, contents)
        .await
        .map_err(write_error)?;
    if let Err(source) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(write_error(source));
    }
    Ok(())
}

/// Runs the pipeline for every configuration on each trigger
pub struct Regenerator {
    pipeline: GenerationPipeline,
    schemas: Arc<dyn SchemaLoader>,
    configs: Vec<SchemaConfig>,
    loaded: Mutex<HashMap<String, SchemaSnapshot>>,
}

impl Regenerator {
    pub fn new(
        pipeline: GenerationPipeline,
        schemas: Arc<dyn SchemaLoader>,
        configs: Vec<SchemaConfig>,
    ) -> Self {
        Self {
            pipeline,
            schemas,
            configs,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn configs(&self) -> &[SchemaConfig] {
        &self.configs
    }

    /// Forget a cached additional schema so the next run reloads it
    pub fn invalidate(&self, key: &str) {
        self.loaded.lock().remove(key);
    }

    async fn generate_one(
        &self,
        config: &SchemaConfig,
        host: &SchemaSnapshot,
    ) -> Result<GeneratedArtifact, TypegenError> {
        let schema = match &config.source {
            SchemaSource::Host => host.clone(),
            SchemaSource::Locator(locator) => self.additional_schema(&config.key, locator).await?,
        };
        self.pipeline.generate(config, &schema).await
    }

    /// Loaded on first use and cached; a failed load is retried next run
    async fn additional_schema(
        &self,
        key: &str,
        locator: &SchemaLocator,
    ) -> Result<SchemaSnapshot, TypegenError> {
        let cached = self.loaded.lock().get(key).cloned();
        if let Some(snapshot) = cached {
            return Ok(snapshot);
        }

        let snapshot = self.schemas.load(locator).await?;
        info!(key, locator = %locator, "Loaded additional schema");
        self.loaded.lock().insert(key.to_string(), snapshot.clone());
        Ok(snapshot)
    }
}

#[async_trait]
impl RunTarget for Regenerator {
    async fn run(&self, schema: SchemaSnapshot) -> RunReport {
        let started = Instant::now();
        let runs = self
            .configs
            .iter()
            .map(|config| self.generate_one(config, &schema));
        let results = join_all(runs).await;

        let mut report = RunReport::default();
        for (config, result) in self.configs.iter().zip(results) {
            match result {
                Ok(artifact) => report.updated.push(artifact.key),
                Err(error) => report.failures.push(ArtifactFailure {
                    key: config.key.clone(),
                    error,
                }),
            }
        }

        debug!(
            updated = report.updated.len(),
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Regeneration run finished"
        );
        report
    }
}
