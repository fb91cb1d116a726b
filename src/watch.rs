//! Watch Mode
//!
//! Bridges filesystem events into the [`StateStore`]: a change to a file matched
//! by a document pattern dispatches `QUERY_EXTRACTED`; a change to the host schema
//! file reloads the schema, swaps it into the store and dispatches as well. A
//! change to a file-based additional schema drops its cached copy before
//! dispatching. Generated artifacts are ignored so writing them never
//! re-triggers a run.

use crate::config::{normalize, SchemaSource};
use crate::documents::{GlobPattern, WatchRoot};
use crate::error::TypegenError;
use crate::event::{ActionKind, StateStore};
use crate::pipeline::Regenerator;
use crate::schema::{LocatorKind, SchemaLoader, SchemaLocator};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, trace, warn};

/// What a changed path means for regeneration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Document,
    Schema,
    /// Keys of the additional schemas loaded from the changed file
    AdditionalSchema(Vec<String>),
}

pub struct SourceWatcher {
    root: PathBuf,
    store: StateStore,
    schemas: Arc<dyn SchemaLoader>,
    regenerator: Arc<Regenerator>,
    host_schema: SchemaLocator,
    host_schema_path: Option<PathBuf>,
    additional_schema_paths: BTreeMap<PathBuf, Vec<String>>,
    outputs: HashSet<PathBuf>,
    document_globs: Vec<GlobPattern>,
}

impl SourceWatcher {
    pub fn new(
        root: impl Into<PathBuf>,
        store: StateStore,
        schemas: Arc<dyn SchemaLoader>,
        regenerator: Arc<Regenerator>,
        host_schema: SchemaLocator,
    ) -> Result<Self, TypegenError> {
        let root = root.into();
        let host_schema_path = schema_file(&host_schema, &root)?;

        let mut outputs = HashSet::new();
        let mut patterns = Vec::new();
        let mut additional_schema_paths: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for config in regenerator.configs() {
            outputs.insert(normalize(&config.output_path));
            if let SchemaSource::Locator(locator) = &config.source {
                if let Some(path) = schema_file(locator, &root)? {
                    additional_schema_paths
                        .entry(path)
                        .or_default()
                        .push(config.key.clone());
                }
            }
            for pattern in &config.document_paths {
                if !patterns.contains(pattern) {
                    patterns.push(pattern.clone());
                }
            }
        }
        let document_globs = patterns
            .iter()
            .map(|pattern| GlobPattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root,
            store,
            schemas,
            regenerator,
            host_schema,
            host_schema_path,
            additional_schema_paths,
            outputs,
            document_globs,
        })
    }

    /// Directories registered with the watcher: document pattern bases and
    /// the parents of schema files, without directories already covered
    pub fn watch_roots(&self) -> Vec<WatchRoot> {
        let mut roots: Vec<WatchRoot> = self
            .document_globs
            .iter()
            .flat_map(|glob| glob.watch_roots(&self.root))
            .map(|root| WatchRoot {
                path: normalize(&root.path),
                recursive: root.recursive,
            })
            .collect();
        let schema_files = self
            .host_schema_path
            .iter()
            .chain(self.additional_schema_paths.keys());
        for file in schema_files {
            if let Some(parent) = file.parent().filter(|parent| parent.is_dir()) {
                roots.push(WatchRoot {
                    path: parent.to_path_buf(),
                    recursive: false,
                });
            }
        }

        // Ancestors sort first; recursive before non-recursive on equal paths
        roots.sort_by(|a, b| a.path.cmp(&b.path).then(b.recursive.cmp(&a.recursive)));
        let mut planned: Vec<WatchRoot> = Vec::new();
        for root in roots {
            let covered = planned
                .iter()
                .any(|p| p.path == root.path || (p.recursive && root.path.starts_with(&p.path)));
            if !covered {
                planned.push(root);
            }
        }
        planned
    }

    /// Classify an absolute path reported by the watcher
    pub fn classify(&self, path: &Path) -> Option<ChangeKind> {
        let path = normalize(path);
        if self.is_output(&path) {
            return None;
        }
        if self.host_schema_path.as_deref() == Some(path.as_path()) {
            return Some(ChangeKind::Schema);
        }
        if let Some(keys) = self.additional_schema_paths.get(&path) {
            return Some(ChangeKind::AdditionalSchema(keys.clone()));
        }
        if self
            .document_globs
            .iter()
            .any(|glob| glob.matches_path(&self.root, &path))
        {
            return Some(ChangeKind::Document);
        }
        None
    }

    fn is_output(&self, path: &Path) -> bool {
        if self.outputs.contains(path) {
            return true;
        }
        // Temporary sibling used while an artifact is written
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix('.'))
            .and_then(|name| name.strip_suffix(".tmp"))
            .map(|target| self.outputs.contains(&path.with_file_name(target)))
            .unwrap_or(false)
    }

    /// Watch the project root until `shutdown` resolves or the watcher stops,
    /// then close the store so subscribers observe end of stream.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), TypegenError> {
        let (tx, mut rx) = unbounded_channel::<PathBuf>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove() {
                        for path in event.paths {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Watch error"),
            },
            NotifyConfig::default(),
        )
        .map_err(|e| TypegenError::Config(format!("Failed to create watcher: {}", e)))?;

        let roots = self.watch_roots();
        for root in &roots {
            let mode = if root.recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(&root.path, mode).map_err(|e| {
                TypegenError::Config(format!(
                    "Failed to watch {}: {}",
                    root.path.display(),
                    e
                ))
            })?;
            debug!(path = %root.path.display(), recursive = root.recursive, "Watching directory");
        }
        info!(root = %self.root.display(), directories = roots.len(), "Watching project");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Watch shutdown requested");
                    break;
                }
                path = rx.recv() => match path {
                    Some(path) => self.handle(&path).await,
                    None => {
                        warn!("Watcher channel disconnected");
                        break;
                    }
                },
            }
        }

        drop(watcher);
        self.store.close();
        Ok(())
    }

    /// React to one changed path
    pub async fn handle(&self, path: &Path) {
        match self.classify(path) {
            Some(ChangeKind::Document) => {
                trace!(path = %path.display(), "Document source changed");
                self.store.dispatch(ActionKind::QueryExtracted);
            }
            Some(ChangeKind::Schema) => match self.schemas.load(&self.host_schema).await {
                Ok(snapshot) => {
                    debug!(path = %path.display(), "Host schema reloaded");
                    self.store.replace_schema(snapshot);
                    self.store.dispatch(ActionKind::QueryExtracted);
                }
                Err(err) => warn!(path = %path.display(), error = %err, "Keeping previous schema"),
            },
            Some(ChangeKind::AdditionalSchema(keys)) => {
                for key in &keys {
                    debug!(key = %key, path = %path.display(), "Additional schema changed");
                    self.regenerator.invalidate(key);
                }
                self.store.dispatch(ActionKind::QueryExtracted);
            }
            None => trace!(path = %path.display(), "Ignoring change"),
        }
    }
}

/// Normalized path of a file-based locator
fn schema_file(locator: &SchemaLocator, root: &Path) -> Result<Option<PathBuf>, TypegenError> {
    Ok(match locator.resolve(root)? {
        LocatorKind::SdlFile(path) | LocatorKind::IntrospectionFile(path) => Some(normalize(&path)),
        LocatorKind::Remote { .. } | LocatorKind::Inline(_) => None,
    })
}
