//! Document loading
//!
//! Resolves document search paths (globs relative to the project root) into parsed
//! executable GraphQL documents. `.graphql`/`.gql` files are parsed whole; every other
//! matched file is plucked for embedded templates.

use crate::error::TypegenError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod glob;
pub mod pluck;

pub use glob::{GlobPattern, WatchRoot};
pub use pluck::{pluck, PluckConfig, PluckError, PluckModule, PluckedTemplate};

/// Parsed executable document as produced by `graphql-parser`
pub type QueryDocument = graphql_parser::query::Document<'static, String>;

/// One parsed document and where it came from
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub location: PathBuf,
    pub line: usize,
    pub document: QueryDocument,
}

/// Loads the documents matched by one search pattern
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(
        &self,
        pattern: &str,
        pluck_config: &PluckConfig,
    ) -> Result<Vec<SourceDocument>, TypegenError>;
}

/// Filesystem-backed loader rooted at the project directory
pub struct FsDocumentLoader {
    root: PathBuf,
}

impl FsDocumentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentLoader for FsDocumentLoader {
    async fn load(
        &self,
        pattern: &str,
        pluck_config: &PluckConfig,
    ) -> Result<Vec<SourceDocument>, TypegenError> {
        let glob = GlobPattern::new(pattern)?;
        let root = self.root.clone();
        let pluck_config = pluck_config.clone();
        let owned_pattern = pattern.to_string();

        let documents = tokio::task::spawn_blocking(move || {
            load_matching(&root, &glob, &pluck_config)
        })
        .await
        .map_err(|e| TypegenError::DocumentLoad {
            pattern: owned_pattern.clone(),
            message: format!("document loading task failed: {}", e),
        })??;

        if documents.is_empty() {
            return Err(TypegenError::DocumentLoad {
                pattern: owned_pattern,
                message: "no GraphQL documents found".to_string(),
            });
        }

        debug!(pattern, count = documents.len(), "Loaded documents");
        Ok(documents)
    }
}

fn load_matching(
    root: &Path,
    glob: &GlobPattern,
    pluck_config: &PluckConfig,
) -> Result<Vec<SourceDocument>, TypegenError> {
    let load_error = |message: String| TypegenError::DocumentLoad {
        pattern: glob.as_str().to_string(),
        message,
    };

    let mut documents = Vec::new();
    for path in glob.walk(root) {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| load_error(format!("{}: {}", path.display(), e)))?;

        let templates = if is_graphql_file(&path) {
            vec![PluckedTemplate { line: 1, text: content }]
        } else {
            pluck(&content, &path, pluck_config)
                .map_err(|e| load_error(format!("{}:{}", path.display(), e)))?
        };

        for template in templates {
            let document = graphql_parser::parse_query::<String>(&template.text)
                .map_err(|e| load_error(format!("{}:{}: {}", path.display(), template.line, e)))?
                .into_static();
            documents.push(SourceDocument {
                location: path.clone(),
                line: template.line,
                document,
            });
        }
    }
    Ok(documents)
}

fn is_graphql_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("graphql") | Some("gql")
    )
}
