//! Schema snapshots and schema loading
//!
//! A [`SchemaSnapshot`] is an immutable, cheaply clonable view of a GraphQL schema.
//! Snapshots come either from the host (the default schema) or from a
//! [`SchemaLoader`] resolving a [`SchemaLocator`] (SDL file, introspection JSON,
//! remote endpoint, inline SDL).

use crate::error::TypegenError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

mod introspection;

pub use introspection::{introspection_to_sdl, INTROSPECTION_QUERY};

/// Parsed schema document as produced by `graphql-parser`
pub type SchemaDocument = graphql_parser::schema::Document<'static, String>;

/// Immutable point-in-time representation of a GraphQL schema
#[derive(Clone)]
pub struct SchemaSnapshot {
    document: Arc<SchemaDocument>,
    source: Arc<str>,
}

impl SchemaSnapshot {
    /// Parse SDL into a snapshot. `source` labels where the schema came from.
    pub fn from_sdl(source: impl Into<String>, sdl: &str) -> Result<Self, TypegenError> {
        let source = source.into();
        let document = graphql_parser::parse_schema::<String>(sdl)
            .map_err(|e| TypegenError::SchemaParse(format!("{}: {}", source, e)))?
            .into_static();
        Ok(Self::from_document(source, document))
    }

    pub fn from_document(source: impl Into<String>, document: SchemaDocument) -> Self {
        Self {
            document: Arc::new(document),
            source: Arc::from(source.into()),
        }
    }

    /// Label of the schema origin (file path, URL, `host`...)
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    /// Canonical SDL text of the schema
    pub fn print(&self) -> String {
        self.document.to_string()
    }
}

impl fmt::Debug for SchemaSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaSnapshot")
            .field("source", &self.source)
            .field("definitions", &self.document.definitions.len())
            .finish()
    }
}

/// Where an additional schema is loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaLocator {
    /// URL, file path or inline SDL
    Pointer(String),
    /// Remote endpoint with request headers
    Endpoint {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

impl fmt::Display for SchemaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaLocator::Pointer(pointer) if looks_like_inline_sdl(pointer) => {
                write!(f, "<inline schema>")
            }
            SchemaLocator::Pointer(pointer) => write!(f, "{}", pointer),
            SchemaLocator::Endpoint { url, .. } => write!(f, "{}", url),
        }
    }
}

/// Resolved form of a locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorKind {
    Remote {
        url: String,
        headers: BTreeMap<String, String>,
    },
    IntrospectionFile(PathBuf),
    SdlFile(PathBuf),
    Inline(String),
}

impl SchemaLocator {
    /// Classify the locator, resolving relative file paths against `root`
    pub fn resolve(&self, root: &Path) -> Result<LocatorKind, TypegenError> {
        match self {
            SchemaLocator::Endpoint { url, headers } => Ok(LocatorKind::Remote {
                url: url.clone(),
                headers: headers.clone(),
            }),
            SchemaLocator::Pointer(pointer) => {
                let trimmed = pointer.trim();
                if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                    return Ok(LocatorKind::Remote {
                        url: trimmed.to_string(),
                        headers: BTreeMap::new(),
                    });
                }
                if looks_like_inline_sdl(trimmed) {
                    return Ok(LocatorKind::Inline(trimmed.to_string()));
                }
                let path = root.join(trimmed.trim_start_matches("./"));
                match path.extension().and_then(|e| e.to_str()) {
                    Some("json") => Ok(LocatorKind::IntrospectionFile(path)),
                    Some("graphql") | Some("gql") | Some("graphqls") => {
                        Ok(LocatorKind::SdlFile(path))
                    }
                    _ => Err(TypegenError::SchemaLoad {
                        locator: pointer.clone(),
                        message: "unsupported schema pointer (expected a URL, .json, .graphql or inline SDL)"
                            .to_string(),
                    }),
                }
            }
        }
    }
}

fn looks_like_inline_sdl(pointer: &str) -> bool {
    pointer.contains('{') || pointer.trim_start().starts_with("type ") || pointer.contains('\n')
}

/// Loads a schema snapshot from a locator
#[async_trait]
pub trait SchemaLoader: Send + Sync {
    async fn load(&self, locator: &SchemaLocator) -> Result<SchemaSnapshot, TypegenError>;
}

/// Loader for files, inline SDL and remote introspection endpoints
pub struct DefaultSchemaLoader {
    root: PathBuf,
    client: reqwest::Client,
}

impl DefaultSchemaLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_remote(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, String> {
        let mut request = self
            .client
            .post(url)
            .json(&json!({ "query": INTROSPECTION_QUERY }));
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let body: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(format!("endpoint returned errors: {}", errors));
        }
        introspection_to_sdl(&body).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl SchemaLoader for DefaultSchemaLoader {
    async fn load(&self, locator: &SchemaLocator) -> Result<SchemaSnapshot, TypegenError> {
        let load_error = |message: String| TypegenError::SchemaLoad {
            locator: locator.to_string(),
            message,
        };

        let (source, sdl) = match locator.resolve(&self.root)? {
            LocatorKind::Remote { url, headers } => {
                debug!(url = %url, "Introspecting remote schema");
                let sdl = self.fetch_remote(&url, &headers).await.map_err(load_error)?;
                (url, sdl)
            }
            LocatorKind::IntrospectionFile(path) => {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| load_error(e.to_string()))?;
                let value: serde_json::Value =
                    serde_json::from_str(&text).map_err(|e| load_error(e.to_string()))?;
                let sdl = introspection_to_sdl(&value).map_err(|e| load_error(e.to_string()))?;
                (path.display().to_string(), sdl)
            }
            LocatorKind::SdlFile(path) => {
                let sdl = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| load_error(e.to_string()))?;
                (path.display().to_string(), sdl)
            }
            LocatorKind::Inline(sdl) => ("inline".to_string(), sdl),
        };

        SchemaSnapshot::from_sdl(source, &sdl).map_err(|e| load_error(e.to_string()))
    }
}
