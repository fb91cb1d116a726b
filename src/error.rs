//! Error types for the GraphQL type generator.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring, loading, generating or writing artifacts
#[derive(Debug, Error)]
pub enum TypegenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load documents from {pattern}: {message}")]
    DocumentLoad { pattern: String, message: String },

    #[error("Failed to load schema from {locator}: {message}")]
    SchemaLoad { locator: String, message: String },

    #[error("Invalid schema: {0}")]
    SchemaParse(String),

    #[error("Code generation failed: {0}")]
    Generation(String),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Regeneration aborted: {0}")]
    Fatal(String),
}

impl From<config::ConfigError> for TypegenError {
    fn from(err: config::ConfigError) -> Self {
        TypegenError::Config(err.to_string())
    }
}
