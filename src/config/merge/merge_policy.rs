//! Merge rules: defaults, override order, conflict handling.

use crate::config::{
    default_codegen_delay, default_document_paths, default_fail_on_error, default_file_name,
    default_schema_pointer,
};
use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones key by key; arrays and scalars are
/// replaced wholesale, tables merge.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("file_name", default_file_name())?
        .set_default("document_paths", default_document_paths())?
        .set_default("codegen", true)?
        .set_default("codegen_delay", default_codegen_delay())?
        .set_default("fail_on_error", default_fail_on_error())?
        .set_default("schema", default_schema_pointer())
}
