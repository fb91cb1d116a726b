//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::TypegenError;
use crate::reporter::REPORT_PREFIX;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &TypegenError) -> String {
    match e {
        TypegenError::Config(_) => format!(
            "{} {}\nRun `graphql-typegen config` to inspect the effective configuration.",
            REPORT_PREFIX, e
        ),
        _ => format!("{} {}", REPORT_PREFIX, e),
    }
}
