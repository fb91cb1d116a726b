//! Integration tests for graphql-typegen

mod cli_generate;
mod glob_properties;
mod multi_schema;
mod regeneration_flow;
mod test_utils;
