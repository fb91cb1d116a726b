//! graphql-typegen: TypeScript definitions for GraphQL documents
//!
//! Extracts GraphQL documents from project sources, generates TypeScript types
//! for them against one or more schemas, and regenerates the artifacts after
//! bursts of change have settled.

pub mod cli;
pub mod codegen;
pub mod config;
pub mod documents;
pub mod error;
pub mod event;
pub mod logging;
pub mod pipeline;
pub mod reporter;
pub mod scheduler;
pub mod schema;
pub mod watch;
