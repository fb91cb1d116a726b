//! CLI domain: parse, route and output only.
//! Orchestration lives in the library modules; `RunContext` wires them together.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use route::RunContext;
