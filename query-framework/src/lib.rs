//! Shared plumbing for the subgraph query tools: configuration helpers and logging setup.

pub mod config;
pub mod logging;
