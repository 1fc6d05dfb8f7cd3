use std::{io, path::PathBuf};

use reqwest::StatusCode;

/// Failures loading or writing a registry document.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("invalid registry document: {0}")]
    Json(#[from] serde_json::Error),
}

/// A (protocol, chain) pair that cannot be addressed.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
    #[error("protocol {protocol} is not deployed on {chain}")]
    UnsupportedChain { protocol: String, chain: String },
    #[error("deployment of {protocol} on {chain} has no query service")]
    NoService { protocol: String, chain: String },
}

/// Indexing API query failures.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("invalid subgraph URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Gateway routing was selected but no API key is configured.
    #[error("gateway routing requires an API key")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status: {0}")]
    Status(StatusCode),
    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    /// The response carries no `data` object.
    #[error("response has no data: [{}]", .errors.join(", "))]
    UnexpectedSchema { errors: Vec<String> },
    /// The `data` object has no fields.
    #[error("response data has no fields")]
    EmptyResult,
}

#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    #[error("empty query result")]
    EmptyResult,
    #[error("result entry {index} is not a record")]
    NotARecord { index: usize },
    #[error("invalid timestamp value: {0}")]
    InvalidTimestamp(serde_json::Value),
    #[error("invalid date-time: {0}")]
    InvalidDateTime(#[from] chrono::ParseError),
}

/// Completion API failures.
#[derive(thiserror::Error, Debug)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status: {0}")]
    Status(StatusCode),
    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("completion response has no choices")]
    NoChoices,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing {key}: set it in the config file or the {env} environment variable")]
    MissingSecret {
        key: &'static str,
        env: &'static str,
    },
}
