//! Lending query tool configuration.

use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use custom_debug::CustomDebug;
use query_framework::config::Hidden;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use url::Url;

use crate::{errors::ConfigError, registry::ServiceType, subgraph_client::Endpoints};

/// Environment variable consulted when `indexing.api_key` is not set.
pub const GATEWAY_API_KEY_ENV: &str = "THEGRAPH_API_KEY";
/// Environment variable consulted when `completion.api_key` is not set.
pub const COMPLETION_API_KEY_ENV: &str = "COMPLETION_API_KEY";

#[derive(CustomDebug, Deserialize)]
pub struct Config {
    /// Format log output as JSON
    #[serde(default)]
    pub log_json: bool,
    /// Deployment registry document
    #[serde(default = "default_deployment_registry")]
    pub deployment_registry: PathBuf,
    /// Consolidated registry snapshot, written by `materialize`
    #[serde(default = "default_consolidated_registry")]
    pub consolidated_registry: PathBuf,
    /// Chains tried for every protocol when materializing
    #[serde(default = "default_chains")]
    pub chains: Vec<String>,
    #[serde(default = "default_protocol")]
    pub default_protocol: String,
    #[serde(default = "default_chain")]
    pub default_chain: String,
    /// Service used when a deployment is reachable through both
    #[serde(default = "default_preferred_service")]
    pub preferred_service: ServiceType,
    /// HTTP request timeout in seconds (default: no timeout)
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Indexing API configuration.
///
/// See [`Config`]'s [`indexing`](struct.Config.html#structfield.indexing).
#[serde_as]
#[derive(CustomDebug, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    #[serde_as(as = "DisplayFromStr")]
    #[debug(with = "Display::fmt")]
    pub hosted_url: Url,
    pub hosted_namespace: String,
    #[serde_as(as = "DisplayFromStr")]
    #[debug(with = "Display::fmt")]
    pub gateway_url: Url,
    /// Gateway API key
    pub api_key: Option<Hidden<String>>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            hosted_url: Url::parse("https://api.thegraph.com/subgraphs/name/")
                .expect("valid default URL"),
            hosted_namespace: "messari".to_string(),
            gateway_url: Url::parse("https://gateway.thegraph.com/api/")
                .expect("valid default URL"),
            api_key: None,
        }
    }
}

/// Completion API configuration.
///
/// See [`Config`]'s [`completion`](struct.Config.html#structfield.completion).
#[serde_as]
#[derive(CustomDebug, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    #[serde_as(as = "DisplayFromStr")]
    #[debug(with = "Display::fmt")]
    pub url: Url,
    /// Bearer token
    pub api_key: Option<Hidden<String>>,
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("https://api.openai.com/v1/engines/davinci-codex/completions")
                .expect("valid default URL"),
            api_key: None,
            max_tokens: 10_000,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Fills unset secrets from the environment, looked up through `lookup`.
    pub fn with_env_secrets(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name| lookup(name).filter(|value| !value.is_empty()).map(Hidden);
        if self.indexing.api_key.is_none() {
            self.indexing.api_key = lookup(GATEWAY_API_KEY_ENV);
        }
        if self.completion.api_key.is_none() {
            self.completion.api_key = lookup(COMPLETION_API_KEY_ENV);
        }
        self
    }

    pub fn gateway_api_key(&self) -> Result<&Hidden<String>, ConfigError> {
        self.indexing
            .api_key
            .as_ref()
            .ok_or(ConfigError::MissingSecret {
                key: "indexing.api_key",
                env: GATEWAY_API_KEY_ENV,
            })
    }

    pub fn completion_api_key(&self) -> Result<&Hidden<String>, ConfigError> {
        self.completion
            .api_key
            .as_ref()
            .ok_or(ConfigError::MissingSecret {
                key: "completion.api_key",
                env: COMPLETION_API_KEY_ENV,
            })
    }

    pub fn indexing_endpoints(&self) -> Endpoints {
        Endpoints {
            hosted_url: self.indexing.hosted_url.clone(),
            hosted_namespace: self.indexing.hosted_namespace.clone(),
            gateway_url: self.indexing.gateway_url.clone(),
            api_key: self.indexing.api_key.clone(),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

fn default_deployment_registry() -> PathBuf {
    PathBuf::from("subgraphs/deployment/deployment.json")
}

fn default_consolidated_registry() -> PathBuf {
    PathBuf::from("subgraphs.json")
}

fn default_chains() -> Vec<String> {
    [
        "arbitrum",
        "aurora",
        "avalanche",
        "boba",
        "bsc",
        "celo",
        "clover",
        "ethereum",
        "fantom",
        "fuse",
        "gnosis",
        "harmony",
        "optimism",
        "polygon",
        "moonbeam",
        "moonriver",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_protocol() -> String {
    "aave-governance".to_string()
}

fn default_chain() -> String {
    "ethereum".to_string()
}

const fn default_preferred_service() -> ServiceType {
    ServiceType::DecentralizedNetwork
}
