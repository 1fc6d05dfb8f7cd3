//! Subgraph deployment registries.
//!
//! A registry answers one question: which subgraph instance serves a given (protocol, chain)
//! pair, and through which service it is reached. Two registries implement
//! [`SubgraphResolver`]:
//!
//! - [`DeploymentRegistry`], loaded from the deployment document maintained alongside the
//!   subgraphs.
//! - [`ConsolidatedRegistry`], the flattened snapshot produced by the
//!   [materializer](crate::materializer).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use self::consolidated::ConsolidatedRegistry;
pub use self::deployment::DeploymentRegistry;
use crate::{
    config::Config,
    errors::{RegistryError, ResolveError},
};

pub mod consolidated;
pub mod deployment;

/// The network path used to reach a subgraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceType {
    /// Addressed by slug under the hosted-service namespace.
    #[serde(rename = "hosted-service")]
    HostedService,
    /// Addressed by deployment ID through the API-key-bearing gateway.
    #[serde(rename = "decentralized-network")]
    DecentralizedNetwork,
}

impl ServiceType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HostedService => "hosted-service",
            Self::DecentralizedNetwork => "decentralized-network",
        }
    }

    /// The alternative service type.
    pub const fn fallback(&self) -> Self {
        match self {
            Self::HostedService => Self::DecentralizedNetwork,
            Self::DecentralizedNetwork => Self::HostedService,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown service type: {0}")]
pub struct UnknownServiceType(String);

impl FromStr for ServiceType {
    type Err = UnknownServiceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hosted-service" => Ok(Self::HostedService),
            "decentralized-network" => Ok(Self::DecentralizedNetwork),
            other => Err(UnknownServiceType(other.to_string())),
        }
    }
}

/// Schema, subgraph and methodology versions of a deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgraph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodology: Option<String>,
}

/// Where a resolved subgraph lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphTarget {
    pub service_type: ServiceType,
    /// Hosted-service slug or decentralized-network deployment ID.
    pub query_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Versions>,
}

/// A resolved (protocol, chain) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphReference {
    pub protocol: String,
    pub chain: String,
    #[serde(flatten)]
    pub target: SubgraphTarget,
}

impl SubgraphReference {
    pub fn service_type(&self) -> ServiceType {
        self.target.service_type
    }

    pub fn query_id(&self) -> &str {
        &self.target.query_id
    }
}

/// Resolves a (protocol, chain) pair into the subgraph serving it.
pub trait SubgraphResolver {
    fn resolve(&self, protocol: &str, chain: &str) -> Result<SubgraphReference, ResolveError>;
}

/// Loads the configured deployment registry with the configured preferred service.
pub fn load_deployment_registry(config: &Config) -> Result<DeploymentRegistry, RegistryError> {
    let registry = DeploymentRegistry::from_file(&config.deployment_registry)?;
    Ok(registry.with_preferred_service(config.preferred_service))
}

/// Resolves from the consolidated snapshot when present, the deployment registry otherwise.
///
/// A snapshot that exists but fails to load is an error, not a reason to fall back.
pub fn load_resolver(config: &Config) -> Result<Box<dyn SubgraphResolver>, RegistryError> {
    if config.consolidated_registry.exists() {
        tracing::debug!(path = %config.consolidated_registry.display(), "using consolidated registry");
        let registry = ConsolidatedRegistry::from_file(&config.consolidated_registry)?;
        return Ok(Box::new(registry));
    }
    tracing::debug!(path = %config.deployment_registry.display(), "using deployment registry");
    Ok(Box::new(load_deployment_registry(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_wire_names() {
        //* Given
        let json = r#"["hosted-service", "decentralized-network"]"#;

        //* When
        let parsed: Vec<ServiceType> = serde_json::from_str(json).expect("invalid service types");

        //* Then
        assert_eq!(
            parsed,
            [ServiceType::HostedService, ServiceType::DecentralizedNetwork]
        );
        assert_eq!(
            "decentralized-network".parse::<ServiceType>().ok(),
            Some(ServiceType::DecentralizedNetwork)
        );
        assert!("cronos-portal".parse::<ServiceType>().is_err());
        assert_eq!(ServiceType::HostedService.to_string(), "hosted-service");
    }

    #[test]
    fn reference_serializes_flat() {
        //* Given
        let reference = SubgraphReference {
            protocol: "aave-v2".to_string(),
            chain: "ethereum".to_string(),
            target: SubgraphTarget {
                service_type: ServiceType::DecentralizedNetwork,
                query_id: "Qm123".to_string(),
                slug: None,
                status: None,
                versions: None,
            },
        };

        //* When
        let json = serde_json::to_value(&reference).expect("serialization failed");

        //* Then
        assert_eq!(
            json,
            serde_json::json!({
                "protocol": "aave-v2",
                "chain": "ethereum",
                "service_type": "decentralized-network",
                "query_id": "Qm123",
            })
        );
    }
}
