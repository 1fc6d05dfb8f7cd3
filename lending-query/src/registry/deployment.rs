//! The deployment registry: which subgraph serves each (protocol, chain) pair.
//!
//! Each protocol in the document takes one of two shapes:
//!
//! ```json
//! {
//!   "aave-v2": { "ethereum": "Qm..." },
//!   "compound-v2": {
//!     "schema": "lending",
//!     "deployments": {
//!       "compound-v2-ethereum": {
//!         "network": "ethereum",
//!         "status": "prod",
//!         "versions": { "schema": "3.0.0", "subgraph": "1.2.0", "methodology": "1.0.0" },
//!         "services": {
//!           "hosted-service": { "slug": "compound-v2-ethereum", "query-id": "compound-v2-ethereum" },
//!           "decentralized-network": { "slug": "compound-v2-ethereum", "query-id": "Qm..." }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! In the compact shape, identifiers starting with `Qm` are decentralized-network deployment
//! IDs and everything else is a hosted-service slug.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fs,
    path::Path,
    str::FromStr,
};

use serde::Deserialize;

use super::{ServiceType, SubgraphReference, SubgraphResolver, SubgraphTarget, Versions};
use crate::errors::{RegistryError, ResolveError};

const DEPLOYMENT_ID_PREFIX: &str = "Qm";

#[derive(Clone, Debug, PartialEq, Eq)]
struct ServiceEndpoint {
    slug: Option<String>,
    query_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ChainDeployment {
    status: Option<String>,
    versions: Option<Versions>,
    hosted_service: Option<ServiceEndpoint>,
    decentralized_network: Option<ServiceEndpoint>,
}

impl ChainDeployment {
    fn from_compact_id(id: String) -> Self {
        let endpoint = |slug| ServiceEndpoint {
            slug,
            query_id: id.clone(),
        };
        if id.starts_with(DEPLOYMENT_ID_PREFIX) {
            Self {
                decentralized_network: Some(endpoint(None)),
                ..Default::default()
            }
        } else {
            Self {
                hosted_service: Some(endpoint(Some(id.clone()))),
                ..Default::default()
            }
        }
    }

    fn service(&self, service_type: ServiceType) -> Option<&ServiceEndpoint> {
        match service_type {
            ServiceType::HostedService => self.hosted_service.as_ref(),
            ServiceType::DecentralizedNetwork => self.decentralized_network.as_ref(),
        }
    }
}

/// The deployment registry document, indexed by protocol then chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentRegistry {
    protocols: BTreeMap<String, BTreeMap<String, ChainDeployment>>,
    preferred_service: ServiceType,
}

impl DeploymentRegistry {
    /// Loads the registry document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Sets the service type picked when a deployment exposes both. Defaults to
    /// [`ServiceType::DecentralizedNetwork`].
    pub fn with_preferred_service(mut self, service_type: ServiceType) -> Self {
        self.preferred_service = service_type;
        self
    }

    /// Protocol names, in lexicographic order.
    pub fn protocols(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

impl FromStr for DeploymentRegistry {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let document: BTreeMap<String, ProtocolEntry> = serde_json::from_str(s)?;
        let protocols = document
            .into_iter()
            .map(|(protocol, entry)| {
                let chains = entry.into_chains(&protocol);
                (protocol, chains)
            })
            .collect();
        Ok(Self {
            protocols,
            preferred_service: ServiceType::DecentralizedNetwork,
        })
    }
}

impl SubgraphResolver for DeploymentRegistry {
    fn resolve(&self, protocol: &str, chain: &str) -> Result<SubgraphReference, ResolveError> {
        let chains = self
            .protocols
            .get(protocol)
            .ok_or_else(|| ResolveError::UnknownProtocol(protocol.to_string()))?;
        let deployment = chains
            .get(chain)
            .ok_or_else(|| ResolveError::UnsupportedChain {
                protocol: protocol.to_string(),
                chain: chain.to_string(),
            })?;

        let preferred = self.preferred_service;
        let (service_type, endpoint) = [preferred, preferred.fallback()]
            .into_iter()
            .find_map(|service_type| Some((service_type, deployment.service(service_type)?)))
            .ok_or_else(|| ResolveError::NoService {
                protocol: protocol.to_string(),
                chain: chain.to_string(),
            })?;

        Ok(SubgraphReference {
            protocol: protocol.to_string(),
            chain: chain.to_string(),
            target: SubgraphTarget {
                service_type,
                query_id: endpoint.query_id.clone(),
                slug: endpoint.slug.clone(),
                status: deployment.status.clone(),
                versions: deployment.versions.clone(),
            },
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProtocolEntry {
    Manifest(ProtocolManifest),
    Compact(BTreeMap<String, String>),
}

impl ProtocolEntry {
    /// Indexes the entry by chain. Among manifest deployments sharing a network, the one keyed
    /// `<protocol>-<network>` wins, then the first in key order.
    fn into_chains(self, protocol: &str) -> BTreeMap<String, ChainDeployment> {
        match self {
            Self::Compact(chains) => chains
                .into_iter()
                .map(|(chain, id)| (chain, ChainDeployment::from_compact_id(id)))
                .collect(),
            Self::Manifest(manifest) => {
                let (canonical, others): (Vec<_>, Vec<_>) = manifest
                    .deployments
                    .into_iter()
                    .partition(|(name, deployment)| {
                        name.strip_prefix(protocol)
                            .and_then(|rest| rest.strip_prefix('-'))
                            == Some(deployment.network.as_str())
                    });
                let mut chains = BTreeMap::new();
                for (name, deployment) in canonical.into_iter().chain(others) {
                    match chains.entry(deployment.network.clone()) {
                        Entry::Vacant(entry) => {
                            entry.insert(deployment.into_chain_deployment());
                        }
                        Entry::Occupied(entry) => {
                            tracing::debug!(
                                deployment = %name,
                                chain = %entry.key(),
                                "duplicate deployment for chain ignored"
                            );
                        }
                    }
                }
                chains
            }
        }
    }
}

#[derive(Deserialize)]
struct ProtocolManifest {
    deployments: BTreeMap<String, DeploymentManifest>,
}

#[derive(Deserialize)]
struct DeploymentManifest {
    network: String,
    status: Option<String>,
    versions: Option<Versions>,
    #[serde(default)]
    services: ServicesManifest,
}

impl DeploymentManifest {
    fn into_chain_deployment(self) -> ChainDeployment {
        let ServicesManifest {
            hosted_service,
            decentralized_network,
        } = self.services;
        ChainDeployment {
            status: self.status,
            versions: self.versions,
            hosted_service: hosted_service.and_then(|s| s.into_endpoint(true)),
            decentralized_network: decentralized_network.and_then(|s| s.into_endpoint(false)),
        }
    }
}

#[derive(Default, Deserialize)]
struct ServicesManifest {
    #[serde(rename = "hosted-service")]
    hosted_service: Option<ServiceManifest>,
    #[serde(rename = "decentralized-network")]
    decentralized_network: Option<ServiceManifest>,
}

#[derive(Deserialize)]
struct ServiceManifest {
    slug: Option<String>,
    #[serde(rename = "query-id")]
    query_id: Option<String>,
}

impl ServiceManifest {
    /// Hosted-service slugs double as query IDs.
    fn into_endpoint(self, slug_is_query_id: bool) -> Option<ServiceEndpoint> {
        let slug = self.slug.filter(|slug| !slug.is_empty());
        let query_id = self
            .query_id
            .filter(|id| !id.is_empty())
            .or_else(|| slug.clone().filter(|_| slug_is_query_id))?;
        Some(ServiceEndpoint { slug, query_id })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use indoc::indoc;

    use super::*;

    const MANIFEST_REGISTRY: &str = indoc! {r#"
        {
          "compound-v2": {
            "schema": "lending",
            "base": "compound-forks",
            "project": "compound",
            "deployments": {
              "compound-v2-ethereum": {
                "network": "ethereum",
                "status": "prod",
                "versions": { "schema": "3.0.0", "subgraph": "1.2.0", "methodology": "1.0.0" },
                "services": {
                  "hosted-service": { "slug": "compound-v2-ethereum", "query-id": "compound-v2-ethereum" },
                  "decentralized-network": { "slug": "compound-v2-ethereum", "query-id": "QmCompound" }
                }
              },
              "compound-v2-polygon": {
                "network": "polygon",
                "status": "dev",
                "services": {
                  "hosted-service": { "slug": "compound-v2-polygon" }
                }
              },
              "compound-v2-bsc": {
                "network": "bsc",
                "services": {}
              }
            }
          }
        }
    "#};

    #[test]
    fn resolve_compact_deployment_id() {
        //* Given
        let registry: DeploymentRegistry = r#"{"aave-v2": {"ethereum": "Qm123"}}"#
            .parse()
            .expect("invalid registry");

        //* When
        let reference = registry.resolve("aave-v2", "ethereum");

        //* Then
        assert_matches!(reference, Ok(reference) => {
            assert_eq!(reference.protocol, "aave-v2");
            assert_eq!(reference.chain, "ethereum");
            assert_eq!(reference.service_type(), ServiceType::DecentralizedNetwork);
            assert_eq!(reference.query_id(), "Qm123");
        });
    }

    #[test]
    fn resolve_compact_slug_as_hosted_service() {
        //* Given
        let registry: DeploymentRegistry = r#"{"aave-v2": {"polygon": "aave-v2-polygon"}}"#
            .parse()
            .expect("invalid registry");

        //* When
        let reference = registry.resolve("aave-v2", "polygon");

        //* Then
        assert_matches!(reference, Ok(reference) => {
            assert_eq!(reference.service_type(), ServiceType::HostedService);
            assert_eq!(reference.query_id(), "aave-v2-polygon");
            assert_eq!(reference.target.slug.as_deref(), Some("aave-v2-polygon"));
        });
    }

    #[test]
    fn resolve_manifest_prefers_configured_service() {
        //* Given
        let registry: DeploymentRegistry = MANIFEST_REGISTRY.parse().expect("invalid registry");

        //* When
        let decentralized = registry.resolve("compound-v2", "ethereum");
        let hosted = registry
            .clone()
            .with_preferred_service(ServiceType::HostedService)
            .resolve("compound-v2", "ethereum");

        //* Then
        assert_matches!(decentralized, Ok(reference) => {
            assert_eq!(reference.service_type(), ServiceType::DecentralizedNetwork);
            assert_eq!(reference.query_id(), "QmCompound");
            assert_eq!(reference.target.status.as_deref(), Some("prod"));
            assert_matches!(reference.target.versions, Some(Versions { schema: Some(schema), .. }) => {
                assert_eq!(schema, "3.0.0");
            });
        });
        assert_matches!(hosted, Ok(reference) => {
            assert_eq!(reference.service_type(), ServiceType::HostedService);
            assert_eq!(reference.query_id(), "compound-v2-ethereum");
        });
    }

    #[test]
    fn resolve_manifest_falls_back_to_available_service() {
        //* Given
        let registry: DeploymentRegistry = MANIFEST_REGISTRY.parse().expect("invalid registry");

        //* When
        let reference = registry.resolve("compound-v2", "polygon");

        //* Then
        // The hosted-service entry has no query-id, so its slug is used.
        assert_matches!(reference, Ok(reference) => {
            assert_eq!(reference.service_type(), ServiceType::HostedService);
            assert_eq!(reference.query_id(), "compound-v2-polygon");
        });
    }

    #[test]
    fn resolve_manifest_prefers_protocol_chain_deployment() {
        //* Given
        // Both deployments run on ethereum; "foo-bar-ethereum" sorts first.
        let registry: DeploymentRegistry = indoc! {r#"
            {
              "foo": {
                "deployments": {
                  "foo-bar-ethereum": {
                    "network": "ethereum",
                    "services": {
                      "hosted-service": { "slug": "foo-bar-ethereum", "query-id": "foo-bar-ethereum" }
                    }
                  },
                  "foo-ethereum": {
                    "network": "ethereum",
                    "services": {
                      "hosted-service": { "slug": "foo-ethereum", "query-id": "foo-ethereum" }
                    }
                  },
                  "foo-polygon-v2": {
                    "network": "polygon",
                    "services": {
                      "hosted-service": { "slug": "foo-polygon-v2", "query-id": "foo-polygon-v2" }
                    }
                  }
                }
              }
            }
        "#}
        .parse()
        .expect("invalid registry");

        //* When
        let ethereum = registry.resolve("foo", "ethereum");
        let polygon = registry.resolve("foo", "polygon");

        //* Then
        assert_matches!(ethereum, Ok(reference) => {
            assert_eq!(reference.query_id(), "foo-ethereum");
        });
        // Without a `foo-polygon` key the network match is used.
        assert_matches!(polygon, Ok(reference) => {
            assert_eq!(reference.query_id(), "foo-polygon-v2");
        });
    }

    #[test]
    fn resolve_failures() {
        //* Given
        let registry: DeploymentRegistry = MANIFEST_REGISTRY.parse().expect("invalid registry");

        //* Then
        assert_eq!(
            registry.resolve("aave-v3", "ethereum"),
            Err(ResolveError::UnknownProtocol("aave-v3".to_string()))
        );
        assert_eq!(
            registry.resolve("compound-v2", "fantom"),
            Err(ResolveError::UnsupportedChain {
                protocol: "compound-v2".to_string(),
                chain: "fantom".to_string(),
            })
        );
        assert_eq!(
            registry.resolve("compound-v2", "bsc"),
            Err(ResolveError::NoService {
                protocol: "compound-v2".to_string(),
                chain: "bsc".to_string(),
            })
        );
    }

    #[test]
    fn invalid_document_is_rejected() {
        //* When
        let result = "[1, 2, 3]".parse::<DeploymentRegistry>();

        //* Then
        assert_matches!(result, Err(RegistryError::Json(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        //* When
        let result = DeploymentRegistry::from_file("/nonexistent/deployment.json");

        //* Then
        assert_matches!(result, Err(RegistryError::Read { path, .. }) => {
            assert!(path.ends_with("deployment.json"));
        });
    }
}
