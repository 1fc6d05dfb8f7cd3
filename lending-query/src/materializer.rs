//! Builds the consolidated registry snapshot.
//!
//! Every protocol of the deployment registry is tried against every chain of the allow-list.
//! Pairs that fail to resolve are left out of the snapshot and reported in the
//! [`MaterializeReport`].

use std::path::Path;

use crate::{
    errors::{RegistryError, ResolveError},
    registry::{ConsolidatedRegistry, DeploymentRegistry, SubgraphResolver as _},
};

/// A (protocol, chain) pair left out of the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedPair {
    pub protocol: String,
    pub chain: String,
    pub reason: ResolveError,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Number of pairs written to the snapshot.
    pub resolved: usize,
    pub skipped: Vec<SkippedPair>,
}

/// Resolves the protocols × chains cross product.
pub fn materialize(
    registry: &DeploymentRegistry,
    chains: &[String],
) -> (ConsolidatedRegistry, MaterializeReport) {
    let mut consolidated = ConsolidatedRegistry::default();
    let mut skipped = Vec::new();

    for protocol in registry.protocols() {
        for chain in chains {
            match registry.resolve(protocol, chain) {
                Ok(reference) => consolidated.insert(reference),
                Err(reason) => {
                    tracing::debug!(%protocol, %chain, %reason, "pair skipped");
                    skipped.push(SkippedPair {
                        protocol: protocol.to_string(),
                        chain: chain.clone(),
                        reason,
                    });
                }
            }
        }
    }

    let report = MaterializeReport {
        resolved: consolidated.len(),
        skipped,
    };
    tracing::info!(
        protocols = registry.len(),
        chains = chains.len(),
        resolved = report.resolved,
        skipped = report.skipped.len(),
        "registry materialized"
    );
    (consolidated, report)
}

/// Resolves the cross product and writes the snapshot to `path`.
pub fn materialize_to_file(
    registry: &DeploymentRegistry,
    chains: &[String],
    path: impl AsRef<Path>,
) -> Result<MaterializeReport, RegistryError> {
    let (consolidated, report) = materialize(registry, chains);
    consolidated.write_to(path)?;
    Ok(report)
}
