//! The consolidated registry snapshot.
//!
//! One entry per resolved (protocol, chain) pair, serialized as:
//!
//! ```json
//! {
//!   "aave-v2": {
//!     "ethereum": { "service_type": "decentralized-network", "query_id": "Qm..." }
//!   }
//! }
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use super::{SubgraphReference, SubgraphResolver, SubgraphTarget};
use crate::errors::{RegistryError, ResolveError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsolidatedRegistry(BTreeMap<String, BTreeMap<String, SubgraphTarget>>);

impl ConsolidatedRegistry {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Adds a resolved pair, replacing any previous entry for the same pair.
    pub fn insert(&mut self, reference: SubgraphReference) {
        self.0
            .entry(reference.protocol)
            .or_default()
            .insert(reference.chain, reference.target);
    }

    /// Number of (protocol, chain) entries.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, ordered by protocol then chain.
    pub fn references(&self) -> impl Iterator<Item = SubgraphReference> + '_ {
        self.0.iter().flat_map(|(protocol, chains)| {
            chains.iter().map(|(chain, target)| SubgraphReference {
                protocol: protocol.clone(),
                chain: chain.clone(),
                target: target.clone(),
            })
        })
    }

    /// Pretty JSON with a 2-space indent and a trailing newline.
    ///
    /// Map ordering is lexicographic, so the same registry always renders to the same bytes.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Writes the snapshot, overwriting any previous file and creating missing parent
    /// directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let path = path.as_ref();
        let write_err = |source| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        };
        let json = self.to_json_string()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, json).map_err(write_err)
    }
}

impl SubgraphResolver for ConsolidatedRegistry {
    fn resolve(&self, protocol: &str, chain: &str) -> Result<SubgraphReference, ResolveError> {
        let chains = self
            .0
            .get(protocol)
            .ok_or_else(|| ResolveError::UnknownProtocol(protocol.to_string()))?;
        let target = chains
            .get(chain)
            .ok_or_else(|| ResolveError::UnsupportedChain {
                protocol: protocol.to_string(),
                chain: chain.to_string(),
            })?;
        Ok(SubgraphReference {
            protocol: protocol.to_string(),
            chain: chain.to_string(),
            target: target.clone(),
        })
    }
}
