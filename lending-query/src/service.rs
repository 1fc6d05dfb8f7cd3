use crate::{
    errors::{NormalizeError, QueryError},
    normalizer::{self, Record},
    registry::SubgraphReference,
    subgraph_client,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Queries the subgraph of one (protocol, chain) pair and normalizes the results.
pub struct QueryService {
    client: subgraph_client::Client,
    reference: SubgraphReference,
}

impl QueryService {
    pub fn new(client: subgraph_client::Client, reference: SubgraphReference) -> Self {
        Self { client, reference }
    }

    pub fn reference(&self) -> &SubgraphReference {
        &self.reference
    }

    pub async fn query(&self, gql: &str) -> Result<Vec<Record>, Error> {
        let data = self
            .client
            .query(self.reference.service_type(), self.reference.query_id(), gql)
            .await?;
        tracing::debug!(
            protocol = %self.reference.protocol,
            chain = %self.reference.chain,
            response = %data,
            "indexing response"
        );
        let records = normalizer::normalize(data)?;
        tracing::debug!(records = records.len(), formatted = ?records, "response normalized");
        Ok(records)
    }
}
