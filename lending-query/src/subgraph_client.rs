//! Indexing API client.
//!
//! Sends a GraphQL query to a subgraph, reached either through the hosted service or through
//! the API-key-bearing gateway, and extracts the top-level result field.

use query_framework::config::Hidden;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::{errors::QueryError, registry::ServiceType};

/// Base URLs of the indexing API.
#[derive(Clone, Debug)]
pub struct Endpoints {
    /// Queried as `{hosted_url}{hosted_namespace}/{query_id}`.
    pub hosted_url: Url,
    pub hosted_namespace: String,
    /// Queried as `{gateway_url}{api_key}/subgraphs/id/{query_id}`.
    pub gateway_url: Url,
    pub api_key: Option<Hidden<String>>,
}

/// A client for querying subgraphs.
pub struct Client {
    http_client: reqwest::Client,
    endpoints: Endpoints,
}

impl Client {
    pub fn new(http_client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self {
            http_client,
            endpoints,
        }
    }

    /// Builds the URL for the subgraph identified by `query_id`.
    pub fn query_url(&self, service_type: ServiceType, query_id: &str) -> Result<Url, QueryError> {
        let url = match service_type {
            ServiceType::HostedService => {
                // An empty segment would make the join absolute and drop the base path.
                let path = match self.endpoints.hosted_namespace.trim_matches('/') {
                    "" => query_id.to_string(),
                    namespace => format!("{namespace}/{query_id}"),
                };
                with_trailing_slash(&self.endpoints.hosted_url).join(&path)?
            }
            ServiceType::DecentralizedNetwork => {
                let api_key = self
                    .endpoints
                    .api_key
                    .as_ref()
                    .ok_or(QueryError::MissingApiKey)?;
                with_trailing_slash(&self.endpoints.gateway_url)
                    .join(&format!("{}/subgraphs/id/{query_id}", api_key.as_str()))?
            }
        };
        Ok(url)
    }

    /// Sends `query` and returns every top-level field of the response `data`, in response
    /// order.
    pub async fn query_fields(
        &self,
        service_type: ServiceType,
        query_id: &str,
        query: &str,
    ) -> Result<Map<String, Value>, QueryError> {
        let url = self.query_url(service_type, query_id)?;
        let response = self
            .http_client
            .post(url)
            .json(&json!({ "query": query }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status));
        }
        let payload = response.text().await?;
        parse_response(&payload)
    }

    /// Sends `query` and returns the value of its first top-level field.
    ///
    /// Queries are expected to select a single top-level field. Any further field is dropped
    /// with a warning; use [`Client::query_fields`] to get all of them.
    pub async fn query(
        &self,
        service_type: ServiceType,
        query_id: &str,
        query: &str,
    ) -> Result<Value, QueryError> {
        let fields = self.query_fields(service_type, query_id, query).await?;
        first_field(fields)
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    url
}

#[derive(Deserialize)]
struct Response {
    data: Option<Map<String, Value>>,
    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Deserialize)]
struct ResponseError {
    message: String,
}

fn parse_response(payload: &str) -> Result<Map<String, Value>, QueryError> {
    let response = serde_json::from_str::<Response>(payload).inspect_err(|_| {
        tracing::warn!(%payload, "undecodable indexing response");
    })?;
    let errors = response
        .errors
        .into_iter()
        .map(|err| err.message)
        .collect::<Vec<_>>();
    match response.data {
        None => {
            tracing::warn!(%payload, "indexing response without data");
            Err(QueryError::UnexpectedSchema { errors })
        }
        Some(data) => {
            if !errors.is_empty() {
                tracing::warn!(errors = %errors.join(", "), "partial indexing response");
            }
            Ok(data)
        }
    }
}

fn first_field(fields: Map<String, Value>) -> Result<Value, QueryError> {
    let mut fields = fields.into_iter();
    let (name, value) = fields.next().ok_or(QueryError::EmptyResult)?;
    let ignored = fields.map(|(name, _)| name).collect::<Vec<_>>();
    if !ignored.is_empty() {
        tracing::warn!(field = %name, ignored = ?ignored, "multiple top-level fields in response");
    }
    Ok(value)
}
