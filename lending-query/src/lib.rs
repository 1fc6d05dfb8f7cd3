//! Lending protocol metrics over Messari subgraphs.
//!
//! - [`registry`] resolves a (protocol, chain) pair into the subgraph serving it.
//! - [`materializer`] flattens the deployment registry into a consolidated snapshot.
//! - [`subgraph_client`] sends GraphQL queries to the hosted service or the gateway.
//! - [`normalizer`] reshapes query results into flat records.
//! - [`service`] ties the client and the normalizer to a resolved subgraph.
//! - [`prompt`] asks a completion endpoint to write lending metrics queries.

pub mod completion_client;
pub mod config;
pub mod errors;
pub mod materializer;
pub mod normalizer;
pub mod prompt;
pub mod registry;
pub mod service;
pub mod subgraph_client;
