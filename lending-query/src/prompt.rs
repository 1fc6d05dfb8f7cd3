//! Lending metrics query synthesis.
//!
//! Asks a completion endpoint to write a GraphQL query against the lending subgraph schema.

use indoc::indoc;

use crate::{completion_client, errors::CompletionError};

/// The lending protocol subgraph schema, given to the model as context.
pub const LENDING_SCHEMA: &str = include_str!("prompt/lending_schema.graphql");

/// Metrics the generated query must cover.
pub const LENDING_METRICS: &[&str] = &[
    "APY",
    "TVL",
    "APR",
    "Volume",
    "Transactions # count",
    "# of unique depositors",
    "sum of deposit amounts",
    "# of unique borrowers",
    "# of deposits",
    "# of borrows",
    "Sum of borrow amounts",
];

const PREAMBLE: &str = indoc! {"
    You are an AI that helps write GraphQL queries on the Graph Protocol.
    In the coming prompts I'll feed you questions that you need to turn into graphQL queries that work.
    Note that it's important that if you don't have some specific data (like dates or IDs), just add placeholders.
    Show only code and do not use sentences.

    Write the GraphQL for the lending subgraph to pull data for the past day for following fields:
"};

/// Builds the full prompt: instructions, metrics list, then the schema document.
pub fn build_prompt(schema: &str) -> String {
    format!(
        "{PREAMBLE}\n{}\n\nThe schema is defined as:\n{schema}",
        LENDING_METRICS.join("\n")
    )
}

/// The prompt for the embedded lending schema.
pub fn lending_metrics_prompt() -> String {
    build_prompt(LENDING_SCHEMA)
}

/// Asks the completion endpoint for a lending metrics query and returns its text.
pub async fn synthesize_query(client: &completion_client::Client) -> Result<String, CompletionError> {
    let prompt = lending_metrics_prompt();
    tracing::debug!(prompt_len = prompt.len(), "requesting query synthesis");
    client.complete(&prompt).await
}
