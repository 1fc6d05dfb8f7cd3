//! Text-completion API client.

use query_framework::config::Hidden;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::CompletionError;

pub struct Client {
    http_client: reqwest::Client,
    url: Url,
    /// Sent as the `Authorization: Bearer` token.
    api_key: Hidden<String>,
    max_tokens: u32,
}

impl Client {
    pub fn new(
        http_client: reqwest::Client,
        url: Url,
        api_key: Hidden<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            http_client,
            url,
            api_key,
            max_tokens,
        }
    }

    /// Sends a single completion request and returns the text of the first choice.
    pub async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let response = self
            .http_client
            .post(self.url.clone())
            .bearer_auth(self.api_key.as_str())
            .json(&CompletionRequest {
                prompt,
                max_tokens: self.max_tokens,
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status(status));
        }
        let payload = response.text().await?;
        let response = serde_json::from_str::<CompletionResponse>(&payload).inspect_err(|_| {
            tracing::warn!(%payload, "undecodable completion response");
        })?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or(CompletionError::NoChoices)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    text: String,
}
