use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::LookupProvider;

/// Recipe quick-answer search. The endpoint replies with a single optional
/// answer string rather than a result list.
#[derive(Debug, Clone)]
pub struct RecipeLookup {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct QuickAnswerResponse {
    #[serde(default)]
    answer: Option<String>,
}

impl RecipeLookup {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl LookupProvider for RecipeLookup {
    async fn lookup(&self, topic: &str) -> Vec<String> {
        let url = format!("{}/recipes/quickAnswer", self.base_url);
        let query = [("q", topic), ("apiKey", self.api_key.as_str())];

        let response = match super::get_with_retry(&self.client, &url, &query).await {
            Ok(response) => response,
            Err(e) => {
                warn!("recipe lookup request failed: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            debug!("recipe lookup returned status {}", response.status());
            return Vec::new();
        }

        let body: QuickAnswerResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("recipe lookup returned malformed body: {}", e);
                return Vec::new();
            }
        };

        match body.answer {
            Some(answer) => vec![answer],
            None => Vec::new(),
        }
    }
}
