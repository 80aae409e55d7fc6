use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::LookupProvider;

/// News-article search. One GET per lookup, at most five articles.
#[derive(Debug, Clone)]
pub struct NewsLookup {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl NewsLookup {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    fn format_article(article: &Article) -> String {
        format!(
            "Title: {},\nAuthor: {},\nDescription: {},\nURL: {}",
            article.title.as_deref().unwrap_or(""),
            article.author.as_deref().unwrap_or(""),
            article.description.as_deref().unwrap_or(""),
            article.url.as_deref().unwrap_or(""),
        )
    }
}

#[async_trait]
impl LookupProvider for NewsLookup {
    async fn lookup(&self, topic: &str) -> Vec<String> {
        let url = format!("{}/v2/everything", self.base_url);
        let query = [
            ("q", topic),
            ("apiKey", self.api_key.as_str()),
            ("pageSize", "5"),
        ];

        let response = match super::get_with_retry(&self.client, &url, &query).await {
            Ok(response) => response,
            Err(e) => {
                warn!("news lookup request failed: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            debug!("news lookup returned status {}", response.status());
            return Vec::new();
        }

        let body: NewsResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("news lookup returned malformed body: {}", e);
                return Vec::new();
            }
        };

        body.articles.iter().map(Self::format_article).collect()
    }
}
