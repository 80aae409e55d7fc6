pub mod news;
pub mod recipes;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::LookupConfig;
use crate::persona::Persona;

pub use news::NewsLookup;
pub use recipes::RecipeLookup;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// One GET with bounded retry on transient failures. Connection errors and
/// 5xx responses are retried with a doubling delay; everything else (and the
/// final attempt) is returned to the caller, which degrades to an empty
/// result as usual.
pub(crate) async fn get_with_retry(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<Response, reqwest::Error> {
    let mut delay = RETRY_BASE_DELAY;
    let mut attempt = 1;

    loop {
        let result = client.get(url).query(query).send().await;

        let transient = match &result {
            Ok(response) => response.status().is_server_error(),
            Err(_) => true,
        };
        if !transient || attempt >= RETRY_ATTEMPTS {
            return result;
        }

        match &result {
            Ok(response) => debug!(
                "lookup attempt {} returned {}, retrying",
                attempt,
                response.status()
            ),
            Err(e) => debug!("lookup attempt {} failed: {}, retrying", attempt, e),
        }

        tokio::time::sleep(delay).await;
        delay *= 2;
        attempt += 1;
    }
}

/// External read-only search endpoint the assistant can call as a tool.
///
/// Lookups never fail: any non-200 status or network error degrades to an
/// empty snippet list, which downstream code treats as "no information
/// found". Errors are logged, not propagated.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    async fn lookup(&self, topic: &str) -> Vec<String>;
}

/// Create the lookup provider for a persona.
pub fn create_provider(persona: Persona, config: &LookupConfig) -> Arc<dyn LookupProvider> {
    match persona {
        Persona::News => Arc::new(NewsLookup::new(
            config.news_base_url.clone(),
            config.news_api_key.clone(),
        )),
        Persona::Cooking => Arc::new(RecipeLookup::new(
            config.recipe_base_url.clone(),
            config.recipe_api_key.clone(),
        )),
    }
}
