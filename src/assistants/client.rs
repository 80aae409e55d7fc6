use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::types::*;
use super::AssistantsApi;
use crate::error::AppError;

/// REST client for the hosted assistant service.
#[derive(Debug, Clone)]
pub struct HttpAssistantsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpAssistantsClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }
}

#[async_trait]
impl AssistantsApi for HttpAssistantsClient {
    async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        tools: Vec<serde_json::Value>,
        model: &str,
    ) -> Result<Assistant, AppError> {
        let body = json!({
            "name": name,
            "instructions": instructions,
            "tools": tools,
            "model": model,
        });
        let assistant = self
            .post("/assistants")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(assistant)
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, AppError> {
        let assistant = self
            .get(&format!("/assistants/{assistant_id}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(assistant)
    }

    async fn create_thread(&self) -> Result<Thread, AppError> {
        let thread = self
            .post("/threads")
            .json(&json!({}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(thread)
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, AppError> {
        let thread = self
            .get(&format!("/threads/{thread_id}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(thread)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
    ) -> Result<ThreadMessage, AppError> {
        let body = json!({ "role": role, "content": content });
        let message = self
            .post(&format!("/threads/{thread_id}/messages"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(message)
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: &str,
    ) -> Result<Run, AppError> {
        let body = json!({
            "assistant_id": assistant_id,
            "instructions": instructions,
        });
        let run = self
            .post(&format!("/threads/{thread_id}/runs"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(run)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AppError> {
        let run = self
            .get(&format!("/threads/{thread_id}/runs/{run_id}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(run)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<MessageList, AppError> {
        let messages = self
            .get(&format!("/threads/{thread_id}/messages"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(messages)
    }

    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<RunStep>, AppError> {
        let steps: RunStepList = self
            .get(&format!("/threads/{thread_id}/runs/{run_id}/steps"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(steps.data)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), AppError> {
        let body = json!({ "tool_outputs": outputs });
        self.post(&format!(
            "/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"
        ))
        .json(&body)
        .send()
        .await?
        .error_for_status()?;
        Ok(())
    }
}
