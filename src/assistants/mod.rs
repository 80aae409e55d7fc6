pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::AppError;
pub use client::HttpAssistantsClient;
pub use types::*;

/// The hosted conversational-assistant service. Assistants, threads,
/// messages and runs all live remotely; this side only holds identifiers.
///
/// Every method is a single REST call; failures propagate as
/// `AppError::RemoteService` and are fatal to the submission being handled.
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        tools: Vec<serde_json::Value>,
        model: &str,
    ) -> Result<Assistant, AppError>;

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, AppError>;

    async fn create_thread(&self) -> Result<Thread, AppError>;

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, AppError>;

    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
    ) -> Result<ThreadMessage, AppError>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: &str,
    ) -> Result<Run, AppError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AppError>;

    async fn list_messages(&self, thread_id: &str) -> Result<MessageList, AppError>;

    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<RunStep>, AppError>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), AppError>;
}
