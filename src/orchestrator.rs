use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::assistants::{AssistantsApi, RequiredAction, RunStatus, RunStep, ToolOutput};
use crate::error::AppError;
use crate::id_store::IdStore;
use crate::lookup::LookupProvider;
use crate::persona::Persona;

/// The one tool function assistants are allowed to call back into.
pub const HELP_FUNCTION: &str = "get_help";

#[derive(Debug, Deserialize)]
struct HelpArgs {
    topic: String,
}

/// Drives one conversation against the hosted assistant service: ensures the
/// assistant and thread exist (reusing persisted ids), appends the user
/// message, starts a run, then polls it to completion, dispatching any
/// requested tool calls to the lookup provider along the way.
///
/// One run is tracked at a time; the owner is expected to serialize
/// submissions (see `AppState`).
pub struct Orchestrator {
    api: Arc<dyn AssistantsApi>,
    lookup: Arc<dyn LookupProvider>,
    store: IdStore,
    persona: Persona,
    model: String,
    poll_interval: Duration,
    max_polls: u32,
    assistant_id: Option<String>,
    thread_id: Option<String>,
    run_id: Option<String>,
    /// Kept after completion so run steps stay inspectable.
    last_run_id: Option<String>,
    summary: Option<String>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn AssistantsApi>,
        lookup: Arc<dyn LookupProvider>,
        store: IdStore,
        persona: Persona,
        model: String,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Self {
        Self {
            api,
            lookup,
            store,
            persona,
            model,
            poll_interval,
            max_polls,
            assistant_id: None,
            thread_id: None,
            run_id: None,
            last_run_id: None,
            summary: None,
        }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Idempotent: reuses the persisted assistant id when one exists,
    /// otherwise creates the definition once and persists its id.
    pub async fn ensure_assistant(&mut self) -> Result<(), AppError> {
        if self.assistant_id.is_some() {
            return Ok(());
        }

        if let Some(id) = self.store.assistant_id() {
            let assistant = self.api.retrieve_assistant(id).await?;
            debug!("Reusing assistant {}", assistant.id);
            self.assistant_id = Some(assistant.id);
            return Ok(());
        }

        let assistant = self
            .api
            .create_assistant(
                self.persona.assistant_name(),
                self.persona.instructions(),
                vec![self.persona.tool_definition()],
                &self.model,
            )
            .await?;
        info!("Created assistant {}", assistant.id);
        self.store.set_assistant_id(assistant.id.clone())?;
        self.assistant_id = Some(assistant.id);
        Ok(())
    }

    /// Same create-once-or-reuse contract as `ensure_assistant`, for the
    /// conversation thread.
    pub async fn ensure_thread(&mut self) -> Result<(), AppError> {
        if self.thread_id.is_some() {
            return Ok(());
        }

        if let Some(id) = self.store.thread_id() {
            let thread = self.api.retrieve_thread(id).await?;
            debug!("Reusing thread {}", thread.id);
            self.thread_id = Some(thread.id);
            return Ok(());
        }

        let thread = self.api.create_thread().await?;
        info!("Created thread {}", thread.id);
        self.store.set_thread_id(thread.id.clone())?;
        self.thread_id = Some(thread.id);
        Ok(())
    }

    /// Appends the user's input (wrapped in the persona's message template)
    /// to the thread. Dropped with a warning when no thread exists yet;
    /// callers must `ensure_thread` first.
    pub async fn submit_user_message(&mut self, input: &str) -> Result<(), AppError> {
        let Some(thread_id) = self.thread_id.as_deref() else {
            warn!("submit_user_message called before ensure_thread; dropping message");
            return Ok(());
        };

        let content = self.persona.user_message(input);
        self.api.create_message(thread_id, "user", &content).await?;
        Ok(())
    }

    /// Starts a run on the thread. Errors when the assistant or thread is
    /// missing, or when a run is already being tracked.
    pub async fn start_run(&mut self) -> Result<(), AppError> {
        let (Some(assistant_id), Some(thread_id)) =
            (self.assistant_id.as_deref(), self.thread_id.as_deref())
        else {
            return Err(AppError::NotReady);
        };

        if self.run_id.is_some() {
            return Err(AppError::RunInFlight);
        }

        let run = self
            .api
            .create_run(thread_id, assistant_id, self.persona.run_instructions())
            .await?;
        info!("Started run {}", run.id);
        self.last_run_id = Some(run.id.clone());
        self.run_id = Some(run.id);
        Ok(())
    }

    /// Polls the tracked run until it completes, a terminal failure is
    /// observed, or the poll budget runs out. Tool-call rounds are handled
    /// inline and also consume the budget, so a run that keeps requesting
    /// tools still terminates.
    ///
    /// Returns the assistant's final reply; the tracked run is released on
    /// every exit path.
    pub async fn await_completion(&mut self) -> Result<String, AppError> {
        let result = self.poll_run().await;
        self.run_id = None;
        result
    }

    async fn poll_run(&mut self) -> Result<String, AppError> {
        let thread_id = self.thread_id.clone().ok_or(AppError::NotReady)?;
        let run_id = self.run_id.clone().ok_or(AppError::NotReady)?;

        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let run = self.api.retrieve_run(&thread_id, &run_id).await?;
            debug!(
                "Run {} status: {} (poll {}/{})",
                run_id,
                run.status.as_str(),
                attempt,
                self.max_polls
            );

            match run.status {
                RunStatus::Completed => {
                    let summary = self.read_latest_reply(&thread_id).await?;
                    self.summary = Some(summary.clone());
                    return Ok(summary);
                }
                RunStatus::RequiresAction => {
                    let action = run.required_action.ok_or_else(|| {
                        AppError::RunFailed(
                            "requires_action with no pending tool calls".to_string(),
                        )
                    })?;
                    self.dispatch_tool_calls(&thread_id, &run_id, action).await?;
                }
                status if status.is_terminal_failure() => {
                    return Err(AppError::RunFailed(status.as_str().to_string()));
                }
                // queued, in_progress, or a status we don't know yet
                _ => {}
            }
        }

        Err(AppError::PollTimeout {
            attempts: self.max_polls,
        })
    }

    /// Run steps of the last started run, for the debug panel.
    pub async fn run_steps(&self) -> Result<Vec<RunStep>, AppError> {
        match (self.thread_id.as_deref(), self.last_run_id.as_deref()) {
            (Some(thread_id), Some(run_id)) => {
                self.api.list_run_steps(thread_id, run_id).await
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn dispatch_tool_calls(
        &self,
        thread_id: &str,
        run_id: &str,
        action: RequiredAction,
    ) -> Result<(), AppError> {
        let mut outputs = Vec::new();

        for call in action.submit_tool_outputs.tool_calls {
            if call.function.name != HELP_FUNCTION {
                return Err(AppError::UnknownToolFunction(call.function.name));
            }

            let args: HelpArgs = serde_json::from_str(&call.function.arguments)?;
            info!("Dispatching lookup for topic: {}", args.topic);

            let snippets = self.lookup.lookup(&args.topic).await;
            if snippets.is_empty() {
                debug!("Lookup returned no snippets for topic: {}", args.topic);
            }

            outputs.push(ToolOutput {
                tool_call_id: call.id,
                output: snippets.join("\n"),
            });
        }

        info!("Submitting {} tool output(s) back to the run", outputs.len());
        self.api.submit_tool_outputs(thread_id, run_id, outputs).await
    }

    async fn read_latest_reply(&self, thread_id: &str) -> Result<String, AppError> {
        let messages = self.api.list_messages(thread_id).await?;
        let last = messages.data.first().ok_or(AppError::NoReply)?;
        let text = last.text().ok_or(AppError::NoReply)?;
        info!("{}: => {}", last.role, text);
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::assistants::*;

    /// Scripted stand-in for the hosted service. `retrieve_run` pops the
    /// next scripted run; once the script is exhausted it serves `fallback`,
    /// or panics when the loop should have stopped polling.
    struct FakeAssistants {
        script: Mutex<VecDeque<Run>>,
        fallback: Option<RunStatus>,
        reply: String,
        create_assistant_calls: AtomicUsize,
        create_thread_calls: AtomicUsize,
        retrieve_run_calls: AtomicUsize,
        submissions: Mutex<Vec<Vec<ToolOutput>>>,
    }

    impl FakeAssistants {
        fn new(script: Vec<Run>, fallback: Option<RunStatus>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                reply: "the final summary".to_string(),
                create_assistant_calls: AtomicUsize::new(0),
                create_thread_calls: AtomicUsize::new(0),
                retrieve_run_calls: AtomicUsize::new(0),
                submissions: Mutex::new(Vec::new()),
            }
        }
    }

    fn run(status: RunStatus, required_action: Option<RequiredAction>) -> Run {
        Run {
            id: "run_1".to_string(),
            status,
            required_action,
        }
    }

    fn tool_call(name: &str, arguments: &str) -> RequiredAction {
        RequiredAction {
            submit_tool_outputs: SubmitToolOutputs {
                tool_calls: vec![ToolCall {
                    id: "call_1".to_string(),
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments: arguments.to_string(),
                    },
                }],
            },
        }
    }

    #[async_trait]
    impl AssistantsApi for FakeAssistants {
        async fn create_assistant(
            &self,
            _name: &str,
            _instructions: &str,
            _tools: Vec<serde_json::Value>,
            _model: &str,
        ) -> Result<Assistant, AppError> {
            self.create_assistant_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Assistant {
                id: "asst_new".to_string(),
                name: None,
                model: None,
            })
        }

        async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, AppError> {
            Ok(Assistant {
                id: assistant_id.to_string(),
                name: None,
                model: None,
            })
        }

        async fn create_thread(&self) -> Result<Thread, AppError> {
            self.create_thread_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Thread {
                id: "thread_new".to_string(),
            })
        }

        async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, AppError> {
            Ok(Thread {
                id: thread_id.to_string(),
            })
        }

        async fn create_message(
            &self,
            _thread_id: &str,
            role: &str,
            _content: &str,
        ) -> Result<ThreadMessage, AppError> {
            Ok(ThreadMessage {
                id: "msg_user".to_string(),
                role: role.to_string(),
                content: Vec::new(),
            })
        }

        async fn create_run(
            &self,
            _thread_id: &str,
            _assistant_id: &str,
            _instructions: &str,
        ) -> Result<Run, AppError> {
            Ok(run(RunStatus::Queued, None))
        }

        async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run, AppError> {
            self.retrieve_run_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                return Ok(next);
            }
            match self.fallback {
                Some(status) => Ok(run(status, None)),
                None => panic!("retrieve_run called after the scripted terminal status"),
            }
        }

        async fn list_messages(&self, _thread_id: &str) -> Result<MessageList, AppError> {
            Ok(MessageList {
                data: vec![ThreadMessage {
                    id: "msg_reply".to_string(),
                    role: "assistant".to_string(),
                    content: vec![MessageContent {
                        kind: "text".to_string(),
                        text: Some(TextContent {
                            value: self.reply.clone(),
                        }),
                    }],
                }],
            })
        }

        async fn list_run_steps(
            &self,
            _thread_id: &str,
            _run_id: &str,
        ) -> Result<Vec<RunStep>, AppError> {
            Ok(Vec::new())
        }

        async fn submit_tool_outputs(
            &self,
            _thread_id: &str,
            _run_id: &str,
            outputs: Vec<ToolOutput>,
        ) -> Result<(), AppError> {
            self.submissions.lock().unwrap().push(outputs);
            Ok(())
        }
    }

    struct FakeLookup {
        snippets: Vec<String>,
        topics: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LookupProvider for FakeLookup {
        async fn lookup(&self, topic: &str) -> Vec<String> {
            self.topics.lock().unwrap().push(topic.to_string());
            self.snippets.clone()
        }
    }

    fn scratch_dir() -> String {
        std::env::temp_dir()
            .join(format!("orchestrator_test_{}", Uuid::new_v4().as_simple()))
            .to_string_lossy()
            .to_string()
    }

    fn orchestrator(
        api: Arc<FakeAssistants>,
        lookup: Arc<FakeLookup>,
        dir: &str,
        max_polls: u32,
    ) -> Orchestrator {
        let store = IdStore::open(dir, Persona::Cooking).unwrap();
        Orchestrator::new(
            api,
            lookup,
            store,
            Persona::Cooking,
            "gpt-test".to_string(),
            Duration::from_millis(1),
            max_polls,
        )
    }

    fn no_lookup() -> Arc<FakeLookup> {
        Arc::new(FakeLookup {
            snippets: Vec::new(),
            topics: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn warm_store_skips_creation() {
        let dir = scratch_dir();
        {
            let mut store = IdStore::open(&dir, Persona::Cooking).unwrap();
            store.set_assistant_id("asst_live".to_string()).unwrap();
            store.set_thread_id("thread_live".to_string()).unwrap();
        }

        let api = Arc::new(FakeAssistants::new(Vec::new(), None));
        let mut orchestrator = orchestrator(api.clone(), no_lookup(), &dir, 4);

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();

        assert_eq!(api.create_assistant_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.create_thread_calls.load(Ordering::SeqCst), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn cold_store_creates_exactly_once() {
        let dir = scratch_dir();
        let api = Arc::new(FakeAssistants::new(Vec::new(), None));
        let mut orchestrator = orchestrator(api.clone(), no_lookup(), &dir, 4);

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();

        assert_eq!(api.create_assistant_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.create_thread_calls.load(Ordering::SeqCst), 1);

        // and the ids were persisted for the next process
        let store = IdStore::open(&dir, Persona::Cooking).unwrap();
        assert_eq!(store.assistant_id(), Some("asst_new"));
        assert_eq!(store.thread_id(), Some("thread_new"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn poll_loop_dispatches_once_then_stops() {
        let dir = scratch_dir();
        let api = Arc::new(FakeAssistants::new(
            vec![
                run(RunStatus::Queued, None),
                run(RunStatus::InProgress, None),
                run(
                    RunStatus::RequiresAction,
                    Some(tool_call(HELP_FUNCTION, r#"{"topic": "soup too spicy"}"#)),
                ),
                run(RunStatus::Completed, None),
            ],
            // exhausting the script means polling past `completed`
            None,
        ));
        let lookup = Arc::new(FakeLookup {
            snippets: vec!["add dairy".to_string()],
            topics: Mutex::new(Vec::new()),
        });
        let mut orchestrator = orchestrator(api.clone(), lookup.clone(), &dir, 10);

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();
        orchestrator.submit_user_message("soup too spicy").await.unwrap();
        orchestrator.start_run().await.unwrap();
        let summary = orchestrator.await_completion().await.unwrap();

        assert_eq!(summary, "the final summary");
        assert_eq!(orchestrator.summary(), Some("the final summary"));
        assert_eq!(api.retrieve_run_calls.load(Ordering::SeqCst), 4);
        assert_eq!(lookup.topics.lock().unwrap().as_slice(), ["soup too spicy"]);

        let submissions = api.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0][0].tool_call_id, "call_1");
        assert_eq!(submissions[0][0].output, "add dairy");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn second_tool_round_is_served() {
        let dir = scratch_dir();
        let api = Arc::new(FakeAssistants::new(
            vec![
                run(
                    RunStatus::RequiresAction,
                    Some(tool_call(HELP_FUNCTION, r#"{"topic": "starters"}"#)),
                ),
                run(RunStatus::InProgress, None),
                run(
                    RunStatus::RequiresAction,
                    Some(tool_call(HELP_FUNCTION, r#"{"topic": "desserts"}"#)),
                ),
                run(RunStatus::Completed, None),
            ],
            None,
        ));
        let lookup = Arc::new(FakeLookup {
            snippets: vec!["use less salt".to_string()],
            topics: Mutex::new(Vec::new()),
        });
        let mut orchestrator = orchestrator(api.clone(), lookup.clone(), &dir, 10);

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();
        orchestrator.start_run().await.unwrap();
        let summary = orchestrator.await_completion().await.unwrap();

        assert_eq!(summary, "the final summary");
        assert_eq!(api.submissions.lock().unwrap().len(), 2);
        assert_eq!(
            lookup.topics.lock().unwrap().as_slice(),
            ["starters", "desserts"]
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn tool_rounds_consume_the_poll_budget() {
        let dir = scratch_dir();
        let api = Arc::new(FakeAssistants::new(
            vec![
                run(
                    RunStatus::RequiresAction,
                    Some(tool_call(HELP_FUNCTION, r#"{"topic": "starters"}"#)),
                ),
                run(
                    RunStatus::RequiresAction,
                    Some(tool_call(HELP_FUNCTION, r#"{"topic": "desserts"}"#)),
                ),
            ],
            None,
        ));
        let lookup = Arc::new(FakeLookup {
            snippets: Vec::new(),
            topics: Mutex::new(Vec::new()),
        });
        // Two polls, both answered with tool requests: the budget is shared,
        // so the run times out instead of looping on tool rounds forever.
        let mut orchestrator = orchestrator(api.clone(), lookup, &dir, 2);

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();
        orchestrator.start_run().await.unwrap();
        let err = orchestrator.await_completion().await.unwrap_err();

        assert!(matches!(err, AppError::PollTimeout { attempts: 2 }));
        assert_eq!(api.submissions.lock().unwrap().len(), 2);
        assert_eq!(api.retrieve_run_calls.load(Ordering::SeqCst), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn unknown_function_fails_fast() {
        let dir = scratch_dir();
        let api = Arc::new(FakeAssistants::new(
            vec![run(
                RunStatus::RequiresAction,
                Some(tool_call("delete_everything", "{}")),
            )],
            None,
        ));
        let mut orchestrator = orchestrator(api.clone(), no_lookup(), &dir, 4);

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();
        orchestrator.start_run().await.unwrap();
        let err = orchestrator.await_completion().await.unwrap_err();

        match err {
            AppError::UnknownToolFunction(name) => assert_eq!(name, "delete_everything"),
            other => panic!("expected UnknownToolFunction, got {other:?}"),
        }
        assert!(api.submissions.lock().unwrap().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn stuck_run_times_out_after_max_polls() {
        let dir = scratch_dir();
        let api = Arc::new(FakeAssistants::new(Vec::new(), Some(RunStatus::InProgress)));
        let mut orchestrator = orchestrator(api.clone(), no_lookup(), &dir, 3);

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();
        orchestrator.start_run().await.unwrap();
        let err = orchestrator.await_completion().await.unwrap_err();

        assert!(matches!(err, AppError::PollTimeout { attempts: 3 }));
        assert_eq!(api.retrieve_run_calls.load(Ordering::SeqCst), 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn terminal_failure_statuses_are_distinguished() {
        let dir = scratch_dir();
        let api = Arc::new(FakeAssistants::new(vec![run(RunStatus::Expired, None)], None));
        let mut orchestrator = orchestrator(api.clone(), no_lookup(), &dir, 4);

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();
        orchestrator.start_run().await.unwrap();
        let err = orchestrator.await_completion().await.unwrap_err();

        match err {
            AppError::RunFailed(status) => assert_eq!(status, "expired"),
            other => panic!("expected RunFailed, got {other:?}"),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn start_run_guards_preconditions() {
        let dir = scratch_dir();
        let api = Arc::new(FakeAssistants::new(Vec::new(), None));
        let mut orchestrator = orchestrator(api.clone(), no_lookup(), &dir, 4);

        assert!(matches!(
            orchestrator.start_run().await.unwrap_err(),
            AppError::NotReady
        ));

        orchestrator.ensure_assistant().await.unwrap();
        orchestrator.ensure_thread().await.unwrap();
        orchestrator.start_run().await.unwrap();
        assert!(matches!(
            orchestrator.start_run().await.unwrap_err(),
            AppError::RunInFlight
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
