use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::assistants::HttpAssistantsClient;
use crate::config::Config;
use crate::id_store::IdStore;
use crate::lookup;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The mutex is the single-flight guard: one run per conversation
    /// thread. Handlers `try_lock` and reject concurrent submissions.
    pub orchestrator: Arc<Mutex<Orchestrator>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let api = Arc::new(HttpAssistantsClient::new(
            config.assistant_service.base_url.clone(),
            config.assistant_service.api_key.clone(),
        ));
        let lookup = lookup::create_provider(config.persona, &config.lookup);
        let store = IdStore::open(&config.system.store_dir, config.persona)?;

        let orchestrator = Orchestrator::new(
            api,
            lookup,
            store,
            config.persona,
            config.assistant_service.model.clone(),
            Duration::from_secs(config.system.poll_interval_secs),
            config.system.max_polls,
        );

        Ok(Self {
            config,
            orchestrator: Arc::new(Mutex::new(orchestrator)),
        })
    }
}
