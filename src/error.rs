use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the orchestration chain. Lookup failures are not in
/// here on purpose: the dispatcher degrades to an empty result instead of
/// erroring (see `lookup`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown tool function: {0}")]
    UnknownToolFunction(String),

    #[error("run did not finish within {attempts} polls")]
    PollTimeout { attempts: u32 },

    #[error("run ended in terminal status: {0}")]
    RunFailed(String),

    #[error("a run is already in flight on this thread")]
    RunInFlight,

    #[error("assistant and thread must exist before starting a run")]
    NotReady,

    #[error("run completed but the thread has no assistant reply")]
    NoReply,

    #[error("assistant service request failed: {0}")]
    RemoteService(#[from] reqwest::Error),

    #[error("id store error: {0}")]
    Store(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RunInFlight => StatusCode::CONFLICT,
            AppError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::RemoteService(_) | AppError::RunFailed(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
