use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "persona": state.config.persona.key(),
    }))
}

/// Single-field form posting to /api/ask.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let persona = state.config.persona;
    let prompt = match persona {
        crate::persona::Persona::News => "Enter topic",
        crate::persona::Persona::Cooking => "Enter question",
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
  <h1>{title}</h1>
  <form id="ask-form">
    <label for="question">{prompt}</label>
    <input id="question" name="question" type="text" size="60" required>
    <button type="submit">Run Assistant</button>
  </form>
  <pre id="answer"></pre>
  <script>
    const form = document.getElementById('ask-form');
    const answer = document.getElementById('answer');
    form.addEventListener('submit', async (event) => {{
      event.preventDefault();
      answer.textContent = 'Working...';
      const question = document.getElementById('question').value;
      const response = await fetch('/api/ask', {{
        method: 'POST',
        headers: {{'Content-Type': 'application/json'}},
        body: JSON.stringify({{question}}),
      }});
      const body = await response.json();
      answer.textContent = response.ok ? body.summary : ('Error: ' + body.error);
    }});
  </script>
</body>
</html>"#,
        title = persona.page_title(),
        prompt = prompt,
    ))
}

/// Full submission chain: ensure assistant and thread, append the message,
/// start a run and block on the poll loop until the assistant replies.
pub async fn ask(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "question must not be empty"})),
        ));
    }

    // Reject rather than queue: only one run per thread at a time.
    let mut orchestrator = state.orchestrator.try_lock().map_err(|_| {
        let err = AppError::RunInFlight;
        (err.status_code(), Json(json!({"error": err.to_string()})))
    })?;

    info!("Handling submission: {}", question);

    let result = async {
        orchestrator.ensure_assistant().await?;
        orchestrator.ensure_thread().await?;
        orchestrator.submit_user_message(&question).await?;
        orchestrator.start_run().await?;
        orchestrator.await_completion().await
    }
    .await;

    match result {
        Ok(summary) => {
            let steps = match orchestrator.run_steps().await {
                Ok(steps) => steps,
                Err(e) => {
                    warn!("Failed to list run steps: {}", e);
                    Vec::new()
                }
            };
            Ok(Json(json!({ "summary": summary, "steps": steps })))
        }
        Err(e) => {
            warn!("Submission failed: {}", e);
            Err((e.status_code(), Json(json!({"error": e.to_string()}))))
        }
    }
}
