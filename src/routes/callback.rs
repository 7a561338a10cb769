use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::services::lifecycle::CallbackError;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
    pub token: Option<String>,
}

/// POST /webhook-callback?jobId=<id> — the workflow delivers its result.
///
/// Answers in plain text: `OK`, or `Job ID not found` for anything that
/// does not resolve to a live job.
pub async fn workflow_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let Some(job_id) = params
        .job_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
    else {
        tracing::error!(job_id = ?params.job_id, "Job ID not found in callback");
        return (StatusCode::NOT_FOUND, "Job ID not found");
    };

    let result = match callback_payload(&headers, &body) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Callback body is not valid JSON");
            return (StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    match state
        .jobs
        .resolve_callback(job_id, params.token.as_deref(), result)
    {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(CallbackError::NotFound(_)) => (StatusCode::NOT_FOUND, "Job ID not found"),
        Err(CallbackError::Conflict(_)) => (StatusCode::CONFLICT, "Conflict"),
    }
}

/// JSON bodies are stored as parsed; anything else as a string. An empty
/// body is stored as `{}`.
fn callback_payload(headers: &HeaderMap, body: &[u8]) -> Result<serde_json::Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Object(Default::default()));
    }

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"));

    if is_json {
        serde_json::from_slice(body)
    } else {
        Ok(serde_json::Value::String(
            String::from_utf8_lossy(body).into_owned(),
        ))
    }
}
