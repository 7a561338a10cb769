use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::{CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::scan::{
    BodyRegion, InputError, ScanImages, ScanImagesBuilder, SubmitResponse, UploadRequest,
};

/// POST /upload — accept four images and start a scan job.
///
/// Takes either a JSON body of base64 strings or a multipart form with one
/// part per region. Responds 202 with the job id once the images are stored;
/// the workflow result arrives later via `/webhook-callback`.
pub async fn submit_scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let images = if is_multipart(&headers) {
        read_multipart(request, &state).await?
    } else {
        read_json(request, &state).await?
    };

    let public_base = callback_base(&state, &headers)?;
    let submitted = state.jobs.submit(images, &public_base).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: submitted.job_id,
        }),
    ))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

async fn read_json(request: Request, state: &AppState) -> Result<ScanImages, InputError> {
    let Json(body) = Json::<UploadRequest>::from_request(request, state)
        .await
        .map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "Rejected upload body");
            InputError::Missing
        })?;
    body.decode()
}

async fn read_multipart(request: Request, state: &AppState) -> Result<ScanImages, InputError> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|rejection| InputError::Malformed(rejection.body_text()))?;

    let mut builder = ScanImagesBuilder::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InputError::Malformed(e.body_text()))?
    {
        let Some(region) = field.name().and_then(|name| name.parse::<BodyRegion>().ok()) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| InputError::Malformed(e.body_text()))?;
        builder.set(region, data.to_vec());
    }
    builder.build()
}

/// Base URL the workflow should call back on.
fn callback_base(state: &AppState, headers: &HeaderMap) -> AppResult<String> {
    if let Some(base) = &state.public_base_url {
        return Ok(base.to_string());
    }

    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|host| !host.is_empty())
        .map(|host| format!("https://{host}"))
        .ok_or_else(|| AppError::BadRequest("Missing Host header.".to_string()))
}
