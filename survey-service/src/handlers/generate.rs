//! Prompt proxy to the text-generation service.

use crate::handlers::parse_json_body;
use crate::services::generation::GenerateRequest;
use crate::startup::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use service_core::error::AppError;
use service_core::observability::extract_request_id;

/// `POST /generate`: forward the prompt and relay the upstream answer verbatim.
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: GenerateRequest = parse_json_body(&body)?;

    if request.model.is_some() || request.stream.is_some() {
        tracing::debug!(
            requested_model = ?request.model,
            requested_stream = ?request.stream,
            "Ignoring client model/stream settings"
        );
    }

    let request_id = extract_request_id(&headers);
    let relayed = state
        .generation
        .generate(&request.prompt, request_id.as_deref())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Generation request failed"))?;

    let status = StatusCode::from_u16(relayed.status).map_err(|e| {
        AppError::UpstreamError(anyhow::anyhow!("Invalid upstream status: {}", e))
    })?;

    Ok((
        status,
        [(header::CONTENT_TYPE, "application/json")],
        relayed.body,
    )
        .into_response())
}
