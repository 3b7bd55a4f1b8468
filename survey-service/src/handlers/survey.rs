//! Survey intake.

use crate::handlers::parse_json_body;
use crate::models::SurveySubmission;
use crate::services::metrics::record_submission;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode};
use bytes::Bytes;
use service_core::error::AppError;
use validator::Validate;

pub const SURVEY_SAVED_MESSAGE: &str = "Survey data saved successfully!\n";

/// `POST /submitSurvey`: validate, classify and store one submission.
pub async fn submit_survey(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), AppError> {
    let submission: SurveySubmission = parse_json_body(&body).inspect_err(|_| {
        record_submission("invalid");
    })?;

    if let Err(errors) = submission.validate() {
        record_submission("invalid");
        return Err(errors.into());
    }

    let record = submission.into_record();

    match state.db.insert_survey(&record).await {
        Ok(saved) => {
            record_submission("saved");
            tracing::info!(
                survey_id = saved.id,
                email = %saved.email,
                score = saved.score,
                level = %saved.level,
                "Survey saved"
            );
            Ok((StatusCode::OK, SURVEY_SAVED_MESSAGE))
        }
        Err(AppError::Conflict(e)) => {
            record_submission("duplicate");
            tracing::info!(email = %record.email, "Rejected duplicate survey email");
            Err(AppError::Conflict(e))
        }
        Err(e) => {
            record_submission("error");
            tracing::error!(email = %record.email, error = %e, "Failed to save survey");
            Err(e)
        }
    }
}
