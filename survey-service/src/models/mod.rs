//! Domain models for survey-service.

pub mod survey;

pub use survey::{NewSurveyRecord, SecurityLevel, SurveyRecord, SurveySubmission};
