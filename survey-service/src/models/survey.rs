//! Survey submission model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

/// Classification derived from a submission's score at insert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    High,
    Medium,
    Low,
}

impl SecurityLevel {
    /// `> 75` is high, `51..=75` medium, anything else low.
    pub fn from_score(score: i64) -> Self {
        if score > 75 {
            SecurityLevel::High
        } else if score > 50 {
            SecurityLevel::Medium
        } else {
            SecurityLevel::Low
        }
    }

    /// Label persisted in the `level` column.
    pub fn label(&self) -> &'static str {
        match self {
            SecurityLevel::High => "high security level",
            SecurityLevel::Medium => "medium security level",
            SecurityLevel::Low => "low security level",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Body of `POST /submitSurvey`.
///
/// Missing fields decode to their defaults so that an absent `email` is
/// reported the same way as an empty one.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SurveySubmission {
    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,

    #[serde(default)]
    pub score: i64,
}

impl SurveySubmission {
    pub fn into_record(self) -> NewSurveyRecord {
        let level = SecurityLevel::from_score(self.score);
        NewSurveyRecord {
            email: self.email,
            address: self.address,
            score: self.score,
            level,
        }
    }
}

/// Input for inserting a survey record.
#[derive(Debug, Clone)]
pub struct NewSurveyRecord {
    pub email: String,
    pub address: String,
    pub score: i64,
    pub level: SecurityLevel,
}

/// Persisted survey row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SurveyRecord {
    pub id: i64,
    pub email: String,
    pub address: String,
    pub score: i64,
    pub level: String,
}
