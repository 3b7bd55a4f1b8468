//! Services module for survey-service.

pub mod database;
pub mod generation;
pub mod metrics;

pub use database::Database;
pub use generation::{GenerationClient, GenerationError, RelayedResponse};
pub use metrics::{get_metrics, init_metrics};
