//! Configuration module for survey-service.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub download: DownloadConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file; created on first start.
    pub path: PathBuf,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub path: PathBuf,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Base URL of the Ollama-compatible service, without the `/api/generate` suffix.
    pub base_url: String,
    pub model: String,
    /// Whole-request deadline, including the model's generation time.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl SurveyConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let database_path =
            PathBuf::from(env::var("SURVEY_DATABASE_PATH").unwrap_or_else(|_| "survey.db".into()));

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "survey-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                path: database_path.clone(),
                max_connections: parse_env("SURVEY_DATABASE_MAX_CONNECTIONS", 5)?,
            },
            download: DownloadConfig {
                path: env::var("DOWNLOAD_FILE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(database_path),
                content_type: env::var("DOWNLOAD_CONTENT_TYPE")
                    .unwrap_or_else(|_| "application/vnd.sqlite3".to_string()),
            },
            generation: GenerationConfig {
                base_url: env::var("GENERATION_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                model: env::var("GENERATION_MODEL").unwrap_or_else(|_| "llama3".to_string()),
                timeout: Duration::from_secs(parse_env("GENERATION_TIMEOUT_SECS", 120)?),
                connect_timeout: Duration::from_secs(parse_env(
                    "GENERATION_CONNECT_TIMEOUT_SECS",
                    5,
                )?),
            },
        })
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_accepts_numbers() {
        let timeout: u64 = parse_value("GENERATION_TIMEOUT_SECS", " 30 ").unwrap();
        assert_eq!(timeout, 30);
    }

    #[test]
    fn generation_timeouts_come_from_env() {
        env::set_var("GENERATION_TIMEOUT_SECS", "45");
        env::set_var("GENERATION_CONNECT_TIMEOUT_SECS", "3");
        let config = SurveyConfig::from_env();
        env::remove_var("GENERATION_TIMEOUT_SECS");
        env::remove_var("GENERATION_CONNECT_TIMEOUT_SECS");

        let config = config.unwrap();
        assert_eq!(config.generation.timeout, Duration::from_secs(45));
        assert_eq!(config.generation.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn parse_value_rejects_garbage() {
        let err = parse_value::<u32>("SURVEY_DATABASE_MAX_CONNECTIONS", "many").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("SURVEY_DATABASE_MAX_CONNECTIONS"));
    }
}
