//! Common test utilities for survey-service integration tests.

#![allow(dead_code)]

use service_core::config::Config as CommonConfig;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;
use survey_service::config::{DatabaseConfig, DownloadConfig, GenerationConfig, SurveyConfig};
use survey_service::services::Database;
use survey_service::startup::Application;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,survey_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Test configuration rooted in `dir`. Nothing listens on port 1, so the
/// generation upstream is unreachable unless a test overrides `base_url`.
pub fn test_config(dir: &TempDir) -> SurveyConfig {
    let database_path = dir.path().join("survey.db");

    SurveyConfig {
        common: CommonConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        service_name: "survey-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            path: database_path.clone(),
            max_connections: 2,
        },
        download: DownloadConfig {
            path: database_path,
            content_type: "application/vnd.sqlite3".to_string(),
        },
        generation: GenerationConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model: "llama3".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
        },
    }
}

/// Test application wrapper.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: Database,
    pub client: reqwest::Client,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a configuration tweak applied on top of [`test_config`].
    pub async fn spawn_with(customize: impl FnOnce(&mut SurveyConfig)) -> Self {
        init_tracing();

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = test_config(&dir);
        customize(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();

        // Wait for the server to be ready by polling the ping endpoint
        let ping_url = format!("{}/ping", address);
        for _ in 0..50 {
            if client.get(&ping_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            client,
            dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }

    pub async fn submit_survey(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/submitSurvey"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn fire_alert(&self) -> reqwest::Response {
        self.client
            .get(self.url("/fire-alert"))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
