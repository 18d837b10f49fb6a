#![allow(dead_code)]

use gemini_relay::config::{GeminiSettings, ImageMimePolicy, RelayConfig, UploadConfig};
use gemini_relay::services::providers::mock::MockModel;
use gemini_relay::startup::Application;
use service_core::config::Config as CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub upload_dir: PathBuf,
    pub model: Arc<MockModel>,
    pub client: reqwest::Client,
}

pub fn test_config(upload_dir: PathBuf) -> RelayConfig {
    RelayConfig {
        common: CoreConfig { port: 0 },
        gemini: GeminiSettings {
            api_key: "test-api-key".to_string(),
            model: "gemini-test".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: None,
        },
        uploads: UploadConfig {
            dir: upload_dir,
            max_bytes: 1024 * 1024,
            image_mime: ImageMimePolicy::default(),
        },
    }
}

impl TestApp {
    pub async fn spawn(model: MockModel) -> Self {
        Self::spawn_with(model, |_| {}).await
    }

    pub async fn spawn_with(model: MockModel, customize: impl FnOnce(&mut RelayConfig)) -> Self {
        let upload_dir = PathBuf::from(format!("target/test-uploads-{}", Uuid::new_v4()));
        let mut config = test_config(upload_dir.clone());
        customize(&mut config);

        let model = Arc::new(model);
        let app = Application::build_with_model(config, model.clone())
            .await
            .expect("Failed to build test application");

        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            upload_dir,
            model,
            client,
        }
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_form(&self, path: &str, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Files still present in the upload directory.
    pub fn leftover_uploads(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.upload_dir)
            .expect("Upload directory missing")
            .map(|entry| entry.expect("Failed to read entry").path())
            .collect()
    }

    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.upload_dir).await;
    }
}

pub fn file_part(bytes: Vec<u8>, file_name: &str, mime: &str) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .unwrap()
}

/// A 10-byte file starting with the PNG signature.
pub fn tiny_png() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00]
}
