//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_api;

use inkpad::client::AppContext;
use inkpad::config::{ApiConfig, Config};
use inkpad::credential::{Credential, CredentialStore};
use inkpad::session::Session;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

pub use mock_api::{MockApi, MockResponse};

/// Config pointing at `base_url` with an explicit credential file.
pub fn config_for(base_url: &str, credential_path: PathBuf) -> Config {
    let mut config = Config::default();
    config.api = ApiConfig {
        base_url: base_url.to_string(),
        image_base_url: None,
    };
    config.storage.credential_path = Some(credential_path);
    config
}

/// App wired to `mock` with an in-memory credential store.
pub fn make_app(mock: &MockApi, credential: Option<&str>) -> AppContext {
    let config = config_for(&mock.base_url(), PathBuf::from("/nonexistent/credentials.json"));
    let store = CredentialStore::in_memory(credential.map(Credential::new));
    AppContext::with_store(config, store)
}

/// App wired to `mock` with a credential file inside a fresh temp dir.
pub fn make_persistent_app(mock: &MockApi) -> (TempDir, AppContext) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&mock.base_url(), temp_dir.path().join("credentials.json"));
    let app = AppContext::new(config).expect("Failed to open credential store");
    (temp_dir, app)
}

/// Wait for the session to settle, failing the test after `timeout`.
pub async fn settle(app: &AppContext, timeout: Duration) -> Session {
    tokio::time::timeout(timeout, app.session().settled())
        .await
        .expect("session did not settle")
}
