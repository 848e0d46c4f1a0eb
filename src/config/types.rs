use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote API location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for every API call (e.g., "http://localhost:3002").
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Base URL for uploaded media. Falls back to `base_url` when unset.
    #[serde(default)]
    pub image_base_url: Option<String>,
}

/// Where client-side state is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Credential file path. Defaults to the platform data dir.
    #[serde(default)]
    pub credential_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:3002".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            image_base_url: None,
        }
    }
}

impl ApiConfig {
    /// Resolve an uploaded file name (e.g. an avatar) to a full URL.
    pub fn media_url(&self, file: &str) -> String {
        let base = self.image_base_url.as_deref().unwrap_or(&self.base_url);
        format!("{}/uploads/{}", base.trim_end_matches('/'), file)
    }
}

impl StorageConfig {
    /// Resolved credential file path.
    ///
    /// Uses `~/.local/share/inkpad/credentials.json` on Linux, or the
    /// equivalent from `dirs::data_dir()`. Falls back to the current directory.
    pub fn credential_path(&self) -> PathBuf {
        if let Some(path) = &self.credential_path {
            return path.clone();
        }
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        data_dir.join("inkpad").join("credentials.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:3002");
        assert!(config.api.image_base_url.is_none());
        assert!(config.storage.credential_path.is_none());
    }

    #[test]
    fn media_url_uses_image_base_when_set() {
        let api = ApiConfig {
            base_url: "http://api.test".into(),
            image_base_url: Some("http://cdn.test/".into()),
        };
        assert_eq!(api.media_url("a.png"), "http://cdn.test/uploads/a.png");

        let api = ApiConfig::default();
        assert_eq!(
            api.media_url("a.png"),
            "http://localhost:3002/uploads/a.png"
        );
    }

    #[test]
    fn explicit_credential_path_wins() {
        let storage = StorageConfig {
            credential_path: Some(PathBuf::from("/tmp/creds.json")),
        };
        assert_eq!(storage.credential_path(), PathBuf::from("/tmp/creds.json"));
    }
}
