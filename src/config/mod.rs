mod loader;
mod types;

pub use loader::{ConfigError, ENV_API_BASE_URI, ENV_IMAGE_BASE_URI};
pub use types::{ApiConfig, Config, StorageConfig};
