pub mod image_client;
pub mod traits;

use crate::{
    config::GeminiConfig,
    credentials::KeyStore,
    error::{GenAIError, Result},
};
use reqwest::Client;

pub use image_client::ImageClient;
pub use traits::ImageGenerator;

/// Entry point to the Gemini API. Cheap to clone; every clone shares the
/// same connection pool and key store.
#[derive(Clone)]
pub struct GeminiClient {
    image_client: ImageClient,
    keys: KeyStore,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let keys = KeyStore::new(config.api_key.clone());
        Self::with_key_store(config, keys)
    }

    /// Builds a client that reads its key from an existing store, so a key
    /// selector can swap credentials between calls.
    pub fn with_key_store(config: GeminiConfig, keys: KeyStore) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenAIError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        if !keys.is_set() {
            log::warn!("⚠️  No API key selected yet; generation will require key selection");
        }
        log::debug!("Gemini endpoint: {}", config.base_url);

        Ok(Self {
            image_client: ImageClient::new(http, config.base_url, keys.clone()),
            keys,
        })
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.keys
    }
}
