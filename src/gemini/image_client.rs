use async_trait::async_trait;
use reqwest::Client;

use crate::{
    credentials::KeyStore,
    error::{GenAIError, Result},
    gemini::traits::ImageGenerator,
    logger,
    models::{
        gemini::{upstream_error_message, GenerateContentRequest, GenerateContentResponse},
        GenerationConfig, GenerationRequest, ModelTier, ReferenceImage,
    },
};

pub const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    base_url: String,
    keys: KeyStore,
}

impl ImageClient {
    pub fn new(client: Client, base_url: impl Into<String>, keys: KeyStore) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keys,
        }
    }

    fn endpoint(&self, model: ModelTier) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model.model_id())
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        model: ModelTier,
        reference_image: Option<&ReferenceImage>,
        config: GenerationConfig,
    ) -> Result<String> {
        let mut request = GenerationRequest::new(prompt, model).with_config(config);
        request.reference_image = reference_image.cloned();
        self.generate(&request).await
    }

    async fn send(&self, request: &GenerationRequest) -> Result<String> {
        if request.prompt.trim().is_empty() {
            return Err(GenAIError::InvalidRequest("prompt must not be empty".into()));
        }
        let api_key = self.keys.get().ok_or(GenAIError::MissingApiKey)?;

        let payload = GenerateContentRequest::from_request(request);
        let model_id = request.model.model_id();

        log::info!(
            "Generating image with model: {} (aspect {}, reference: {})",
            model_id,
            request.config.aspect_ratio,
            if request.reference_image.is_some() { "yes" } else { "no" }
        );
        let _timer = logger::timer(&format!("generateContent {}", model_id));

        let endpoint = self.endpoint(request.model);
        let response = self
            .client
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        log::debug!(target: "cinegen::http", "POST {} -> {} ({} bytes)", endpoint, status, body.len());

        if !status.is_success() {
            return Err(GenAIError::Upstream {
                status: status.as_u16(),
                message: upstream_error_message(&body),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GenAIError::ResponseError(format!("unreadable model response: {}", e)))?;

        match parsed.first_image_data_uri() {
            Ok(uri) => Ok(uri),
            Err(e) => {
                log::warn!(
                    "Model {} returned no image (finish reason: {})",
                    model_id,
                    parsed.finish_reason().unwrap_or("unknown")
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.send(request).await.map_err(|e| {
            let e = e.classify();
            log::error!("Gemini image generation error: {}", e);
            e
        })
    }
}
