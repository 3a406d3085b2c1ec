use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    error::{GenAIError, Result},
    models::common::{AspectRatio, ImageSize, ModelTier},
};

pub const DEFAULT_REFERENCE_MIME: &str = "image/jpeg";
pub const OUTPUT_MIME: &str = "image/png";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub aspect_ratio: AspectRatio,
    pub image_size: Option<ImageSize>,
}

impl GenerationConfig {
    pub fn new(aspect_ratio: AspectRatio) -> Self {
        Self {
            aspect_ratio,
            image_size: None,
        }
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = Some(size);
        self
    }
}

/// A portrait sent as visual context ahead of the prompt. `data` is always
/// bare base64, never a data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub data: String,
    pub mime_type: String,
}

impl ReferenceImage {
    /// Accepts either a `data:<mime>;base64,<payload>` URI or bare base64.
    pub fn from_base64(input: &str) -> Self {
        let mime_type = input
            .strip_prefix("data:")
            .and_then(|rest| rest.split(|c| c == ';' || c == ',').next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_REFERENCE_MIME)
            .to_string();

        Self {
            data: strip_data_uri_prefix(input).to_string(),
            mime_type,
        }
    }

    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(GenAIError::InvalidRequest(format!(
                "reference image {} is empty",
                path.display()
            )));
        }
        Ok(Self::from_bytes(&bytes, mime_for_path(path)))
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => DEFAULT_REFERENCE_MIME,
    }
}

/// Everything after the first comma of a data URI; input without a prefix
/// is returned unchanged.
pub fn strip_data_uri_prefix(input: &str) -> &str {
    if !input.starts_with("data:") {
        return input;
    }
    match input.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => payload,
        _ => input,
    }
}

pub fn png_data_uri(data: &str) -> String {
    format!("data:{};base64,{}", OUTPUT_MIME, data)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: ModelTier,
    pub reference_image: Option<ReferenceImage>,
    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: ModelTier) -> Self {
        Self {
            prompt: prompt.into(),
            model,
            reference_image: None,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_reference_image(mut self, image: ReferenceImage) -> Self {
        self.reference_image = Some(image);
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub image_url: String,
    pub prompt: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub model: String,
}

impl GenerationResult {
    pub fn new(image_url: String, prompt: impl Into<String>, model: ModelTier) -> Self {
        Self {
            image_url,
            prompt: prompt.into(),
            timestamp: Utc::now().timestamp_millis(),
            model: model.model_id().to_string(),
        }
    }

    pub fn image_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(strip_data_uri_prefix(&self.image_url))
            .map_err(|e| GenAIError::ResponseError(format!("invalid image data: {}", e)))
    }

    pub fn file_name(&self) -> String {
        format!("cinematic-gen-{}.png", self.timestamp)
    }

    pub fn created_at(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.timestamp).single()
    }

    pub fn prompt_preview(&self, max_chars: usize) -> String {
        if self.prompt.chars().count() <= max_chars {
            return self.prompt.clone();
        }
        let head: String = self.prompt.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
