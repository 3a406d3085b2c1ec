//! Wire types for the Gemini `generateContent` endpoint.

use serde::{Deserialize, Serialize};

use crate::{
    error::{GenAIError, Result},
    models::{
        common::{AspectRatio, ImageSize, ModelTier},
        image::{png_data_uri, GenerationConfig, GenerationRequest},
    },
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationParams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub image_config: ImageConfig,
}

/// Per-tier image config. Flash rejects `imageSize`, so the field only
/// exists on the Pro variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImageConfig {
    AspectOnly {
        #[serde(rename = "aspectRatio")]
        aspect_ratio: AspectRatio,
    },
    AspectAndSize {
        #[serde(rename = "aspectRatio")]
        aspect_ratio: AspectRatio,
        #[serde(rename = "imageSize")]
        image_size: ImageSize,
    },
}

impl ImageConfig {
    pub fn for_model(model: ModelTier, config: &GenerationConfig) -> Self {
        match model {
            ModelTier::Flash => ImageConfig::AspectOnly {
                aspect_ratio: config.aspect_ratio,
            },
            ModelTier::Pro => ImageConfig::AspectAndSize {
                aspect_ratio: config.aspect_ratio,
                image_size: config.image_size.unwrap_or_default(),
            },
        }
    }
}

impl GenerateContentRequest {
    /// The reference image, when present, goes ahead of the prompt text.
    pub fn from_request(request: &GenerationRequest) -> Self {
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = &request.reference_image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            });
        }
        parts.push(Part::Text {
            text: request.prompt.clone(),
        });

        Self {
            contents: vec![Content { parts }],
            generation_config: GenerationParams {
                image_config: ImageConfig::for_model(request.model, &request.config),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<ResponseContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

impl GenerateContentResponse {
    /// First inline image of the first candidate, as a PNG data URI.
    pub fn first_image_data_uri(&self) -> Result<String> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.inline_data.as_ref())
                    .find(|inline| !inline.data.is_empty())
            })
            .map(|inline| png_data_uri(&inline.data))
            .ok_or(GenAIError::NoImageProduced)
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}

/// Upstream error message from a failed call: `error.message` when the body
/// is a Gemini error envelope, otherwise the raw body.
pub fn upstream_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.trim().to_string(),
    }
}
