use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GenAIError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub tier: ModelTier,
    pub id: String,
    pub name: String,
    pub description: String,
    pub supports_image_size: bool,
    pub requires_selected_key: bool,
}

/// The two Gemini image models the studio drives. They differ in which
/// image config fields the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    #[default]
    Flash,
    Pro,
}

impl ModelTier {
    pub const ALL: [ModelTier; 2] = [ModelTier::Flash, ModelTier::Pro];

    pub fn model_id(&self) -> &'static str {
        match self {
            ModelTier::Flash => "gemini-2.5-flash-image",
            ModelTier::Pro => "gemini-3-pro-image-preview",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelTier::Flash => "FLASH 2.5",
            ModelTier::Pro => "PRO 3 (2K/4K)",
        }
    }

    pub fn supports_image_size(&self) -> bool {
        matches!(self, ModelTier::Pro)
    }

    /// Pro runs against a billing-enabled project, so a key must be
    /// explicitly selected before each generation.
    pub fn requires_selected_key(&self) -> bool {
        matches!(self, ModelTier::Pro)
    }

    pub fn info(&self) -> ModelInfo {
        let description = match self {
            ModelTier::Flash => "Fast drafts; aspect ratio control only",
            ModelTier::Pro => "Final production renders at 1K, 2K or 4K; requires billing",
        };
        ModelInfo {
            tier: *self,
            id: self.model_id().to_string(),
            name: self.label().to_string(),
            description: description.to_string(),
            supports_image_size: self.supports_image_size(),
            requires_selected_key: self.requires_selected_key(),
        }
    }

    pub fn supported_models() -> Vec<ModelInfo> {
        Self::ALL.iter().map(ModelTier::info).collect()
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_id())
    }
}

impl FromStr for ModelTier {
    type Err = GenAIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ModelTier::ALL
            .into_iter()
            .find(|tier| {
                s.eq_ignore_ascii_case(tier.model_id())
                    || s.eq_ignore_ascii_case(&format!("{:?}", tier))
            })
            .ok_or_else(|| {
                GenAIError::InvalidRequest(format!(
                    "unknown model '{}', expected flash or pro",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Wide,
        AspectRatio::Tall,
        AspectRatio::Portrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Tall => "9:16",
            AspectRatio::Wide => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = GenAIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| {
                GenAIError::InvalidRequest(format!(
                    "unsupported aspect ratio '{}', expected one of 1:1, 3:4, 4:3, 9:16, 16:9",
                    s
                ))
            })
    }
}

/// Output resolution tier. Only the Pro model honours it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::OneK, ImageSize::TwoK, ImageSize::FourK];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = GenAIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                GenAIError::InvalidRequest(format!(
                    "unsupported image size '{}', expected 1K, 2K or 4K",
                    s
                ))
            })
    }
}
