//! Cinematic portrait generation on top of the Gemini image models.
//!
//! [`GeminiClient`] turns a prompt, a model tier, an optional reference
//! portrait and an image config into exactly one `generateContent` call and
//! hands back the image as a PNG data URI. [`Studio`] wraps a client with the
//! state a front-end needs: selected controls, key gating for the Pro tier,
//! an in-flight flag and a most-recent-first history.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod studio;

pub use config::{GeminiConfig, StudioConfig, DEFAULT_PROMPT};
pub use credentials::{EnvKeySelector, KeySelector, KeyStore, PromptKeySelector};
pub use error::{is_entity_not_found, GenAIError, Result};
pub use gemini::{GeminiClient, ImageClient, ImageGenerator};
pub use models::{
    AspectRatio, GenerationConfig, GenerationRequest, GenerationResult, ImageSize, ModelInfo,
    ModelTier, ReferenceImage,
};
pub use studio::{History, Studio};
