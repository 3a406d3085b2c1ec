//! Ephemeral studio state and the generate flow around the image client.

pub mod history;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    config::StudioConfig,
    credentials::KeySelector,
    error::{GenAIError, Result},
    gemini::ImageGenerator,
    models::{
        AspectRatio, GenerationConfig, GenerationRequest, GenerationResult, ImageSize, ModelTier,
        ReferenceImage,
    },
};

pub use history::History;

pub const KEY_DIALOG_FAILED: &str = "Failed to open key selection dialog.";
pub const SESSION_EXPIRED: &str = "API Session expired or key invalid. Please re-select your key.";
pub const NO_KEY_SELECTED: &str = "No API key selected. Select a key to use the Pro model.";
pub const UNEXPECTED_FAILURE: &str = "An unexpected error occurred during generation.";

#[derive(Debug, Clone)]
struct StudioState {
    model: ModelTier,
    aspect_ratio: AspectRatio,
    image_size: ImageSize,
    prompt: String,
    reference_image: Option<ReferenceImage>,
    generating: bool,
    history: History,
    last_error: Option<String>,
}

pub struct Studio {
    generator: Arc<dyn ImageGenerator>,
    keys: Arc<dyn KeySelector>,
    output_dir: PathBuf,
    state: Mutex<StudioState>,
}

/// Clears the in-flight flag however the generate call exits.
struct InFlight<'a> {
    studio: &'a Studio,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.studio.state().generating = false;
    }
}

impl Studio {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        keys: Arc<dyn KeySelector>,
        config: StudioConfig,
    ) -> Self {
        Self {
            generator,
            keys,
            output_dir: config.output_dir,
            state: Mutex::new(StudioState {
                model: config.model,
                aspect_ratio: config.aspect_ratio,
                image_size: config.image_size,
                prompt: config.prompt,
                reference_image: None,
                generating: false,
                history: History::new(),
                last_error: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, StudioState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_model(&self, model: ModelTier) {
        self.state().model = model;
    }

    pub fn set_aspect_ratio(&self, aspect_ratio: AspectRatio) {
        self.state().aspect_ratio = aspect_ratio;
    }

    pub fn set_image_size(&self, image_size: ImageSize) {
        self.state().image_size = image_size;
    }

    pub fn set_reference_image(&self, image: ReferenceImage) {
        self.state().reference_image = Some(image);
    }

    pub fn clear_reference_image(&self) {
        self.state().reference_image = None;
    }

    pub fn model(&self) -> ModelTier {
        self.state().model
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.state().aspect_ratio
    }

    pub fn image_size(&self) -> ImageSize {
        self.state().image_size
    }

    pub fn prompt(&self) -> String {
        self.state().prompt.clone()
    }

    pub fn reference_image(&self) -> Option<ReferenceImage> {
        self.state().reference_image.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.state().generating
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    pub fn history(&self) -> Vec<GenerationResult> {
        self.state().history.entries().to_vec()
    }

    pub fn current(&self) -> Option<GenerationResult> {
        self.state().history.current().cloned()
    }

    pub fn select_history(&self, index: usize) -> Result<GenerationResult> {
        self.state().history.select(index).cloned()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn fail(&self, message: impl Into<String>) {
        self.state().last_error = Some(message.into());
    }

    /// Runs one generation with the current controls. A second call made
    /// while one is outstanding is rejected rather than queued.
    pub async fn generate(&self) -> Result<GenerationResult> {
        let request = {
            let mut state = self.state();
            if state.generating {
                return Err(GenAIError::GenerationInProgress);
            }
            state.generating = true;
            state.last_error = None;

            let config = GenerationConfig::new(state.aspect_ratio).with_image_size(state.image_size);
            let mut request = GenerationRequest::new(state.prompt.clone(), state.model)
                .with_config(config);
            request.reference_image = state.reference_image.clone();
            request
        };
        let _in_flight = InFlight { studio: self };

        if request.model.requires_selected_key() {
            self.ensure_key_selected().await?;
        }

        let outcome = self.generator.generate(&request).await;
        match outcome {
            Ok(image_url) => {
                let result = GenerationResult::new(image_url, request.prompt, request.model);
                log::info!("✅ Image generated with {}", result.model);
                self.state().history.push(result.clone());
                Ok(result)
            }
            Err(e) if e.is_authentication_needed() => {
                self.fail(SESSION_EXPIRED);
                if request.model.requires_selected_key() {
                    if let Err(selector_err) = self.keys.open_key_selector().await {
                        log::warn!("Key re-selection failed: {}", selector_err);
                    }
                }
                Err(e)
            }
            Err(e) => {
                let message = e.to_string();
                if message.is_empty() {
                    self.fail(UNEXPECTED_FAILURE);
                } else {
                    self.fail(message);
                }
                Err(e)
            }
        }
    }

    /// A key counts as selected only if the selector says so after it
    /// returns; a successful dialog alone is not trusted.
    async fn ensure_key_selected(&self) -> Result<()> {
        if self.keys.has_selected_key().await {
            return Ok(());
        }

        log::info!("🔑 No API key selected, opening key selector");
        if let Err(e) = self.keys.open_key_selector().await {
            log::error!("❌ {}: {}", KEY_DIALOG_FAILED, e);
            self.fail(KEY_DIALOG_FAILED);
            return Err(e);
        }

        if !self.keys.has_selected_key().await {
            self.fail(NO_KEY_SELECTED);
            return Err(GenAIError::AuthenticationNeeded);
        }
        Ok(())
    }

    /// Writes the current image as `cinematic-gen-<timestamp>.png` into the
    /// configured output directory.
    pub fn save_current(&self) -> Result<PathBuf> {
        self.save_current_to(&self.output_dir)
    }

    pub fn save_current_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let current = self
            .current()
            .ok_or_else(|| GenAIError::InvalidRequest("no generated image to save".into()))?;
        save_result(&current, dir)
    }
}

pub fn save_result(result: &GenerationResult, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let bytes = result.image_bytes()?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(result.file_name());
    std::fs::write(&path, bytes)?;
    log::info!("💾 Image saved to: {}", path.display());
    Ok(path)
}
