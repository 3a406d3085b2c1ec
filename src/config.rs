use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{AspectRatio, ImageSize, ModelTier};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_PROMPT: &str = "Una fotografía nocturna dramática con flash directo. El sujeto está de pie con confianza sobre suelo nevado frente a una imponente catedral gótica de piedra oscura. La persona mantiene su parecido facial y sus accesorios como esta en el [input image] pero lleva puesto un tuxedo, medias negras transparentes, botas de cuero. Apunta con una pistola compacta directamente a la cámara mientras sujeta con fuerza una pesada correa de cadena. A su lado, un musculoso Doberman se lanza hacia adelante a medio gruñido, con la boca abierta y los dientes desnudos, congelado en detalle nítido por el flashazo. Detrás de ellos, un Lamborghini Aventador rojo con las puertas de tijera abiertas capta fragmentos de luz. Aire frío de invierno, nieve dispersa, sombras profundas, tensión cinematográfica.";

/// Environment variables checked for an API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = api_key_from_lookup(&lookup);
        let base_url = lookup("GEMINI_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = lookup("GEMINI_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        GeminiConfig {
            api_key,
            base_url,
            timeout,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub(crate) fn api_key_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .into_iter()
        .filter_map(|var| lookup(var))
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

/// Studio defaults: what the controls show before the user touches them.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub model: ModelTier,
    pub aspect_ratio: AspectRatio,
    pub image_size: ImageSize,
    pub prompt: String,
    pub output_dir: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            model: ModelTier::Flash,
            aspect_ratio: AspectRatio::Wide,
            image_size: ImageSize::OneK,
            prompt: DEFAULT_PROMPT.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable values are logged and fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = StudioConfig::default();

        if let Some(raw) = lookup("CINEGEN_MODEL") {
            match raw.parse() {
                Ok(model) => config.model = model,
                Err(e) => log::warn!("Ignoring CINEGEN_MODEL: {}", e),
            }
        }
        if let Some(raw) = lookup("CINEGEN_ASPECT_RATIO") {
            match raw.parse() {
                Ok(ratio) => config.aspect_ratio = ratio,
                Err(e) => log::warn!("Ignoring CINEGEN_ASPECT_RATIO: {}", e),
            }
        }
        if let Some(raw) = lookup("CINEGEN_IMAGE_SIZE") {
            match raw.parse() {
                Ok(size) => config.image_size = size,
                Err(e) => log::warn!("Ignoring CINEGEN_IMAGE_SIZE: {}", e),
            }
        }
        if let Some(prompt) = lookup("CINEGEN_PROMPT").filter(|p| !p.trim().is_empty()) {
            config.prompt = prompt;
        }
        if let Some(dir) = lookup("CINEGEN_OUTPUT_DIR").filter(|d| !d.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn with_model(mut self, model: ModelTier) -> Self {
        self.model = model;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_image_size(mut self, image_size: ImageSize) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}
