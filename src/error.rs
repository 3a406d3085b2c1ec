use thiserror::Error;

/// Upstream message Gemini returns when the selected key no longer maps to a
/// usable project. It is the only signal available for an expired key.
pub const ENTITY_NOT_FOUND_SIGNATURE: &str = "Requested entity was not found";

#[derive(Debug, Error)]
pub enum GenAIError {
    #[error("No image data found in model response.")]
    NoImageProduced,

    #[error("API key rejected by the image service; re-select a key")]
    AuthenticationNeeded,

    /// Provider error, displayed with the upstream message unchanged.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Network-level failure, displayed with its message unchanged.
    #[error("{0}")]
    Transport(String),

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No API key selected")]
    MissingApiKey,

    #[error("Key selection failed: {0}")]
    KeySelection(String),

    #[error("A generation is already in progress")]
    GenerationInProgress,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenAIError {
    /// Reclassifies upstream failures whose message carries the
    /// entity-not-found signature; everything else passes through untouched.
    pub fn classify(self) -> Self {
        match self {
            GenAIError::Upstream { ref message, .. } | GenAIError::Transport(ref message)
                if is_entity_not_found(message) =>
            {
                GenAIError::AuthenticationNeeded
            }
            other => other,
        }
    }

    pub fn is_authentication_needed(&self) -> bool {
        matches!(self, GenAIError::AuthenticationNeeded)
    }
}

pub fn is_entity_not_found(message: &str) -> bool {
    message.contains(ENTITY_NOT_FOUND_SIGNATURE)
}

impl From<reqwest::Error> for GenAIError {
    fn from(e: reqwest::Error) -> Self {
        GenAIError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for GenAIError {
    fn from(e: serde_json::Error) -> Self {
        GenAIError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GenAIError>;
