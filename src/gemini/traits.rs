use crate::{error::Result, models::GenerationRequest};
use async_trait::async_trait;

/// One request in, one displayable image out.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the generated image as a `data:image/png;base64,` URI.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
