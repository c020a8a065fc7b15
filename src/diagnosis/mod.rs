mod client;
mod schema;
mod transport;
mod types;
pub mod wire;

use crate::encoded::EncodedImage;
use crate::error::DiagnosisError;
use async_trait::async_trait;

pub use client::{interpret_response, parse_analysis, DiagnosisClient};
pub use schema::{response_schema, DIAGNOSIS_PROMPT, REQUIRED_FIELDS};
pub use transport::{GeminiTransport, InferenceTransport};
pub use types::{Analysis, Pesticide, HEALTHY_SENTINEL};

/// Anything that can diagnose an encoded image
#[async_trait]
pub trait DiagnosisService: Send + Sync {
    async fn analyze(&self, image: &EncodedImage) -> Result<Analysis, DiagnosisError>;
}
