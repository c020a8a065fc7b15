use super::schema::{response_schema, DIAGNOSIS_PROMPT};
use super::transport::{GeminiTransport, InferenceTransport};
use super::types::Analysis;
use super::wire::{
    is_safety_reason, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part,
};
use super::DiagnosisService;
use crate::config::InferenceConfig;
use crate::encoded::EncodedImage;
use crate::error::{DiagnosisError, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Turns one encoded image into one `Analysis` through the inference service.
///
/// Holds no per-call state, so concurrent calls are safe. Nothing is cached
/// and nothing is retried.
pub struct DiagnosisClient {
    transport: Arc<dyn InferenceTransport>,
    model: String,
    temperature: f32,
}

impl DiagnosisClient {
    /// Create a client talking HTTPS to the configured endpoint.
    ///
    /// Fails with `MissingCredential` when no (non-blank) credential is given.
    pub fn new(config: &InferenceConfig, credential: Option<String>) -> Result<Self, DiagnosisError> {
        let api_key = credential
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(DiagnosisError::MissingCredential)?;

        let transport = GeminiTransport::new(
            config.endpoint.clone(),
            api_key,
            Duration::from_secs(config.timeout_seconds),
        )
        .map_err(|e| DiagnosisError::transient(format!("HTTP client setup failed: {}", e)))?;

        info!(
            "Diagnosis client ready (model {}, temperature {})",
            config.model, config.temperature
        );
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(config: &InferenceConfig, transport: Arc<dyn InferenceTransport>) -> Self {
        Self {
            transport,
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request for one image
    pub fn build_request(&self, image: &EncodedImage) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(image.mime_type(), image.to_base64()),
                    Part::text(DIAGNOSIS_PROMPT),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
                temperature: self.temperature,
            },
        }
    }

    /// Diagnose one image
    pub async fn analyze(&self, image: &EncodedImage) -> Result<Analysis, DiagnosisError> {
        let request = self.build_request(image);
        let started = Instant::now();

        info!(
            "Requesting diagnosis from {} ({}, {} bytes)",
            self.model,
            image.mime_type(),
            image.len()
        );

        let result = match self.transport.generate_content(&self.model, &request).await {
            Ok(response) => interpret_response(&response),
            Err(e) => Err(map_transport_error(e)),
        };

        match &result {
            Ok(analysis) => info!(
                "Diagnosis received in {:?}: {} ({}%)",
                started.elapsed(),
                analysis.disease_name,
                analysis.confidence_percent()
            ),
            Err(e) => error!("Inference call failed after {:?}: {}", started.elapsed(), e),
        }

        result
    }
}

#[async_trait]
impl DiagnosisService for DiagnosisClient {
    async fn analyze(&self, image: &EncodedImage) -> Result<Analysis, DiagnosisError> {
        DiagnosisClient::analyze(self, image).await
    }
}

/// Map a service reply onto an `Analysis` or an error category
pub fn interpret_response(response: &GenerateContentResponse) -> Result<Analysis, DiagnosisError> {
    if let Some(reason) = response.safety_block() {
        warn!("Inference service refused the image: {}", reason);
        return Err(DiagnosisError::safety(reason));
    }

    let text = response
        .text()
        .ok_or_else(|| DiagnosisError::transient("reply contained no text"))?;

    parse_analysis(&text)
}

/// Parse and validate the JSON text of a reply
pub fn parse_analysis(text: &str) -> Result<Analysis, DiagnosisError> {
    let analysis: Analysis = serde_json::from_str(text.trim()).map_err(|e| {
        debug!("Unparseable reply: {}", text);
        DiagnosisError::transient(format!("reply is not a valid analysis: {}", e))
    })?;

    analysis.validate()?;
    Ok(analysis)
}

fn map_transport_error(error: TransportError) -> DiagnosisError {
    match error {
        TransportError::Status { status, body } if is_safety_reason(&body) => {
            DiagnosisError::safety(format!("HTTP {}: {}", status, body))
        }
        other => DiagnosisError::transient(other.to_string()),
    }
}
