use super::wire::{GenerateContentRequest, GenerateContentResponse};
use crate::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// One round trip to the inference service
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportError>;
}

/// HTTPS transport to the Gemini `generateContent` endpoint
pub struct GeminiTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("paddycheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self::with_client(client, endpoint, api_key))
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// URL of the generateContent method for a model
    pub fn url_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl InferenceTransport for GeminiTransport {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportError> {
        let url = self.url_for(model);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            warn!("Inference service returned HTTP {}", status.as_u16());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::InvalidBody(e.to_string()))
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::wire::{Content, GenerationConfig, Part};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    const MODEL: &str = "gemini-2.5-flash";

    fn create_test_request() -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::text("diagnose")],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: serde_json::json!({"type": "OBJECT"}),
                temperature: 0.0,
            },
        }
    }

    fn create_test_transport(addr: std::net::SocketAddr, timeout: Duration) -> GeminiTransport {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .unwrap();
        GeminiTransport::with_client(client, format!("http://{}/v1beta", addr), "test-key")
    }

    /// Read one full HTTP request: headers, then Content-Length bytes of body
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Answer a single request with a fixed status and body; yields the request text
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (std::net::SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let body = r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#;
        let (addr, server) = serve_once("429 Too Many Requests", body).await;
        let transport = create_test_transport(addr, Duration::from_secs(5));

        let error = transport
            .generate_content(MODEL, &create_test_request())
            .await
            .unwrap_err();

        match error {
            TransportError::Status { status, body: reply } => {
                assert_eq!(status, 429);
                assert_eq!(reply, body);
            }
            other => panic!("Expected status error, got {:?}", other),
        }

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent "));
        assert!(request.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains(r#""generationConfig""#));
    }

    #[tokio::test]
    async fn test_unparseable_success_body_is_invalid_body() {
        let (addr, server) = serve_once("200 OK", "<html>not json</html>").await;
        let transport = create_test_transport(addr, Duration::from_secs(5));

        let error = transport
            .generate_content(MODEL, &create_test_request())
            .await
            .unwrap_err();

        assert!(matches!(error, TransportError::InvalidBody(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_success_body_is_decoded() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{}"}]},"finishReason":"STOP"}]}"#;
        let (addr, server) = serve_once("200 OK", body).await;
        let transport = create_test_transport(addr, Duration::from_secs(5));

        let response = transport
            .generate_content(MODEL, &create_test_request())
            .await
            .unwrap();

        assert_eq!(response.text().as_deref(), Some("{}"));
        assert_eq!(response.safety_block(), None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            // hold the connection open without answering
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let transport = create_test_transport(addr, Duration::from_millis(200));
        let error = transport
            .generate_content(MODEL, &create_test_request())
            .await
            .unwrap_err();

        assert!(matches!(error, TransportError::Timeout));
        server.abort();
    }

    #[test]
    fn test_url_for_model() {
        let transport = GeminiTransport::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "key",
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            transport.url_for("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
