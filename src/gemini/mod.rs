//! Gemini `generateContent` client
//!
//! One prompt in, one reply text out. Response parsing is a pure function
//! so it can be tested without a server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::config::ApiConfig;
use crate::error::ExchangeError;

/// Something that turns a prompt into reply text.
///
/// The exchange only talks to this trait, so tests can swap in a double.
pub trait CompletionClient: Send + Sync + 'static {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, ExchangeError>> + Send;
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Build a client for `api`, sending `api_key` on every request.
    ///
    /// The key is not validated here; an empty key is sent as-is.
    pub fn new(api: &ApiConfig, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: api.endpoint(),
            api_key,
            model: api.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ExchangeError> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Sending generateContent request");

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::new(prompt))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "generateContent request failed");
            return Err(ExchangeError::RequestFailure(failure_message(status.as_u16(), &body)));
        }

        parse_response(&body)
    }
}

/// reqwest errors carry the request URL, which includes the key
fn transport_error(e: reqwest::Error) -> ExchangeError {
    ExchangeError::RequestFailure(e.without_url().to_string())
}

// Request body: {"contents":[{"parts":[{"text": "..."}]}]}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

// Response body: {"candidates":[{"content":{"parts":[{"text": "..."}]}}]}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Pull `candidates[0].content.parts[0].text` out of a success body
fn parse_response(body: &str) -> Result<String, ExchangeError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ExchangeError::RequestFailure(format!("invalid response body: {}", e)))?;

    // Valid JSON of the wrong shape is a malformed reply, not a transport problem
    let response: GenerateResponse =
        serde_json::from_value(value).map_err(|_| ExchangeError::MalformedResponse)?;

    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .and_then(|parts| parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or(ExchangeError::MalformedResponse)
}

fn failure_message(status: u16, body: &str) -> String {
    let mut message = format!("Error fetching response from Gemini API (HTTP {})", status);
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        message.push_str(": ");
        message.push_str(&envelope.error.message);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP response, returning the raw request it received
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&buf).to_string()
        });

        (base_url, handle)
    }

    fn client_for(base_url: String, key: &str) -> GeminiClient {
        let api = ApiConfig {
            base_url,
            ..ApiConfig::default()
        };
        GeminiClient::new(&api, key.to_string()).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest::new("hi there")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"parts": [{"text": "hi there"}]}]})
        );
    }

    #[test]
    fn test_parse_response_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}],"role":"model"}}]}"#;
        assert_eq!(parse_response(body), Ok("hello".to_string()));
    }

    #[test]
    fn test_parse_response_missing_links() {
        let bodies = [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{}}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{}]}}]}"#,
            r#"{"candidates":"nope"}"#,
        ];
        for body in bodies {
            assert_eq!(parse_response(body), Err(ExchangeError::MalformedResponse), "{}", body);
        }
    }

    #[test]
    fn test_parse_response_not_json() {
        match parse_response("<html>") {
            Err(ExchangeError::RequestFailure(msg)) => assert!(msg.starts_with("invalid response body")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_failure_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            failure_message(400, body),
            "Error fetching response from Gemini API (HTTP 400): API key not valid."
        );
        assert_eq!(
            failure_message(502, "bad gateway"),
            "Error fetching response from Gemini API (HTTP 502)"
        );
    }

    #[tokio::test]
    async fn test_generate_posts_prompt() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"pong"}]}}]}"#,
        )
        .await;

        let client = client_for(base_url, "test-key");
        let reply = client.generate("ping").await;
        assert_eq!(reply, Ok("pong".to_string()));

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "POST /v1beta/models/gemini-1.5-flash:generateContent?key=test-key HTTP/1.1"
        ));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"contents":[{"parts":[{"text":"ping"}]}]}"#));
    }

    #[tokio::test]
    async fn test_generate_http_failure() {
        let (base_url, server) = serve_once(
            "500 Internal Server Error",
            r#"{"error":{"code":500,"message":"Internal error"}}"#,
        )
        .await;

        let client = client_for(base_url, "");
        let reply = client.generate("ping").await;
        assert_eq!(
            reply,
            Err(ExchangeError::RequestFailure(
                "Error fetching response from Gemini API (HTTP 500): Internal error".to_string()
            ))
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = client_for(base_url, "secret-key");
        match client.generate("ping").await {
            Err(ExchangeError::RequestFailure(msg)) => assert!(!msg.contains("secret-key")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
