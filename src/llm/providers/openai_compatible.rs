//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Groq, OpenAI and local servers (Ollama, LM Studio…) all speak this
//! shape. All wire types are private to this module; callers only see
//! [`LlmResponse`]. The provider is stateless: one request, one reply.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{LlmResponse, LlmUsage, ProviderError};

// ── Public provider ───────────────────────────────────────────────────────────

/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// `api_key`, when present, is sent as `Authorization: Bearer <key>`.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, max_tokens, api_key })
    }

    pub async fn complete(
        &self,
        content: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(Message { role: "system", content: sys });
        }
        messages.push(Message { role: "user", content });

        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        debug!(
            model = %payload.model,
            temperature = payload.temperature,
            content_len = content.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, timeout = e.is_timeout(), "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received LLM response");

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Request("empty or missing content in response".into()))?;

        let usage = parsed.usage.map(|u| LlmUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(LlmResponse { text, usage })
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Return the response if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = error_message(status, &body);
    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env
                .error
                .code
                .map(|v| match v {
                    serde_json::Value::String(s) => format!(" [code={s}]"),
                    other => format!(" [code={other}]"),
                })
                .unwrap_or_default();
            format!("HTTP {status}{code}: {}", env.error.message)
        }
        Err(_) => format!("HTTP {status}: {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server: reads a full request, answers with `status` and
    /// `body`, and hands back the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let len = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let l = l.to_ascii_lowercase();
                            l.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + len {
                        break;
                    }
                }
            }
            let resp = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}/v1/chat/completions"), handle)
    }

    fn provider(url: String, key: Option<&str>) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(url, "llama3-8b-8192".into(), 0.1, 500, 5, key.map(String::from)).unwrap()
    }

    #[test]
    fn constructs_provider() {
        let p = OpenAiCompatibleProvider::new(
            "https://api.groq.com/openai/v1/chat/completions".into(),
            "llama3-8b-8192".into(),
            0.1,
            500,
            5,
            None,
        );
        assert!(p.is_ok());
    }

    #[tokio::test]
    async fn complete_returns_trimmed_first_choice() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"content":"  {\"response\":\"hi\"}  "}}],"usage":{"prompt_tokens":12,"completion_tokens":3}}"#,
        )
        .await;
        let out = provider(url, Some("gsk_test")).complete("hello", Some("json only")).await.unwrap();
        assert_eq!(out.text, r#"{"response":"hi"}"#);
        assert_eq!(out.usage, Some(LlmUsage { input_tokens: 12, output_tokens: 3 }));

        let request = server.await.unwrap();
        assert!(request.to_ascii_lowercase().contains("authorization: bearer gsk_test"));
        assert!(request.contains("\"max_tokens\":500"));
        assert!(request.contains("\"role\":\"system\""));
    }

    #[tokio::test]
    async fn http_error_uses_error_envelope() {
        let (url, _server) = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Invalid API Key","code":"invalid_api_key"}}"#,
        )
        .await;
        let err = provider(url, None).complete("hello", None).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid_api_key"));
        assert!(msg.contains("Invalid API Key"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let (url, _server) = serve_once("200 OK", r#"{"choices":[]}"#).await;
        let err = provider(url, None).complete("hello", None).await.unwrap_err();
        assert!(err.to_string().contains("empty or missing content"));
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        let msg = error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(msg, "HTTP 502 Bad Gateway: upstream down");
    }
}
