//! Anthropic Messages API backend.
//!
//! One request per call, no streaming. Rate limits (429), overload (529) and
//! other 5xx answers, as well as connection failures and timeouts, are retried
//! here with exponential backoff. Whether the answer parses is the caller's
//! concern (see [`super::retry`]).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::{ModelError, Result};
use super::port::{CardEnricher, Enrichment, SenseClassifier, SenseReport};
use super::prompts::{CARD_SYSTEM_PROMPT, SENSE_SYSTEM_PROMPT, card_user_prompt, sense_user_prompt};
use crate::config::{ModelSettings, TransportSettings};

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Language model client for the Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: ModelSettings,
    transport: TransportSettings,
}

impl AnthropicClient {
    /// Create a client, reading the API key from `model.api_key_env`.
    pub fn from_env(model: ModelSettings, transport: TransportSettings) -> Result<Self> {
        let api_key = std::env::var(&model.api_key_env)
            .map_err(|_| ModelError::MissingApiKey(model.api_key_env.clone()))?;
        Self::new(api_key, model, transport)
    }

    pub fn new(api_key: String, model: ModelSettings, transport: TransportSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(model.timeout_secs))
            .build()
            .map_err(ModelError::Transport)?;
        let endpoint = format!("{}/v1/messages", model.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            api_key,
            endpoint,
            model,
            transport,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model.name
    }

    /// Send one system + user prompt and return the first text block of the answer.
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model.name,
            max_tokens: self.model.max_tokens,
            temperature: self.model.temperature,
            system,
            messages: [Message {
                role: "user",
                content: user,
            }],
        };
        trace!("POST {}\nBody: {}", self.endpoint, user);

        let mut attempt = 0;
        loop {
            let sent = self
                .http
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", &self.model.api_version)
                .json(&request)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.transport.max_retries => {
                    attempt += 1;
                    debug!("Request failed ({}), retrying (attempt {})", e, attempt);
                    tokio::time::sleep(self.backoff(attempt)).await;
                    continue;
                }
                Err(e) => return Err(ModelError::Transport(e)),
            };

            let status = response.status().as_u16();
            let body = response.text().await.map_err(ModelError::Transport)?;
            trace!("Response {}\nBody: {}", status, body);

            if (200..300).contains(&status) {
                return extract_text(&body);
            }
            if is_transient(status) && attempt < self.transport.max_retries {
                attempt += 1;
                debug!("HTTP {}, retrying (attempt {})", status, attempt);
                tokio::time::sleep(self.backoff(attempt)).await;
                continue;
            }
            return Err(error_for_status(status, &body));
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.transport.base_delay_ms.saturating_mul(1u64 << exponent))
    }
}

impl SenseClassifier for AnthropicClient {
    async fn classify(&self, word: &str) -> Result<SenseReport> {
        let text = self
            .complete(SENSE_SYSTEM_PROMPT, &sense_user_prompt(word))
            .await?;
        let report: SenseReport = parse_payload(&text)?;
        if report.parts_of_speech.is_empty() {
            return Err(ModelError::MalformedResponse(
                "no parts of speech returned".to_string(),
            ));
        }
        Ok(report)
    }
}

impl CardEnricher for AnthropicClient {
    async fn enrich(&self, word: &str, sense: &str) -> Result<Enrichment> {
        let text = self
            .complete(CARD_SYSTEM_PROMPT, &card_user_prompt(word, sense))
            .await?;
        parse_payload(&text)
    }
}

fn is_transient(status: u16) -> bool {
    status == 429 || status >= 500
}

/// First text block of a successful Messages API response.
fn extract_text(body: &str) -> Result<String> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::MalformedResponse(format!("unexpected response envelope: {e}")))?;
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| ModelError::MalformedResponse("response has no text content".to_string()))
}

/// Parse the model's text answer as the requested JSON payload.
fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text.trim()).map_err(|e| ModelError::MalformedResponse(e.to_string()))
}

/// Map a non-success answer to an error.
fn error_for_status(status: u16, body: &str) -> ModelError {
    let (kind, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.kind, envelope.error.message),
        Err(_) => (String::new(), body.to_string()),
    };

    let lower = message.to_lowercase();
    match status {
        401 | 403 => ModelError::Unauthorized(message),
        402 => ModelError::QuotaExhausted(message),
        400 if lower.contains("credit") || lower.contains("billing") => {
            ModelError::QuotaExhausted(message)
        }
        _ if kind == "billing_error" => ModelError::QuotaExhausted(message),
        _ => ModelError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn test_extract_text() {
        let body = r#"{
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "{\"thai_input\": \"สวย\", \"parts_of_speech\": [\"stative verb\"]}"}],
            "stop_reason": "end_turn"
        }"#;
        let text = extract_text(body).unwrap();
        let report: SenseReport = parse_payload(&text).unwrap();
        assert_eq!(report.thai_input, "สวย");
        assert_eq!(report.parts_of_speech, vec!["stative verb"]);
    }

    #[test]
    fn test_extract_text_without_text_block() {
        let body = r#"{"content": [{"type": "tool_use", "id": "t"}]}"#;
        assert!(matches!(
            extract_text(body),
            Err(ModelError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_fenced_payload_is_malformed() {
        let text = "```json\n{\"thai_input\": \"สวย\", \"parts_of_speech\": []}\n```";
        let err = parse_payload::<SenseReport>(text).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_enrichment_requires_every_field() {
        let text = r#"{"thai": "สวย", "romanization": "sǔay"}"#;
        assert!(matches!(
            parse_payload::<Enrichment>(text),
            Err(ModelError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_error_for_status_credit() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"Your credit balance is too low to access the Anthropic API."}}"#;
        assert!(matches!(
            error_for_status(400, body),
            ModelError::QuotaExhausted(_)
        ));
    }

    #[test]
    fn test_error_for_status_auth() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let err = error_for_status(401, body);
        assert!(matches!(err, ModelError::Unauthorized(ref m) if m == "invalid x-api-key"));
        assert!(err.is_fatal_for_run());
    }

    #[test]
    fn test_error_for_status_other() {
        let err = error_for_status(400, r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#);
        assert!(matches!(err, ModelError::Api { status: 400, .. }));
        assert!(!err.is_fatal_for_run());

        let err = error_for_status(502, "<html>bad gateway</html>");
        assert!(matches!(err, ModelError::Api { status: 502, ref message } if message.contains("bad gateway")));
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(429));
        assert!(is_transient(529));
        assert!(is_transient(500));
        assert!(!is_transient(400));
        assert!(!is_transient(401));
    }

    #[test]
    fn test_endpoint_and_backoff() {
        let settings = Settings::default();
        let mut model = settings.model.clone();
        model.base_url = "https://example.test/".to_string();
        let client = AnthropicClient::new("key".to_string(), model, settings.transport.clone()).unwrap();
        assert_eq!(client.endpoint, "https://example.test/v1/messages");
        assert_eq!(client.backoff(1), Duration::from_millis(500));
        assert_eq!(client.backoff(2), Duration::from_millis(1000));
        assert_eq!(client.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_request_body_shape() {
        let request = MessagesRequest {
            model: "m",
            max_tokens: 10,
            temperature: 1.0,
            system: "sys",
            messages: [Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["system"], "sys");
    }
}
