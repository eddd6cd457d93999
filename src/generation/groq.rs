//! Groq (OpenAI 호환 Chat Completions) 클라이언트
//!
//! source: https://console.groq.com/docs/api-reference#chat-create

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{RagError, Result};

use super::sse::{ApiErrorBody, SseDecoder, SseEvent};
use super::{
    build_messages, generation_error, PromptMessage, ResponseGenerator, TokenStream,
    MAX_OUTPUT_TOKENS, TEMPERATURE,
};

/// 요청 본문
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<PromptMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

/// Groq 응답 생성기
#[derive(Debug, Clone)]
pub struct GroqGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqGenerator {
    /// # Arguments
    /// * `api_key` - Groq API 키
    /// * `model` - 모델 ID (예: `llama-3.3-70b-versatile`)
    /// * `base_url` - OpenAI 호환 API 베이스 URL
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let api_key: String = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Config("GROQ_API_KEY must not be empty".into()));
        }

        // 스트리밍은 오래 걸릴 수 있으므로 연결 타임아웃만 지정
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| RagError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url: String = base_url.into();

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 설정에서 생성 (API 키 없으면 설정 에러)
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_llm_key()?;
        let generator = Self::new(api_key, &settings.llm_model, &settings.llm_base_url)?;
        tracing::info!("Using LLM {} via {}", generator.model, generator.base_url);
        Ok(generator)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, query: &str, context: &str, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: build_messages(query, context),
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| generation_error(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }
}

/// 비 2xx 응답을 에러로 변환 (인증, rate limit 등 구분)
fn api_error(status: reqwest::StatusCode, body: &str) -> RagError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    let kind = match status.as_u16() {
        401 | 403 => "authentication failed",
        429 => "rate limit exceeded",
        s if s >= 500 => "upstream unavailable",
        _ => "request rejected",
    };

    generation_error(format!("API error {} ({}): {}", status, kind, detail))
}

#[async_trait]
impl ResponseGenerator for GroqGenerator {
    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        let request = self.build_request(query, context, false);
        let response = self.send(&request).await?;

        let body = response
            .text()
            .await
            .map_err(|e| generation_error(format!("Failed to read response body: {}", e)))?;

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| generation_error(format!("Malformed response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| generation_error("Malformed response: no message content"))
    }

    fn generate_stream(&self, query: &str, context: &str) -> TokenStream {
        let this = self.clone();
        let request = self.build_request(query, context, true);

        Box::pin(async_stream::try_stream! {
            tracing::debug!("Streaming from {} with model {}", this.endpoint(), this.model);

            let response = this.send(&request).await?;
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| generation_error(format!("Stream read error: {}", e)))?;
                for event in decoder.push(&chunk)? {
                    if let SseEvent::Delta(text) = event {
                        yield text;
                    }
                }
                if decoder.is_done() {
                    break;
                }
            }

            for event in decoder.finish()? {
                if let SseEvent::Delta(text) = event {
                    yield text;
                }
            }
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> GroqGenerator {
        GroqGenerator::new("gsk_test", "llama-3.3-70b-versatile", "https://api.groq.com/openai/v1/")
            .unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            generator().endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_fixed_sampling() {
        let request = generator().build_request("What color is the sky?", "The sky is blue.", true);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "llama-3.3-70b-versatile");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["stream"], true);
        assert!((value["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(value["messages"][0]["role"], "system");
        assert!(value["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("Question: What color is the sky?"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = GroqGenerator::new(" ", "m", "https://example.com");
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = Settings::default();
        assert!(matches!(
            GroqGenerator::from_settings(&settings),
            Err(RagError::Config(_))
        ));
    }

    #[test]
    fn test_api_error_classification() {
        let err = api_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Invalid API Key"}}"#,
        );
        let msg = err.to_string();
        assert!(msg.contains("authentication failed"));
        assert!(msg.contains("Invalid API Key"));

        let err = api_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(err.to_string().contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_unreachable_host_surfaces_in_stream() {
        use futures::StreamExt;

        let generator = GroqGenerator::new("k", "m", "http://127.0.0.1:9").unwrap();
        let mut stream = generator.generate_stream("q", "c");

        let first = stream.next().await;
        assert!(matches!(first, Some(Err(RagError::Generation(_)))));
        assert!(stream.next().await.is_none());
    }
}
