//! 응답 생성 모듈 - 호스티드 LLM 호출
//!
//! 고정된 시스템 지시문 + (컨텍스트, 질문) 사용자 턴을 보내고
//! 전체 답변 또는 토큰 스트림을 돌려받습니다.
//! 재시도는 하지 않습니다. 스트림 도중 실패는 에러 항목으로 전달되고 스트림이 끝납니다.

mod groq;
mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::{RagError, Result};

pub use groq::GroqGenerator;
pub use sse::{SseDecoder, SseEvent};

/// 샘플링 온도 (호출마다 고정)
pub const TEMPERATURE: f32 = 0.3;
/// 최대 출력 토큰 (호출마다 고정)
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// 단일 패스, 전진 전용 텍스트 조각 스트림
///
/// 각 항목은 비어 있지 않은 텍스트 델타이거나 에러입니다.
/// 소비자가 중간에 drop하면 업스트림 연결도 함께 정리됩니다.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ============================================================================
// Prompt
// ============================================================================

pub const SYSTEM_PROMPT: &str = "You are a helpful document assistant. Your job is to answer questions \
based ONLY on the provided context from the document.

Rules:
- Answer based ONLY on the context provided below.
- If the answer is not in the context, say \"I don't have enough information in the document to answer this.\"
- Be concise and accurate.
- Use bullet points or numbered lists when appropriate.
- Cite the relevant section when possible.";

/// 사용자 턴 프롬프트 (컨텍스트 + 질문 원문)
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "Context from the document:\n---\n{}\n---\n\nQuestion: {}\n\nAnswer based on the context above:",
        context, query
    )
}

/// Chat 메시지 (OpenAI 호환 형식)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

/// 시스템 + 사용자 메시지 구성
pub fn build_messages(query: &str, context: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        },
        PromptMessage {
            role: "user".to_string(),
            content: build_prompt(query, context),
        },
    ]
}

// ============================================================================
// ResponseGenerator Trait
// ============================================================================

/// 응답 생성기 트레이트
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// 전체 답변을 한 번에 반환
    async fn generate(&self, query: &str, context: &str) -> Result<String>;

    /// 토큰 스트림 반환 (지연 실행: 첫 poll 시 요청 전송)
    fn generate_stream(&self, query: &str, context: &str) -> TokenStream;

    /// 모델 이름
    fn model(&self) -> &str;
}

/// 스트림을 끝까지 읽어 하나의 문자열로 합치기
///
/// 에러를 만나면 그 에러를 반환합니다 (이미 받은 텍스트는 버림).
pub async fn collect_stream(mut stream: TokenStream) -> Result<String> {
    use futures::StreamExt;

    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

pub(crate) fn generation_error(message: impl ToString) -> RagError {
    RagError::Generation(message.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_contains_context_and_question() {
        let prompt = build_prompt("What color is the sky?", "[Chunk 1] The sky is blue.");
        assert!(prompt.starts_with("Context from the document:\n---\n[Chunk 1] The sky is blue."));
        assert!(prompt.contains("Question: What color is the sky?"));
        assert!(prompt.ends_with("Answer based on the context above:"));
    }

    #[test]
    fn test_build_messages_roles() {
        let messages = build_messages("q", "c");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("ONLY on the context"));
        assert!(messages[0].content.contains("Cite the relevant section"));
        assert_eq!(messages[1].role, "user");
    }

    #[tokio::test]
    async fn test_collect_stream() {
        let stream: TokenStream = Box::pin(futures::stream::iter(vec![
            Ok("The sky ".to_string()),
            Ok("is blue.".to_string()),
        ]));
        assert_eq!(collect_stream(stream).await.unwrap(), "The sky is blue.");
    }

    #[tokio::test]
    async fn test_collect_stream_propagates_error() {
        let stream: TokenStream = Box::pin(futures::stream::iter(vec![
            Ok("partial".to_string()),
            Err(generation_error("connection reset")),
        ]));
        assert!(matches!(
            collect_stream(stream).await,
            Err(RagError::Generation(_))
        ));
    }
}
