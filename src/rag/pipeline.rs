//! RAG 파이프라인 - 검색 → 컨텍스트 → 생성
//!
//! 검색 결과가 없으면 생성기를 호출하지 않고 고정된 거절 메시지를 돌려줍니다.

use std::sync::Arc;

use crate::error::Result;
use crate::generation::{ResponseGenerator, TokenStream};

use super::context::format_context;
use super::retriever::{RetrievedChunk, Retriever};

/// 근거가 없을 때의 고정 응답
pub const REFUSAL_MESSAGE: &str = "I couldn't find any relevant information in the document.";

/// 질의 결과
pub struct RagAnswer {
    /// 답변 텍스트 스트림 (거절 시 단일 조각)
    pub stream: TokenStream,
    /// 근거 청크 (관련도 순)
    pub sources: Vec<RetrievedChunk>,
    /// 근거 부족으로 생성을 건너뛰었는지
    pub blocked: bool,
}

impl std::fmt::Debug for RagAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagAnswer")
            .field("sources", &self.sources)
            .field("blocked", &self.blocked)
            .finish_non_exhaustive()
    }
}

/// 전체 텍스트로 받은 질의 결과
#[derive(Debug, Clone)]
pub struct RagTextAnswer {
    pub text: String,
    pub sources: Vec<RetrievedChunk>,
    pub blocked: bool,
}

/// 파이프라인
pub struct RagPipeline {
    retriever: Retriever,
    generator: Arc<dyn ResponseGenerator>,
    max_distance: Option<f32>,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            retriever,
            generator,
            max_distance: None,
        }
    }

    /// 거리 상한 설정 (이보다 먼 청크는 근거로 쓰지 않음)
    pub fn with_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    /// 검색 후 거리 상한 적용
    async fn ground(&self, query: &str, top_k: Option<usize>) -> Result<Vec<RetrievedChunk>> {
        let mut sources = self.retriever.retrieve(query, top_k).await?;

        if let Some(limit) = self.max_distance {
            let before = sources.len();
            sources.retain(|chunk| chunk.score <= limit);
            if sources.len() < before {
                tracing::debug!(
                    "Dropped {} chunks above max distance {}",
                    before - sources.len(),
                    limit
                );
            }
        }

        Ok(sources)
    }

    /// 스트리밍 답변
    ///
    /// 검색 실패는 즉시 에러로, 생성 실패는 스트림 항목으로 전달됩니다.
    pub async fn answer(&self, query: &str, top_k: Option<usize>) -> Result<RagAnswer> {
        let sources = self.ground(query, top_k).await?;

        if sources.is_empty() {
            tracing::info!("No grounding context for query; returning refusal");
            return Ok(RagAnswer {
                stream: refusal_stream(),
                sources,
                blocked: true,
            });
        }

        let context = format_context(&sources);
        let stream = self.generator.generate_stream(query, &context);

        Ok(RagAnswer {
            stream,
            sources,
            blocked: false,
        })
    }

    /// 비스트리밍 답변 (생성기의 단일 응답 모드 사용)
    pub async fn answer_text(&self, query: &str, top_k: Option<usize>) -> Result<RagTextAnswer> {
        let sources = self.ground(query, top_k).await?;

        if sources.is_empty() {
            return Ok(RagTextAnswer {
                text: REFUSAL_MESSAGE.to_string(),
                sources,
                blocked: true,
            });
        }

        let context = format_context(&sources);
        let text = self.generator.generate(query, &context).await?;

        Ok(RagTextAnswer {
            text,
            sources,
            blocked: false,
        })
    }
}

fn refusal_stream() -> TokenStream {
    Box::pin(futures::stream::once(async {
        Ok(REFUSAL_MESSAGE.to_string())
    }))
}

// ============================================================================
// Tests
// ============================================================================
