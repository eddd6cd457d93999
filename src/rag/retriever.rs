//! Retriever - 쿼리 임베딩 후 벡터 저장소 검색

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::knowledge::{round_score, ChunkMetadata, VectorStore};

/// 검색된 청크 (쿼리 단위, 일시적)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// L2 거리, 소수점 4자리 (작을수록 관련도 높음)
    pub score: f32,
}

/// 벡터 검색 래퍼
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            default_top_k,
        }
    }

    /// 상위 k개 청크 검색 (거리 오름차순)
    ///
    /// 저장소가 비어 있으면 빈 목록을 반환합니다 (에러 아님).
    /// k가 저장된 청크 수보다 크면 있는 만큼만 반환합니다.
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> Result<Vec<RetrievedChunk>> {
        let k = top_k.unwrap_or(self.default_top_k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        let hits = self.store.search(&query_embedding, k).await?;

        // 비유한 거리는 쿼리/저장 벡터 차원 불일치
        if let Some(bad) = hits.iter().find(|hit| !hit.distance.is_finite()) {
            return Err(RagError::Retrieval(format!(
                "non-finite distance for chunk {} in {}: query dimension {} does not match the index",
                bad.chunk.chunk_id,
                self.store.name(),
                query_embedding.len()
            )));
        }

        let chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .take(k)
            .map(|hit| RetrievedChunk {
                content: hit.chunk.content,
                metadata: hit.chunk.metadata,
                score: round_score(hit.distance),
            })
            .collect();

        tracing::debug!(
            "Retrieved {} chunks from {} (k={})",
            chunks.len(),
            self.store.name(),
            k
        );

        Ok(chunks)
    }
}

// ============================================================================
// Tests
// ============================================================================
