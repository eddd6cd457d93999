//! Vector Store - 벡터 저장소 트레이트 및 유틸리티
//!
//! 코어는 저장소에 두 가지만 요구합니다: `upsert`(완료 후 검색에 반영)와
//! 거리 오름차순 `search`. 트랜잭션 보장은 가정하지 않습니다.

use async_trait::async_trait;

use crate::error::Result;

use super::document::Chunk;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub chunk: Chunk,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// L2 거리 (작을수록 유사)
    pub distance: f32,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// chunk_id 기준 upsert. 같은 ID는 교체됩니다.
    ///
    /// # Returns
    /// 기록된 엔트리 수
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize>;

    /// 최근접 이웃 검색 (거리 오름차순, 최대 `limit`개)
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>>;

    /// 저장된 청크 수
    async fn count(&self) -> Result<usize>;

    /// 컬렉션 비우기
    async fn clear(&self) -> Result<()>;

    /// 백엔드 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 제곱 L2 거리
///
/// LanceDB의 기본 `l2` 거리와 같은 값을 계산합니다. 차원이 다르면 무한대.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// 점수를 소수점 4자리로 반올림
pub fn round_score(score: f32) -> f32 {
    (score * 10_000.0).round() / 10_000.0
}

// ============================================================================
// Tests
// ============================================================================
