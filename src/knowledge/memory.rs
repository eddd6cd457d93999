//! In-memory vector store
//!
//! `chunk_id` 기준 BTreeMap + 전수 L2 거리 계산. 테스트와 임시 인덱스용입니다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{RagError, Result};

use super::vector::{l2_distance, SearchHit, VectorEntry, VectorStore};

/// 메모리 벡터 저장소
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<BTreeMap<u64, VectorEntry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize> {
        let mut map = self.entries.write().await;

        if let Some(expected) = map.values().next().map(|e| e.embedding.len()) {
            if let Some(bad) = entries.iter().find(|e| e.embedding.len() != expected) {
                return Err(RagError::Retrieval(format!(
                    "embedding dimension mismatch for chunk {}: expected {}, got {}",
                    bad.chunk.chunk_id,
                    expected,
                    bad.embedding.len()
                )));
            }
        }

        for entry in entries {
            map.insert(entry.chunk.chunk_id, entry.clone());
        }

        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let map = self.entries.read().await;

        let mut hits: Vec<SearchHit> = map
            .values()
            .map(|entry| SearchHit {
                chunk: entry.chunk.clone(),
                distance: l2_distance(query_embedding, &entry.embedding),
            })
            .collect();

        // 거리 오름차순, 동점이면 chunk_id 순 (BTreeMap 순서 + stable sort)
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(limit);

        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Chunk;

    fn entry(id: u64, embedding: Vec<f32>) -> VectorEntry {
        VectorEntry {
            chunk: Chunk::new(id, format!("chunk {}", id), "test.pdf", 1),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_empty_search() {
        let store = InMemoryVectorStore::new();
        let hits = store.search(&[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                entry(0, vec![0.0, 1.0]),
                entry(1, vec![1.0, 0.0]),
                entry(2, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.chunk_id, 1);
        assert_eq!(hits[1].chunk.chunk_id, 2);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_limit_larger_than_store() {
        let store = InMemoryVectorStore::new();
        store.upsert(&[entry(0, vec![1.0])]).await.unwrap();

        let hits = store.search(&[1.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = InMemoryVectorStore::new();
        let batch = vec![entry(0, vec![1.0, 0.0]), entry(1, vec![0.0, 1.0])];

        store.upsert(&batch).await.unwrap();
        store.upsert(&batch).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = InMemoryVectorStore::new();
        store.upsert(&[entry(0, vec![1.0, 0.0])]).await.unwrap();

        let result = store.upsert(&[entry(1, vec![1.0, 0.0, 0.0])]).await;
        assert!(matches!(result, Err(RagError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryVectorStore::new();
        store.upsert(&[entry(0, vec![1.0])]).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
