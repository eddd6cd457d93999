//! LanceDB Vector Store - 임베디드 벡터 저장소
//!
//! 청크 텍스트, 메타데이터, 임베딩을 한 테이블(컬렉션)에 저장하고
//! L2 거리로 최근접 이웃을 검색합니다. 디스크 포맷은 LanceDB 소유입니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch,
    RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};

use crate::error::{RagError, Result};

use super::document::{Chunk, ChunkMetadata};
use super::vector::{SearchHit, VectorEntry, VectorStore};

fn store_error(context: &str, err: impl std::fmt::Display) -> RagError {
    RagError::Retrieval(format!("{}: {}", context, err))
}

// ============================================================================
// LanceVectorStore
// ============================================================================

/// LanceDB 벡터 저장소 구현
pub struct LanceVectorStore {
    db: Connection,
    table_name: String,
    dimension: i32,
}

impl LanceVectorStore {
    /// LanceDB 저장소 열기
    ///
    /// # Arguments
    /// * `path` - LanceDB 디렉토리 경로
    /// * `table_name` - 컬렉션 이름
    /// * `dimension` - 임베딩 차원
    pub async fn open(path: &Path, table_name: &str, dimension: usize) -> Result<Self> {
        if !path.exists() {
            tokio::fs::create_dir_all(path).await?;
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| RagError::Config(format!("Invalid path encoding: {:?}", path)))?;

        let dimension = i32::try_from(dimension)
            .map_err(|_| RagError::Config(format!("Embedding dimension too large: {}", dimension)))?;

        let db = lancedb::connect(path_str)
            .execute()
            .await
            .map_err(|e| store_error("Failed to connect to LanceDB", e))?;

        tracing::debug!("LanceDB opened at {:?} (table={})", path, table_name);

        Ok(Self {
            db,
            table_name: table_name.to_string(),
            dimension,
        })
    }

    /// 테이블 스키마
    fn schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("chunk_id", DataType::Int64, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("page", DataType::Int32, false),
            Field::new("word_count", DataType::Int32, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension,
                ),
                false,
            ),
        ])
    }

    /// 엔트리들을 Arrow RecordBatch로 변환
    fn entries_to_batch(&self, entries: &[VectorEntry]) -> Result<RecordBatch> {
        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.len() != self.dimension as usize)
        {
            return Err(RagError::Retrieval(format!(
                "embedding dimension mismatch for chunk {}: expected {}, got {}",
                bad.chunk.chunk_id,
                self.dimension,
                bad.embedding.len()
            )));
        }

        let chunk_ids: Vec<i64> = entries.iter().map(|e| e.chunk.chunk_id as i64).collect();
        let contents: Vec<&str> = entries.iter().map(|e| e.chunk.content.as_str()).collect();
        let sources: Vec<&str> = entries
            .iter()
            .map(|e| e.chunk.metadata.source.as_str())
            .collect();
        let pages: Vec<i32> = entries.iter().map(|e| e.chunk.metadata.page as i32).collect();
        let word_counts: Vec<i32> = entries.iter().map(|e| e.chunk.word_count as i32).collect();

        let embeddings_flat: Vec<f32> = entries
            .iter()
            .flat_map(|e| e.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list = FixedSizeListArray::try_new(
            field,
            self.dimension,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .map_err(|e| store_error("Failed to create embedding array", e))?;

        RecordBatch::try_new(
            Arc::new(self.schema()),
            vec![
                Arc::new(Int64Array::from(chunk_ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(sources)),
                Arc::new(Int32Array::from(pages)),
                Arc::new(Int32Array::from(word_counts)),
                Arc::new(embeddings_list),
            ],
        )
        .map_err(|e| store_error("Failed to create RecordBatch", e))
    }

    /// 테이블 존재 여부 확인
    async fn table_exists(&self) -> Result<bool> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| store_error("Failed to list tables", e))?;
        Ok(names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<lancedb::table::Table> {
        self.db
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| store_error("Failed to open table", e))
    }

    /// 검색 결과 배치를 SearchHit로 변환
    fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
        fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
            batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<T>())
                .ok_or_else(|| RagError::Retrieval(format!("Missing {} column", name)))
        }

        let chunk_ids = column::<Int64Array>(batch, "chunk_id")?;
        let contents = column::<StringArray>(batch, "content")?;
        let sources = column::<StringArray>(batch, "source")?;
        let pages = column::<Int32Array>(batch, "page")?;
        let word_counts = column::<Int32Array>(batch, "word_count")?;
        // _distance 컬럼 (LanceDB가 자동 추가)
        let distances = column::<Float32Array>(batch, "_distance")?;

        let hits = (0..batch.num_rows())
            .map(|i| {
                let chunk_id = chunk_ids.value(i) as u64;
                SearchHit {
                    chunk: Chunk {
                        chunk_id,
                        content: contents.value(i).to_string(),
                        metadata: ChunkMetadata {
                            source: sources.value(i).to_string(),
                            page: pages.value(i).max(0) as usize,
                            chunk_id,
                        },
                        word_count: word_counts.value(i).max(0) as usize,
                    },
                    distance: distances.value(i),
                }
            })
            .collect();

        Ok(hits)
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let batch = self.entries_to_batch(entries)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if self.table_exists().await? {
            let table = self.open_table().await?;

            // 같은 chunk_id는 먼저 지우고 추가 (재수집 시 중복 방지)
            let ids: Vec<String> = entries
                .iter()
                .map(|e| (e.chunk.chunk_id as i64).to_string())
                .collect();
            let filter = format!("chunk_id IN ({})", ids.join(", "));
            table
                .delete(&filter)
                .await
                .map_err(|e| store_error("Failed to delete replaced vectors", e))?;

            table
                .add(batches)
                .execute()
                .await
                .map_err(|e| store_error("Failed to add vectors to table", e))?;
        } else {
            self.db
                .create_table(&self.table_name, batches)
                .execute()
                .await
                .map_err(|e| store_error("Failed to create table", e))?;
        }

        tracing::debug!("Upserted {} vectors into {}", entries.len(), self.table_name);
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 || !self.table_exists().await? {
            return Ok(vec![]);
        }

        let table = self.open_table().await?;

        let results = table
            .vector_search(query_embedding.to_vec())
            .map_err(|e| store_error("Failed to create vector search", e))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| store_error("Failed to execute vector search", e))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| store_error("Failed to read search results", e))?;

        let mut hits = Vec::new();
        for batch in &batches {
            hits.extend(Self::batch_to_hits(batch)?);
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(limit);

        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        let table = self.open_table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| store_error("Failed to count rows", e))
    }

    async fn clear(&self) -> Result<()> {
        if self.table_exists().await? {
            self.db
                .drop_table(self.table_name.as_str())
                .await
                .map_err(|e| store_error("Failed to drop table", e))?;
            tracing::info!("Dropped collection {}", self.table_name);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "lancedb"
    }
}

// ============================================================================
// Tests
// ============================================================================
