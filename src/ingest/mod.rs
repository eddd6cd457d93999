//! 수집 파이프라인 (배치 작업)
//!
//! 1. PDF 로드 → 페이지
//! 2. 청크 분할
//! 3. chunks.json 저장
//! 4. 임베딩 + 벡터 저장소 upsert

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::extractor::{load_pdfs, FileOutcome, LoadReport};
use crate::knowledge::{chunk_documents, Chunk, ChunkCatalog, Chunker, VectorEntry, VectorStore};

/// 한 번에 임베딩/저장하는 청크 수
pub const EMBED_BATCH_SIZE: usize = 32;

/// 수집 결과
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub files: Vec<FileOutcome>,
    pub page_count: usize,
    pub chunk_count: usize,
    /// 저장된 chunks.json 경로 (PDF가 없으면 None)
    pub chunks_file: Option<PathBuf>,
    /// 수집 후 저장소의 전체 청크 수
    pub stored_total: usize,
}

impl IngestReport {
    pub fn loaded_files(&self) -> usize {
        self.files.iter().filter(|f| f.is_loaded()).count()
    }

    pub fn failed_files(&self) -> usize {
        self.files.len() - self.loaded_files()
    }
}

/// 수집 단계 진행 알림 (CLI 출력용)
#[derive(Debug)]
pub enum IngestEvent<'a> {
    /// PDF 로드 완료
    Loaded(&'a LoadReport),
    Chunked { pages: usize, chunks: usize },
    Saved(&'a Path),
    /// 임베딩/저장 시작
    Indexing { chunks: usize, rebuild: bool },
}

/// 수집기
pub struct Ingestor {
    chunker: Box<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(
        chunker: Box<dyn Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Step 1
    pub async fn load(&self, data_dir: &Path) -> Result<LoadReport> {
        load_pdfs(data_dir).await
    }

    /// Step 2
    pub fn chunk(&self, report: &LoadReport) -> Vec<Chunk> {
        chunk_documents(&report.documents, self.chunker.as_ref())
    }

    /// Step 3
    pub fn save(&self, chunks: &[Chunk], chunks_dir: &Path) -> Result<PathBuf> {
        let catalog = ChunkCatalog::in_dir(chunks_dir);
        catalog.save(chunks)?;
        Ok(catalog.path().to_path_buf())
    }

    /// Step 4: 배치 단위 임베딩 후 upsert, 저장소 전체 청크 수 반환
    pub async fn index(&self, chunks: &[Chunk], rebuild: bool) -> Result<usize> {
        if rebuild {
            self.store.clear().await?;
        }

        for (i, batch) in chunks.chunks(EMBED_BATCH_SIZE).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            let entries: Vec<VectorEntry> = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| VectorEntry { chunk, embedding })
                .collect();

            self.store.upsert(&entries).await?;
            tracing::debug!(
                "Indexed batch {} ({} chunks) into {}",
                i + 1,
                entries.len(),
                self.store.name()
            );
        }

        self.store.count().await
    }

    /// 전체 실행
    ///
    /// 단계마다 `progress`에 진행 상황을 알립니다.
    /// PDF가 하나도 없으면 청크 파일을 만들지 않고 빈 보고서를 반환합니다.
    pub async fn run<F>(
        &self,
        data_dir: &Path,
        chunks_dir: &Path,
        rebuild: bool,
        mut progress: F,
    ) -> Result<IngestReport>
    where
        F: FnMut(IngestEvent<'_>),
    {
        let loaded = self.load(data_dir).await?;
        progress(IngestEvent::Loaded(&loaded));
        if loaded.is_empty() {
            tracing::warn!("No PDF files found in {}", data_dir.display());
            return Ok(IngestReport::default());
        }

        let chunks = self.chunk(&loaded);
        tracing::info!(
            "Created {} chunks from {} pages",
            chunks.len(),
            loaded.page_count()
        );
        progress(IngestEvent::Chunked {
            pages: loaded.page_count(),
            chunks: chunks.len(),
        });

        let chunks_file = self.save(&chunks, chunks_dir)?;
        progress(IngestEvent::Saved(&chunks_file));

        progress(IngestEvent::Indexing {
            chunks: chunks.len(),
            rebuild,
        });
        let stored_total = self.index(&chunks, rebuild).await?;
        tracing::info!("Vector store now holds {} chunks", stored_total);

        Ok(IngestReport {
            page_count: loaded.page_count(),
            files: loaded.files,
            chunk_count: chunks.len(),
            chunks_file: Some(chunks_file),
            stored_total,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{default_chunker, Document, InMemoryVectorStore};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct WordCountEmbedding;

    #[async_trait]
    impl EmbeddingProvider for WordCountEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.split_whitespace().count() as f32, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "word-count"
        }
    }

    fn ingestor(store: Arc<InMemoryVectorStore>) -> Ingestor {
        Ingestor::new(default_chunker(), Arc::new(WordCountEmbedding), store)
    }

    fn sky_report() -> LoadReport {
        LoadReport {
            documents: vec![Document::new("The sky is blue.", "sky.pdf", 1)],
            files: vec![],
        }
    }

    #[tokio::test]
    async fn test_index_and_reindex_is_idempotent() {
        let store = Arc::new(InMemoryVectorStore::new());
        let ingestor = ingestor(store.clone());
        let chunks = ingestor.chunk(&sky_report());
        assert_eq!(chunks.len(), 1);

        assert_eq!(ingestor.index(&chunks, false).await.unwrap(), 1);
        assert_eq!(ingestor.index(&chunks, false).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_clears_previous_rows() {
        let store = Arc::new(InMemoryVectorStore::new());
        let ingestor = ingestor(store.clone());

        let many: Vec<Chunk> = (0..40)
            .map(|i| Chunk::new(i, format!("chunk number {}", i), "big.pdf", 1))
            .collect();
        assert_eq!(ingestor.index(&many, false).await.unwrap(), 40);

        let chunks = ingestor.chunk(&sky_report());
        assert_eq!(ingestor.index(&chunks, true).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_writes_catalog() {
        let dir = TempDir::new().unwrap();
        let ingestor = ingestor(Arc::new(InMemoryVectorStore::new()));
        let chunks = ingestor.chunk(&sky_report());

        let path = ingestor.save(&chunks, &dir.path().join("chunks")).unwrap();
        assert!(path.ends_with("chunks.json"));
        assert_eq!(ChunkCatalog::in_dir(&dir.path().join("chunks")).load().unwrap(), chunks);
    }

    #[tokio::test]
    async fn test_run_without_pdfs_writes_nothing() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let ingestor = ingestor(Arc::new(InMemoryVectorStore::new()));

        let report = ingestor
            .run(data.path(), &out.path().join("chunks"), false, |_| {})
            .await
            .unwrap();

        assert!(report.files.is_empty());
        assert!(report.chunks_file.is_none());
        assert!(!out.path().join("chunks").exists());
    }

    #[tokio::test]
    async fn test_run_reports_each_step() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        std::fs::write(
            data.path().join("guide.pdf"),
            crate::extractor::two_page_pdf(),
        )
        .unwrap();
        std::fs::write(data.path().join("broken.pdf"), b"not really a pdf").unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        let ingestor = ingestor(store.clone());
        let mut steps = Vec::new();

        let report = ingestor
            .run(data.path(), &out.path().join("chunks"), true, |event| {
                steps.push(match event {
                    IngestEvent::Loaded(loaded) => format!("loaded {}", loaded.files.len()),
                    IngestEvent::Chunked { pages, chunks } => {
                        format!("chunked {} {}", pages, chunks)
                    }
                    IngestEvent::Saved(path) => {
                        assert!(path.ends_with("chunks.json"));
                        "saved".to_string()
                    }
                    IngestEvent::Indexing { chunks, rebuild } => {
                        format!("indexing {} {}", chunks, rebuild)
                    }
                })
            })
            .await
            .unwrap();

        assert_eq!(
            steps,
            vec!["loaded 2", "chunked 2 2", "saved", "indexing 2 true"]
        );
        assert_eq!(report.loaded_files(), 1);
        assert_eq!(report.failed_files(), 1);
        assert_eq!(report.page_count, 2);
        assert_eq!(report.chunk_count, 2);
        assert_eq!(report.stored_total, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_missing_data_dir_is_error() {
        let ingestor = ingestor(Arc::new(InMemoryVectorStore::new()));
        let result = ingestor
            .run(
                Path::new("/nonexistent/data"),
                Path::new("/tmp/unused"),
                false,
                |_| {},
            )
            .await;
        assert!(result.is_err());
    }
}
