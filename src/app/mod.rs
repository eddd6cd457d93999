//! 서비스 컨테이너
//!
//! 임베딩 프로바이더, 벡터 저장소, 생성기를 프로세스 수명 동안 한 번만 만들고
//! 핸들(`Arc`)로 공유합니다. 동시에 처음 접근해도 초기화는 한 번만 실행됩니다.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::Settings;
use crate::embedding::{EmbeddingProvider, GeminiEmbedding};
use crate::error::Result;
use crate::generation::{GroqGenerator, ResponseGenerator};
use crate::knowledge::{LanceVectorStore, VectorStore};
use crate::rag::{RagPipeline, Retriever};

/// 애플리케이션 서비스
pub struct App {
    settings: Settings,
    embedder: OnceCell<Arc<dyn EmbeddingProvider>>,
    store: OnceCell<Arc<dyn VectorStore>>,
    generator: OnceCell<Arc<dyn ResponseGenerator>>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            embedder: OnceCell::new(),
            store: OnceCell::new(),
            generator: OnceCell::new(),
        }
    }

    /// 미리 만든 컴포넌트 주입 (테스트, 오프라인 실행)
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Self {
        Self {
            settings,
            embedder: OnceCell::from(embedder),
            store: OnceCell::from(store),
            generator: OnceCell::from(generator),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let embedder = self
            .embedder
            .get_or_try_init(|| async {
                let embedder = GeminiEmbedding::from_settings(&self.settings)?;
                Ok::<_, crate::error::RagError>(Arc::new(embedder) as Arc<dyn EmbeddingProvider>)
            })
            .await?;
        Ok(Arc::clone(embedder))
    }

    pub async fn vector_store(&self) -> Result<Arc<dyn VectorStore>> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let store = LanceVectorStore::open(
                    &self.settings.vectordb_dir,
                    &self.settings.collection,
                    self.settings.embedding_dimension,
                )
                .await?;
                Ok::<_, crate::error::RagError>(Arc::new(store) as Arc<dyn VectorStore>)
            })
            .await?;
        Ok(Arc::clone(store))
    }

    pub async fn generator(&self) -> Result<Arc<dyn ResponseGenerator>> {
        let generator = self
            .generator
            .get_or_try_init(|| async {
                let generator = GroqGenerator::from_settings(&self.settings)?;
                Ok::<_, crate::error::RagError>(
                    Arc::new(generator) as Arc<dyn ResponseGenerator>
                )
            })
            .await?;
        Ok(Arc::clone(generator))
    }

    /// 공유 핸들로 파이프라인 구성
    pub async fn pipeline(&self) -> Result<RagPipeline> {
        // 생성기 설정 오류를 검색 전에 드러내기 위해 먼저 초기화
        let generator = self.generator().await?;
        let retriever = Retriever::new(
            self.embedder().await?,
            self.vector_store().await?,
            self.settings.top_k,
        );

        Ok(RagPipeline::new(retriever, generator).with_max_distance(self.settings.max_distance))
    }
}

// ============================================================================
// Tests
// ============================================================================
