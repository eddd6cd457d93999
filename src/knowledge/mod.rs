//! Knowledge 모듈 - 청크와 벡터 인덱스
//!
//! - Document/Chunk: 페이지 단위 원문과 검색 단위 청크
//! - Chunker: 경계 우선순위 기반 재귀 분할
//! - Catalog: chunks.json 저장
//! - VectorStore: LanceDB (디스크), In-memory (테스트)

mod chunker;
mod document;
mod lance;
mod memory;
mod store;
mod vector;

// Re-exports
pub use chunker::{
    chunk_documents, chunker_from_settings, default_chunker, ChunkConfig, Chunker,
    RecursiveChunker, DEFAULT_SEPARATORS,
};
pub use document::{Chunk, ChunkMetadata, Document};
pub use lance::LanceVectorStore;
pub use memory::InMemoryVectorStore;
pub use store::{ChunkCatalog, CHUNKS_FILE_NAME};
pub use vector::{l2_distance, round_score, SearchHit, VectorEntry, VectorStore};
