//! pdfqa-rag - PDF 문서 기반 RAG 질의응답
//!
//! PDF → 청크 → Gemini 임베딩 → LanceDB 벡터 검색 → Groq LLM 답변 생성.
//! 검색 결과가 없으면 생성하지 않고 거절 메시지를 반환합니다.

pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod knowledge;
pub mod rag;

// Re-exports
pub use app::App;
pub use chat::{Conversation, ConversationMessage, Role};
pub use config::Settings;
pub use embedding::{EmbeddingProvider, GeminiEmbedding};
pub use error::{RagError, Result};
pub use extractor::{load_pdfs, FileOutcome, FileStatus, LoadReport};
pub use generation::{GroqGenerator, ResponseGenerator, TokenStream};
pub use ingest::{IngestEvent, IngestReport, Ingestor};
pub use knowledge::{
    chunk_documents, Chunk, ChunkConfig, ChunkMetadata, Chunker, Document, InMemoryVectorStore,
    LanceVectorStore, RecursiveChunker, VectorEntry, VectorStore,
};
pub use rag::{format_context, RagAnswer, RagPipeline, RetrievedChunk, Retriever, REFUSAL_MESSAGE};
