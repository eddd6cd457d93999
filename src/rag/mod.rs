//! RAG 모듈 - 검색, 컨텍스트 구성, 근거 기반 답변

mod context;
mod pipeline;
mod retriever;

pub use context::{format_context, CHUNK_DELIMITER};
pub use pipeline::{RagAnswer, RagPipeline, RagTextAnswer, REFUSAL_MESSAGE};
pub use retriever::{RetrievedChunk, Retriever};
