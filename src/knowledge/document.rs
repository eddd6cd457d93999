//! 문서/청크 데이터 모델

use serde::{Deserialize, Serialize};

/// PDF에서 추출한 한 페이지 단위의 원문
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    /// 원본 파일명 (경로 제외)
    pub source: String,
    /// 페이지 번호 (1부터 시작)
    pub page: usize,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: usize) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page,
        }
    }
}

/// 청크 메타데이터 (원본 문서에서 상속 + chunk_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: usize,
    pub chunk_id: u64,
}

/// 검색 단위가 되는 텍스트 청크
///
/// JSON 직렬화 형식: `{chunk_id, content, metadata: {source, page, chunk_id}, word_count}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: u64,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub word_count: usize,
}

impl Chunk {
    pub fn new(chunk_id: u64, content: String, source: &str, page: usize) -> Self {
        let word_count = content.split_whitespace().count();
        Self {
            chunk_id,
            content,
            metadata: ChunkMetadata {
                source: source.to_string(),
                page,
                chunk_id,
            },
            word_count,
        }
    }
}
