//! 에러 타입
//!
//! 설정, 수집, 임베딩, 검색, 생성 단계별 에러를 구분합니다.

use std::path::PathBuf;

use thiserror::Error;

/// RAG 파이프라인 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 설정 오류 (API 키 누락, 잘못된 값). 시작 시점에 치명적입니다.
    #[error("Configuration error: {0}")]
    Config(String),

    /// 원본 파일을 읽거나 추출할 수 없음
    #[error("Ingestion error ({}): {message}", path.display())]
    Ingestion { path: PathBuf, message: String },

    /// 임베딩 생성 실패
    #[error("Embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    /// 벡터 저장소 접근 실패
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// LLM 호출 실패 또는 잘못된 응답
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RagError {
    pub(crate) fn ingestion(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Ingestion {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn embedding(provider: &str, message: impl ToString) -> Self {
        Self::Embedding {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }
}

/// 크레이트 전역 Result 타입
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_display_includes_path() {
        let err = RagError::ingestion("data/broken.pdf", "invalid xref table");
        let msg = err.to_string();
        assert!(msg.contains("data/broken.pdf"));
        assert!(msg.contains("invalid xref table"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RagError = io.into();
        assert!(matches!(err, RagError::Io(_)));
    }
}
