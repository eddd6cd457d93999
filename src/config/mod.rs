//! 설정 모듈
//!
//! 모든 설정값을 한 곳에서 관리합니다. 환경변수(및 `.env`)에서 읽고,
//! 없으면 기본값을 사용합니다.
//!
//! | 환경변수 | 기본값 |
//! |---|---|
//! | `DATA_DIR` | `data` |
//! | `CHUNKS_DIR` | `chunks` |
//! | `VECTORDB_DIR` | `vectordb` |
//! | `VECTOR_COLLECTION` | `document_chunks` |
//! | `EMBEDDING_MODEL` | `gemini-embedding-001` |
//! | `EMBEDDING_DIMENSION` | `768` |
//! | `CHUNK_SIZE` / `CHUNK_OVERLAP` | `800` / `100` |
//! | `GROQ_MODEL` | `llama-3.3-70b-versatile` |
//! | `LLM_BASE_URL` | `https://api.groq.com/openai/v1` |
//! | `TOP_K` | `5` |
//! | `MAX_DISTANCE` | 없음 |

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{RagError, Result};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CHUNKS_DIR: &str = "chunks";
pub const DEFAULT_VECTORDB_DIR: &str = "vectordb";
pub const DEFAULT_COLLECTION: &str = "document_chunks";
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
/// 약 150~200 단어
pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_TOP_K: usize = 5;

// ============================================================================
// Settings
// ============================================================================

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct Settings {
    /// PDF 원본 디렉토리
    pub data_dir: PathBuf,
    /// chunks.json 출력 디렉토리
    pub chunks_dir: PathBuf,
    /// LanceDB 저장 경로
    pub vectordb_dir: PathBuf,
    /// 벡터 컬렉션(테이블) 이름
    pub collection: String,

    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub embedding_api_key: Option<String>,

    /// 청크 최대 크기 (문자 수)
    pub chunk_size: usize,
    /// 청크 간 오버랩 (문자 수)
    pub chunk_overlap: usize,

    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_base_url: String,

    /// 기본 검색 개수
    pub top_k: usize,
    /// 이 거리보다 먼 청크는 근거로 쓰지 않음 (None이면 필터링 없음)
    pub max_distance: Option<f32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            chunks_dir: PathBuf::from(DEFAULT_CHUNKS_DIR),
            vectordb_dir: PathBuf::from(DEFAULT_VECTORDB_DIR),
            collection: DEFAULT_COLLECTION.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            embedding_api_key: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            top_k: DEFAULT_TOP_K,
            max_distance: None,
        }
    }
}

impl Settings {
    /// 프로세스 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 설정 로드
    ///
    /// 빈 문자열은 설정되지 않은 것으로 취급합니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let settings = Self {
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            chunks_dir: get("CHUNKS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.chunks_dir),
            vectordb_dir: get("VECTORDB_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.vectordb_dir),
            collection: get("VECTOR_COLLECTION").unwrap_or(defaults.collection),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_or(
                "EMBEDDING_DIMENSION",
                get("EMBEDDING_DIMENSION"),
                defaults.embedding_dimension,
            )?,
            // 우선순위: GEMINI_API_KEY > GOOGLE_AI_API_KEY
            embedding_api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_AI_API_KEY")),
            chunk_size: parse_or("CHUNK_SIZE", get("CHUNK_SIZE"), defaults.chunk_size)?,
            chunk_overlap: parse_or(
                "CHUNK_OVERLAP",
                get("CHUNK_OVERLAP"),
                defaults.chunk_overlap,
            )?,
            llm_api_key: get("GROQ_API_KEY"),
            llm_model: get("GROQ_MODEL").unwrap_or(defaults.llm_model),
            llm_base_url: get("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            top_k: parse_or("TOP_K", get("TOP_K"), defaults.top_k)?,
            max_distance: get("MAX_DISTANCE")
                .map(|v| parse_value::<f32>("MAX_DISTANCE", &v))
                .transpose()?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("CHUNK_SIZE must be greater than 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("TOP_K must be greater than 0".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("VECTOR_COLLECTION must not be empty".into()));
        }
        if let Some(max) = self.max_distance {
            if !max.is_finite() || max < 0.0 {
                return Err(RagError::Config(format!(
                    "MAX_DISTANCE must be a finite, non-negative number (got {})",
                    max
                )));
            }
        }
        Ok(())
    }

    /// LLM API 키 (없으면 설정 에러)
    pub fn require_llm_key(&self) -> Result<&str> {
        self.llm_api_key.as_deref().ok_or_else(|| {
            RagError::Config(
                "GROQ_API_KEY is not set.\n\
                 Set: export GROQ_API_KEY=your-api-key"
                    .into(),
            )
        })
    }

    /// 임베딩 API 키 (없으면 설정 에러)
    pub fn require_embedding_key(&self) -> Result<&str> {
        self.embedding_api_key.as_deref().ok_or_else(|| {
            RagError::Config(
                "GEMINI_API_KEY or GOOGLE_AI_API_KEY is not set.\n\
                 Set: export GEMINI_API_KEY=your-api-key\n\
                 Get your API key at: https://aistudio.google.com/app/apikey"
                    .into(),
            )
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| RagError::Config(format!("{} has an invalid value: '{}'", key, raw)))
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

// ============================================================================
// Tests
// ============================================================================
