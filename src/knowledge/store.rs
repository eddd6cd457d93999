//! Chunk Catalog - chunks.json 저장/로드
//!
//! 수집 실행 결과 청크 목록을 사람이 읽을 수 있는 JSON으로 남깁니다.
//! 저장 위치: `<CHUNKS_DIR>/chunks.json`

use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

use super::document::Chunk;

/// 청크 카탈로그 파일명
pub const CHUNKS_FILE_NAME: &str = "chunks.json";

/// chunks.json 파일 핸들
#[derive(Debug, Clone)]
pub struct ChunkCatalog {
    path: PathBuf,
}

impl ChunkCatalog {
    /// 디렉토리 안의 chunks.json을 가리키는 카탈로그
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(CHUNKS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 청크 목록 저장 (디렉토리가 없으면 생성, 기존 파일 덮어쓰기)
    pub fn save(&self, chunks: &[Chunk]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(chunks)?;
        std::fs::write(&self.path, json)?;

        tracing::info!("Saved {} chunks to {:?}", chunks.len(), self.path);
        Ok(())
    }

    /// 청크 목록 로드
    pub fn load(&self) -> Result<Vec<Chunk>> {
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| RagError::ingestion(&self.path, e))?;
        let chunks = serde_json::from_str(&json)?;
        Ok(chunks)
    }
}

// ============================================================================
// Tests
// ============================================================================
