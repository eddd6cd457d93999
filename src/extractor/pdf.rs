//! PDF 텍스트 추출
//!
//! pdf-extract 크레이트로 페이지별 텍스트를 추출합니다.

use std::path::Path;

use crate::error::{RagError, Result};

/// PDF에서 페이지별 텍스트 추출
///
/// (페이지 번호, 텍스트) 목록을 반환합니다. 페이지 번호는 1부터 시작하며
/// 텍스트가 없는 페이지도 번호를 유지하기 위해 빈 문자열로 남깁니다.
/// 블로킹 함수이므로 async 컨텍스트에서는 `spawn_blocking`으로 호출해야 합니다.
pub fn extract_pages(path: &Path) -> Result<Vec<(usize, String)>> {
    let bytes = std::fs::read(path)
        .map_err(|e| RagError::ingestion(path, format!("read failed: {}", e)))?;

    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| RagError::ingestion(path, format!("text extraction failed: {}", e)))?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
    }

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i + 1, text.trim().to_string()))
        .collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::two_page_pdf;

    #[test]
    fn test_extract_pages_keeps_page_numbers() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("two.pdf");
        std::fs::write(&path, two_page_pdf()).unwrap();

        let pages = extract_pages(&path).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].0, 1);
        assert!(pages[0].1.contains("Alpha first page"));
        assert!(!pages[0].1.contains("Omega"));
        assert_eq!(pages[1].0, 2);
        assert!(pages[1].1.contains("Omega second page"));
    }

    #[test]
    fn test_extract_missing_file_is_ingestion_error() {
        let result = extract_pages(Path::new("/nonexistent/never.pdf"));
        assert!(matches!(
            result,
            Err(crate::error::RagError::Ingestion { .. })
        ));
    }
}
