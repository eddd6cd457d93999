//! 문서 로더 - 데이터 디렉토리의 PDF를 페이지 단위 Document로 변환
//!
//! 파일 하나가 깨져도 배치 전체를 중단하지 않습니다.
//! 파일별 결과(성공 페이지 수 / 실패 사유)를 `LoadReport`에 모아 돌려줍니다.

pub mod pdf;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{RagError, Result};
use crate::knowledge::Document;

// ============================================================================
// Load Report
// ============================================================================

/// 파일 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Loaded { pages: usize },
    Failed { reason: String },
}

/// 파일별 결과
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub file_name: String,
    pub path: PathBuf,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self.status, FileStatus::Loaded { .. })
    }
}

/// 배치 로드 결과
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// 성공한 파일들의 페이지 (파일명 순, 페이지 순)
    pub documents: Vec<Document>,
    pub files: Vec<FileOutcome>,
}

impl LoadReport {
    /// PDF가 하나도 없었는지 ("0개 발견"과 "전부 실패"를 구분)
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| !f.is_loaded()).count()
    }

    pub fn page_count(&self) -> usize {
        self.documents.len()
    }
}

// ============================================================================
// Loader
// ============================================================================

/// 디렉토리 최상위의 PDF 파일 목록 (파일명 정렬)
pub fn find_pdfs(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Err(RagError::ingestion(data_dir, "data directory not found"));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(data_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| RagError::ingestion(data_dir, e))?;
        if entry.file_type().is_file() && is_pdf(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// 디렉토리의 모든 PDF 로드
///
/// 텍스트 추출은 CPU 바운드이므로 blocking 태스크에서 실행합니다.
pub async fn load_pdfs(data_dir: &Path) -> Result<LoadReport> {
    let files = find_pdfs(data_dir)?;
    tracing::info!("Found {} PDF files in {}", files.len(), data_dir.display());

    let mut report = LoadReport::default();

    for path in files {
        let file_name = file_name_of(&path);
        let task_path = path.clone();
        let extracted = tokio::task::spawn_blocking(move || pdf::extract_pages(&task_path)).await;

        let status = match extracted {
            Ok(Ok(pages)) => {
                let count = pages.len();
                report.documents.extend(
                    pages
                        .into_iter()
                        .map(|(page, text)| Document::new(text, file_name.as_str(), page)),
                );
                tracing::info!("Loaded {} ({} pages)", file_name, count);
                FileStatus::Loaded { pages: count }
            }
            Ok(Err(e)) => {
                tracing::warn!("Skipping {}: {}", file_name, e);
                FileStatus::Failed {
                    reason: e.to_string(),
                }
            }
            // pdf-extract는 일부 손상 파일에서 panic
            Err(e) => {
                tracing::warn!("Skipping {}: extraction aborted ({})", file_name, e);
                FileStatus::Failed {
                    reason: format!("extraction aborted: {}", e),
                }
            }
        };

        report.files.push(FileOutcome {
            file_name,
            path,
            status,
        });
    }

    Ok(report)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 페이지마다 한 줄씩 적힌 최소 PDF (xref 오프셋 계산 포함)
#[cfg(test)]
pub(crate) fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
    let font_id = 3 + lines.len() * 2;
    let kids: Vec<String> = (0..lines.len())
        .map(|i| format!("{} 0 R", 3 + i * 2))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            lines.len()
        ),
    ];
    for (i, line) in lines.iter().enumerate() {
        let content = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", line);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
            font_id,
            4 + i * 2
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

#[cfg(test)]
pub(crate) fn two_page_pdf() -> Vec<u8> {
    pdf_with_pages(&["Alpha first page", "Omega second page"])
}

// ============================================================================
// Tests
// ============================================================================
