//! Text Chunking Module
//!
//! 경계 우선순위(문단 → 줄 → 문장 → 단어 → 문자)를 따르는 재귀 분할기입니다.
//! 크기 제한을 넘는 조각은 다음 우선순위 구분자로 다시 나누고,
//! 작은 조각들은 최대 크기까지 병합하면서 앞 청크의 끝부분을 오버랩으로 남깁니다.
//!
//! 길이는 모두 문자 수(`chars().count()`) 기준입니다.

use std::collections::VecDeque;

use crate::config::Settings;

use super::document::{Chunk, Document};

/// 기본 구분자 (우선순위 순)
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수)
    pub max_characters: usize,
    /// 오버랩 크기 (문자 수)
    pub overlap_characters: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_characters: crate::config::DEFAULT_CHUNK_SIZE,
            overlap_characters: crate::config::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    pub fn new(max_characters: usize, overlap_characters: usize) -> Self {
        Self {
            max_characters,
            overlap_characters,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크 문자열로 분할 (빈 청크 없음)
    fn split_text(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// RecursiveChunker
// ============================================================================

/// 구분자 우선순위 기반 재귀 청커
pub struct RecursiveChunker {
    config: ChunkConfig,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// 설정으로 생성 (기본 구분자)
    pub fn new(config: ChunkConfig) -> Self {
        Self::with_separators(config, &DEFAULT_SEPARATORS)
    }

    /// 구분자를 지정하여 생성
    pub fn with_separators(config: ChunkConfig, separators: &[&str]) -> Self {
        let config = ChunkConfig {
            max_characters: config.max_characters.max(1),
            overlap_characters: config
                .overlap_characters
                .min(config.max_characters.saturating_sub(1)),
        };
        Self {
            config,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // 텍스트에 존재하는 가장 우선순위 높은 구분자 선택
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                remaining = &[];
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let max = self.config.max_characters;
        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < max {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }

            if remaining.is_empty() {
                chunks.extend(hard_cut(piece, max));
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending));
        }

        chunks
    }

    /// 작은 조각들을 최대 크기까지 병합 (앞 청크의 꼬리를 오버랩으로 유지)
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let max = self.config.max_characters;
        let overlap = self.config.overlap_characters;

        let mut merged = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > max && !window.is_empty() {
                push_joined(&window, &mut merged);

                while total > overlap || (total + len > max && total > 0) {
                    match window.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            push_joined(&window, &mut merged);
        }

        merged
    }
}

impl Chunker for RecursiveChunker {
    fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        let mut chunks = self.split_recursive(text, &self.separators);
        chunks.retain(|c| !c.trim().is_empty());
        chunks
    }

    fn name(&self) -> &'static str {
        "RecursiveChunker"
    }
}

// ============================================================================
// Document → Chunk
// ============================================================================

/// 문서들을 청크로 분할하고 실행 단위로 순차 ID 부여
///
/// 각 청크는 원본 문서의 source/page를 상속합니다. 오버랩은 같은 페이지 안에서만 생깁니다.
pub fn chunk_documents(documents: &[Document], chunker: &dyn Chunker) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut next_id: u64 = 0;

    for doc in documents {
        for text in chunker.split_text(&doc.text) {
            chunks.push(Chunk::new(next_id, text, &doc.source, doc.page));
            next_id += 1;
        }
    }

    tracing::debug!(
        "{} split {} documents into {} chunks",
        chunker.name(),
        documents.len(),
        chunks.len()
    );

    chunks
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 구분자를 앞 조각 끝에 붙인 채로 분할. 빈 구분자는 문자 단위 분할.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        pieces.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// 구분자로 더 나눌 수 없을 때 문자 수 기준으로 자르기
fn hard_cut(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max)
        .map(|c| c.iter().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn push_joined(window: &VecDeque<(&str, usize)>, out: &mut Vec<String>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성 (800/100)
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(RecursiveChunker::new(ChunkConfig::default()))
}

/// 설정값으로 청커 생성
pub fn chunker_from_settings(settings: &Settings) -> Box<dyn Chunker> {
    Box::new(RecursiveChunker::new(ChunkConfig::from_settings(settings)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max: usize, overlap: usize) -> RecursiveChunker {
        RecursiveChunker::new(ChunkConfig::new(max, overlap))
    }

    /// b의 접두사이면서 a의 접미사인 가장 긴 문자열 길이
    fn shared_overlap(a: &str, b: &str) -> usize {
        (1..=b.len().min(a.len()))
            .rev()
            .filter(|&k| b.is_char_boundary(k))
            .find(|&k| a.ends_with(&b[..k]))
            .unwrap_or(0)
    }

    #[test]
    fn test_chunker_empty() {
        let chunks = chunker(800, 100).split_text("");
        assert!(chunks.is_empty());

        let chunks = chunker(800, 100).split_text("   \n\n  ");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunker(800, 100).split_text("The sky is blue.");
        assert_eq!(chunks, vec!["The sky is blue.".to_string()]);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let p1 = "a".repeat(30) + " " + &"b".repeat(29);
        let p2 = "c".repeat(30) + " " + &"d".repeat(29);
        let text = format!("{}\n\n{}", p1, p2);

        let chunks = chunker(100, 10).split_text(&text);
        assert_eq!(chunks, vec![p1, p2]);
    }

    #[test]
    fn test_falls_back_to_sentences() {
        let text = "First sentence is here. Second sentence is here. Third sentence is here.";
        let chunks = chunker(50, 0).split_text(text);

        assert!(chunks.len() >= 2);
        assert!(chunks[0].starts_with("First sentence"));
        assert!(chunks[0].ends_with('.'));
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
    }

    #[test]
    fn test_respects_max_size() {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!("Paragraph {} talks about topic {}. ", i, i * 7));
            if i % 3 == 0 {
                text.push_str("\n\n");
            }
            if i % 5 == 0 {
                text.push('\n');
            }
        }
        // 구분자 없이 긴 토큰 (문자 단위 분할로 떨어짐)
        text.push_str(&"x".repeat(250));

        let chunks = chunker(100, 20).split_text(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.chars().count() <= 100, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text: String = (0..200).map(|i| format!("word{} ", i)).collect();
        let chunks = chunker(100, 30).split_text(&text);

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let shared = shared_overlap(&pair[0], &pair[1]);
            assert!(shared > 0, "no overlap between {:?} and {:?}", pair[0], pair[1]);
            assert!(shared <= 30);
        }
    }

    #[test]
    fn test_unicode_lengths_by_chars() {
        let text = "안녕하세요 세계 ".repeat(60);
        let chunks = chunker(50, 10).split_text(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let chunks = RecursiveChunker::with_separators(ChunkConfig::new(10, 0), &[" "])
            .split_text(&"y".repeat(25));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn test_chunk_documents_sequential_ids() {
        let docs = vec![
            Document::new("The sky is blue.", "sky.pdf", 1),
            Document::new("", "sky.pdf", 2),
            Document::new("Grass is green.\n\nRoses are red.", "garden.pdf", 1),
        ];
        let chunks = chunk_documents(&docs, &chunker(20, 5));

        let ids: Vec<u64> = chunks.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, (0..chunks.len() as u64).collect::<Vec<_>>());

        assert_eq!(chunks[0].metadata.source, "sky.pdf");
        assert_eq!(chunks[0].metadata.page, 1);
        assert!(chunks[1..].iter().all(|c| c.metadata.source == "garden.pdf"));
        assert!(chunks.iter().all(|c| c.metadata.chunk_id == c.chunk_id));
    }

    #[test]
    fn test_sky_scenario_default_config() {
        let docs = vec![Document::new("The sky is blue.", "sky.pdf", 1)];
        let chunks = chunk_documents(&docs, default_chunker().as_ref());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].metadata.source, "sky.pdf");
        assert_eq!(chunks[0].word_count, 4);
    }

    #[test]
    fn test_split_keeping_separator() {
        let pieces = split_keeping_separator("a. b. c", ". ");
        assert_eq!(pieces, vec!["a. ", "b. ", "c"]);

        let pieces = split_keeping_separator("세계", "");
        assert_eq!(pieces, vec!["세", "계"]);
    }
}
