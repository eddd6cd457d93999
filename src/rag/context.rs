//! 검색 결과를 프롬프트용 컨텍스트 블록으로 변환

use super::retriever::RetrievedChunk;

/// 청크 사이 구분자
pub const CHUNK_DELIMITER: &str = "\n\n---\n\n";

/// 청크별로 `[Chunk i] (Source: ..., Page: ...)` 라벨을 붙여 연결
///
/// 입력 순서(관련도 순)를 유지하며 본문은 자르거나 바꾸지 않습니다.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Chunk {}] (Source: {}, Page: {})\n{}",
                i + 1,
                chunk.metadata.source,
                chunk.metadata.page,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join(CHUNK_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ChunkMetadata;

    fn retrieved(content: &str, source: &str, page: usize, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                page,
                chunk_id: 0,
            },
            score,
        }
    }

    #[test]
    fn test_labels_and_order() {
        let context = format_context(&[
            retrieved("The sky is blue.", "sky.pdf", 1, 0.1),
            retrieved("Grass is green.", "nature.pdf", 4, 0.7),
        ]);

        assert_eq!(
            context,
            "[Chunk 1] (Source: sky.pdf, Page: 1)\nThe sky is blue.\
             \n\n---\n\n\
             [Chunk 2] (Source: nature.pdf, Page: 4)\nGrass is green."
        );
    }

    #[test]
    fn test_content_kept_verbatim() {
        let body = "  line one\n\nline two  ";
        let context = format_context(&[retrieved(body, "a.pdf", 2, 0.0)]);
        assert!(context.ends_with(body));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(format_context(&[]), "");
    }
}
