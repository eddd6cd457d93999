//! OpenAI 호환 Server-Sent Events 디코더
//!
//! 바이트 청크를 받아 완성된 줄 단위로 이벤트를 만듭니다.
//! 줄이 네트워크 청크 경계에서 잘려도 (UTF-8 다중 바이트 포함) 다음 청크와 합쳐 처리합니다.

use serde::Deserialize;

use crate::error::{RagError, Result};

/// 디코딩된 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// 비어 있지 않은 텍스트 델타
    Delta(String),
    /// `data: [DONE]`
    Done,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

/// 증분 SSE 디코더
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `[DONE]`을 이미 받았는지
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 바이트 청크를 넣고 완성된 이벤트들을 꺼냄
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>> {
        let mut events = Vec::new();
        if self.done {
            return Ok(events);
        }

        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line)? {
                let is_done = event == SseEvent::Done;
                events.push(event);
                if is_done {
                    self.done = true;
                    self.buffer.clear();
                    break;
                }
            }
        }

        Ok(events)
    }

    /// 스트림 종료 시 개행 없이 남은 마지막 줄 처리
    pub fn finish(&mut self) -> Result<Vec<SseEvent>> {
        if self.done || self.buffer.is_empty() {
            return Ok(vec![]);
        }
        let line = std::mem::take(&mut self.buffer);
        let event = parse_line(&line)?;
        if event == Some(SseEvent::Done) {
            self.done = true;
        }
        Ok(event.into_iter().collect())
    }
}

fn parse_line(raw: &[u8]) -> Result<Option<SseEvent>> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();

    // 빈 줄, 주석(keep-alive), event:/id: 필드는 무시
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: CompletionChunk = serde_json::from_str(data)
        .map_err(|e| RagError::Generation(format!("Malformed stream chunk: {} ({})", e, data)))?;

    if let Some(error) = chunk.error {
        return Err(RagError::Generation(format!("Upstream error: {}", error.message)));
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|c| !c.is_empty());

    Ok(content.map(SseEvent::Delta))
}

// ============================================================================
// Tests
// ============================================================================
