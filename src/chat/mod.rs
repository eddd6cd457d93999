//! 대화 기록 (세션 단위, 추가 전용)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rag::RetrievedChunk;

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 대화 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    /// 어시스턴트 답변의 근거 청크
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<RetrievedChunk>>,
    pub created_at: DateTime<Utc>,
}

/// 대화
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &ConversationMessage {
        self.push(Role::User, content.into(), None)
    }

    /// 근거가 없으면(거절 응답) sources는 None
    pub fn push_assistant(
        &mut self,
        content: impl Into<String>,
        sources: Vec<RetrievedChunk>,
    ) -> &ConversationMessage {
        let sources = if sources.is_empty() { None } else { Some(sources) };
        self.push(Role::Assistant, content.into(), sources)
    }

    fn push(
        &mut self,
        role: Role,
        content: String,
        sources: Option<Vec<RetrievedChunk>>,
    ) -> &ConversationMessage {
        self.messages.push(ConversationMessage {
            role,
            content,
            sources,
            created_at: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 전체 기록 삭제
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ChunkMetadata;

    fn source() -> RetrievedChunk {
        RetrievedChunk {
            content: "The sky is blue.".to_string(),
            metadata: ChunkMetadata {
                source: "sky.pdf".to_string(),
                page: 1,
                chunk_id: 0,
            },
            score: 0.42,
        }
    }

    #[test]
    fn test_append_order_and_clear() {
        let mut conversation = Conversation::new();
        conversation.push_user("What color is the sky?");
        conversation.push_assistant("Blue.", vec![source()]);

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, Role::User);
        assert_eq!(conversation.messages()[1].role, Role::Assistant);
        assert!(conversation.messages()[0].created_at <= conversation.messages()[1].created_at);

        conversation.clear();
        assert!(conversation.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi");
        conversation.push_assistant("Blue.", vec![source()]);

        let value = serde_json::to_value(conversation.messages()).unwrap();
        assert_eq!(value[0]["role"], "user");
        assert!(value[0].get("sources").is_none());
        assert_eq!(value[1]["role"], "assistant");
        assert_eq!(value[1]["sources"][0]["metadata"]["source"], "sky.pdf");
    }

    #[test]
    fn test_refusal_has_no_sources() {
        let mut conversation = Conversation::new();
        let message = conversation.push_assistant("nothing found", vec![]);
        assert!(message.sources.is_none());
    }
}
