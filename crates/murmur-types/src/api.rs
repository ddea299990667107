use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{TextMessage, VoiceMessage};

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
}

/// A user reference as clients send it: the terminal client posts ids
/// as JSON numbers, form posts carry them as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(i64),
    Text(String),
}

impl UserRef {
    /// `None` for an empty string, `Some(Err)` for a non-numeric one.
    pub fn resolve(&self) -> Option<Result<i64, std::num::ParseIntError>> {
        match self {
            UserRef::Id(id) => Some(Ok(*id)),
            UserRef::Text(s) if s.trim().is_empty() => None,
            UserRef::Text(s) => Some(s.trim().parse()),
        }
    }
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: Option<UserRef>,
    pub recipient_id: Option<UserRef>,
    pub content: Option<String>,
}

/// Query string shared by every conversation read endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ConversationQuery {
    pub user1_id: Option<String>,
    pub user2_id: Option<String>,
}

// -- Merged feed --

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Voice,
}

/// One entry of the merged conversation feed.
///
/// `content` is the single display field: the text body, or the
/// transcription for voice notes, or `"Voice Message"` if neither has text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub kind: MessageKind,
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transcription: Option<String>,
}

pub const VOICE_PLACEHOLDER: &str = "Voice Message";

impl From<TextMessage> for MessageView {
    fn from(m: TextMessage) -> Self {
        let content = if m.content.is_empty() {
            VOICE_PLACEHOLDER.to_string()
        } else {
            m.content
        };
        Self {
            kind: MessageKind::Text,
            id: m.id,
            sender_id: m.sender_id,
            recipient_id: m.recipient_id,
            timestamp: m.timestamp,
            content,
            filename: None,
            transcription: None,
        }
    }
}

impl From<VoiceMessage> for MessageView {
    fn from(vm: VoiceMessage) -> Self {
        let content = if vm.transcription.is_empty() {
            VOICE_PLACEHOLDER.to_string()
        } else {
            vm.transcription.clone()
        };
        Self {
            kind: MessageKind::Voice,
            id: vm.id,
            sender_id: vm.sender_id,
            recipient_id: vm.recipient_id,
            timestamp: vm.timestamp,
            content,
            filename: Some(vm.filename),
            transcription: Some(vm.transcription),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
