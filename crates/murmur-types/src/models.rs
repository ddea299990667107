use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sender_id: i64,
    pub recipient_id: i64,
}

/// A transcribed voice note. The audio itself is never kept; only the
/// sanitized upload name and the transcription outcome survive.
///
/// `transcription` holds either the transcript or a
/// `"Transcription failed: ..."` string, never nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceMessage {
    pub id: i64,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub transcription: String,
}
