/// Database row types — these map directly to SQLite rows.
/// Distinct from murmur-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub content: String,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct VoiceMessageRow {
    pub id: i64,
    pub filename: String,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub timestamp: String,
    pub transcription: String,
}
