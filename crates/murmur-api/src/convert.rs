use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use murmur_db::models::{MessageRow, UserRow, VoiceMessageRow};
use murmur_types::models::{TextMessage, User, VoiceMessage};

fn parse_timestamp(raw: &str, table: &str, id: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Rows written by hand in sqlite3 use datetime('now') format.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {} {}: {}", raw, table, id, e);
            DateTime::default()
        })
}

pub(crate) fn user(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
    }
}

pub(crate) fn text_message(row: MessageRow) -> TextMessage {
    TextMessage {
        timestamp: parse_timestamp(&row.timestamp, "message", row.id),
        id: row.id,
        content: row.content,
        sender_id: row.sender_id,
        recipient_id: row.recipient_id,
    }
}

pub(crate) fn voice_message(row: VoiceMessageRow) -> VoiceMessage {
    VoiceMessage {
        timestamp: parse_timestamp(&row.timestamp, "voice message", row.id),
        id: row.id,
        filename: row.filename,
        sender_id: row.sender_id,
        recipient_id: row.recipient_id,
        transcription: row.transcription,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_and_legacy_formats() {
        let stored = parse_timestamp("2026-01-02T03:04:05.000006Z", "message", 1);
        assert_eq!(stored.timestamp_subsec_micros(), 6);

        let legacy = parse_timestamp("2026-01-02 03:04:05", "message", 1);
        assert_eq!(legacy.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday", "message", 9), DateTime::<Utc>::default());
    }
}
