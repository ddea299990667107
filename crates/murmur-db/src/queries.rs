use crate::models::{MessageRow, UserRow, VoiceMessageRow};
use crate::{Database, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Registers `username`, or returns `None` when the name is taken.
    ///
    /// Check and insert are one statement, so concurrent registrations of
    /// the same name yield exactly one row.
    pub fn create_user(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username) VALUES (?1) ON CONFLICT(username) DO NOTHING",
                [username],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(UserRow {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
            }))
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, username FROM users ORDER BY id")?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// True when both ids reference existing users.
    pub fn users_exist(&self, a: i64, b: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT id) FROM users WHERE id IN (?1, ?2)",
                [a, b],
                |row| row.get(0),
            )?;
            let wanted = if a == b { 1 } else { 2 };
            Ok(found == wanted)
        })
    }

    // -- Text messages --

    pub fn insert_message(
        &self,
        content: &str,
        sender_id: i64,
        recipient_id: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<MessageRow> {
        let ts = format_timestamp(timestamp);
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (content, sender_id, recipient_id, timestamp) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![content, sender_id, recipient_id, ts],
            )?;
            Ok(MessageRow {
                id: conn.last_insert_rowid(),
                content: content.to_string(),
                sender_id,
                recipient_id,
                timestamp: ts,
            })
        })
    }

    /// All text messages exchanged between two users, either direction,
    /// oldest first.
    pub fn get_conversation_messages(&self, user1: i64, user2: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, user1, user2))
    }

    // -- Voice messages --

    pub fn insert_voice_message(
        &self,
        filename: &str,
        sender_id: i64,
        recipient_id: i64,
        transcription: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<VoiceMessageRow> {
        let ts = format_timestamp(timestamp);
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO voice_messages (filename, sender_id, recipient_id, timestamp, transcription)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![filename, sender_id, recipient_id, ts, transcription],
            )?;
            Ok(VoiceMessageRow {
                id: conn.last_insert_rowid(),
                filename: filename.to_string(),
                sender_id,
                recipient_id,
                timestamp: ts,
                transcription: transcription.to_string(),
            })
        })
    }

    /// All voice messages exchanged between two users, either direction,
    /// oldest first.
    pub fn get_conversation_voice_messages(
        &self,
        user1: i64,
        user2: i64,
    ) -> Result<Vec<VoiceMessageRow>> {
        self.with_conn(|conn| query_voice_messages(conn, user1, user2))
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
    })
}

fn query_messages(conn: &Connection, user1: i64, user2: i64) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, sender_id, recipient_id, timestamp
         FROM messages
         WHERE (sender_id = ?1 AND recipient_id = ?2)
            OR (sender_id = ?2 AND recipient_id = ?1)
         ORDER BY timestamp ASC, id ASC",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![user1, user2], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                content: row.get(1)?,
                sender_id: row.get(2)?,
                recipient_id: row.get(3)?,
                timestamp: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_voice_messages(conn: &Connection, user1: i64, user2: i64) -> Result<Vec<VoiceMessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, sender_id, recipient_id, timestamp, transcription
         FROM voice_messages
         WHERE (sender_id = ?1 AND recipient_id = ?2)
            OR (sender_id = ?2 AND recipient_id = ?1)
         ORDER BY timestamp ASC, id ASC",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![user1, user2], |row| {
            Ok(VoiceMessageRow {
                id: row.get(0)?,
                filename: row.get(1)?,
                sender_id: row.get(2)?,
                recipient_id: row.get(3)?,
                timestamp: row.get(4)?,
                transcription: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn seeded() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice").unwrap().unwrap().id;
        let bob = db.create_user("bob").unwrap().unwrap().id;
        let carol = db.create_user("carol").unwrap().unwrap().id;
        (db, alice, bob, carol)
    }

    #[test]
    fn usernames_are_unique() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_user("alice").unwrap().is_some());
        assert!(db.create_user("alice").unwrap().is_none());
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_registrations_of_one_name_yield_one_user() {
        let db = std::sync::Arc::new(Database::open_in_memory().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.create_user("alice").unwrap())
            })
            .collect();
        let created = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();
        assert_eq!(created, 1);
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn list_users_in_registration_order() {
        let (db, alice, bob, carol) = seeded();
        let users = db.list_users().unwrap();
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![alice, bob, carol]);
        assert_eq!(users[1].username, "bob");
    }

    #[test]
    fn users_exist_checks_both_sides() {
        let (db, alice, bob, _) = seeded();
        assert!(db.users_exist(alice, bob).unwrap());
        assert!(db.users_exist(alice, alice).unwrap());
        assert!(!db.users_exist(alice, 999).unwrap());
        assert!(!db.users_exist(998, 999).unwrap());
    }

    #[test]
    fn conversation_is_symmetric_and_ordered() {
        let (db, alice, bob, carol) = seeded();
        db.insert_message("third", bob, alice, at(30)).unwrap();
        db.insert_message("first", alice, bob, at(10)).unwrap();
        db.insert_message("elsewhere", alice, carol, at(20)).unwrap();
        db.insert_message("second", alice, bob, at(20)).unwrap();

        let forward = db.get_conversation_messages(alice, bob).unwrap();
        let contents: Vec<_> = forward.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);

        let backward = db.get_conversation_messages(bob, alice).unwrap();
        let ids_fwd: Vec<_> = forward.iter().map(|m| m.id).collect();
        let ids_bwd: Vec<_> = backward.iter().map(|m| m.id).collect();
        assert_eq!(ids_fwd, ids_bwd);
    }

    #[test]
    fn voice_conversation_is_symmetric_and_ordered() {
        let (db, alice, bob, carol) = seeded();
        db.insert_voice_message("b.ogg", bob, alice, "later", at(50)).unwrap();
        db.insert_voice_message("a.wav", alice, bob, "earlier", at(5)).unwrap();
        db.insert_voice_message("c.mp3", carol, bob, "other pair", at(7)).unwrap();

        let rows = db.get_conversation_voice_messages(bob, alice).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].filename, "a.wav");
        assert_eq!(rows[1].transcription, "later");
    }

    #[test]
    fn sub_second_timestamps_sort_correctly() {
        let (db, alice, bob, _) = seeded();
        let base = at(0);
        db.insert_message("late", alice, bob, base + chrono::Duration::microseconds(900))
            .unwrap();
        db.insert_message("early", alice, bob, base + chrono::Duration::microseconds(5))
            .unwrap();

        let rows = db.get_conversation_messages(alice, bob).unwrap();
        assert_eq!(rows[0].content, "early");
        assert_eq!(rows[1].content, "late");
    }

    #[test]
    fn messages_require_existing_users() {
        let (db, alice, _, _) = seeded();
        assert!(db.insert_message("hi", alice, 999, at(0)).is_err());
    }
}
