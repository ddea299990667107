use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use murmur_db::Database;
use murmur_types::api::{ConversationQuery, MessageView};
use murmur_types::models::{TextMessage, VoiceMessage};

use crate::convert;
use crate::error::ApiError;
use crate::recorder::non_blank;
use crate::state::{AppState, run_db};

pub const PAIR_REQUIRED: &str = "Both user1_id and user2_id are required";
pub const PAIR_NOT_INTEGERS: &str = "user1_id and user2_id must be integers";

/// Validate the `user1_id`/`user2_id` pair shared by every conversation read.
pub fn parse_pair(query: &ConversationQuery) -> Result<(i64, i64), ApiError> {
    let (Some(a), Some(b)) = (non_blank(query.user1_id.as_deref()), non_blank(query.user2_id.as_deref()))
    else {
        return Err(ApiError::validation(PAIR_REQUIRED));
    };
    match (a.parse(), b.parse()) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        _ => Err(ApiError::validation(PAIR_NOT_INTEGERS)),
    }
}

/// Interleave both message kinds by timestamp. Equal timestamps put text
/// before voice, then order by id.
pub fn merge_feed(texts: Vec<TextMessage>, voices: Vec<VoiceMessage>) -> Vec<MessageView> {
    let mut feed: Vec<MessageView> = texts
        .into_iter()
        .map(MessageView::from)
        .chain(voices.into_iter().map(MessageView::from))
        .collect();
    feed.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.kind.cmp(&b.kind))
            .then(a.id.cmp(&b.id))
    });
    feed
}

/// Recomputed from scratch on every call.
pub async fn feed(db: &Arc<Database>, user1: i64, user2: i64) -> Result<Vec<MessageView>, ApiError> {
    let (texts, voices) = run_db(db, move |db| {
        let texts = db.get_conversation_messages(user1, user2)?;
        let voices = db.get_conversation_voice_messages(user1, user2)?;
        Ok((texts, voices))
    })
    .await?;

    Ok(merge_feed(
        texts.into_iter().map(convert::text_message).collect(),
        voices.into_iter().map(convert::voice_message).collect(),
    ))
}

/// GET /conversation?user1_id=&user2_id=
pub async fn get_conversation(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (user1, user2) = parse_pair(&query)?;
    Ok(Json(feed(&state.db, user1, user2).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use murmur_types::api::{MessageKind, VOICE_PLACEHOLDER};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
    }

    fn text(id: i64, secs: i64, content: &str) -> TextMessage {
        TextMessage {
            id,
            content: content.into(),
            timestamp: at(secs),
            sender_id: 1,
            recipient_id: 2,
        }
    }

    fn voice(id: i64, secs: i64, transcription: &str) -> VoiceMessage {
        VoiceMessage {
            id,
            filename: format!("{id}.wav"),
            timestamp: at(secs),
            sender_id: 2,
            recipient_id: 1,
            transcription: transcription.into(),
        }
    }

    fn query(a: Option<&str>, b: Option<&str>) -> ConversationQuery {
        ConversationQuery {
            user1_id: a.map(String::from),
            user2_id: b.map(String::from),
        }
    }

    #[test]
    fn pair_requires_both_ids() {
        let err = parse_pair(&query(Some("1"), None)).unwrap_err();
        assert_eq!(err.to_string(), PAIR_REQUIRED);
        assert!(parse_pair(&query(None, Some("2"))).is_err());
        assert!(parse_pair(&query(Some(""), Some("2"))).is_err());
        assert_eq!(parse_pair(&query(Some("x"), Some("2"))).unwrap_err().to_string(), PAIR_NOT_INTEGERS);
        assert_eq!(parse_pair(&query(Some("1"), Some(" 2 "))).unwrap(), (1, 2));
    }

    #[test]
    fn interleaves_by_timestamp() {
        let feed = merge_feed(
            vec![text(1, 30, "c"), text(2, 10, "a")],
            vec![voice(1, 20, "b"), voice(2, 40, "d")],
        );
        let contents: Vec<_> = feed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c", "d"]);
        assert!(feed.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn ties_put_text_first_then_id() {
        let feed = merge_feed(
            vec![text(9, 5, "late id"), text(3, 5, "early id")],
            vec![voice(1, 5, "spoken")],
        );
        let order: Vec<_> = feed.iter().map(|m| (m.kind, m.id)).collect();
        assert_eq!(
            order,
            vec![(MessageKind::Text, 3), (MessageKind::Text, 9), (MessageKind::Voice, 1)]
        );
    }

    #[test]
    fn empty_transcription_shows_placeholder() {
        let feed = merge_feed(vec![], vec![voice(1, 0, "")]);
        assert_eq!(feed[0].content, VOICE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn feed_is_symmetric() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let a = db.create_user("a").unwrap().unwrap().id;
        let b = db.create_user("b").unwrap().unwrap().id;
        let c = db.create_user("c").unwrap().unwrap().id;
        db.insert_message("second", b, a, at(20)).unwrap();
        db.insert_message("first", a, b, at(10)).unwrap();
        db.insert_voice_message("v.ogg", a, b, "middle", at(15)).unwrap();
        db.insert_message("not ours", a, c, at(12)).unwrap();

        let ab = feed(&db, a, b).await.unwrap();
        let ba = feed(&db, b, a).await.unwrap();
        assert_eq!(ab, ba);
        let contents: Vec<_> = ab.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "middle", "second"]);
    }
}
