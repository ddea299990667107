use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use murmur_types::api::{ConversationQuery, SendMessageRequest, UserRef};

use crate::conversation::parse_pair;
use crate::convert;
use crate::error::ApiError;
use crate::recorder::PARTICIPANTS_NOT_FOUND;
use crate::state::{AppState, run_db};

pub const MAX_CONTENT_CHARS: usize = 500;

const FIELDS_REQUIRED: &str = "sender_id, recipient_id, and content are required";

fn resolve(id: Option<&UserRef>) -> Result<Option<i64>, ApiError> {
    match id.and_then(UserRef::resolve) {
        None => Ok(None),
        Some(Ok(id)) => Ok(Some(id)),
        Some(Err(_)) => Err(ApiError::validation("sender_id and recipient_id must be integers")),
    }
}

/// POST /messages
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::validation(e.body_text()))?;

    let sender_id = resolve(req.sender_id.as_ref())?;
    let recipient_id = resolve(req.recipient_id.as_ref())?;
    let content = req.content.filter(|c| !c.is_empty());
    let (Some(sender_id), Some(recipient_id), Some(content)) = (sender_id, recipient_id, content)
    else {
        return Err(ApiError::validation(FIELDS_REQUIRED));
    };

    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::validation(format!(
            "Message content must be {} characters or less",
            MAX_CONTENT_CHARS
        )));
    }

    let row = run_db(&state.db, move |db| {
        if !db.users_exist(sender_id, recipient_id)? {
            return Ok(None);
        }
        db.insert_message(&content, sender_id, recipient_id, Utc::now())
            .map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound(PARTICIPANTS_NOT_FOUND.into()))?;

    info!("Message {} sent ({} -> {})", row.id, sender_id, recipient_id);
    Ok((StatusCode::CREATED, Json(convert::text_message(row))))
}

/// GET /messages?user1_id=&user2_id=
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (user1, user2) = parse_pair(&query)?;
    let rows = run_db(&state.db, move |db| db.get_conversation_messages(user1, user2)).await?;
    let messages: Vec<_> = rows.into_iter().map(convert::text_message).collect();
    Ok(Json(messages))
}
