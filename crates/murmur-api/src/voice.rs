use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::{MultipartError, MultipartRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use murmur_types::api::ConversationQuery;

use crate::conversation::parse_pair;
use crate::convert;
use crate::error::ApiError;
use crate::intake::{IntakeError, UploadedFile};
use crate::recorder::VoiceUpload;
use crate::state::{AppState, run_db};

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    warn!("Malformed voice upload: {}", e);
    ApiError::validation(format!("Malformed multipart body: {}", e.body_text()))
}

/// Drain the form into a `VoiceUpload`. Only the first `file` part counts.
async fn read_upload(mut multipart: Multipart) -> Result<VoiceUpload, ApiError> {
    let mut upload = VoiceUpload::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") if upload.file.is_none() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload.file = Some(UploadedFile { filename, bytes });
            }
            Some("sender_id") => upload.sender_id = Some(field.text().await.map_err(multipart_error)?),
            Some("recipient_id") => {
                upload.recipient_id = Some(field.text().await.map_err(multipart_error)?)
            }
            _ => {}
        }
    }
    Ok(upload)
}

/// POST /voice_messages — multipart `file`, `sender_id`, `recipient_id`.
///
/// Responds 201 even when transcription failed; the failure text is in the
/// record's `transcription` field.
pub async fn upload_voice_message(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // A request that isn't multipart has no file part at all.
    let multipart = multipart.map_err(|_| ApiError::from(IntakeError::NoFilePart))?;
    let upload = read_upload(multipart).await?;
    let record = state.recorder.record(upload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /voice_messages?user1_id=&user2_id=
pub async fn get_voice_messages(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (user1, user2) = parse_pair(&query)?;
    let rows = run_db(&state.db, move |db| db.get_conversation_voice_messages(user1, user2)).await?;
    let voice_messages: Vec<_> = rows.into_iter().map(convert::voice_message).collect();
    Ok(Json(voice_messages))
}
