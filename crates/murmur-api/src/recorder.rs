use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use murmur_db::Database;
use murmur_types::models::VoiceMessage;

use crate::convert;
use crate::error::ApiError;
use crate::intake::{BlobIntake, UploadedFile};
use crate::state::run_db;
use crate::transcription::{Transcriber, transcribe_blob};

pub const PARTICIPANTS_REQUIRED: &str = "sender_id and recipient_id are required";
pub const PARTICIPANTS_NOT_INTEGERS: &str = "sender_id and recipient_id must be integers";
pub const PARTICIPANTS_NOT_FOUND: &str = "Sender or recipient not found";

/// Everything a voice upload form carried, before validation.
#[derive(Debug, Default)]
pub struct VoiceUpload {
    pub file: Option<UploadedFile>,
    pub sender_id: Option<String>,
    pub recipient_id: Option<String>,
}

/// Intake → transcription → persistence → cleanup, as one operation.
///
/// Every call that gets past validation leaves exactly one voice message
/// row and no file in the upload directory.
pub struct VoiceRecorder {
    db: Arc<Database>,
    intake: BlobIntake,
    transcriber: Arc<dyn Transcriber>,
}

impl VoiceRecorder {
    pub fn new(db: Arc<Database>, intake: BlobIntake, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            db,
            intake,
            transcriber,
        }
    }

    pub async fn record(&self, upload: VoiceUpload) -> Result<VoiceMessage, ApiError> {
        let (sender_id, recipient_id) =
            parse_participants(upload.sender_id.as_deref(), upload.recipient_id.as_deref())?;

        // Checked before anything touches the disk.
        if !run_db(&self.db, move |db| db.users_exist(sender_id, recipient_id)).await? {
            return Err(ApiError::NotFound(PARTICIPANTS_NOT_FOUND.into()));
        }

        let blob = self.intake.accept(upload.file).await?;

        let outcome = transcribe_blob(self.transcriber.as_ref(), &blob).await;
        let failed = outcome.is_failure();
        let filename = blob.filename().to_string();
        let transcription = outcome.into_text();

        let persisted = run_db(&self.db, move |db| {
            db.insert_voice_message(&filename, sender_id, recipient_id, &transcription, Utc::now())
        })
        .await;

        // Released whether or not the insert went through.
        if let Err(e) = blob.discard().await {
            warn!("Failed to delete transient blob: {}", e);
        }

        let row = persisted?;
        info!(
            "Voice message {} stored ({} -> {}, transcription {})",
            row.id,
            sender_id,
            recipient_id,
            if failed { "failed" } else { "ok" }
        );
        Ok(convert::voice_message(row))
    }
}

fn parse_participants(
    sender_id: Option<&str>,
    recipient_id: Option<&str>,
) -> Result<(i64, i64), ApiError> {
    let (Some(sender), Some(recipient)) = (non_blank(sender_id), non_blank(recipient_id)) else {
        return Err(ApiError::validation(PARTICIPANTS_REQUIRED));
    };
    match (sender.parse(), recipient.parse()) {
        (Ok(s), Ok(r)) => Ok((s, r)),
        _ => Err(ApiError::validation(PARTICIPANTS_NOT_INTEGERS)),
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
