pub mod conversation;
pub mod error;
pub mod intake;
pub mod messages;
pub mod recorder;
pub mod state;
pub mod transcription;
pub mod users;
pub mod voice;

mod convert;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::get,
};

use murmur_types::api::HealthResponse;

pub use state::{AppState, AppStateInner};

/// All routes. CORS and tracing layers are left to the binary.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/messages", get(messages::get_messages).post(messages::send_message))
        .route(
            "/voice_messages",
            get(voice::get_voice_messages)
                .post(voice::upload_voice_message)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/conversation", get(conversation::get_conversation))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}
