use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use skillmatch_db::models::parse_timestamp;
use skillmatch_types::api::{
    Claims, ConversationResponse, MessageResponse, SendMessageRequest,
};
use skillmatch_types::events::{ChangeOp, Table};

use crate::convert::{profile_response, uuid_or_nil};
use crate::error::ApiError;
use crate::state::AppState;

/// The partner set is derived, not stored: everyone the caller has
/// exchanged at least one message with, plus the unread count.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConversationResponse>>, ApiError> {
    let partners = state.db.conversation_partners(&claims.sub.to_string())?;
    Ok(Json(
        partners
            .into_iter()
            .map(|p| ConversationResponse {
                partner: profile_response(p.partner),
                unread: p.unread,
            })
            .collect(),
    ))
}

/// Full history with one partner, creation time ascending. Opening the
/// conversation marks everything unread from that partner as read.
pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(partner_id): Path<Uuid>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let me = claims.sub.to_string();
    let partner = partner_id.to_string();

    if state.db.get_profile(&partner)?.is_none() {
        return Err(ApiError::NotFound("user not found".into()));
    }

    let db = state.clone();
    let (rows, marked) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let rows = db.db.conversation(&me, &partner)?;
        let marked = db.db.mark_conversation_read(&me, &partner)?;
        Ok((rows, marked))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("join error"))
    })??;

    // Re-opening an already-read conversation publishes nothing.
    if marked > 0 {
        state.dispatcher.publish(Table::Messages, ChangeOp::Update);
    }

    Ok(Json(rows.into_iter().map(message_response).collect()))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("message content is required".into()));
    }
    if req.recipient_id == claims.sub {
        return Err(ApiError::BadRequest("cannot message yourself".into()));
    }
    if state
        .db
        .get_profile(&req.recipient_id.to_string())?
        .is_none()
    {
        return Err(ApiError::NotFound("recipient not found".into()));
    }

    let id = Uuid::new_v4();
    state.db.insert_message(
        &id.to_string(),
        &claims.sub.to_string(),
        &req.recipient_id.to_string(),
        content,
    )?;
    state.dispatcher.publish(Table::Messages, ChangeOp::Insert);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id,
            sender_id: claims.sub,
            recipient_id: req.recipient_id,
            content: content.to_string(),
            read: false,
            created_at: chrono::Utc::now(),
        }),
    ))
}

fn message_response(row: skillmatch_db::models::MessageRow) -> MessageResponse {
    MessageResponse {
        id: uuid_or_nil(&row.id),
        sender_id: uuid_or_nil(&row.sender_id),
        recipient_id: uuid_or_nil(&row.recipient_id),
        content: row.content,
        read: row.read,
        created_at: parse_timestamp(&row.created_at),
    }
}
