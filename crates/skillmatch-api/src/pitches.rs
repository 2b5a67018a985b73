use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use skillmatch_db::models::{PitchRow, parse_timestamp};
use skillmatch_types::api::{
    Claims, CreatePitchRequest, CreatedResponse, ExpressInterestRequest, MyPitchResponse,
    PitchInterestResponse, PitchResponse, PitchStatus, ProfileResponse,
};
use skillmatch_types::events::{ChangeOp, Table};

use crate::convert::{profile_response, uuid_or_nil};
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_INTEREST_MESSAGE: &str = "I'm interested in joining this project!";

/// Browse view: open pitches from other users, creator identity withheld.
pub async fn list_pitches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PitchResponse>>, ApiError> {
    let rows = state
        .db
        .list_open_pitches_excluding(&claims.sub.to_string())?;
    Ok(Json(
        rows.into_iter().map(|r| pitch_response(r, None)).collect(),
    ))
}

/// The caller's own pitches, each with the interests expressed in it and
/// the interested users' profiles. Interests are visible here only.
pub async fn my_pitches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MyPitchResponse>>, ApiError> {
    let rows = state.db.list_pitches_by(&claims.sub.to_string())?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let interests = state
            .db
            .list_pitch_interests(&row.id)?
            .into_iter()
            .map(|(interest, profile)| PitchInterestResponse {
                id: uuid_or_nil(&interest.id),
                user: profile_response(profile),
                message: interest.message,
                created_at: parse_timestamp(&interest.created_at),
            })
            .collect();

        out.push(MyPitchResponse {
            pitch: pitch_response(row, None),
            interests,
        });
    }

    Ok(Json(out))
}

pub async fn create_pitch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePitchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("pitch title is required".into()));
    }

    for skill_id in &req.required_skills {
        if !state.db.skill_exists(&skill_id.to_string())? {
            return Err(ApiError::BadRequest(format!("unknown skill {skill_id}")));
        }
    }
    let required_skills = serde_json::to_string(&req.required_skills)
        .map_err(|e| anyhow::anyhow!("encode required skills: {}", e))?;

    let id = Uuid::new_v4();
    state.db.create_pitch(
        &id.to_string(),
        &claims.sub.to_string(),
        title,
        req.description.trim(),
        &required_skills,
    )?;
    state
        .dispatcher
        .publish(Table::AnonymousPitches, ChangeOp::Insert);

    info!(pitch_id = %id, "anonymous pitch created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Pitch detail. The creator's identity is included only for the creator
/// themselves, or after reveal for users who expressed interest.
pub async fn get_pitch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(pitch_id): Path<Uuid>,
) -> Result<Json<PitchResponse>, ApiError> {
    let me = claims.sub.to_string();
    let row = state
        .db
        .get_pitch(&pitch_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("pitch not found".into()))?;

    let creator = creator_if_visible(&state, &row, &me)?;
    Ok(Json(pitch_response(row, creator)))
}

pub async fn express_interest(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(pitch_id): Path<Uuid>,
    Json(req): Json<ExpressInterestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let pid = pitch_id.to_string();

    let pitch = state
        .db
        .get_pitch(&pid)?
        .filter(|p| p.creator_id != me)
        .ok_or_else(|| ApiError::NotFound("pitch not found".into()))?;

    if pitch.status != "open" {
        return Err(ApiError::Conflict("pitch is no longer open".into()));
    }
    if state.db.has_pitch_interest(&pid, &me)? {
        return Err(ApiError::Conflict("interest already expressed".into()));
    }

    let message = match req.message.trim() {
        "" => DEFAULT_INTEREST_MESSAGE,
        m => m,
    };

    let id = Uuid::new_v4();
    state
        .db
        .add_pitch_interest(&id.to_string(), &pid, &me, message)?;
    state
        .dispatcher
        .publish(Table::PitchInterest, ChangeOp::Insert);

    info!(pitch_id = %pitch_id, user_id = %claims.sub, "interest expressed");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// One-way `open -> revealed` transition, creator-triggered only.
pub async fn reveal_pitch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(pitch_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let me = claims.sub.to_string();
    let pid = pitch_id.to_string();

    let pitch = state
        .db
        .get_pitch(&pid)?
        .filter(|p| p.creator_id == me)
        .ok_or_else(|| ApiError::NotFound("pitch not found".into()))?;

    if pitch.status != "open" {
        return Err(ApiError::Conflict("pitch already revealed".into()));
    }
    if !state.db.reveal_pitch(&pid, &me)? {
        return Err(ApiError::Conflict("pitch already revealed".into()));
    }

    state
        .dispatcher
        .publish(Table::AnonymousPitches, ChangeOp::Update);

    info!(pitch_id = %pitch_id, "pitch revealed");
    Ok(StatusCode::NO_CONTENT)
}

fn creator_if_visible(
    state: &AppState,
    row: &PitchRow,
    viewer: &str,
) -> Result<Option<ProfileResponse>, ApiError> {
    let visible = row.creator_id == viewer
        || (row.status == "revealed" && state.db.has_pitch_interest(&row.id, viewer)?);

    if !visible {
        return Ok(None);
    }
    Ok(state.db.get_profile(&row.creator_id)?.map(profile_response))
}

fn pitch_response(row: PitchRow, creator: Option<ProfileResponse>) -> PitchResponse {
    let required_skills: Vec<Uuid> =
        serde_json::from_str(&row.required_skills).unwrap_or_else(|e| {
            warn!(
                "Corrupt required_skills '{}' on pitch '{}': {}",
                row.required_skills, row.id, e
            );
            vec![]
        });

    PitchResponse {
        id: uuid_or_nil(&row.id),
        title: row.title,
        description: row.description,
        required_skills,
        status: if row.status == "revealed" {
            PitchStatus::Revealed
        } else {
            PitchStatus::Open
        },
        revealed_at: row.revealed_at.as_deref().map(parse_timestamp),
        created_at: parse_timestamp(&row.created_at),
        creator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, skills: &str) -> PitchRow {
        PitchRow {
            id: Uuid::new_v4().to_string(),
            creator_id: Uuid::new_v4().to_string(),
            title: "Stealth idea".into(),
            description: String::new(),
            required_skills: skills.into(),
            status: status.into(),
            revealed_at: None,
            created_at: "2026-08-23 10:00:00".into(),
        }
    }

    #[test]
    fn open_pitch_withholds_creator() {
        let resp = pitch_response(row("open", "[]"), None);
        assert_eq!(resp.status, PitchStatus::Open);
        assert!(resp.creator.is_none());
    }

    #[test]
    fn corrupt_required_skills_degrades_to_empty() {
        let resp = pitch_response(row("open", "not json"), None);
        assert!(resp.required_skills.is_empty());
    }
}
