use std::collections::HashMap;

use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};
use uuid::Uuid;

use skillmatch_types::api::{
    AddSkillRequest, BadgeResponse, Claims, CreatedResponse, SkillResponse, StudentResponse,
    UpdateProfileRequest, UserBadgeResponse, UserSkillResponse,
};
use skillmatch_types::events::{ChangeOp, Table};

use crate::convert::{
    badge_response, profile_response, skill_response, user_badge_response, user_skill_response,
};
use crate::error::ApiError;
use crate::state::AppState;

/// The caller's own profile with skills and badges. The profile row is
/// created implicitly on first authenticated access.
pub async fn my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<StudentResponse>, ApiError> {
    let id = claims.sub.to_string();

    let row = match state.db.get_profile(&id)? {
        Some(row) => row,
        None => {
            state.db.upsert_profile(&id, "", "", "", "")?;
            state
                .db
                .get_profile(&id)?
                .ok_or_else(|| anyhow!("profile missing after implicit create"))?
        }
    };

    let skills = state.db.list_user_skills(&id)?;
    let badges = state.db.list_user_badges(&id)?;

    Ok(Json(StudentResponse {
        profile: profile_response(row),
        skills: skills.into_iter().map(user_skill_response).collect(),
        badges: badges.into_iter().map(user_badge_response).collect(),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<StatusCode, ApiError> {
    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(ApiError::BadRequest("full name is required".into()));
    }

    state.db.upsert_profile(
        &claims.sub.to_string(),
        full_name,
        req.bio.trim(),
        req.year.trim(),
        req.major.trim(),
    )?;
    state.dispatcher.publish(Table::Profiles, ChangeOp::Update);

    info!(user_id = %claims.sub, "profile updated");
    Ok(StatusCode::NO_CONTENT)
}

/// The student directory: every profile except the caller's, each with
/// its skills and earned badges.
pub async fn list_students(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    let db = state.clone();
    let me = claims.sub.to_string();

    // Run the multi-query load off the async runtime
    let (profiles, skills, badges) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let profiles = db.db.list_profiles_except(&me)?;
        let ids: Vec<String> = profiles.iter().map(|p| p.id.clone()).collect();
        let skills = db.db.list_user_skills_for(&ids)?;
        let badges = db.db.list_user_badges_for(&ids)?;
        Ok((profiles, skills, badges))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("join error"))
    })??;

    let mut skill_map: HashMap<String, Vec<UserSkillResponse>> = HashMap::new();
    for row in skills {
        let user_id = row.user_id.clone();
        skill_map
            .entry(user_id)
            .or_default()
            .push(user_skill_response(row));
    }

    let mut badge_map: HashMap<String, Vec<UserBadgeResponse>> = HashMap::new();
    for row in badges {
        let user_id = row.user_id.clone();
        badge_map
            .entry(user_id)
            .or_default()
            .push(user_badge_response(row));
    }

    let students = profiles
        .into_iter()
        .map(|p| {
            let id = p.id.clone();
            StudentResponse {
                profile: profile_response(p),
                skills: skill_map.remove(&id).unwrap_or_default(),
                badges: badge_map.remove(&id).unwrap_or_default(),
            }
        })
        .collect();

    Ok(Json(students))
}

// -- Skills --

pub async fn list_skills(
    State(state): State<AppState>,
) -> Result<Json<Vec<SkillResponse>>, ApiError> {
    let skills = state.db.list_skills()?;
    Ok(Json(skills.into_iter().map(skill_response).collect()))
}

pub async fn add_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddSkillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let skill_id = req.skill_id.to_string();

    if !state.db.skill_exists(&skill_id)? {
        return Err(ApiError::NotFound("skill not found".into()));
    }
    if state.db.has_user_skill(&user_id, &skill_id)? {
        return Err(ApiError::Conflict("skill already added".into()));
    }

    let id = Uuid::new_v4();
    state
        .db
        .add_user_skill(&id.to_string(), &user_id, &skill_id, req.proficiency.as_str())?;
    state.dispatcher.publish(Table::UserSkills, ChangeOp::Insert);

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn remove_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_skill_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .db
        .remove_user_skill(&user_skill_id.to_string(), &claims.sub.to_string())?;
    if !removed {
        return Err(ApiError::NotFound("skill not found".into()));
    }

    state.dispatcher.publish(Table::UserSkills, ChangeOp::Delete);
    Ok(StatusCode::NO_CONTENT)
}

// -- Badges --

pub async fn list_badges(
    State(state): State<AppState>,
) -> Result<Json<Vec<BadgeResponse>>, ApiError> {
    let badges = state.db.list_badges()?;
    Ok(Json(badges.into_iter().map(badge_response).collect()))
}

pub async fn my_badges(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserBadgeResponse>>, ApiError> {
    let badges = state.db.list_user_badges(&claims.sub.to_string())?;
    Ok(Json(badges.into_iter().map(user_badge_response).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use skillmatch_db::Database;
    use skillmatch_gateway::dispatcher::Dispatcher;

    use crate::state::AppStateInner;

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            dispatcher: Dispatcher::new(),
        })
    }

    fn register(state: &AppState) -> Claims {
        let id = Uuid::new_v4();
        state
            .db
            .create_user(&id.to_string(), "ada@campus.edu", "argon2-hash")
            .unwrap();
        Claims {
            sub: id,
            exp: usize::MAX,
        }
    }

    #[tokio::test]
    async fn blank_full_name_is_rejected() {
        let state = test_state();
        let claims = register(&state);

        let result = update_profile(
            State(state),
            Extension(claims),
            Json(UpdateProfileRequest {
                full_name: "   ".into(),
                bio: "first programmer".into(),
                year: String::new(),
                major: String::new(),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn profile_fields_are_trimmed_on_update() {
        let state = test_state();
        let claims = register(&state);
        let id = claims.sub.to_string();

        update_profile(
            State(state.clone()),
            Extension(claims),
            Json(UpdateProfileRequest {
                full_name: "  Ada Lovelace  ".into(),
                bio: String::new(),
                year: "senior".into(),
                major: " CS ".into(),
            }),
        )
        .await
        .unwrap();

        let profile = state.db.get_profile(&id).unwrap().unwrap();
        assert_eq!(profile.full_name, "Ada Lovelace");
        assert_eq!(profile.major, "CS");
    }
}
