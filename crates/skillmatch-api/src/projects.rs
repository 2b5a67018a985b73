use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};
use uuid::Uuid;

use skillmatch_db::models::parse_timestamp;
use skillmatch_types::api::{
    Claims, CreateProjectRequest, CreatedResponse, ProjectResponse, SkillResponse,
};
use skillmatch_types::events::{ChangeOp, Table};

use crate::convert::uuid_or_nil;
use crate::error::ApiError;
use crate::state::AppState;

/// Browse view: open projects, newest first, with derived member counts.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let db = state.clone();
    let me = claims.sub.to_string();

    let (projects, skills, memberships) =
        tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let projects = db.db.list_open_projects()?;
            let ids: Vec<String> = projects.iter().map(|p| p.id.clone()).collect();
            let skills = db.db.list_project_skills_for(&ids)?;
            let memberships = db.db.memberships_of(&me)?;
            Ok((projects, skills, memberships))
        })
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!("join error"))
        })??;

    let mut skill_map: HashMap<String, Vec<SkillResponse>> = HashMap::new();
    for row in skills {
        skill_map.entry(row.project_id).or_default().push(SkillResponse {
            id: uuid_or_nil(&row.skill_id),
            name: row.skill_name,
        });
    }
    let memberships: HashSet<String> = memberships.into_iter().collect();

    let projects = projects
        .into_iter()
        .map(|p| ProjectResponse {
            id: uuid_or_nil(&p.id),
            creator_id: uuid_or_nil(&p.creator_id),
            title: p.title,
            description: p.description,
            max_members: p.max_members,
            status: p.status,
            member_count: p.member_count,
            skills: skill_map.remove(&p.id).unwrap_or_default(),
            is_member: memberships.contains(&p.id),
            created_at: parse_timestamp(&p.created_at),
        })
        .collect();

    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("project title is required".into()));
    }
    if req.max_members < 1 {
        return Err(ApiError::BadRequest(
            "max members must be at least 1".into(),
        ));
    }

    let required_skills: Vec<String> =
        req.required_skills.iter().map(|id| id.to_string()).collect();
    for skill_id in &required_skills {
        if !state.db.skill_exists(skill_id)? {
            return Err(ApiError::BadRequest(format!("unknown skill {skill_id}")));
        }
    }

    let id = Uuid::new_v4();
    state.db.create_project(
        &id.to_string(),
        &claims.sub.to_string(),
        title,
        req.description.trim(),
        req.max_members,
        &required_skills,
    )?;

    state.dispatcher.publish(Table::Projects, ChangeOp::Insert);
    state
        .dispatcher
        .publish(Table::ProjectMembers, ChangeOp::Insert);
    if !required_skills.is_empty() {
        state
            .dispatcher
            .publish(Table::ProjectSkills, ChangeOp::Insert);
    }

    info!(project_id = %id, creator = %claims.sub, "project created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Joining is gated on the derived member count: once it reaches
/// `max_members` the action is refused.
pub async fn join_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let id = project_id.to_string();
    let me = claims.sub.to_string();

    let project = state
        .db
        .get_project(&id)?
        .ok_or_else(|| ApiError::NotFound("project not found".into()))?;

    if project.status != "open" {
        return Err(ApiError::Conflict("project is not open".into()));
    }
    if state.db.is_project_member(&id, &me)? {
        return Err(ApiError::Conflict("already a member".into()));
    }

    // Capacity is re-checked inside the insert itself, so a racing join
    // for the last spot cannot overfill the project.
    if !state.db.add_project_member_if_capacity(&id, &me, "member")? {
        return Err(ApiError::Conflict("project is full".into()));
    }
    state
        .dispatcher
        .publish(Table::ProjectMembers, ChangeOp::Insert);

    info!(project_id = %project_id, user_id = %claims.sub, "joined project");
    Ok(StatusCode::CREATED)
}
