use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the WebSocket gateway.
/// Canonical definition lives here to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetRequestRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// -- Profiles --

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub full_name: String,
    pub bio: String,
    pub year: String,
    pub major: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub major: String,
}

// -- Skills --

/// Ordinal skill-level label attached to a user-skill pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Advanced,
}

impl Proficiency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddSkillRequest {
    pub skill_id: Uuid,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSkillResponse {
    pub id: Uuid,
    pub skill_id: Uuid,
    pub name: String,
    pub proficiency: Proficiency,
}

// -- Badges --

#[derive(Debug, Clone, Serialize)]
pub struct BadgeResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserBadgeResponse {
    pub id: Uuid,
    pub badge: BadgeResponse,
    pub earned_at: DateTime<Utc>,
}

// -- Students directory --

#[derive(Debug, Serialize)]
pub struct StudentResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub skills: Vec<UserSkillResponse>,
    pub badges: Vec<UserBadgeResponse>,
}

// -- Projects --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub max_members: i64,
    #[serde(default)]
    pub required_skills: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub max_members: i64,
    pub status: String,
    /// Derived by aggregation, never stored.
    pub member_count: i64,
    pub skills: Vec<SkillResponse>,
    pub is_member: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

// -- Pitches --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchStatus {
    Open,
    Revealed,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePitchRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PitchResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<Uuid>,
    pub status: PitchStatus,
    pub revealed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Withheld while the pitch is open; populated after reveal for the
    /// creator and for users who expressed interest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<ProfileResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpressInterestRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PitchInterestResponse {
    pub id: Uuid,
    pub user: ProfileResponse,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MyPitchResponse {
    #[serde(flatten)]
    pub pitch: PitchResponse,
    pub interests: Vec<PitchInterestResponse>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub partner: ProfileResponse,
    pub unread: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proficiency_round_trips_through_db_representation() {
        for p in [
            Proficiency::Beginner,
            Proficiency::Intermediate,
            Proficiency::Advanced,
        ] {
            assert_eq!(Proficiency::parse(p.as_str()), Some(p));
        }
        assert_eq!(Proficiency::parse("expert"), None);
    }

    #[test]
    fn pitch_creator_is_omitted_while_withheld() {
        let pitch = PitchResponse {
            id: Uuid::nil(),
            title: "AI Tutor".into(),
            description: String::new(),
            required_skills: vec![],
            status: PitchStatus::Open,
            revealed_at: None,
            created_at: Utc::now(),
            creator: None,
        };
        let json = serde_json::to_string(&pitch).unwrap();
        assert!(!json.contains("creator"));
    }
}
