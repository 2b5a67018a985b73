//! Row-to-response conversions shared across handlers.

use tracing::warn;
use uuid::Uuid;

use skillmatch_db::models::{
    BadgeRow, ProfileRow, SkillRow, UserBadgeRow, UserSkillRow, parse_timestamp,
};
use skillmatch_types::api::{
    BadgeResponse, ProfileResponse, Proficiency, SkillResponse, UserBadgeResponse,
    UserSkillResponse,
};

pub(crate) fn uuid_or_nil(s: &str) -> Uuid {
    s.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}': {}", s, e);
        Uuid::nil()
    })
}

pub(crate) fn profile_response(row: ProfileRow) -> ProfileResponse {
    ProfileResponse {
        id: uuid_or_nil(&row.id),
        full_name: row.full_name,
        bio: row.bio,
        year: row.year,
        major: row.major,
    }
}

pub(crate) fn skill_response(row: SkillRow) -> SkillResponse {
    SkillResponse {
        id: uuid_or_nil(&row.id),
        name: row.name,
    }
}

pub(crate) fn user_skill_response(row: UserSkillRow) -> UserSkillResponse {
    UserSkillResponse {
        id: uuid_or_nil(&row.id),
        skill_id: uuid_or_nil(&row.skill_id),
        name: row.skill_name,
        proficiency: Proficiency::parse(&row.proficiency).unwrap_or_else(|| {
            warn!("Corrupt proficiency '{}'", row.proficiency);
            Proficiency::Beginner
        }),
    }
}

pub(crate) fn badge_response(row: BadgeRow) -> BadgeResponse {
    BadgeResponse {
        id: uuid_or_nil(&row.id),
        name: row.name,
        description: row.description,
        icon: row.icon,
    }
}

pub(crate) fn user_badge_response(row: UserBadgeRow) -> UserBadgeResponse {
    UserBadgeResponse {
        id: uuid_or_nil(&row.id),
        badge: BadgeResponse {
            id: uuid_or_nil(&row.badge_id),
            name: row.name,
            description: row.description,
            icon: row.icon,
        },
        earned_at: parse_timestamp(&row.earned_at),
    }
}
