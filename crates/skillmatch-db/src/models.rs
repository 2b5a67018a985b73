//! Database row types — these map directly to SQLite rows.
//! Distinct from the skillmatch-types API models to keep the DB layer
//! independent.

use chrono::{DateTime, NaiveDateTime, Utc};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ProfileRow {
    pub id: String,
    pub full_name: String,
    pub bio: String,
    pub year: String,
    pub major: String,
}

pub struct SkillRow {
    pub id: String,
    pub name: String,
}

pub struct UserSkillRow {
    pub id: String,
    pub user_id: String,
    pub skill_id: String,
    pub skill_name: String,
    pub proficiency: String,
}

pub struct BadgeRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

pub struct UserBadgeRow {
    pub id: String,
    pub user_id: String,
    pub badge_id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub earned_at: String,
}

pub struct ProjectRow {
    pub id: String,
    pub creator_id: String,
    pub title: String,
    pub description: String,
    pub max_members: i64,
    pub status: String,
    pub created_at: String,
    /// Derived by aggregation at query time, never stored.
    pub member_count: i64,
}

pub struct ProjectSkillRow {
    pub project_id: String,
    pub skill_id: String,
    pub skill_name: String,
}

pub struct PitchRow {
    pub id: String,
    pub creator_id: String,
    pub title: String,
    pub description: String,
    /// JSON array of skill ids.
    pub required_skills: String,
    pub status: String,
    pub revealed_at: Option<String>,
    pub created_at: String,
}

pub struct PitchInterestRow {
    pub id: String,
    pub pitch_id: String,
    pub user_id: String,
    pub message: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}

pub struct ConversationPartnerRow {
    pub partner: ProfileRow,
    pub unread: i64,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert, falling back to RFC 3339 for values
/// written by external tooling.
pub fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .or_else(|_| s.parse::<DateTime<Utc>>())
        .unwrap_or_else(|e| {
            tracing::warn!("Corrupt timestamp '{}': {}", s, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let t = parse_timestamp("2026-08-23 10:30:00");
        assert_eq!(t.to_rfc3339(), "2026-08-23T10:30:00+00:00");

        let t = parse_timestamp("2026-08-23T10:30:00Z");
        assert_eq!(t.to_rfc3339(), "2026-08-23T10:30:00+00:00");
    }
}
