use crate::Database;
use crate::models::{BadgeRow, ProfileRow, SkillRow, UserBadgeRow, UserSkillRow};
use anyhow::Result;
use rusqlite::{OptionalExtension, types::ToSql};

impl Database {
    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, full_name, bio, year, major FROM profiles WHERE id = ?1",
            )?;
            let row = stmt.query_row([user_id], map_profile).optional()?;
            Ok(row)
        })
    }

    /// Upsert keyed by identity id — the only write path for profiles.
    pub fn upsert_profile(
        &self,
        user_id: &str,
        full_name: &str,
        bio: &str,
        year: &str,
        major: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, full_name, bio, year, major)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    full_name = excluded.full_name,
                    bio = excluded.bio,
                    year = excluded.year,
                    major = excluded.major,
                    updated_at = datetime('now')",
                (user_id, full_name, bio, year, major),
            )?;
            Ok(())
        })
    }

    /// The student directory: every profile except the caller's own.
    pub fn list_profiles_except(&self, user_id: &str) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, full_name, bio, year, major FROM profiles
                 WHERE id != ?1
                 ORDER BY full_name",
            )?;
            let rows = stmt
                .query_map([user_id], map_profile)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Skills --

    pub fn list_skills(&self) -> Result<Vec<SkillRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM skills ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(SkillRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn skill_exists(&self, skill_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM skills WHERE id = ?1", [skill_id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn has_user_skill(&self, user_id: &str, skill_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM user_skills WHERE user_id = ?1 AND skill_id = ?2",
                    [user_id, skill_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn add_user_skill(
        &self,
        id: &str,
        user_id: &str,
        skill_id: &str,
        proficiency: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_skills (id, user_id, skill_id, proficiency)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, skill_id, proficiency),
            )?;
            Ok(())
        })
    }

    /// Removes a user-skill pairing. The owning user only; returns whether
    /// a row was deleted.
    pub fn remove_user_skill(&self, user_skill_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM user_skills WHERE id = ?1 AND user_id = ?2",
                [user_skill_id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn list_user_skills(&self, user_id: &str) -> Result<Vec<UserSkillRow>> {
        self.list_user_skills_for(std::slice::from_ref(&user_id.to_string()))
    }

    /// Batch-fetch skills for a set of users in a single query.
    pub fn list_user_skills_for(&self, user_ids: &[String]) -> Result<Vec<UserSkillRow>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT us.id, us.user_id, us.skill_id, s.name, us.proficiency
                 FROM user_skills us
                 JOIN skills s ON s.id = us.skill_id
                 WHERE us.user_id IN ({})
                 ORDER BY s.name",
                placeholders(user_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn ToSql> = user_ids.iter().map(|id| id as &dyn ToSql).collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(UserSkillRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        skill_id: row.get(2)?,
                        skill_name: row.get(3)?,
                        proficiency: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Badges --

    pub fn list_badges(&self) -> Result<Vec<BadgeRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, description, icon FROM badges ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(BadgeRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        icon: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_user_badges(&self, user_id: &str) -> Result<Vec<UserBadgeRow>> {
        self.list_user_badges_for(std::slice::from_ref(&user_id.to_string()))
    }

    /// Batch-fetch earned badges for a set of users in a single query.
    pub fn list_user_badges_for(&self, user_ids: &[String]) -> Result<Vec<UserBadgeRow>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT ub.id, ub.user_id, ub.badge_id, b.name, b.description, b.icon, ub.earned_at
                 FROM user_badges ub
                 JOIN badges b ON b.id = ub.badge_id
                 WHERE ub.user_id IN ({})
                 ORDER BY ub.earned_at",
                placeholders(user_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn ToSql> = user_ids.iter().map(|id| id as &dyn ToSql).collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(UserBadgeRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        badge_id: row.get(2)?,
                        name: row.get(3)?,
                        description: row.get(4)?,
                        icon: row.get(5)?,
                        earned_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_profile(row: &rusqlite::Row<'_>) -> std::result::Result<ProfileRow, rusqlite::Error> {
    Ok(ProfileRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        bio: row.get(2)?,
        year: row.get(3)?,
        major: row.get(4)?,
    })
}

pub(crate) fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::test_util::{seed_student, seed_user};
    use uuid::Uuid;

    #[test]
    fn upsert_profile_inserts_then_updates() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "a@campus.edu");

        db.upsert_profile(&id, "Ada Lovelace", "first programmer", "senior", "CS")
            .unwrap();
        let p = db.get_profile(&id).unwrap().unwrap();
        assert_eq!(p.full_name, "Ada Lovelace");

        db.upsert_profile(&id, "Ada King", "first programmer", "senior", "CS")
            .unwrap();
        let p = db.get_profile(&id).unwrap().unwrap();
        assert_eq!(p.full_name, "Ada King");
    }

    #[test]
    fn directory_excludes_the_caller() {
        let db = Database::open_in_memory().unwrap();
        let me = seed_student(&db, "me@campus.edu", "Me");
        seed_student(&db, "a@campus.edu", "Ada");
        seed_student(&db, "b@campus.edu", "Brian");

        let students = db.list_profiles_except(&me).unwrap();
        assert_eq!(students.len(), 2);
        assert!(students.iter().all(|s| s.id != me));
    }

    #[test]
    fn duplicate_user_skill_pairing_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "a@campus.edu");
        let rust = "00000000-0000-0000-0000-000000000104";

        db.add_user_skill(&Uuid::new_v4().to_string(), &id, rust, "beginner")
            .unwrap();
        assert!(db.has_user_skill(&id, rust).unwrap());
        assert!(
            db.add_user_skill(&Uuid::new_v4().to_string(), &id, rust, "advanced")
                .is_err()
        );
    }

    #[test]
    fn remove_user_skill_is_owner_scoped() {
        let db = Database::open_in_memory().unwrap();
        let owner = seed_user(&db, "a@campus.edu");
        let other = seed_user(&db, "b@campus.edu");
        let rust = "00000000-0000-0000-0000-000000000104";

        let us_id = Uuid::new_v4().to_string();
        db.add_user_skill(&us_id, &owner, rust, "intermediate").unwrap();

        assert!(!db.remove_user_skill(&us_id, &other).unwrap());
        assert!(db.remove_user_skill(&us_id, &owner).unwrap());
        assert!(db.list_user_skills(&owner).unwrap().is_empty());
    }
}
