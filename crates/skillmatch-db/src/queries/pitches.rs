use crate::Database;
use crate::models::{PitchInterestRow, PitchRow, ProfileRow};
use anyhow::Result;
use rusqlite::OptionalExtension;

const PITCH_COLUMNS: &str =
    "id, creator_id, title, description, required_skills, status, revealed_at, created_at";

impl Database {
    pub fn create_pitch(
        &self,
        id: &str,
        creator_id: &str,
        title: &str,
        description: &str,
        required_skills_json: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO anonymous_pitches
                     (id, creator_id, title, description, required_skills, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'open')",
                (id, creator_id, title, description, required_skills_json),
            )?;
            Ok(())
        })
    }

    /// Browse view: open pitches only, excluding the caller's own, newest
    /// first. Revealed pitches drop out implicitly via the status filter.
    pub fn list_open_pitches_excluding(&self, user_id: &str) -> Result<Vec<PitchRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PITCH_COLUMNS} FROM anonymous_pitches
                 WHERE status = 'open' AND creator_id != ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_pitch)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_pitches_by(&self, creator_id: &str) -> Result<Vec<PitchRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PITCH_COLUMNS} FROM anonymous_pitches
                 WHERE creator_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([creator_id], map_pitch)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_pitch(&self, id: &str) -> Result<Option<PitchRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {PITCH_COLUMNS} FROM anonymous_pitches WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_pitch).optional()?;
            Ok(row)
        })
    }

    /// One-way `open -> revealed` transition, creator-triggered only.
    /// Returns whether a row transitioned.
    pub fn reveal_pitch(&self, id: &str, creator_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE anonymous_pitches
                 SET status = 'revealed', revealed_at = datetime('now')
                 WHERE id = ?1 AND creator_id = ?2 AND status = 'open'",
                [id, creator_id],
            )?;
            Ok(n > 0)
        })
    }

    // -- Interest --

    pub fn add_pitch_interest(
        &self,
        id: &str,
        pitch_id: &str,
        user_id: &str,
        message: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pitch_interest (id, pitch_id, user_id, message)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, pitch_id, user_id, message),
            )?;
            Ok(())
        })
    }

    pub fn has_pitch_interest(&self, pitch_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM pitch_interest WHERE pitch_id = ?1 AND user_id = ?2",
                    [pitch_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Interests with each interested user's profile, for the creator's own
    /// pitch view.
    pub fn list_pitch_interests(&self, pitch_id: &str) -> Result<Vec<(PitchInterestRow, ProfileRow)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT pi.id, pi.pitch_id, pi.user_id, pi.message, pi.created_at,
                        p.id, p.full_name, p.bio, p.year, p.major
                 FROM pitch_interest pi
                 JOIN profiles p ON p.id = pi.user_id
                 WHERE pi.pitch_id = ?1
                 ORDER BY pi.created_at",
            )?;
            let rows = stmt
                .query_map([pitch_id], |row| {
                    Ok((
                        PitchInterestRow {
                            id: row.get(0)?,
                            pitch_id: row.get(1)?,
                            user_id: row.get(2)?,
                            message: row.get(3)?,
                            created_at: row.get(4)?,
                        },
                        ProfileRow {
                            id: row.get(5)?,
                            full_name: row.get(6)?,
                            bio: row.get(7)?,
                            year: row.get(8)?,
                            major: row.get(9)?,
                        },
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_pitch(row: &rusqlite::Row<'_>) -> std::result::Result<PitchRow, rusqlite::Error> {
    Ok(PitchRow {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        required_skills: row.get(4)?,
        status: row.get(5)?,
        revealed_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::test_util::seed_student;
    use uuid::Uuid;

    fn pitch(db: &Database, creator: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_pitch(&id, creator, "Stealth idea", "details", "[]")
            .unwrap();
        id
    }

    #[test]
    fn creator_never_sees_their_own_open_pitch_in_browse() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_student(&db, "ada@campus.edu", "Ada");
        let brian = seed_student(&db, "brian@campus.edu", "Brian");

        pitch(&db, &ada);

        assert!(db.list_open_pitches_excluding(&ada).unwrap().is_empty());
        assert_eq!(db.list_open_pitches_excluding(&brian).unwrap().len(), 1);
    }

    #[test]
    fn reveal_is_one_way_and_creator_only() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_student(&db, "ada@campus.edu", "Ada");
        let brian = seed_student(&db, "brian@campus.edu", "Brian");

        let id = pitch(&db, &ada);

        // Not the creator: no transition.
        assert!(!db.reveal_pitch(&id, &brian).unwrap());

        assert!(db.reveal_pitch(&id, &ada).unwrap());
        let row = db.get_pitch(&id).unwrap().unwrap();
        assert_eq!(row.status, "revealed");
        assert!(row.revealed_at.is_some());

        // Already revealed: the transition does not fire twice.
        assert!(!db.reveal_pitch(&id, &ada).unwrap());
    }

    #[test]
    fn revealed_pitch_leaves_the_browse_list() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_student(&db, "ada@campus.edu", "Ada");
        let brian = seed_student(&db, "brian@campus.edu", "Brian");

        let id = pitch(&db, &ada);
        assert_eq!(db.list_open_pitches_excluding(&brian).unwrap().len(), 1);

        db.reveal_pitch(&id, &ada).unwrap();
        assert!(db.list_open_pitches_excluding(&brian).unwrap().is_empty());
    }

    #[test]
    fn interest_is_unique_per_user() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_student(&db, "ada@campus.edu", "Ada");
        let brian = seed_student(&db, "brian@campus.edu", "Brian");

        let id = pitch(&db, &ada);
        db.add_pitch_interest(&Uuid::new_v4().to_string(), &id, &brian, "hi")
            .unwrap();
        assert!(db.has_pitch_interest(&id, &brian).unwrap());
        assert!(
            db.add_pitch_interest(&Uuid::new_v4().to_string(), &id, &brian, "again")
                .is_err()
        );

        let interests = db.list_pitch_interests(&id).unwrap();
        assert_eq!(interests.len(), 1);
        assert_eq!(interests[0].1.full_name, "Brian");
    }
}
