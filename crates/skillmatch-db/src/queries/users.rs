use crate::Database;
use crate::models::UserRow;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

impl Database {
    /// Creates a user together with its empty profile row. The profile is
    /// the identity-linked record every other table references.
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            )?;
            tx.execute("INSERT INTO profiles (id) VALUES (?1)", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn update_password(&self, user_id: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                (password_hash, user_id),
            )?;
            Ok(())
        })
    }

    // -- Password resets --

    pub fn create_password_reset(&self, token: &str, user_id: &str, ttl_minutes: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO password_resets (token, user_id, expires_at)
                 VALUES (?1, ?2, datetime('now', ?3 || ' minutes'))",
                params![token, user_id, ttl_minutes],
            )?;
            Ok(())
        })
    }

    /// Marks the token used and returns its user id. A token can be
    /// consumed exactly once and only before it expires.
    pub fn consume_password_reset(&self, token: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let user_id: Option<String> = tx
                .query_row(
                    "SELECT user_id FROM password_resets
                     WHERE token = ?1 AND used = 0 AND expires_at > datetime('now')",
                    [token],
                    |row| row.get(0),
                )
                .optional()?;

            if user_id.is_some() {
                tx.execute("UPDATE password_resets SET used = 1 WHERE token = ?1", [token])?;
            }
            tx.commit()?;
            Ok(user_id)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, email, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::test_util::seed_user;

    #[test]
    fn register_creates_user_and_empty_profile() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "a@campus.edu");

        let user = db.get_user_by_email("a@campus.edu").unwrap().unwrap();
        assert_eq!(user.id, id);

        let profile = db.get_profile(&id).unwrap().unwrap();
        assert_eq!(profile.full_name, "");
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "a@campus.edu");
        assert!(db.create_user("other-id", "a@campus.edu", "h").is_err());
    }

    #[test]
    fn password_reset_token_is_single_use() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "a@campus.edu");

        db.create_password_reset("tok", &id, 60).unwrap();
        assert_eq!(db.consume_password_reset("tok").unwrap(), Some(id));
        assert_eq!(db.consume_password_reset("tok").unwrap(), None);
    }

    #[test]
    fn expired_reset_token_is_refused() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "a@campus.edu");

        db.create_password_reset("tok", &id, -1).unwrap();
        assert_eq!(db.consume_password_reset("tok").unwrap(), None);
    }
}
