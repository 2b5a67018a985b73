use crate::Database;
use crate::models::{ConversationPartnerRow, MessageRow, ProfileRow};
use anyhow::Result;

impl Database {
    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, content)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, sender_id, recipient_id, content),
            )?;
            Ok(())
        })
    }

    /// Full two-way history for the unordered participant pair, creation
    /// time ascending.
    pub fn conversation(&self, user_id: &str, partner_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, recipient_id, content, read, created_at
                 FROM messages
                 WHERE (sender_id = ?1 AND recipient_id = ?2)
                    OR (sender_id = ?2 AND recipient_id = ?1)
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([user_id, partner_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        recipient_id: row.get(2)?,
                        content: row.get(3)?,
                        read: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks everything unread from the partner as read. Returns the number
    /// of rows that flipped, so re-opening a conversation is a no-op.
    pub fn mark_conversation_read(&self, user_id: &str, partner_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE messages SET read = 1
                 WHERE sender_id = ?2 AND recipient_id = ?1 AND read = 0",
                [user_id, partner_id],
            )?;
            Ok(n)
        })
    }

    /// The conversation partner set is derived, not stored: the union of
    /// distinct recipients of sent messages and senders of received ones,
    /// with the unread count per partner.
    pub fn conversation_partners(&self, user_id: &str) -> Result<Vec<ConversationPartnerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.full_name, p.bio, p.year, p.major,
                        (SELECT COUNT(*) FROM messages m
                         WHERE m.sender_id = p.id AND m.recipient_id = ?1 AND m.read = 0)
                 FROM profiles p
                 WHERE p.id IN (
                     SELECT recipient_id FROM messages WHERE sender_id = ?1
                     UNION
                     SELECT sender_id FROM messages WHERE recipient_id = ?1
                 )
                 ORDER BY p.full_name",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationPartnerRow {
                        partner: ProfileRow {
                            id: row.get(0)?,
                            full_name: row.get(1)?,
                            bio: row.get(2)?,
                            year: row.get(3)?,
                            major: row.get(4)?,
                        },
                        unread: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::test_util::seed_student;
    use uuid::Uuid;

    fn send(db: &Database, from: &str, to: &str, content: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_message(&id, from, to, content).unwrap();
        id
    }

    #[test]
    fn conversation_is_visible_to_both_sides_in_order() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_student(&db, "ada@campus.edu", "Ada");
        let brian = seed_student(&db, "brian@campus.edu", "Brian");

        send(&db, &ada, &brian, "hey");
        send(&db, &brian, &ada, "hi!");
        send(&db, &ada, &brian, "want to build something?");

        let from_ada = db.conversation(&ada, &brian).unwrap();
        let from_brian = db.conversation(&brian, &ada).unwrap();

        let contents: Vec<_> = from_ada.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hey", "hi!", "want to build something?"]);
        assert_eq!(from_ada.len(), from_brian.len());
        assert_eq!(from_ada[0].id, from_brian[0].id);
    }

    #[test]
    fn partners_are_the_union_of_sent_and_received() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_student(&db, "ada@campus.edu", "Ada");
        let brian = seed_student(&db, "brian@campus.edu", "Brian");
        let carol = seed_student(&db, "carol@campus.edu", "Carol");
        seed_student(&db, "dan@campus.edu", "Dan");

        send(&db, &ada, &brian, "sent to brian");
        send(&db, &carol, &ada, "carol writes in");

        let partners = db.conversation_partners(&ada).unwrap();
        let names: Vec<_> = partners.iter().map(|p| p.partner.full_name.as_str()).collect();
        assert_eq!(names, ["Brian", "Carol"]);
    }

    #[test]
    fn partner_set_is_distinct_despite_many_messages() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_student(&db, "ada@campus.edu", "Ada");
        let brian = seed_student(&db, "brian@campus.edu", "Brian");

        for i in 0..4 {
            send(&db, &ada, &brian, &format!("m{i}"));
            send(&db, &brian, &ada, &format!("r{i}"));
        }

        assert_eq!(db.conversation_partners(&ada).unwrap().len(), 1);
    }

    #[test]
    fn opening_a_conversation_marks_unread_once() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_student(&db, "ada@campus.edu", "Ada");
        let brian = seed_student(&db, "brian@campus.edu", "Brian");

        send(&db, &brian, &ada, "one");
        send(&db, &brian, &ada, "two");
        send(&db, &ada, &brian, "reply");

        let partners = db.conversation_partners(&ada).unwrap();
        assert_eq!(partners[0].unread, 2);

        // First open flips both; re-opening flips nothing.
        assert_eq!(db.mark_conversation_read(&ada, &brian).unwrap(), 2);
        assert_eq!(db.mark_conversation_read(&ada, &brian).unwrap(), 0);

        // Ada's own outgoing message stays untouched on Brian's side.
        let partners = db.conversation_partners(&brian).unwrap();
        assert_eq!(partners[0].unread, 1);
    }
}
