use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS password_resets (
            token       TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            expires_at  TEXT NOT NULL,
            used        INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY REFERENCES users(id),
            full_name   TEXT NOT NULL DEFAULT '',
            bio         TEXT NOT NULL DEFAULT '',
            year        TEXT NOT NULL DEFAULT '',
            major       TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS skills (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS user_skills (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            skill_id    TEXT NOT NULL REFERENCES skills(id),
            proficiency TEXT NOT NULL DEFAULT 'beginner',
            UNIQUE(user_id, skill_id)
        );

        CREATE TABLE IF NOT EXISTS projects (
            id          TEXT PRIMARY KEY,
            creator_id  TEXT NOT NULL REFERENCES profiles(id),
            title       TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            max_members INTEGER NOT NULL,
            status      TEXT NOT NULL DEFAULT 'open',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS project_members (
            id          TEXT PRIMARY KEY,
            project_id  TEXT NOT NULL REFERENCES projects(id),
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            role        TEXT NOT NULL DEFAULT 'member',
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(project_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_project_members_project
            ON project_members(project_id);

        CREATE TABLE IF NOT EXISTS project_skills (
            id          TEXT PRIMARY KEY,
            project_id  TEXT NOT NULL REFERENCES projects(id),
            skill_id    TEXT NOT NULL REFERENCES skills(id),
            UNIQUE(project_id, skill_id)
        );

        CREATE TABLE IF NOT EXISTS anonymous_pitches (
            id              TEXT PRIMARY KEY,
            creator_id      TEXT NOT NULL REFERENCES profiles(id),
            title           TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            required_skills TEXT NOT NULL DEFAULT '[]',
            status          TEXT NOT NULL DEFAULT 'open',
            revealed_at     TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS pitch_interest (
            id          TEXT PRIMARY KEY,
            pitch_id    TEXT NOT NULL REFERENCES anonymous_pitches(id),
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            message     TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(pitch_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            sender_id       TEXT NOT NULL REFERENCES profiles(id),
            recipient_id    TEXT NOT NULL REFERENCES profiles(id),
            content         TEXT NOT NULL,
            read            INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender_id, recipient_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_recipient
            ON messages(recipient_id, read);

        CREATE TABLE IF NOT EXISTS badges (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            icon        TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS user_badges (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            badge_id    TEXT NOT NULL REFERENCES badges(id),
            earned_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, badge_id)
        );

        -- Seed the skill catalog
        INSERT OR IGNORE INTO skills (id, name) VALUES
            ('00000000-0000-0000-0000-000000000101', 'JavaScript'),
            ('00000000-0000-0000-0000-000000000102', 'TypeScript'),
            ('00000000-0000-0000-0000-000000000103', 'Python'),
            ('00000000-0000-0000-0000-000000000104', 'Rust'),
            ('00000000-0000-0000-0000-000000000105', 'React'),
            ('00000000-0000-0000-0000-000000000106', 'Node.js'),
            ('00000000-0000-0000-0000-000000000107', 'UI/UX Design'),
            ('00000000-0000-0000-0000-000000000108', 'Machine Learning'),
            ('00000000-0000-0000-0000-000000000109', 'Data Science'),
            ('00000000-0000-0000-0000-000000000110', 'Mobile Development'),
            ('00000000-0000-0000-0000-000000000111', 'Marketing'),
            ('00000000-0000-0000-0000-000000000112', 'Product Management');

        -- Seed the badge catalog
        INSERT OR IGNORE INTO badges (id, name, description, icon) VALUES
            ('00000000-0000-0000-0000-000000000201', 'Early Adopter',
             'Joined during the launch semester', '🚀'),
            ('00000000-0000-0000-0000-000000000202', 'First Project',
             'Created a project', '🛠️'),
            ('00000000-0000-0000-0000-000000000203', 'Team Player',
             'Joined three projects', '🤝'),
            ('00000000-0000-0000-0000-000000000204', 'Connector',
             'Started five conversations', '💬');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
