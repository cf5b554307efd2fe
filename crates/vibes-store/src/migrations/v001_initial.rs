//! v001 -- Initial schema creation.
//!
//! Creates the `websites` and `users` collections.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Websites
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS websites (
    id          TEXT PRIMARY KEY NOT NULL,   -- UUID v4, opaque to clients
    url         TEXT NOT NULL,               -- not UNIQUE: checked before insert
    thumbnail   TEXT NOT NULL,               -- tagged JSON (inline / generated / external)
    description TEXT,
    created_by  TEXT NOT NULL,
    user_id     TEXT NOT NULL,               -- account id or 'guest'
    user_name   TEXT NOT NULL,
    created_at  INTEGER NOT NULL             -- epoch milliseconds
);

CREATE INDEX IF NOT EXISTS idx_websites_url ON websites(url);
CREATE INDEX IF NOT EXISTS idx_websites_user_id ON websites(user_id);
CREATE INDEX IF NOT EXISTS idx_websites_created_at ON websites(created_at DESC);

-- ----------------------------------------------------------------
-- Users (profiles)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    uid          TEXT PRIMARY KEY NOT NULL,
    display_name TEXT NOT NULL,
    email        TEXT,
    photo_url    TEXT,
    is_admin     INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    created_at   TEXT NOT NULL               -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
