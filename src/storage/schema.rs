//! Database schema definitions.
//!
//! This module contains the complete SQLite schema for Venturer.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the Venturer database.
///
/// Timestamps are stored as INTEGER (Unix milliseconds); calendar dates as
/// TEXT (`YYYY-MM-DD`).
pub const SCHEMA_SQL: &str = r#"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Accounts
-- ====================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'invited')),
    invited_by TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Bearer sessions for the HTTP server. Only the SHA-256 of the token is kept.
CREATE TABLE IF NOT EXISTS user_sessions (
    token_hash TEXT PRIMARY KEY,
    user_email TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    FOREIGN KEY (user_email) REFERENCES users(email) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_user_sessions_user ON user_sessions(user_email);

CREATE TABLE IF NOT EXISTS user_subscriptions (
    id TEXT PRIMARY KEY,
    user_email TEXT NOT NULL UNIQUE,
    plan TEXT NOT NULL DEFAULT 'free' CHECK (plan IN ('free', 'pro', 'team')),
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'trialing', 'canceled')),
    renews_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (user_email) REFERENCES users(email) ON DELETE CASCADE
);

-- ====================
-- Teams
-- ====================

CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    owner TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS team_members (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL,
    user_email TEXT NOT NULL,
    display_name TEXT,
    role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('lead', 'member', 'viewer')),
    joined_at INTEGER NOT NULL,
    FOREIGN KEY (team_id) REFERENCES teams(id) ON DELETE CASCADE,
    UNIQUE(team_id, user_email)
);

CREATE INDEX IF NOT EXISTS idx_team_members_team ON team_members(team_id);
CREATE INDEX IF NOT EXISTS idx_team_members_user ON team_members(user_email);

-- ====================
-- Work hierarchy
-- ====================

CREATE TABLE IF NOT EXISTS ventures (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'paused', 'archived')),
    owner TEXT NOT NULL,
    team_id TEXT,
    color TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (team_id) REFERENCES teams(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_ventures_owner ON ventures(owner);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    venture_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'planning'
        CHECK (status IN ('planning', 'active', 'on_hold', 'completed', 'archived')),
    start_date TEXT,
    target_date TEXT,
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (venture_id) REFERENCES ventures(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_projects_venture ON projects(venture_id);

CREATE TABLE IF NOT EXISTS milestones (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    due_date TEXT,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'in_progress', 'completed')),
    position INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_milestones_project ON milestones(project_id, position);

CREATE TABLE IF NOT EXISTS workstreams (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    lead TEXT,
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'paused', 'completed')),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_workstreams_project ON workstreams(project_id);

CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    item_type TEXT NOT NULL DEFAULT 'task' CHECK (item_type IN ('task', 'note', 'idea')),
    status TEXT NOT NULL DEFAULT 'todo' CHECK (status IN ('todo', 'in_progress', 'blocked', 'completed')),
    venture_id TEXT,
    project_id TEXT,
    milestone_id TEXT,
    workstream_id TEXT,
    parent_id TEXT,
    assigned_to TEXT,
    due_date TEXT,
    s_sextant INTEGER CHECK (s_sextant IS NULL OR s_sextant BETWEEN 1 AND 6),
    t_time INTEGER CHECK (t_time IS NULL OR t_time BETWEEN 1 AND 3),
    e_effort INTEGER CHECK (e_effort IS NULL OR e_effort BETWEEN 1 AND 3),
    p_priority INTEGER CHECK (p_priority IS NULL OR p_priority BETWEEN 1 AND 3),
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    completed_at INTEGER,
    FOREIGN KEY (venture_id) REFERENCES ventures(id) ON DELETE CASCADE,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    FOREIGN KEY (milestone_id) REFERENCES milestones(id) ON DELETE SET NULL,
    FOREIGN KEY (workstream_id) REFERENCES workstreams(id) ON DELETE SET NULL,
    FOREIGN KEY (parent_id) REFERENCES items(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_items_venture ON items(venture_id);
CREATE INDEX IF NOT EXISTS idx_items_project ON items(project_id);
CREATE INDEX IF NOT EXISTS idx_items_parent ON items(parent_id);
CREATE INDEX IF NOT EXISTS idx_items_assignee_status ON items(assigned_to, status);

-- ====================
-- Associations (polymorphic edges)
-- ====================

CREATE TABLE IF NOT EXISTS associations (
    id TEXT PRIMARY KEY,
    from_entity_type TEXT NOT NULL CHECK (from_entity_type IN ('task', 'milestone', 'workstream')),
    from_entity_id TEXT NOT NULL,
    to_entity_type TEXT NOT NULL CHECK (to_entity_type IN ('task', 'milestone', 'workstream')),
    to_entity_id TEXT NOT NULL,
    relationship_type TEXT NOT NULL CHECK (relationship_type IN (
        'blocks', 'blocked_by', 'depends_on', 'aids', 'aided_by',
        'relates_to', 'parent_of', 'child_of'
    )),
    note TEXT,
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE(from_entity_type, from_entity_id, to_entity_type, to_entity_id, relationship_type)
);

CREATE INDEX IF NOT EXISTS idx_associations_from ON associations(from_entity_type, from_entity_id);
CREATE INDEX IF NOT EXISTS idx_associations_to ON associations(to_entity_type, to_entity_id);

-- Endpoints are polymorphic, so dangling edges are cleaned up by trigger.
CREATE TRIGGER IF NOT EXISTS associations_cleanup_items
AFTER DELETE ON items
BEGIN
    DELETE FROM associations
    WHERE (from_entity_type = 'task' AND from_entity_id = OLD.id)
       OR (to_entity_type = 'task' AND to_entity_id = OLD.id);
END;

CREATE TRIGGER IF NOT EXISTS associations_cleanup_milestones
AFTER DELETE ON milestones
BEGIN
    DELETE FROM associations
    WHERE (from_entity_type = 'milestone' AND from_entity_id = OLD.id)
       OR (to_entity_type = 'milestone' AND to_entity_id = OLD.id);
END;

CREATE TRIGGER IF NOT EXISTS associations_cleanup_workstreams
AFTER DELETE ON workstreams
BEGIN
    DELETE FROM associations
    WHERE (from_entity_type = 'workstream' AND from_entity_id = OLD.id)
       OR (to_entity_type = 'workstream' AND to_entity_id = OLD.id);
END;

-- ====================
-- Templates
-- ====================

CREATE TABLE IF NOT EXISTS project_templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT,
    tasks TEXT NOT NULL DEFAULT '[]',
    milestones TEXT NOT NULL DEFAULT '[]',
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ====================
-- Audit Events
-- ====================

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    comment TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_events_created ON events(created_at DESC);
"#;

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "users",
            "user_sessions",
            "user_subscriptions",
            "teams",
            "team_members",
            "ventures",
            "projects",
            "milestones",
            "workstreams",
            "items",
            "associations",
            "project_templates",
            "events",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_step_constraints() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let ok = conn.execute(
            "INSERT INTO items (id, title, s_sextant, p_priority, created_by, created_at, updated_at)
             VALUES ('i1', 'ok', 6, 3, 'u', 0, 0)",
            [],
        );
        assert!(ok.is_ok());

        let bad = conn.execute(
            "INSERT INTO items (id, title, s_sextant, created_by, created_at, updated_at)
             VALUES ('i2', 'bad', 7, 'u', 0, 0)",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_item_delete_removes_associations() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        conn.execute_batch(
            "INSERT INTO items (id, title, created_by, created_at, updated_at) VALUES ('a', 'A', 'u', 0, 0);
             INSERT INTO items (id, title, created_by, created_at, updated_at) VALUES ('b', 'B', 'u', 0, 0);
             INSERT INTO associations (id, from_entity_type, from_entity_id, to_entity_type, to_entity_id,
                                       relationship_type, created_by, created_at)
             VALUES ('x', 'task', 'a', 'task', 'b', 'blocks', 'u', 0);
             DELETE FROM items WHERE id = 'b';",
        )
        .unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM associations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
