//! SQL migration definitions for the catalog database.
//!
//! Migrations are applied in order on database open. Every statement is
//! `IF NOT EXISTS`, so a catalog created by other tooling keeps its own
//! `frbs` column set.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: schema_migrations, frbs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Confirmed bursts, one row per canonical name
CREATE TABLE IF NOT EXISTS frbs (
    Name      TEXT NOT NULL UNIQUE,
    ra        REAL,
    dec       REAL,
    DM        REAL,
    z         REAL,
    z_type    TEXT,
    RM        REAL,
    RM_err    REAL,
    telescope TEXT,
    repeater  TEXT DEFAULT 'no',
    refs      TEXT,
    mjd       REAL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
