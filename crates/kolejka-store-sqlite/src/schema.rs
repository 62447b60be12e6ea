//! SQL schema for the kolejka SQLite cache.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Note on `UNIQUE (ordinal, group_id, office_id)`: SQLite treats NULL
/// ordinals as pairwise distinct there, so the absent-ordinal bucket is
/// enforced by the two-branch lookup in the store, with the constraint
/// covering only the numbered case.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS offices (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    key  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS matters (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL,
    ordinal   INTEGER,          -- NULL for matters without an ordinal
    group_id  INTEGER NOT NULL,
    office_id INTEGER NOT NULL REFERENCES offices (id),
    UNIQUE (ordinal, group_id, office_id)
);

CREATE TABLE IF NOT EXISTS samples (
    time           TEXT NOT NULL,     -- 'YYYY-MM-DD HH:MM', minute resolution
    matter_id      INTEGER NOT NULL REFERENCES matters (id),
    open_counters  INTEGER NOT NULL,
    queue_length   INTEGER NOT NULL,
    current_number TEXT NOT NULL,
    PRIMARY KEY (time, matter_id)
);

-- One row per office: the instant of its last successful network refresh.
CREATE TABLE IF NOT EXISTS last_connection (
    office_id INTEGER PRIMARY KEY REFERENCES offices (id),
    time      TEXT NOT NULL           -- RFC 3339 UTC
);

CREATE INDEX IF NOT EXISTS matters_office_idx ON matters(office_id);
CREATE INDEX IF NOT EXISTS samples_matter_idx ON samples(matter_id);

PRAGMA user_version = 1;
";
