//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Callboard database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Source catalog read by the scheduler
CREATE TABLE IF NOT EXISTS data_sources (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    kind TEXT NOT NULL,
    crawler_name TEXT NOT NULL,
    frequency_hours INTEGER NOT NULL CHECK (frequency_hours > 0),
    active INTEGER NOT NULL DEFAULT 1,
    last_crawled_at TEXT,
    config TEXT NOT NULL DEFAULT 'null'
);

-- One row per crawl attempt
CREATE TABLE IF NOT EXISTS crawl_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_name TEXT NOT NULL,
    status TEXT NOT NULL,
    items_found INTEGER NOT NULL DEFAULT 0,
    items_added INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    CHECK (items_added <= items_found)
);

CREATE INDEX IF NOT EXISTS idx_crawl_jobs_created ON crawl_jobs(created_at);
CREATE INDEX IF NOT EXISTS idx_crawl_jobs_status ON crawl_jobs(status);

-- Normalized open-call listings, deduplicated on (title, organizer)
CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    type TEXT NOT NULL,
    organizer TEXT NOT NULL,
    deadline TEXT NOT NULL,
    location TEXT NOT NULL,
    website TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    fee REAL,
    prize TEXT NOT NULL,
    requirements TEXT NOT NULL DEFAULT '{}',
    tags TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(title, organizer)
);

CREATE INDEX IF NOT EXISTS idx_submissions_deadline ON submissions(deadline);
CREATE INDEX IF NOT EXISTS idx_submissions_type ON submissions(type);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
