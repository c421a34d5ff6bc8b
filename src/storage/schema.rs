use rusqlite::Connection;

pub mod tables {
    pub const NOMINATIONS: &str = "nominations";
    pub const NOMINATION_VOTERS: &str = "nomination_voters";

    #[cfg(test)]
    pub const ALL_TABLES: &[&str] = &[NOMINATIONS, NOMINATION_VOTERS];
}

pub mod columns {
    pub const POSITION: &str = "position";
    pub const URL: &str = "url";
    pub const NAME: &str = "name";
    pub const ARTIST: &str = "artist";
    pub const VOTES: &str = "votes";
    pub const ADDED_AT: &str = "added_at";
    pub const VOTER_ID: &str = "voter_id";
}

/// `added_at` is stored as `YYYY-MM-DD`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS nominations (
    position INTEGER NOT NULL,
    url TEXT NOT NULL PRIMARY KEY,
    name TEXT NOT NULL,
    artist TEXT NOT NULL,
    votes INTEGER NOT NULL CHECK (votes >= 1),
    added_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS nomination_voters (
    url TEXT NOT NULL REFERENCES nominations(url) ON DELETE CASCADE,
    voter_id TEXT NOT NULL,
    PRIMARY KEY (url, voter_id)
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
