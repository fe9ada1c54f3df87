use rusqlite::Connection;

pub mod tables {
    pub const TRACKS: &str = "tracks";
    pub const COUNTERS: &str = "counters";
    pub const EVENTS: &str = "events";

    pub const ALL_TABLES: &[&str] = &[TRACKS, COUNTERS, EVENTS];
}

pub mod columns {
    pub const TRACK_ID: &str = "track_id";
    pub const TITLE: &str = "title";
    pub const ARTIST: &str = "artist";
    pub const OWNER: &str = "owner";
    pub const LICENSE_TYPE: &str = "license_type";
    pub const PRICE: &str = "price";

    pub const NAME: &str = "name";
    pub const VALUE: &str = "value";

    pub const SEQ: &str = "seq";
    pub const KIND: &str = "kind";
    pub const SENDER: &str = "sender";
    pub const DETAIL: &str = "detail";
    pub const RECORDED_AT: &str = "recorded_at";
}

pub mod counters {
    pub const LAST_TRACK_ID: &str = "last-track-id";
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    track_id INTEGER PRIMARY KEY CHECK (track_id > 0),
    title TEXT NOT NULL,
    artist TEXT NOT NULL,
    owner TEXT NOT NULL,
    license_type TEXT NOT NULL,
    price INTEGER NOT NULL CHECK (price >= 0)
);

CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);

INSERT OR IGNORE INTO counters (name, value) VALUES ('last-track-id', 0);

CREATE TABLE IF NOT EXISTS events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    track_id INTEGER NOT NULL REFERENCES tracks (track_id),
    kind TEXT NOT NULL,
    sender TEXT NOT NULL,
    detail TEXT NOT NULL,
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS events_by_track ON events (track_id, seq);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
