//! Database schema

/// SQL schema for initialization.
///
/// Rows are only ever inserted; `seq` preserves commit order.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    vehicle_id TEXT NOT NULL,
    route_id TEXT NOT NULL,
    turn TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    total_collected INTEGER NOT NULL,
    board_count INTEGER NOT NULL,
    record TEXT NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_route ON sessions(route_id);
CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time);
";
