use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::DbConfig;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sports (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT UNIQUE
);

CREATE TABLE IF NOT EXISTS countries (
    alpha2 TEXT PRIMARY KEY,
    alpha3 TEXT NULL,
    name TEXT NULL,
    slug TEXT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NULL,
    sport_id INTEGER NOT NULL REFERENCES sports(id),
    flag TEXT NULL,
    alpha2 TEXT NULL,
    translations TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS unique_tournaments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NULL,
    category_id INTEGER NULL REFERENCES categories(id),
    user_count INTEGER NULL,
    flags TEXT NOT NULL DEFAULT '{}',
    colors TEXT NOT NULL DEFAULT '{}',
    translations TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS tournaments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NULL,
    unique_tournament_id INTEGER NULL REFERENCES unique_tournaments(id),
    category_id INTEGER NULL REFERENCES categories(id),
    priority INTEGER NULL,
    translations TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS seasons (
    id INTEGER PRIMARY KEY,
    tournament_id INTEGER NULL REFERENCES tournaments(id),
    name TEXT NULL,
    year TEXT NULL,
    editor INTEGER NULL
);

CREATE TABLE IF NOT EXISTS teams (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NULL,
    short_name TEXT NULL,
    country_alpha2 TEXT NULL REFERENCES countries(alpha2),
    national INTEGER NULL,
    disabled INTEGER NULL,
    type INTEGER NULL,
    foundation_ts INTEGER NULL,
    colors TEXT NOT NULL DEFAULT '{}',
    translations TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NULL,
    short_name TEXT NULL,
    position TEXT NULL,
    jersey_number TEXT NULL,
    height INTEGER NULL,
    date_of_birth_ts INTEGER NULL,
    country_alpha2 TEXT NULL REFERENCES countries(alpha2),
    market_value_eur INTEGER NULL,
    extra TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS venues (
    id INTEGER PRIMARY KEY,
    name TEXT NULL,
    slug TEXT NULL,
    city TEXT NULL,
    capacity INTEGER NULL,
    country_alpha2 TEXT NULL REFERENCES countries(alpha2),
    lat REAL NULL,
    lon REAL NULL,
    translations TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS referees (
    id INTEGER PRIMARY KEY,
    name TEXT NULL,
    country_alpha2 TEXT NULL REFERENCES countries(alpha2),
    stats TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY,
    slug TEXT NULL,
    tournament_id INTEGER NULL REFERENCES tournaments(id),
    season_id INTEGER NULL REFERENCES seasons(id),
    round INTEGER NULL,
    round_name TEXT NULL,
    status_code INTEGER NULL,
    status_desc TEXT NULL,
    status_type TEXT NULL,
    winner_code INTEGER NULL,
    start_ts INTEGER NULL,
    final_result_only INTEGER NULL,
    venue_id INTEGER NULL REFERENCES venues(id),
    referee_id INTEGER NULL REFERENCES referees(id),
    has_player_stats INTEGER NULL,
    has_player_heatmap INTEGER NULL,
    extra TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS event_teams (
    event_id INTEGER NOT NULL REFERENCES events(id),
    team_id INTEGER NOT NULL REFERENCES teams(id),
    side TEXT NOT NULL CHECK (side IN ('home', 'away')),
    PRIMARY KEY (event_id, side)
);

CREATE TABLE IF NOT EXISTS event_scores (
    event_id INTEGER PRIMARY KEY REFERENCES events(id),
    home_current INTEGER NULL,
    away_current INTEGER NULL,
    home_display INTEGER NULL,
    away_display INTEGER NULL,
    home_p1 INTEGER NULL,
    away_p1 INTEGER NULL,
    home_p2 INTEGER NULL,
    away_p2 INTEGER NULL,
    home_normaltime INTEGER NULL,
    away_normaltime INTEGER NULL,
    home_pen INTEGER NULL,
    away_pen INTEGER NULL
);

CREATE TABLE IF NOT EXISTS lineups (
    event_id INTEGER NOT NULL REFERENCES events(id),
    team_id INTEGER NOT NULL REFERENCES teams(id),
    formation TEXT NULL,
    confirmed INTEGER NULL,
    PRIMARY KEY (event_id, team_id)
);

CREATE TABLE IF NOT EXISTS lineup_players (
    event_id INTEGER NOT NULL,
    team_id INTEGER NOT NULL,
    player_id INTEGER NOT NULL REFERENCES players(id),
    position TEXT NULL,
    shirt_number INTEGER NULL,
    role TEXT NOT NULL CHECK (role IN ('starter', 'sub')),
    country_alpha2 TEXT NULL,
    PRIMARY KEY (event_id, team_id, player_id, role),
    FOREIGN KEY (event_id, team_id) REFERENCES lineups(event_id, team_id)
);

CREATE TABLE IF NOT EXISTS player_heatmaps (
    event_id INTEGER NOT NULL REFERENCES events(id),
    player_id INTEGER NOT NULL REFERENCES players(id),
    seq INTEGER NOT NULL,
    x INTEGER NULL,
    y INTEGER NULL,
    PRIMARY KEY (event_id, player_id, seq)
);

CREATE TABLE IF NOT EXISTS player_transfers (
    id INTEGER PRIMARY KEY,
    player_id INTEGER NULL REFERENCES players(id),
    from_team_id INTEGER NULL REFERENCES teams(id),
    to_team_id INTEGER NULL REFERENCES teams(id),
    transfer_fee_eur INTEGER NULL,
    transfer_fee_desc TEXT NULL,
    transfer_ts INTEGER NULL
);

CREATE TABLE IF NOT EXISTS player_statistics (
    event_id INTEGER NOT NULL REFERENCES events(id),
    player_id INTEGER NOT NULL REFERENCES players(id),
    rating REAL NULL,
    stats TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (event_id, player_id)
);

CREATE TABLE IF NOT EXISTS team_statistics (
    event_id INTEGER NOT NULL REFERENCES events(id),
    team_id INTEGER NOT NULL REFERENCES teams(id),
    side TEXT NOT NULL CHECK (side IN ('home', 'away')),
    stats TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (event_id, team_id)
);

CREATE TABLE IF NOT EXISTS standings (
    tournament_id INTEGER NOT NULL,
    season_id INTEGER NOT NULL,
    group_name TEXT NOT NULL,
    team_id INTEGER NOT NULL REFERENCES teams(id),
    rank INTEGER NULL,
    played INTEGER NULL,
    wins INTEGER NULL,
    draws INTEGER NULL,
    losses INTEGER NULL,
    gf INTEGER NULL,
    ga INTEGER NULL,
    gd INTEGER NULL,
    points INTEGER NULL,
    extra TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (tournament_id, season_id, group_name, team_id)
);

CREATE TABLE IF NOT EXISTS tournament_featured_events (
    tournament_id INTEGER NOT NULL,
    event_id INTEGER NOT NULL,
    PRIMARY KEY (tournament_id, event_id)
);

CREATE TABLE IF NOT EXISTS tournament_videos (
    tournament_id INTEGER NOT NULL,
    season_id INTEGER NOT NULL,
    video_id TEXT NOT NULL,
    payload TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (tournament_id, season_id, video_id)
);

CREATE TABLE IF NOT EXISTS trending_players (
    player_id INTEGER NOT NULL REFERENCES players(id),
    event_id INTEGER NOT NULL DEFAULT 0,
    rating REAL NULL,
    payload TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (player_id, event_id)
);

CREATE TABLE IF NOT EXISTS suggestions (
    entity_type TEXT NOT NULL
        CHECK (entity_type IN ('team', 'player', 'unique_tournament', 'tournament')),
    entity_id TEXT NOT NULL,
    score INTEGER NULL,
    payload TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (entity_type, entity_id)
);

CREATE TABLE IF NOT EXISTS live_category_counts (
    category_id INTEGER PRIMARY KEY,
    live_count INTEGER NULL
);

CREATE TABLE IF NOT EXISTS event_count_by_sport (
    sport_slug TEXT PRIMARY KEY,
    live INTEGER NULL,
    total INTEGER NULL
);

CREATE TABLE IF NOT EXISTS images_player (
    player_id INTEGER PRIMARY KEY,
    url TEXT NULL,
    kind TEXT NULL,
    fetched_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS images_team (
    team_id INTEGER NOT NULL,
    size TEXT NOT NULL CHECK (size IN ('full', 'small')),
    url TEXT NULL,
    fetched_at TEXT NOT NULL,
    PRIMARY KEY (team_id, size)
);

CREATE TABLE IF NOT EXISTS images_tournament (
    tournament_id INTEGER PRIMARY KEY,
    url TEXT NULL,
    fetched_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ingest_runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NULL,
    api_base TEXT NOT NULL,
    steps_json TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_events_start_ts ON events(start_ts);
CREATE INDEX IF NOT EXISTS idx_event_teams_team ON event_teams(team_id);
CREATE INDEX IF NOT EXISTS idx_lineup_players_player ON lineup_players(player_id);
"#;

/// Tables holding ingested entities, in dependency order.
pub const ENTITY_TABLES: &[&str] = &[
    "sports",
    "countries",
    "categories",
    "unique_tournaments",
    "tournaments",
    "seasons",
    "teams",
    "players",
    "venues",
    "referees",
    "events",
    "event_teams",
    "event_scores",
    "lineups",
    "lineup_players",
    "player_heatmaps",
    "player_transfers",
    "player_statistics",
    "team_statistics",
    "standings",
    "tournament_featured_events",
    "tournament_videos",
    "trending_players",
    "suggestions",
    "live_category_counts",
    "event_count_by_sport",
    "images_player",
    "images_team",
    "images_tournament",
];

/// Opens (creating if needed) the store and applies the schema.
pub fn open_db(config: &DbConfig) -> Result<Connection> {
    let path = config.path()?;
    if !config.is_in_memory() {
        ensure_parent_dir(&path)?;
    }
    let conn =
        Connection::open(&path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Idempotent: every statement is create-if-missing.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        "#,
    )
    .context("configure sqlite pragmas")?;
    conn.execute_batch(SCHEMA_SQL)
        .context("create sqlite schema")?;
    tracing::info!("schema applied");
    Ok(())
}

pub fn row_count(conn: &Connection, table: &str) -> Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get::<_, i64>(0)
    })
    .with_context(|| format!("count rows in {table}"))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create database dir {}", parent.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_twice() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        for table in ENTITY_TABLES {
            assert_eq!(row_count(&conn, table).unwrap(), 0, "{table}");
        }
    }

    #[test]
    fn side_check_constraint_rejects_unknown_values() {
        let conn = open_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO sports (id, name, slug) VALUES (1, 'Football', 'football');
             INSERT INTO events (id) VALUES (10);
             INSERT INTO teams (id, name) VALUES (5, 'Home FC');",
        )
        .unwrap();
        let bad = conn.execute(
            "INSERT INTO event_teams (event_id, team_id, side) VALUES (10, 5, 'neutral')",
            [],
        );
        assert!(bad.is_err());
        let good = conn.execute(
            "INSERT INTO event_teams (event_id, team_id, side) VALUES (10, 5, 'home')",
            [],
        );
        assert!(good.is_ok());
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let conn = open_in_memory().unwrap();
        let orphan = conn.execute(
            "INSERT INTO events (id, tournament_id) VALUES (1, 999)",
            [],
        );
        assert!(orphan.is_err());
    }

    #[test]
    fn postgres_url_is_refused_before_touching_disk() {
        let cfg = DbConfig {
            target: crate::config::DbTarget::Url(
                "postgresql://user:pw@localhost:5432/sofascore_local".to_string(),
            ),
        };
        let err = open_db(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported database url scheme"));
        assert!(!Path::new("postgresql:").exists());
    }

    #[test]
    fn file_backed_db_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DbConfig {
            target: crate::config::DbTarget::Named {
                dir: dir.path().join("nested").join("db"),
                name: "t".to_string(),
            },
        };
        let conn = open_db(&cfg).unwrap();
        assert_eq!(row_count(&conn, "events").unwrap(), 0);
        drop(conn);
        assert!(dir.path().join("nested/db/t.sqlite").exists());
    }
}
