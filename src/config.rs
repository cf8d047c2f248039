use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};

const DEFAULT_API_BASE: &str = "http://69.197.168.221:8004";
const DEFAULT_DB_NAME: &str = "sofascore_local";
const APP_DIR: &str = "sofa_ingest";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: opt_env("API_BASE")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .unwrap_or(d.base_url),
            timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT").unwrap_or(20).max(1)),
        }
    }
}

/// Where the SQLite store lives.
#[derive(Debug, Clone, PartialEq)]
pub enum DbTarget {
    /// Path taken verbatim from a connection string.
    Url(String),
    /// `<dir>/<name>.sqlite`.
    Named { dir: PathBuf, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    pub target: DbTarget,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            target: DbTarget::Named {
                dir: app_data_dir().unwrap_or_else(|| PathBuf::from("data")),
                name: DEFAULT_DB_NAME.to_string(),
            },
        }
    }
}

impl DbConfig {
    pub fn from_env() -> Self {
        if let Some(url) = opt_env("DATABASE_URL").or_else(|| opt_env("PGURI")) {
            return Self {
                target: DbTarget::Url(url.trim().to_string()),
            };
        }
        let d = Self::default();
        let DbTarget::Named { dir, name } = d.target else {
            return d;
        };
        Self {
            target: DbTarget::Named {
                dir: opt_env("DB_DIR").map(PathBuf::from).unwrap_or(dir),
                name: opt_env("DB_NAME").map(|s| s.trim().to_string()).unwrap_or(name),
            },
        }
    }

    pub fn in_memory() -> Self {
        Self {
            target: DbTarget::Url(":memory:".to_string()),
        }
    }

    /// Resolves the file path SQLite should open; `:memory:` passes through.
    /// URLs for any other database engine are rejected rather than opened as paths.
    pub fn path(&self) -> Result<PathBuf> {
        match &self.target {
            DbTarget::Url(url) => {
                if let Some((scheme, _)) = url.split_once("://")
                    && !matches!(scheme.to_ascii_lowercase().as_str(), "sqlite" | "file")
                {
                    bail!("unsupported database url scheme {scheme:?}: only sqlite is supported");
                }
                let raw = url
                    .strip_prefix("sqlite://")
                    .or_else(|| url.strip_prefix("sqlite:"))
                    .or_else(|| url.strip_prefix("file://"))
                    .or_else(|| url.strip_prefix("file:"))
                    .unwrap_or(url);
                if raw.is_empty() {
                    bail!("database url {url:?} names no file");
                }
                Ok(PathBuf::from(raw))
            }
            DbTarget::Named { dir, name } => Ok(dir.join(format!("{name}.sqlite"))),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(&self.target, DbTarget::Url(url) if url.trim() == ":memory:")
    }
}

/// Optional bootstrap steps; everything is on unless switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub heatmaps: bool,
    pub transfers: bool,
    pub statistics: bool,
    pub standings: bool,
    pub tournament_features: bool,
    pub trending: bool,
    pub suggestions: bool,
    pub live_counts: bool,
    pub images: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self::all(true)
    }
}

impl Features {
    pub fn all(on: bool) -> Self {
        Self {
            heatmaps: on,
            transfers: on,
            statistics: on,
            standings: on,
            tournament_features: on,
            trending: on,
            suggestions: on,
            live_counts: on,
            images: on,
        }
    }

    pub fn from_env() -> Self {
        Self {
            heatmaps: env_flag("BOOTSTRAP_FETCH_HEATMAPS", true),
            transfers: env_flag("BOOTSTRAP_FETCH_TRANSFERS", true),
            statistics: env_flag("BOOTSTRAP_FETCH_STATISTICS", true),
            standings: env_flag("BOOTSTRAP_FETCH_STANDINGS", true),
            tournament_features: env_flag("BOOTSTRAP_FETCH_TOURNAMENT_FEATURES", true),
            trending: env_flag("BOOTSTRAP_FETCH_TRENDING", true),
            suggestions: env_flag("BOOTSTRAP_FETCH_SUGGESTIONS", true),
            live_counts: env_flag("BOOTSTRAP_FETCH_LIVE_COUNTS", true),
            images: env_flag("BOOTSTRAP_FETCH_IMAGES", true),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    pub api: ApiConfig,
    pub db: DbConfig,
    pub features: Features,
    pub max_events: usize,
    pub max_starters: usize,
    pub max_tournaments: usize,
    pub suggestion_queries: Vec<String>,
    pub image_delay: Duration,
    pub transfer_delay: Duration,
    /// `YYYY-MM-DD`; `None` means today in UTC.
    pub schedule_date: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            db: DbConfig::default(),
            features: Features::default(),
            max_events: 10,
            max_starters: 6,
            max_tournaments: 10,
            suggestion_queries: default_queries(),
            image_delay: Duration::from_millis(500),
            transfer_delay: Duration::from_millis(50),
            schedule_date: None,
        }
    }
}

impl BootstrapConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api: ApiConfig::from_env(),
            db: DbConfig::from_env(),
            features: Features::from_env(),
            max_events: parse_env("BOOTSTRAP_MAX_EVENTS").unwrap_or(d.max_events),
            max_starters: parse_env("BOOTSTRAP_MAX_STARTERS").unwrap_or(d.max_starters),
            max_tournaments: parse_env("BOOTSTRAP_MAX_TOURNAMENTS").unwrap_or(d.max_tournaments),
            suggestion_queries: opt_env("BOOTSTRAP_SUGGESTION_QUERIES")
                .map(|raw| parse_list(&raw))
                .unwrap_or(d.suggestion_queries),
            image_delay: secs_env("BOOTSTRAP_IMAGE_DELAY").unwrap_or(d.image_delay),
            transfer_delay: parse_env::<u64>("BOOTSTRAP_TRANSFER_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.transfer_delay),
            schedule_date: opt_env("BOOTSTRAP_SCHEDULE_DATE").map(|s| s.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    pub api: ApiConfig,
    pub out_root: PathBuf,
    pub max_events: usize,
    pub max_players_per_event: usize,
    pub queries: Vec<String>,
    pub sleep: Duration,
    pub schedule_date: Option<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            out_root: PathBuf::from("data").join("api_snapshots"),
            max_events: 6,
            max_players_per_event: 6,
            queries: default_queries(),
            sleep: Duration::from_millis(200),
            schedule_date: None,
        }
    }
}

impl SnapshotConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api: ApiConfig::from_env(),
            out_root: opt_env("SNAPSHOT_ROOT").map(PathBuf::from).unwrap_or(d.out_root),
            max_events: parse_env("MAX_EVENTS").unwrap_or(d.max_events),
            max_players_per_event: parse_env("MAX_PLAYERS_PER_EVENT")
                .unwrap_or(d.max_players_per_event),
            queries: opt_env("QUERIES")
                .map(|raw| parse_list(&raw))
                .unwrap_or(d.queries),
            sleep: secs_env("SLEEP_SECONDS").unwrap_or(d.sleep),
            schedule_date: opt_env("SNAPSHOT_DATE").map(|s| s.trim().to_string()),
        }
    }
}

/// Loads `.env.local` then `.env`; variables already set win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn app_data_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_DATA_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR),
    )
}

fn default_queries() -> Vec<String> {
    ["football", "basketball", "tennis"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    opt_env(key).and_then(|val| val.trim().parse::<T>().ok())
}

fn secs_env(key: &str) -> Option<Duration> {
    parse_env::<f64>(key)
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

fn env_flag(key: &str, default: bool) -> bool {
    match opt_env(key) {
        Some(raw) => parse_flag(&raw),
        None => default,
    }
}

pub(crate) fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

pub(crate) fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_truthy_spellings() {
        for raw in ["1", "true", "YES", " y "] {
            assert!(parse_flag(raw), "{raw}");
        }
        for raw in ["0", "false", "no", "off", ""] {
            assert!(!parse_flag(raw), "{raw}");
        }
    }

    #[test]
    fn query_list_drops_blanks() {
        assert_eq!(parse_list("football, ,tennis,"), vec!["football", "tennis"]);
    }

    #[test]
    fn db_url_prefixes_are_stripped() {
        let cfg = DbConfig {
            target: DbTarget::Url("sqlite:///tmp/x.sqlite".to_string()),
        };
        assert_eq!(cfg.path().unwrap(), PathBuf::from("/tmp/x.sqlite"));
        let cfg = DbConfig {
            target: DbTarget::Url("sqlite:rel.db".to_string()),
        };
        assert_eq!(cfg.path().unwrap(), PathBuf::from("rel.db"));
        let cfg = DbConfig {
            target: DbTarget::Url("data/local.sqlite".to_string()),
        };
        assert_eq!(cfg.path().unwrap(), PathBuf::from("data/local.sqlite"));
        assert!(DbConfig::in_memory().is_in_memory());
        assert_eq!(DbConfig::in_memory().path().unwrap(), PathBuf::from(":memory:"));
    }

    #[test]
    fn postgres_url_is_rejected() {
        for url in [
            "postgresql://user:pw@localhost:5432/sofascore_local",
            "postgres://localhost/sofascore_local",
            "mysql://root@db/x",
        ] {
            let cfg = DbConfig {
                target: DbTarget::Url(url.to_string()),
            };
            let err = cfg.path().unwrap_err();
            assert!(
                err.to_string().contains("unsupported database url scheme"),
                "{url}: {err}"
            );
        }
    }

    #[test]
    fn named_target_appends_extension() {
        let cfg = DbConfig {
            target: DbTarget::Named {
                dir: PathBuf::from("/var/db"),
                name: "sofascore_local".to_string(),
            },
        };
        assert_eq!(
            cfg.path().unwrap(),
            PathBuf::from("/var/db/sofascore_local.sqlite")
        );
        assert!(!cfg.is_in_memory());
    }

    #[test]
    fn defaults_match_documented_caps() {
        let cfg = BootstrapConfig::default();
        assert_eq!(cfg.max_events, 10);
        assert_eq!(cfg.max_starters, 6);
        assert_eq!(cfg.image_delay, Duration::from_millis(500));
        assert!(cfg.features.images);
        let snap = SnapshotConfig::default();
        assert_eq!(snap.max_events, 6);
        assert_eq!(snap.queries.len(), 3);
    }
}
