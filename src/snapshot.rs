//! Read-only capture of raw API responses into a timestamped directory tree.
//!
//! Tournaments are keyed by the unique tournament id when the event carries one,
//! falling back to `tournament.id`. Snapshot trees from earlier capture tooling
//! keyed `entities.tournaments` and the `tournaments/<id>/` directories by
//! `tournament.id` alone, so ids from the two kinds of tree are not comparable.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::config::SnapshotConfig;
use crate::http_client::{ApiSource, envelope_data};
use crate::json::{array, i64_at, obj};
use crate::rows::map_lineups;
use crate::traversal::{EventRef, PlayerFetches, TraversalPlan, WorkItem, Worklist};

pub const INDEX_FILE: &str = "_meta/index.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub file: String,
    pub note: Option<String>,
}

/// Entity ids in first-seen order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    pub events: Vec<i64>,
    pub players: Vec<i64>,
    pub tournaments: Vec<i64>,
    pub seasons: Vec<i64>,
}

fn note_id(list: &mut Vec<i64>, id: i64) {
    if !list.contains(&id) {
        list.push(id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotIndex {
    pub api_base: String,
    pub run_ts: String,
    pub endpoints: BTreeMap<String, Vec<IndexEntry>>,
    pub entities: Entities,
}

impl SnapshotIndex {
    fn record(&mut self, endpoint: &str, file: String, note: Option<String>) {
        self.endpoints
            .entry(endpoint.to_string())
            .or_default()
            .push(IndexEntry { file, note });
    }

    /// Every file path the index mentions, relative to the run directory.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.endpoints
            .values()
            .flatten()
            .map(|entry| entry.file.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotSummary {
    pub root: PathBuf,
    pub index_path: PathBuf,
    pub files_written: usize,
    pub failed_calls: usize,
    pub entities: Entities,
}

pub fn run<A: ApiSource + ?Sized>(api: &A, config: &SnapshotConfig) -> Result<SnapshotSummary> {
    let run_ts = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let root = create_run_dir(&config.out_root, &run_ts)?;
    info!(root = %root.display(), api_base = api.base_url(), "snapshot starting");
    Snapshotter::new(api, config, root, run_ts).run()
}

/// Creates `<out_root>/<run_ts>`, appending `-1`, `-2`, ... when a run with the
/// same timestamp already exists. Never reuses an existing directory.
pub fn create_run_dir(out_root: &Path, run_ts: &str) -> Result<PathBuf> {
    fs::create_dir_all(out_root)
        .with_context(|| format!("failed to create {}", out_root.display()))?;
    for attempt in 0..1000u32 {
        let name = match attempt {
            0 => run_ts.to_string(),
            n => format!("{run_ts}-{n}"),
        };
        let dir = out_root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => {
                fs::create_dir_all(dir.join("_meta"))
                    .with_context(|| format!("failed to create {}/_meta", dir.display()))?;
                return Ok(dir);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(err).with_context(|| format!("failed to create {}", dir.display()));
            }
        }
    }
    Err(anyhow!(
        "no free snapshot directory for {run_ts} under {}",
        out_root.display()
    ))
}

pub struct Snapshotter<'a, A: ApiSource + ?Sized> {
    api: &'a A,
    config: &'a SnapshotConfig,
    root: PathBuf,
    index: SnapshotIndex,
    files_written: usize,
    failed_calls: usize,
}

impl<'a, A: ApiSource + ?Sized> Snapshotter<'a, A> {
    pub fn new(api: &'a A, config: &'a SnapshotConfig, root: PathBuf, run_ts: String) -> Self {
        let index = SnapshotIndex {
            api_base: api.base_url().to_string(),
            run_ts,
            endpoints: BTreeMap::new(),
            entities: Entities::default(),
        };
        Self {
            api,
            config,
            root,
            index,
            files_written: 0,
            failed_calls: 0,
        }
    }

    pub fn run(mut self) -> Result<SnapshotSummary> {
        self.capture("/football/categories", "categories.json", &[], None)?;
        self.capture("/football/tournaments", "tournaments.json", &[], None)?;

        let date = self
            .config
            .schedule_date
            .clone()
            .unwrap_or_else(|| Utc::now().date_naive().to_string());
        let scheduled = self.capture(
            "/football/events/scheduled",
            &format!("events/scheduled_{date}.json"),
            &[("date", date.clone())],
            Some(format!("date={date}")),
        )?;
        let events = scheduled_event_refs(&scheduled);
        debug!(date = %date, count = events.len(), "scheduled events captured");

        let mut worklist = Worklist::new(self.traversal_plan());
        for event_id in worklist.seed_events(&events) {
            note_id(&mut self.index.entities.events, event_id);
        }
        while let Some(item) = worklist.pop() {
            self.capture_item(item, &mut worklist)?;
        }

        self.capture_aggregates()?;

        let index_json = serde_json::to_value(&self.index).context("serialize snapshot index")?;
        let index_path = self.save(INDEX_FILE, &index_json)?;
        info!(
            root = %self.root.display(),
            files = self.files_written,
            failed_calls = self.failed_calls,
            "snapshot complete"
        );
        Ok(SnapshotSummary {
            root: self.root,
            index_path,
            files_written: self.files_written,
            failed_calls: self.failed_calls,
            entities: self.index.entities,
        })
    }

    fn traversal_plan(&self) -> TraversalPlan {
        TraversalPlan {
            max_events: self.config.max_events,
            max_players: self.config.max_players_per_event,
            max_tournaments: self.config.max_events,
            team_statistics: true,
            // Tournaments come from event details here, not from the schedule.
            seed_tournaments: false,
            tournaments: true,
            players: PlayerFetches {
                heatmap: true,
                transfers: true,
                statistics: true,
            },
        }
    }

    fn capture_item(&mut self, item: WorkItem, worklist: &mut Worklist) -> Result<()> {
        match item {
            WorkItem::EventDetails { event_id } => {
                let body = self.capture(
                    "/football/event/details",
                    &format!("events/{event_id}/details.json"),
                    &[("event_id", event_id.to_string())],
                    Some(format!("event_id={event_id}")),
                )?;
                let data = envelope_data(&body).cloned().unwrap_or(Value::Null);
                let event = obj(&data, "event");
                let tournament_id = api_tournament_id(event);
                let season_id = i64_at(obj(event, "season"), "id");
                if let Some(tid) = tournament_id {
                    note_id(&mut self.index.entities.tournaments, tid);
                }
                if let Some(sid) = season_id {
                    note_id(&mut self.index.entities.seasons, sid);
                }
                if let Some(tid) = tournament_id {
                    worklist.push_tournament(tid, season_id);
                }
            }
            WorkItem::Lineups { event_id } => {
                let body = self.capture(
                    "/football/event/lineups",
                    &format!("events/{event_id}/lineups.json"),
                    &[("event_id", event_id.to_string())],
                    Some(format!("event_id={event_id}")),
                )?;
                let candidates = lineup_player_ids(&body);
                for player_id in worklist.expand_players(event_id, &candidates) {
                    note_id(&mut self.index.entities.players, player_id);
                }
            }
            WorkItem::TeamStatistics { event_id } => {
                self.capture(
                    "/football/event/statistics",
                    &format!("events/{event_id}/statistics.json"),
                    &[("event_id", event_id.to_string())],
                    Some(format!("event_id={event_id}")),
                )?;
            }
            WorkItem::Heatmap {
                event_id,
                player_id,
            } => {
                self.capture(
                    "/football/player/heatmap",
                    &format!("events/{event_id}/players/{player_id}/heatmap.json"),
                    &[
                        ("event_id", event_id.to_string()),
                        ("player_id", player_id.to_string()),
                    ],
                    Some(format!("event_id={event_id},player_id={player_id}")),
                )?;
            }
            WorkItem::PlayerStatistics {
                event_id,
                player_id,
            } => {
                self.capture(
                    "/football/event/player/statistics",
                    &format!("events/{event_id}/players/{player_id}/statistics.json"),
                    &[
                        ("event_id", event_id.to_string()),
                        ("player_id", player_id.to_string()),
                    ],
                    Some(format!("event_id={event_id},player_id={player_id}")),
                )?;
            }
            WorkItem::Transfers { player_id } => {
                self.capture(
                    "/football/player/transfer-history",
                    &format!("players/{player_id}/transfer_history.json"),
                    &[("player_id", player_id.to_string())],
                    Some(format!("player_id={player_id}")),
                )?;
            }
            WorkItem::Tournament {
                tournament_id,
                season_id,
            } => self.capture_tournament(tournament_id, season_id)?,
        }
        Ok(())
    }

    fn capture_tournament(&mut self, tournament_id: i64, season_id: Option<i64>) -> Result<()> {
        if let Some(season_id) = season_id {
            self.capture(
                "/football/tournament/standings",
                &format!("tournaments/{tournament_id}/seasons/{season_id}/standings.json"),
                &[
                    ("tournament_id", tournament_id.to_string()),
                    ("season_id", season_id.to_string()),
                ],
                Some(format!("tournament_id={tournament_id},season_id={season_id}")),
            )?;
        }
        self.capture(
            "/football/tournament/featured-events",
            &format!("tournaments/{tournament_id}/featured_events.json"),
            &[("tournament_id", tournament_id.to_string())],
            Some(format!("tournament_id={tournament_id}")),
        )?;
        self.capture(
            "/football/tournament/videos",
            &format!("tournaments/{tournament_id}/videos.json"),
            &[("tournament_id", tournament_id.to_string())],
            Some(format!("tournament_id={tournament_id}")),
        )?;
        Ok(())
    }

    fn capture_aggregates(&mut self) -> Result<()> {
        self.capture("/football/trending/players", "trending/players.json", &[], None)?;
        let config = self.config;
        for query in &config.queries {
            self.capture(
                "/search/suggestions",
                &format!("search/suggestions_{}.json", file_safe(query)),
                &[("query", query.clone())],
                Some(format!("query={query}")),
            )?;
        }
        self.capture(
            "/football/live/category-counts",
            "live/category_counts.json",
            &[],
            None,
        )?;
        self.capture(
            "/football/events/count-by-sport",
            "events/count_by_sport.json",
            &[],
            None,
        )?;
        Ok(())
    }

    /// Fetches, saves and indexes one endpoint. Only filesystem errors are fatal.
    fn capture(
        &mut self,
        endpoint: &str,
        rel: &str,
        query: &[(&str, String)],
        note: Option<String>,
    ) -> Result<Value> {
        let body = self.fetch(endpoint, query);
        self.save(rel, &body)?;
        self.index.record(endpoint, rel.to_string(), note);
        Ok(body)
    }

    fn fetch(&mut self, path: &str, query: &[(&str, String)]) -> Value {
        let result = self.api.get(path, query);
        if !self.config.sleep.is_zero() {
            thread::sleep(self.config.sleep);
        }
        match result {
            Ok(payload) => payload.into_json(),
            Err(err) => {
                self.failed_calls += 1;
                warn!(path, error = %format!("{err:#}"), "snapshot call failed");
                let params = if query.is_empty() {
                    Value::Null
                } else {
                    Value::Object(
                        query
                            .iter()
                            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
                            .collect::<Map<_, _>>(),
                    )
                };
                json!({
                    "error": format!("{err:#}"),
                    "url": format!("{}{}", self.api.base_url(), path),
                    "params": params,
                })
            }
        }
    }

    fn save(&mut self, rel: &str, body: &Value) -> Result<PathBuf> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut text = serde_json::to_string_pretty(body).context("serialize snapshot body")?;
        text.push('\n');
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        self.files_written += 1;
        Ok(path)
    }
}

fn scheduled_event_refs(body: &Value) -> Vec<EventRef> {
    let Some(data) = envelope_data(body) else {
        return Vec::new();
    };
    array(data, "events")
        .iter()
        .filter_map(|e| {
            Some(EventRef {
                id: i64_at(e, "id")?,
                tournament_id: None,
                season_id: None,
            })
        })
        .collect()
}

/// Unique tournament id when the event carries one, else the tournament id.
fn api_tournament_id(event: &Value) -> Option<i64> {
    let tournament = obj(event, "tournament");
    i64_at(obj(tournament, "uniqueTournament"), "id").or_else(|| i64_at(tournament, "id"))
}

/// Home then away; starters before substitutes within a side.
fn lineup_player_ids(body: &Value) -> Vec<i64> {
    let Some(data) = envelope_data(body) else {
        return Vec::new();
    };
    map_lineups(data)
        .sides
        .iter()
        .flat_map(|side| side.entries.iter().map(|e| e.player.id))
        .collect()
}

fn file_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_dir_gets_suffix_on_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let first = create_run_dir(tmp.path(), "20240101T000000Z").unwrap();
        let second = create_run_dir(tmp.path(), "20240101T000000Z").unwrap();
        let third = create_run_dir(tmp.path(), "20240101T000000Z").unwrap();
        assert!(first.ends_with("20240101T000000Z"));
        assert!(second.ends_with("20240101T000000Z-1"));
        assert!(third.ends_with("20240101T000000Z-2"));
        assert!(first.join("_meta").is_dir());
    }

    #[test]
    fn entity_ids_keep_first_seen_order() {
        let mut ids = Vec::new();
        for id in [5, 3, 5, 9, 3] {
            note_id(&mut ids, id);
        }
        assert_eq!(ids, vec![5, 3, 9]);
    }

    #[test]
    fn lineup_ids_run_home_then_away() {
        let body = json!({
            "success": true,
            "data": {
                "home_team": {
                    "starting_eleven": [{ "player_id": 1 }, { "player_id": 2 }],
                    "substitutes": [{ "player_id": 3 }]
                },
                "away_team": { "starting_eleven": [{ "id": 4 }], "substitutes": [] }
            }
        });
        assert_eq!(lineup_player_ids(&body), vec![1, 2, 3, 4]);
        assert!(lineup_player_ids(&json!({ "success": false })).is_empty());
    }

    #[test]
    fn tournament_prefers_unique_id() {
        let ev = json!({ "tournament": { "id": 10, "uniqueTournament": { "id": 17 } } });
        assert_eq!(api_tournament_id(&ev), Some(17));
        let ev = json!({ "tournament": { "id": 10 } });
        assert_eq!(api_tournament_id(&ev), Some(10));
        assert_eq!(api_tournament_id(&Value::Null), None);
    }

    #[test]
    fn query_names_are_file_safe() {
        assert_eq!(file_safe("man utd/x"), "man_utd_x");
        assert_eq!(file_safe("tennis"), "tennis");
    }
}
