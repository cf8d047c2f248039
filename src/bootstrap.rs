//! Best-effort ingestion run: every step owns a transaction, and a failing step is
//! recorded in the run summary without stopping the steps after it.

use std::collections::HashMap;
use std::thread;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::BootstrapConfig;
use crate::http_client::ApiSource;
use crate::json::{array, i64_at, obj};
use crate::rows::{
    ImageOwner, LineupPlayerRow, LineupRow, Role, Side, SportRow, TeamStatisticRow,
    event_team_objects, map_event, map_event_counts_by_sport, map_event_score, map_event_teams,
    map_featured_event_ids, map_heatmap, map_image, map_lineups, map_live_category_counts,
    map_player, map_player_statistics, map_referee, map_season, map_standings, map_suggestions,
    map_team_statistics, map_tournament, map_transfers, map_trending, map_venue, map_videos,
};
use crate::traversal::{EventRef, PlayerFetches, TraversalPlan, WorkItem, Worklist};
use crate::upsert::{
    insert_featured_event, insert_heatmap_point, store_category, store_country, store_player,
    store_team, store_unique_tournament, upsert_event, upsert_event_count_by_sport,
    upsert_event_score, upsert_event_team, upsert_image, upsert_lineup, upsert_lineup_player,
    upsert_live_category_count, upsert_player_statistics, upsert_referee, upsert_season,
    upsert_sport, upsert_standing, upsert_suggestion, upsert_team_statistics, upsert_tournament,
    upsert_transfer, upsert_trending_player, upsert_venue, upsert_video,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Done { rows: usize, failures: usize },
    Skipped { reason: String },
    Failed { reason: String },
}

impl StepOutcome {
    fn done(rows: usize) -> Self {
        StepOutcome::Done { rows, failures: 0 }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_id: Option<i64>,
    pub schedule_date: String,
    pub events_scheduled: usize,
    pub events_processed: Vec<i64>,
    pub steps: Vec<StepReport>,
}

impl RunSummary {
    pub fn steps_done(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Done { .. }))
    }

    pub fn steps_skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped { .. }))
    }

    pub fn steps_failed(&self) -> usize {
        self.count(StepOutcome::is_failed)
    }

    pub fn rows_written(&self) -> usize {
        self.steps
            .iter()
            .map(|s| match s.outcome {
                StepOutcome::Done { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .map(|s| &s.outcome)
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Runs the full ingestion sequence against `conn` using `api` as the data source.
pub fn run<A: ApiSource + ?Sized>(
    conn: &mut Connection,
    api: &A,
    config: &BootstrapConfig,
) -> Result<RunSummary> {
    Bootstrapper::new(conn, api, config).run()
}

pub struct Bootstrapper<'a, A: ApiSource + ?Sized> {
    conn: &'a mut Connection,
    api: &'a A,
    config: &'a BootstrapConfig,
    summary: RunSummary,
}

impl<'a, A: ApiSource + ?Sized> Bootstrapper<'a, A> {
    pub fn new(conn: &'a mut Connection, api: &'a A, config: &'a BootstrapConfig) -> Self {
        Self {
            conn,
            api,
            config,
            summary: RunSummary::default(),
        }
    }

    pub fn run(mut self) -> Result<RunSummary> {
        info!(api_base = self.api.base_url(), "bootstrap starting");
        let run_id = self.begin_run()?;
        self.summary.run_id = Some(run_id);

        self.seed_reference();
        self.ingest_categories();
        self.ingest_tournament_catalog();
        let events = self.ingest_scheduled_events();
        self.process_events(&events);
        self.ingest_aggregates();
        if self.config.features.images {
            self.ingest_images();
        }

        self.finish_run(run_id)?;
        info!(
            done = self.summary.steps_done(),
            skipped = self.summary.steps_skipped(),
            failed = self.summary.steps_failed(),
            rows = self.summary.rows_written(),
            "bootstrap finished"
        );
        Ok(self.summary)
    }

    fn begin_run(&mut self) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO ingest_runs (started_at, finished_at, api_base, steps_json)
                 VALUES (?1, NULL, ?2, '[]')",
                params![Utc::now().to_rfc3339(), self.api.base_url()],
            )
            .context("insert ingest run")?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64) -> Result<()> {
        let steps_json =
            serde_json::to_string(&self.summary.steps).unwrap_or_else(|_| "[]".to_string());
        self.conn
            .execute(
                "UPDATE ingest_runs SET finished_at = ?1, steps_json = ?2 WHERE run_id = ?3",
                params![Utc::now().to_rfc3339(), steps_json, run_id],
            )
            .context("update ingest run")?;
        Ok(())
    }

    /// Runs `f` inside its own transaction and records the outcome.
    /// Returns false when the step failed and was rolled back.
    fn run_step<F>(&mut self, step: String, f: F) -> bool
    where
        F: FnOnce(&mut Transaction<'_>, &A, &BootstrapConfig) -> Result<StepOutcome>,
    {
        let api = self.api;
        let config = self.config;
        let outcome = match self.conn.transaction() {
            Ok(mut tx) => match f(&mut tx, api, config) {
                Ok(outcome) => match tx.commit() {
                    Ok(()) => outcome,
                    Err(err) => StepOutcome::Failed {
                        reason: format!("commit failed: {err}"),
                    },
                },
                Err(err) => StepOutcome::Failed {
                    reason: format!("{err:#}"),
                },
            },
            Err(err) => StepOutcome::Failed {
                reason: format!("begin transaction failed: {err}"),
            },
        };

        match &outcome {
            StepOutcome::Done { rows, failures } => {
                info!(step = %step, rows, failures, "step done")
            }
            StepOutcome::Skipped { reason } => debug!(step = %step, %reason, "step skipped"),
            StepOutcome::Failed { reason } => warn!(step = %step, %reason, "step failed"),
        }
        let ok = !outcome.is_failed();
        self.summary.steps.push(StepReport { step, outcome });
        ok
    }

    fn seed_reference(&mut self) {
        self.run_step("seed_sports".to_string(), |tx, _, _| {
            upsert_sport(tx, &SportRow::football())?;
            Ok(StepOutcome::done(1))
        });
    }

    fn ingest_categories(&mut self) {
        self.run_step("categories".to_string(), |tx, api, _| {
            let Some(data) = fetch_data(api, "/football/categories", &[])? else {
                return Ok(StepOutcome::skipped("no categories returned"));
            };
            let categories = array(&data, "categories");
            if categories.is_empty() {
                return Ok(StepOutcome::skipped("no categories returned"));
            }
            each_isolated(tx, "category", categories, |conn, c| {
                store_category(conn, c)?.ok_or_else(|| anyhow!("category without id"))?;
                Ok(())
            })
        });
    }

    fn ingest_tournament_catalog(&mut self) {
        self.run_step("tournament_catalog".to_string(), |tx, api, _| {
            let Some(data) = fetch_data(api, "/football/tournaments", &[])? else {
                return Ok(StepOutcome::skipped("no tournaments returned"));
            };
            let results = array(&data, "results");
            if results.is_empty() {
                return Ok(StepOutcome::skipped("no tournaments returned"));
            }
            each_isolated(tx, "unique tournament", results, |conn, row| {
                store_unique_tournament(conn, obj(row, "entity"))?
                    .ok_or_else(|| anyhow!("tournament entity without id"))?;
                Ok(())
            })
        });
    }

    fn ingest_scheduled_events(&mut self) -> Vec<EventRef> {
        let date = self
            .config
            .schedule_date
            .clone()
            .unwrap_or_else(|| Utc::now().date_naive().to_string());
        self.summary.schedule_date = date.clone();

        let mut refs = Vec::new();
        let mut scheduled = 0usize;
        let ok = self.run_step("scheduled_events".to_string(), |tx, api, _| {
            let query = [("date", date.clone())];
            let Some(data) = fetch_data(api, "/football/events/scheduled", &query)? else {
                return Ok(StepOutcome::skipped(format!("no scheduled events for {date}")));
            };
            let events = array(&data, "events");
            if events.is_empty() {
                return Ok(StepOutcome::skipped(format!("no scheduled events for {date}")));
            }
            scheduled = events.len();
            each_isolated(tx, "event", events, |conn, e| {
                refs.push(store_scheduled_event(conn, e)?);
                Ok(())
            })
        });
        if !ok {
            refs.clear();
        }
        self.summary.events_scheduled = scheduled;
        info!(date = %date, scheduled, stored = refs.len(), "scheduled events ingested");
        refs
    }

    fn traversal_plan(&self) -> TraversalPlan {
        let f = self.config.features;
        TraversalPlan {
            max_events: self.config.max_events,
            max_players: self.config.max_starters,
            max_tournaments: self.config.max_tournaments,
            team_statistics: f.statistics,
            seed_tournaments: true,
            tournaments: f.standings || f.tournament_features,
            players: PlayerFetches {
                heatmap: f.heatmaps,
                transfers: f.transfers,
                statistics: f.statistics,
            },
        }
    }

    fn process_events(&mut self, events: &[EventRef]) {
        let mut worklist = Worklist::new(self.traversal_plan());
        self.summary.events_processed = worklist.seed_events(events);
        debug!(queued = worklist.len(), "event worklist seeded");

        while let Some(item) = worklist.pop() {
            match item {
                WorkItem::EventDetails { event_id } => self.enrich_event_details(event_id),
                WorkItem::Lineups { event_id } => {
                    if let Some(sides) = self.ingest_lineups(event_id) {
                        worklist.expand_sides(event_id, &sides);
                    }
                }
                WorkItem::TeamStatistics { event_id } => self.ingest_team_statistics(event_id),
                WorkItem::Heatmap {
                    event_id,
                    player_id,
                } => self.ingest_heatmap(event_id, player_id),
                WorkItem::Transfers { player_id } => {
                    self.ingest_transfers(player_id);
                    thread::sleep(self.config.transfer_delay);
                }
                WorkItem::PlayerStatistics {
                    event_id,
                    player_id,
                } => self.ingest_player_statistics(event_id, player_id),
                WorkItem::Tournament {
                    tournament_id,
                    season_id,
                } => self.ingest_tournament(tournament_id, season_id),
            }
        }
    }

    fn enrich_event_details(&mut self, event_id: i64) {
        self.run_step(format!("event_details:{event_id}"), |tx, api, _| {
            let query = [("event_id", event_id.to_string())];
            let Some(data) = fetch_data(api, "/football/event/details", &query)? else {
                return Ok(StepOutcome::skipped("no event details"));
            };
            let event = obj(&data, "event");
            if event.is_null() {
                return Ok(StepOutcome::skipped("no event details"));
            }
            let mut rows = 0;

            let venue = obj(event, "venue");
            let venue_id = match map_venue(venue) {
                Some(row) => {
                    store_country(tx, obj(venue, "country"))?;
                    upsert_venue(tx, &row)?;
                    rows += 1;
                    Some(row.id)
                }
                None => None,
            };
            let referee = obj(event, "referee");
            let referee_id = match map_referee(referee) {
                Some(row) => {
                    store_country(tx, obj(referee, "country"))?;
                    upsert_referee(tx, &row)?;
                    rows += 1;
                    Some(row.id)
                }
                None => None,
            };

            store_event_context(tx, event)?;
            let mut row = map_event(event, venue_id, referee_id)
                .ok_or_else(|| anyhow!("event details without id"))?;
            row.id = event_id;
            upsert_event(tx, &row)?;
            Ok(StepOutcome::done(rows + 1))
        });
    }

    /// Returns starter ids per side, or `None` when the step failed.
    fn ingest_lineups(&mut self, event_id: i64) -> Option<Vec<Vec<i64>>> {
        let mut sides: Vec<Vec<i64>> = Vec::new();
        let ok = self.run_step(format!("lineups:{event_id}"), |tx, api, _| {
            let query = [("event_id", event_id.to_string())];
            let Some(data) = fetch_data(api, "/football/event/lineups", &query)? else {
                return Ok(StepOutcome::skipped("no lineups"));
            };
            let parsed = map_lineups(&data);
            let team_ids = event_team_ids(tx, event_id)?;
            let mut rows = 0;
            let mut failures = 0;
            for block in &parsed.sides {
                let Some(team_id) = team_ids.get(&block.side).copied() else {
                    debug!(event_id, side = block.side.as_str(), "no team link for lineup side");
                    continue;
                };
                upsert_lineup(
                    tx,
                    &LineupRow {
                        event_id,
                        team_id,
                        formation: block.formation.clone(),
                        confirmed: parsed.confirmed,
                    },
                )?;
                rows += 1;
                let mut starters = Vec::new();
                let outcome = each_isolated(tx, "lineup player", &block.entries, |conn, entry| {
                    store_player(conn, &entry.player, None)?;
                    upsert_lineup_player(
                        conn,
                        &LineupPlayerRow {
                            event_id,
                            team_id,
                            player_id: entry.player.id,
                            position: entry.position.clone(),
                            shirt_number: entry.shirt_number,
                            role: entry.role,
                            country_alpha2: entry.country_alpha2.clone(),
                        },
                    )?;
                    if entry.role == Role::Starter {
                        starters.push(entry.player.id);
                    }
                    Ok(())
                })?;
                if let StepOutcome::Done {
                    rows: stored,
                    failures: failed,
                } = outcome
                {
                    rows += stored;
                    failures += failed;
                }
                sides.push(starters);
            }
            if rows == 0 {
                return Ok(StepOutcome::skipped("no lineup rows for linked teams"));
            }
            Ok(StepOutcome::Done { rows, failures })
        });
        ok.then_some(sides)
    }

    fn ingest_heatmap(&mut self, event_id: i64, player_id: i64) {
        self.run_step(format!("heatmap:{event_id}/{player_id}"), |tx, api, _| {
            let query = [
                ("event_id", event_id.to_string()),
                ("player_id", player_id.to_string()),
            ];
            let Some(data) = fetch_data(api, "/football/player/heatmap", &query)? else {
                return Ok(StepOutcome::skipped("no heatmap"));
            };
            let points = map_heatmap(&data);
            if points.is_empty() {
                return Ok(StepOutcome::skipped("no heatmap points"));
            }
            let mut inserted = 0;
            for point in &points {
                inserted += insert_heatmap_point(tx, event_id, player_id, point)?;
            }
            Ok(StepOutcome::done(inserted))
        });
    }

    fn ingest_transfers(&mut self, player_id: i64) {
        self.run_step(format!("transfers:{player_id}"), |tx, api, _| {
            let query = [("player_id", player_id.to_string())];
            let Some(data) = fetch_data(api, "/football/player/transfer-history", &query)? else {
                return Ok(StepOutcome::skipped("no transfer history"));
            };
            let entries = map_transfers(&data, player_id);
            if entries.is_empty() {
                return Ok(StepOutcome::skipped("no transfers"));
            }
            let raw = array(&data, "transferHistory");
            each_isolated(tx, "transfer", &entries, |conn, entry| {
                store_team(conn, entry.from_team)?;
                store_team(conn, entry.to_team)?;
                let player_obj = raw
                    .iter()
                    .find(|tr| i64_at(tr, "id") == Some(entry.row.id))
                    .map(|tr| obj(tr, "player"));
                if let Some(player_obj) = player_obj
                    && let Some(player) = map_player(player_obj, "transfer")
                {
                    store_player(conn, &player, player_obj.get("country"))?;
                }
                upsert_transfer(conn, &entry.row)
            })
        });
    }

    fn ingest_player_statistics(&mut self, event_id: i64, player_id: i64) {
        self.run_step(
            format!("player_statistics:{event_id}/{player_id}"),
            |tx, api, _| {
                let query = [
                    ("event_id", event_id.to_string()),
                    ("player_id", player_id.to_string()),
                ];
                let path = "/football/event/player/statistics";
                let Some(data) = fetch_data(api, path, &query)? else {
                    return Ok(StepOutcome::skipped("no player statistics"));
                };
                let Some(row) = map_player_statistics(&data, event_id, player_id) else {
                    return Ok(StepOutcome::skipped("empty player statistics"));
                };
                upsert_player_statistics(tx, &row)?;
                Ok(StepOutcome::done(1))
            },
        );
    }

    fn ingest_team_statistics(&mut self, event_id: i64) {
        self.run_step(format!("team_statistics:{event_id}"), |tx, api, _| {
            let query = [("event_id", event_id.to_string())];
            let Some(data) = fetch_data(api, "/football/event/statistics", &query)? else {
                return Ok(StepOutcome::skipped("no team statistics"));
            };
            let team_ids = event_team_ids(tx, event_id)?;
            let mut rows = 0;
            for (side, stats) in map_team_statistics(&data) {
                let Some(team_id) = team_ids.get(&side).copied() else {
                    continue;
                };
                if stats.as_object().is_none_or(|m| m.is_empty()) {
                    continue;
                }
                upsert_team_statistics(
                    tx,
                    &TeamStatisticRow {
                        event_id,
                        team_id,
                        side,
                        stats,
                    },
                )?;
                rows += 1;
            }
            if rows == 0 {
                return Ok(StepOutcome::skipped("no team statistics"));
            }
            Ok(StepOutcome::done(rows))
        });
    }

    fn ingest_tournament(&mut self, tournament_id: i64, season_id: Option<i64>) {
        let features = self.config.features;
        if features.standings {
            match season_id {
                Some(season_id) => self.ingest_standings(tournament_id, season_id),
                None => {
                    self.run_step(format!("standings:{tournament_id}"), |_, _, _| {
                        Ok(StepOutcome::skipped("no season id"))
                    });
                }
            }
        }
        if features.tournament_features {
            self.ingest_featured_events(tournament_id);
            self.ingest_videos(tournament_id, season_id.unwrap_or(0));
        }
    }

    fn ingest_standings(&mut self, tournament_id: i64, season_id: i64) {
        self.run_step(
            format!("standings:{tournament_id}/{season_id}"),
            |tx, api, _| {
                let query = [
                    ("tournament_id", tournament_id.to_string()),
                    ("season_id", season_id.to_string()),
                ];
                let Some(data) = fetch_data(api, "/football/tournament/standings", &query)? else {
                    return Ok(StepOutcome::skipped("no standings"));
                };
                let entries = map_standings(&data, tournament_id, season_id);
                if entries.is_empty() {
                    return Ok(StepOutcome::skipped("no standing rows"));
                }
                each_isolated(tx, "standing", &entries, |conn, entry| {
                    store_team(conn, entry.team)?;
                    upsert_standing(conn, &entry.row)
                })
            },
        );
    }

    fn ingest_featured_events(&mut self, tournament_id: i64) {
        self.run_step(format!("featured_events:{tournament_id}"), |tx, api, _| {
            let query = [("tournament_id", tournament_id.to_string())];
            let path = "/football/tournament/featured-events";
            let Some(data) = fetch_data(api, path, &query)? else {
                return Ok(StepOutcome::skipped("no featured events"));
            };
            let ids = map_featured_event_ids(&data);
            for event_id in &ids {
                insert_featured_event(tx, tournament_id, *event_id)?;
            }
            Ok(StepOutcome::done(ids.len()))
        });
    }

    fn ingest_videos(&mut self, tournament_id: i64, season_id: i64) {
        self.run_step(format!("videos:{tournament_id}"), |tx, api, _| {
            let query = [("tournament_id", tournament_id.to_string())];
            let Some(data) = fetch_data(api, "/football/tournament/videos", &query)? else {
                return Ok(StepOutcome::skipped("no videos"));
            };
            let videos = map_videos(&data, tournament_id, season_id);
            for video in &videos {
                upsert_video(tx, video)?;
            }
            Ok(StepOutcome::done(videos.len()))
        });
    }

    fn ingest_aggregates(&mut self) {
        let config = self.config;
        let features = config.features;
        if features.trending {
            self.run_step("trending_players".to_string(), |tx, api, _| {
                let Some(data) = fetch_data(api, "/football/trending/players", &[])? else {
                    return Ok(StepOutcome::skipped("no trending players"));
                };
                let rows = map_trending(&data);
                each_isolated(tx, "trending player", &rows, |conn, (player, trending)| {
                    let country = obj(&trending.payload, "player").get("country");
                    store_player(conn, player, country)?;
                    upsert_trending_player(conn, trending)
                })
            });
        }
        if features.suggestions {
            for query in &config.suggestion_queries {
                self.run_step(format!("suggestions:{query}"), |tx, api, _| {
                    let params = [("query", query.clone())];
                    let Some(data) = fetch_data(api, "/search/suggestions", &params)? else {
                        return Ok(StepOutcome::skipped("no suggestions"));
                    };
                    let rows = map_suggestions(&data);
                    for row in &rows {
                        upsert_suggestion(tx, row)?;
                    }
                    Ok(StepOutcome::done(rows.len()))
                });
            }
        }
        if features.live_counts {
            self.run_step("live_category_counts".to_string(), |tx, api, _| {
                let path = "/football/live/category-counts";
                let Some(data) = fetch_data(api, path, &[])? else {
                    return Ok(StepOutcome::skipped("no live counts"));
                };
                let rows = map_live_category_counts(&data);
                for row in &rows {
                    upsert_live_category_count(tx, row)?;
                }
                Ok(StepOutcome::done(rows.len()))
            });
            self.run_step("event_count_by_sport".to_string(), |tx, api, _| {
                let path = "/football/events/count-by-sport";
                let Some(data) = fetch_data(api, path, &[])? else {
                    return Ok(StepOutcome::skipped("no event counts"));
                };
                let rows = map_event_counts_by_sport(&data);
                for row in &rows {
                    upsert_event_count_by_sport(tx, row)?;
                }
                Ok(StepOutcome::done(rows.len()))
            });
        }
    }

    fn ingest_images(&mut self) {
        info!(delay_ms = self.config.image_delay.as_millis() as u64, "image ingestion starting");
        let targets = [
            (ImageOwner::Player, "players", 100),
            (ImageOwner::Team, "teams", 100),
            (ImageOwner::Tournament, "tournaments", 50),
        ];
        for (owner, table, limit) in targets {
            self.run_step(format!("images_{table}"), |tx, api, config| {
                let ids = image_targets(tx, table, limit)?;
                if ids.is_empty() {
                    return Ok(StepOutcome::skipped(format!("no stored {table}")));
                }
                let mut rows = 0;
                let mut failures = 0;
                for id in ids {
                    thread::sleep(config.image_delay);
                    let fetched = api
                        .get(&owner.path(id), &[])
                        .map(|payload| payload.data().cloned());
                    let data = match fetched {
                        Ok(Some(data)) => data,
                        Ok(None) => continue,
                        Err(err) => {
                            debug!(table, id, error = %err, "image fetch failed");
                            failures += 1;
                            continue;
                        }
                    };
                    let row = map_image(&data, owner, id);
                    match with_savepoint(tx, |conn| upsert_image(conn, &row)) {
                        Ok(()) => rows += 1,
                        Err(err) => {
                            debug!(table, id, error = %err, "image upsert failed");
                            failures += 1;
                        }
                    }
                }
                Ok(StepOutcome::Done { rows, failures })
            });
        }
    }
}

fn fetch_data<A: ApiSource + ?Sized>(
    api: &A,
    path: &str,
    query: &[(&str, String)],
) -> Result<Option<Value>> {
    let payload = api.get(path, query)?;
    Ok(payload.data().cloned())
}

fn with_savepoint<T>(
    tx: &mut Transaction<'_>,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    let sp = tx.savepoint().context("open savepoint")?;
    let value = f(&sp)?;
    sp.commit().context("release savepoint")?;
    Ok(value)
}

/// Applies `f` to each item under its own savepoint so one bad entity is rolled
/// back alone.
fn each_isolated<T>(
    tx: &mut Transaction<'_>,
    what: &str,
    items: &[T],
    mut f: impl FnMut(&Connection, &T) -> Result<()>,
) -> Result<StepOutcome> {
    let mut rows = 0;
    let mut failures = 0;
    for item in items {
        match with_savepoint(tx, |conn| f(conn, item)) {
            Ok(()) => rows += 1,
            Err(err) => {
                debug!(what, error = %format!("{err:#}"), "entity skipped");
                failures += 1;
            }
        }
    }
    Ok(StepOutcome::Done { rows, failures })
}

/// Tournament chain, season and teams referenced by an event object.
/// Returns the id used for tournament-level endpoints.
fn store_event_context(conn: &Connection, e: &Value) -> Result<Option<i64>> {
    let tournament = obj(e, "tournament");
    let unique_tournament_id = match tournament.get("uniqueTournament") {
        Some(ut) => store_unique_tournament(conn, ut)?,
        None => None,
    };
    if let Some(category) = tournament.get("category") {
        store_category(conn, category)?;
    }
    let tournament_id = match map_tournament(tournament) {
        Some(row) => {
            upsert_tournament(conn, &row)?;
            Some(row.id)
        }
        None => None,
    };
    if let Some(season) = map_season(obj(e, "season"), tournament_id) {
        upsert_season(conn, &season)?;
    }
    for team in event_team_objects(e) {
        store_team(conn, team)?;
    }
    Ok(unique_tournament_id.or(tournament_id))
}

fn store_scheduled_event(conn: &Connection, e: &Value) -> Result<EventRef> {
    let api_tournament_id = store_event_context(conn, e)?;
    let row = map_event(e, None, None).ok_or_else(|| anyhow!("event without id"))?;
    upsert_event(conn, &row)?;
    for link in map_event_teams(e) {
        upsert_event_team(conn, &link)?;
    }
    if let Some(score) = map_event_score(e) {
        upsert_event_score(conn, &score)?;
    }
    Ok(EventRef {
        id: row.id,
        tournament_id: api_tournament_id,
        season_id: row.season_id,
    })
}

fn event_team_ids(conn: &Connection, event_id: i64) -> Result<HashMap<Side, i64>> {
    let mut stmt = conn
        .prepare("SELECT side, team_id FROM event_teams WHERE event_id = ?1")
        .context("prepare event team lookup")?;
    let rows = stmt
        .query_map(params![event_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .context("query event teams")?;
    let mut out = HashMap::new();
    for row in rows {
        let (side, team_id) = row.context("decode event team row")?;
        if let Some(side) = Side::parse(&side) {
            out.insert(side, team_id);
        }
    }
    Ok(out)
}

/// Stored ids to fetch images for; rows with a slug come from full entity
/// payloads, so they are preferred when present.
fn image_targets(conn: &Connection, table: &str, limit: i64) -> Result<Vec<i64>> {
    let slugged = query_ids(
        conn,
        &format!("SELECT id FROM {table} WHERE slug IS NOT NULL ORDER BY id LIMIT ?1"),
        limit,
    )?;
    if !slugged.is_empty() {
        return Ok(slugged);
    }
    query_ids(conn, &format!("SELECT id FROM {table} ORDER BY id LIMIT ?1"), limit)
}

fn query_ids(conn: &Connection, sql: &str, limit: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql).context("prepare id query")?;
    let rows = stmt
        .query_map(params![limit], |row| row.get::<_, i64>(0))
        .context("query ids")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode id")?);
    }
    Ok(out)
}
