mod common;

use serde_json::json;

use sofa_ingest::bootstrap::{self, StepOutcome};
use sofa_ingest::config::Features;
use sofa_ingest::schema::{ENTITY_TABLES, open_in_memory};

use common::{FIXTURE_DATE, FixtureApi, count, dump, test_config};

#[test]
fn full_run_populates_every_layer() {
    let api = FixtureApi::load();
    let mut conn = open_in_memory().unwrap();
    let summary = bootstrap::run(&mut conn, &api, &test_config()).unwrap();

    assert_eq!(summary.schedule_date, FIXTURE_DATE);
    assert_eq!(summary.events_scheduled, 2);
    assert_eq!(summary.events_processed, vec![100, 101]);

    assert_eq!(count(&conn, "sports"), 1);
    assert_eq!(count(&conn, "categories"), 2);
    assert_eq!(count(&conn, "unique_tournaments"), 1);
    assert_eq!(count(&conn, "tournaments"), 1);
    assert_eq!(count(&conn, "seasons"), 1);
    assert_eq!(count(&conn, "events"), 2);
    assert_eq!(count(&conn, "event_teams"), 4);
    assert_eq!(count(&conn, "event_scores"), 2);
    assert_eq!(count(&conn, "venues"), 1);
    assert_eq!(count(&conn, "referees"), 1);
    assert_eq!(count(&conn, "lineups"), 2);
    assert_eq!(count(&conn, "lineup_players"), 4);
    assert_eq!(count(&conn, "player_heatmaps"), 3);
    assert_eq!(count(&conn, "player_transfers"), 1);
    assert_eq!(count(&conn, "player_statistics"), 1);
    assert_eq!(count(&conn, "team_statistics"), 2);
    assert_eq!(count(&conn, "standings"), 2);
    assert_eq!(count(&conn, "tournament_featured_events"), 2);
    assert_eq!(count(&conn, "tournament_videos"), 1);
    assert_eq!(count(&conn, "trending_players"), 2);
    assert_eq!(count(&conn, "suggestions"), 2);
    assert_eq!(count(&conn, "live_category_counts"), 2);
    assert_eq!(count(&conn, "event_count_by_sport"), 2);
    assert_eq!(count(&conn, "images_player"), 1);
    assert_eq!(count(&conn, "images_team"), 1);
    assert_eq!(count(&conn, "images_tournament"), 1);

    let (venue, referee): (Option<i64>, Option<i64>) = conn
        .query_row(
            "SELECT venue_id, referee_id FROM events WHERE id = 100",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((venue, referee), (Some(7), Some(9)));

    let size: String = conn
        .query_row("SELECT size FROM images_team WHERE team_id = 42", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(size, "small");

    let runs: (i64, Option<String>) = conn
        .query_row(
            "SELECT COUNT(*), MAX(finished_at) FROM ingest_runs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(runs.0, 1);
    assert!(runs.1.is_some());
}

#[test]
fn trending_player_country_is_stored_in_full() {
    let api = FixtureApi::load();
    let mut config = test_config();
    config.features = Features::all(false);
    config.features.trending = true;
    let mut conn = open_in_memory().unwrap();
    bootstrap::run(&mut conn, &api, &config).unwrap();

    let country: (Option<String>, Option<String>) = conn
        .query_row(
            "SELECT alpha3, name FROM countries WHERE alpha2 = 'NO'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(
        country,
        (Some("NOR".to_string()), Some("Norway".to_string()))
    );
}

#[test]
fn rerun_leaves_tables_unchanged() {
    let api = FixtureApi::load();
    let mut config = test_config();
    // fetched_at differs between runs
    config.features.images = false;
    let mut conn = open_in_memory().unwrap();

    bootstrap::run(&mut conn, &api, &config).unwrap();
    let first = ENTITY_TABLES
        .iter()
        .map(|t| (*t, dump(&conn, t)))
        .collect::<Vec<_>>();

    let second_summary = bootstrap::run(&mut conn, &api, &config).unwrap();
    for (table, rows) in &first {
        assert_eq!(&dump(&conn, table), rows, "table {table} changed on rerun");
    }
    assert_eq!(
        second_summary.outcome("heatmap:100/1001"),
        Some(&StepOutcome::Done {
            rows: 0,
            failures: 0
        })
    );
    assert_eq!(count(&conn, "ingest_runs"), 2);
}

#[test]
fn heatmap_points_keep_input_order() {
    let api = FixtureApi::load();
    let mut conn = open_in_memory().unwrap();
    bootstrap::run(&mut conn, &api, &test_config()).unwrap();

    let mut stmt = conn
        .prepare(
            "SELECT seq, x, y FROM player_heatmaps
             WHERE event_id = 100 AND player_id = 1001 ORDER BY seq",
        )
        .unwrap();
    let points = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        points,
        vec![
            (0, Some(10), Some(20)),
            (1, Some(30), Some(41)),
            (2, Some(50), Some(60)),
        ]
    );
}

#[test]
fn event_cap_limits_enrichment() {
    let mut api = FixtureApi::load();
    let events = (201..=205)
        .map(|id| {
            json!({
                "id": id,
                "tournament": {
                    "id": 1,
                    "name": "Premier League",
                    "uniqueTournament": { "id": 17, "name": "Premier League" }
                },
                "homeTeam": { "id": 42, "name": "Arsenal" },
                "awayTeam": { "id": 38, "name": "Chelsea" }
            })
        })
        .collect::<Vec<_>>();
    api.set(
        &format!("/football/events/scheduled?date={FIXTURE_DATE}"),
        json!({ "success": true, "data": { "events": events } }),
    );

    let mut config = test_config();
    config.max_events = 2;
    config.features = Features::all(false);
    let mut conn = open_in_memory().unwrap();
    let summary = bootstrap::run(&mut conn, &api, &config).unwrap();

    assert_eq!(summary.events_scheduled, 5);
    assert_eq!(summary.events_processed, vec![201, 202]);
    assert_eq!(count(&conn, "events"), 5);
    assert_eq!(
        api.calls_to("/football/event/lineups"),
        vec![
            "/football/event/lineups?event_id=201".to_string(),
            "/football/event/lineups?event_id=202".to_string(),
        ]
    );
    assert_eq!(api.calls_to("/football/event/details").len(), 2);
    assert!(api.calls_to("/football/player/heatmap").is_empty());
    assert!(api.calls_to("/football/tournament/standings").is_empty());
}

#[test]
fn starters_cap_applies_per_side() {
    let api = FixtureApi::load();
    let mut config = test_config();
    config.max_starters = 1;
    let mut conn = open_in_memory().unwrap();
    bootstrap::run(&mut conn, &api, &config).unwrap();

    assert_eq!(
        api.calls_to("/football/player/heatmap"),
        vec![
            "/football/player/heatmap?event_id=100&player_id=1001".to_string(),
            "/football/player/heatmap?event_id=100&player_id=2001".to_string(),
        ]
    );
    // substitutes are stored but never enriched
    assert_eq!(count(&conn, "lineup_players"), 4);
}

#[test]
fn foreign_keys_hold_after_run() {
    let api = FixtureApi::load();
    let mut conn = open_in_memory().unwrap();
    bootstrap::run(&mut conn, &api, &test_config()).unwrap();

    let mut stmt = conn.prepare("PRAGMA foreign_key_check").unwrap();
    let violations = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert!(violations.is_empty(), "violations: {violations:?}");
}

#[test]
fn failing_steps_do_not_stop_the_run() {
    let api = FixtureApi::load();
    let mut conn = open_in_memory().unwrap();
    let summary = bootstrap::run(&mut conn, &api, &test_config()).unwrap();

    assert!(matches!(
        summary.outcome("lineups:101"),
        Some(StepOutcome::Failed { .. })
    ));
    assert!(matches!(
        summary.outcome("event_details:101"),
        Some(StepOutcome::Skipped { .. })
    ));
    assert!(matches!(
        summary.outcome("heatmap:100/2001"),
        Some(StepOutcome::Failed { .. })
    ));
    assert!(matches!(
        summary.outcome("trending_players"),
        Some(StepOutcome::Done { rows: 2, .. })
    ));
    assert!(matches!(
        summary.outcome("event_count_by_sport"),
        Some(StepOutcome::Done { rows: 2, .. })
    ));
    assert!(summary.steps_failed() > 0);
    assert!(summary.steps_done() > summary.steps_failed());

    let stored: String = conn
        .query_row("SELECT steps_json FROM ingest_runs", [], |row| row.get(0))
        .unwrap();
    let steps: serde_json::Value = serde_json::from_str(&stored).unwrap();
    let names = steps
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s.get("step").and_then(|v| v.as_str()))
        .collect::<Vec<_>>();
    assert!(names.contains(&"lineups:101"));
    assert_eq!(names.first(), Some(&"seed_sports"));
}

#[test]
fn bad_entity_is_isolated_within_step() {
    let mut api = FixtureApi::load();
    api.set(
        "/football/categories",
        json!({
            "success": true,
            "data": {
                "categories": [
                    { "id": 1, "name": "England", "sport": { "id": 1, "name": "Football" } },
                    { "name": "No id", "sport": { "id": 1 } },
                    { "id": 7, "name": "Spain", "sport": { "id": 1, "name": "Football" } }
                ]
            }
        }),
    );
    let mut config = test_config();
    config.features = Features::all(false);
    let mut conn = open_in_memory().unwrap();
    let summary = bootstrap::run(&mut conn, &api, &config).unwrap();

    assert_eq!(
        summary.outcome("categories"),
        Some(&StepOutcome::Done {
            rows: 2,
            failures: 1
        })
    );
    assert_eq!(
        summary.outcome("tournament_catalog"),
        Some(&StepOutcome::Done {
            rows: 1,
            failures: 1
        })
    );
    assert_eq!(count(&conn, "categories"), 2);
    assert_eq!(count(&conn, "unique_tournaments"), 1);
}

#[test]
fn transport_failure_on_schedule_skips_enrichment() {
    let mut api = FixtureApi::load();
    api.remove(&format!("/football/events/scheduled?date={FIXTURE_DATE}"));
    let mut conn = open_in_memory().unwrap();
    let summary = bootstrap::run(&mut conn, &api, &test_config()).unwrap();

    assert!(matches!(
        summary.outcome("scheduled_events"),
        Some(StepOutcome::Failed { .. })
    ));
    assert!(summary.events_processed.is_empty());
    assert!(api.calls_to("/football/event/details").is_empty());
    assert_eq!(count(&conn, "events"), 0);
    assert_eq!(count(&conn, "categories"), 2);
}
