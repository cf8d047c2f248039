use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::Value;
use std::hint::black_box;

use sofa_ingest::http_client::{decode_body, envelope_data};
use sofa_ingest::rows::{map_event, map_event_score, map_event_teams, map_lineups};
use sofa_ingest::schema::open_in_memory;
use sofa_ingest::upsert::{store_team, upsert_event};

const ROUTES_JSON: &str = include_str!("../tests/fixtures/api_routes.json");

fn route(key: &str) -> Value {
    let routes: Value = serde_json::from_str(ROUTES_JSON).expect("valid fixture json");
    envelope_data(&routes[key])
        .cloned()
        .expect("fixture route carries data")
}

fn bench_envelope_decode(c: &mut Criterion) {
    c.bench_function("envelope_decode", |b| {
        b.iter(|| {
            let payload = decode_body(black_box(ROUTES_JSON));
            black_box(payload.data().is_none());
        })
    });
}

fn bench_event_mapping(c: &mut Criterion) {
    let scheduled = route("/football/events/scheduled?date=2024-05-01");
    c.bench_function("event_mapping", |b| {
        b.iter(|| {
            for e in scheduled["events"].as_array().into_iter().flatten() {
                black_box(map_event(black_box(e), None, None));
                black_box(map_event_teams(e).len());
                black_box(map_event_score(e));
            }
        })
    });
}

fn bench_lineup_mapping(c: &mut Criterion) {
    let lineups = route("/football/event/lineups?event_id=100");
    c.bench_function("lineup_mapping", |b| {
        b.iter(|| {
            let parsed = map_lineups(black_box(&lineups));
            black_box(parsed.sides.len());
        })
    });
}

fn bench_event_upsert(c: &mut Criterion) {
    let scheduled = route("/football/events/scheduled?date=2024-05-01");
    let event = scheduled["events"][0].clone();
    let row = map_event(&event, None, None).expect("event maps");
    let conn = open_in_memory().expect("in-memory db");
    for team in [&event["homeTeam"], &event["awayTeam"]] {
        store_team(&conn, team).expect("team stored");
    }
    let mut unlinked = row;
    unlinked.tournament_id = None;
    unlinked.season_id = None;
    c.bench_function("event_upsert", |b| {
        b.iter(|| {
            upsert_event(&conn, black_box(&unlinked)).unwrap();
        })
    });
}

criterion_group!(
    mapping,
    bench_envelope_decode,
    bench_event_mapping,
    bench_lineup_mapping,
    bench_event_upsert
);
criterion_main!(mapping);
