#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use serde_json::Value;

use sofa_ingest::config::{BootstrapConfig, DbConfig, Features};
use sofa_ingest::http_client::{ApiSource, Payload};

pub const FIXTURE_DATE: &str = "2024-05-01";

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

pub fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture file should be readable")
}

/// Serves canned envelopes keyed by `path?k=v&k=v`; unknown routes fail like a
/// transport error. A body of the form `{"__text": "..."}` is served as plain text.
pub struct FixtureApi {
    routes: HashMap<String, Value>,
    calls: RefCell<Vec<String>>,
}

impl FixtureApi {
    pub fn load() -> Self {
        let raw = read_fixture("api_routes.json");
        let parsed: Value = serde_json::from_str(&raw).expect("routes fixture should parse");
        let routes = parsed
            .as_object()
            .expect("routes fixture should be an object")
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            routes,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn route(&self, key: &str) -> &Value {
        self.routes.get(key).expect("route should exist")
    }

    pub fn set(&mut self, key: &str, body: Value) {
        self.routes.insert(key.to_string(), body);
    }

    pub fn remove(&mut self, key: &str) {
        self.routes.remove(key);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.as_str() == path || c.starts_with(&format!("{path}?")))
            .cloned()
            .collect()
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

pub fn route_key(path: &str, query: &[(&str, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let pairs = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{pairs}")
}

impl ApiSource for FixtureApi {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Payload> {
        let key = route_key(path, query);
        self.calls.borrow_mut().push(key.clone());
        match self.routes.get(&key) {
            Some(body) => match body.get("__text").and_then(Value::as_str) {
                Some(text) => Ok(Payload::Text(text.to_string())),
                None => Ok(Payload::Json(body.clone())),
            },
            None => Err(anyhow!("http 404 Not Found for http://fixture.local{key}")),
        }
    }

    fn base_url(&self) -> &str {
        "http://fixture.local"
    }
}

pub fn test_config() -> BootstrapConfig {
    BootstrapConfig {
        db: DbConfig::in_memory(),
        features: Features::all(true),
        suggestion_queries: vec!["football".to_string()],
        image_delay: Duration::ZERO,
        transfer_delay: Duration::ZERO,
        schedule_date: Some(FIXTURE_DATE.to_string()),
        ..BootstrapConfig::default()
    }
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count query should succeed")
}

/// All rows of `table` rendered as strings, sorted.
pub fn dump(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {table}"))
        .expect("select should prepare");
    let width = stmt.column_count();
    let mut rows = stmt.query([]).expect("select should run");
    let mut out = Vec::new();
    while let Some(row) = rows.next().expect("row should decode") {
        let cols = (0..width)
            .map(|i| format!("{:?}", row.get_ref(i).expect("column should read")))
            .collect::<Vec<_>>();
        out.push(cols.join("|"));
    }
    out.sort();
    out
}
