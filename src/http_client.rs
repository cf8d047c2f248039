use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::{Value, json};

use crate::config::ApiConfig;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// The `data` object of a `{ "success": true, "data": ... }` envelope.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => envelope_data(v),
            Payload::Text(_) => None,
        }
    }

    /// JSON view used for snapshots; text bodies are wrapped as `{ "raw": ... }`.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(v) => v,
            Payload::Text(raw) => json!({ "raw": raw }),
        }
    }
}

pub fn envelope_data(v: &Value) -> Option<&Value> {
    if !v.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    v.get("data").filter(|d| !d.is_null())
}

/// GET-only access to the sports API.
///
/// `path` is relative to the configured base URL and starts with `/`.
pub trait ApiSource {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Payload>;

    fn base_url(&self) -> &str;
}

pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl ApiSource for HttpApi {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Payload> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, ?query, "GET");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header(USER_AGENT, "Mozilla/5.0")
            .header(ACCEPT, "application/json")
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("failed reading body: {url}"))?;
        if !status.is_success() {
            return Err(anyhow!("http {status} for {url}: {}", truncate(&body, 200)));
        }
        Ok(decode_body(&body))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

pub fn decode_body(body: &str) -> Payload {
    match serde_json::from_str::<Value>(body.trim()) {
        Ok(v) => Payload::Json(v),
        Err(_) => Payload::Text(body.to_string()),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
