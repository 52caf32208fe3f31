use crate::fetch::{Endpoint, RequestParams, schema};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCount {
    pub endpoint: String,
    pub entries: i64,
}

/// Persistent map from (endpoint, params) to the response body last
/// received for that request.
pub struct ResponseCache {
    conn: Connection,
}

impl ResponseCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create cache parent dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open response cache {}", path.display()))?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn get(&self, endpoint: Endpoint, params: &RequestParams) -> Result<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM responses WHERE key = ?1",
                params![cache_key(endpoint, params)],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| {
            serde_json::from_str(&b)
                .with_context(|| format!("decode cached {endpoint} response"))
        })
        .transpose()
    }

    pub fn put(&self, endpoint: Endpoint, params: &RequestParams, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO responses (key, endpoint, params, body, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                cache_key(endpoint, params),
                endpoint.path(),
                params.canonical(),
                body,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn counts_by_endpoint(&self) -> Result<Vec<EndpointCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT endpoint, COUNT(*) FROM responses GROUP BY endpoint ORDER BY endpoint ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EndpointCount {
                    endpoint: row.get(0)?,
                    entries: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub fn cache_key(endpoint: Endpoint, params: &RequestParams) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.path().as_bytes());
    hasher.update(b"?");
    hasher.update(params.canonical().as_bytes());
    format!("{:x}", hasher.finalize())
}
