//! Entry operations within a namespace.
//!
//! Writes use UPSERT semantics keyed on (namespace, request key), so the last
//! writer for a request wins. Only an allowlisted subset of response headers is
//! persisted.

use super::connection::CacheDb;
use super::key::RequestKey;
use super::namespaces::CacheHandle;
use crate::Error;
use crate::http::{CachedResponse, ResponseType};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// Response headers kept when a response is stored.
pub const STORED_HEADERS: &[&str] =
    &["content-type", "content-language", "cache-control", "etag", "last-modified", "vary"];

/// A row ready to be written.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    final_url: String,
    status: u16,
    response_type: &'static str,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(key: &RequestKey, response: &CachedResponse) -> Result<Self, Error> {
        let headers: Vec<&(String, String)> = response
            .headers
            .iter()
            .filter(|(name, _)| STORED_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)))
            .collect();
        let headers_json = serde_json::to_string(&headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        Ok(Self {
            key_hash: key.hash(),
            method: key.method().to_string(),
            url: key.url().to_string(),
            final_url: response.url.to_string(),
            status: response.status,
            response_type: response_type_str(response.kind),
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

fn response_type_str(kind: ResponseType) -> &'static str {
    match kind {
        ResponseType::Basic => "basic",
        ResponseType::Cors => "cors",
        ResponseType::Opaque => "opaque",
    }
}

fn parse_response_type(s: &str) -> Result<ResponseType, Error> {
    match s {
        "basic" => Ok(ResponseType::Basic),
        "cors" => Ok(ResponseType::Cors),
        "opaque" => Ok(ResponseType::Opaque),
        other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
    }
}

fn upsert(conn: &rusqlite::Connection, namespace: &str, row: &EntryRow, stored_at: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO entries (
            namespace, key_hash, method, url, final_url, status,
            response_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(namespace, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            final_url = excluded.final_url,
            status = excluded.status,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            namespace,
            &row.key_hash,
            &row.method,
            &row.url,
            &row.final_url,
            row.status,
            row.response_type,
            &row.headers_json,
            &row.body,
            stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Look up the entry for a request in a namespace.
    ///
    /// Returns None if the namespace holds no entry for the key.
    pub async fn get_entry(&self, handle: &CacheHandle, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let namespace = handle.namespace().to_string();
        let key_hash = key.hash();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<(String, u16, String, String, Vec<u8>)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT final_url, status, response_type, headers_json, body
                    FROM entries WHERE namespace = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![namespace, key_hash], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((final_url, status, response_type, headers_json, body)) = raw else {
            return Ok(None);
        };

        let url = Url::parse(&final_url).map_err(|e| Error::CorruptEntry(format!("{final_url}: {e}")))?;
        let headers: Vec<(String, String)> =
            serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        Ok(Some(CachedResponse { url, status, headers, body: body.into(), kind: parse_response_type(&response_type)? }))
    }

    /// Insert or replace the entry for a request.
    pub async fn put_entry(&self, handle: &CacheHandle, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        let namespace = handle.namespace().to_string();
        let row = EntryRow::new(key, response)?;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| upsert(conn, &namespace, &row, &stored_at))
            .await
            .map_err(Error::from)
    }

    /// Write a batch of entries in one transaction.
    ///
    /// Either every entry is written or none is. The namespace row is
    /// (re)created inside the same transaction.
    pub async fn put_entries(
        &self, handle: &CacheHandle, entries: &[(RequestKey, CachedResponse)],
    ) -> Result<usize, Error> {
        let namespace = handle.namespace().to_string();
        let rows = entries
            .iter()
            .map(|(key, response)| EntryRow::new(key, response))
            .collect::<Result<Vec<_>, _>>()?;
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                    params![namespace, stored_at],
                )?;
                for row in &rows {
                    upsert(&tx, &namespace, row, &stored_at)?;
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Count entries in a namespace.
    pub async fn count_entries(&self, handle: &CacheHandle) -> Result<u64, Error> {
        let namespace = handle.namespace().to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE namespace = ?1", params![namespace], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
