//! Entry operations on a cache generation.
//!
//! Entries are keyed by normalized request and overwritten wholesale; a write
//! never touches any other key.

use bytes::Bytes;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::generations::CacheHandle;
use super::key::request_key;
use crate::Error;
use crate::http::{Network, Request, Response};

/// Metadata of a stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachedEntry {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub size: usize,
    pub stored_at: String,
}

struct Row {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Bytes,
}

impl Row {
    fn encode(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.method.is_retrieval() {
            return Err(Error::UnsupportedMethod(format!(
                "refusing to cache {} {}",
                request.method, request.url
            )));
        }

        Ok(Self {
            key_hash: request_key(request),
            method: request.method.to_string(),
            url: request.cache_url(),
            status: response.status,
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
        })
    }
}

impl CacheHandle {
    /// Look up the stored response for a request.
    ///
    /// Absence is `Ok(None)`, never an error.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let name = self.name.clone();
        let key = request_key(request);
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<(u16, String, Vec<u8>)>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body FROM entries
                    WHERE generation = ?1 AND key_hash = ?2",
                    params![name, key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((status, headers_json, body)) = row else {
            return Ok(None);
        };

        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
        Ok(Some(Response { status, headers, body: Bytes::from(body) }))
    }

    /// Metadata for a request's entry, if stored.
    pub async fn entry(&self, request: &Request) -> Result<Option<CachedEntry>, Error> {
        let name = self.name.clone();
        let key = request_key(request);
        self.db
            .conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let result = conn.query_row(
                    "SELECT method, url, status, LENGTH(body), stored_at FROM entries
                    WHERE generation = ?1 AND key_hash = ?2",
                    params![name, key],
                    |row| {
                        Ok(CachedEntry {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            size: row.get::<_, i64>(3)? as usize,
                            stored_at: row.get(4)?,
                        })
                    },
                );

                match result {
                    Ok(e) => Ok(Some(e)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store a snapshot of `response` under `request`, replacing any prior entry.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.write(vec![Row::encode(request, response)?]).await
    }

    /// Fetch every request and store all responses.
    ///
    /// Fetches run concurrently. If any fetch fails or returns a non-success
    /// status nothing is written and the error is returned.
    pub async fn add_all(&self, network: &dyn Network, requests: &[Request]) -> Result<usize, Error> {
        let responses = try_join_all(requests.iter().map(|r| network.fetch(r))).await?;

        let mut rows = Vec::with_capacity(requests.len());
        for (request, response) in requests.iter().zip(&responses) {
            if !response.is_success() {
                return Err(Error::HttpError(format!("{} returned status {}", request.url, response.status)));
            }
            rows.push(Row::encode(request, response)?);
        }

        let count = rows.len();
        self.write(rows).await?;
        tracing::debug!(generation = %self.name, count, "pre-populated cache");
        Ok(count)
    }

    async fn write(&self, rows: Vec<Row>) -> Result<(), Error> {
        let name = self.name.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    tx.execute(
                        "INSERT INTO entries (
                        generation, key_hash, method, url, status, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                        params![
                            &name,
                            &row.key_hash,
                            &row.method,
                            &row.url,
                            row.status,
                            &row.headers_json,
                            row.body.as_ref(),
                            &stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a request's entry. Returns false if it was not stored.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let name = self.name.clone();
        let key = request_key(request);
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![name, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All entries of this generation, ordered by URL.
    pub async fn keys(&self) -> Result<Vec<CachedEntry>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, LENGTH(body), stored_at FROM entries
                    WHERE generation = ?1 ORDER BY url ASC",
                )?;
                let entries = stmt
                    .query_map(params![name], |row| {
                        Ok(CachedEntry {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            size: row.get::<_, i64>(3)? as usize,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this generation.
    pub async fn len(&self) -> Result<usize, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether the generation holds no entries.
    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Database;
    use crate::http::Method;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use url::Url;

    struct FixedNetwork(HashMap<String, Response>);

    #[async_trait]
    impl Network for FixedNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.0
                .get(request.url.as_str())
                .cloned()
                .ok_or_else(|| Error::FetchFailed(format!("unreachable: {}", request.url)))
        }
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = db.open_generation("cacheAssets-v1").await.unwrap();
        let request = get("https://example.com/app.js");
        let response = Response::ok("console.log(1)").with_header("content-type", "text/javascript");

        cache.put(&request, &response).await.unwrap();

        let stored = cache.match_request(&request).await.unwrap().unwrap();
        assert_eq!(stored, response);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = db.open_generation("cacheAssets-v1").await.unwrap();
        let result = cache.match_request(&get("https://example.com/none")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = db.open_generation("cacheAssets-v1").await.unwrap();
        let request = get("https://example.com/");

        cache.put(&request, &Response::ok("old")).await.unwrap();
        cache.put(&request, &Response::ok("new")).await.unwrap();

        let stored = cache.match_request(&request).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"new"));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_retrieval() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = db.open_generation("cacheAssets-v1").await.unwrap();
        let request = Request::new(Method::Post, Url::parse("https://example.com/songs").unwrap());

        let result = cache.put(&request, &Response::ok("{}")).await;
        assert!(matches!(result, Err(Error::UnsupportedMethod(_))));
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let db = Database::open_in_memory().await.unwrap();
        let v1 = db.open_generation("cacheAssets-v1").await.unwrap();
        let v2 = db.open_generation("cacheAssets-v2").await.unwrap();
        let request = get("https://example.com/");

        v1.put(&request, &Response::ok("v1")).await.unwrap();

        assert!(v2.match_request(&request).await.unwrap().is_none());
        db.delete_generation("cacheAssets-v1").await.unwrap();
        assert!(v1.match_request(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_all() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = db.open_generation("cacheAssets-v1").await.unwrap();
        let network = FixedNetwork(HashMap::from([
            ("https://example.com/".to_string(), Response::ok("<html>")),
            ("https://example.com/manifest.json".to_string(), Response::ok("{}")),
        ]));

        let requests = [get("https://example.com/"), get("https://example.com/manifest.json")];
        let count = cache.add_all(&network, &requests).await.unwrap();
        assert_eq!(count, 2);

        let keys = cache.keys().await.unwrap();
        let urls: Vec<&str> = keys.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/", "https://example.com/manifest.json"]);
    }

    #[tokio::test]
    async fn test_add_all_is_all_or_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = db.open_generation("cacheAssets-v1").await.unwrap();
        let network = FixedNetwork(HashMap::from([
            ("https://example.com/".to_string(), Response::ok("<html>")),
            ("https://example.com/manifest.json".to_string(), Response::new(404, "")),
        ]));

        let requests = [get("https://example.com/"), get("https://example.com/manifest.json")];
        let result = cache.add_all(&network, &requests).await;
        assert!(matches!(result, Err(Error::HttpError(_))));
        assert!(cache.is_empty().await.unwrap());

        let result = cache.add_all(&network, &[get("https://example.com/offline")]).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_entry_metadata_and_delete() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = db.open_generation("cacheAssets-v1").await.unwrap();
        let request = get("https://example.com/index.html");
        cache.put(&request, &Response::ok("hello")).await.unwrap();

        let entry = cache.entry(&request).await.unwrap().unwrap();
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.size, 5);

        assert!(cache.delete(&request).await.unwrap());
        assert!(cache.entry(&request).await.unwrap().is_none());
    }
}
