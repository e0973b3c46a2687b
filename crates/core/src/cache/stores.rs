//! Cache store and entry operations.
//!
//! A store is created when a generation installs and removed, entries
//! included, when a newer generation activates.

use super::ResourceStore;
use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
///
/// Only GET responses are ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Snapshot of a GET response, stamped with the current time.
    pub fn get(url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            status,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[async_trait::async_trait]
impl ResourceStore for CacheDb {
    async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_entry(&self, store: &str, method: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        let store = store.to_string();
        let key = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, stored_at
                    FROM cache_entries WHERE store_name = ?1 AND request_key = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((method, url, status, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(StoredResponse { method, url, status, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Uses UPSERT semantics: a fresh copy of a URL replaces the old one.
    async fn put_entry(&self, store: &str, entry: &StoredResponse) -> Result<(), Error> {
        if !entry.method.eq_ignore_ascii_case("GET") {
            return Err(Error::InvalidInput(format!("only GET responses are cacheable, got {}", entry.method)));
        }

        let store = store.to_string();
        let key = compute_request_key(&entry.method, &entry.url);
        let headers_json = serde_json::to_string(&entry.headers)?;
        let entry = entry.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let written = conn.execute(
                    "INSERT INTO cache_entries (
                        store_name, request_key, method, url, status, headers_json, body, stored_at
                    )
                    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
                    WHERE EXISTS (SELECT 1 FROM cache_stores WHERE name = ?1)
                    ON CONFLICT(store_name, request_key) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &store,
                        &key,
                        entry.method.to_ascii_uppercase(),
                        &entry.url,
                        entry.status,
                        &headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;

                if written == 0 {
                    return Err(Error::InvalidState(format!("cache store {store} does not exist")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store_name = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(url: &str, body: &str) -> StoredResponse {
        StoredResponse::get(
            url,
            200,
            vec![("content-type".to_string(), "text/html".to_string())],
            body.as_bytes().to_vec(),
        )
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shenbury-v1").await.unwrap();

        let entry = make_entry("https://example.com/", "<html></html>");
        db.put_entry("shenbury-v1", &entry).await.unwrap();

        let found = db
            .match_entry("shenbury-v1", "GET", "https://example.com/")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, entry);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shenbury-v1").await.unwrap();
        let result = db.match_entry("shenbury-v1", "GET", "https://example.com/").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_entries_are_scoped_to_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shenbury-v1").await.unwrap();
        db.open_store("shenbury-v2").await.unwrap();
        db.put_entry("shenbury-v1", &make_entry("https://example.com/", "old")).await.unwrap();

        let other = db.match_entry("shenbury-v2", "GET", "https://example.com/").await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shenbury-v1").await.unwrap();
        db.put_entry("shenbury-v1", &make_entry("https://example.com/", "old")).await.unwrap();
        db.put_entry("shenbury-v1", &make_entry("https://example.com/", "new")).await.unwrap();

        let found = db
            .match_entry("shenbury-v1", "GET", "https://example.com/")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.body, b"new".to_vec());
        assert_eq!(db.entry_count("shenbury-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shenbury-v1").await.unwrap();
        let mut entry = make_entry("https://example.com/api/buy", "{}");
        entry.method = "POST".to_string();

        let result = db.put_entry("shenbury-v1", &entry).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_put_into_missing_store_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.put_entry("shenbury-v1", &make_entry("https://example.com/", "x")).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert!(db.store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_store_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shenbury-v1").await.unwrap();
        db.put_entry("shenbury-v1", &make_entry("https://example.com/", "x")).await.unwrap();

        assert!(db.delete_store("shenbury-v1").await.unwrap());
        assert!(!db.delete_store("shenbury-v1").await.unwrap());
        assert_eq!(db.entry_count("shenbury-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_store_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shenbury-v1").await.unwrap();
        db.put_entry("shenbury-v1", &make_entry("https://example.com/", "x")).await.unwrap();
        db.open_store("shenbury-v1").await.unwrap();

        assert_eq!(db.store_names().await.unwrap(), vec!["shenbury-v1".to_string()]);
        assert_eq!(db.entry_count("shenbury-v1").await.unwrap(), 1);
    }
}
