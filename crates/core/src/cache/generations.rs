//! Generation bookkeeping: open, enumerate and delete named caches.

use std::collections::BTreeSet;

use super::connection::Database;
use crate::Error;
use tokio_rusqlite::params;

/// Handle to one named cache generation.
///
/// Cheap to clone; every clone talks to the same [`Database`].
#[derive(Clone, Debug)]
pub struct CacheHandle {
    pub(crate) db: Database,
    pub(crate) name: String,
}

impl CacheHandle {
    /// Generation name this handle reads and writes.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Database {
    /// Create-or-open a named cache generation.
    ///
    /// Idempotent: opening an existing generation keeps its entries.
    pub async fn open_generation(&self, name: &str) -> Result<CacheHandle, Error> {
        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generations (name, created_at) VALUES (?1, ?2)
                    ON CONFLICT(name) DO NOTHING",
                    params![owned, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheHandle { db: self.clone(), name: name.to_string() })
    }

    /// Handle to a generation without creating it.
    ///
    /// Writes fail on the foreign key once the generation has been deleted.
    pub fn generation(&self, name: &str) -> CacheHandle {
        CacheHandle { db: self.clone(), name: name.to_string() }
    }

    /// Names of every generation currently in storage.
    pub async fn generations(&self) -> Result<BTreeSet<String>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeSet<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<BTreeSet<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a generation exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE generation = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let a = db.open_generation("cacheAssets-v1").await.unwrap();
        let b = db.open_generation("cacheAssets-v1").await.unwrap();
        assert_eq!(a.name(), b.name());

        let names = db.generations().await.unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains("cacheAssets-v1"));
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let db = Database::open_in_memory().await.unwrap();
        db.open_generation("cacheAssets-v1").await.unwrap();
        db.open_generation("cacheAssets-v2").await.unwrap();

        assert!(db.delete_generation("cacheAssets-v1").await.unwrap());
        assert!(!db.delete_generation("cacheAssets-v1").await.unwrap());

        assert!(!db.has_generation("cacheAssets-v1").await.unwrap());
        assert!(db.has_generation("cacheAssets-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_handle_to_deleted_generation_does_not_recreate_it() {
        let db = Database::open_in_memory().await.unwrap();
        db.open_generation("cacheAssets-v2").await.unwrap();

        let stale = db.generation("cacheAssets-v1");
        let request = crate::Request::get(url::Url::parse("http://localhost:8080/app.js").unwrap());
        assert!(stale.match_request(&request).await.unwrap().is_none());
        assert!(stale.put(&request, &crate::Response::ok("v1")).await.is_err());

        let names: Vec<String> = db.generations().await.unwrap().into_iter().collect();
        assert_eq!(names, vec!["cacheAssets-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_store_has_no_generations() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(db.generations().await.unwrap().is_empty());
    }
}
