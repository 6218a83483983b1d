//! Record store implementation for SQLite.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;

use digidex_core::error::{StoreError, StoreResult};
use digidex_core::models::{CatalogId, Record};
use digidex_core::ports::RecordStore;

use super::database::Database;

/// SQLite implementation of [`RecordStore`].
///
/// Records are stored one row per catalog identifier with the serialized
/// record as payload. `put` reconciles with any existing row inside a
/// transaction, so a full record is never downgraded by a later partial
/// write-back.
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, id: CatalogId) -> StoreResult<Option<Record>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM records WHERE id = ?1")
                .bind(id.value() as i64)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::QueryError(e.to_string()))?;

        let Some((payload,)) = row else {
            return Ok(None);
        };

        match serde_json::from_str::<Record>(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // A corrupt entry behaves like a miss so the next fetch
                // rewrites it; it must never take the whole lookup down.
                warn!(%id, error = %e, "Corrupt cache entry, treating as absent");
                Ok(None)
            }
        }
    }

    async fn put(&self, record: &Record) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM records WHERE id = ?1")
                .bind(record.id.value() as i64)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StoreError::QueryError(e.to_string()))?;

        // Merge with whatever is already cached; a corrupt existing payload
        // is discarded in favor of the fresh fragment.
        let merged = match existing.and_then(|(payload,)| {
            serde_json::from_str::<Record>(&payload)
                .inspect_err(|e| {
                    warn!(id = %record.id, error = %e, "Corrupt cache entry, overwriting");
                })
                .ok()
        }) {
            Some(cached) => cached.merged_with(record.clone()),
            None => record.clone(),
        };

        let payload = serde_json::to_string(&merged)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO records (id, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.id.value() as i64)
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(())
    }

    async fn len(&self) -> StoreResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(row.0 as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::DatabaseConfig;
    use digidex_core::models::LevelTag;

    async fn store() -> (Database, SqliteRecordStore) {
        let db = Database::connect(&DatabaseConfig::in_memory()).await.unwrap();
        db.migrate().await.unwrap();
        let store = SqliteRecordStore::new(&db);
        (db, store)
    }

    fn partial(id: u32) -> Record {
        Record::partial(CatalogId(id), format!("Mon-{id}"), None, Utc::now())
    }

    fn full(id: u32) -> Record {
        let mut record = partial(id);
        record.levels = Some(vec![LevelTag {
            id: Some(4),
            level: "Adult".into(),
        }]);
        record.types = Some(vec![]);
        record.attributes = Some(vec![]);
        record.fields = Some(vec![]);
        record.descriptions = Some(vec![]);
        record.skills = Some(vec![]);
        record.prior_evolutions = Some(vec![]);
        record.next_evolutions = Some(vec![]);
        record
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let (_db, store) = store().await;

        store.put(&full(5)).await.unwrap();

        let loaded = store.get(CatalogId(5)).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Mon-5");
        assert!(loaded.is_full());
        assert!(store.get(CatalogId(6)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_merges_instead_of_overwriting() {
        let (_db, store) = store().await;

        store.put(&full(7)).await.unwrap();
        // A later partial write-back (e.g. from an old list payload) must
        // not strip the detail fields.
        store.put(&partial(7)).await.unwrap();

        let loaded = store.get(CatalogId(7)).await.unwrap().unwrap();
        assert!(loaded.is_full());
    }

    #[tokio::test]
    async fn partial_then_full_upgrades_the_row() {
        let (_db, store) = store().await;

        store.put(&partial(3)).await.unwrap();
        store.put(&full(3)).await.unwrap();

        let loaded = store.get(CatalogId(3)).await.unwrap().unwrap();
        assert!(loaded.is_full());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn corrupt_payload_is_treated_as_absent() {
        let (db, store) = store().await;

        sqlx::query("INSERT INTO records (id, payload, updated_at) VALUES (9, 'not json', '')")
            .execute(db.pool())
            .await
            .unwrap();

        assert!(store.get(CatalogId(9)).await.unwrap().is_none());

        // A fresh put replaces the corrupt row.
        store.put(&full(9)).await.unwrap();
        assert!(store.get(CatalogId(9)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn purge_empties_the_cache() {
        let (db, store) = store().await;
        store.put(&full(1)).await.unwrap();
        store.put(&full(2)).await.unwrap();

        let stats = db.purge().await.unwrap();

        assert_eq!(stats.records_removed, 2);
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
