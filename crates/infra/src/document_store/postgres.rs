//! Postgres-backed document store.
//!
//! Documents live in a single `documents` table keyed by `(collection, id)`
//! with the fields stored as `JSONB`.
//!
//! ## Atomicity
//!
//! - `increment()` is a single `INSERT .. ON CONFLICT DO UPDATE` statement, so
//!   concurrent increments serialize on the row.
//! - Other writes run in a transaction that locks the row (`FOR UPDATE`) to
//!   capture the before-state for the change feed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use recordkeep_core::DocumentId;
use recordkeep_events::{DocumentSnapshot, Fields};

use super::r#trait::{DocumentStore, SetOptions, StoreError, WriteOutcome, merge_fields};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT        NOT NULL,
    id          TEXT        NOT NULL,
    data        JSONB       NOT NULL,
    update_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, id)
)
"#;

#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the `documents` table exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<DocumentSnapshot>, StoreError> {
        let row = sqlx::query(
            "SELECT data, update_time FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_row", e))?;

        row.map(|row| snapshot_from_row(collection, id.clone(), &row)).transpose()
    }

    async fn upsert(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
        id: &DocumentId,
        data: Fields,
    ) -> Result<DocumentSnapshot, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, update_time)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, id) DO UPDATE
                SET data = EXCLUDED.data, update_time = EXCLUDED.update_time
            RETURNING data, update_time
            "#,
        )
        .bind(collection)
        .bind(id.as_str())
        .bind(JsonValue::Object(data))
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("upsert", e))?;

        snapshot_from_row(collection, id.clone(), &row)
    }

    async fn write_with<F>(&self, collection: &str, id: &DocumentId, apply: F) -> Result<WriteOutcome, StoreError>
    where
        F: FnOnce(Option<&DocumentSnapshot>) -> Result<Option<Fields>, StoreError> + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let before = Self::lock_row(&mut tx, collection, id).await?;

        let after = match apply(before.as_ref())? {
            Some(data) => Some(Self::upsert(&mut tx, collection, id, data).await?),
            None => {
                sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                    .bind(collection)
                    .bind(id.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("delete", e))?;
                None
            }
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(WriteOutcome {
            id: id.clone(),
            before,
            after,
        })
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self, data), err)]
    async fn add(&self, collection: &str, data: Fields) -> Result<WriteOutcome, StoreError> {
        let id = DocumentId::generate();
        self.write_with(collection, &id, |_| Ok(Some(data))).await
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<DocumentSnapshot>, StoreError> {
        let row = sqlx::query("SELECT data, update_time FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|row| snapshot_from_row(collection, id.clone(), &row)).transpose()
    }

    async fn list(&self, collection: &str) -> Result<Vec<DocumentSnapshot>, StoreError> {
        let rows = sqlx::query("SELECT id, data, update_time FROM documents WHERE collection = $1 ORDER BY id ASC")
            .bind(collection)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("id").map_err(|e| map_sqlx_error("list", e))?;
                let id = DocumentId::new(raw).map_err(|e| StoreError::InvalidData(e.to_string()))?;
                snapshot_from_row(collection, id, row)
            })
            .collect()
    }

    #[instrument(skip(self, data), err)]
    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Fields,
        options: SetOptions,
    ) -> Result<WriteOutcome, StoreError> {
        self.write_with(collection, id, |existing| {
            Ok(Some(match (options, existing) {
                (SetOptions::Merge, Some(existing)) => {
                    let mut merged = existing.data().clone();
                    merge_fields(&mut merged, data);
                    merged
                }
                _ => data,
            }))
        })
        .await
    }

    #[instrument(skip(self, data), err)]
    async fn update(&self, collection: &str, id: &DocumentId, data: Fields) -> Result<WriteOutcome, StoreError> {
        self.write_with(collection, id, |existing| {
            let existing = existing.ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.clone(),
            })?;
            let mut merged = existing.data().clone();
            merge_fields(&mut merged, data);
            Ok(Some(merged))
        })
        .await
    }

    #[instrument(skip(self), err)]
    async fn increment(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        delta: i64,
    ) -> Result<WriteOutcome, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, update_time)
            VALUES ($1, $2, jsonb_build_object($3::text, $4::bigint), NOW())
            ON CONFLICT (collection, id) DO UPDATE
                SET data = documents.data || jsonb_build_object(
                        $3::text,
                        COALESCE((documents.data ->> $3::text)::bigint, 0) + $4::bigint
                    ),
                    update_time = NOW()
            RETURNING data, update_time, (xmax = 0) AS inserted
            "#,
        )
        .bind(collection)
        .bind(id.as_str())
        .bind(field)
        .bind(delta)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("increment", e))?;

        let after = snapshot_from_row(collection, id.clone(), &row)?;
        let inserted: bool = row.try_get("inserted").map_err(|e| map_sqlx_error("increment", e))?;

        // Only `field` changed, so the prior state is reconstructible.
        let before = if inserted {
            None
        } else {
            let mut data = after.data().clone();
            let current = data.get(field).and_then(JsonValue::as_i64).unwrap_or(delta);
            if current == delta {
                data.remove(field);
            } else {
                data.insert(field.to_string(), JsonValue::from(current - delta));
            }
            Some(DocumentSnapshot::new(collection, id.clone(), data, after.update_time()))
        };

        Ok(WriteOutcome {
            id: id.clone(),
            before,
            after: Some(after),
        })
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<WriteOutcome, StoreError> {
        self.write_with(collection, id, |_| Ok(None)).await
    }
}

fn snapshot_from_row(
    collection: &str,
    id: DocumentId,
    row: &sqlx::postgres::PgRow,
) -> Result<DocumentSnapshot, StoreError> {
    let data: JsonValue = row.try_get("data").map_err(|e| map_sqlx_error("decode_row", e))?;
    let update_time: DateTime<Utc> = row
        .try_get("update_time")
        .map_err(|e| map_sqlx_error("decode_row", e))?;

    match data {
        JsonValue::Object(fields) => Ok(DocumentSnapshot::new(collection, id, fields, update_time)),
        other => Err(StoreError::InvalidData(format!(
            "document {collection}/{id} is not an object: {other}"
        ))),
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}
