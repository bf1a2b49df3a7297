use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite, Transaction,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

use shared::{
    domain::{EntityKind, RecordId},
    entity::default_seed,
    error::StoreError,
    record::Record,
    store::{RecordStore, StoreResult},
};

/// SQLite-backed record collections, one partition per entity resource.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn count(&self, entity: EntityKind) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE resource = ?")
            .bind(entity.resource())
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to count {entity}"))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub async fn list_records(&self, entity: EntityKind) -> Result<Vec<Record>> {
        let rows = sqlx::query("SELECT body FROM records WHERE resource = ? ORDER BY position ASC")
            .bind(entity.resource())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to list {entity}"))?;
        rows.into_iter()
            .map(|r| decode_body(entity, &r.get::<String, _>(0)))
            .collect()
    }

    pub async fn load_record(&self, entity: EntityKind, id: RecordId) -> Result<Option<Record>> {
        let row = sqlx::query("SELECT body FROM records WHERE resource = ? AND record_id = ?")
            .bind(entity.resource())
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load {entity} {id}"))?;
        row.map(|r| decode_body(entity, &r.get::<String, _>(0)))
            .transpose()
    }

    pub async fn insert_record(
        &self,
        entity: EntityKind,
        mut record: Record,
        now: DateTime<Utc>,
    ) -> Result<Record> {
        let mut tx = self.pool.begin().await?;
        let id = next_record_id(&mut tx, entity).await?;
        record.set_id(id);
        entity.stamp_created(&mut record, now);

        sqlx::query("INSERT INTO records (resource, record_id, body) VALUES (?, ?, ?)")
            .bind(entity.resource())
            .bind(id.0)
            .bind(encode_body(&record)?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert {entity} {id}"))?;
        tx.commit().await?;

        debug!(%entity, %id, "record created");
        Ok(record)
    }

    pub async fn merge_record(
        &self,
        entity: EntityKind,
        id: RecordId,
        mut patch: Record,
        now: DateTime<Utc>,
    ) -> Result<Option<Record>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT body FROM records WHERE resource = ? AND record_id = ?")
            .bind(entity.resource())
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = decode_body(entity, &row.get::<String, _>(0))?;
        patch.remove(shared::record::ID_FIELD);
        record.merge(patch);
        record.set_id(id);
        entity.stamp_updated(&mut record, now);

        sqlx::query(
            "UPDATE records SET body = ?, updated_at = CURRENT_TIMESTAMP
             WHERE resource = ? AND record_id = ?",
        )
        .bind(encode_body(&record)?)
        .bind(entity.resource())
        .bind(id.0)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to update {entity} {id}"))?;
        tx.commit().await?;

        debug!(%entity, %id, "record updated");
        Ok(Some(record))
    }

    /// Returns whether a record was deleted.
    pub async fn delete_record(&self, entity: EntityKind, id: RecordId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM records WHERE resource = ? AND record_id = ?")
            .bind(entity.resource())
            .bind(id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete {entity} {id}"))?
            .rows_affected();
        if deleted > 0 {
            debug!(%entity, %id, "record deleted");
        }
        Ok(deleted > 0)
    }

    /// Bulk-loads records as they are, keeping their ids. Records without an
    /// id get the next free one; an existing id is overwritten in place.
    pub async fn import_collection(&self, entity: EntityKind, records: Vec<Record>) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let imported = records.len();
        for mut record in records {
            let id = match record.id() {
                Some(id) => id,
                None => {
                    let id = next_record_id(&mut tx, entity).await?;
                    record.set_id(id);
                    id
                }
            };
            sqlx::query(
                "INSERT INTO records (resource, record_id, body) VALUES (?, ?, ?)
                 ON CONFLICT(resource, record_id) DO UPDATE SET body = excluded.body, updated_at = CURRENT_TIMESTAMP",
            )
            .bind(entity.resource())
            .bind(id.0)
            .bind(encode_body(&record)?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to import {entity} {id}"))?;
        }
        tx.commit().await?;
        Ok(imported)
    }

    /// Loads the default users and organisations when the store holds no
    /// records at all. Returns whether anything was seeded.
    pub async fn seed_defaults(&self) -> Result<bool> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await
            .context("failed to inspect store before seeding")?;
        if total > 0 {
            return Ok(false);
        }

        for (entity, records) in default_seed() {
            let imported = self.import_collection(entity, records).await?;
            info!(%entity, imported, "seeded default records");
        }
        Ok(true)
    }
}

#[async_trait]
impl RecordStore for Storage {
    async fn list(&self, entity: EntityKind) -> StoreResult<Vec<Record>> {
        Ok(self.list_records(entity).await?)
    }

    async fn get_by_id(&self, entity: EntityKind, id: RecordId) -> StoreResult<Record> {
        self.load_record(entity, id)
            .await?
            .ok_or_else(|| StoreError::not_found(entity, id))
    }

    async fn create(&self, entity: EntityKind, record: Record) -> StoreResult<Record> {
        Ok(self.insert_record(entity, record, Utc::now()).await?)
    }

    async fn update(
        &self,
        entity: EntityKind,
        id: RecordId,
        patch: Record,
    ) -> StoreResult<Record> {
        self.merge_record(entity, id, patch, Utc::now())
            .await?
            .ok_or_else(|| StoreError::not_found(entity, id))
    }

    async fn delete(&self, entity: EntityKind, id: RecordId) -> StoreResult<()> {
        if self.delete_record(entity, id).await? {
            Ok(())
        } else {
            Err(StoreError::not_found(entity, id))
        }
    }
}

async fn next_record_id(tx: &mut Transaction<'_, Sqlite>, entity: EntityKind) -> Result<RecordId> {
    let next: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(record_id), 0) + 1 FROM records WHERE resource = ?",
    )
    .bind(entity.resource())
    .fetch_one(&mut **tx)
    .await
    .with_context(|| format!("failed to allocate next {entity} id"))?;
    Ok(RecordId(next))
}

fn encode_body(record: &Record) -> Result<String> {
    serde_json::to_string(record).context("failed to encode record body")
}

fn decode_body(entity: EntityKind, body: &str) -> Result<Record> {
    serde_json::from_str(body).with_context(|| format!("corrupt {entity} record body"))
}

/// Creates the directory a file-backed SQLite url points into.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
