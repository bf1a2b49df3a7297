//! The data-access seam every table loads its collection through.

use async_trait::async_trait;

use crate::{
    domain::{EntityKind, RecordId},
    error::StoreError,
    record::Record,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD over per-entity record collections.
///
/// Implementations keep collections in insertion order, assign
/// `id = max(existing) + 1` on create and stamp timestamps according to
/// [`EntityKind::timestamp_policy`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, entity: EntityKind) -> StoreResult<Vec<Record>>;
    async fn get_by_id(&self, entity: EntityKind, id: RecordId) -> StoreResult<Record>;
    /// Any `id` carried by `record` is ignored.
    async fn create(&self, entity: EntityKind, record: Record) -> StoreResult<Record>;
    /// Shallow-merges `patch` into the stored record; the id never changes.
    async fn update(&self, entity: EntityKind, id: RecordId, patch: Record)
        -> StoreResult<Record>;
    async fn delete(&self, entity: EntityKind, id: RecordId) -> StoreResult<()>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn list(&self, entity: EntityKind) -> StoreResult<Vec<Record>> {
        (**self).list(entity).await
    }

    async fn get_by_id(&self, entity: EntityKind, id: RecordId) -> StoreResult<Record> {
        (**self).get_by_id(entity, id).await
    }

    async fn create(&self, entity: EntityKind, record: Record) -> StoreResult<Record> {
        (**self).create(entity, record).await
    }

    async fn update(
        &self,
        entity: EntityKind,
        id: RecordId,
        patch: Record,
    ) -> StoreResult<Record> {
        (**self).update(entity, id, patch).await
    }

    async fn delete(&self, entity: EntityKind, id: RecordId) -> StoreResult<()> {
        (**self).delete(entity, id).await
    }
}
