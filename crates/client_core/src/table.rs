//! A list controller bound to the store its collection comes from.

use chrono::NaiveDate;
use listing::{Column, ListConfig, ListController};
use shared::{
    domain::{EntityKind, RecordId},
    entity::PersonRole,
    record::Record,
    store::{RecordStore, StoreResult},
};
use tracing::info;

/// One entity table: loads its collection from `S` and re-lists it wholesale
/// after every create, update or delete.
pub struct EntityTable<S> {
    store: S,
    entity: EntityKind,
    role: Option<PersonRole>,
    controller: ListController<Record>,
}

impl<S: RecordStore> EntityTable<S> {
    pub fn new(store: S, entity: EntityKind) -> Self {
        let config = ListConfig::new(entity.searchable_fields().iter().copied());
        Self::with_config(store, entity, config)
    }

    pub fn with_config(store: S, entity: EntityKind, config: ListConfig) -> Self {
        Self {
            store,
            entity,
            role: None,
            controller: ListController::new(Vec::new(), config),
        }
    }

    pub async fn load(&mut self) -> StoreResult<()> {
        let mut rows = self.store.list(self.entity).await?;
        if let Some(role) = self.role {
            rows = role.retain(rows);
        }
        info!(entity = %self.entity, rows = rows.len(), "table loaded");
        self.controller.replace_collection(rows);
        Ok(())
    }

    /// Loads persons whose registration number marks them as students.
    pub async fn load_students(&mut self) -> StoreResult<()> {
        self.load_role(PersonRole::Student).await
    }

    pub async fn load_tutors(&mut self) -> StoreResult<()> {
        self.load_role(PersonRole::Tutor).await
    }

    async fn load_role(&mut self, role: PersonRole) -> StoreResult<()> {
        if self.entity != EntityKind::Person {
            // Search fields and columns follow the entity; the page size carries over.
            let config = ListConfig::new(EntityKind::Person.searchable_fields().iter().copied())
                .with_page_size(self.controller.page_size());
            self.controller = ListController::new(Vec::new(), config);
            self.entity = EntityKind::Person;
        }
        self.role = Some(role);
        self.load().await
    }

    pub async fn create(&mut self, record: Record) -> StoreResult<Record> {
        let created = self.store.create(self.entity, record).await?;
        self.load().await?;
        Ok(created)
    }

    pub async fn update(&mut self, id: RecordId, patch: Record) -> StoreResult<Record> {
        let updated = self.store.update(self.entity, id, patch).await?;
        self.load().await?;
        Ok(updated)
    }

    pub async fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        self.store.delete(self.entity, id).await?;
        self.load().await
    }

    /// CSV of every row passing the current search, in display order.
    pub fn export_csv(&self) -> String {
        self.controller.export_delimited(&export_columns(self.entity))
    }

    pub fn controller(&self) -> &ListController<Record> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ListController<Record> {
        &mut self.controller
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn role(&self) -> Option<PersonRole> {
        self.role
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

pub fn export_columns(entity: EntityKind) -> Vec<Column<'static, Record>> {
    entity
        .export_columns()
        .iter()
        .map(|column| Column::new(column.header, move |record: &Record| column.value(record)))
        .collect()
}

pub fn export_file_name(entity: EntityKind, date: NaiveDate) -> String {
    format!("{}_{}.csv", entity.resource(), date.format("%Y-%m-%d"))
}
