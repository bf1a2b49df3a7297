//! Paths and payloads shared by the mock REST server and its client.

use serde::{Deserialize, Serialize};

use crate::domain::{EntityKind, RecordId};

pub const API_PREFIX: &str = "/api";

pub fn collection_route(entity: EntityKind) -> String {
    format!("{API_PREFIX}/{}", entity.resource())
}

pub fn record_route(entity: EntityKind, id: RecordId) -> String {
    format!("{API_PREFIX}/{}/{}", entity.resource(), id)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionSummary {
    pub resource: String,
    pub count: usize,
}
