use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EntityKind, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failures surfaced by a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: EntityKind, id: RecordId },
    #[error("invalid record: {0}")]
    Validation(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn not_found(entity: EntityKind, id: RecordId) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// An entity name that matches no collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity '{0}'")]
pub struct UnknownEntity(pub String);

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        let code = match &value {
            StoreError::NotFound { .. } => ErrorCode::NotFound,
            StoreError::Validation(_) => ErrorCode::Validation,
            StoreError::Backend(_) => ErrorCode::Internal,
        };
        ApiError::new(code, value.to_string())
    }
}
