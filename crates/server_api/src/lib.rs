use serde_json::Value;
use shared::{
    domain::{EntityKind, RecordId},
    error::{ApiError, ErrorCode},
    protocol::CollectionSummary,
    record::Record,
    store::RecordStore,
};
use storage::Storage;
use tracing::warn;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn health(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.storage.health_check().await.map_err(internal)
}

pub async fn list_collections(ctx: &ApiContext) -> Result<Vec<CollectionSummary>, ApiError> {
    let mut summaries = Vec::with_capacity(EntityKind::ALL.len());
    for entity in EntityKind::ALL {
        let count = ctx.storage.count(entity).await.map_err(internal)?;
        summaries.push(CollectionSummary {
            resource: entity.resource().to_string(),
            count,
        });
    }
    Ok(summaries)
}

pub async fn list_records(ctx: &ApiContext, resource: &str) -> Result<Vec<Record>, ApiError> {
    let entity = resolve_entity(resource)?;
    Ok(ctx.storage.list(entity).await?)
}

pub async fn get_record(ctx: &ApiContext, resource: &str, id: &str) -> Result<Record, ApiError> {
    let entity = resolve_entity(resource)?;
    let id = parse_id(id)?;
    Ok(ctx.storage.get_by_id(entity, id).await?)
}

pub async fn create_record(
    ctx: &ApiContext,
    resource: &str,
    body: Value,
) -> Result<Record, ApiError> {
    let entity = resolve_entity(resource)?;
    let record = record_from_json(body)?;
    Ok(ctx.storage.create(entity, record).await?)
}

/// PUT and PATCH share this: both merge the body into the stored record.
pub async fn update_record(
    ctx: &ApiContext,
    resource: &str,
    id: &str,
    body: Value,
) -> Result<Record, ApiError> {
    let entity = resolve_entity(resource)?;
    let id = parse_id(id)?;
    let patch = record_from_json(body)?;
    Ok(ctx.storage.update(entity, id, patch).await?)
}

pub async fn delete_record(ctx: &ApiContext, resource: &str, id: &str) -> Result<(), ApiError> {
    let entity = resolve_entity(resource)?;
    let id = parse_id(id)?;
    Ok(ctx.storage.delete(entity, id).await?)
}

pub fn resolve_entity(resource: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_resource(resource).ok_or_else(|| {
        ApiError::new(
            ErrorCode::NotFound,
            format!("unknown resource '{resource}'"),
        )
    })
}

fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    raw.parse::<i64>().map(RecordId).map_err(|_| {
        ApiError::new(
            ErrorCode::Validation,
            format!("record id must be an integer, got '{raw}'"),
        )
    })
}

fn record_from_json(body: Value) -> Result<Record, ApiError> {
    if !body.is_object() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "record body must be a JSON object",
        ));
    }
    serde_json::from_value(body).map_err(|e| {
        ApiError::new(
            ErrorCode::Validation,
            format!("record fields must be null, boolean, number or string: {e}"),
        )
    })
}

fn internal(err: anyhow::Error) -> ApiError {
    warn!(error = %err, "storage request failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn setup() -> ApiContext {
        let storage = Storage::new("sqlite::memory:").await.expect("db");
        ApiContext { storage }
    }

    #[tokio::test]
    async fn unknown_resource_is_not_found() {
        let ctx = setup().await;
        let err = list_records(&ctx, "classrooms")
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(err.message.contains("classrooms"));
    }

    #[tokio::test]
    async fn non_object_body_is_rejected() {
        let ctx = setup().await;
        let err = create_record(&ctx, "courses", json!(["not", "a", "record"]))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::Validation);

        let err = create_record(&ctx, "courses", json!({ "tags": ["nested"] }))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected() {
        let ctx = setup().await;
        let err = get_record(&ctx, "courses", "abc")
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[tokio::test]
    async fn create_then_update_round_trips_through_storage() {
        let ctx = setup().await;
        let created = create_record(&ctx, "payments", json!({ "amount": 500, "mode": "cash" }))
            .await
            .expect("create");
        assert_eq!(created.id(), Some(RecordId(1)));

        let updated = update_record(&ctx, "payments", "1", json!({ "mode": "card" }))
            .await
            .expect("update");
        assert_eq!(updated.text("mode"), "card");
        assert_eq!(updated.text("amount"), "500");

        let fetched = get_record(&ctx, "payments", "1").await.expect("get");
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn delete_of_missing_record_is_not_found() {
        let ctx = setup().await;
        let err = delete_record(&ctx, "receipts", "4")
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "receipts with id 4 not found");
    }

    #[tokio::test]
    async fn collection_summaries_cover_every_entity() {
        let ctx = setup().await;
        ctx.storage.seed_defaults().await.expect("seed");

        let summaries = list_collections(&ctx).await.expect("summaries");
        assert_eq!(summaries.len(), EntityKind::ALL.len());
        let users = summaries
            .iter()
            .find(|s| s.resource == "users")
            .expect("users summary");
        assert_eq!(users.count, 1);
        health(&ctx).await.expect("health");
    }
}
