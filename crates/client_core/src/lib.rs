use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{EntityKind, RecordId},
    error::{ApiError, ErrorCode, StoreError},
    protocol::{collection_route, record_route},
    record::Record,
    store::{RecordStore, StoreResult},
};
use tracing::{debug, warn};
use url::Url;

mod table;

pub use table::{export_columns, export_file_name, EntityTable};

/// [`RecordStore`] backed by the mock REST server.
#[derive(Clone)]
pub struct RestStore {
    http: Client,
    server_url: String,
}

impl RestStore {
    pub fn new(server_url: impl AsRef<str>) -> anyhow::Result<Self> {
        let raw = server_url.as_ref().trim();
        let parsed = Url::parse(raw).with_context(|| format!("invalid server url '{raw}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("server_url must start with http:// or https://"));
        }
        Ok(Self {
            http: Client::new(),
            server_url: raw.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn collection_url(&self, entity: EntityKind) -> String {
        format!("{}{}", self.server_url, collection_route(entity))
    }

    fn record_url(&self, entity: EntityKind, id: RecordId) -> String {
        format!("{}{}", self.server_url, record_route(entity, id))
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn list(&self, entity: EntityKind) -> StoreResult<Vec<Record>> {
        let res = self
            .http
            .get(self.collection_url(entity))
            .send()
            .await
            .with_context(|| format!("GET {entity} failed"))?;
        read_json(checked(res, entity, None).await?).await
    }

    async fn get_by_id(&self, entity: EntityKind, id: RecordId) -> StoreResult<Record> {
        let res = self
            .http
            .get(self.record_url(entity, id))
            .send()
            .await
            .with_context(|| format!("GET {entity} {id} failed"))?;
        read_json(checked(res, entity, Some(id)).await?).await
    }

    async fn create(&self, entity: EntityKind, record: Record) -> StoreResult<Record> {
        let res = self
            .http
            .post(self.collection_url(entity))
            .json(&record)
            .send()
            .await
            .with_context(|| format!("POST {entity} failed"))?;
        let created: Record = read_json(checked(res, entity, None).await?).await?;
        debug!(%entity, id = ?created.id(), "record created over REST");
        Ok(created)
    }

    async fn update(
        &self,
        entity: EntityKind,
        id: RecordId,
        patch: Record,
    ) -> StoreResult<Record> {
        let res = self
            .http
            .put(self.record_url(entity, id))
            .json(&patch)
            .send()
            .await
            .with_context(|| format!("PUT {entity} {id} failed"))?;
        read_json(checked(res, entity, Some(id)).await?).await
    }

    async fn delete(&self, entity: EntityKind, id: RecordId) -> StoreResult<()> {
        let res = self
            .http
            .delete(self.record_url(entity, id))
            .send()
            .await
            .with_context(|| format!("DELETE {entity} {id} failed"))?;
        checked(res, entity, Some(id)).await?;
        Ok(())
    }
}

/// Passes successful responses through and turns the rest into [`StoreError`]s.
async fn checked(res: Response, entity: EntityKind, id: Option<RecordId>) -> StoreResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(StoreError::not_found(entity, id));
        }
    }

    let body = res.text().await.unwrap_or_default();
    let err = match serde_json::from_str::<ApiError>(&body) {
        Ok(api) if api.code == ErrorCode::Validation => StoreError::Validation(api.message),
        Ok(api) => StoreError::Backend(anyhow!("{status}: {}", api.message)),
        Err(_) => StoreError::Backend(anyhow!("{status}: {body}")),
    };
    warn!(%entity, %status, error = %err, "REST request rejected");
    Err(err)
}

async fn read_json<T: DeserializeOwned>(res: Response) -> StoreResult<T> {
    Ok(res.json().await.context("failed to decode server response")?)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
