use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use server_api::{
    create_record, delete_record, get_record, health, list_collections, list_records,
    update_record, ApiContext,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::CollectionSummary,
    record::Record,
};
use storage::Storage;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::{error, info};

mod config;

use config::{load_settings, prepare_database_url};

const MAX_RECORD_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type HttpResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    if settings.seed_defaults && storage.seed_defaults().await? {
        info!(%database_url, "empty store seeded with default records");
    }

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "mock REST server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api", get(http_list_collections))
        .route(
            "/api/:resource",
            get(http_list_records).post(http_create_record),
        )
        .route(
            "/api/:resource/:id",
            get(http_get_record)
                .put(http_update_record)
                .patch(http_update_record)
                .delete(http_delete_record),
        )
        .layer(RequestBodyLimitLayer::new(MAX_RECORD_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> HttpResult<&'static str> {
    health(&state.api)
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, Json(e)))?;
    Ok("ok")
}

async fn http_list_collections(
    State(state): State<Arc<AppState>>,
) -> HttpResult<Json<Vec<CollectionSummary>>> {
    let summaries = list_collections(&state.api).await.map_err(reject)?;
    Ok(Json(summaries))
}

async fn http_list_records(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
) -> HttpResult<Json<Vec<Record>>> {
    let records = list_records(&state.api, &resource).await.map_err(reject)?;
    Ok(Json(records))
}

async fn http_get_record(
    State(state): State<Arc<AppState>>,
    Path((resource, id)): Path<(String, String)>,
) -> HttpResult<Json<Record>> {
    let record = get_record(&state.api, &resource, &id).await.map_err(reject)?;
    Ok(Json(record))
}

async fn http_create_record(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    body: Bytes,
) -> HttpResult<(StatusCode, Json<Record>)> {
    let body = parse_body(&body)?;
    let record = create_record(&state.api, &resource, body)
        .await
        .map_err(reject)?;
    info!(%resource, id = ?record.id(), "record created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn http_update_record(
    State(state): State<Arc<AppState>>,
    Path((resource, id)): Path<(String, String)>,
    body: Bytes,
) -> HttpResult<Json<Record>> {
    let body = parse_body(&body)?;
    let record = update_record(&state.api, &resource, &id, body)
        .await
        .map_err(reject)?;
    info!(%resource, %id, "record updated");
    Ok(Json(record))
}

async fn http_delete_record(
    State(state): State<Arc<AppState>>,
    Path((resource, id)): Path<(String, String)>,
) -> HttpResult<StatusCode> {
    delete_record(&state.api, &resource, &id)
        .await
        .map_err(reject)?;
    info!(%resource, %id, "record deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn parse_body(body: &Bytes) -> HttpResult<Value> {
    serde_json::from_slice(body).map_err(|e| {
        reject(ApiError::new(
            ErrorCode::Validation,
            format!("invalid JSON body: {e}"),
        ))
    })
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
