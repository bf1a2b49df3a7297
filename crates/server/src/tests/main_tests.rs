use super::*;
use axum::{body, body::Body, http::Request};
use serde_json::json;
use shared::domain::RecordId;
use tower::ServiceExt;

async fn test_app() -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.seed_defaults().await.expect("seed");
    let app = build_router(Arc::new(AppState {
        api: ApiContext {
            storage: storage.clone(),
        },
    }));
    (app, storage)
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn lists_seeded_collection() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(Request::get("/api/users").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let users: Vec<Record> = body_json(response).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].text("username"), "admin");
}

#[tokio::test]
async fn collection_index_counts_every_resource() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(Request::get("/api").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let summaries: Vec<CollectionSummary> = body_json(response).await;
    let organisations = summaries
        .iter()
        .find(|s| s.resource == "organisations")
        .expect("organisations");
    assert_eq!(organisations.count, 1);
}

#[tokio::test]
async fn create_update_delete_round_trip() {
    let (app, storage) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/courses",
            json!({ "courseName": "Physics", "fees": 900, "id": 77 }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Record = body_json(response).await;
    assert_eq!(created.id(), Some(RecordId(1)));
    assert!(created.get("createdAt").is_some());

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/courses/1",
            json!({ "fees": 950 }),
        ))
        .await
        .expect("patch");
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Record = body_json(response).await;
    assert_eq!(updated.text("courseName"), "Physics");
    assert_eq!(updated.text("fees"), "950");

    let response = app
        .clone()
        .oneshot(
            Request::delete("/api/courses/1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        storage.count(shared::domain::EntityKind::Course).await.expect("count"),
        0
    );
}

#[tokio::test]
async fn missing_record_is_404_with_api_error() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(
            Request::get("/api/batches/42")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let err: ApiError = body_json(response).await;
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.message, "batches with id 42 not found");
}

#[tokio::test]
async fn unknown_resource_is_404() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(Request::get("/api/classrooms").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_400_validation() {
    let (app, _storage) = test_app().await;
    let request = Request::post("/api/courses")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = body_json(response).await;
    assert_eq!(err.code, ErrorCode::Validation);

    let response = app
        .oneshot(json_request("PUT", "/api/courses/x", json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
