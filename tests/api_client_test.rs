mod common;

use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use recruitment_sync::{
    error::{Error, ErrorDetail},
    services::api_client::ApiClient,
    session::{SessionProvider, StaticSession},
};
use serde_json::{json, Value as JsonValue};

use common::{config_for, quiet_notifier, spawn_backend, HitCounter, MockNotifier, SESSION_TOKEN};

async fn setup_app(hits: HitCounter) -> String {
    let jobs_hits = hits.clone();
    let app = Router::new()
        .route(
            "/api/jobs",
            get(move |headers: HeaderMap| {
                let hits = jobs_hits.clone();
                async move {
                    hits.hit();
                    match headers.get("x-supabase-auth").and_then(|v| v.to_str().ok()) {
                        Some(SESSION_TOKEN) => (StatusCode::OK, Json(json!([]))).into_response(),
                        _ => (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({ "detail": "Invalid authentication credentials" })),
                        )
                            .into_response(),
                    }
                }
            }),
        )
        .route(
            "/api/jobs/public",
            get(|headers: HeaderMap| async move {
                assert!(headers.get("x-supabase-auth").is_none());
                Json(json!([{ "ok": true }]))
            }),
        )
        .route(
            "/api/jobs/missing",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "detail": "Job not found" })),
                )
            }),
        )
        .route(
            "/api/jobs/invalid",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({
                        "detail": [
                            { "loc": ["body", "title"], "msg": "field required", "type": "value_error.missing" }
                        ]
                    })),
                )
            }),
        )
        .route(
            "/api/jobs/broken",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") })
                .post(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") }),
        )
        .route(
            "/api/jobs/html",
            get(|| async { "<html>not json</html>" }),
        )
        .route(
            "/api/applications/gone",
            delete(|| async { StatusCode::NO_CONTENT }),
        );

    spawn_backend(app).await
}

fn expired_token() -> String {
    let claims = json!({ "sub": "user-1", "exp": chrono::Utc::now().timestamp() - 60 });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test_secret_key"),
    )
    .expect("encode")
}

#[tokio::test]
async fn missing_or_expired_session_fails_before_any_request() {
    let hits = HitCounter::default();
    let base = setup_app(hits.clone()).await;
    let config = config_for(&base);

    let session = Arc::new(StaticSession::signed_out());
    let api = ApiClient::new(&config, session.clone(), quiet_notifier()).expect("client");

    let err = api.get::<JsonValue>("/api/jobs").await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationRequired));

    session.set_token(Some(expired_token()));
    assert!(session.access_token().await.is_some());
    let err = api.get::<JsonValue>("/api/jobs").await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationRequired));
    assert!(err.is_auth_error());

    assert_eq!(hits.count(), 0, "no request may leave without a session");

    session.set_token(Some(SESSION_TOKEN.to_string()));
    let jobs: Vec<JsonValue> = api.get("/api/jobs").await.expect("jobs");
    assert!(jobs.is_empty());
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn public_path_skips_the_session() {
    let base = setup_app(HitCounter::default()).await;
    let config = config_for(&base);
    let api = ApiClient::new(
        &config,
        Arc::new(StaticSession::signed_out()),
        quiet_notifier(),
    )
    .expect("client");

    let jobs: Vec<JsonValue> = api.get_public("/api/jobs/public").await.expect("public jobs");
    assert_eq!(jobs.len(), 1);
}

#[tokio::test]
async fn failed_writes_notify_except_not_found() {
    let base = setup_app(HitCounter::default()).await;
    let config = config_for(&base);

    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .withf(|n| n.message == "title: field required")
        .times(1)
        .returning(|_| ());
    notifier
        .expect_notify()
        .withf(|n| n.message == "upstream unavailable")
        .times(1)
        .returning(|_| ());

    let api = ApiClient::new(
        &config,
        Arc::new(StaticSession::new(SESSION_TOKEN)),
        Arc::new(notifier),
    )
    .expect("client");

    let body = json!({});
    let err = api
        .post::<JsonValue, _>("/api/jobs/missing", &body)
        .await
        .unwrap_err();
    match err {
        Error::Api { status, detail } => {
            assert_eq!(status, 404);
            assert_eq!(detail, ErrorDetail::message("Job not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = api
        .post::<JsonValue, _>("/api/jobs/invalid", &body)
        .await
        .unwrap_err();
    match err {
        Error::Api {
            status: 422,
            detail: ErrorDetail::Validation { fields },
        } => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "title");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = api
        .post::<JsonValue, _>("/api/jobs/broken", &body)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn failed_reads_are_left_to_the_caller_to_report() {
    let base = setup_app(HitCounter::default()).await;
    let config = config_for(&base);

    let mut notifier = MockNotifier::new();
    notifier.expect_notify().times(0);
    let api = ApiClient::new(
        &config,
        Arc::new(StaticSession::new(SESSION_TOKEN)),
        Arc::new(notifier),
    )
    .expect("client");

    let err = api.get::<JsonValue>("/api/jobs/broken").await.unwrap_err();
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn decodes_empty_bodies_and_rejects_non_json() {
    let base = setup_app(HitCounter::default()).await;
    let config = config_for(&base);
    let api = ApiClient::new(
        &config,
        Arc::new(StaticSession::new(SESSION_TOKEN)),
        quiet_notifier(),
    )
    .expect("client");

    api.delete::<()>("/api/applications/gone")
        .await
        .expect("204 decodes as unit");

    let err = api.get::<Vec<JsonValue>>("/api/jobs/html").await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn rejected_session_is_reported_as_auth_error() {
    let base = setup_app(HitCounter::default()).await;
    let config = config_for(&base);
    let api = ApiClient::new(
        &config,
        Arc::new(StaticSession::new("someone-else")),
        quiet_notifier(),
    )
    .expect("client");

    let err = api.get::<JsonValue>("/api/jobs").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.is_auth_error());
    assert!(!err.is_retryable());
}
