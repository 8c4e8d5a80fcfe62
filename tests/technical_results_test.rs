mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{extract::Query, routing::get, Json, Router};
use recruitment_sync::{
    cache::QueryKey, models::technical::TechnicalStatus, session::StaticSession, HiringClient,
};
use serde_json::json;
use uuid::Uuid;

use common::{config_for, quiet_notifier, spawn_backend, HitCounter, SESSION_TOKEN};

const APP_A: &str = "0f9e1d1c-1111-4aaa-8bbb-00000000000a";
const APP_B: &str = "0f9e1d1c-1111-4aaa-8bbb-00000000000b";
const ADA: &str = "0f9e1d1c-2222-4aaa-8bbb-0000000000c1";
const ALAN: &str = "0f9e1d1c-2222-4aaa-8bbb-0000000000c2";

type Params = Arc<Mutex<Vec<HashMap<String, String>>>>;

fn response_row(application_id: &str, applicant_id: &str, score: Option<f64>) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "application_id": application_id,
        "job_applications": {
            "applicant_id": applicant_id,
            "job_roles": { "title": "Backend Engineer" }
        },
        "question": "How does the borrow checker work?",
        "answer": "It tracks lifetimes of references.",
        "audio_url": null,
        "score": score,
        "reasoning": null,
        "created_at": "2025-04-02T08:30:00+00:00"
    })
}

async fn setup_app() -> (String, Params, HitCounter) {
    let row_params: Params = Arc::new(Mutex::new(Vec::new()));
    let profile_hits = HitCounter::default();

    let seen = row_params.clone();
    let hits = profile_hits.clone();
    let app = Router::new()
        .route(
            "/rest/v1/technical_assessment_responses",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(params);
                    Json(json!([
                        response_row(APP_A, ADA, Some(8.0)),
                        response_row(APP_B, ALAN, Some(9.0)),
                        response_row(APP_A, ADA, Some(6.0)),
                        response_row(APP_A, ADA, None),
                    ]))
                }
            }),
        )
        .route(
            "/rest/v1/candidate_profiles",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                async move {
                    hits.hit();
                    let filter = &params["id"];
                    assert!(filter.contains(ADA) && filter.contains(ALAN), "{filter}");
                    Json(json!([
                        { "id": ADA, "full_name": "Ada Lovelace", "email": "ada@example.com" },
                        { "id": ALAN, "full_name": "Alan Turing", "email": "alan@example.com" }
                    ]))
                }
            }),
        );

    (spawn_backend(app).await, row_params, profile_hits)
}

#[tokio::test]
async fn groups_rows_per_application_with_one_candidate_lookup() {
    let (base, row_params, profile_hits) = setup_app().await;
    let client = HiringClient::new(
        &config_for(&base),
        Arc::new(StaticSession::new(SESSION_TOKEN)),
        quiet_notifier(),
    )
    .expect("client");

    let groups = client.technical.results(None).await.expect("results");
    assert_eq!(groups.len(), 2);

    let a = &groups[0];
    assert_eq!(a.application_id.to_string(), APP_A);
    assert_eq!(a.responses.len(), 3);
    assert!((a.average_score - 14.0 / 3.0).abs() < 1e-9);
    assert_eq!(a.status, TechnicalStatus::Pending);
    assert_eq!(a.candidate_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(a.job_title.as_deref(), Some("Backend Engineer"));
    assert_eq!(a.applicant_id.map(|id| id.to_string()).as_deref(), Some(ADA));

    let b = &groups[1];
    assert_eq!(b.average_score, 9.0);
    assert_eq!(b.status, TechnicalStatus::Completed);
    assert_eq!(b.candidate_email.as_deref(), Some("alan@example.com"));

    assert_eq!(profile_hits.count(), 1);
    {
        let params = row_params.lock().unwrap();
        assert_eq!(params[0]["limit"], "200");
        assert_eq!(
            params[0]["select"],
            "*,job_applications(applicant_id,job_roles(title))"
        );
        assert_eq!(params[0]["order"], "created_at.desc");
    }

    // Cached until something invalidates the results prefix.
    client.technical.results(None).await.expect("cached");
    assert_eq!(row_params.lock().unwrap().len(), 1);

    client.queries.invalidate(&QueryKey::technical_results_all());
    client.technical.results(None).await.expect("refetched");
    assert_eq!(row_params.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn single_application_filters_by_id() {
    let (base, row_params, _) = setup_app().await;
    let client = HiringClient::new(
        &config_for(&base),
        Arc::new(StaticSession::new(SESSION_TOKEN)),
        quiet_notifier(),
    )
    .expect("client");

    let id: Uuid = APP_A.parse().unwrap();
    client.technical.results(Some(id)).await.expect("results");

    let params = row_params.lock().unwrap();
    assert_eq!(params[0]["application_id"], format!("eq.{}", APP_A));
    assert!(!params[0].contains_key("limit"));
    assert!(client
        .queries
        .is_fresh(&QueryKey::technical_results(Some(id))));
}
