use std::sync::Arc;

use rocket::{
    http::{ContentType, Header, Status},
    local::asynchronous::{Client, LocalResponse},
};
use serde_json::{json, Value};

use crate::{
    config::Config,
    leaderboard::Leaderboard,
    routes::{ErrorBody, Health, SubmitResponse},
    score::{Device, ScoreRecord},
    tree::MemoryTree,
};

const TEST_API_KEY: &str = "test-secret";
const TEST_ORIGIN: &str = "https://race.example.com";

/// Builds a client around a fresh in-memory tree, which is returned
/// so tests can inspect what was written.
async fn spawn_client() -> (Client, Arc<MemoryTree>) {
    spawn_client_with(MemoryTree::new()).await
}

async fn spawn_client_with(tree: MemoryTree) -> (Client, Arc<MemoryTree>) {
    let config = Config::from_lookup(|name| match name {
        "SCORES_API_KEY" => Some(TEST_API_KEY.to_owned()),
        "DATABASE_URL" => Some("memory:".to_owned()),
        "ALLOWED_ORIGINS" => Some(TEST_ORIGIN.to_owned()),
        _ => None,
    })
    .expect("valid test configuration");

    let tree = Arc::new(tree);
    let client = Client::tracked(super::build_rocket(&config, tree.clone()))
        .await
        .expect("valid rocket instance");
    (client, tree)
}

async fn deserialize_response<'a, T: rocket::serde::DeserializeOwned>(
    response: LocalResponse<'a>,
) -> serde_json::Result<T> {
    let string = response.into_string().await.unwrap();
    serde_json::from_str(&string)
}

/// Submits `body` with the given key and returns the response.
async fn submit<'a>(client: &'a Client, body: &Value, api_key: Option<&str>) -> LocalResponse<'a> {
    let mut request = client.post("/scores/submit").json(body);
    if let Some(api_key) = api_key {
        request = request.header(Header::new("x-api-key", api_key.to_owned()));
    }
    request.dispatch().await
}

/// Submits `body` with the correct key and returns the saved record.
async fn submit_ok(client: &Client, body: Value) -> ScoreRecord {
    let response = submit(client, &body, Some(TEST_API_KEY)).await;
    assert_eq!(response.status(), Status::Ok);

    let response = deserialize_response::<SubmitResponse>(response).await.unwrap();
    assert!(response.ok);
    response.saved
}

async fn get_scores(client: &Client, uri: &str) -> Vec<ScoreRecord> {
    let response = client.get(uri).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let leaderboard = deserialize_response::<Leaderboard>(response).await.unwrap();
    leaderboard.iter().cloned().collect()
}

fn keys(scores: &[ScoreRecord]) -> Vec<&str> {
    scores.iter().map(|record| record.key.as_str()).collect()
}

#[rocket::async_test]
async fn health_reports_the_time() {
    let (client, _) = spawn_client().await;

    let response = client.get("/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let health = deserialize_response::<Health>(response).await.unwrap();
    assert!(health.ok);
    assert!(health.time > 0);
}

#[rocket::async_test]
async fn unknown_paths_are_not_found() {
    let (client, _) = spawn_client().await;

    let response = client.get("/leaderboard").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let body = deserialize_response::<ErrorBody>(response).await.unwrap();
    assert_eq!(body.error, "Not found");
}

#[rocket::async_test]
async fn empty_store_lists_nothing() {
    let (client, _) = spawn_client().await;
    assert!(get_scores(&client, "/scores").await.is_empty());
}

#[rocket::async_test]
async fn submission_without_key_is_unauthorized() {
    let (client, tree) = spawn_client().await;
    let body = json!({ "name": "Alice", "c1": 55 });

    // No key
    let response = submit(&client, &body, None).await;
    assert_eq!(response.status(), Status::Unauthorized);
    let error = deserialize_response::<ErrorBody>(response).await.unwrap();
    assert_eq!(error.error, "Unauthorized");

    // Wrong key
    let response = submit(&client, &body, Some("thatisarandomkey")).await;
    assert_eq!(response.status(), Status::Unauthorized);

    assert_eq!(tree.write_count(), 0);
    assert!(get_scores(&client, "/scores").await.is_empty());
}

#[rocket::async_test]
async fn blank_name_is_rejected() {
    let (client, tree) = spawn_client().await;

    for body in [
        json!({ "name": "   ", "c1": 55 }),
        json!({ "c1": 55 }),
        json!({ "name": 42, "c1": 55 }),
    ] {
        let response = submit(&client, &body, Some(TEST_API_KEY)).await;
        assert_eq!(response.status(), Status::BadRequest);
        let error = deserialize_response::<ErrorBody>(response).await.unwrap();
        assert_eq!(error.error, "name is required");
    }

    assert_eq!(tree.write_count(), 0);
}

#[rocket::async_test]
async fn malformed_body_is_rejected() {
    let (client, tree) = spawn_client().await;

    let response = client
        .post("/scores/submit")
        .header(ContentType::JSON)
        .header(Header::new("x-api-key", TEST_API_KEY))
        .body("{ not json")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    assert_eq!(tree.write_count(), 0);
}

#[rocket::async_test]
async fn worse_time_is_ignored() {
    let (client, _) = spawn_client().await;

    let first = submit_ok(&client, json!({ "name": "Alice", "c1": 55 })).await;
    assert_eq!(first.key, "alice");
    assert_eq!(first.times.c1, Some(55.0));

    let second = submit_ok(&client, json!({ "name": "Alice", "c1": 60 })).await;
    assert_eq!(second.times.c1, Some(55.0));
    assert!(second.updated_at >= first.updated_at);

    let third = submit_ok(&client, json!({ "name": "Alice", "c1": 50.5 })).await;
    assert_eq!(third.times.c1, Some(50.5));
}

#[rocket::async_test]
async fn missing_course_carries_forward() {
    let (client, _) = spawn_client().await;

    submit_ok(&client, json!({ "name": "Alice", "device": "mobile", "c1": 55 })).await;
    let saved = submit_ok(&client, json!({ "name": "alice ", "c2": "fast" })).await;

    assert_eq!(saved.key, "alice");
    assert_eq!(saved.name, "alice");
    assert_eq!(saved.device, Device::Desktop);
    assert_eq!(saved.times.c1, Some(55.0));
    assert_eq!(saved.times.c2, None);
}

#[rocket::async_test]
async fn similar_names_share_one_record() {
    let (client, _) = spawn_client().await;

    submit_ok(&client, json!({ "name": "Bob Smith!!", "c3": 20 })).await;
    let saved = submit_ok(&client, json!({ "name": "bob   smith", "c3": 25, "c4": 8 })).await;

    assert_eq!(saved.key, "bob-smith");
    assert_eq!(saved.times.c3, Some(20.0));
    assert_eq!(saved.times.c4, Some(8.0));

    let scores = get_scores(&client, "/scores").await;
    assert_eq!(keys(&scores), ["bob-smith"]);
}

#[rocket::async_test]
async fn scores_sort_by_course_and_direction() {
    let (client, _) = spawn_client().await;

    submit_ok(&client, json!({ "name": "Alice", "c1": 50, "c2": 30 })).await;
    submit_ok(&client, json!({ "name": "Bob", "c1": 40 })).await;
    submit_ok(&client, json!({ "name": "Carol", "c1": 60, "c2": 20 })).await;
    submit_ok(&client, json!({ "name": "Dave", "c1": 45 })).await;

    let scores = get_scores(&client, "/scores").await;
    assert_eq!(keys(&scores), ["bob", "dave", "alice", "carol"]);

    let scores = get_scores(&client, "/scores?course=c1&dir=desc").await;
    assert_eq!(keys(&scores), ["carol", "alice", "dave", "bob"]);

    // Missing times count as infinitely slow
    let scores = get_scores(&client, "/scores?course=c2").await;
    assert_eq!(keys(&scores), ["carol", "alice", "bob", "dave"]);

    let scores = get_scores(&client, "/scores?course=c2&dir=desc").await;
    assert_eq!(keys(&scores), ["bob", "dave", "alice", "carol"]);

    // Unknown values fall back to c1 ascending
    let scores = get_scores(&client, "/scores?course=c9&dir=sideways").await;
    assert_eq!(keys(&scores), ["bob", "dave", "alice", "carol"]);
}

#[rocket::async_test]
async fn saved_record_matches_listing() {
    let (client, _) = spawn_client().await;

    submit_ok(&client, json!({ "name": "Alice", "c1": 55, "c5": 101.25 })).await;
    let saved = submit_ok(&client, json!({ "name": "ALICE", "device": "mobile", "c5": 99 })).await;

    let scores = get_scores(&client, "/scores").await;
    assert_eq!(scores, vec![saved]);
}

#[rocket::async_test]
async fn best_times_never_increase() {
    let (client, _) = spawn_client().await;

    let mut best = f64::INFINITY;
    for time in [80.0, 75.5, 90.0, 75.5, 61.0, 62.0] {
        let saved = submit_ok(&client, json!({ "name": "Racer", "c2": time })).await;
        let stored = saved.times.c2.unwrap();
        assert!(stored <= best);
        best = stored;
    }
    assert_eq!(best, 61.0);
}

#[rocket::async_test]
async fn cross_origin_requests_follow_the_allow_list() {
    let (client, tree) = spawn_client().await;

    // Allowed origin gets CORS headers
    let response = client
        .get("/scores")
        .header(Header::new("Origin", TEST_ORIGIN))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some(TEST_ORIGIN)
    );

    // Preflight
    let response = client
        .options("/scores/submit")
        .header(Header::new("Origin", TEST_ORIGIN))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Headers"),
        Some("Content-Type, x-api-key")
    );

    // Other origins are turned away before anything is written
    let response = client
        .post("/scores/submit")
        .header(Header::new("Origin", "https://evil.example.com"))
        .header(Header::new("x-api-key", TEST_API_KEY))
        .json(&json!({ "name": "Mallory", "c1": 1 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    assert!(response
        .headers()
        .get_one("Access-Control-Allow-Origin")
        .is_none());
    assert_eq!(tree.write_count(), 0);
}

#[rocket::async_test]
async fn unreadable_collection_is_a_generic_server_error() {
    let (client, _) = spawn_client_with(MemoryTree::with_contents(json!({ "scores": "oops" }))).await;

    let response = client.get("/scores").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);

    let body = deserialize_response::<Value>(response).await.unwrap();
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[rocket::async_test]
async fn unreadable_record_fails_the_submission() {
    let (client, tree) =
        spawn_client_with(MemoryTree::with_contents(json!({ "scores": { "alice": 12 } }))).await;

    let response = submit(&client, &json!({ "name": "Alice", "c1": 40 }), Some(TEST_API_KEY)).await;
    assert_eq!(response.status(), Status::InternalServerError);

    let body = deserialize_response::<Value>(response).await.unwrap();
    assert_eq!(body, json!({ "error": "Internal server error" }));
    assert_eq!(tree.write_count(), 0);
}

#[rocket::async_test]
async fn preflight_from_other_origins_is_forbidden() {
    let (client, _) = spawn_client().await;

    let response = client
        .options("/scores/submit")
        .header(Header::new("Origin", "https://evil.example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    assert!(response
        .headers()
        .get_one("Access-Control-Allow-Origin")
        .is_none());

    let body = deserialize_response::<ErrorBody>(response).await.unwrap();
    assert_eq!(body.error, "Forbidden");
}
