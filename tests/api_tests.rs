use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use scentinel::api::{create_router, AppState};

const AS_OF: &str = "2026-10-17T12:00:00";

fn create_test_server() -> TestServer {
    let state = AppState::new();
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

async fn create_item(server: &TestServer, name: &str, brand: &str, notes: &[&str]) -> String {
    let response = server
        .post("/items")
        .json(&json!({
            "name": name,
            "brand": brand,
            "notes": notes,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    created["id"].as_str().unwrap().to_string()
}

/// Sauvage worn once 45 days before `AS_OF`, Bleu de Chanel never worn
async fn seed_pair(server: &TestServer) -> (String, String) {
    let sauvage = create_item(server, "Sauvage", "Dior", &["bergamot", "pepper", "ambroxan"]).await;
    let bleu = create_item(
        server,
        "Bleu de Chanel",
        "Chanel",
        &["bergamot", "cedar", "ginger", "sandalwood"],
    )
    .await;

    server
        .post(&format!("/items/{}/wears", sauvage))
        .json(&json!({
            "timestamp": "2026-09-02T12:00:00",
            "occasion": "work",
            "rating": 4.0
        }))
        .await
        .assert_status(StatusCode::CREATED);

    (sauvage, bleu)
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_create_and_list_items() {
    let server = create_test_server();

    let response = server
        .post("/items")
        .json(&json!({
            "name": "Aventus",
            "brand": "Creed",
            "notes": ["pineapple", "birch"],
            "classifications": ["fruity"]
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["name"], "Aventus");
    assert_eq!(created["brand"], "Creed");

    let response = server.get("/items").await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["notes"], json!(["birch", "pineapple"]));
}

#[tokio::test]
async fn test_duplicate_item_conflicts() {
    let server = create_test_server();
    create_item(&server, "Sauvage", "Dior", &[]).await;

    let response = server
        .post("/items")
        .json(&json!({ "name": "sauvage ", "brand": "DIOR" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().starts_with("Conflict"));
}

#[tokio::test]
async fn test_log_wear_validation() {
    let server = create_test_server();
    let id = create_item(&server, "Sauvage", "Dior", &[]).await;

    let response = server
        .post(&format!("/items/{}/wears", id))
        .json(&json!({ "occasion": "date", "rating": 7.0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post(&format!("/items/{}/wears", uuid::Uuid::new_v4()))
        .json(&json!({ "occasion": "date" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_log_wear_derives_season() {
    let server = create_test_server();
    let id = create_item(&server, "Sauvage", "Dior", &[]).await;

    let response = server
        .post(&format!("/items/{}/wears", id))
        .json(&json!({ "timestamp": "2026-01-15T08:30:00", "occasion": "casual" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let record: Value = response.json();
    assert_eq!(record["season"], "winter");
    assert_eq!(record["rating"], Value::Null);
}

#[tokio::test]
async fn test_item_usage_after_wear() {
    let server = create_test_server();
    let (sauvage, bleu) = seed_pair(&server).await;

    let response = server
        .get(&format!("/items/{}/usage", sauvage))
        .add_query_param("as_of", AS_OF)
        .await;
    response.assert_status_ok();
    let usage: Value = response.json();
    assert_eq!(usage["usage"]["total_wears"], 1);
    assert_eq!(usage["usage"]["days_since_last_worn"], 45);
    assert_eq!(usage["usage"]["average_rating"], 4.0);
    assert_eq!(usage["usage"]["seasonal_distribution"]["fall"], 1);
    assert_eq!(usage["bucket"], "neglected");

    let response = server
        .get(&format!("/items/{}/usage", bleu))
        .add_query_param("as_of", AS_OF)
        .await;
    let usage: Value = response.json();
    assert_eq!(usage["usage"]["total_wears"], 0);
    assert_eq!(usage["usage"]["last_worn"], Value::Null);
    assert_eq!(usage["bucket"], "pending");
}

#[tokio::test]
async fn test_usage_overview() {
    let server = create_test_server();
    seed_pair(&server).await;

    let response = server.get("/usage").add_query_param("as_of", AS_OF).await;
    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["snapshots"].as_array().unwrap().len(), 2);
    assert_eq!(report["buckets"]["assignments"].as_array().unwrap().len(), 2);
    assert_eq!(report["buckets"]["stats"]["mean_wears"], 0.5);
}

#[tokio::test]
async fn test_unknown_item_usage_is_not_found() {
    let server = create_test_server();
    let response = server
        .get(&format!("/items/{}/usage", uuid::Uuid::new_v4()))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pair_similarity() {
    let server = create_test_server();
    let (sauvage, bleu) = seed_pair(&server).await;

    let response = server
        .get("/similarity")
        .add_query_param("a", &sauvage)
        .add_query_param("b", &bleu)
        .add_query_param("metric", "jaccard")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let score = body["score"].as_f64().unwrap();
    assert!((score - 1.0 / 6.0).abs() < 1e-9);
    assert_eq!(body["metric"], "jaccard");

    let response = server
        .get("/similarity")
        .add_query_param("a", &sauvage)
        .add_query_param("b", &sauvage)
        .await;
    let body: Value = response.json();
    assert!((body["score"].as_f64().unwrap() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_similar_items() {
    let server = create_test_server();
    let (sauvage, _) = seed_pair(&server).await;
    create_item(&server, "Terre d'Hermes", "Hermes", &["orange", "vetiver"]).await;

    let response = server
        .get(&format!("/items/{}/similar", sauvage))
        .add_query_param("k", 5)
        .await;
    response.assert_status_ok();
    let similar: Vec<Value> = response.json();
    // Terre d'Hermes shares nothing with Sauvage and is dropped
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0]["name"], "Bleu de Chanel");
}

#[tokio::test]
async fn test_unknown_metric_is_rejected() {
    let server = create_test_server();
    let (sauvage, bleu) = seed_pair(&server).await;

    let response = server
        .get("/similarity")
        .add_query_param("a", &sauvage)
        .add_query_param("b", &bleu)
        .add_query_param("metric", "euclidean")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations_empty_collection() {
    let server = create_test_server();
    let response = server.get("/recommendations").await;
    response.assert_status_ok();
    let entries: Vec<Value> = response.json();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_recommendations_are_ranked() {
    let server = create_test_server();
    seed_pair(&server).await;

    let response = server
        .get("/recommendations")
        .add_query_param("as_of", AS_OF)
        .add_query_param("occasion", "work")
        .add_query_param("season", "fall")
        .add_query_param("limit", 10)
        .await;
    response.assert_status_ok();
    let entries: Vec<Value> = response.json();
    assert_eq!(entries.len(), 2);

    let scores: Vec<f64> = entries
        .iter()
        .map(|e| e["score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(entries
        .iter()
        .all(|e| !e["reasons"].as_array().unwrap().is_empty()));

    let response = server
        .get("/recommendations")
        .add_query_param("as_of", AS_OF)
        .add_query_param("limit", 1)
        .await;
    let entries: Vec<Value> = response.json();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_insights() {
    let server = create_test_server();
    seed_pair(&server).await;

    let response = server.get("/insights").add_query_param("as_of", AS_OF).await;
    response.assert_status_ok();
    let insights: Value = response.json();
    assert_eq!(insights["overview"]["total_items"], 2);
    assert_eq!(insights["overview"]["total_wears"], 1);
    assert_eq!(insights["overview"]["never_worn"], 1);
    assert_eq!(insights["top_items"][0]["name"], "Sauvage");
    assert_eq!(insights["brand_stats"][0]["brand"], "Dior");
    assert_eq!(insights["wear_frequency"]["summary"]["total_neglected"], 1);
    assert_eq!(insights["wear_frequency"]["neglected"][0]["name"], "Sauvage");
    assert_eq!(insights["wear_frequency"]["pending"][0]["name"], "Bleu de Chanel");
    assert_eq!(insights["seasonal_deep_dive"]["year"], 2026);
    assert_eq!(insights["seasonal_deep_dive"]["most_active_season"], "fall");
    assert_eq!(
        insights["seasonal_deep_dive"]["seasons"]["fall"]["monthly_breakdown"]["9"],
        1
    );
}

#[tokio::test]
async fn test_update_attributes_changes_similarity() {
    let server = create_test_server();
    let (sauvage, bleu) = seed_pair(&server).await;

    let response = server
        .put(&format!("/items/{}/attributes", bleu))
        .json(&json!({ "notes": ["bergamot", "pepper", "ambroxan"] }))
        .await;
    response.assert_status_ok();

    let response = server
        .get("/similarity")
        .add_query_param("a", &sauvage)
        .add_query_param("b", &bleu)
        .add_query_param("metric", "jaccard")
        .await;
    let body: Value = response.json();
    assert!((body["score"].as_f64().unwrap() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_delete_item() {
    let server = create_test_server();
    let (sauvage, bleu) = seed_pair(&server).await;

    let response = server.delete(&format!("/items/{}", sauvage)).await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server.delete(&format!("/items/{}", bleu)).await;
    response.assert_status(StatusCode::NO_CONTENT);

    let items: Vec<Value> = server.get("/items").await.json();
    assert_eq!(items.len(), 1);
}
