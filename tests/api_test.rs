//! HTTP tests for the backend client and loaders against a mock server

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use simview::services::{Halt, SimulationService};
use simview::types::{Identifier, Shape};
use simview::{BackendClient, Config, Endpoints};
use std::sync::Arc;

fn config(server: &ServerGuard, token: Option<&str>) -> Config {
    Config {
        api_base: format!("{}/api/v1", server.url()),
        api_token: token.map(str::to_string),
        poll_interval_ms: 1_000,
        request_timeout_ms: 5_000,
        max_pages: 20,
        log_capacity: 100,
        endpoints: Endpoints {
            results: "simulations/{run_id}/results/?format=json".to_string(),
            ..Endpoints::default()
        },
    }
}

fn service(server: &ServerGuard) -> SimulationService<BackendClient> {
    let config = config(server, Some("secret"));
    let client = BackendClient::new(&config).unwrap();
    SimulationService::new(Arc::new(client), &config)
}

fn day(date: &str, profit: f64) -> serde_json::Value {
    json!({"date": date, "performance_metrics": {"daily_profit": profit}})
}

fn bot_query() -> Matcher {
    Matcher::Exact("bot_config_id=3".to_string())
}

fn page_query(page: u32) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("bot_config_id".to_string(), "3".to_string()),
        Matcher::UrlEncoded("page".to_string(), page.to_string()),
    ])
}

const DAILY_PATH: &str = "/api/v1/simulations/1/daily-results/";
const TICKS_PATH: &str = "/api/v1/simulations/1/ticks/";

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_follows_next_links_in_order() {
    let mut server = Server::new_async().await;
    let next = format!("{}/api/v1/simulations/1/daily-results/?bot_config_id=3&page=2", server.url());

    let first = server
        .mock("GET", DAILY_PATH)
        .match_query(bot_query())
        .with_header("content-type", "application/json")
        .with_body(json!({"results": [day("2024-01-02", 1.0), day("2024-01-03", 2.0)], "next": next}).to_string())
        .create_async()
        .await;
    let second = server
        .mock("GET", DAILY_PATH)
        .match_query(page_query(2))
        .with_header("content-type", "application/json")
        .with_body(json!({"results": [day("2024-01-04", 3.0)], "next": null}).to_string())
        .create_async()
        .await;

    let days = service(&server)
        .daily_results(&Identifier::Int(1), &Identifier::Int(3))
        .await;

    first.assert_async().await;
    second.assert_async().await;
    let dates: Vec<String> = days.items.iter().map(|d| d.date.to_string()).collect();
    assert_eq!(dates, vec!["2024-01-02", "2024-01-03", "2024-01-04"]);
    assert_eq!(days.pages, 2);
    assert_eq!(days.shape, Some(Shape::Paginated));
    assert!(days.is_complete());
}

#[tokio::test]
async fn test_next_link_with_other_version_and_host_is_rewritten() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", DAILY_PATH)
        .match_query(bot_query())
        .with_body(
            json!({
                "results": [day("2024-01-02", 1.0)],
                "next": "http://internal-lb:9999/api/v2/simulations/1/daily-results/?bot_config_id=3&page=2"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("GET", DAILY_PATH)
        .match_query(page_query(2))
        .match_header("authorization", "Bearer secret")
        .with_body(json!({"results": [day("2024-01-03", 1.0)], "next": ""}).to_string())
        .create_async()
        .await;

    let days = service(&server)
        .daily_results(&Identifier::Int(1), &Identifier::Int(3))
        .await;

    second.assert_async().await;
    assert_eq!(days.len(), 2);
    assert!(days.is_complete());
}

#[tokio::test]
async fn test_unauthorized_page_halts_walk() {
    let mut server = Server::new_async().await;
    let url = server.url();

    server
        .mock("GET", DAILY_PATH)
        .match_query(bot_query())
        .with_body(
            json!({
                "results": [day("2024-01-02", 1.0)],
                "next": format!("{}/api/v1/simulations/1/daily-results/?bot_config_id=3&page=2", url)
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", DAILY_PATH)
        .match_query(page_query(2))
        .with_status(401)
        .with_body(json!({"detail": "expired"}).to_string())
        .create_async()
        .await;
    let third = server
        .mock("GET", DAILY_PATH)
        .match_query(page_query(3))
        .with_body(json!({"results": [], "next": null}).to_string())
        .expect(0)
        .create_async()
        .await;

    let days = service(&server)
        .daily_results(&Identifier::Int(1), &Identifier::Int(3))
        .await;

    third.assert_async().await;
    assert_eq!(days.len(), 1);
    assert_eq!(days.halt, Some(Halt::Unauthorized { page: 2, status: 401 }));
}

#[tokio::test]
async fn test_server_error_keeps_partial_results() {
    let mut server = Server::new_async().await;
    let url = server.url();

    server
        .mock("GET", DAILY_PATH)
        .match_query(bot_query())
        .with_body(
            json!({
                "results": [day("2024-01-02", 1.0)],
                "next": format!("{}/api/v1/simulations/1/daily-results/?bot_config_id=3&page=2", url)
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", DAILY_PATH)
        .match_query(page_query(2))
        .with_status(503)
        .create_async()
        .await;

    let days = service(&server)
        .daily_results(&Identifier::Int(1), &Identifier::Int(3))
        .await;

    assert_eq!(days.len(), 1);
    assert!(matches!(days.halt, Some(Halt::Failed { page: 2, .. })));
    assert!(days.notice("daily results").is_some());
}

#[tokio::test]
async fn test_self_referencing_next_stops() {
    let mut server = Server::new_async().await;
    let url = server.url();

    let page = server
        .mock("GET", DAILY_PATH)
        .match_query(bot_query())
        .with_body(
            json!({
                "results": [day("2024-01-02", 1.0)],
                "next": format!("{}/api/v1/simulations/1/daily-results/?bot_config_id=3", url)
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let days = service(&server)
        .daily_results(&Identifier::Int(1), &Identifier::Int(3))
        .await;

    page.assert_async().await;
    assert_eq!(days.len(), 1);
    assert!(matches!(days.halt, Some(Halt::Cycle { page: 2, .. })));
}

#[tokio::test]
async fn test_repeated_fetch_is_identical() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", DAILY_PATH)
        .match_query(bot_query())
        .with_body(json!([day("2024-01-03", 2.0), day("2024-01-02", 1.0)]).to_string())
        .expect(2)
        .create_async()
        .await;

    let svc = service(&server);
    let first = svc.daily_results(&Identifier::Int(1), &Identifier::Int(3)).await;
    let second = svc.daily_results(&Identifier::Int(1), &Identifier::Int(3)).await;

    mock.assert_async().await;
    assert_eq!(first, second);
    assert_eq!(first.shape, Some(Shape::Bare));
}

// =============================================================================
// Envelope shapes
// =============================================================================

#[tokio::test]
async fn test_wrapped_envelopes() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", DAILY_PATH)
        .match_query(bot_query())
        .with_body(json!({"data": [day("2024-01-02", 1.0)]}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", TICKS_PATH)
        .match_query(bot_query())
        .with_body(
            json!({"ticks": [
                {"id": 1, "date": "2024-01-02", "timestamp": "2024-01-02T09:30:00Z", "trade_executed": true},
                {"id": 2, "date": "2024-01-02", "timestamp": "2024-01-02T09:31:00Z", "trade_executed": false}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let load = service(&server)
        .replay(&Identifier::Int(1), &Identifier::Int(3))
        .await;

    assert!(load.notices.is_empty());
    let days: Vec<_> = load.replay.days().collect();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].tick_count(), 2);
    assert_eq!(days[0].trades_executed(), 1);
}

#[tokio::test]
async fn test_unrecognized_body_is_empty_with_notice() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", DAILY_PATH)
        .match_query(bot_query())
        .with_body(json!({"detail": "not ready"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", TICKS_PATH)
        .match_query(bot_query())
        .with_body("[]")
        .create_async()
        .await;

    let load = service(&server)
        .replay(&Identifier::Int(1), &Identifier::Int(3))
        .await;

    assert_eq!(load.replay.day_count(), 0);
    assert_eq!(load.notices.len(), 1);
}

// =============================================================================
// Run and results
// =============================================================================

#[tokio::test]
async fn test_snapshot_sends_bearer_token() {
    let mut server = Server::new_async().await;

    let run = server
        .mock("GET", "/api/v1/simulations/1/")
        .match_header("authorization", "Bearer secret")
        .with_body(
            json!({
                "id": 1,
                "name": "grid",
                "status": "running",
                "progress": 42.5,
                "total_bots": 10,
                "completed_bots": "4"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let results = server
        .mock("GET", "/api/v1/simulations/1/results/")
        .match_query(Matcher::Exact("format=json".to_string()))
        .match_header("authorization", "Bearer secret")
        .with_body(
            json!({"results": [
                {"id": 11, "bot_config": {"id": 3, "bot_index": 0}, "total_profit": "120.5"},
                {"id": 12, "bot_config": {"id": 4, "bot_index": 1}, "total_profit": null}
            ], "next": null})
            .to_string(),
        )
        .create_async()
        .await;

    let snapshot = service(&server).snapshot(&Identifier::Int(1)).await;

    run.assert_async().await;
    results.assert_async().await;
    let run = snapshot.run.unwrap();
    assert_eq!(run.bot_counts(), (4, 10));
    assert!(!run.is_terminal());
    assert_eq!(snapshot.results.len(), 2);
    assert_eq!(snapshot.results.items[0].bot_config_id(), Some(&Identifier::Int(3)));
}

#[tokio::test]
async fn test_no_token_sends_no_header() {
    let mut server = Server::new_async().await;

    let run = server
        .mock("GET", "/api/v1/simulations/1/")
        .match_header("authorization", Matcher::Missing)
        .with_body(json!({"id": 1, "status": "completed"}).to_string())
        .create_async()
        .await;

    let config = config(&server, None);
    let client = BackendClient::new(&config).unwrap();
    let svc = SimulationService::new(Arc::new(client), &config);

    let fetched = svc.run(&Identifier::Int(1)).await.unwrap();
    run.assert_async().await;
    assert!(fetched.is_terminal());
}

#[tokio::test]
async fn test_forbidden_run_is_an_error() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/api/v1/simulations/1/")
        .with_status(403)
        .create_async()
        .await;

    let err = service(&server).run(&Identifier::Int(1)).await.unwrap_err();
    assert!(matches!(
        err,
        simview::AppError::Fetch(simview::FetchError::Unauthorized(403))
    ));
}
