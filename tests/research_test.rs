//! Integration tests for the search client against a mocked search API.

use std::time::Duration;

use blog_writer::research::{ResearchClient, ResearchOptions};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_options() -> ResearchOptions {
    ResearchOptions {
        max_retries: 2,
        request_delay: Duration::ZERO,
        retry_base: Duration::from_millis(10),
        retry_max: Duration::from_millis(20),
        timeout: Duration::from_secs(2),
        ..ResearchOptions::default()
    }
}

fn client_for(server: &MockServer, options: ResearchOptions) -> ResearchClient {
    ResearchClient::new("test-key", format!("{}/res/v1/web/search", server.uri()), options)
        .expect("Failed to build client")
}

fn results_body() -> serde_json::Value {
    json!({
        "web": {
            "results": [
                { "title": "Solar power hits record highs", "url": "https://a.example/1", "description": "Record output", "age": "1 day ago" },
                { "title": "solar power hits record highs", "url": "https://b.example/2", "description": "Syndicated copy" },
                { "title": "Wind farms expand offshore", "url": "https://c.example/3", "description": "Offshore growth" },
                { "title": "Grid storage explained", "url": "https://d.example/4", "description": "Batteries" }
            ]
        }
    })
}

#[tokio::test]
async fn test_search_sends_expected_request_and_dedupes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/res/v1/web/search"))
        .and(header("X-Subscription-Token", "test-key"))
        .and(query_param("q", "renewable energy"))
        .and(query_param("count", "3"))
        .and(query_param("country", "US"))
        .and(query_param("search_lang", "en"))
        .and(query_param("safesearch", "moderate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, fast_options());
    let articles = client.search("renewable energy", 3).await;

    assert_eq!(articles.len(), 3);
    assert_eq!(articles[0].url, "https://a.example/1");
    assert_eq!(articles[0].snippet, "Record output");
    assert_eq!(articles[1].url, "https://c.example/3");
    assert_eq!(articles[2].url, "https://d.example/4");
}

#[tokio::test]
async fn test_result_is_truncated_after_dedup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results_body()))
        .mount(&server)
        .await;

    let client = client_for(&server, fast_options());
    let articles = client.search("energy", 2).await;
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[1].url, "https://c.example/3");
}

#[tokio::test]
async fn test_client_error_yields_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, fast_options());
    assert!(client.search("anything", 5).await.is_empty());
}

#[tokio::test]
async fn test_server_errors_are_retried_then_give_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, fast_options());
    assert!(client.search("anything", 5).await.is_empty());
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, fast_options());
    let articles = client.search("renewable energy", 5).await;
    assert_eq!(articles.len(), 3);
}

#[tokio::test]
async fn test_unreachable_endpoint_yields_empty_result() {
    let options = ResearchOptions {
        max_retries: 0,
        ..fast_options()
    };
    let client = ResearchClient::new("test-key", "http://127.0.0.1:9/search", options).unwrap();
    assert!(client.search("anything", 5).await.is_empty());
}

#[tokio::test]
async fn test_malformed_body_yields_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server, fast_options());
    assert!(client.search("anything", 5).await.is_empty());
}
