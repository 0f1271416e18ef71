//! Integration tests for the stock photo client against mocked Pexels and Unsplash APIs.

use blog_writer::config::ImageProviderKind;
use blog_writer::images::ImageClient;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pexels_photo(id: u64) -> Value {
    json!({
        "id": id,
        "width": 1600,
        "height": 900,
        "url": format!("https://www.pexels.com/photo/{id}/"),
        "photographer": format!("Photographer {id}"),
        "photographer_url": format!("https://www.pexels.com/@p{id}"),
        "alt": format!("Photo {id}"),
        "src": {
            "large": format!("https://images.pexels.com/{id}-large.jpg"),
            "medium": format!("https://images.pexels.com/{id}-medium.jpg")
        }
    })
}

fn pexels_page(ids: &[u64]) -> Value {
    json!({ "photos": ids.iter().map(|id| pexels_photo(*id)).collect::<Vec<_>>() })
}

fn pexels_client(server: &MockServer) -> ImageClient {
    ImageClient::new(ImageProviderKind::Pexels, "pexels-key", format!("{}/v1", server.uri()))
        .expect("Failed to build client")
}

async fn mount_pexels_query(server: &MockServer, query: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("query", query))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

fn keywords(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_keywords_top_up_a_short_topic_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("query", "wind power"))
        .and(query_param("per_page", "3"))
        .and(query_param("orientation", "landscape"))
        .and(header("authorization", "pexels-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pexels_page(&[1])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("query", "turbines"))
        .and(query_param("per_page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pexels_page(&[1, 2])))
        .expect(1)
        .mount(&server)
        .await;
    mount_pexels_query(&server, "offshore farm", ResponseTemplate::new(500), 1).await;
    mount_pexels_query(&server, "Wind Power", ResponseTemplate::new(200), 0).await;
    mount_pexels_query(&server, "coastline", ResponseTemplate::new(200), 0).await;

    let client = pexels_client(&server);
    let images = client
        .fetch_images(
            "wind power",
            &keywords(&["Wind Power", "turbines", "offshore farm", "coastline"]),
            3,
        )
        .await;

    let ids: Vec<&str> = images.iter().map(|i| i.provider_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(images[0].search_query.as_deref(), Some("wind power"));
    assert_eq!(images[1].search_query.as_deref(), Some("turbines"));
    assert_eq!(images[1].url, "https://images.pexels.com/2-large.jpg");
    assert_eq!(images[1].provider, "pexels");
}

#[tokio::test]
async fn test_full_topic_result_skips_keyword_queries() {
    let server = MockServer::start().await;
    mount_pexels_query(
        &server,
        "solar",
        ResponseTemplate::new(200).set_body_json(pexels_page(&[1, 2])),
        1,
    )
    .await;
    mount_pexels_query(&server, "panels", ResponseTemplate::new(200), 0).await;

    let images = pexels_client(&server)
        .fetch_images("solar", &keywords(&["panels"]), 2)
        .await;
    assert_eq!(images.len(), 2);
}

#[tokio::test]
async fn test_count_is_capped_at_three() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("per_page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pexels_page(&[1, 2, 3, 4])))
        .expect(1)
        .mount(&server)
        .await;

    let images = pexels_client(&server).fetch_images("solar", &[], 5).await;
    assert_eq!(images.len(), 3);
}

#[tokio::test]
async fn test_provider_errors_yield_no_images() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let images = pexels_client(&server)
        .fetch_images("solar", &keywords(&["panels", "roofs"]), 3)
        .await;
    assert!(images.is_empty());

    let unreachable = ImageClient::new(ImageProviderKind::Pexels, "k", "http://127.0.0.1:9/v1").unwrap();
    assert!(unreachable.fetch_images("solar", &[], 3).await.is_empty());
}

#[tokio::test]
async fn test_unsplash_request_and_parsing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/photos"))
        .and(query_param("query", "mountains"))
        .and(query_param("content_filter", "high"))
        .and(header("authorization", "Client-ID unsplash-key"))
        .and(header("accept-version", "v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": "abc123",
                "width": 4000,
                "height": 3000,
                "alt_description": "snowy peaks",
                "urls": {
                    "regular": "https://images.unsplash.com/abc-regular.jpg",
                    "small": "https://images.unsplash.com/abc-small.jpg"
                },
                "links": { "html": "https://unsplash.com/photos/abc123" },
                "user": {
                    "name": "Alex Doe",
                    "links": { "html": "https://unsplash.com/@alex" }
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ImageClient::new(ImageProviderKind::Unsplash, "unsplash-key", server.uri()).unwrap();
    let images = client.fetch_images("mountains", &[], 1).await;

    assert_eq!(images.len(), 1);
    let image = &images[0];
    assert_eq!(image.provider, "unsplash");
    assert_eq!(image.provider_id, "abc123");
    assert_eq!(image.url, "https://images.unsplash.com/abc-regular.jpg");
    assert_eq!(image.alt_text, "snowy peaks");
    assert_eq!(image.photographer, "Alex Doe");
    assert_eq!(image.source_url, "https://unsplash.com/photos/abc123");
}
