//! Tests for the Couch HTTP writer.

use super::*;
use crate::value::Value;
use crate::views;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> DestinationConfig {
    DestinationConfig {
        url: server.uri(),
        bucket: "staging".to_string(),
        username: None,
        password: None,
    }
}

#[tokio::test]
async fn test_connect_checks_bucket() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/staging"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut writer = CouchWriter::new(config_for(&server));
    writer.connect().await.unwrap();
}

#[tokio::test]
async fn test_connect_fails_on_missing_bucket() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/staging"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut writer = CouchWriter::new(config_for(&server));
    assert!(writer.connect().await.is_err());
}

#[tokio::test]
async fn test_put_document() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/staging/orders:1"))
        .and(body_json(serde_json::json!({"amount": 12, "name": "a"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let writer = CouchWriter::new(config_for(&server));
    let mut doc = Document::new();
    doc.insert("amount".to_string(), Value::Integer(12));
    doc.insert("name".to_string(), Value::Text("a".to_string()));
    writer.put("orders:1", &doc).await.unwrap();
}

#[tokio::test]
async fn test_put_rejected_is_loading_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let writer = CouchWriter::new(config_for(&server));
    let result = writer.put("orders:1", &Document::new()).await;
    assert!(matches!(result, Err(Error::Loading(_))));
}

#[tokio::test]
async fn test_put_view_body_shape() {
    let server = MockServer::start().await;
    let view = views::by_primary_key("orders", "orders", &["id".to_string()]);
    let expected = serde_json::json!({
        "language": "javascript",
        "views": {
            "by_pk": {
                "map": view.map,
                "reduce": "_count",
            }
        }
    });
    Mock::given(method("PUT"))
        .and(path("/staging/_design/orders"))
        .and(body_json(expected))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let writer = CouchWriter::new(config_for(&server));
    writer.put_view(&view).await.unwrap();
}

#[tokio::test]
async fn test_global_view_lands_under_all() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/staging/_design/all"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let writer = CouchWriter::new(config_for(&server));
    writer.put_view(&views::by_type()).await.unwrap();
}
