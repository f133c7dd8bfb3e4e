//! HTTP-level tests for reading and replacing the config document.

use anyhow::Result;
use axum::http::{Method, StatusCode};
use http_body_util::BodyExt;

use crate::utils::{harness, request, BackendMode, ALLOWED_PEER, TOKEN, VALID_DOC};

fn post(doc: &str, content_type: Option<&str>) -> axum::http::Request<axum::body::Body> {
    request(Method::POST, "/config", Some(TOKEN), content_type, doc)
}

#[tokio::test]
async fn test_put_then_get_round_trips_bytes() -> Result<()> {
    let h = harness(None, BackendMode::Accept, ALLOWED_PEER);
    h.write_config(r#"{"inbounds":[],"outbounds":[]}"#);

    // Formatting is preserved exactly, not re-serialized.
    let doc = "{\n  \"outbounds\": [ {\"protocol\": \"freedom\"} ],\n  \"inbounds\": []\n}\n";
    let (status, body) = h.send(post(doc, Some("application/json"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_empty());

    let response = tower::ServiceExt::oneshot(
        h.app.clone(),
        request(Method::GET, "/config", Some(TOKEN), None, ""),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body = response.into_body().collect().await?.to_bytes();
    assert_eq!(body, doc.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_post_same_document_twice() -> Result<()> {
    let h = harness(None, BackendMode::Accept, ALLOWED_PEER);

    for _ in 0..2 {
        let (status, _) = h.send(post(VALID_DOC, Some("application/json"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(h.read_config().unwrap(), VALID_DOC.as_bytes());
    }
    Ok(())
}

#[tokio::test]
async fn test_text_plain_is_rejected_and_storage_unchanged() -> Result<()> {
    let h = harness(None, BackendMode::Accept, ALLOWED_PEER);
    h.write_config(VALID_DOC);

    let replacement = r#"{"inbounds":[],"outbounds":[]}"#;
    let (status, body) = h.send(post(replacement, Some("text/plain"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Content-Type must be application/json");
    assert_eq!(h.read_config().unwrap(), VALID_DOC.as_bytes());

    let (status, _) = h.send(post(replacement, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.read_config().unwrap(), VALID_DOC.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_non_object_documents_are_malformed() -> Result<()> {
    let h = harness(None, BackendMode::Accept, ALLOWED_PEER);
    h.write_config(VALID_DOC);

    for doc in [r#"[{"inbounds":[]}]"#, r#""inbounds""#, "3.14", "{not json"] {
        let (status, body) = h.send(post(doc, Some("application/json"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{doc}");
        assert_eq!(body, b"Invalid JSON format", "{doc}");
    }
    assert_eq!(h.read_config().unwrap(), VALID_DOC.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_missing_outbounds_is_cited() -> Result<()> {
    let h = harness(None, BackendMode::Accept, ALLOWED_PEER);
    h.write_config(VALID_DOC);

    let (status, body) = h
        .send(post(r#"{"inbounds":[]}"#, Some("application/json")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Missing 'outbounds' in config");

    let (status, body) = h
        .send(post(r#"{"outbounds":[]}"#, Some("application/json")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Missing 'inbounds' in config");

    assert_eq!(h.read_config().unwrap(), VALID_DOC.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_unreadable_config_is_500_without_detail() -> Result<()> {
    let h = harness(None, BackendMode::Accept, ALLOWED_PEER);

    let (status, body) = h
        .send(request(Method::GET, "/config", Some(TOKEN), None, ""))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Failed to read config");
    Ok(())
}

#[tokio::test]
async fn test_post_creates_missing_document() -> Result<()> {
    let h = harness(None, BackendMode::Accept, ALLOWED_PEER);
    assert!(h.read_config().is_none());

    let (status, _) = h.send(post(VALID_DOC, Some("application/json"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(h.read_config().unwrap(), VALID_DOC.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_large_document_is_accepted() -> Result<()> {
    let h = harness(None, BackendMode::Accept, ALLOWED_PEER);

    let clients: Vec<String> = (0..30_000)
        .map(|i| {
            format!(
                r#"{{"id":"{i:08x}-7e62-4138-9fd3-098a63964b6b","email":"user{i}@example.com","flow":"xtls-rprx-vision"}}"#
            )
        })
        .collect();
    let doc = format!(
        r#"{{"inbounds":[{{"tag":"vless-in","protocol":"vless","settings":{{"clients":[{}]}}}}],"outbounds":[{{"protocol":"freedom"}}]}}"#,
        clients.join(",")
    );
    assert!(doc.len() > 2 * 1024 * 1024);

    let (status, _) = h.send(post(&doc, Some("application/json"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(h.read_config().unwrap(), doc.as_bytes());
    Ok(())
}
