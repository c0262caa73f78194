//! Tests for the reqwest-backed provider clients against a wiremock
//! server.

#![cfg(feature = "http")]

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use heimdall::providers::{
    EmbeddingProvider, GenerationProvider, HttpEmbeddingClient, HttpGenerationClient,
    HttpRetrievalClient, RetrievalProvider,
};
use heimdall::types::Embedding;
use heimdall::{HeimdallError, UpstreamService};

#[tokio::test]
async fn embed_posts_text_and_parses_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_partial_json(json!({"text": "what is grace?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vector": [0.25, -0.5, 1.0]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpEmbeddingClient::new(server.uri());
    let embedding = client.embed("what is grace?").await.unwrap();
    assert_eq!(embedding.values, vec![0.25, -0.5, 1.0]);
    assert_eq!(embedding.dimensions, 3);
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vector": [1.0]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpEmbeddingClient::new(server.uri()).with_api_key("sk-test");
    assert!(client.embed("hello").await.is_ok());
}

#[tokio::test]
async fn server_error_maps_to_upstream_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = HttpEmbeddingClient::new(server.uri());
    let err = client.embed("hello").await.unwrap_err();
    assert!(matches!(
        err,
        HeimdallError::UpstreamUnavailable {
            service: UpstreamService::Embedding,
            ..
        }
    ));
}

#[tokio::test]
async fn search_and_chunk_fetch_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"user_id": "alice", "top_k": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {"chunk_id": "c1", "score": 0.91},
                {"chunk_id": "c2", "score": 0.84}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chunks"))
        .and(body_partial_json(json!({"chunk_ids": ["c1", "c2"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chunks": [
                {"id": "c1", "text": "first body", "source": "notes.md"},
                {"id": "c2", "text": "second body"}
            ]
        })))
        .mount(&server)
        .await;

    let client = HttpRetrievalClient::new(server.uri());
    let vector = Embedding::new(vec![0.1, 0.2]);

    let matches = client.search("alice", &vector, 2).await.unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].chunk_id, "c1");

    let ids: Vec<String> = matches.iter().map(|m| m.chunk_id.clone()).collect();
    let chunks = client.fetch_chunks("alice", &ids).await.unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "first body");
    assert_eq!(chunks[0].source.as_deref(), Some("notes.md"));
    assert!(chunks[1].source.is_none());
}

#[tokio::test]
async fn generate_parses_text_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({"max_tokens": 512})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Grace is unmerited favor.",
            "usage": {"prompt_tokens": 420, "completion_tokens": 12, "total_tokens": 432}
        })))
        .mount(&server)
        .await;

    let client = HttpGenerationClient::new(server.uri());
    let output = client.generate("What is grace?", 512).await.unwrap();
    assert_eq!(output.text, "Grace is unmerited favor.");
    assert_eq!(output.usage.prompt_tokens, 420);
    assert_eq!(output.usage.completion_tokens, 12);
}

#[tokio::test]
async fn generation_error_names_the_generation_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpGenerationClient::new(server.uri());
    let err = client.generate("prompt", 64).await.unwrap_err();
    assert!(matches!(
        err,
        HeimdallError::UpstreamUnavailable {
            service: UpstreamService::Generation,
            ..
        }
    ));
}

#[tokio::test]
async fn malformed_body_maps_to_upstream_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = HttpEmbeddingClient::new(server.uri());
    assert!(matches!(
        client.embed("hello").await.unwrap_err(),
        HeimdallError::UpstreamUnavailable { .. }
    ));
}
