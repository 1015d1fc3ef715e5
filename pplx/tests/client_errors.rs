//! Failure paths of the session: local validation, HTTP error statuses,
//! transport failures and undecodable bodies.
//!
//! Run with `cargo test -p pplx --test client_errors -- --nocapture`.

use mockito::{Mock, Server, ServerGuard};
use pplx::{AskOptions, ClientConfig, FormattedResponse, Perplexity, PerplexityError};
use std::time::Duration;
use tokio::net::TcpListener;

const API_KEY: &str = "test-api-key";
const MODEL: &str = "test-model";
const ROLE: &str = "test-role";

fn make_client(base_url: String) -> Perplexity {
    Perplexity::from_config(ClientConfig::new(API_KEY, MODEL, ROLE).with_base_url(base_url))
        .expect("client creation")
}

/// The mock stays registered only while the returned handle is alive.
async fn failing_server(status: usize, body: &str) -> (ServerGuard, Mock) {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;
    (server, mock)
}

#[test]
fn test_missing_required_params() {
    let err = Perplexity::new("", MODEL, ROLE).unwrap_err();
    assert!(matches!(err, PerplexityError::Auth { status: None, .. }));
    assert_eq!(err.to_string(), "API key is required");

    let err = Perplexity::new(API_KEY, "", ROLE).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.to_string(), "Model name is required");

    let err = Perplexity::new(API_KEY, MODEL, "").unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.to_string(), "System role is required");
}

#[test]
fn test_invalid_base_url() {
    let config = ClientConfig::new(API_KEY, MODEL, ROLE).with_base_url("api.perplexity.ai");
    assert!(Perplexity::from_config(config).unwrap_err().is_config());
}

#[test]
fn test_out_of_range_config() {
    let mut client = Perplexity::new(API_KEY, MODEL, ROLE).unwrap();
    assert!(client.set("temperature", 2.0).unwrap_err().is_config());
    assert!(client.set("top_p", 1.5).unwrap_err().is_config());
    assert!(client.set("invalid_key", "value").unwrap_err().is_config());
    assert!(client.request_config().is_empty());
}

#[tokio::test]
async fn test_unauthorized_error() {
    let (server, _mock) = failing_server(401, r#"{"error": "unauthorized"}"#).await;
    let mut client = make_client(server.url());

    let err = client.ask("test", AskOptions::new()).await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(err.status_code(), Some(401));
}

#[tokio::test]
async fn test_invalid_model_error() {
    let (server, _mock) = failing_server(400, r#"{"error": "invalid model"}"#).await;
    let mut client = make_client(server.url());

    let err = client.ask("test", AskOptions::new()).await.unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("invalid model"));
}

#[tokio::test]
async fn test_rate_limit_error() {
    let (server, _mock) = failing_server(429, r#"{"error": "rate limit exceeded"}"#).await;
    let mut client = make_client(server.url());

    let err = client.ask("test", AskOptions::new()).await.unwrap_err();
    assert!(err.is_api());
    assert_eq!(err.status_code(), Some(429));
}

#[tokio::test]
async fn test_server_error() {
    let (server, _mock) = failing_server(500, r#"{"error": "internal server error"}"#).await;
    let mut client = make_client(server.url());

    let err = client.ask("test", AskOptions::new()).await.unwrap_err();
    assert!(err.is_api());
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_failed_chat_keeps_user_message() {
    let (server, _mock) = failing_server(500, r#"{"error": "internal server error"}"#).await;
    let mut client = make_client(server.url());

    assert!(client.chat("hello").await.is_err());
    assert_eq!(client.history().len(), 2);
}

#[tokio::test]
async fn test_timeout_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let config = ClientConfig::new(API_KEY, MODEL, ROLE)
        .with_base_url(format!("http://{}", addr))
        .with_timeout(Duration::from_millis(200));
    let mut client = Perplexity::from_config(config).unwrap();

    let err = client.ask("test", AskOptions::new()).await.unwrap_err();
    assert!(err.is_api());
    assert_eq!(err.status_code(), None);
    assert!(err.to_string().starts_with("Request failed:"));
}

#[tokio::test]
async fn test_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client = make_client(format!("http://{}", addr));
    let err = client.ask("test", AskOptions::new()).await.unwrap_err();
    assert!(err.is_api());
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn test_invalid_json_response() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body("Invalid JSON")
        .create_async()
        .await;

    let mut client = make_client(server.url());
    let response = client
        .ask_as("test", AskOptions::new().append_history(), "json")
        .await
        .unwrap();

    assert_eq!(response, FormattedResponse::Json(None));
    assert_eq!(client.history().len(), 1);
}

#[tokio::test]
async fn test_chat_invalid_json_keeps_user_message() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body("Invalid JSON")
        .create_async()
        .await;

    let mut client = make_client(server.url());
    let completion = client.chat("test").await.unwrap();

    mock.assert_async().await;
    assert_eq!(completion.llm_response, None);
    assert_eq!(completion.json, None);
    assert_eq!(client.history().len(), 2);
    assert_eq!(client.history()[1].content, "test");
}

#[tokio::test]
async fn test_invalid_response_type() {
    let mut client = Perplexity::new(API_KEY, MODEL, ROLE).unwrap();
    let err = client
        .ask_as("test", AskOptions::new(), "invalid_type")
        .await
        .unwrap_err();
    assert!(matches!(err, PerplexityError::InvalidResponseType(_)));
}

#[tokio::test]
async fn test_invalid_per_call_config() {
    let mut client = Perplexity::new(API_KEY, MODEL, ROLE).unwrap();
    let err = client
        .ask("test", AskOptions::new().with_config("top_k", "many"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid configuration value for key: top_k");
}
