//! Round trips against the real Perplexity API.
//!
//! Needs `PPLX_API_KEY` in the environment or a `.env` file. Run with
//! `cargo test -p pplx --test client_live -- --ignored --nocapture`.

use pplx::{AskOptions, ClientConfig, Perplexity, RequestConfig};
use std::time::Duration;

const MODEL: &str = "sonar";
const ROLE: &str = "You are a helpful assistant.";
const TIMEOUT: Duration = Duration::from_secs(120);

fn api_key() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var("PPLX_API_KEY").ok().filter(|key| !key.is_empty())
}

fn make_client() -> Option<Perplexity> {
    let Some(key) = api_key() else {
        eprintln!("PPLX_API_KEY not set, skipping");
        return None;
    };
    let config = ClientConfig::new(key, MODEL, ROLE).with_timeout(TIMEOUT);
    Some(Perplexity::from_config(config).expect("client creation"))
}

#[test]
#[ignore]
fn test_initialization() {
    let Some(client) = make_client() else { return };
    assert_eq!(client.model(), MODEL);
    assert_eq!(client.system_role(), ROLE);
    assert_eq!(client.history().len(), 1);
    assert_eq!(client.config(), RequestConfig::defaults());
}

#[tokio::test]
#[ignore]
async fn test_live_ask() {
    let Some(mut client) = make_client() else { return };

    let completion = client
        .ask("What is Rust?", AskOptions::new())
        .await
        .expect("ask failed");

    let answer = completion.llm_response.expect("answer must exist");
    assert!(!answer.is_empty(), "answer must not be empty");
    assert_eq!(client.history().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_append_ask() {
    let Some(mut client) = make_client() else { return };

    let completion = client
        .ask("What is Rust?", AskOptions::new().append_history())
        .await
        .expect("ask failed");

    assert!(completion.llm_response.as_deref().is_some_and(|a| !a.is_empty()));
    assert_eq!(client.history().len(), 3);
}

#[tokio::test]
#[ignore]
async fn test_live_chat() {
    let Some(mut client) = make_client() else { return };

    let completion = client.chat("What is Rust?").await.expect("chat failed");
    assert!(completion.llm_response.as_deref().is_some_and(|a| !a.is_empty()));

    let parsed = completion.parsed().expect("typed completion");
    assert!(!parsed.choices.is_empty(), "choices must not be empty");
    assert_eq!(client.history().len(), 3);
}

#[tokio::test]
#[ignore]
async fn test_live_stream_is_assembled() {
    let Some(mut client) = make_client() else { return };
    client.set("stream", true).unwrap();

    let completion = client.chat("Say hello.").await.expect("chat failed");
    assert!(completion.llm_response.as_deref().is_some_and(|a| !a.is_empty()));
}
