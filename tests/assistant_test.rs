// Farming assistant against a mocked generative-language endpoint

mod common;

use common::*;
use farm_weather_service::assistant::{
    AssistantClient, AssistantError, ChatMessage, FALLBACK_REPLY,
};
use farm_weather_service::fetch_error::FetchError;
use mockito::{Matcher, Server};

const MODEL: &str = "gemini-2.0-flash";
const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn assistant(base_url: &str) -> AssistantClient {
    AssistantClient::new(base_url, MODEL, TEST_API_KEY, fast_policy()).unwrap()
}

fn message(role: &str, content: &str) -> ChatMessage {
    ChatMessage {
        role: role.to_string(),
        content: content.to_string(),
    }
}

fn reply_body(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_reply_sends_only_latest_message() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::UrlEncoded("key".into(), TEST_API_KEY.into()))
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("farming assistant".into()),
            Matcher::Regex(r#"User query: When should I irrigate wheat\?""#.into()),
        ]))
        .with_status(200)
        .with_body(reply_body("Irrigate at crown root initiation."))
        .create_async()
        .await;

    let messages = [
        message("user", "Is it going to rain?"),
        message("assistant", "Light showers are likely."),
        message("user", "When should I irrigate wheat?"),
    ];
    let text = assistant(&server.url()).reply(&messages).await.unwrap();
    assert_eq!(text, "Irrigate at crown root initiation.");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_earlier_messages_are_not_forwarded() {
    let mut server = Server::new_async().await;

    // Would match only if the first turn leaked into the request body.
    let leaked = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("Is it going to rain".into()))
        .expect(0)
        .create_async()
        .await;
    let ok = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(reply_body("Yes."))
        .create_async()
        .await;

    let messages = [
        message("user", "Is it going to rain?"),
        message("user", "Should I spray today?"),
    ];
    assert_eq!(assistant(&server.url()).reply(&messages).await.unwrap(), "Yes.");

    leaked.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_empty_text_uses_fallback_reply() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(reply_body("   "))
        .create_async()
        .await;

    let text = assistant(&server.url())
        .reply(&[message("user", "Hello")])
        .await
        .unwrap();
    assert_eq!(text, FALLBACK_REPLY);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_conversation_is_rejected_without_request() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = assistant(&server.url()).reply(&[]).await.unwrap_err();
    assert!(matches!(err, AssistantError::EmptyConversation));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_upstream_failure_is_reported() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error": {"code": 403, "message": "API key not valid"}}"#)
        .create_async()
        .await;

    let err = assistant(&server.url())
        .reply(&[message("user", "Hello")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssistantError::Fetch(FetchError::Upstream { .. })
    ));
    assert_eq!(err.to_string(), "assistant fetch failed");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_candidates_is_schema_error() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"candidates": []}"#)
        .create_async()
        .await;

    let err = assistant(&server.url())
        .reply(&[message("user", "Hello")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssistantError::Fetch(FetchError::Schema { .. })
    ));

    mock.assert_async().await;
}
