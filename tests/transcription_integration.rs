//! Integration tests for the transcription client.
//!
//! A local wiremock server stands in for the remote Whisper endpoint, so
//! these run without credentials or network access.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use murmur::transcription::{GroqClient, Transcriber, TranscriptionError};

const TRANSCRIPTION_PATH: &str = "/openai/v1/audio/transcriptions";

fn client_for(server: &MockServer) -> GroqClient {
    GroqClient::with_endpoint(format!("{}{}", server.uri(), TRANSCRIPTION_PATH))
}

#[tokio::test]
async fn successful_response_yields_the_text_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTION_PATH))
        .and(header("Authorization", "Bearer gsk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "the quick brown fox",
            // Extra metadata must be ignored.
            "x_groq": { "id": "req_123" },
            "segments": [{ "no_speech_prob": 0.01 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = client
        .transcribe(
            b"fake-wav-bytes".to_vec(),
            "en",
            "whisper-large-v3-turbo",
            "gsk_test",
        )
        .await
        .unwrap();

    assert_eq!(text, "the quick brown fox");
}

#[tokio::test]
async fn request_is_multipart_with_the_fixed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTION_PATH))
        .and(body_string_contains("name=\"model\""))
        .and(body_string_contains("whisper-large-v3-turbo"))
        .and(body_string_contains("name=\"temperature\""))
        .and(body_string_contains("name=\"response_format\""))
        .and(body_string_contains("json"))
        .and(body_string_contains("name=\"language\""))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("fake-wav-bytes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "ok" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = client
        .transcribe(
            b"fake-wav-bytes".to_vec(),
            "en",
            "whisper-large-v3-turbo",
            "gsk_test",
        )
        .await
        .unwrap();

    assert_eq!(text, "ok");
}

#[tokio::test]
async fn service_error_with_json_body_is_surfaced_with_its_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTION_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "Invalid API Key" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .transcribe(b"bytes".to_vec(), "en", "whisper-large-v3-turbo", "gsk_bad")
        .await
        .unwrap_err();

    match err {
        TranscriptionError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API Key");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn service_error_with_plain_body_keeps_the_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTION_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .transcribe(b"bytes".to_vec(), "en", "whisper-large-v3-turbo", "gsk_x")
        .await
        .unwrap_err();

    match err {
        TranscriptionError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream overloaded");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn unparseable_success_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .transcribe(b"bytes".to_vec(), "en", "whisper-large-v3-turbo", "gsk_x")
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptionError::Parse(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    // Nothing listens on this port.
    let client = GroqClient::with_endpoint("http://127.0.0.1:9/transcriptions");
    let err = client
        .transcribe(b"bytes".to_vec(), "en", "whisper-large-v3-turbo", "gsk_x")
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptionError::Transport(_)));
}

#[tokio::test]
async fn empty_text_in_response_is_a_valid_transcription() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTION_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = client
        .transcribe(b"silence".to_vec(), "en", "whisper-large-v3-turbo", "gsk_x")
        .await
        .unwrap();

    assert_eq!(text, "");
}
