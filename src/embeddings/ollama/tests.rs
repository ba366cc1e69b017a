use super::*;

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    assert_eq!(client.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5)
        .with_backoff(Duration::from_millis(10));

    assert_eq!(client.retry_attempts, 5);
    assert_eq!(client.timeout, Duration::from_secs(60));
    assert_eq!(client.backoff, Duration::from_millis(10));
    assert_eq!(client.model_name(), "nomic-embed-text:latest");
}

#[test]
fn retry_attempts_never_drop_to_zero() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_retry_attempts(0);

    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn embed_request_uses_input_array() {
    let texts = vec!["first".to_string(), "second".to_string()];
    let request = EmbedRequest {
        model: "m",
        input: &texts,
    };

    let json = serde_json::to_string(&request).expect("request should serialize");

    assert_eq!(json, r#"{"model":"m","input":["first","second"]}"#);
}

#[test]
fn client_errors_are_not_retried() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_retry_attempts(3)
        .with_backoff(Duration::ZERO);
    let mut calls = 0;

    let result = client.make_request_with_retry(|| {
        calls += 1;
        Err(ureq::Error::StatusCode(404))
    });

    assert_eq!(calls, 1);
    assert_eq!(
        result,
        Err(EmbeddingFailure::Backend("Client error: HTTP 404".to_string()))
    );
}

#[test]
fn server_errors_are_retried_until_exhausted() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_retry_attempts(3)
        .with_backoff(Duration::ZERO);
    let mut calls = 0;

    let result = client.make_request_with_retry(|| {
        calls += 1;
        Err(ureq::Error::StatusCode(503))
    });

    assert_eq!(calls, 3);
    assert!(matches!(result, Err(EmbeddingFailure::Backend(_))));
}

#[test]
fn retry_recovers_after_transient_failure() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_retry_attempts(3)
        .with_backoff(Duration::ZERO);
    let mut calls = 0;

    let result = client.make_request_with_retry(|| {
        calls += 1;
        if calls == 1 {
            Err(ureq::Error::ConnectionFailed)
        } else {
            Ok("ok".to_string())
        }
    });

    assert_eq!(calls, 2);
    assert_eq!(result, Ok("ok".to_string()));
}
