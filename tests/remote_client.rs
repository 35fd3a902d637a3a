//! Integration tests for `RemoteReranker` against a mock inference server.
//!
//! Covers every recognised response shape, soft and hard failure statuses,
//! timeouts, authentication, batching, partial outages and the score cache.

use std::time::{Duration, Instant};

use evidence_rerank::config::RemoteConfig;
use evidence_rerank::remote::RemoteReranker;
use evidence_rerank::remote::response::NEUTRAL_SCORE;
use evidence_rerank::scoring::ScoringService;
use evidence_rerank::{LexicalScorer, RerankError, ScoreSource};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCORE_PATH: &str = "/models/bge";

fn config(server: &MockServer) -> RemoteConfig {
    RemoteConfig {
        enabled: true,
        endpoint_url: format!("{}{SCORE_PATH}", server.uri()),
        timeout_ms: 2_000,
        cache_ttl_seconds: 0,
        ..Default::default()
    }
}

fn texts(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("document {i}")).collect()
}

async fn mount_json(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(SCORE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(SCORE_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
        .mount(server)
        .await;
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Response shapes ───────────────────────────────────────────────

#[tokio::test]
async fn classification_arrays_shape() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        json!([
            [{"label": "LABEL_0", "score": 0.1}, {"label": "LABEL_1", "score": 0.9}],
            [{"label": "LABEL_0", "score": 0.7}, {"label": "LABEL_1", "score": 0.3}]
        ]),
    )
    .await;

    let client = RemoteReranker::new(config(&server)).expect("client");
    let scores = client.score("q", &texts(2)).await.expect("scores");
    assert!(approx(scores[0], 0.9));
    assert!(approx(scores[1], 0.3));
}

#[tokio::test]
async fn raw_scores_shape_is_sigmoided() {
    let server = MockServer::start().await;
    mount_json(&server, json!([0.0, 4.0])).await;

    let client = RemoteReranker::new(config(&server)).expect("client");
    let scores = client.score("q", &texts(2)).await.expect("scores");
    assert!(approx(scores[0], 0.5));
    assert!(scores[1] > 0.98);
}

#[tokio::test]
async fn label_scores_shape() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        json!([{"label": "LABEL_0", "score": 0.25}, {"label": "LABEL_0", "score": 0.75}]),
    )
    .await;

    let client = RemoteReranker::new(config(&server)).expect("client");
    let scores = client.score("q", &texts(2)).await.expect("scores");
    assert_eq!(scores, vec![0.25, 0.75]);
}

#[tokio::test]
async fn wrapped_scores_shape() {
    let server = MockServer::start().await;
    mount_json(&server, json!({"scores": [0.6, 1.7]})).await;

    let client = RemoteReranker::new(config(&server)).expect("client");
    let scores = client.score("q", &texts(2)).await.expect("scores");
    assert_eq!(scores, vec![0.6, 1.0]);
}

#[tokio::test]
async fn unrecognised_shape_is_neutral() {
    let server = MockServer::start().await;
    mount_json(&server, json!({"something": "else"})).await;

    let client = RemoteReranker::new(config(&server)).expect("client");
    let scores = client.score("q", &texts(3)).await.expect("scores");
    assert_eq!(scores, vec![NEUTRAL_SCORE; 3]);
}

// ── Failure classes ───────────────────────────────────────────────

#[tokio::test]
async fn unavailable_statuses_are_soft() {
    for status in [404, 410, 503] {
        let server = MockServer::start().await;
        mount_status(&server, status).await;

        let client = RemoteReranker::new(config(&server)).expect("client");
        let err = client.score("q", &texts(1)).await.expect_err("unavailable");
        assert!(
            matches!(err, RerankError::RemoteUnavailable(_)),
            "status {status} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn other_error_statuses_are_hard() {
    for status in [400, 401, 500] {
        let server = MockServer::start().await;
        mount_status(&server, status).await;

        let client = RemoteReranker::new(config(&server)).expect("client");
        let err = client.score("q", &texts(1)).await.expect_err("hard failure");
        assert!(matches!(err, RerankError::Http(_)), "status {status} gave {err:?}");
        assert!(!err.is_soft_remote_failure());
    }
}

#[tokio::test]
async fn model_loading_body_is_soft() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        json!({
            "error": "Model BAAI/bge-reranker-v2-m3 is currently loading",
            "estimated_time": 20.0
        }),
    )
    .await;

    let client = RemoteReranker::new(config(&server)).expect("client");
    let err = client.score("q", &texts(1)).await.expect_err("loading");
    assert!(err.is_soft_remote_failure());
}

#[tokio::test]
async fn slow_server_times_out_within_bound() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SCORE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([0.5]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = RemoteReranker::new(RemoteConfig {
        timeout_ms: 200,
        ..config(&server)
    })
    .expect("client");

    let start = Instant::now();
    let err = client.score("q", &texts(1)).await.expect_err("timeout");
    assert!(matches!(err, RerankError::RemoteTimeout(_)), "got {err:?}");
    assert!(start.elapsed() < Duration::from_secs(5));
}

// ── Request format ────────────────────────────────────────────────

#[tokio::test]
async fn sends_bearer_token_and_text_pairs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SCORE_PATH))
        .and(header("authorization", "Bearer hf_test_key"))
        .and(body_json(json!({
            "inputs": [
                {"text": "query", "text_pair": "document 0"},
                {"text": "query", "text_pair": "document 1"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scores": [0.2, 0.8]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = RemoteReranker::new(RemoteConfig {
        api_key: Some("hf_test_key".into()),
        ..config(&server)
    })
    .expect("client");
    let scores = client.score("query", &texts(2)).await.expect("scores");
    assert_eq!(scores, vec![0.2, 0.8]);
}

#[tokio::test]
async fn truncates_query_and_documents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SCORE_PATH))
        .and(body_json(json!({"inputs": [{"text": "abc", "text_pair": "12345"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scores": [0.4]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = RemoteReranker::new(RemoteConfig {
        max_query_chars: 3,
        max_document_chars: 5,
        ..config(&server)
    })
    .expect("client");
    let scores = client
        .score("abcdef", &["1234567890".to_string()])
        .await
        .expect("scores");
    assert_eq!(scores, vec![0.4]);
}

#[tokio::test]
async fn splits_into_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SCORE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scores": [0.9, 0.9]})))
        .expect(3)
        .mount(&server)
        .await;

    let client = RemoteReranker::new(RemoteConfig {
        batch_size: 2,
        ..config(&server)
    })
    .expect("client");
    let scores = client.score("q", &texts(5)).await.expect("scores");
    assert_eq!(scores.len(), 5);
    assert!(scores.iter().all(|s| approx(*s, 0.9)));
}

/// Answers the batch holding "document 0" and rejects every other batch.
async fn mount_first_batch_only(server: &MockServer, failing_status: u16) {
    Mock::given(method("POST"))
        .and(path(SCORE_PATH))
        .and(body_string_contains("document 0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scores": [0.99, 0.97]})))
        .mount(server)
        .await;
    mount_status(server, failing_status).await;
}

#[tokio::test]
async fn failed_batch_leaves_sibling_batches_scored() {
    let server = MockServer::start().await;
    mount_first_batch_only(&server, 503).await;

    let client = RemoteReranker::new(RemoteConfig {
        batch_size: 2,
        ..config(&server)
    })
    .expect("client");
    let partial = client.score_each("q", &texts(4)).await.expect("scores");

    assert_eq!(partial.scores, vec![Some(0.99), Some(0.97), None, None]);
    assert_eq!(partial.failures.len(), 1);
    assert_eq!(partial.failures[0].items, vec![2, 3]);
    assert!(partial.failures[0].error.is_soft_remote_failure());

    let err = client.score("q", &texts(4)).await.expect_err("incomplete");
    assert!(err.is_soft_remote_failure());
}

#[tokio::test]
async fn partial_outage_mixes_per_item_not_per_list() {
    for failing_status in [503, 500] {
        let server = MockServer::start().await;
        mount_first_batch_only(&server, failing_status).await;

        let remote = RemoteReranker::new(RemoteConfig {
            batch_size: 2,
            ..config(&server)
        })
        .expect("client");
        let service = ScoringService::with_remote(remote);
        let docs = texts(4);
        let batch = service.score("document", "q", &docs).await;

        assert_eq!(batch.source, ScoreSource::Mixed, "status {failing_status}");
        assert!(approx(batch.scores[0], 0.99));
        assert!(approx(batch.scores[1], 0.97));
        let lexical = LexicalScorer::new();
        assert!(approx(batch.scores[2], lexical.score("q", &docs[2])));
        assert!(approx(batch.scores[3], lexical.score("q", &docs[3])));
    }
}

#[tokio::test]
async fn every_batch_failing_is_plain_lexical() {
    let server = MockServer::start().await;
    mount_status(&server, 503).await;

    let remote = RemoteReranker::new(RemoteConfig {
        batch_size: 2,
        ..config(&server)
    })
    .expect("client");
    let service = ScoringService::with_remote(remote);
    let docs = texts(4);
    let batch = service.score("document", "q", &docs).await;

    assert_eq!(batch.source, ScoreSource::Lexical);
    assert_eq!(batch.scores, LexicalScorer::new().score_all("q", &docs));
}

// ── Cache ─────────────────────────────────────────────────────────

#[tokio::test]
async fn cached_scores_skip_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SCORE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scores": [0.3, 0.6]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = RemoteReranker::new(RemoteConfig {
        cache_ttl_seconds: 600,
        ..config(&server)
    })
    .expect("client");

    let first = client.score("q", &texts(2)).await.expect("first");
    let second = client.score("q", &texts(2)).await.expect("second");
    assert_eq!(first, second);
}
