//! Quiz API tests.
//!
//! Everything runs against an in-memory state built from explicit parts, so
//! no external services are required.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use vocazoo_backend::config::AppConfig;
use vocazoo_backend::domain::Word;
use vocazoo_backend::routes::build_router;
use vocazoo_backend::state::AppState;

/// Word pool with derivable answers: `wordN` translates to `뜻말N`.
fn pool(n: usize) -> Vec<Word> {
    (0..n)
        .map(|i| Word {
            english: format!("word{}", i),
            korean: format!("뜻말{}", i),
            difficulty: 1,
            used: false,
        })
        .collect()
}

fn answer_for(question: &str) -> String {
    question.replace("word", "뜻말")
}

fn config_with_sample(sample_size: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.quiz.sample_size = sample_size;
    config
}

/// Build a server over explicit parts with one word set already active.
async fn server_with(config: AppConfig, words: Vec<Word>) -> (TestServer, Arc<AppState>) {
    let state = Arc::new(AppState::with_parts(config, words));
    state.rotator.ensure_active_batch().await.unwrap();
    let server = TestServer::new(build_router(state.clone())).unwrap();
    (server, state)
}

async fn start_session(server: &TestServer, body: serde_json::Value) -> String {
    let response = server.post("/api/v1/session/start").json(&body).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    body["session_token"].as_str().unwrap().to_string()
}

/// Test the health endpoint.
#[tokio::test]
async fn test_health() {
    let (server, _state) = server_with(AppConfig::default(), pool(12)).await;

    let response = server.get("/api/v1/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], json!(true));
}

/// Test a full quiz: start, answer every question, finalize, check progress.
#[tokio::test]
async fn test_quiz_happy_path() {
    let (server, _state) = server_with(config_with_sample(5), pool(12)).await;
    let token = start_session(&server, json!({})).await;

    let mut served = HashSet::new();
    for i in 0..5 {
        let response = server
            .get(&format!("/api/v1/session/question?session_token={}", token))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let question = body["english"].as_str().unwrap().to_string();
        assert!(served.insert(question.clone()), "question served twice");

        let response = server
            .post("/api/v1/session/answer")
            .json(&json!({
                "session_token": token,
                "question": question,
                "answer": answer_for(&question),
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["result"], json!("correct"));

        if i == 1 {
            let response = server
                .get(&format!("/api/v1/session/score?session_token={}", token))
                .await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            assert_eq!(body["score"], json!(20));
            assert!(body["remaining_time"].as_f64().unwrap() > 0.0);
        }
    }

    // Queue exhausted: the next fetch reports completion.
    let response = server
        .get(&format!("/api/v1/session/question?session_token={}", token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["completed"], json!(true));

    // Five difficulty-1 words at weight 10, answered fast: high bonus tier.
    let response = server
        .get(&format!("/api/v1/session/final_score?session_token={}", token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["base_score"], json!(50));
    assert_eq!(body["final_score"].as_f64().unwrap(), 75.0);

    let response = server
        .post("/api/v1/session/finalize")
        .json(&json!({ "session_token": token, "user_id": 1 }))
        .await;
    response.assert_status_ok();
    let first: serde_json::Value = response.json();
    assert_eq!(first["exp_gained"], json!(5));
    assert_eq!(first["level_up"], json!(false));
    assert!(first["new_badge"].is_null());

    let response = server.get("/api/v1/user/progress?user_id=1").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["level"], json!(1));
    assert_eq!(body["exp"], json!(5));
    assert_eq!(body["current_score"].as_f64().unwrap(), 75.0);
    assert_eq!(body["completed_tests"], json!(1));
    assert_eq!(body["badges"].as_array().unwrap().len(), 0);

    // Repeat finalize returns the frozen outcome and credits nothing twice.
    let response = server
        .post("/api/v1/session/finalize")
        .json(&json!({ "session_token": token, "user_id": 1 }))
        .await;
    response.assert_status_ok();
    let second: serde_json::Value = response.json();
    assert_eq!(second, first);

    let response = server.get("/api/v1/user/progress?user_id=1").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["exp"], json!(5));
    assert_eq!(body["completed_tests"], json!(1));

    let response = server.get("/api/v1/user/wrong_notes?user_id=1").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 0);
}

/// Test that a wrong answer becomes a note once the session is finalized.
#[tokio::test]
async fn test_wrong_answer_records_note() {
    let (server, _state) = server_with(config_with_sample(3), pool(8)).await;
    let token = start_session(&server, json!({})).await;

    let mut missed = String::new();
    for i in 0..3 {
        let response = server
            .get(&format!("/api/v1/session/question?session_token={}", token))
            .await;
        let body: serde_json::Value = response.json();
        let question = body["english"].as_str().unwrap().to_string();

        let answer = if i == 0 {
            missed = question.clone();
            "오답".to_string()
        } else {
            answer_for(&question)
        };
        let response = server
            .post("/api/v1/session/answer")
            .json(&json!({ "session_token": token, "question": question, "answer": answer }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        if i == 0 {
            assert_eq!(body["result"], json!("wrong"));
            assert_eq!(body["correct_answer"], json!(answer_for(&missed)));
        } else {
            assert_eq!(body["result"], json!("correct"));
        }
    }

    // Notes are only stored at finalize time.
    let response = server.get("/api/v1/user/wrong_notes?user_id=7").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 0);

    let response = server
        .post("/api/v1/session/finalize")
        .json(&json!({ "session_token": token, "user_id": 7 }))
        .await;
    response.assert_status_ok();

    let response = server.get("/api/v1/user/wrong_notes?user_id=7").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let notes = body.as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["question"], json!(missed));
    assert_eq!(notes[0]["userAnswer"], json!("오답"));
    assert_eq!(notes[0]["correctAnswer"], json!(answer_for(&missed)));
}

/// Test that a near-miss within the fuzzy threshold earns full credit.
#[tokio::test]
async fn test_fuzzy_typo_accepted() {
    let words = vec![Word {
        english: "hello".into(),
        korean: "가나다라마바사".into(),
        difficulty: 3,
        used: false,
    }];
    let (server, _state) = server_with(config_with_sample(1), words).await;
    let token = start_session(&server, json!({})).await;

    let response = server
        .get(&format!("/api/v1/session/question?session_token={}", token))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["english"], json!("hello"));

    // One final character off: ratio 12/14, above the 0.85 threshold.
    let response = server
        .post("/api/v1/session/answer")
        .json(&json!({ "session_token": token, "question": "hello", "answer": "가나다라마바아" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], json!("correct_with_typo"));
    assert_eq!(body["correct_answer"], json!("가나다라마바사"));
    assert!(body["message"].as_str().unwrap().contains("가나다라마바사"));

    let response = server
        .get(&format!("/api/v1/session/score?session_token={}", token))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["score"], json!(30));
}

/// Test that any comma-separated form of the stored answer matches exactly.
#[tokio::test]
async fn test_multi_form_answer_accepted() {
    let words = vec![Word {
        english: "house".into(),
        korean: "집,가정".into(),
        difficulty: 1,
        used: false,
    }];
    let (server, _state) = server_with(config_with_sample(1), words).await;
    let token = start_session(&server, json!({})).await;

    let response = server
        .get(&format!("/api/v1/session/question?session_token={}", token))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["english"], json!("house"));

    let response = server
        .post("/api/v1/session/answer")
        .json(&json!({ "session_token": token, "question": "house", "answer": "가정" }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], json!("correct"));
}

/// Test expiry: with a zero time limit every step reports time over.
#[tokio::test]
async fn test_time_over() {
    let mut config = config_with_sample(2);
    config.quiz.time_limit_secs = 0;
    let (server, _state) = server_with(config, pool(5)).await;
    let token = start_session(&server, json!({})).await;

    // An expired session serves no question and is not "completed" either.
    let response = server
        .get(&format!("/api/v1/session/question?session_token={}", token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["english"].is_null());
    assert!(body["completed"].is_null());

    let response = server
        .post("/api/v1/session/answer")
        .json(&json!({ "session_token": token, "question": "word0", "answer": "뜻말0" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], json!("time_over"));

    let response = server
        .get(&format!("/api/v1/session/final_score?session_token={}", token))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["base_score"], json!(0));
    assert_eq!(body["final_score"].as_f64().unwrap(), 0.0);
    assert_eq!(body["remaining_time"].as_f64().unwrap(), 0.0);
}

/// Test that session endpoints 404 on an unknown token.
#[tokio::test]
async fn test_unknown_session_not_found() {
    let (server, _state) = server_with(AppConfig::default(), pool(12)).await;

    let response = server
        .get("/api/v1/session/question?session_token=missing")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], json!("not_found"));

    let response = server
        .post("/api/v1/session/answer")
        .json(&json!({ "session_token": "missing", "question": "x", "answer": "y" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post("/api/v1/session/finalize")
        .json(&json!({ "session_token": "missing", "user_id": 1 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

/// Test progress for a user that never finished a quiz.
#[tokio::test]
async fn test_unknown_user() {
    let (server, _state) = server_with(AppConfig::default(), pool(12)).await;

    let response = server.get("/api/v1/user/progress?user_id=999").await;
    response.assert_status(StatusCode::NOT_FOUND);

    // Notes are a filter, not a lookup: unknown users read as empty.
    let response = server.get("/api/v1/user/wrong_notes?user_id=999").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 0);
}

/// Test that a sample larger than the active set is rejected.
#[tokio::test]
async fn test_insufficient_words_rejected() {
    let (server, _state) = server_with(config_with_sample(10), pool(3)).await;

    let response = server.post("/api/v1/session/start").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], json!("insufficient_words"));
}

/// Test that a zero sample size is rejected as invalid input.
#[tokio::test]
async fn test_zero_sample_size_rejected() {
    let (server, _state) = server_with(AppConfig::default(), pool(12)).await;

    let response = server
        .post("/api/v1/session/start")
        .json(&json!({ "sample_size": 0 }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], json!("validation_error"));
}

/// Test a review session: posted words, no notes, no progress credit.
#[tokio::test]
async fn test_review_session_flow() {
    let (server, _state) = server_with(AppConfig::default(), pool(5)).await;
    let token = start_session(
        &server,
        json!({
            "review_words": [
                { "english": "cat", "korean": "고양이" },
                { "english": "dog", "korean": "개", "difficulty": 2 },
                { "english": "bird", "korean": "새" },
            ]
        }),
    )
    .await;

    for _ in 0..3 {
        let response = server
            .get(&format!("/api/v1/session/question?session_token={}", token))
            .await;
        let body: serde_json::Value = response.json();
        let question = body["english"].as_str().unwrap().to_string();
        let answer = match question.as_str() {
            "cat" => "고양이",
            "dog" => "개",
            _ => "틀림",
        };
        let response = server
            .post("/api/v1/session/answer")
            .json(&json!({ "session_token": token, "question": question, "answer": answer }))
            .await;
        response.assert_status_ok();
    }

    // cat (difficulty 1) and dog (difficulty 2) at weight 10, high bonus.
    let response = server
        .post("/api/v1/session/finalize")
        .json(&json!({ "session_token": token, "user_id": 42 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["exp_gained"], json!(0));
    assert_eq!(body["level_up"], json!(false));

    let response = server
        .get(&format!("/api/v1/session/final_score?session_token={}", token))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["base_score"], json!(30));
    assert_eq!(body["final_score"].as_f64().unwrap(), 45.0);

    // Review attempts touch neither progress nor the wrong-answer notebook.
    let response = server.get("/api/v1/user/progress?user_id=42").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server.get("/api/v1/user/wrong_notes?user_id=42").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 0);
}

/// Test starting from an explicit word set id, known and unknown.
#[tokio::test]
async fn test_start_with_word_set_id() {
    let (server, state) = server_with(config_with_sample(2), pool(12)).await;
    let batch = state.store.active_batch().await.unwrap();

    let token = start_session(&server, json!({ "word_set_id": batch.id })).await;
    assert!(!token.is_empty());

    let response = server
        .post("/api/v1/session/start")
        .json(&json!({ "word_set_id": "no-such-set" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

/// Test that repeated finalized quizzes accumulate exp into a level up.
#[tokio::test]
async fn test_level_up_after_repeated_quizzes() {
    let (server, _state) = server_with(config_with_sample(1), pool(8)).await;

    let mut last = json!(null);
    for _ in 0..6 {
        let token = start_session(&server, json!({})).await;
        let response = server
            .get(&format!("/api/v1/session/question?session_token={}", token))
            .await;
        let body: serde_json::Value = response.json();
        let question = body["english"].as_str().unwrap().to_string();
        server
            .post("/api/v1/session/answer")
            .json(&json!({
                "session_token": token,
                "question": question,
                "answer": answer_for(&question),
            }))
            .await
            .assert_status_ok();

        let response = server
            .post("/api/v1/session/finalize")
            .json(&json!({ "session_token": token, "user_id": 3 }))
            .await;
        response.assert_status_ok();
        last = response.json();
    }

    // Five exp per attempt; the sixth crosses the 30 exp needed for level 2.
    assert_eq!(last["level_up"], json!(true));
    assert!(last["new_badge"].is_null());

    let response = server.get("/api/v1/user/progress?user_id=3").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["level"], json!(2));
    assert_eq!(body["exp"], json!(0));
    assert_eq!(body["completed_tests"], json!(6));
    assert_eq!(body["current_score"].as_f64().unwrap(), 90.0);
}
