mod common;

use axum::http::Method;

use common::app::spawn_test_app;
use common::auth::{auth_header, sign_user_token};
use common::fixtures::{seed_phrase_with_translation, seed_progress};
use common::http::{assert_status_ok_json, request, response_json};
use quiz_backend::store::operations::progress::LearningStage;

#[tokio::test]
async fn it_progress_lists_with_phrase_context_and_stage_filter() {
    let app = spawn_test_app().await;
    let token = sign_user_token("u1", &app.config.jwt_secret);
    let store = app.state.store();

    let katze = seed_phrase_with_translation(store, "Katze", "de", "en", "cat");
    let hund = seed_phrase_with_translation(store, "Hund", "de", "en", "dog");
    seed_progress(store, "u1", &katze.id, LearningStage::Recognition, 10);
    seed_progress(store, "u1", &hund.id, LearningStage::New, 5);

    let all = request(
        &app.app,
        Method::GET,
        "/api/progress",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(all).await;
    assert_status_ok_json(status, &body);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Sorted by next review date: Katze was due earlier
    assert_eq!(rows[0]["phraseText"], "Katze");
    assert_eq!(rows[0]["stage"], "recognition");
    assert_eq!(rows[1]["phraseText"], "Hund");

    let filtered = request(
        &app.app,
        Method::GET,
        "/api/progress?stage=new",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (_, _, body) = response_json(filtered).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["phraseText"], "Hund");
}

#[tokio::test]
async fn it_stats_count_stages() {
    let app = spawn_test_app().await;
    let token = sign_user_token("u1", &app.config.jwt_secret);
    let store = app.state.store();

    let a = seed_phrase_with_translation(store, "eins", "de", "en", "one");
    let b = seed_phrase_with_translation(store, "zwei", "de", "en", "two");
    let c = seed_phrase_with_translation(store, "drei", "de", "en", "three");
    seed_progress(store, "u1", &a.id, LearningStage::New, 0);
    seed_progress(store, "u1", &b.id, LearningStage::Mastered, 0);
    seed_progress(store, "u1", &c.id, LearningStage::Mastered, 0);

    let stats = request(
        &app.app,
        Method::GET,
        "/api/progress/stats",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(stats).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["newCount"], 1);
    assert_eq!(body["data"]["mastered"], 2);
    assert_eq!(body["data"]["production"], 0);
}

#[tokio::test]
async fn it_history_paginates_newest_first() {
    let app = spawn_test_app().await;
    let token = sign_user_token("u1", &app.config.jwt_secret);
    let store = app.state.store();

    let katze = seed_phrase_with_translation(store, "Katze", "de", "en", "cat");
    seed_progress(store, "u1", &katze.id, LearningStage::Production, 10);

    // Generate three attempts by asking three times
    let mut attempt_ids = Vec::new();
    for _ in 0..3 {
        let url = format!("/api/quiz/next?phraseId={}", katze.id);
        let resp = request(
            &app.app,
            Method::GET,
            &url,
            None,
            &[("authorization", auth_header(&token))],
        )
        .await;
        let (_, _, body) = response_json(resp).await;
        attempt_ids.push(body["data"]["quizAttemptId"].as_str().unwrap().to_string());
        // The history index orders by millisecond timestamp
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let page = request(
        &app.app,
        Method::GET,
        "/api/history?page=1&perPage=2",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(page).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["totalPages"], 2);
    let rows = body["data"]["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], attempt_ids[2].as_str());

    let rest = request(
        &app.app,
        Method::GET,
        "/api/history?page=2&perPage=2",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (_, _, body) = response_json(rest).await;
    assert_eq!(body["data"]["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["data"][0]["id"], attempt_ids[0].as_str());
}
