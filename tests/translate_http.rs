mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_app;
use common::auth::{auth_header, sign_user_token};
use common::http::{assert_json_error, assert_status_ok_json, request, response_json};

#[tokio::test]
async fn it_translate_generates_then_serves_from_cache() {
    let app = spawn_test_app().await;
    let token = sign_user_token("u1", &app.config.jwt_secret);

    let first = request(
        &app.app,
        Method::POST,
        "/api/translate",
        Some(serde_json::json!({"text": "Katze", "languageCode": "de"})),
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(first).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["cached"], false);
    assert_eq!(body["data"]["languageCode"], "de");
    assert_eq!(body["data"]["phraseType"], "word");
    assert_eq!(
        body["data"]["translations"]["en"]["entries"][0]["word"],
        "Katze [en]"
    );
    let phrase_id = body["data"]["phraseId"].as_str().unwrap().to_string();
    assert_eq!(app.state.translation_cache().generation_count(), 1);

    // Same text, different casing and whitespace, dedups to the same phrase
    let second = request(
        &app.app,
        Method::POST,
        "/api/translate",
        Some(serde_json::json!({"text": "  katze ", "languageCode": "de"})),
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(second).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["cached"], true);
    assert_eq!(body["data"]["phraseId"], phrase_id.as_str());
    assert_eq!(app.state.translation_cache().generation_count(), 1);
}

#[tokio::test]
async fn it_force_regenerates_a_cached_translation() {
    let app = spawn_test_app().await;
    let token = sign_user_token("u1", &app.config.jwt_secret);

    for force in [false, true] {
        let resp = request(
            &app.app,
            Method::POST,
            "/api/translate",
            Some(serde_json::json!({"text": "Hund", "languageCode": "de", "force": force})),
            &[("authorization", auth_header(&token))],
        )
        .await;
        let (status, _, body) = response_json(resp).await;
        assert_status_ok_json(status, &body);
        assert_eq!(body["data"]["cached"], false);
    }
    assert_eq!(app.state.translation_cache().generation_count(), 2);
}

#[tokio::test]
async fn it_translate_registers_interest_for_quizzing() {
    let app = spawn_test_app().await;
    let token = sign_user_token("u1", &app.config.jwt_secret);

    let resp = request(
        &app.app,
        Method::POST,
        "/api/translate",
        Some(serde_json::json!({"text": "Brot", "languageCode": "de"})),
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (_, _, body) = response_json(resp).await;
    let phrase_id = body["data"]["phraseId"].as_str().unwrap().to_string();

    // Lazy progress row, due immediately
    let progress = app
        .state
        .store()
        .get_learning_progress("u1", &phrase_id)
        .unwrap()
        .expect("progress created by translate");
    assert_eq!(progress.times_reviewed, 0);

    // Search history records the lookup
    let history = request(
        &app.app,
        Method::GET,
        "/api/history/searches",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(history).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"][0]["queryText"], "Brot");

    // Language set tracks native and learned language
    let langs = app.state.store().get_user_languages("u1").unwrap().unwrap();
    assert_eq!(langs.native_language_code, "en");
    assert_eq!(langs.target_language_codes, vec!["de"]);
}

#[tokio::test]
async fn it_translate_validates_input() {
    let app = spawn_test_app().await;
    let token = sign_user_token("u1", &app.config.jwt_secret);

    for payload in [
        serde_json::json!({"text": "   ", "languageCode": "de"}),
        serde_json::json!({"text": "Katze", "languageCode": "GERMAN"}),
        serde_json::json!({"text": "Katze", "languageCode": "de", "targetLanguages": ["nope!"]}),
    ] {
        let resp = request(
            &app.app,
            Method::POST,
            "/api/translate",
            Some(payload),
            &[("authorization", auth_header(&token))],
        )
        .await;
        let (status, _, body) = response_json(resp).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_json_error(&body, "VALIDATION_ERROR");
    }
}
