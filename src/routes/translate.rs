use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::validation::{validate_language_code, validate_phrase_text};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(translate))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest {
    text: String,
    language_code: String,
    native_language_code: Option<String>,
    target_languages: Option<Vec<String>>,
    #[serde(default)]
    force: bool,
}

/// Look up a phrase: dedup it into the phrase table, serve translations
/// from the cache (generating on miss), and register the lookup as the
/// user's interest so the phrase enters their quiz rotation.
async fn translate(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TranslateRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    validate_phrase_text(&req.text)
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;
    validate_language_code(&req.language_code)
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;

    let native = match &req.native_language_code {
        Some(lang) => {
            validate_language_code(lang)
                .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;
            lang.clone()
        }
        None => state
            .store()
            .get_user_languages(&auth.user_id)?
            .map(|l| l.native_language_code)
            .unwrap_or_else(|| state.config().default_native_language.clone()),
    };

    let targets = match &req.target_languages {
        Some(langs) if !langs.is_empty() => {
            for lang in langs {
                validate_language_code(lang)
                    .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;
            }
            langs.clone()
        }
        _ => vec![native.clone()],
    };

    let phrase = state
        .store()
        .create_or_get_phrase(&req.text, &req.language_code, true)?;

    // Cached means every requested language was already persisted.
    let mut cached = !req.force;
    if cached {
        for lang in &targets {
            if state
                .store()
                .get_phrase_translation(&phrase.id, lang)?
                .is_none()
            {
                cached = false;
                break;
            }
        }
    }

    let translations = state
        .translation_cache()
        .get_or_generate(&phrase, &targets, &native, req.force)
        .await?;

    state.store().upsert_user_languages(
        &auth.user_id,
        &native,
        std::slice::from_ref(&req.language_code),
    )?;
    state
        .store()
        .record_user_search(&auth.user_id, &phrase.id, &req.text)?;
    state
        .store()
        .ensure_learning_progress(&auth.user_id, &phrase.id)?;

    let rendered: serde_json::Map<String, serde_json::Value> = targets
        .iter()
        .filter_map(|lang| {
            translations.get(lang).map(|t| {
                (
                    lang.clone(),
                    serde_json::json!({
                        "entries": t.entries,
                        "modelName": t.model_name,
                        "spellingIssue": t.spelling_issue,
                    }),
                )
            })
        })
        .collect();

    Ok(ok(serde_json::json!({
        "phraseId": phrase.id,
        "text": phrase.text,
        "languageCode": phrase.language_code,
        "phraseType": phrase.phrase_type,
        "translations": rendered,
        "cached": cached,
    })))
}
