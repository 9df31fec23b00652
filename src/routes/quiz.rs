use std::collections::HashSet;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::quiz::generator::{self, GeneratedQuiz};
use crate::quiz::scheduler::{self, PracticeFilters, StageFilter};
use crate::quiz::evaluator;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::validation::{validate_answer_text, validate_language_code};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/practice/next", get(practice_next))
        .route("/next", get(quick_next))
        .route("/answer", post(answer))
        .route("/skip", post(skip))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PracticeQuery {
    stage: Option<String>,
    language_code: Option<String>,
    due_for_review: Option<bool>,
    /// Comma-separated phrase ids already shown in this session.
    exclude_phrase_ids: Option<String>,
}

/// Next practice question under the caller's filters. An exhausted session
/// (every matching phrase excluded) responds with a null quizAttemptId so
/// the client can reset its exclusion list.
async fn practice_next(
    auth: AuthUser,
    Query(q): Query<PracticeQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let stage = StageFilter::parse(q.stage.as_deref()).ok_or_else(|| {
        AppError::bad_request(
            "VALIDATION_ERROR",
            "stage must be one of new, recognition, production, mastered or all",
        )
    })?;
    if let Some(lang) = &q.language_code {
        validate_language_code(lang)
            .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;
    }

    let filters = PracticeFilters {
        stage,
        language_code: q.language_code.clone(),
        due_only: q.due_for_review.unwrap_or(true),
    };
    let exclude: HashSet<String> = q
        .exclude_phrase_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let now = Utc::now();
    let total = scheduler::total_matching(state.store(), &auth.user_id, &filters, now)?;
    let Some(candidate) =
        scheduler::next_phrase(state.store(), &auth.user_id, &filters, &exclude, now)?
    else {
        return Ok(ok(serde_json::json!({
            "quizAttemptId": null,
            "phraseId": null,
            "question": null,
            "options": null,
            "questionType": null,
            "currentPosition": null,
            "totalMatching": total,
        })));
    };

    let native = native_language(&state, &auth.user_id)?;
    let quiz = generator::generate(
        state.store(),
        state.translation_cache(),
        &auth.user_id,
        &candidate.phrase,
        candidate.progress.stage,
        &native,
    )
    .await?;
    let position =
        scheduler::position_of(state.store(), &auth.user_id, &candidate.phrase.id, &filters, now)?;

    Ok(ok(quiz_payload(&quiz, position, total)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuickNextQuery {
    phrase_id: Option<String>,
}

/// One-off question, either for an explicit phrase or for whatever is most
/// due. Used by the lookup view's "quiz me on this" button.
async fn quick_next(
    auth: AuthUser,
    Query(q): Query<QuickNextQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let now = Utc::now();
    let (phrase, progress) = match &q.phrase_id {
        Some(phrase_id) => {
            let phrase = state
                .store()
                .get_phrase(phrase_id)?
                .ok_or_else(|| AppError::not_found("Phrase not found"))?;
            let progress = state
                .store()
                .ensure_learning_progress(&auth.user_id, &phrase.id)?;
            (phrase, progress)
        }
        None => {
            let filters = PracticeFilters {
                stage: StageFilter::All,
                language_code: None,
                due_only: true,
            };
            let Some(candidate) = scheduler::next_phrase(
                state.store(),
                &auth.user_id,
                &filters,
                &HashSet::new(),
                now,
            )?
            else {
                return Ok(ok(serde_json::json!({
                    "quizAttemptId": null,
                    "phraseId": null,
                    "question": null,
                    "options": null,
                    "questionType": null,
                })));
            };
            (candidate.phrase, candidate.progress)
        }
    };

    let native = native_language(&state, &auth.user_id)?;
    let quiz = generator::generate(
        state.store(),
        state.translation_cache(),
        &auth.user_id,
        &phrase,
        progress.stage,
        &native,
    )
    .await?;

    Ok(ok(quiz_payload(&quiz, None, 0)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    quiz_attempt_id: String,
    user_answer: String,
}

async fn answer(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AnswerRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    validate_answer_text(&req.user_answer)
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;
    require_owned_attempt(&state, &auth.user_id, &req.quiz_attempt_id)?;

    let result = evaluator::evaluate(
        state.store(),
        state.translator(),
        &state.config().srs,
        &req.quiz_attempt_id,
        &req.user_answer,
    )
    .await?;

    Ok(ok(serde_json::json!({
        "wasCorrect": result.was_correct,
        "correctAnswer": result.correct_answer,
        "explanation": result.explanation,
        "stageAdvanced": result.stage_advanced,
        "newStage": result.new_stage,
        "alreadyAnswered": result.already_answered,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkipRequest {
    phrase_id: String,
}

/// Acknowledge a skip. The exclusion set lives in the client session, so
/// nothing is written: no counter moves, the presented attempt stays
/// ungraded, and the phrase stays scheduled as it was.
async fn skip(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SkipRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let phrase = state
        .store()
        .get_phrase(&req.phrase_id)?
        .ok_or_else(|| AppError::not_found("Phrase not found"))?;

    tracing::debug!(user_id = %auth.user_id, phrase_id = %phrase.id, "Question skipped");
    Ok(ok(serde_json::json!({
        "skipped": true,
        "phraseId": phrase.id,
    })))
}

fn require_owned_attempt(
    state: &AppState,
    user_id: &str,
    attempt_id: &str,
) -> Result<crate::store::operations::attempts::QuizAttempt, AppError> {
    let attempt = state
        .store()
        .get_quiz_attempt(attempt_id)?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| AppError::not_found("Quiz attempt not found"))?;
    Ok(attempt)
}

fn native_language(state: &AppState, user_id: &str) -> Result<String, AppError> {
    Ok(state
        .store()
        .get_user_languages(user_id)?
        .map(|l| l.native_language_code)
        .unwrap_or_else(|| state.config().default_native_language.clone()))
}

fn quiz_payload(quiz: &GeneratedQuiz, position: Option<u64>, total: u64) -> serde_json::Value {
    serde_json::json!({
        "quizAttemptId": quiz.attempt.id,
        "phraseId": quiz.attempt.phrase_id,
        "question": quiz.question,
        "options": quiz.options,
        "questionType": quiz.attempt.question_type,
        "currentPosition": position,
        "totalMatching": total,
    })
}
