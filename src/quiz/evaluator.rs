use chrono::Utc;

use crate::config::SrsConfig;
use crate::quiz::srs;
use crate::services::translator::{Translator, TranslatorError};
use crate::store::operations::attempts::{QuestionType, QuizAttempt};
use crate::store::operations::progress::LearningStage;
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("quiz attempt not found: {0}")]
    AttemptNotFound(String),
}

#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub was_correct: bool,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub stage_advanced: bool,
    pub new_stage: LearningStage,
    /// True when this attempt was graded before; the stored result is
    /// returned unchanged and nothing is mutated.
    pub already_answered: bool,
}

/// Grade an answer and apply the spaced-repetition update in one atomic
/// store transaction. Re-grading a graded attempt is the idempotency path:
/// it replays the persisted outcome instead of touching progress again.
pub async fn evaluate(
    store: &Store,
    translator: &Translator,
    srs_config: &SrsConfig,
    attempt_id: &str,
    user_answer: &str,
) -> Result<EvaluationResult, EvaluatorError> {
    let attempt = store
        .get_quiz_attempt(attempt_id)?
        .ok_or_else(|| EvaluatorError::AttemptNotFound(attempt_id.to_string()))?;

    if attempt.is_graded() {
        tracing::debug!(attempt_id, "Duplicate submission, returning stored result");
        return Ok(replay(&attempt));
    }

    let verdict = grade(&attempt.correct_answer, user_answer, attempt.question_type);
    let (was_correct, mut detail) = match verdict {
        Verdict::Match => (true, None),
        Verdict::Mismatch => (false, None),
        Verdict::NearMiss => {
            consult_judge(
                translator,
                &attempt.correct_answer,
                user_answer,
                prompt_language(&attempt.prompt),
            )
            .await
        }
    };

    let now = Utc::now();
    let progress = store.ensure_learning_progress(&attempt.user_id, &attempt.phrase_id)?;
    let outcome = srs::apply_review(&progress, was_correct, srs_config, now);

    if detail.is_none() && !was_correct {
        detail = Some(format!(
            "The correct answer is \"{}\".",
            attempt.correct_answer
        ));
    }

    let mut graded = attempt;
    graded.user_answer = Some(user_answer.to_string());
    graded.was_correct = Some(was_correct);
    graded.evaluation_detail = detail.clone();
    graded.stage_advanced = Some(outcome.stage_advanced);
    graded.stage_after = Some(outcome.progress.stage);
    graded.attempted_at = Some(now);

    match store.apply_grading(&graded, &outcome.progress) {
        Ok(()) => {}
        // Lost a duplicate-submission race: another task graded this
        // attempt between our read and the transaction. Its result stands.
        Err(StoreError::Conflict { .. }) => {
            tracing::debug!(attempt_id, "Concurrent duplicate submission, returning stored result");
            let winner = store
                .get_quiz_attempt(attempt_id)?
                .ok_or_else(|| EvaluatorError::AttemptNotFound(attempt_id.to_string()))?;
            return Ok(replay(&winner));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        attempt_id,
        was_correct,
        stage_advanced = outcome.stage_advanced,
        stage_regressed = outcome.stage_regressed,
        "Graded quiz answer"
    );

    Ok(EvaluationResult {
        was_correct,
        correct_answer: graded.correct_answer,
        explanation: detail,
        stage_advanced: outcome.stage_advanced,
        new_stage: outcome.progress.stage,
        already_answered: false,
    })
}

fn replay(attempt: &QuizAttempt) -> EvaluationResult {
    EvaluationResult {
        was_correct: attempt.was_correct.unwrap_or(false),
        correct_answer: attempt.correct_answer.clone(),
        explanation: attempt.evaluation_detail.clone(),
        stage_advanced: attempt.stage_advanced.unwrap_or(false),
        new_stage: attempt.stage_after.unwrap_or(LearningStage::New),
        already_answered: true,
    }
}

/// Target language recorded on the attempt's prompt at generation time.
fn prompt_language(prompt: &serde_json::Value) -> &str {
    prompt
        .get("targetLanguage")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

enum Verdict {
    Match,
    Mismatch,
    /// Free-text mismatch that may still be acceptable to the semantic
    /// judge.
    NearMiss,
}

fn grade(correct_answer: &str, user_answer: &str, question_type: QuestionType) -> Verdict {
    match question_type {
        QuestionType::MultipleChoiceTarget => {
            if normalize_choice(user_answer) == normalize_choice(correct_answer) {
                Verdict::Match
            } else {
                Verdict::Mismatch
            }
        }
        QuestionType::FreeTextTarget => {
            if normalize_free_text(user_answer) == normalize_free_text(correct_answer) {
                Verdict::Match
            } else {
                Verdict::NearMiss
            }
        }
    }
}

/// The judge verdict is authoritative when available. When it is disabled
/// or unreachable (after one retry) grading falls back to the string
/// comparison result, so progress is never corrupted by an outage.
async fn consult_judge(
    translator: &Translator,
    correct_answer: &str,
    user_answer: &str,
    language: &str,
) -> (bool, Option<String>) {
    if !translator.judge_enabled() {
        return (false, None);
    }

    let first = translator
        .judge_answer(correct_answer, user_answer, language)
        .await;
    let result = match first {
        Err(TranslatorError::Timeout) => {
            tracing::warn!("Semantic judge timed out, retrying once");
            translator
                .judge_answer(correct_answer, user_answer, language)
                .await
        }
        other => other,
    };

    match result {
        Ok(verdict) => (verdict.equivalent, Some(verdict.reason)),
        Err(e) => {
            tracing::warn!(error = %e, "Semantic judge unavailable, using string comparison");
            (false, None)
        }
    }
}

fn normalize_choice(answer: &str) -> String {
    answer.trim().to_lowercase()
}

fn normalize_free_text(answer: &str) -> String {
    normalize_choice(answer)
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        .trim_end()
        .to_string()
}
