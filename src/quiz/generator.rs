use chrono::Utc;
use rand::seq::SliceRandom;

use crate::services::translation_cache::{CacheError, TranslationCache};
use crate::store::operations::attempts::{QuestionType, QuizAttempt};
use crate::store::operations::phrases::Phrase;
use crate::store::operations::progress::LearningStage;
use crate::store::{Store, StoreError};

const DISTRACTOR_COUNT: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A freshly generated question together with its persisted attempt row.
#[derive(Debug, Clone)]
pub struct GeneratedQuiz {
    pub attempt: QuizAttempt,
    pub question: String,
    pub options: Option<Vec<String>>,
}

/// Build a question for the phrase at the given stage and persist the
/// QuizAttempt. The correct answer is fixed here, at generation time, so
/// later grading is unaffected by cache regeneration.
pub async fn generate(
    store: &Store,
    cache: &TranslationCache,
    user_id: &str,
    phrase: &Phrase,
    stage: LearningStage,
    native_language: &str,
) -> Result<GeneratedQuiz, GeneratorError> {
    let target_langs = [native_language.to_string()];
    let translations = cache
        .get_or_generate(phrase, &target_langs, native_language, false)
        .await?;
    let translation = &translations[native_language];
    let correct_answer = translation
        .primary_word()
        .unwrap_or_default()
        .to_string();

    let wants_choices = matches!(stage, LearningStage::New | LearningStage::Recognition);
    let distractors = if wants_choices {
        pick_distractors(store, phrase, &correct_answer, native_language)?
    } else {
        None
    };

    let (question_type, question, options) = match distractors {
        Some(distractors) => {
            let mut options: Vec<String> = distractors;
            options.push(correct_answer.clone());
            options.shuffle(&mut rand::thread_rng());
            (
                QuestionType::MultipleChoiceTarget,
                format!("Which is the correct translation of \"{}\"?", phrase.text),
                Some(options),
            )
        }
        None => (
            QuestionType::FreeTextTarget,
            format!(
                "Translate \"{}\" into {}.",
                phrase.text, native_language
            ),
            None,
        ),
    };

    let attempt = QuizAttempt {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        phrase_id: phrase.id.clone(),
        question_type,
        prompt: serde_json::json!({
            "question": &question,
            "options": &options,
            "questionType": question_type,
            "targetLanguage": native_language,
        }),
        correct_answer,
        user_answer: None,
        was_correct: None,
        evaluation_detail: None,
        stage_advanced: None,
        stage_after: None,
        created_at: Utc::now(),
        attempted_at: None,
    };
    store.create_quiz_attempt(&attempt)?;

    Ok(GeneratedQuiz {
        attempt,
        question,
        options,
    })
}

/// Distractors from other phrases' cached translations in the same target
/// language. Substring overlaps with the correct answer are filtered out
/// first; if that leaves too few the overlap rule is relaxed, and if the
/// pool is still short the question degrades to free text (`None`).
fn pick_distractors(
    store: &Store,
    phrase: &Phrase,
    correct_answer: &str,
    native_language: &str,
) -> Result<Option<Vec<String>>, StoreError> {
    let correct_lower = correct_answer.to_lowercase();
    let mut pool: Vec<String> = Vec::new();

    for translation in store.list_translations_for_language(native_language)? {
        if translation.phrase_id == phrase.id {
            continue;
        }
        for entry in &translation.entries {
            let word = entry.word.trim();
            if word.is_empty() || word.to_lowercase() == correct_lower {
                continue;
            }
            if !pool.iter().any(|w| w.eq_ignore_ascii_case(word)) {
                pool.push(word.to_string());
            }
        }
    }

    let preferred: Vec<&String> = pool
        .iter()
        .filter(|w| !is_giveaway(w, &correct_lower))
        .collect();

    let chosen: Vec<String> = if preferred.len() >= DISTRACTOR_COUNT {
        preferred
            .choose_multiple(&mut rand::thread_rng(), DISTRACTOR_COUNT)
            .map(|w| (*w).clone())
            .collect()
    } else if pool.len() >= DISTRACTOR_COUNT {
        pool.choose_multiple(&mut rand::thread_rng(), DISTRACTOR_COUNT)
            .cloned()
            .collect()
    } else {
        tracing::debug!(
            phrase_id = %phrase.id,
            pool_size = pool.len(),
            "Not enough distractors, degrading to free text"
        );
        return Ok(None);
    };

    Ok(Some(chosen))
}

/// A distractor that contains the correct answer (or the reverse) lets the
/// learner match on shape instead of meaning.
fn is_giveaway(candidate: &str, correct_lower: &str) -> bool {
    let candidate_lower = candidate.to_lowercase();
    candidate_lower.contains(correct_lower) || correct_lower.contains(&candidate_lower)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use crate::config::TranslatorConfig;
    use crate::services::translator::Translator;
    use crate::store::operations::translations::{PhraseTranslation, TranslationEntry};

    use super::*;

    fn harness(name: &str) -> (tempfile::TempDir, Arc<Store>, TranslationCache) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join(name).to_str().unwrap()).unwrap());
        let translator = Arc::new(Translator::new(&TranslatorConfig {
            enabled: true,
            mock: true,
            api_url: String::new(),
            api_key: String::new(),
            model: "mock-translator".to_string(),
            timeout_secs: 1,
            semantic_judge_enabled: false,
        }));
        let cache = TranslationCache::new(store.clone(), translator);
        (dir, store, cache)
    }

    fn seed_translation(store: &Store, phrase_id: &str, lang: &str, word: &str) {
        store
            .set_phrase_translation(&PhraseTranslation {
                phrase_id: phrase_id.to_string(),
                target_language_code: lang.to_string(),
                entries: vec![TranslationEntry {
                    word: word.to_string(),
                    grammar_info: "noun".to_string(),
                    context: String::new(),
                }],
                model_name: "seed".to_string(),
                spelling_issue: false,
                created_at: Utc::now(),
            })
            .unwrap();
    }

    fn seed_phrase_with_translation(store: &Store, text: &str, word: &str) -> Phrase {
        let phrase = store.create_or_get_phrase(text, "de", true).unwrap();
        seed_translation(store, &phrase.id, "en", word);
        phrase
    }

    #[tokio::test]
    async fn new_stage_builds_four_clean_options() {
        let (_dir, store, cache) = harness("db");
        let katze = seed_phrase_with_translation(&store, "Katze", "cat");
        seed_phrase_with_translation(&store, "Hund", "dog");
        seed_phrase_with_translation(&store, "Vogel", "bird");
        seed_phrase_with_translation(&store, "Pferd", "horse");
        seed_phrase_with_translation(&store, "Maus", "mouse");

        let quiz = generate(&store, &cache, "u1", &katze, LearningStage::New, "en")
            .await
            .unwrap();

        assert_eq!(quiz.attempt.question_type, QuestionType::MultipleChoiceTarget);
        let options = quiz.options.unwrap();
        assert_eq!(options.len(), 4);
        assert!(options.contains(&"cat".to_string()));
        // No duplicates, correct answer appears exactly once
        let mut sorted = options.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
        assert_eq!(quiz.attempt.correct_answer, "cat");
        assert!(store.get_quiz_attempt(&quiz.attempt.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn production_stage_is_free_text() {
        let (_dir, store, cache) = harness("db-ft");
        let katze = seed_phrase_with_translation(&store, "Katze", "cat");

        let quiz = generate(&store, &cache, "u1", &katze, LearningStage::Production, "en")
            .await
            .unwrap();

        assert_eq!(quiz.attempt.question_type, QuestionType::FreeTextTarget);
        assert!(quiz.options.is_none());
    }

    #[tokio::test]
    async fn sparse_pool_degrades_to_free_text() {
        let (_dir, store, cache) = harness("db-sparse");
        let katze = seed_phrase_with_translation(&store, "Katze", "cat");
        seed_phrase_with_translation(&store, "Hund", "dog");

        let quiz = generate(&store, &cache, "u1", &katze, LearningStage::New, "en")
            .await
            .unwrap();

        assert_eq!(quiz.attempt.question_type, QuestionType::FreeTextTarget);
        assert!(quiz.options.is_none());
    }

    #[tokio::test]
    async fn overlap_rule_relaxes_before_degrading() {
        let (_dir, store, cache) = harness("db-overlap");
        let katze = seed_phrase_with_translation(&store, "Katze", "cat");
        // Every other word overlaps "cat", so the strict rule finds nothing
        seed_phrase_with_translation(&store, "Katzenhaft", "catlike");
        seed_phrase_with_translation(&store, "Wildkatze", "wildcat");
        seed_phrase_with_translation(&store, "Katzenminze", "catnip");

        let quiz = generate(&store, &cache, "u1", &katze, LearningStage::New, "en")
            .await
            .unwrap();

        assert_eq!(quiz.attempt.question_type, QuestionType::MultipleChoiceTarget);
        let options = quiz.options.unwrap();
        assert_eq!(options.len(), 4);
        assert_eq!(
            options.iter().filter(|o| o.as_str() == "cat").count(),
            1
        );
    }

    #[tokio::test]
    async fn generation_invokes_cache_on_missing_translation() {
        let (_dir, store, cache) = harness("db-gen");
        let phrase = store.create_or_get_phrase("Brot", "de", true).unwrap();

        let quiz = generate(&store, &cache, "u1", &phrase, LearningStage::Production, "en")
            .await
            .unwrap();

        assert_eq!(quiz.attempt.correct_answer, "Brot [en]");
        assert!(store.get_phrase_translation(&phrase.id, "en").unwrap().is_some());
    }
}
