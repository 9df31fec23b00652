use chrono::{Duration, Utc};

use quiz_backend::store::operations::phrases::Phrase;
use quiz_backend::store::operations::progress::{LearningProgress, LearningStage};
use quiz_backend::store::operations::translations::{PhraseTranslation, TranslationEntry};
use quiz_backend::store::Store;

/// Phrase plus a cached translation, bypassing the upstream translator.
pub fn seed_phrase_with_translation(
    store: &Store,
    text: &str,
    language: &str,
    target_language: &str,
    word: &str,
) -> Phrase {
    let phrase = store
        .create_or_get_phrase(text, language, true)
        .expect("seed phrase");
    store
        .set_phrase_translation(&PhraseTranslation {
            phrase_id: phrase.id.clone(),
            target_language_code: target_language.to_string(),
            entries: vec![TranslationEntry {
                word: word.to_string(),
                grammar_info: "noun".to_string(),
                context: String::new(),
            }],
            model_name: "seed".to_string(),
            spelling_issue: false,
            created_at: Utc::now(),
        })
        .expect("seed translation");
    phrase
}

/// Progress row due `minutes_ago` in the past (negative for the future).
pub fn seed_progress(
    store: &Store,
    user_id: &str,
    phrase_id: &str,
    stage: LearningStage,
    minutes_ago: i64,
) -> LearningProgress {
    let mut progress = LearningProgress::new_record(user_id, phrase_id);
    progress.stage = stage;
    progress.next_review_date = Utc::now() - Duration::minutes(minutes_ago);
    store
        .set_learning_progress(&progress)
        .expect("seed progress");
    progress
}
