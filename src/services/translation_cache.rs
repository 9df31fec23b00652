use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::services::translator::{Translator, TranslatorError};
use crate::store::operations::phrases::Phrase;
use crate::store::operations::translations::PhraseTranslation;
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upstream(#[from] TranslatorError),
    #[error("translator returned no entries for language {0}")]
    EmptyResult(String),
}

/// Read-through cache over the phrase_translations tree. A miss for a
/// (phrase, language) pair is generated at most once even under concurrent
/// requests: each pair has a short-lived async mutex and the store is
/// re-checked under that lock before the collaborator is called.
pub struct TranslationCache {
    store: Arc<Store>,
    translator: Arc<Translator>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    generations: AtomicU64,
}

impl TranslationCache {
    pub fn new(store: Arc<Store>, translator: Arc<Translator>) -> Self {
        Self {
            store,
            translator,
            inflight: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Upstream generation calls since startup, for monitoring and tests.
    pub fn generation_count(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    async fn inflight_len(&self) -> usize {
        self.inflight.lock().await.len()
    }

    /// Translations for the phrase into each target language, generating
    /// and persisting the missing ones. `force` regenerates even on a hit.
    pub async fn get_or_generate(
        &self,
        phrase: &Phrase,
        target_languages: &[String],
        native_language: &str,
        force: bool,
    ) -> Result<HashMap<String, PhraseTranslation>, CacheError> {
        let mut found = HashMap::new();

        for lang in target_languages {
            if found.contains_key(lang) {
                continue;
            }
            if !force {
                if let Some(hit) = self.store.get_phrase_translation(&phrase.id, lang)? {
                    found.insert(lang.clone(), hit);
                    continue;
                }
            }
            let generated = self
                .generate_one(phrase, lang, native_language, force)
                .await?;
            found.insert(lang.clone(), generated);
        }

        Ok(found)
    }

    async fn generate_one(
        &self,
        phrase: &Phrase,
        lang: &str,
        native_language: &str,
        force: bool,
    ) -> Result<PhraseTranslation, CacheError> {
        let key = format!("{}:{}", phrase.id, lang);
        let gate = {
            let mut map = self.inflight.lock().await;
            map.entry(key.clone()).or_default().clone()
        };

        let result = {
            let _guard = gate.lock().await;
            self.generate_gated(phrase, lang, native_language, force).await
        };

        // Always drop the gate entry, hit or miss, or it stays in the map
        // until the process restarts.
        let mut map = self.inflight.lock().await;
        map.remove(&key);

        result
    }

    async fn generate_gated(
        &self,
        phrase: &Phrase,
        lang: &str,
        native_language: &str,
        force: bool,
    ) -> Result<PhraseTranslation, CacheError> {
        // Someone else may have generated while we waited on the gate.
        if !force {
            if let Some(hit) = self.store.get_phrase_translation(&phrase.id, lang)? {
                return Ok(hit);
            }
        }

        let wanted = [lang.to_string()];
        let output = self
            .translate_with_retry(phrase, &wanted, native_language)
            .await?;
        self.generations.fetch_add(1, Ordering::Relaxed);

        let entries = output
            .languages
            .get(lang)
            .filter(|entries| !entries.is_empty())
            .cloned()
            .ok_or_else(|| CacheError::EmptyResult(lang.to_string()))?;

        let translation = PhraseTranslation {
            phrase_id: phrase.id.clone(),
            target_language_code: lang.to_string(),
            entries,
            model_name: self.translator.model_name().to_string(),
            spelling_issue: output.spelling_issue,
            created_at: Utc::now(),
        };
        self.store.set_phrase_translation(&translation)?;
        tracing::info!(
            phrase_id = %phrase.id,
            language = %lang,
            "Generated and cached translation"
        );
        Ok(translation)
    }

    async fn translate_with_retry(
        &self,
        phrase: &Phrase,
        target_languages: &[String],
        native_language: &str,
    ) -> Result<crate::services::translator::TranslationOutput, TranslatorError> {
        match self
            .translator
            .translate(
                &phrase.text,
                &phrase.language_code,
                target_languages,
                native_language,
            )
            .await
        {
            Err(TranslatorError::Timeout) => {
                tracing::warn!(phrase_id = %phrase.id, "Translator timed out, retrying once");
                self.translator
                    .translate(
                        &phrase.text,
                        &phrase.language_code,
                        target_languages,
                        native_language,
                    )
                    .await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::config::TranslatorConfig;

    use super::*;

    fn mock_translator() -> Arc<Translator> {
        Arc::new(Translator::new(&TranslatorConfig {
            enabled: true,
            mock: true,
            api_url: String::new(),
            api_key: String::new(),
            model: "mock-translator".to_string(),
            timeout_secs: 1,
            semantic_judge_enabled: false,
        }))
    }

    fn cache_with_store(name: &str) -> (tempfile::TempDir, Arc<Store>, TranslationCache) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join(name).to_str().unwrap()).unwrap());
        let cache = TranslationCache::new(store.clone(), mock_translator());
        (dir, store, cache)
    }

    #[tokio::test]
    async fn hit_does_not_call_upstream() {
        let (_dir, store, cache) = cache_with_store("db");
        let phrase = store.create_or_get_phrase("Katze", "de", true).unwrap();
        let langs = vec!["en".to_string()];

        let first = cache
            .get_or_generate(&phrase, &langs, "en", false)
            .await
            .unwrap();
        assert_eq!(cache.generation_count(), 1);

        let second = cache
            .get_or_generate(&phrase, &langs, "en", false)
            .await
            .unwrap();
        assert_eq!(cache.generation_count(), 1);
        assert_eq!(
            first["en"].entries[0].word,
            second["en"].entries[0].word
        );
    }

    #[tokio::test]
    async fn concurrent_misses_collapse_to_one_generation() {
        let (_dir, store, cache) = cache_with_store("db-flight");
        let cache = Arc::new(cache);
        let phrase = store.create_or_get_phrase("Hund", "de", true).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let phrase = phrase.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_generate(&phrase, &["en".to_string()], "en", false)
                    .await
                    .map(|m| m["en"].entries[0].word.clone())
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "Hund [en]");
        }
        assert_eq!(cache.generation_count(), 1);
    }

    /// A rival request can persist the translation between our outer store
    /// check and the gate acquisition. That path returns the stored record
    /// and must still drop its gate entry.
    #[tokio::test]
    async fn gate_entry_is_dropped_on_the_recheck_hit() {
        use crate::store::operations::translations::TranslationEntry;

        let (_dir, store, cache) = cache_with_store("db-gate");
        let phrase = store.create_or_get_phrase("Tür", "de", true).unwrap();
        store
            .set_phrase_translation(&PhraseTranslation {
                phrase_id: phrase.id.clone(),
                target_language_code: "en".to_string(),
                entries: vec![TranslationEntry {
                    word: "door".to_string(),
                    grammar_info: "noun".to_string(),
                    context: String::new(),
                }],
                model_name: "seed".to_string(),
                spelling_issue: false,
                created_at: Utc::now(),
            })
            .unwrap();

        let hit = cache.generate_one(&phrase, "en", "en", false).await.unwrap();

        assert_eq!(hit.primary_word(), Some("door"));
        assert_eq!(cache.generation_count(), 0);
        assert_eq!(cache.inflight_len().await, 0);
    }

    #[tokio::test]
    async fn force_regenerates_over_a_hit() {
        let (_dir, store, cache) = cache_with_store("db-force");
        let phrase = store.create_or_get_phrase("Maus", "de", true).unwrap();
        let langs = vec!["en".to_string()];

        cache
            .get_or_generate(&phrase, &langs, "en", false)
            .await
            .unwrap();
        cache
            .get_or_generate(&phrase, &langs, "en", true)
            .await
            .unwrap();
        assert_eq!(cache.generation_count(), 2);
    }

    #[tokio::test]
    async fn multiple_languages_fill_independently() {
        let (_dir, store, cache) = cache_with_store("db-multi");
        let phrase = store.create_or_get_phrase("Brot", "de", true).unwrap();

        let result = cache
            .get_or_generate(
                &phrase,
                &["en".to_string(), "fr".to_string()],
                "en",
                false,
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(cache.generation_count(), 2);
        assert!(store.get_phrase_translation(&phrase.id, "fr").unwrap().is_some());
    }
}
