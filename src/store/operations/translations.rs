use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Cached output of the translation collaborator for one
/// (phrase, target language) pair. Replaced only by explicit regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseTranslation {
    pub phrase_id: String,
    pub target_language_code: String,
    pub entries: Vec<TranslationEntry>,
    pub model_name: String,
    pub spelling_issue: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntry {
    pub word: String,
    pub grammar_info: String,
    pub context: String,
}

impl PhraseTranslation {
    /// The answer used for grading: the primary translation word.
    pub fn primary_word(&self) -> Option<&str> {
        self.entries.first().map(|e| e.word.as_str())
    }
}

impl Store {
    pub fn get_phrase_translation(
        &self,
        phrase_id: &str,
        lang: &str,
    ) -> Result<Option<PhraseTranslation>, StoreError> {
        let key = keys::phrase_translation_key(phrase_id, lang)?;
        match self.phrase_translations.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_phrase_translation(
        &self,
        translation: &PhraseTranslation,
    ) -> Result<(), StoreError> {
        if translation.entries.is_empty() {
            return Err(StoreError::Validation(
                "translation must carry at least one entry".to_string(),
            ));
        }
        let key = keys::phrase_translation_key(
            &translation.phrase_id,
            &translation.target_language_code,
        )?;
        self.phrase_translations
            .insert(key.as_bytes(), Self::serialize(translation)?)?;
        Ok(())
    }

    /// Every cached translation into `lang` across all phrases, used as the
    /// distractor pool. Full scan; the tree stays small relative to quiz
    /// traffic and the generator caps how much it consumes.
    pub fn list_translations_for_language(
        &self,
        lang: &str,
    ) -> Result<Vec<PhraseTranslation>, StoreError> {
        let mut out = Vec::new();
        for item in self.phrase_translations.iter() {
            let (_, raw) = item?;
            let translation: PhraseTranslation = Self::deserialize(&raw)?;
            if translation.target_language_code == lang {
                out.push(translation);
            }
        }
        Ok(out)
    }
}
