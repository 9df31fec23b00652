use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    pub id: String,
    pub text: String,
    pub language_code: String,
    pub phrase_type: PhraseType,
    pub is_quizzable: bool,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhraseType {
    Word,
    Expression,
    Sentence,
}

impl PhraseType {
    /// Rough classification by shape; good enough to pick question framing.
    pub fn classify(text: &str) -> Self {
        let words = text.split_whitespace().count();
        if words <= 1 {
            PhraseType::Word
        } else if words <= 4 {
            PhraseType::Expression
        } else {
            PhraseType::Sentence
        }
    }
}

/// Dedup hash over the normalized text and source language. Two lookups of
/// "Katze" and " katze " in `de` resolve to the same phrase.
pub fn content_hash(text: &str, language_code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().to_lowercase().as_bytes());
    hasher.update(b":");
    hasher.update(language_code.to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

impl Store {
    /// Insert the phrase unless one with the same (text, language) already
    /// exists, in which case the existing record is returned. The text
    /// index is claimed with compare_and_swap first so two concurrent
    /// creates converge on one phrase id.
    pub fn create_or_get_phrase(
        &self,
        text: &str,
        language_code: &str,
        is_quizzable: bool,
    ) -> Result<Phrase, StoreError> {
        let hash = content_hash(text, language_code);
        let index_key = keys::phrase_text_index_key(&hash);

        if let Some(existing_id) = self.phrase_text_index.get(index_key.as_bytes())? {
            let id = String::from_utf8_lossy(&existing_id).to_string();
            if let Some(phrase) = self.get_phrase(&id)? {
                return Ok(phrase);
            }
            // Dangling index entry; fall through and rewrite it.
        }

        let phrase = Phrase {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.trim().to_string(),
            language_code: language_code.to_lowercase(),
            phrase_type: PhraseType::classify(text),
            is_quizzable,
            content_hash: hash,
            created_at: Utc::now(),
        };

        match self.phrase_text_index.compare_and_swap(
            index_key.as_bytes(),
            None as Option<&[u8]>,
            Some(phrase.id.as_bytes()),
        )? {
            Ok(()) => {
                self.phrases.insert(
                    keys::phrase_key(&phrase.id).as_bytes(),
                    Self::serialize(&phrase)?,
                )?;
                Ok(phrase)
            }
            Err(cas) => {
                // Lost the race: another request claimed the hash.
                let winner_id = cas
                    .current
                    .map(|raw| String::from_utf8_lossy(&raw).to_string())
                    .ok_or_else(|| StoreError::Conflict {
                        entity: "phrase".to_string(),
                        key: index_key.clone(),
                    })?;
                self.get_phrase(&winner_id)?
                    .ok_or_else(|| StoreError::NotFound {
                        entity: "phrase".to_string(),
                        key: winner_id,
                    })
            }
        }
    }

    pub fn get_phrase(&self, phrase_id: &str) -> Result<Option<Phrase>, StoreError> {
        match self.phrases.get(keys::phrase_key(phrase_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn count_phrases(&self) -> Result<u64, StoreError> {
        Ok(self.phrases.len() as u64)
    }
}
