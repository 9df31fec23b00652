use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// The user's active language set, maintained implicitly by translate
/// requests. The quiz engine reads `native_language_code` to decide which
/// direction to ask in; language list management itself lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLanguages {
    pub user_id: String,
    pub native_language_code: String,
    pub target_language_codes: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn get_user_languages(&self, user_id: &str) -> Result<Option<UserLanguages>, StoreError> {
        match self
            .user_languages
            .get(keys::user_languages_key(user_id).as_bytes())?
        {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Merge the languages seen on a translate request into the stored set.
    pub fn upsert_user_languages(
        &self,
        user_id: &str,
        native_language_code: &str,
        target_language_codes: &[String],
    ) -> Result<UserLanguages, StoreError> {
        let mut record = match self.get_user_languages(user_id)? {
            Some(existing) => existing,
            None => UserLanguages {
                user_id: user_id.to_string(),
                native_language_code: native_language_code.to_string(),
                target_language_codes: Vec::new(),
                updated_at: Utc::now(),
            },
        };

        record.native_language_code = native_language_code.to_string();
        for lang in target_language_codes {
            if !record.target_language_codes.contains(lang) {
                record.target_language_codes.push(lang.clone());
            }
        }
        record.updated_at = Utc::now();

        self.user_languages.insert(
            keys::user_languages_key(user_id).as_bytes(),
            Self::serialize(&record)?,
        )?;
        Ok(record)
    }
}
