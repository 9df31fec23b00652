use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Links a user's free-text lookup to the phrase it resolved to. A phrase
/// becomes quizzable for a user once at least one search recorded it (the
/// lazy LearningProgress row is created alongside).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearch {
    pub id: String,
    pub user_id: String,
    pub phrase_id: String,
    pub query_text: String,
    pub searched_at: DateTime<Utc>,
}

impl Store {
    pub fn record_user_search(
        &self,
        user_id: &str,
        phrase_id: &str,
        query_text: &str,
    ) -> Result<UserSearch, StoreError> {
        let search = UserSearch {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            phrase_id: phrase_id.to_string(),
            query_text: query_text.to_string(),
            searched_at: Utc::now(),
        };
        let key = keys::user_search_key(
            &search.user_id,
            search.searched_at.timestamp_millis(),
            &search.id,
        )?;
        self.user_searches
            .insert(key.as_bytes(), Self::serialize(&search)?)?;
        Ok(search)
    }

    pub fn list_user_searches(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UserSearch>, StoreError> {
        let prefix = keys::user_search_prefix(user_id)?;
        let mut searches = Vec::new();
        for item in self
            .user_searches
            .scan_prefix(prefix.as_bytes())
            .skip(offset)
            .take(limit)
        {
            let (_, raw) = item?;
            searches.push(Self::deserialize(&raw)?);
        }
        Ok(searches)
    }
}
