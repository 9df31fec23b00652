use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Mastery level of one user for one phrase. Advances forward through the
/// quiz state machine; regression is a configurable policy in the SRS layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LearningStage {
    New,
    Recognition,
    Production,
    Mastered,
}

impl LearningStage {
    pub fn advanced(self) -> Self {
        match self {
            LearningStage::New => LearningStage::Recognition,
            LearningStage::Recognition => LearningStage::Production,
            LearningStage::Production | LearningStage::Mastered => LearningStage::Mastered,
        }
    }

    pub fn regressed(self) -> Self {
        match self {
            LearningStage::New | LearningStage::Recognition => LearningStage::New,
            LearningStage::Production => LearningStage::Recognition,
            LearningStage::Mastered => LearningStage::Production,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "new" => Some(LearningStage::New),
            "recognition" => Some(LearningStage::Recognition),
            "production" => Some(LearningStage::Production),
            "mastered" => Some(LearningStage::Mastered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub user_id: String,
    pub phrase_id: String,
    pub stage: LearningStage,
    pub times_reviewed: u32,
    pub times_correct: u32,
    pub times_incorrect: u32,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
    pub interval_days: u32,
    pub next_review_date: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearningProgress {
    /// Fresh record for a phrase the user just searched: stage `new`,
    /// due immediately so it enters the next practice session.
    pub fn new_record(user_id: &str, phrase_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            phrase_id: phrase_id.to_string(),
            stage: LearningStage::New,
            times_reviewed: 0,
            times_correct: 0,
            times_incorrect: 0,
            consecutive_correct: 0,
            consecutive_incorrect: 0,
            interval_days: 1,
            next_review_date: now,
            last_reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StageStats {
    pub new_count: u64,
    pub recognition: u64,
    pub production: u64,
    pub mastered: u64,
}

fn due_index_key_for(progress: &LearningProgress) -> Result<String, StoreError> {
    keys::progress_due_index_key(
        &progress.user_id,
        progress.next_review_date.timestamp_millis(),
        &progress.phrase_id,
    )
}

fn unwrap_tx_error(error: sled::transaction::TransactionError<StoreError>) -> StoreError {
    match error {
        sled::transaction::TransactionError::Abort(store_error) => store_error,
        sled::transaction::TransactionError::Storage(storage_error) => {
            StoreError::Sled(storage_error)
        }
    }
}

impl Store {
    pub fn get_learning_progress(
        &self,
        user_id: &str,
        phrase_id: &str,
    ) -> Result<Option<LearningProgress>, StoreError> {
        let key = keys::learning_progress_key(user_id, phrase_id)?;
        match self.learning_progress.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Write the record and keep the due index in step. The old index entry
    /// is removed inside the same transaction so a crash never leaves a
    /// stale due date behind.
    pub fn set_learning_progress(&self, progress: &LearningProgress) -> Result<(), StoreError> {
        let key = keys::learning_progress_key(&progress.user_id, &progress.phrase_id)?;
        let value = Self::serialize(progress)?;
        let next_due_key = due_index_key_for(progress)?;

        (&self.learning_progress, &self.progress_due_index)
            .transaction(|(tx_progress, tx_due)| {
                if let Some(old_raw) = tx_progress.get(key.as_bytes())? {
                    let old: LearningProgress = serde_json::from_slice(&old_raw).map_err(|e| {
                        sled::transaction::ConflictableTransactionError::Abort(
                            StoreError::Serialization(e),
                        )
                    })?;
                    let old_due_key = due_index_key_for(&old)
                        .map_err(sled::transaction::ConflictableTransactionError::Abort)?;
                    tx_due.remove(old_due_key.as_bytes())?;
                }

                tx_progress.insert(key.as_bytes(), value.as_slice())?;
                tx_due.insert(next_due_key.as_bytes(), &[])?;
                Ok(())
            })
            .map_err(unwrap_tx_error)?;

        Ok(())
    }

    /// Create the lazy progress record if the user has none for this phrase.
    /// Returns the record either way.
    pub fn ensure_learning_progress(
        &self,
        user_id: &str,
        phrase_id: &str,
    ) -> Result<LearningProgress, StoreError> {
        if let Some(existing) = self.get_learning_progress(user_id, phrase_id)? {
            return Ok(existing);
        }
        let fresh = LearningProgress::new_record(user_id, phrase_id);
        self.set_learning_progress(&fresh)?;
        Ok(fresh)
    }

    pub fn list_learning_progress(
        &self,
        user_id: &str,
    ) -> Result<Vec<LearningProgress>, StoreError> {
        let prefix = keys::learning_progress_prefix(user_id)?;
        let mut rows = Vec::new();
        for item in self.learning_progress.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = item?;
            rows.push(Self::deserialize(&raw)?);
        }
        Ok(rows)
    }

    /// Due progress records in ascending review-date order, straight off
    /// the due index. Entries whose stored record has moved on (date
    /// mismatch) are skipped; the transaction in set_learning_progress
    /// makes that a transient condition only.
    pub fn list_due_progress(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<LearningProgress>, StoreError> {
        let prefix = keys::progress_due_index_prefix(user_id)?;
        let now_ms = now.timestamp_millis().max(0);
        let mut due = Vec::new();

        for item in self.progress_due_index.scan_prefix(prefix.as_bytes()) {
            let (raw_key, _) = item?;
            let Some((due_ts_ms, phrase_id)) = keys::parse_due_index_key(&raw_key) else {
                continue;
            };
            if due_ts_ms > now_ms {
                break;
            }
            if let Some(progress) = self.get_learning_progress(user_id, &phrase_id)? {
                if progress.next_review_date.timestamp_millis().max(0) == due_ts_ms {
                    due.push(progress);
                }
            }
        }

        Ok(due)
    }

    pub fn get_stage_stats(&self, user_id: &str) -> Result<StageStats, StoreError> {
        let mut stats = StageStats::default();
        for progress in self.list_learning_progress(user_id)? {
            match progress.stage {
                LearningStage::New => stats.new_count += 1,
                LearningStage::Recognition => stats.recognition += 1,
                LearningStage::Production => stats.production += 1,
                LearningStage::Mastered => stats.mastered += 1,
            }
        }
        Ok(stats)
    }
}
