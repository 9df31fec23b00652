use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::operations::progress::{LearningProgress, LearningStage};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoiceTarget,
    FreeTextTarget,
}

/// One presented question. Created by the generator with the correct
/// answer fixed up front; the grading fields are filled exactly once by
/// the evaluator. Skipped questions simply stay ungraded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: String,
    pub phrase_id: String,
    pub question_type: QuestionType,
    pub prompt: serde_json::Value,
    pub correct_answer: String,
    pub user_answer: Option<String>,
    pub was_correct: Option<bool>,
    pub evaluation_detail: Option<String>,
    pub stage_advanced: Option<bool>,
    pub stage_after: Option<LearningStage>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    pub fn is_graded(&self) -> bool {
        self.was_correct.is_some()
    }
}

fn tx_abort(error: StoreError) -> sled::transaction::ConflictableTransactionError<StoreError> {
    sled::transaction::ConflictableTransactionError::Abort(error)
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
    pub fn create_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let key = keys::quiz_attempt_key(&attempt.id);
        let index_key = keys::quiz_attempt_user_index_key(
            &attempt.user_id,
            attempt.created_at.timestamp_millis(),
            &attempt.id,
        )?;
        let value = Self::serialize(attempt)?;

        (&self.quiz_attempts, &self.quiz_attempts_by_user)
            .transaction(|(tx_attempts, tx_index)| {
                tx_attempts.insert(key.as_bytes(), value.as_slice())?;
                tx_index.insert(index_key.as_bytes(), &[])?;
                Ok(())
            })
            .map_err(unwrap_tx_error)?;

        Ok(())
    }

    pub fn get_quiz_attempt(&self, attempt_id: &str) -> Result<Option<QuizAttempt>, StoreError> {
        match self
            .quiz_attempts
            .get(keys::quiz_attempt_key(attempt_id).as_bytes())?
        {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Persist a grading outcome: the completed attempt plus the updated
    /// progress record and its due index entry, all-or-nothing. A failure
    /// partway must never leave counters incremented without the new
    /// review date. The graded check lives inside the transaction, so of
    /// two concurrent submissions exactly one commits; the other gets
    /// `Conflict` and must return the stored result instead.
    pub fn apply_grading(
        &self,
        graded: &QuizAttempt,
        progress: &LearningProgress,
    ) -> Result<(), StoreError> {
        let attempt_key = keys::quiz_attempt_key(&graded.id);
        let attempt_value = Self::serialize(graded)?;
        let progress_key = keys::learning_progress_key(&progress.user_id, &progress.phrase_id)?;
        let progress_value = Self::serialize(progress)?;
        let next_due_key = keys::progress_due_index_key(
            &progress.user_id,
            progress.next_review_date.timestamp_millis(),
            &progress.phrase_id,
        )?;

        (
            &self.quiz_attempts,
            &self.learning_progress,
            &self.progress_due_index,
        )
            .transaction(|(tx_attempts, tx_progress, tx_due)| {
                if let Some(raw) = tx_attempts.get(attempt_key.as_bytes())? {
                    let current: QuizAttempt = serde_json::from_slice(&raw)
                        .map_err(|e| tx_abort(StoreError::Serialization(e)))?;
                    if current.was_correct.is_some() {
                        return Err(tx_abort(StoreError::Conflict {
                            entity: "quiz_attempt".to_string(),
                            key: current.id,
                        }));
                    }
                }

                if let Some(old_raw) = tx_progress.get(progress_key.as_bytes())? {
                    let old: LearningProgress =
                        serde_json::from_slice(&old_raw).map_err(|e| {
                            tx_abort(StoreError::Serialization(e))
                        })?;
                    let old_due_key = keys::progress_due_index_key(
                        &old.user_id,
                        old.next_review_date.timestamp_millis(),
                        &old.phrase_id,
                    )
                    .map_err(tx_abort)?;
                    tx_due.remove(old_due_key.as_bytes())?;
                }

                tx_attempts.insert(attempt_key.as_bytes(), attempt_value.as_slice())?;
                tx_progress.insert(progress_key.as_bytes(), progress_value.as_slice())?;
                tx_due.insert(next_due_key.as_bytes(), &[])?;
                Ok(())
            })
            .map_err(unwrap_tx_error)?;

        Ok(())
    }

    /// Newest-first page of the user's attempt history.
    pub fn list_user_attempts(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let prefix = keys::quiz_attempt_user_prefix(user_id)?;
        let mut attempts = Vec::new();

        for item in self
            .quiz_attempts_by_user
            .scan_prefix(prefix.as_bytes())
            .skip(offset)
            .take(limit)
        {
            let (raw_key, _) = item?;
            let text = String::from_utf8_lossy(&raw_key);
            let Some(attempt_id) = text.rsplit(':').next() else {
                continue;
            };
            if let Some(attempt) = self.get_quiz_attempt(attempt_id)? {
                attempts.push(attempt);
            }
        }

        Ok(attempts)
    }

    pub fn count_user_attempts(&self, user_id: &str) -> Result<u64, StoreError> {
        let prefix = keys::quiz_attempt_user_prefix(user_id)?;
        let mut count = 0;
        for item in self.quiz_attempts_by_user.scan_prefix(prefix.as_bytes()) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}
