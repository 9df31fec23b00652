use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::store::operations::phrases::Phrase;
use crate::store::operations::progress::{LearningProgress, LearningStage};
use crate::store::{Store, StoreError};

/// Stage restriction for a practice session. `All` means every stage still
/// being learned; mastered phrases are only picked when asked for
/// explicitly, which keeps them available for occasional review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFilter {
    All,
    Only(LearningStage),
}

impl StageFilter {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("") | Some("all") => Some(StageFilter::All),
            Some(other) => LearningStage::parse(other).map(StageFilter::Only),
        }
    }

    fn matches(&self, stage: LearningStage) -> bool {
        match self {
            StageFilter::All => stage != LearningStage::Mastered,
            StageFilter::Only(wanted) => stage == *wanted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PracticeFilters {
    pub stage: StageFilter,
    pub language_code: Option<String>,
    pub due_only: bool,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub progress: LearningProgress,
    pub phrase: Phrase,
}

/// The filtered candidate set in session order: most overdue first, then
/// least practiced, then phrase id for a stable tie-break. The whole
/// selection is deterministic so position/total line up with next_phrase.
pub fn candidates(
    store: &Store,
    user_id: &str,
    filters: &PracticeFilters,
    now: DateTime<Utc>,
) -> Result<Vec<Candidate>, StoreError> {
    let rows = if filters.due_only {
        store.list_due_progress(user_id, now)?
    } else {
        store.list_learning_progress(user_id)?
    };

    let mut matched = Vec::new();
    for progress in rows {
        if !filters.stage.matches(progress.stage) {
            continue;
        }
        // The due index already enforces this; re-checked so the property
        // holds regardless of which branch produced the rows.
        if filters.due_only && !progress.is_due(now) {
            continue;
        }
        let Some(phrase) = store.get_phrase(&progress.phrase_id)? else {
            continue;
        };
        if !phrase.is_quizzable {
            continue;
        }
        if let Some(lang) = &filters.language_code {
            if &phrase.language_code != lang {
                continue;
            }
        }
        matched.push(Candidate { progress, phrase });
    }

    matched.sort_by(|a, b| {
        a.progress
            .next_review_date
            .cmp(&b.progress.next_review_date)
            .then(a.progress.times_reviewed.cmp(&b.progress.times_reviewed))
            .then(a.phrase.id.cmp(&b.phrase.id))
    });

    Ok(matched)
}

/// The next phrase to quiz, honoring the session's exclusion set.
/// `None` means the session is exhausted, not that nothing exists; callers
/// disambiguate with `total_matching`.
pub fn next_phrase(
    store: &Store,
    user_id: &str,
    filters: &PracticeFilters,
    exclude_phrase_ids: &HashSet<String>,
    now: DateTime<Utc>,
) -> Result<Option<Candidate>, StoreError> {
    let all = candidates(store, user_id, filters, now)?;
    Ok(all
        .into_iter()
        .find(|c| !exclude_phrase_ids.contains(&c.phrase.id)))
}

pub fn total_matching(
    store: &Store,
    user_id: &str,
    filters: &PracticeFilters,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    Ok(candidates(store, user_id, filters, now)?.len() as u64)
}

/// 1-based rank of the phrase within the deterministic ordering, for
/// "question N of M" indicators.
pub fn position_of(
    store: &Store,
    user_id: &str,
    phrase_id: &str,
    filters: &PracticeFilters,
    now: DateTime<Utc>,
) -> Result<Option<u64>, StoreError> {
    let all = candidates(store, user_id, filters, now)?;
    Ok(all
        .iter()
        .position(|c| c.phrase.id == phrase_id)
        .map(|idx| idx as u64 + 1))
}
