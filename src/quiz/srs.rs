use chrono::{DateTime, Duration, Utc};

use crate::config::SrsConfig;
use crate::store::operations::progress::{LearningProgress, LearningStage};

/// Outcome of applying one graded answer to a progress record.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub progress: LearningProgress,
    pub stage_advanced: bool,
    pub stage_regressed: bool,
}

/// Spaced-repetition update: growing interval on success, reset to one day
/// on failure, threshold-driven stage transitions. Pure; persistence is the
/// caller's problem.
pub fn apply_review(
    progress: &LearningProgress,
    was_correct: bool,
    config: &SrsConfig,
    now: DateTime<Utc>,
) -> ReviewOutcome {
    let mut next = progress.clone();
    let mut stage_advanced = false;
    let mut stage_regressed = false;

    next.times_reviewed += 1;
    next.last_reviewed_at = Some(now);
    next.updated_at = now;

    if was_correct {
        next.times_correct += 1;
        next.consecutive_correct += 1;
        next.consecutive_incorrect = 0;

        next.interval_days = grow_interval(progress.interval_days, config);

        if next.stage != LearningStage::Mastered
            && next.consecutive_correct >= config.advance_threshold
        {
            next.stage = next.stage.advanced();
            next.consecutive_correct = 0;
            stage_advanced = true;
        }
    } else {
        next.times_incorrect += 1;
        next.consecutive_incorrect += 1;
        next.consecutive_correct = 0;

        next.interval_days = config.min_interval_days.max(1);

        if config.regression_enabled
            && next.stage != LearningStage::New
            && next.consecutive_incorrect >= config.regression_threshold
        {
            next.stage = next.stage.regressed();
            next.consecutive_incorrect = 0;
            stage_regressed = true;
        }
    }

    next.next_review_date = now + Duration::days(i64::from(next.interval_days));

    ReviewOutcome {
        progress: next,
        stage_advanced,
        stage_regressed,
    }
}

fn grow_interval(current_days: u32, config: &SrsConfig) -> u32 {
    let grown = (f64::from(current_days.max(1)) * config.growth_factor).round();
    let capped = grown.clamp(1.0, f64::from(u32::MAX));
    (capped as u32).max(config.min_interval_days.max(1))
}
