use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::quiz::scheduler::StageFilter;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::progress::LearningProgress;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_progress))
        .route("/stats", get(stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressQuery {
    stage: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRow {
    #[serde(flatten)]
    progress: LearningProgress,
    phrase_text: Option<String>,
    language_code: Option<String>,
}

async fn list_progress(
    auth: AuthUser,
    Query(q): Query<ProgressQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let stage = match q.stage.as_deref() {
        None => None,
        Some(raw) => Some(StageFilter::parse(Some(raw)).ok_or_else(|| {
            AppError::bad_request(
                "VALIDATION_ERROR",
                "stage must be one of new, recognition, production, mastered or all",
            )
        })?),
    };

    let mut rows = Vec::new();
    for progress in state.store().list_learning_progress(&auth.user_id)? {
        if let Some(StageFilter::Only(wanted)) = stage {
            if progress.stage != wanted {
                continue;
            }
        }
        let phrase = state.store().get_phrase(&progress.phrase_id)?;
        rows.push(ProgressRow {
            phrase_text: phrase.as_ref().map(|p| p.text.clone()),
            language_code: phrase.map(|p| p.language_code),
            progress,
        });
    }
    rows.sort_by(|a, b| {
        a.progress
            .next_review_date
            .cmp(&b.progress.next_review_date)
            .then(a.progress.phrase_id.cmp(&b.progress.phrase_id))
    });

    Ok(ok(rows))
}

async fn stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let stats = state.store().get_stage_stats(&auth.user_id)?;
    Ok(ok(stats))
}
