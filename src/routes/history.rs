use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::response::{ok, paginated, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(attempt_history))
        .route("/searches", get(search_history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageQuery {
    page: Option<u64>,
    per_page: Option<u64>,
}

impl PageQuery {
    fn resolve(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (page, per_page)
    }
}

/// Quiz attempts, newest first. Includes ungraded (skipped) attempts.
async fn attempt_history(
    auth: AuthUser,
    Query(q): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let (page, per_page) = q.resolve();
    let offset = ((page - 1) * per_page) as usize;

    let attempts = state
        .store()
        .list_user_attempts(&auth.user_id, per_page as usize, offset)?;
    let total = state.store().count_user_attempts(&auth.user_id)?;

    Ok(paginated(attempts, total, page, per_page))
}

async fn search_history(
    auth: AuthUser,
    Query(q): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let (page, per_page) = q.resolve();
    let offset = ((page - 1) * per_page) as usize;

    let searches = state
        .store()
        .list_user_searches(&auth.user_id, per_page as usize, offset)?;
    Ok(ok(searches))
}
