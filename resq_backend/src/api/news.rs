use super::auth::AuthedUser;
use super::{ApiError, ApiResult, AppState};
use crate::news::NewsResponse;
use axum::extract::State;
use axum::Json;

/// Proxied so the provider key never reaches a client. Provider failures
/// surface as 502 with the cause in the message; there is no retry and
/// no cached fallback.
pub(crate) async fn latest_news_handler(
    State(state): State<AppState>,
    _user: AuthedUser,
) -> ApiResult<NewsResponse> {
    match state.news.latest().await {
        Ok(response) => Ok(Json(response)),
        Err(err) => Err(ApiError::Upstream(format!("Failed to fetch news: {err}"))),
    }
}
