use super::{ApiResult, AppState};
use crate::contacts::EmergencyContact;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize)]
pub(crate) struct ContactsParams {
    category: Option<String>,
    q: Option<String>,
}

/// The hotline directory stays reachable without a session; dialing for
/// help should never sit behind a login screen.
pub(crate) async fn list_contacts_handler(
    State(state): State<AppState>,
    Query(params): Query<ContactsParams>,
) -> ApiResult<Vec<EmergencyContact>> {
    let contacts = state
        .contacts
        .list_filtered(params.category.as_deref(), params.q.as_deref())?;
    Ok(Json(contacts))
}
