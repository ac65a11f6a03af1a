use super::auth::AuthedUser;
use super::{ApiError, ApiResult, AppState};
use crate::locations::{LocationService, LocationView, ShareLocationInput};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

fn location_service(state: &AppState) -> LocationService {
    LocationService::new(state.store.clone(), state.events.clone())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShareAck {
    alerted: usize,
}

pub(crate) async fn list_locations_handler(
    State(state): State<AppState>,
    user: AuthedUser,
) -> ApiResult<Vec<LocationView>> {
    let others = location_service(&state).list_others(&user.id)?;
    Ok(Json(others))
}

/// The sharer only learns how many neighbors were alerted; the alerts
/// themselves go out over the location stream.
pub(crate) async fn share_location_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(payload): Json<ShareLocationInput>,
) -> ApiResult<ShareAck> {
    let alerts = location_service(&state).share(&user.author(), payload)?;
    Ok(Json(ShareAck {
        alerted: alerts.len(),
    }))
}

pub(crate) async fn stop_sharing_handler(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<StatusCode, ApiError> {
    location_service(&state).stop_sharing(&user.id)?;
    Ok(StatusCode::OK)
}
