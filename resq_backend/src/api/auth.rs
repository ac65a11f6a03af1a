use super::{ApiError, ApiResult, AppState};
use crate::auth::{
    resolve_display_name, AuthService, LoginInput, LoginOutcome, RegisterInput, SessionGrant,
    UserView,
};
use crate::posts::Author;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Session-backed identity, pulled from the `Authorization: Bearer` header.
/// An account waiting out its deletion grace period still authenticates;
/// only the login response carries the pending marker.
pub(crate) struct AuthedUser {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl AuthedUser {
    pub(crate) fn author(&self) -> Author {
        Author {
            id: self.id.clone(),
            name: resolve_display_name(self.display_name.as_deref(), &self.email),
        }
    }

    fn into_view(self) -> UserView {
        UserView {
            id: self.id,
            email: self.email,
            display_name: self.display_name,
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("not signed in".into()))?;
        let user = AuthService::new(state.store.clone()).authenticate(token)?;
        Ok(AuthedUser {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateProfileInput {
    display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeletionScheduledResponse {
    status: String,
    requested_at: i64,
    scheduled_permanent_deletion_at: i64,
}

pub(crate) async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<(StatusCode, Json<SessionGrant>), ApiError> {
    let grant = AuthService::new(state.store.clone()).register(payload)?;
    Ok((StatusCode::CREATED, Json(grant)))
}

pub(crate) async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> ApiResult<LoginOutcome> {
    let outcome = AuthService::new(state.store.clone()).login(payload)?;
    Ok(Json(outcome))
}

/// Dropping an unknown token is still a successful logout.
pub(crate) async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = bearer_token(&headers) {
        AuthService::new(state.store.clone()).logout(token)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn me_handler(user: AuthedUser) -> ApiResult<UserView> {
    Ok(Json(user.into_view()))
}

pub(crate) async fn update_profile_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(payload): Json<UpdateProfileInput>,
) -> ApiResult<UserView> {
    let updated =
        AuthService::new(state.store.clone()).update_profile(&user.id, payload.display_name)?;
    Ok(Json(updated))
}

pub(crate) async fn request_deletion_handler(
    State(state): State<AppState>,
    user: AuthedUser,
) -> ApiResult<DeletionScheduledResponse> {
    let record = AuthService::new(state.store.clone()).request_deletion(&user.id)?;
    Ok(Json(DeletionScheduledResponse {
        status: record.status,
        requested_at: record.requested_at,
        scheduled_permanent_deletion_at: record.scheduled_permanent_deletion_at,
    }))
}

pub(crate) async fn reactivate_handler(
    State(state): State<AppState>,
    user: AuthedUser,
) -> ApiResult<UserView> {
    AuthService::new(state.store.clone()).reactivate(&user.id)?;
    Ok(Json(user.into_view()))
}
