use super::auth::AuthedUser;
use super::{ApiError, ApiResult, AppState};
use crate::posts::{
    CommentView, CreatePostInput, FeedPage, PostService, PostView, UpdatePostInput,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

fn post_service(state: &AppState) -> PostService {
    PostService::new(state.store.clone(), state.events.clone())
}

#[derive(Deserialize)]
pub(crate) struct FeedParams {
    page: Option<usize>,
}

pub(crate) async fn feed_handler(
    State(state): State<AppState>,
    _user: AuthedUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<FeedPage> {
    let page = post_service(&state).feed_page(params.page.unwrap_or(1))?;
    Ok(Json(page))
}

pub(crate) async fn create_post_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(payload): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let post = post_service(&state).create_post(&user.author(), payload)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub(crate) async fn get_post_handler(
    State(state): State<AppState>,
    _user: AuthedUser,
    Path(id): Path<String>,
) -> ApiResult<PostView> {
    match post_service(&state).get_post(&id)? {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::NotFound(format!("post {id} not found"))),
    }
}

pub(crate) async fn update_post_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostInput>,
) -> Result<StatusCode, ApiError> {
    post_service(&state).update_post(&id, &user.id, payload)?;
    Ok(StatusCode::OK)
}

pub(crate) async fn delete_post_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    post_service(&state).delete_post(&id, &user.id)?;
    Ok(StatusCode::OK)
}

pub(crate) async fn toggle_like_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    post_service(&state).toggle_like(&id, &user.id)?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
pub(crate) struct CommentTextInput {
    text: String,
}

pub(crate) async fn add_comment_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
    Json(payload): Json<CommentTextInput>,
) -> Result<Response, ApiError> {
    match post_service(&state).add_comment(&id, &user.author(), payload.text)? {
        Some(comment) => Ok((StatusCode::CREATED, Json(comment)).into_response()),
        // the post is gone; the write disappears with it
        None => Ok(StatusCode::OK.into_response()),
    }
}

pub(crate) async fn edit_comment_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Path((id, comment_id)): Path<(String, String)>,
    Json(payload): Json<CommentTextInput>,
) -> Result<StatusCode, ApiError> {
    post_service(&state).edit_comment(&id, &comment_id, &user.id, payload.text)?;
    Ok(StatusCode::OK)
}

/// Removal matches the submitted comment by full value, so a client
/// holding an outdated copy deletes nothing and still gets 200.
pub(crate) async fn remove_comment_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
    Json(payload): Json<CommentView>,
) -> Result<StatusCode, ApiError> {
    post_service(&state).remove_comment(&id, &user.id, payload)?;
    Ok(StatusCode::OK)
}
