mod auth;
mod contacts;
mod locations;
mod news;
mod posts;
mod streams;

use crate::auth::AuthError;
use crate::config::ResqConfig;
use crate::contacts::ContactsCache;
use crate::events::EventHub;
use crate::news::NewsClient;
use crate::posts::PostError;
use crate::store::Store;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: ResqConfig,
    pub store: Store,
    pub events: EventHub,
    pub news: NewsClient,
    pub contacts: ContactsCache,
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Upstream(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse { message: msg }),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorResponse { message: msg })
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse { message: msg }),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse { message: msg }),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, ErrorResponse { message: msg }),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        message: "internal server error".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MalformedEmail | AuthError::WeakPassword | AuthError::EmailTaken => {
                ApiError::BadRequest(err.to_string())
            }
            AuthError::InvalidCredentials | AuthError::Unauthorized => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Internal(inner) => ApiError::Internal(inner),
        }
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::EmptyPost | PostError::EmptyComment => {
                ApiError::BadRequest(err.to_string())
            }
            PostError::NotPostAuthor | PostError::NotCommentAuthor => {
                ApiError::Forbidden(err.to_string())
            }
            PostError::Internal(inner) => ApiError::Internal(inner),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    version: &'static str,
    api_port: u16,
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        api_port: state.config.api_port,
    })
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "Port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "Could not find available port in range {}-{}",
        start_port,
        start_port + MAX_PORT_ATTEMPTS - 1
    )
}

pub async fn serve_http(
    config: ResqConfig,
    store: Store,
    events: EventHub,
    contacts: ContactsCache,
) -> Result<()> {
    let http_client = reqwest::Client::builder()
        .user_agent("ResQ/0.1.0")
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("failed to build shared HTTP client")?;
    let news = NewsClient::new(http_client, config.news.clone());

    let state = AppState {
        config: config.clone(),
        store,
        events,
        news,
        contacts,
    };

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/profile", put(auth::update_profile_handler))
        .route("/auth/delete", post(auth::request_deletion_handler))
        .route("/auth/reactivate", post(auth::reactivate_handler))
        .route("/feed", get(posts::feed_handler))
        .route("/feed/stream", get(streams::feed_stream_handler))
        .route("/posts", post(posts::create_post_handler))
        .route(
            "/posts/:id",
            get(posts::get_post_handler)
                .put(posts::update_post_handler)
                .delete(posts::delete_post_handler),
        )
        .route("/posts/:id/like", post(posts::toggle_like_handler))
        .route("/posts/:id/comments", post(posts::add_comment_handler))
        .route(
            "/posts/:id/comments/:comment_id",
            put(posts::edit_comment_handler),
        )
        .route(
            "/posts/:id/comments/remove",
            post(posts::remove_comment_handler),
        )
        .route("/contacts", get(contacts::list_contacts_handler))
        .route("/news", get(news::latest_news_handler))
        .route(
            "/locations",
            get(locations::list_locations_handler)
                .put(locations::share_location_handler)
                .delete(locations::stop_sharing_handler),
        )
        .route("/locations/stream", get(streams::locations_stream_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state.clone());

    // Try to bind to the configured port, or find the next available port
    let (listener, actual_port) = find_available_port(config.api_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != config.api_port {
        tracing::warn!(
            requested_port = config.api_port,
            actual_port = actual_port,
            "Configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
