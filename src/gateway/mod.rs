//! Axum-based HTTP gateway.
//!
//! Transport-level request validation (body shape, size limits, timeouts)
//! lives here; the auth core below sees only well-formed inputs. Handlers
//! map the core's error kinds onto statuses: 400 malformed body, 401
//! missing/invalid/expired token, 403 mismatched credentials or non-owner
//! access, 404 absent resource, 409 duplicate email.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::auth::{identity, ownership, AuthError, AuthService, PasswordHasher, TokenIssuer};
use crate::bookmarks::{BookmarkPatch, NewBookmark};
use crate::config::Config;
use crate::store::{
    Account, BookmarkStore, CredentialStore, ProfileUpdate, SqliteStore, StoreError,
};

/// Maximum request body size (64KB) — prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub issuer: Arc<TokenIssuer>,
    pub accounts: Arc<dyn CredentialStore>,
    pub bookmarks: Arc<dyn BookmarkStore>,
}

/// Run the HTTP gateway until the process is stopped.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;
    let db_path = config.data_dir.join("markstash.db");
    let store = Arc::new(SqliteStore::open(&db_path)?);
    tracing::info!("store initialized at {}", db_path.display());

    let issuer = Arc::new(TokenIssuer::new(
        &config.auth.token_secret,
        config.auth.token_ttl_minutes,
    ));
    let auth = Arc::new(AuthService::new(
        PasswordHasher::new(),
        Arc::clone(&issuer),
        store.clone() as Arc<dyn CredentialStore>,
    )?);

    let state = AppState {
        auth,
        issuer,
        accounts: store.clone() as Arc<dyn CredentialStore>,
        bookmarks: store as Arc<dyn BookmarkStore>,
    };
    let app = build_router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("markstash listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolve when the process receives ctrl-c, letting in-flight requests
/// drain before the server exits.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            // Without a handler we can still serve; just never shut down early.
            tracing::error!("cannot listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}

/// Build the application router. Separate from [`run_gateway`] so tests
/// can drive it without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/auth/signup", post(handle_signup))
        .route("/api/auth/signin", post(handle_signin))
        .route("/api/users/me", get(handle_me))
        .route("/api/users/me", patch(handle_me_update))
        .route("/api/bookmarks", get(handle_bookmark_list))
        .route("/api/bookmarks", post(handle_bookmark_create))
        .route("/api/bookmarks/{id}", get(handle_bookmark_get))
        .route("/api/bookmarks/{id}", patch(handle_bookmark_update))
        .route("/api/bookmarks/{id}", delete(handle_bookmark_delete))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
}

// ══════════════════════════════════════════════════════════════════════════════
// HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// Concrete return type for handlers (avoids `impl IntoResponse` inference issues).
type ApiResponse = (StatusCode, Json<serde_json::Value>);

#[derive(Deserialize)]
struct CredentialsBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct ProfileBody {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Unwrap a JSON body extraction, or produce the 400 it deserves.
fn require_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiResponse> {
    match body {
        Ok(Json(inner)) => Ok(inner),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": format!("Invalid request: {e}")})),
        )),
    }
}

/// Resolve the caller's identity, or produce the single opaque 401 used
/// for every authentication failure.
fn require_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<identity::Identity, ApiResponse> {
    identity::resolve(headers, &state.issuer).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Unauthorized"})),
        )
    })
}

fn bad_request(message: &str) -> ApiResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": message})),
    )
}

fn internal_error(err: &dyn std::fmt::Display) -> ApiResponse {
    tracing::error!("internal error: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
}

fn credentials_valid(body: &CredentialsBody) -> bool {
    !body.email.trim().is_empty() && body.email.contains('@') && !body.password.is_empty()
}

fn account_json(account: &Account) -> serde_json::Value {
    // The password hash never leaves the store layer in a response.
    serde_json::json!({
        "id": account.id,
        "email": account.email,
        "first_name": account.first_name,
        "last_name": account.last_name,
        "created_at": account.created_at,
    })
}

/// GET /health — always public.
async fn handle_health() -> ApiResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// POST /api/auth/signup — create an account, returning an access token.
async fn handle_signup(
    State(state): State<AppState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> ApiResponse {
    let body = match require_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if !credentials_valid(&body) {
        return bad_request("email and password are required");
    }

    match state.auth.signup(body.email.trim(), &body.password).await {
        Ok(token) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "status": "created",
                "access_token": token,
            })),
        ),
        Err(AuthError::CredentialsTaken) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "Credentials taken"})),
        ),
        Err(e) => internal_error(&e),
    }
}

/// POST /api/auth/signin — authenticate, returning an access token.
async fn handle_signin(
    State(state): State<AppState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> ApiResponse {
    let body = match require_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if !credentials_valid(&body) {
        return bad_request("email and password are required");
    }

    match state.auth.signin(body.email.trim(), &body.password).await {
        Ok(token) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "access_token": token,
            })),
        ),
        // Unknown email and wrong password produce this same response.
        Err(AuthError::CredentialsMismatch) => (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Credentials do not match"})),
        ),
        Err(e) => internal_error(&e),
    }
}

/// GET /api/users/me — profile of the authenticated account.
async fn handle_me(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let identity = match require_identity(&state, &headers) {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match state.accounts.get_account(&identity.user_id) {
        Ok(Some(account)) => (StatusCode::OK, Json(account_json(&account))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Account not found"})),
        ),
        Err(e) => internal_error(&e),
    }
}

/// PATCH /api/users/me — edit profile fields.
async fn handle_me_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ProfileBody>, JsonRejection>,
) -> ApiResponse {
    let identity = match require_identity(&state, &headers) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    let body = match require_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if let Some(email) = &body.email {
        if email.trim().is_empty() || !email.contains('@') {
            return bad_request("email must be a valid address");
        }
    }

    let update = ProfileUpdate {
        email: body.email.map(|e| e.trim().to_string()),
        first_name: body.first_name,
        last_name: body.last_name,
    };
    match state.accounts.update_profile(&identity.user_id, &update) {
        Ok(account) => (StatusCode::OK, Json(account_json(&account))),
        Err(StoreError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "Email already in use"})),
        ),
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Account not found"})),
        ),
        Err(e) => internal_error(&e),
    }
}

/// Load a bookmark and enforce ownership in one step: 404 when the id
/// does not exist, 403 when it exists but belongs to someone else.
fn load_owned(
    state: &AppState,
    identity: &identity::Identity,
    id: &str,
) -> Result<crate::bookmarks::Bookmark, ApiResponse> {
    match state.bookmarks.get_bookmark(id) {
        Ok(Some(bookmark)) => match ownership::authorize(identity, &bookmark.owner_id) {
            Ok(()) => Ok(bookmark),
            Err(_) => Err((
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": "Forbidden"})),
            )),
        },
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Bookmark not found"})),
        )),
        Err(e) => Err(internal_error(&e)),
    }
}

/// POST /api/bookmarks — create a bookmark owned by the caller.
async fn handle_bookmark_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewBookmark>, JsonRejection>,
) -> ApiResponse {
    let identity = match require_identity(&state, &headers) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    let body = match require_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if body.title.trim().is_empty() || body.link.trim().is_empty() {
        return bad_request("title and link are required");
    }

    match state.bookmarks.create_bookmark(&identity.user_id, &body) {
        Ok(bookmark) => (
            StatusCode::CREATED,
            Json(serde_json::to_value(bookmark).unwrap_or_default()),
        ),
        Err(e) => internal_error(&e),
    }
}

/// GET /api/bookmarks — list the caller's bookmarks.
async fn handle_bookmark_list(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let identity = match require_identity(&state, &headers) {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match state.bookmarks.list_bookmarks(&identity.user_id) {
        Ok(bookmarks) => (
            StatusCode::OK,
            Json(serde_json::to_value(bookmarks).unwrap_or_default()),
        ),
        Err(e) => internal_error(&e),
    }
}

/// GET /api/bookmarks/{id}
async fn handle_bookmark_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResponse {
    let identity = match require_identity(&state, &headers) {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match load_owned(&state, &identity, &id) {
        Ok(bookmark) => (
            StatusCode::OK,
            Json(serde_json::to_value(bookmark).unwrap_or_default()),
        ),
        Err(resp) => resp,
    }
}

/// PATCH /api/bookmarks/{id}
async fn handle_bookmark_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<BookmarkPatch>, JsonRejection>,
) -> ApiResponse {
    let identity = match require_identity(&state, &headers) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    let patch = match require_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let bookmark = match load_owned(&state, &identity, &id) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if patch.is_empty() {
        return (
            StatusCode::OK,
            Json(serde_json::to_value(bookmark).unwrap_or_default()),
        );
    }

    match state.bookmarks.update_bookmark(&id, &patch) {
        Ok(updated) => (
            StatusCode::OK,
            Json(serde_json::to_value(updated).unwrap_or_default()),
        ),
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Bookmark not found"})),
        ),
        Err(e) => internal_error(&e),
    }
}

/// DELETE /api/bookmarks/{id} — 204 on success.
async fn handle_bookmark_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let identity = match require_identity(&state, &headers) {
        Ok(i) => i,
        Err(resp) => return resp.into_response(),
    };

    if let Err(resp) = load_owned(&state, &identity, &id) {
        return resp.into_response();
    }

    match state.bookmarks.delete_bookmark(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Bookmark not found"})),
        )
            .into_response(),
        Err(e) => internal_error(&e).into_response(),
    }
}
