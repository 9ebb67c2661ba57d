use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use rusqlite::{params, OptionalExtension};
use serde_json::json;

use crate::api::{AuthResponse, Credentials, Message};
use crate::auth::{clear_session_cookie, password, session, session_cookie, session_token};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Json};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

/// POST /api/auth/register: create an account and start a session.
async fn register(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> AppResult<Response> {
    let username = validate_username(&creds.username)?;
    if creds.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let hash = password::hash(&creds.password)
        .map_err(|e| AppError::Internal(format!("password hash failed: {}", e)))?;
    let display_name = creds
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let is_admin = state.config.is_admin_username(&username);

    let conn = state.db.get()?;
    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![username],
        |r| r.get(0),
    )?;
    if taken {
        return Err(AppError::Conflict("Username is already taken".into()));
    }

    let user_id = uuid::Uuid::now_v7().to_string();
    insert_user(&conn, &user_id, &username, display_name, &hash, is_admin)?;
    tracing::info!(user = %username, is_admin, "user registered");

    let user = load_user(&conn, &user_id)?;
    start_session(&state, &conn, user, StatusCode::CREATED, "Welcome aboard")
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let row: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE username = ?1",
            params![creds.username.trim()],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    let user_id = match row {
        Some((id, Some(hash))) if password::verify(&creds.password, &hash) => id,
        _ => {
            tracing::warn!(user = %creds.username, "failed login");
            return Err(AppError::Unauthorized);
        }
    };

    let user = load_user(&conn, &user_id)?;
    start_session(&state, &conn, user, StatusCode::OK, "Signed in")
}

/// POST /api/auth/logout: always succeeds and clears the cookie.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = session_token(&headers, cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(cookie_name))],
        Json(Message::new("Signed out")),
    )
        .into_response())
}

/// GET /api/auth/me
async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let user = load_user(&conn, &user.id)?;
    Ok(Json(json!({ "user": user })))
}

fn start_session(
    state: &AppState,
    conn: &rusqlite::Connection,
    user: User,
    status: StatusCode,
    message: &str,
) -> AppResult<Response> {
    let auth = &state.config.auth;
    let token = session::create_session(conn, &user.id, auth.session_hours)?;
    let cookie = session_cookie(&auth.cookie_name, &token, auth.session_hours);

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user,
            token,
            message: message.to_string(),
        }),
    )
        .into_response())
}

/// A concurrent registration can still win the race after the lookup above;
/// the UNIQUE index turns that into the same 409.
fn insert_user(
    conn: &rusqlite::Connection,
    id: &str,
    username: &str,
    display_name: Option<&str>,
    password_hash: &str,
    is_admin: bool,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (id, username, display_name, password_hash, is_admin) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, username, display_name, password_hash, is_admin],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict("Username is already taken".into())
        }
        other => AppError::Database(other),
    })?;
    Ok(())
}

fn load_user(conn: &rusqlite::Connection, id: &str) -> AppResult<User> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![id],
        User::from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// 3 to 32 characters of ASCII letters, digits, `_`, `-` or `.`.
fn validate_username(raw: &str) -> AppResult<String> {
    let username = raw.trim();
    let valid_len = (3..=32).contains(&username.len());
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid_len || !valid_chars {
        return Err(AppError::BadRequest(
            "Username must be 3-32 letters, digits, '_', '-' or '.'".into(),
        ));
    }
    Ok(username.to_string())
}
