#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rusqlite::params;
use serde_json::Value;
use tower::ServiceExt;

use clubhub::auth::session;
use clubhub::config::Config;
use clubhub::db;
use clubhub::routes;
use clubhub::state::AppState;

pub fn test_state() -> AppState {
    let pool = db::create_memory_pool().expect("memory pool");
    db::run_migrations(&pool).expect("migrations");
    AppState {
        db: pool,
        config: Config::default(),
    }
}

pub fn test_app() -> (AppState, Router) {
    let state = test_state();
    let app = routes::app(state.clone());
    (state, app)
}

/// Inserts a user and returns `(user_id, session_token)`.
pub fn seed_user(state: &AppState, username: &str, is_admin: bool) -> (String, String) {
    let conn = state.db.get().unwrap();
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, username, is_admin) VALUES (?1, ?2, ?3)",
        params![id, username, is_admin],
    )
    .unwrap();
    let token = session::create_session(&conn, &id, 1).unwrap();
    (id, token)
}

/// Inserts a post directly, bypassing request validation.
pub fn seed_post(
    state: &AppState,
    author_id: &str,
    board: &str,
    vote_options: &[&str],
    vote_deadline: Option<&str>,
    max_participants: Option<i64>,
) -> i64 {
    let conn = state.db.get().unwrap();
    conn.execute(
        "INSERT INTO posts (board, title, content, author_id, vote_options, vote_deadline, max_participants)
         VALUES (?1, 'Title', 'Body', ?2, ?3, ?4, ?5)",
        params![
            board,
            author_id,
            serde_json::to_string(vote_options).unwrap(),
            vote_deadline,
            max_participants
        ],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
