use std::collections::HashSet;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use rusqlite::params;
use serde::Deserialize;

use super::{board_from, can_manage, clean_text, load_post, load_visible_post};
use crate::api::{EditPost, Message, NewPost, PostEnvelope, PostPage};
use crate::db::models::Post;
use crate::domain::{Board, PostStatus};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Json, MaybeUser, Path, Query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/{board}", get(list_posts).post(create_post))
        .route(
            "/api/{board}/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

/// GET /api/{board}: newest published and closed posts, one page at a time.
async fn list_posts(
    State(state): State<AppState>,
    Path(board): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PostPage>> {
    let board = board_from(&board)?;
    let portal = &state.config.portal;
    let page = query.page.unwrap_or(1).max(1);
    // Tolerates a zero ceiling from configs that skipped validation
    let per_page = query
        .per_page
        .unwrap_or(portal.page_size)
        .max(1)
        .min(portal.max_page_size.max(1));
    let offset = i64::from(page - 1) * i64::from(per_page);

    let conn = state.db.get()?;
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE board = ?1 AND status != 'draft'",
        params![board.as_str()],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.board = ?1 AND p.status != 'draft' \
         ORDER BY p.created_at DESC, p.id DESC LIMIT ?2 OFFSET ?3",
        Post::SELECT
    ))?;
    let posts = stmt
        .query_map(params![board.as_str(), per_page, offset], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(PostPage {
        posts,
        total,
        page,
        per_page,
    }))
}

/// GET /api/{board}/{id}
async fn get_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((board, id)): Path<(String, i64)>,
) -> AppResult<Json<PostEnvelope>> {
    let board = board_from(&board)?;
    let conn = state.db.get()?;
    let post = load_visible_post(&conn, board, id, user.as_ref())?;
    Ok(Json(PostEnvelope {
        post,
        message: None,
    }))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(board): Path<String>,
    Json(body): Json<NewPost>,
) -> AppResult<impl IntoResponse> {
    let board = board_from(&board)?;
    let portal = &state.config.portal;
    let title = clean_text(&body.title, "Title", portal.max_title_len)?;
    let content = clean_text(&body.content, "Content", portal.max_post_len)?;
    let vote_options = clean_vote_options(&body.vote_options)?;

    if body.vote_deadline.is_some() && vote_options.is_empty() {
        return Err(AppError::BadRequest(
            "A vote deadline needs vote options".into(),
        ));
    }
    if let Some(deadline) = body.vote_deadline {
        if deadline <= Utc::now() {
            return Err(AppError::BadRequest(
                "Vote deadline must be in the future".into(),
            ));
        }
    }
    if let Some(max) = body.max_participants {
        if board != Board::Activity {
            return Err(AppError::BadRequest(
                "Only activities take participants".into(),
            ));
        }
        if max < 1 {
            return Err(AppError::BadRequest(
                "Participant limit must be at least 1".into(),
            ));
        }
    }

    let status = body.status.unwrap_or(PostStatus::Published);
    let conn = state.db.get()?;
    conn.execute(
        "INSERT INTO posts (board, title, content, author_id, status, vote_options, vote_deadline, max_participants)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            board.as_str(),
            title,
            content,
            user.id,
            status.as_str(),
            serde_json::to_string(&vote_options)?,
            body.vote_deadline.map(|d| d.to_rfc3339()),
            body.max_participants,
        ],
    )?;
    let id = conn.last_insert_rowid();
    let post = load_post(&conn, board, id)?;

    tracing::info!(post_id = id, board = %board, author = %user.username, "post created");

    Ok((
        StatusCode::CREATED,
        Json(PostEnvelope {
            post,
            message: Some("Post published".into()),
        }),
    ))
}

async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
    Json(body): Json<EditPost>,
) -> AppResult<Json<PostEnvelope>> {
    let board = board_from(&board)?;
    let portal = &state.config.portal;
    let title = clean_text(&body.title, "Title", portal.max_title_len)?;
    let content = clean_text(&body.content, "Content", portal.max_post_len)?;

    let conn = state.db.get()?;
    let post = load_post(&conn, board, id)?;
    if post.author_id != user.id {
        return Err(AppError::Forbidden);
    }

    conn.execute(
        "UPDATE posts SET title = ?1, content = ?2, updated_at = datetime('now') WHERE id = ?3",
        params![title, content, id],
    )?;

    Ok(Json(PostEnvelope {
        post: load_post(&conn, board, id)?,
        message: Some("Post updated".into()),
    }))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
) -> AppResult<Json<Message>> {
    let board = board_from(&board)?;
    let conn = state.db.get()?;
    let post = load_post(&conn, board, id)?;
    if !can_manage(Some(&user), &post.author_id) {
        return Err(AppError::Forbidden);
    }

    conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    tracing::info!(post_id = id, by = %user.username, "post deleted");
    Ok(Json(Message::new("Post deleted")))
}

/// Trims options and rejects blanks and duplicates. A poll needs two choices.
fn clean_vote_options(options: &[String]) -> AppResult<Vec<String>> {
    let cleaned: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
    if cleaned.is_empty() {
        return Ok(cleaned);
    }
    if cleaned.iter().any(String::is_empty) {
        return Err(AppError::BadRequest("Vote options cannot be empty".into()));
    }
    let unique: HashSet<&str> = cleaned.iter().map(String::as_str).collect();
    if unique.len() != cleaned.len() {
        return Err(AppError::BadRequest("Vote options must be unique".into()));
    }
    if cleaned.len() < 2 {
        return Err(AppError::BadRequest(
            "A vote needs at least two options".into(),
        ));
    }
    Ok(cleaned)
}
