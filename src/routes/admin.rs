use axum::extract::State;
use axum::routing::{get, put};
use axum::Router;
use rusqlite::{params, OptionalExtension};

use crate::api::{BoardCount, PostEnvelope, SiteStats, StatusChange};
use crate::db::models::Post;
use crate::domain::Board;
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, Json, Path};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/posts/{id}/status", put(set_post_status))
}

/// GET /api/admin/stats
async fn stats(State(state): State<AppState>, AdminUser(_): AdminUser) -> AppResult<Json<SiteStats>> {
    let conn = state.db.get()?;
    let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |r| r.get(0)) };

    let mut boards = Vec::with_capacity(Board::ALL.len());
    for board in Board::ALL {
        let posts: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE board = ?1",
            params![board.as_str()],
            |r| r.get(0),
        )?;
        boards.push(BoardCount { board, posts });
    }

    Ok(Json(SiteStats {
        users: count("SELECT COUNT(*) FROM users")?,
        boards,
        comments: count("SELECT COUNT(*) FROM comments")?,
        votes: count("SELECT COUNT(*) FROM votes")?,
        participations: count(
            "SELECT COUNT(*) FROM participants WHERE status IN ('registered', 'attended')",
        )?,
    }))
}

/// PUT /api/admin/posts/{id}/status: publish, hide (draft) or close any post.
async fn set_post_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<StatusChange>,
) -> AppResult<Json<PostEnvelope>> {
    let conn = state.db.get()?;
    let changed = conn.execute(
        "UPDATE posts SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![body.status.as_str(), id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound);
    }

    let post = conn
        .query_row(
            &format!("{} WHERE p.id = ?1", Post::SELECT),
            params![id],
            Post::from_row,
        )
        .optional()?
        .ok_or(AppError::NotFound)?;

    tracing::info!(post_id = id, status = body.status.as_str(), by = %admin.username, "post moderated");

    Ok(Json(PostEnvelope {
        post,
        message: Some(format!("Post is now {}", body.status.as_str())),
    }))
}
