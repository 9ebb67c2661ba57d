use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{board_from, load_visible_post};
use crate::api::{CommentLikeStatus, CommentRef, LikeStatus};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Json, MaybeUser, Path};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/{board}/{id}/like", get(like_status).post(toggle_like))
        .route("/api/{board}/{id}/comments/like", post(toggle_comment_like))
}

/// GET /api/{board}/{id}/like: anonymous viewers see `liked: false`.
async fn like_status(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((board, id)): Path<(String, i64)>,
) -> AppResult<Json<LikeStatus>> {
    let board = board_from(&board)?;
    let conn = state.db.get()?;
    let post = load_visible_post(&conn, board, id, user.as_ref())?;

    let liked = match &user {
        Some(u) => has_liked_post(&conn, id, &u.id)?,
        None => false,
    };

    Ok(Json(LikeStatus {
        liked,
        like_count: post.like_count,
    }))
}

async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
) -> AppResult<Json<LikeStatus>> {
    let board = board_from(&board)?;
    let mut conn = state.db.get()?;
    load_visible_post(&conn, board, id, Some(&user))?;

    // One like per user: the join table row is the source of truth and
    // like_count is recomputed from it inside the same transaction.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let liked = if has_liked_post(&tx, id, &user.id)? {
        tx.execute(
            "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            params![id, user.id],
        )?;
        false
    } else {
        tx.execute(
            "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
            params![id, user.id],
        )?;
        true
    };
    tx.execute(
        "UPDATE posts SET like_count = (SELECT COUNT(*) FROM post_likes WHERE post_id = ?1) WHERE id = ?1",
        params![id],
    )?;
    let like_count: i64 = tx.query_row(
        "SELECT like_count FROM posts WHERE id = ?1",
        params![id],
        |r| r.get(0),
    )?;
    tx.commit()?;

    tracing::debug!(post_id = id, user = %user.username, liked, "post like toggled");
    Ok(Json(LikeStatus { liked, like_count }))
}

/// POST /api/{board}/{id}/comments/like with `{commentId}`.
async fn toggle_comment_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
    Json(body): Json<CommentRef>,
) -> AppResult<Json<CommentLikeStatus>> {
    let board = board_from(&board)?;
    let mut conn = state.db.get()?;
    load_visible_post(&conn, board, id, Some(&user))?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let on_post: Option<i64> = tx
        .query_row(
            "SELECT post_id FROM comments WHERE id = ?1",
            params![body.comment_id],
            |r| r.get(0),
        )
        .optional()?;
    if on_post != Some(id) {
        return Err(AppError::NotFound);
    }

    let already: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
        params![body.comment_id, user.id],
        |r| r.get(0),
    )?;
    if already {
        tx.execute(
            "DELETE FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
            params![body.comment_id, user.id],
        )?;
    } else {
        tx.execute(
            "INSERT INTO comment_likes (comment_id, user_id) VALUES (?1, ?2)",
            params![body.comment_id, user.id],
        )?;
    }
    tx.execute(
        "UPDATE comments SET like_count = (SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1) WHERE id = ?1",
        params![body.comment_id],
    )?;
    let like_count: i64 = tx.query_row(
        "SELECT like_count FROM comments WHERE id = ?1",
        params![body.comment_id],
        |r| r.get(0),
    )?;
    tx.commit()?;

    Ok(Json(CommentLikeStatus {
        comment_id: body.comment_id,
        liked: !already,
        like_count,
    }))
}

fn has_liked_post(conn: &Connection, post_id: i64, user_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user_id],
        |r| r.get(0),
    )
}
