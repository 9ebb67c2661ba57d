use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use rusqlite::{params, Connection, OptionalExtension};

use super::{board_from, can_manage, clean_text, load_visible_post};
use crate::api::{CommentDeleted, CommentEnvelope, CommentList, CommentRef, EditComment, NewComment};
use crate::db::models::Comment;
use crate::domain::thread::check_parent;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Json, MaybeUser, Path};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/{board}/{id}/comments",
        get(list_comments)
            .post(create_comment)
            .put(edit_comment)
            .delete(delete_comment),
    )
}

/// GET: the flat list, oldest first. Callers partition it by `parent_id`.
async fn list_comments(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((board, id)): Path<(String, i64)>,
) -> AppResult<Json<CommentList>> {
    let board = board_from(&board)?;
    let conn = state.db.get()?;
    load_visible_post(&conn, board, id, user.as_ref())?;

    Ok(Json(CommentList {
        comments: query_comments(&conn, id)?,
    }))
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
    Json(body): Json<NewComment>,
) -> AppResult<impl IntoResponse> {
    let board = board_from(&board)?;
    let content = clean_text(&body.content, "Comment", state.config.portal.max_comment_len)?;

    let conn = state.db.get()?;
    load_visible_post(&conn, board, id, Some(&user))?;

    if let Some(parent_id) = body.parent_id {
        let parent_post: Option<i64> = conn
            .query_row(
                "SELECT post_id FROM comments WHERE id = ?1",
                params![parent_id],
                |r| r.get(0),
            )
            .optional()?;
        check_parent(id, parent_post)?;
    }

    conn.execute(
        "INSERT INTO comments (post_id, author_id, parent_id, content) VALUES (?1, ?2, ?3, ?4)",
        params![id, user.id, body.parent_id, content],
    )?;
    let comment = load_comment(&conn, conn.last_insert_rowid())?;

    tracing::info!(
        post_id = id,
        comment_id = comment.id,
        parent_id = ?comment.parent_id,
        author = %user.username,
        "comment created"
    );

    let message = if comment.parent_id.is_some() {
        "Reply posted"
    } else {
        "Comment posted"
    };
    Ok((
        StatusCode::CREATED,
        Json(CommentEnvelope {
            comment,
            message: message.into(),
        }),
    ))
}

/// PUT with `{commentId, content}`. Only the author may edit.
async fn edit_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
    Json(body): Json<EditComment>,
) -> AppResult<Json<CommentEnvelope>> {
    let board = board_from(&board)?;
    let content = clean_text(&body.content, "Comment", state.config.portal.max_comment_len)?;

    let conn = state.db.get()?;
    load_visible_post(&conn, board, id, Some(&user))?;
    let existing = load_comment_on(&conn, id, body.comment_id)?;
    if existing.author_id != user.id {
        return Err(AppError::Forbidden);
    }

    conn.execute(
        "UPDATE comments SET content = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![content, body.comment_id],
    )?;

    Ok(Json(CommentEnvelope {
        comment: load_comment(&conn, body.comment_id)?,
        message: "Comment updated".into(),
    }))
}

/// DELETE with `{commentId}`. Replies go with their parent.
async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
    Json(body): Json<CommentRef>,
) -> AppResult<Json<CommentDeleted>> {
    let board = board_from(&board)?;
    let conn = state.db.get()?;
    load_visible_post(&conn, board, id, Some(&user))?;
    let existing = load_comment_on(&conn, id, body.comment_id)?;
    if !can_manage(Some(&user), &existing.author_id) {
        return Err(AppError::Forbidden);
    }

    let removed = subtree_ids(&conn, body.comment_id)?;
    conn.execute("DELETE FROM comments WHERE id = ?1", params![body.comment_id])?;

    tracing::info!(
        post_id = id,
        comment_id = body.comment_id,
        removed = removed.len(),
        by = %user.username,
        "comment deleted"
    );

    Ok(Json(CommentDeleted {
        comment_id: body.comment_id,
        removed,
        message: "Comment deleted".into(),
    }))
}

// --- Query helpers ---

pub(crate) fn query_comments(conn: &Connection, post_id: i64) -> AppResult<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.id ASC",
        Comment::SELECT
    ))?;
    let comments = stmt
        .query_map(params![post_id], Comment::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

fn load_comment(conn: &Connection, comment_id: i64) -> AppResult<Comment> {
    conn.query_row(
        &format!("{} WHERE c.id = ?1", Comment::SELECT),
        params![comment_id],
        Comment::from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// A comment addressed through the wrong post is treated as missing.
fn load_comment_on(conn: &Connection, post_id: i64, comment_id: i64) -> AppResult<Comment> {
    let comment = load_comment(conn, comment_id)?;
    if comment.post_id != post_id {
        return Err(AppError::NotFound);
    }
    Ok(comment)
}

/// The comment itself plus every reply below it.
fn subtree_ids(conn: &Connection, root: i64) -> AppResult<Vec<i64>> {
    let mut stmt = conn.prepare(
        "WITH RECURSIVE subtree(id) AS (
             SELECT ?1
             UNION ALL
             SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id
         )
         SELECT id FROM subtree",
    )?;
    let ids = stmt
        .query_map(params![root], |r| r.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}
