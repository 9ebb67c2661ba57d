use axum::extract::State;
use axum::routing::get;
use axum::Router;
use rusqlite::{params, OptionalExtension};

use crate::api::Profile;
use crate::db::models::{Post, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{Json, Path};
use crate::state::AppState;

const RECENT_POSTS: i64 = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/users/{username}", get(profile))
}

/// GET /api/users/{username}: public profile with activity counts.
async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<Profile>> {
    let conn = state.db.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", User::COLUMNS),
            params![username],
            User::from_row,
        )
        .optional()?
        .ok_or(AppError::NotFound)?;

    let post_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE author_id = ?1 AND status != 'draft'",
        params![user.id],
        |r| r.get(0),
    )?;
    let comment_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE author_id = ?1",
        params![user.id],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.author_id = ?1 AND p.status != 'draft' ORDER BY p.created_at DESC, p.id DESC LIMIT ?2",
        Post::SELECT
    ))?;
    let recent_posts = stmt
        .query_map(params![user.id, RECENT_POSTS], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(Profile {
        user,
        post_count,
        comment_count,
        recent_posts,
    }))
}
