pub mod admin;
pub mod auth;
pub mod comments;
pub mod likes;
pub mod participation;
pub mod posts;
pub mod profile;
pub mod votes;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::models::Post;
use crate::domain::{Board, PostStatus};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Json};
use crate::state::AppState;

/// Full application router with tracing and CORS applied.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(admin::router())
        .merge(profile::router())
        .merge(posts::router())
        .merge(likes::router())
        .merge(comments::router())
        .merge(votes::router())
        .merge(participation::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(AllowOrigin::list(parsed))
            .allow_credentials(true)
    }
}

// --- Shared handler helpers ---

/// Resolves the `{board}` path segment. Unknown boards are a 404.
pub(crate) fn board_from(segment: &str) -> AppResult<Board> {
    Board::from_segment(segment).ok_or(AppError::NotFound)
}

/// Loads a post that must live on `board`.
pub(crate) fn load_post(conn: &Connection, board: Board, id: i64) -> AppResult<Post> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1 AND p.board = ?2", Post::SELECT),
        params![id, board.as_str()],
        Post::from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// Like [`load_post`], but drafts are only visible to their author and admins.
pub(crate) fn load_visible_post(
    conn: &Connection,
    board: Board,
    id: i64,
    viewer: Option<&CurrentUser>,
) -> AppResult<Post> {
    let post = load_post(conn, board, id)?;
    if post.status == PostStatus::Draft && !can_manage(viewer, &post.author_id) {
        return Err(AppError::NotFound);
    }
    Ok(post)
}

/// Authors manage their own content; admins manage everything.
pub(crate) fn can_manage(user: Option<&CurrentUser>, author_id: &str) -> bool {
    user.is_some_and(|u| u.is_admin || u.id == author_id)
}

/// Trims `text` and checks it is non-empty and within `max` characters.
pub(crate) fn clean_text(text: &str, what: &str, max: usize) -> AppResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", what)));
    }
    if text.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{} must be {} characters or less",
            what, max
        )));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, is_admin: bool) -> CurrentUser {
        CurrentUser {
            id: id.into(),
            username: id.into(),
            is_admin,
        }
    }

    #[test]
    fn unknown_board_is_not_found() {
        assert!(matches!(board_from("events"), Err(AppError::NotFound)));
        assert_eq!(board_from("projects").unwrap(), Board::Project);
    }

    #[test]
    fn manage_rights() {
        assert!(can_manage(Some(&user("a", false)), "a"));
        assert!(!can_manage(Some(&user("b", false)), "a"));
        assert!(can_manage(Some(&user("b", true)), "a"));
        assert!(!can_manage(None, "a"));
    }

    #[test]
    fn clean_text_trims_and_limits() {
        assert_eq!(clean_text("  hello ", "Comment", 10).unwrap(), "hello");
        assert!(matches!(
            clean_text("   ", "Comment", 10),
            Err(AppError::BadRequest(m)) if m == "Comment cannot be empty"
        ));
        assert!(clean_text(&"x".repeat(11), "Comment", 10).is_err());
        // Limit counts characters, not bytes
        assert!(clean_text(&"é".repeat(10), "Comment", 10).is_ok());
    }
}
