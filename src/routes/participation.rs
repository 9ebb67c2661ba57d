use axum::extract::State;
use axum::routing::get;
use axum::Router;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{board_from, load_visible_post};
use crate::api::ParticipationSummary;
use crate::db::models::{parse_column, Post};
use crate::domain::participation::{next_action, Toggle};
use crate::domain::{Board, Capacity, ParticipationStatus};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Json, MaybeUser, Path};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/{board}/{id}/participate",
        get(participation_status).post(toggle_participation),
    )
}

async fn participation_status(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((board, id)): Path<(String, i64)>,
) -> AppResult<Json<ParticipationSummary>> {
    let board = activity_board(&board)?;
    let conn = state.db.get()?;
    let post = load_visible_post(&conn, board, id, user.as_ref())?;
    let summary = summarize(&conn, &post, user.as_ref().map(|u| u.id.as_str()), None)?;
    Ok(Json(summary))
}

/// POST toggles registration. The seat count is read and written inside one
/// immediate transaction so concurrent registrations cannot overfill.
async fn toggle_participation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
) -> AppResult<Json<ParticipationSummary>> {
    let board = activity_board(&board)?;
    let mut conn = state.db.get()?;
    let post = load_visible_post(&conn, board, id, Some(&user))?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = user_status(&tx, id, &user.id)?;
    let capacity = Capacity {
        current: seats_taken(&tx, id)?,
        max: post.max_participants,
    };

    let message = match next_action(current, capacity, post.status)? {
        Toggle::Register => {
            tx.execute(
                "INSERT INTO participants (post_id, user_id, status) VALUES (?1, ?2, 'registered')
                 ON CONFLICT (post_id, user_id)
                 DO UPDATE SET status = 'registered', updated_at = datetime('now')",
                params![id, user.id],
            )?;
            "You are registered"
        }
        Toggle::Cancel => {
            tx.execute(
                "UPDATE participants SET status = 'cancelled', updated_at = datetime('now')
                 WHERE post_id = ?1 AND user_id = ?2",
                params![id, user.id],
            )?;
            "Your registration has been cancelled"
        }
    };
    tx.commit()?;

    tracing::info!(post_id = id, user = %user.username, outcome = message, "participation toggled");

    let summary = summarize(&conn, &post, Some(&user.id), Some(message.to_string()))?;
    Ok(Json(summary))
}

fn activity_board(segment: &str) -> AppResult<Board> {
    let board = board_from(segment)?;
    if !board.accepts_participants() {
        return Err(AppError::NotFound);
    }
    Ok(board)
}

fn user_status(
    conn: &Connection,
    post_id: i64,
    user_id: &str,
) -> AppResult<Option<ParticipationStatus>> {
    let status = conn
        .query_row(
            "SELECT status FROM participants WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
            |row| parse_column(row, 0),
        )
        .optional()?;
    Ok(status)
}

pub(crate) fn seats_taken(conn: &Connection, post_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM participants WHERE post_id = ?1 AND status IN ('registered', 'attended')",
        params![post_id],
        |r| r.get(0),
    )
}

fn summarize(
    conn: &Connection,
    post: &Post,
    viewer: Option<&str>,
    message: Option<String>,
) -> AppResult<ParticipationSummary> {
    let status = match viewer {
        Some(uid) => user_status(conn, post.id, uid)?,
        None => None,
    };

    Ok(ParticipationSummary {
        status,
        is_participating: status.is_some_and(ParticipationStatus::holds_seat),
        current_participants: seats_taken(conn, post.id)?,
        max_participants: post.max_participants,
        post_status: post.status,
        message,
    })
}
